use crate::domain::{BorrowerId, LoanId};
use crate::ports::{LoanStatus, LoanView};

use super::dependencies::ServiceDependencies;
use super::errors::{LendingApplicationError, Result};

/// 延滞中の貸出を取得する
///
/// 判定基準は時計ポートの現在時刻。期限の古い順に返す。
#[tracing::instrument(skip(deps))]
pub async fn get_overdue_loans(deps: &ServiceDependencies) -> Result<Vec<LoanView>> {
    let now = deps.clock.now();

    let loans = deps
        .loan_read_model
        .find_overdue_loans(now)
        .await
        .map_err(LendingApplicationError::ReadModelError)?;

    tracing::debug!(count = loans.len(), %now, "Overdue loans fetched");
    Ok(loans)
}

/// 未返却の貸出（延滞中を含む）をすべて取得する
///
/// 期限の近い順に返す。
#[tracing::instrument(skip(deps))]
pub async fn get_active_loans(deps: &ServiceDependencies) -> Result<Vec<LoanView>> {
    deps.loan_read_model
        .find_active_loans(deps.clock.now())
        .await
        .map_err(LendingApplicationError::ReadModelError)
}

/// 利用者の貸出一覧を取得する
///
/// `active_only`が`true`の場合は未返却（延滞中を含む）のものだけを返す。
#[tracing::instrument(skip(deps, borrower_id), fields(borrower_id = %borrower_id.value()))]
pub async fn get_borrower_loans(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
    active_only: bool,
) -> Result<Vec<LoanView>> {
    let now = deps.clock.now();

    let loans = deps
        .loan_read_model
        .find_by_borrower_id(borrower_id, now)
        .await
        .map_err(LendingApplicationError::ReadModelError)?;

    if !active_only {
        return Ok(loans);
    }

    Ok(loans
        .into_iter()
        .filter(|loan| loan.status != LoanStatus::Returned)
        .collect())
}

/// 貸出を1件取得する
#[tracing::instrument(skip(deps, loan_id), fields(loan_id = %loan_id.value()))]
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<LoanView> {
    let loan = deps
        .loan_read_model
        .get_by_id(loan_id, deps.clock.now())
        .await
        .map_err(LendingApplicationError::ReadModelError)?
        .ok_or(LendingApplicationError::LoanNotFound)?;

    tracing::debug!(status = loan.status.as_str(), "Loan fetched");
    Ok(loan)
}
