use crate::domain::{
    AggregateRoot, Borrower, BorrowerError, BorrowerId, Loan, LoanError, LoanId, LoanPeriod,
    commands::*,
};
use crate::ports::{Pending, UnitOfWork};
use chrono::{Duration, NaiveTime};

use super::dependencies::{
    ServiceDependencies, commit_and_publish, load_borrower, load_item, with_conflict_retry,
};
use super::errors::{LendingApplicationError, Result};

/// 延長後の期限の上限（現在時刻からの日数）
pub const MAX_EXTENSION_DAYS: i64 = 60;

/// 貸出期間の長さの上限（日数）
pub const MAX_LOAN_DAYS: i64 = 30;

/// 貸出開始日時をどこまで先にできるか（現在時刻からの日数）
pub const MAX_START_AHEAD_DAYS: i64 = 1;

/// 利用者を登録する
///
/// 認証・会員情報は範囲外のため、IDのみを持つ利用者を作成する。
#[tracing::instrument(skip(deps))]
pub async fn register_borrower(deps: &ServiceDependencies) -> Result<BorrowerId> {
    let borrower = Borrower::new(BorrowerId::new());
    let borrower_id = borrower.id();

    commit_and_publish(
        deps,
        UnitOfWork::new().with_borrower(Pending::insert(borrower)),
    )
    .await?;

    tracing::info!(borrower_id = %borrower_id.value(), "Borrower registered");
    Ok(borrower_id)
}

/// 蔵書を借りる
///
/// ビジネスルール：
/// - 貸出期間の終了が開始より後であること
/// - 開始が今日（UTC）の0時以降、かつ現在時刻から1日以内であること
/// - 貸出期間が30日以内であること
/// - 利用者・蔵書が存在すること
/// - 蔵書のステータスがAvailableであること
/// - 同じ蔵書の貸出中のLoanがないこと
///
/// 利用者（Loanを含む）と蔵書の変更は1つのトランザクションでコミットされる。
/// 競合した場合は最新の状態を読み直して1回だけやり直す。
///
/// # 戻り値
/// 作成された貸出のID
#[tracing::instrument(skip(deps), fields(borrower_id = %cmd.borrower_id.value(), item_id = %cmd.item_id.value()))]
pub async fn borrow_item(deps: &ServiceDependencies, cmd: BorrowItem) -> Result<LoanId> {
    let period = LoanPeriod::new(cmd.start, cmd.end)?;

    let now = deps.clock.now();
    let start_of_today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    if period.start() < start_of_today {
        return Err(LendingApplicationError::LoanStartInPast);
    }
    if period.start() > now + Duration::days(MAX_START_AHEAD_DAYS) {
        return Err(LendingApplicationError::LoanStartTooFarAhead {
            max_days: MAX_START_AHEAD_DAYS,
        });
    }
    if period.end() - period.start() > Duration::days(MAX_LOAN_DAYS) {
        return Err(LendingApplicationError::LoanPeriodTooLong {
            max_days: MAX_LOAN_DAYS,
        });
    }

    with_conflict_retry("borrow_item", || try_borrow_item(deps, &cmd, period)).await
}

async fn try_borrow_item(
    deps: &ServiceDependencies,
    cmd: &BorrowItem,
    period: LoanPeriod,
) -> Result<LoanId> {
    // 1. 集約を読み込む
    let mut borrower = load_borrower(deps, cmd.borrower_id).await?;
    let mut item = load_item(deps, cmd.item_id).await?;

    // 2. ドメイン層で貸出
    let loan = Loan::create(LoanId::new(), cmd.borrower_id, cmd.item_id, period);
    let loan_id = loan.id();
    borrower.value.borrow_item(&mut item.value, loan)?;

    // 3. イベントを取り出して一括コミット
    let mut events = borrower.value.take_events();
    events.extend(item.value.take_events());

    let unit_of_work = UnitOfWork::new()
        .with_borrower(Pending::update(borrower))
        .with_item(Pending::update(item))
        .with_events(events);
    commit_and_publish(deps, unit_of_work).await?;

    tracing::info!(loan_id = %loan_id.value(), "Item borrowed");
    Ok(loan_id)
}

/// 蔵書を返却する
///
/// 返却日時は時計ポートから取得する。
///
/// # 戻り値
/// 返却済みになった貸出のID
#[tracing::instrument(skip(deps), fields(borrower_id = %cmd.borrower_id.value(), item_id = %cmd.item_id.value()))]
pub async fn return_item(deps: &ServiceDependencies, cmd: ReturnItem) -> Result<LoanId> {
    with_conflict_retry("return_item", || try_return_item(deps, &cmd)).await
}

async fn try_return_item(deps: &ServiceDependencies, cmd: &ReturnItem) -> Result<LoanId> {
    let mut borrower = load_borrower(deps, cmd.borrower_id).await?;
    let mut item = load_item(deps, cmd.item_id).await?;

    let returned_at = deps.clock.now();
    let loan_id = borrower.value.return_item(&mut item.value, returned_at)?;

    let mut events = borrower.value.take_events();
    events.extend(item.value.take_events());

    let unit_of_work = UnitOfWork::new()
        .with_borrower(Pending::update(borrower))
        .with_item(Pending::update(item))
        .with_events(events);
    commit_and_publish(deps, unit_of_work).await?;

    tracing::info!(loan_id = %loan_id.value(), %returned_at, "Item returned");
    Ok(loan_id)
}

/// 貸出を延長する
///
/// 新しい期間は「現在の期限 〜 `new_end`」。
///
/// ビジネスルール：
/// - 貸出が利用者のものであり、返却済みでないこと
/// - `new_end`が現在時刻より後、かつ現在時刻から60日以内であること
/// - `new_end`が現在の期限より後であること
#[tracing::instrument(skip(deps), fields(borrower_id = %cmd.borrower_id.value(), loan_id = %cmd.loan_id.value()))]
pub async fn extend_loan(deps: &ServiceDependencies, cmd: ExtendLoan) -> Result<()> {
    let now = deps.clock.now();
    if cmd.new_end <= now {
        return Err(LendingApplicationError::ExtensionNotInFuture);
    }
    if cmd.new_end > now + Duration::days(MAX_EXTENSION_DAYS) {
        return Err(LendingApplicationError::ExtensionTooLong {
            max_days: MAX_EXTENSION_DAYS,
        });
    }

    with_conflict_retry("extend_loan", || try_extend_loan(deps, &cmd)).await
}

async fn try_extend_loan(deps: &ServiceDependencies, cmd: &ExtendLoan) -> Result<()> {
    let mut borrower = load_borrower(deps, cmd.borrower_id).await?;

    let current_period = match borrower.value.loan(cmd.loan_id) {
        None => return Err(BorrowerError::LoanNotFound.into()),
        Some(loan) if loan.is_returned() => {
            return Err(BorrowerError::from(LoanError::AlreadyReturned).into());
        }
        Some(loan) => loan.period(),
    };

    let new_period = LoanPeriod::new(current_period.end(), cmd.new_end)?;
    borrower.value.extend_loan(cmd.loan_id, new_period)?;

    let events = borrower.value.take_events();
    let unit_of_work = UnitOfWork::new()
        .with_borrower(Pending::update(borrower))
        .with_events(events);
    commit_and_publish(deps, unit_of_work).await?;

    tracing::info!(new_end = %new_period.end(), "Loan extended");
    Ok(())
}
