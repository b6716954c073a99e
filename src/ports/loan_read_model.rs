use crate::domain::{BorrowerId, ItemId, Loan, LoanId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出ステータス（Read Model用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    /// 貸出中
    Active,
    /// 延滞中（貸出中かつ期限切れ）
    Overdue,
    /// 返却済み
    Returned,
}

impl LoanStatus {
    /// ログ・レポート用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        }
    }
}

/// 貸出ビュー（Read Model）
///
/// 延滞は保存された状態ではなく、問い合わせ時刻から導出する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanView {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl LoanView {
    /// 貸出集約から問い合わせ時刻`now`時点のビューを構築する
    pub fn from_loan(loan: &Loan, now: DateTime<Utc>) -> Self {
        let status = if loan.is_returned() {
            LoanStatus::Returned
        } else if loan.is_overdue(now) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        };

        Self {
            loan_id: loan.id(),
            borrower_id: loan.borrower_id(),
            item_id: loan.item_id(),
            period_start: loan.period().start(),
            period_end: loan.period().end(),
            returned_at: loan.returned_at(),
            status,
        }
    }
}

/// 貸出Read Modelポート
#[async_trait]
pub trait LoanReadModel: Send + Sync {
    /// 延滞中の貸出を検索する
    ///
    /// 未返却かつ period_end < now の貸出を、期限の古い順に返す。
    async fn find_overdue_loans(&self, now: DateTime<Utc>) -> Result<Vec<LoanView>>;

    /// 未返却の貸出（延滞中を含む）を期限の近い順に返す
    async fn find_active_loans(&self, now: DateTime<Utc>) -> Result<Vec<LoanView>>;

    /// 利用者の全貸出を検索する（貸出開始の新しい順）
    async fn find_by_borrower_id(
        &self,
        borrower_id: BorrowerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<LoanView>>;

    /// IDで貸出を取得する
    async fn get_by_id(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<Option<LoanView>>;
}
