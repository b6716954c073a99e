use crate::domain::{
    BorrowerError, CatalogError, ErrorCode, ItemError, LoanPeriodError, ValidationError,
};
use crate::ports::StoreError;
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LendingApplicationError {
    /// 利用者が存在しない
    #[error("Borrower not found")]
    BorrowerNotFound,

    /// 蔵書が存在しない
    #[error("Item not found")]
    ItemNotFound,

    /// 目録が存在しない
    #[error("Catalog not found")]
    CatalogNotFound,

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 冊数が1未満
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    /// 貸出開始が今日より前
    #[error("Start date cannot be in the past")]
    LoanStartInPast,

    /// 貸出開始が先すぎる
    #[error("Start date cannot be more than {max_days} day(s) ahead")]
    LoanStartTooFarAhead { max_days: i64 },

    /// 貸出期間が長すぎる
    #[error("Loan period cannot exceed {max_days} days")]
    LoanPeriodTooLong { max_days: i64 },

    /// 延長後の期限が現在時刻以前
    #[error("New end date must be in the future")]
    ExtensionNotInFuture,

    /// 延長後の期限が遠すぎる
    #[error("Loan extension cannot exceed {max_days} days from today")]
    ExtensionTooLong { max_days: i64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    LoanPeriod(#[from] LoanPeriodError),

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error(transparent)]
    Borrower(#[from] BorrowerError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// 楽観的排他制御の競合（リトライ後も解消しなかった）
    #[error("The data was modified concurrently, please retry")]
    ConcurrencyConflict,

    /// 永続化層のエラー
    #[error("Store error")]
    StoreError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// ReadModelのエラー
    #[error("Read model error")]
    ReadModelError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// イベント配信のエラー（未配信イベントの再配信時のみ）
    #[error("Event publish error")]
    PublishError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for LendingApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => LendingApplicationError::ConcurrencyConflict,
            StoreError::Backend(e) => LendingApplicationError::StoreError(e),
        }
    }
}

impl LendingApplicationError {
    /// 呼び出し側に返すエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            LendingApplicationError::BorrowerNotFound => "Borrower.NotFound",
            LendingApplicationError::ItemNotFound => "Item.NotFound",
            LendingApplicationError::CatalogNotFound => "Catalog.NotFound",
            LendingApplicationError::LoanNotFound => "Loan.NotFound",
            LendingApplicationError::InvalidQuantity => "Item.InvalidQuantity",
            LendingApplicationError::LoanStartInPast => "Loan.StartInPast",
            LendingApplicationError::LoanStartTooFarAhead { .. } => "Loan.StartTooFarAhead",
            LendingApplicationError::LoanPeriodTooLong { .. } => "Loan.PeriodTooLong",
            LendingApplicationError::ExtensionNotInFuture => "Loan.ExtensionNotInFuture",
            LendingApplicationError::ExtensionTooLong { .. } => "Loan.ExtensionTooLong",
            LendingApplicationError::Validation(e) => e.code(),
            LendingApplicationError::LoanPeriod(e) => e.code(),
            LendingApplicationError::Item(e) => e.code(),
            LendingApplicationError::Borrower(e) => e.code(),
            LendingApplicationError::Catalog(e) => e.code(),
            LendingApplicationError::ConcurrencyConflict => "Store.ConcurrencyConflict",
            LendingApplicationError::StoreError(_) => "Store.Error",
            LendingApplicationError::ReadModelError(_) => "ReadModel.Error",
            LendingApplicationError::PublishError(_) => "Events.PublishFailed",
        }
    }

    /// 呼び出し側が新しい状態で再実行してよいか
    pub fn is_retryable(&self) -> bool {
        matches!(self, LendingApplicationError::ConcurrencyConflict)
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LendingApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_retryable_error() {
        let err = LendingApplicationError::from(StoreError::Conflict);
        assert!(matches!(err, LendingApplicationError::ConcurrencyConflict));
        assert!(err.is_retryable());
        assert_eq!(err.code(), "Store.ConcurrencyConflict");
    }

    #[test]
    fn test_domain_error_codes_pass_through() {
        let err = LendingApplicationError::from(BorrowerError::from(ItemError::NotAvailable));
        assert_eq!(err.code(), "Item.NotAvailable");
        assert_eq!(err.to_string(), "Item is not available");
        assert!(!err.is_retryable());
    }
}
