use thiserror::Error;

/// エラーの分類
///
/// 呼び出し側はこの分類でリクエストの拒否方法を決める。
/// どちらも自動リトライの対象ではない（並行性の競合はストレージ層で検出される）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 状態の競合（例: 既に返却済み、貸出可能な在庫がない）
    StateConflict,
    /// 入力値の不正（例: 期間の終了が開始より前）
    Validation,
}

/// ドメインエラーの安定したコードと分類
pub trait ErrorCode {
    /// 機械判定用のコード（例: `"Item.NotAvailable"`）
    fn code(&self) -> &'static str;

    fn category(&self) -> ErrorCategory;
}

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Title must not exceed {max} characters")]
    TitleTooLong { max: usize },

    #[error("Author {field} must not be empty")]
    EmptyAuthorField { field: &'static str },

    #[error("Author {field} must not exceed {max} characters")]
    AuthorFieldTooLong { field: &'static str, max: usize },

    #[error("Catalog name must not be empty")]
    EmptyCatalogName,

    #[error("Catalog name must not exceed {max} characters")]
    CatalogNameTooLong { max: usize },
}

impl ErrorCode for ValidationError {
    fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyTitle => "Item.EmptyTitle",
            ValidationError::TitleTooLong { .. } => "Item.TitleTooLong",
            ValidationError::EmptyAuthorField { .. } => "Item.EmptyAuthorField",
            ValidationError::AuthorFieldTooLong { .. } => "Item.AuthorFieldTooLong",
            ValidationError::EmptyCatalogName => "Catalog.EmptyName",
            ValidationError::CatalogNameTooLong { .. } => "Catalog.NameTooLong",
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// 貸出期間のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanPeriodError {
    /// 終了日時が開始日時以前
    #[error("Loan period end must be after its start")]
    InvalidPeriod,
}

impl ErrorCode for LoanPeriodError {
    fn code(&self) -> &'static str {
        match self {
            LoanPeriodError::InvalidPeriod => "LoanPeriod.Invalid",
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// 貸出（Loan）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanError {
    /// 既に返却済み
    #[error("The loan is already returned")]
    AlreadyReturned,

    /// 延長期間が現在の期間の終了より前に始まっている
    #[error("The loan extension must start no earlier than the current period end")]
    InvalidExtension,
}

impl ErrorCode for LoanError {
    fn code(&self) -> &'static str {
        match self {
            LoanError::AlreadyReturned => "Loan.AlreadyReturned",
            LoanError::InvalidExtension => "Loan.InvalidExtension",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            LoanError::AlreadyReturned => ErrorCategory::StateConflict,
            LoanError::InvalidExtension => ErrorCategory::Validation,
        }
    }
}

/// 蔵書（Item）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// 貸出可能な冊数がない
    #[error("Item is not available")]
    NotAvailable,

    /// 既に削除済み
    #[error("Item is already deleted")]
    AlreadyDeleted,

    /// 貸出可能な冊数が残っているため削除できない
    #[error("Item still has available copies")]
    StillAvailable,

    /// 追加冊数が0以下
    #[error("Stock count must be greater than zero")]
    InvalidStockCount,
}

impl ErrorCode for ItemError {
    fn code(&self) -> &'static str {
        match self {
            ItemError::NotAvailable => "Item.NotAvailable",
            ItemError::AlreadyDeleted => "Item.AlreadyDeleted",
            ItemError::StillAvailable => "Item.StillAvailable",
            ItemError::InvalidStockCount => "Item.InvalidStockCount",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            ItemError::InvalidStockCount => ErrorCategory::Validation,
            _ => ErrorCategory::StateConflict,
        }
    }
}

/// 利用者（Borrower）による貸出・返却のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BorrowerError {
    /// 蔵書のステータスがAvailableではない
    #[error("Book is not available")]
    BookNotAvailable,

    /// 同じ蔵書の貸出中のLoanが既にある
    #[error("A loan for this book already exists")]
    LoanAlreadyExists,

    /// 貸出中のLoanがない
    #[error("Book is not borrowed")]
    BookNotBorrowed,

    /// 利用者が持たないLoan
    #[error("The loan was not found")]
    LoanNotFound,

    /// Loanの参照先が利用者・蔵書と一致しない
    #[error("The loan does not reference this borrower and item")]
    LoanMismatch,

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error(transparent)]
    Loan(#[from] LoanError),
}

impl ErrorCode for BorrowerError {
    fn code(&self) -> &'static str {
        match self {
            BorrowerError::BookNotAvailable => "Borrower.BookNotAvailable",
            BorrowerError::LoanAlreadyExists => "Borrower.LoanAlreadyExists",
            BorrowerError::BookNotBorrowed => "Borrower.BookNotBorrowed",
            BorrowerError::LoanNotFound => "Borrower.LoanNotFound",
            BorrowerError::LoanMismatch => "Borrower.LoanMismatch",
            BorrowerError::Item(e) => e.code(),
            BorrowerError::Loan(e) => e.code(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            BorrowerError::LoanMismatch => ErrorCategory::Validation,
            BorrowerError::Item(e) => e.category(),
            BorrowerError::Loan(e) => e.category(),
            _ => ErrorCategory::StateConflict,
        }
    }
}

/// 蔵書目録（Catalog）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// 同じタイトル・著者の蔵書が既に登録されている
    #[error("An item with the same title and author already exists in the catalog")]
    DuplicateItem,
}

impl ErrorCode for CatalogError {
    fn code(&self) -> &'static str {
        match self {
            CatalogError::DuplicateItem => "Catalog.DuplicateItem",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            CatalogError::DuplicateItem => ErrorCategory::Validation,
        }
    }
}
