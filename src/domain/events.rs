use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BorrowerId, CatalogId, ItemId, LoanId, LoanPeriod};

/// イベント：蔵書が作成された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: ItemId,
    pub catalog_id: CatalogId,
    pub title: String,
    pub total_copies: u32,
}

/// イベント：蔵書の1冊が貸し出された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBorrowed {
    pub item_id: ItemId,
    pub available_copies: u32,
}

/// イベント：蔵書の1冊が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReturned {
    pub item_id: ItemId,
    pub available_copies: u32,
}

/// イベント：在庫が追加された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdded {
    pub item_id: ItemId,
    pub added: u32,
    pub total_copies: u32,
    pub available_copies: u32,
}

/// イベント：蔵書が削除された（論理削除）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDeleted {
    pub item_id: ItemId,
}

/// イベント：貸出が作成された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCreated {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub period: LoanPeriod,
}

/// イベント：貸出が返却済みになった
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReturned {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub returned_at: DateTime<Utc>,
}

/// イベント：貸出が延長された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanExtended {
    pub loan_id: LoanId,
    pub old_period: LoanPeriod,
    pub new_period: LoanPeriod,
}

/// イベント：利用者が書籍を借りた
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookBorrowed {
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub loan_id: LoanId,
}

/// イベント：利用者が書籍を返却した
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReturned {
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
}

/// イベント：目録が作成された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCreated {
    pub catalog_id: CatalogId,
    pub name: String,
}

/// イベント：目録に蔵書が追加された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAddedToCatalog {
    pub catalog_id: CatalogId,
    pub item_id: ItemId,
}

/// ドメインイベント統合型
///
/// 集約の操作ごとにキューへ積まれ、コミット後にアプリケーション層が取り出して配信する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    ItemCreated(ItemCreated),
    ItemBorrowed(ItemBorrowed),
    ItemReturned(ItemReturned),
    StockAdded(StockAdded),
    ItemDeleted(ItemDeleted),
    LoanCreated(LoanCreated),
    LoanReturned(LoanReturned),
    LoanExtended(LoanExtended),
    BookBorrowed(BookBorrowed),
    BookReturned(BookReturned),
    CatalogCreated(CatalogCreated),
    ItemAddedToCatalog(ItemAddedToCatalog),
}

impl DomainEvent {
    /// イベント種別の識別子（アウトボックスの event_type 列に使う）
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::ItemCreated(_) => "ItemCreated",
            DomainEvent::ItemBorrowed(_) => "ItemBorrowed",
            DomainEvent::ItemReturned(_) => "ItemReturned",
            DomainEvent::StockAdded(_) => "StockAdded",
            DomainEvent::ItemDeleted(_) => "ItemDeleted",
            DomainEvent::LoanCreated(_) => "LoanCreated",
            DomainEvent::LoanReturned(_) => "LoanReturned",
            DomainEvent::LoanExtended(_) => "LoanExtended",
            DomainEvent::BookBorrowed(_) => "BookBorrowed",
            DomainEvent::BookReturned(_) => "BookReturned",
            DomainEvent::CatalogCreated(_) => "CatalogCreated",
            DomainEvent::ItemAddedToCatalog(_) => "ItemAddedToCatalog",
        }
    }
}

/// イベントを溜める集約の共通インターフェース
pub trait AggregateRoot {
    /// キューに溜まったイベントをすべて取り出す（取り出し後は空になる）
    fn take_events(&mut self) -> Vec<DomainEvent>;
}
