use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BorrowerId, CatalogId, ItemId, LoanId};

/// コマンド：目録を作成する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCatalog {
    pub name: String,
}

/// コマンド：目録に蔵書を追加する
///
/// 冊数（quantity）はアプリケーション層で1以上であることを検証する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItemToCatalog {
    pub catalog_id: CatalogId,
    pub title: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_country: String,
    pub quantity: i64,
}

/// コマンド：在庫を追加する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStock {
    pub item_id: ItemId,
    pub count: i64,
}

/// コマンド：蔵書を削除する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItem {
    pub item_id: ItemId,
}

/// コマンド：蔵書を借りる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowItem {
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// コマンド：蔵書を返却する（返却日時は時計から取る）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub borrower_id: BorrowerId,
    pub item_id: ItemId,
}

/// コマンド：貸出を延長する
///
/// 新しい期間は現在の終了日時から`new_end`まで。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendLoan {
    pub borrower_id: BorrowerId,
    pub loan_id: LoanId,
    pub new_end: DateTime<Utc>,
}
