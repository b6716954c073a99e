use serde::{Deserialize, Serialize};

use super::{
    AggregateRoot, Author, CatalogId, DomainEvent, ItemBorrowed, ItemCreated, ItemDeleted,
    ItemError, ItemId, ItemReturned, StockAdded, Title,
};

/// 蔵書のステータス
///
/// 粗いフラグであり、貸出可否の判断には`available_copies`を使うこと。
/// 例えば1冊貸し出すと残りがあっても`Borrowed`になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Available,
    Borrowed,
    /// 論理削除（終端状態）
    Deleted,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Borrowed => "borrowed",
            ItemStatus::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ItemStatus::Available),
            "borrowed" => Ok(ItemStatus::Borrowed),
            "deleted" => Ok(ItemStatus::Deleted),
            _ => Err(format!("Invalid item status: {}", s)),
        }
    }
}

/// Item集約 - 1つの目録における1タイトル分の所蔵
///
/// 不変条件：
/// - `available_copies <= total_copies`（貸出・返却を利用者経由で行う限り）
/// - `Deleted`は`available_copies == 0`のときのみ。以降は返却の受け付けを除き変更不可
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    title: Title,
    author: Author,
    total_copies: u32,
    available_copies: u32,
    status: ItemStatus,
    catalog_id: CatalogId,
    events: Vec<DomainEvent>,
}

impl Item {
    /// 新しい蔵書を作成する（全冊貸出可能）
    ///
    /// 事前条件：`total_copies > 0` は呼び出し側（アプリケーション層）で検証済みであること。
    /// この関数自体は0冊も受け付ける。
    pub fn create(
        id: ItemId,
        title: Title,
        author: Author,
        total_copies: u32,
        catalog_id: CatalogId,
    ) -> Self {
        let mut item = Self {
            id,
            title,
            author,
            total_copies,
            available_copies: total_copies,
            status: ItemStatus::Available,
            catalog_id,
            events: Vec::new(),
        };

        item.events.push(DomainEvent::ItemCreated(ItemCreated {
            item_id: id,
            catalog_id,
            title: item.title.as_str().to_string(),
            total_copies,
        }));

        item
    }

    /// 永続化された状態から復元する（イベントは積まない）
    pub fn restore(
        id: ItemId,
        title: Title,
        author: Author,
        total_copies: u32,
        available_copies: u32,
        status: ItemStatus,
        catalog_id: CatalogId,
    ) -> Self {
        Self {
            id,
            title,
            author,
            total_copies,
            available_copies,
            status,
            catalog_id,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn total_copies(&self) -> u32 {
        self.total_copies
    }

    pub fn available_copies(&self) -> u32 {
        self.available_copies
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn catalog_id(&self) -> CatalogId {
        self.catalog_id
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ItemStatus::Deleted
    }

    /// タイトルと著者（名・姓・国）がすべて一致するか
    pub fn has_same_title_and_author(&self, other: &Item) -> bool {
        self.title == other.title && self.author == other.author
    }

    /// 1冊貸し出す
    ///
    /// 残りがあってもステータスは`Borrowed`になる。
    ///
    /// # エラー
    /// 貸出可能な冊数が0の場合は`ItemError::NotAvailable`
    pub fn mark_as_borrowed(&mut self) -> Result<(), ItemError> {
        if self.available_copies == 0 {
            return Err(ItemError::NotAvailable);
        }

        self.available_copies -= 1;
        self.status = ItemStatus::Borrowed;
        self.events.push(DomainEvent::ItemBorrowed(ItemBorrowed {
            item_id: self.id,
            available_copies: self.available_copies,
        }));

        Ok(())
    }

    /// 1冊返却を受け付ける
    ///
    /// 貸出中の冊数を記憶していないため、総冊数との突き合わせは行わない。
    /// 未返却の貸出がある場合にだけ呼ぶこと（`Borrower::return_item`が保証する）。
    ///
    /// 削除済みの場合は何もしない（冊数・ステータスともそのまま、イベントも積まない）。
    /// 削除後も貸出中の本は返却できる必要があるため、失敗にはしない。
    pub fn mark_as_returned(&mut self) {
        if self.is_deleted() {
            return;
        }

        self.available_copies = self.available_copies.saturating_add(1);
        self.status = ItemStatus::Available;
        self.events.push(DomainEvent::ItemReturned(ItemReturned {
            item_id: self.id,
            available_copies: self.available_copies,
        }));
    }

    /// 在庫を追加する（総冊数と貸出可能冊数の両方を増やす）
    ///
    /// # エラー
    /// - 削除済み：`ItemError::AlreadyDeleted`
    /// - `count <= 0`、または冊数が表現できない大きさ：`ItemError::InvalidStockCount`
    pub fn add_stock(&mut self, count: i64) -> Result<(), ItemError> {
        if self.is_deleted() {
            return Err(ItemError::AlreadyDeleted);
        }

        if count <= 0 {
            return Err(ItemError::InvalidStockCount);
        }

        let added = u32::try_from(count).map_err(|_| ItemError::InvalidStockCount)?;
        let total_copies = self
            .total_copies
            .checked_add(added)
            .ok_or(ItemError::InvalidStockCount)?;
        let available_copies = self
            .available_copies
            .checked_add(added)
            .ok_or(ItemError::InvalidStockCount)?;

        self.total_copies = total_copies;
        self.available_copies = available_copies;
        self.events.push(DomainEvent::StockAdded(StockAdded {
            item_id: self.id,
            added,
            total_copies,
            available_copies,
        }));

        Ok(())
    }

    /// 論理削除する
    ///
    /// # エラー
    /// - 削除済み：`ItemError::AlreadyDeleted`
    /// - 貸出可能な冊数が残っている：`ItemError::StillAvailable`
    pub fn mark_as_deleted(&mut self) -> Result<(), ItemError> {
        if self.is_deleted() {
            return Err(ItemError::AlreadyDeleted);
        }

        if self.available_copies > 0 {
            return Err(ItemError::StillAvailable);
        }

        self.status = ItemStatus::Deleted;
        self.events
            .push(DomainEvent::ItemDeleted(ItemDeleted { item_id: self.id }));

        Ok(())
    }
}

impl AggregateRoot for Item {
    fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}
