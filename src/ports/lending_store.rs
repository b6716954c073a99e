use crate::domain::{Borrower, BorrowerId, Catalog, CatalogId, DomainEvent, Item, ItemId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 永続化層のエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// 読み込み後に他のトランザクションが同じ集約を更新した（リトライ可能）
    #[error("Concurrent modification detected")]
    Conflict,

    #[error("Storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// 読み込み時点のバージョン付きの集約
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

/// 保存待ちの集約
///
/// `expected_version`が`None`なら新規作成、`Some(v)`なら保存済みのバージョンが
/// `v`のときだけ更新する（楽観的排他制御）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending<T> {
    pub value: T,
    pub expected_version: Option<i64>,
}

impl<T> Pending<T> {
    pub fn insert(value: T) -> Self {
        Self {
            value,
            expected_version: None,
        }
    }

    pub fn update(versioned: Versioned<T>) -> Self {
        Self {
            value: versioned.value,
            expected_version: Some(versioned.version),
        }
    }
}

/// 1つのトランザクションでコミットする変更
///
/// イベントは状態と同じトランザクションでアウトボックスに書き込まれる。
#[derive(Debug, Default)]
pub struct UnitOfWork {
    pub catalogs: Vec<Pending<Catalog>>,
    pub items: Vec<Pending<Item>>,
    pub borrowers: Vec<Pending<Borrower>>,
    pub events: Vec<DomainEvent>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, catalog: Pending<Catalog>) -> Self {
        self.catalogs.push(catalog);
        self
    }

    pub fn with_item(mut self, item: Pending<Item>) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_borrower(mut self, borrower: Pending<Borrower>) -> Self {
        self.borrowers.push(borrower);
        self
    }

    pub fn with_events(mut self, events: Vec<DomainEvent>) -> Self {
        self.events.extend(events);
        self
    }
}

/// アウトボックスに書き込まれたイベント
///
/// `id`はアウトボックス内で単調増加し、書き込み順を表す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: i64,
    pub event: DomainEvent,
}

/// 貸出管理の永続化ポート
///
/// ドメイン層は永続化を直接呼ばない。アプリケーション層が
/// 読み込み → ドメイン操作 → コミットの順に使う。
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// 目録を所属する蔵書ごと読み込む
    async fn load_catalog(&self, catalog_id: CatalogId) -> Result<Option<Versioned<Catalog>>>;

    async fn load_item(&self, item_id: ItemId) -> Result<Option<Versioned<Item>>>;

    /// 利用者を所有するLoanごと読み込む
    async fn load_borrower(&self, borrower_id: BorrowerId) -> Result<Option<Versioned<Borrower>>>;

    /// 変更をまとめてコミットする
    ///
    /// - 新規作成は同じIDが既にあれば`StoreError::Conflict`
    /// - 更新は保存済みのバージョンが`expected_version`と異なれば`StoreError::Conflict`
    /// - 目録の保存では、まだ保存されていない所属蔵書も作成する
    /// - 失敗時は何も反映しない
    ///
    /// # 戻り値
    /// アウトボックスに書き込んだイベントのID（イベントと同じ順序）
    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<Vec<i64>>;

    /// 未配信のイベントを書き込み順に最大`limit`件読み込む
    async fn unpublished_events(&self, limit: usize) -> Result<Vec<OutboxEntry>>;

    /// イベントを配信済みにする
    ///
    /// 配信済みのIDや存在しないIDは無視する。
    async fn mark_published(&self, ids: &[i64], published_at: DateTime<Utc>) -> Result<()>;
}
