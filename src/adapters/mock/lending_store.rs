use crate::domain::{
    Borrower, BorrowerId, Catalog, CatalogId, CatalogName, DomainEvent, Item, ItemId, LoanId,
};
use crate::ports::lending_store::{
    LendingStore as LendingStoreTrait, OutboxEntry, Pending, Result, StoreError, UnitOfWork,
    Versioned,
};
use crate::ports::loan_read_model::{LoanReadModel as LoanReadModelTrait, LoanView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct CatalogRecord {
    name: CatalogName,
    item_ids: Vec<ItemId>,
    version: i64,
}

struct OutboxRecord {
    id: i64,
    event: DomainEvent,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct State {
    catalogs: HashMap<CatalogId, CatalogRecord>,
    items: HashMap<ItemId, Versioned<Item>>,
    borrowers: HashMap<BorrowerId, Versioned<Borrower>>,
    outbox: Vec<OutboxRecord>,
    failing_commits: usize,
}

impl State {
    fn check<K, T>(
        saved: Option<i64>,
        pending: &Pending<T>,
        kind: &'static str,
        id: K,
    ) -> Result<()>
    where
        K: std::fmt::Debug,
    {
        match (pending.expected_version, saved) {
            (None, None) => Ok(()),
            (Some(expected), Some(current)) if expected == current => Ok(()),
            (expected, current) => {
                tracing::debug!(kind, ?id, ?expected, ?current, "Version check failed");
                Err(StoreError::Conflict)
            }
        }
    }

    fn validate(&self, unit_of_work: &UnitOfWork) -> Result<()> {
        for pending in &unit_of_work.catalogs {
            let id = pending.value.id();
            let saved = self.catalogs.get(&id).map(|record| record.version);
            Self::check(saved, pending, "catalog", id)?;
        }
        for pending in &unit_of_work.items {
            let id = pending.value.id();
            let saved = self.items.get(&id).map(|item| item.version);
            Self::check(saved, pending, "item", id)?;
        }
        for pending in &unit_of_work.borrowers {
            let id = pending.value.id();
            let saved = self.borrowers.get(&id).map(|borrower| borrower.version);
            Self::check(saved, pending, "borrower", id)?;
        }
        Ok(())
    }

    fn next_version(expected_version: Option<i64>) -> i64 {
        expected_version.map_or(1, |version| version + 1)
    }

    fn loans(&self) -> impl Iterator<Item = &crate::domain::Loan> {
        self.borrowers
            .values()
            .flat_map(|borrower| borrower.value.loans())
    }
}

/// LendingStoreとLoanReadModelのインメモリ実装
///
/// 集約ごとにバージョン付きのスナップショットと、コミット済みイベントのアウトボックスを持つ。
/// コミットは全件の検証が通ってから反映するため、競合したコミットは何も残さない。
#[allow(dead_code)]
pub struct LendingStore {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl LendingStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 次の`count`回のコミットを`StoreError::Conflict`で失敗させる
    pub fn fail_next_commits(&self, count: usize) {
        self.state().failing_commits = count;
    }

    /// アウトボックスに書き込まれたイベント（コミット順、配信済みを含む）
    pub fn outbox(&self) -> Vec<DomainEvent> {
        self.state()
            .outbox
            .iter()
            .map(|record| record.event.clone())
            .collect()
    }

    /// 未配信のまま残っているイベントの件数
    pub fn unpublished_count(&self) -> usize {
        self.state()
            .outbox
            .iter()
            .filter(|record| record.published_at.is_none())
            .count()
    }

    /// 保存済みの蔵書の現在のバージョン
    pub fn item_version(&self, item_id: ItemId) -> Option<i64> {
        self.state().items.get(&item_id).map(|item| item.version)
    }
}

impl Default for LendingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LendingStoreTrait for LendingStore {
    async fn load_catalog(&self, catalog_id: CatalogId) -> Result<Option<Versioned<Catalog>>> {
        let state = self.state();
        let Some(record) = state.catalogs.get(&catalog_id) else {
            return Ok(None);
        };

        let items = record
            .item_ids
            .iter()
            .filter_map(|item_id| state.items.get(item_id))
            .map(|item| item.value.clone())
            .collect();

        Ok(Some(Versioned {
            value: Catalog::restore(catalog_id, record.name.clone(), items),
            version: record.version,
        }))
    }

    async fn load_item(&self, item_id: ItemId) -> Result<Option<Versioned<Item>>> {
        Ok(self.state().items.get(&item_id).cloned())
    }

    async fn load_borrower(&self, borrower_id: BorrowerId) -> Result<Option<Versioned<Borrower>>> {
        Ok(self.state().borrowers.get(&borrower_id).cloned())
    }

    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<Vec<i64>> {
        let mut state = self.state();

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(StoreError::Conflict);
        }

        state.validate(&unit_of_work)?;

        let UnitOfWork {
            catalogs,
            items,
            borrowers,
            events,
        } = unit_of_work;

        for pending in catalogs {
            let catalog = pending.value;
            for item in catalog.items() {
                if !state.items.contains_key(&item.id()) {
                    state.items.insert(
                        item.id(),
                        Versioned {
                            value: item.clone(),
                            version: 1,
                        },
                    );
                }
            }

            state.catalogs.insert(
                catalog.id(),
                CatalogRecord {
                    name: catalog.name().clone(),
                    item_ids: catalog.items().iter().map(|item| item.id()).collect(),
                    version: State::next_version(pending.expected_version),
                },
            );
        }

        for pending in items {
            state.items.insert(
                pending.value.id(),
                Versioned {
                    version: State::next_version(pending.expected_version),
                    value: pending.value,
                },
            );
        }

        for pending in borrowers {
            state.borrowers.insert(
                pending.value.id(),
                Versioned {
                    version: State::next_version(pending.expected_version),
                    value: pending.value,
                },
            );
        }

        let first_id = state.outbox.len() as i64 + 1;
        let ids: Vec<i64> = (first_id..).take(events.len()).collect();
        state
            .outbox
            .extend(ids.iter().zip(events).map(|(&id, event)| OutboxRecord {
                id,
                event,
                published_at: None,
            }));
        Ok(ids)
    }

    async fn unpublished_events(&self, limit: usize) -> Result<Vec<OutboxEntry>> {
        Ok(self
            .state()
            .outbox
            .iter()
            .filter(|record| record.published_at.is_none())
            .take(limit)
            .map(|record| OutboxEntry {
                id: record.id,
                event: record.event.clone(),
            })
            .collect())
    }

    async fn mark_published(&self, ids: &[i64], published_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state();
        for record in state
            .outbox
            .iter_mut()
            .filter(|record| record.published_at.is_none() && ids.contains(&record.id))
        {
            record.published_at = Some(published_at);
        }
        Ok(())
    }
}

#[async_trait]
impl LoanReadModelTrait for LendingStore {
    async fn find_overdue_loans(
        &self,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Vec<LoanView>> {
        let state = self.state();
        let mut loans: Vec<LoanView> = state
            .loans()
            .filter(|loan| !loan.is_returned() && loan.period().end() < now)
            .map(|loan| LoanView::from_loan(loan, now))
            .collect();
        loans.sort_by_key(|loan| loan.period_end);
        Ok(loans)
    }

    async fn find_active_loans(
        &self,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Vec<LoanView>> {
        let state = self.state();
        let mut loans: Vec<LoanView> = state
            .loans()
            .filter(|loan| !loan.is_returned())
            .map(|loan| LoanView::from_loan(loan, now))
            .collect();
        loans.sort_by_key(|loan| loan.period_end);
        Ok(loans)
    }

    async fn find_by_borrower_id(
        &self,
        borrower_id: BorrowerId,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Vec<LoanView>> {
        let state = self.state();
        let Some(borrower) = state.borrowers.get(&borrower_id) else {
            return Ok(Vec::new());
        };

        let mut loans: Vec<LoanView> = borrower
            .value
            .loans()
            .iter()
            .map(|loan| LoanView::from_loan(loan, now))
            .collect();
        loans.sort_by(|a, b| b.period_start.cmp(&a.period_start));
        Ok(loans)
    }

    async fn get_by_id(
        &self,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Option<LoanView>> {
        Ok(self
            .state()
            .loans()
            .find(|loan| loan.id() == loan_id)
            .map(|loan| LoanView::from_loan(loan, now)))
    }
}
