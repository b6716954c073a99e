use crate::domain::{Borrower, BorrowerId, Catalog, CatalogId, Item, ItemId};
use crate::ports::*;
use std::future::Future;
use std::sync::Arc;

use super::errors::{LendingApplicationError, Result};

/// コミットの最大試行回数（競合時に新しい状態で1回だけリトライする）
pub const MAX_COMMIT_ATTEMPTS: u32 = 2;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、各ユースケース関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub store: Arc<dyn LendingStore>,
    pub loan_read_model: Arc<dyn LoanReadModel>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

/// 競合時に操作全体（読み込みから）をやり直す
///
/// `ConcurrencyConflict`以外のエラーはそのまま返す。
/// 最後の試行でも競合した場合は`ConcurrencyConflict`を返す。
pub(super) async fn with_conflict_retry<T, F, Fut>(
    operation: &'static str,
    mut attempt_once: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match attempt_once().await {
            Err(LendingApplicationError::ConcurrencyConflict) if attempt < MAX_COMMIT_ATTEMPTS => {
                tracing::warn!(
                    operation,
                    attempt,
                    "Concurrency conflict on commit, retrying with fresh state"
                );
                attempt += 1;
            }
            Err(LendingApplicationError::ConcurrencyConflict) => {
                tracing::warn!(operation, attempt, "Concurrency conflict persisted after retry");
                return Err(LendingApplicationError::ConcurrencyConflict);
            }
            result => return result,
        }
    }
}

/// コミットし、成功した場合のみイベントを配信する
///
/// 配信に成功したイベントはアウトボックス上で配信済みにする。
/// 配信の失敗はコマンドの失敗にしない。イベントは未配信のまま残り、
/// `publish_pending_events`で後から配信される。
pub(super) async fn commit_and_publish(
    deps: &ServiceDependencies,
    unit_of_work: UnitOfWork,
) -> Result<()> {
    let events = unit_of_work.events.clone();

    let outbox_ids = deps.store.commit(unit_of_work).await?;

    if events.is_empty() {
        return Ok(());
    }

    if let Err(e) = deps.event_publisher.publish(&events).await {
        tracing::error!(
            error = %e,
            event_count = events.len(),
            "Failed to publish events after commit, left unpublished in the outbox"
        );
        return Ok(());
    }

    // 配信済みの記録に失敗した場合は次回の再配信で重複して届く（少なくとも1回の配信）
    if let Err(e) = deps
        .store
        .mark_published(&outbox_ids, deps.clock.now())
        .await
    {
        tracing::warn!(
            error = %e,
            event_count = outbox_ids.len(),
            "Events published but not marked as published"
        );
    }

    Ok(())
}

pub(super) async fn load_borrower(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
) -> Result<Versioned<Borrower>> {
    deps.store
        .load_borrower(borrower_id)
        .await?
        .ok_or(LendingApplicationError::BorrowerNotFound)
}

pub(super) async fn load_item(deps: &ServiceDependencies, item_id: ItemId) -> Result<Versioned<Item>> {
    deps.store
        .load_item(item_id)
        .await?
        .ok_or(LendingApplicationError::ItemNotFound)
}

pub(super) async fn load_catalog(
    deps: &ServiceDependencies,
    catalog_id: CatalogId,
) -> Result<Versioned<Catalog>> {
    deps.store
        .load_catalog(catalog_id)
        .await?
        .ok_or(LendingApplicationError::CatalogNotFound)
}
