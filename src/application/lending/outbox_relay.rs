use crate::domain::DomainEvent;

use super::dependencies::ServiceDependencies;
use super::errors::{LendingApplicationError, Result};

/// 1回の読み込みで扱う未配信イベントの件数
pub const OUTBOX_BATCH_SIZE: usize = 100;

/// アウトボックスに残っている未配信イベントを書き込み順に配信する
///
/// コミット直後の配信に失敗したイベントを拾い直すために使う。
/// 配信に失敗した時点で止まり、そのバッチは未配信のまま残る。
///
/// # 戻り値
/// 配信済みにしたイベントの件数
#[tracing::instrument(skip(deps))]
pub async fn publish_pending_events(deps: &ServiceDependencies) -> Result<usize> {
    let mut published = 0;

    loop {
        let entries = deps.store.unpublished_events(OUTBOX_BATCH_SIZE).await?;
        if entries.is_empty() {
            break;
        }

        let batch_len = entries.len();
        let (ids, events): (Vec<i64>, Vec<DomainEvent>) = entries
            .into_iter()
            .map(|entry| (entry.id, entry.event))
            .unzip();

        deps.event_publisher
            .publish(&events)
            .await
            .map_err(LendingApplicationError::PublishError)?;
        deps.store.mark_published(&ids, deps.clock.now()).await?;

        published += batch_len;
        if batch_len < OUTBOX_BATCH_SIZE {
            break;
        }
    }

    if published > 0 {
        tracing::info!(count = published, "Pending events published");
    }
    Ok(published)
}
