use crate::domain::DomainEvent;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// イベント配信ポート
///
/// コミット済みの変更のイベントだけを受け取る。
/// 配信先は検索インデックスの更新や利用者への通知などが考えられる。
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// イベントを発生順に配信する
    async fn publish(&self, events: &[DomainEvent]) -> Result<()>;
}
