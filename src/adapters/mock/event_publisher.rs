use crate::domain::DomainEvent;
use crate::ports::event_publisher::{EventPublisher as EventPublisherTrait, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// EventPublisherのモック実装
///
/// 配信されたイベントを記録する。配信失敗の再現もできる。
#[allow(dead_code)]
pub struct EventPublisher {
    published: Mutex<Vec<DomainEvent>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl EventPublisher {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// テスト用に以降の配信を失敗させる
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// これまでに配信されたイベント
    pub fn published(&self) -> Vec<DomainEvent> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisherTrait for EventPublisher {
    async fn publish(&self, events: &[DomainEvent]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("event publisher is unavailable".into());
        }

        for event in events {
            tracing::debug!(event_type = event.event_type(), "Event published");
        }

        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(events);
        Ok(())
    }
}
