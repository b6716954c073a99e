use crate::ports::Clock;
use chrono::{DateTime, Utc};

/// システム時計（本番用）
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
