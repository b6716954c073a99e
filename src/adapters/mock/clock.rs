use crate::ports::clock::Clock as ClockTrait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, PoisonError};

/// Clockのモック実装
///
/// 固定の時刻を返す。テストから進めることができる。
#[allow(dead_code)]
pub struct Clock {
    now: Mutex<DateTime<Utc>>,
}

#[allow(dead_code)]
impl Clock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += duration;
    }
}

impl ClockTrait for Clock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
