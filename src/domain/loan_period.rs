use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LoanPeriodError;

/// 貸出期間
///
/// 不変条件：`end > start`
/// 生成後は変更できない。延長は新しいLoanPeriodへの置き換えで表現する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PeriodBounds")]
pub struct LoanPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PeriodBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<PeriodBounds> for LoanPeriod {
    type Error = LoanPeriodError;

    fn try_from(bounds: PeriodBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl LoanPeriod {
    /// # エラー
    /// `end <= start` の場合は`LoanPeriodError::InvalidPeriod`を返す
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, LoanPeriodError> {
        if end <= start {
            return Err(LoanPeriodError::InvalidPeriod);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// 期限を過ぎているか（終了時刻ちょうどはまだ期限内）
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now > self.end
    }

    /// 期間内か（両端を含む）
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now >= self.start && now <= self.end
    }

    /// この期間の後に続けられるか
    ///
    /// 延長は現在の終了時刻以降に始まる必要がある（接していてもよい）。
    pub fn can_be_followed_by(&self, next: &LoanPeriod) -> bool {
        next.start >= self.end
    }
}
