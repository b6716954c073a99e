use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AggregateRoot, BorrowerId, DomainEvent, ItemId, LoanCreated, LoanError, LoanExtended, LoanId,
    LoanPeriod, LoanReturned,
};

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// 貸出の状態
///
/// 返却日時は`Returned`状態にしか存在しないため、
/// 「返却済み ⇔ 返却日時がある」は型で保証される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoanState {
    /// 貸出中
    Active,
    /// 返却済み（終端状態）
    Returned { returned_at: DateTime<Utc> },
}

/// Loan集約 - 1冊の1回の貸出
///
/// 利用者と蔵書はIDでのみ参照する（所有しない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    // 識別子
    id: LoanId,

    // 他の集約への参照（IDのみ）
    borrower_id: BorrowerId,
    item_id: ItemId,

    // 貸出管理の責務
    period: LoanPeriod,
    state: LoanState,

    events: Vec<DomainEvent>,
}

impl Loan {
    /// 新しい貸出を作成する
    ///
    /// 期間は`LoanPeriod`の生成時に検証済みのため、作成は常に成功する。
    /// `LoanCreated`イベントを積む。
    pub fn create(
        id: LoanId,
        borrower_id: BorrowerId,
        item_id: ItemId,
        period: LoanPeriod,
    ) -> Self {
        let mut loan = Self {
            id,
            borrower_id,
            item_id,
            period,
            state: LoanState::Active,
            events: Vec::new(),
        };

        loan.events.push(DomainEvent::LoanCreated(LoanCreated {
            loan_id: id,
            borrower_id,
            item_id,
            period,
        }));

        loan
    }

    /// 永続化された状態から復元する（イベントは積まない）
    pub fn restore(
        id: LoanId,
        borrower_id: BorrowerId,
        item_id: ItemId,
        period: LoanPeriod,
        returned_at: Option<DateTime<Utc>>,
    ) -> Self {
        let state = match returned_at {
            Some(returned_at) => LoanState::Returned { returned_at },
            None => LoanState::Active,
        };

        Self {
            id,
            borrower_id,
            item_id,
            period,
            state,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn borrower_id(&self) -> BorrowerId {
        self.borrower_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn period(&self) -> LoanPeriod {
        self.period
    }

    pub fn state(&self) -> LoanState {
        self.state
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            LoanState::Active => None,
            LoanState::Returned { returned_at } => Some(returned_at),
        }
    }

    pub fn is_returned(&self) -> bool {
        matches!(self.state, LoanState::Returned { .. })
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, LoanState::Active)
    }

    /// 貸出中かつ期限切れか
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.period.is_overdue(now)
    }

    /// 返却済みにする（Active → Returned）
    ///
    /// # エラー
    /// 既に返却済みの場合は`LoanError::AlreadyReturned`を返し、返却日時は変更しない
    pub fn mark_as_returned(&mut self, returned_at: DateTime<Utc>) -> Result<(), LoanError> {
        if self.is_returned() {
            return Err(LoanError::AlreadyReturned);
        }

        self.state = LoanState::Returned { returned_at };
        self.events.push(DomainEvent::LoanReturned(LoanReturned {
            loan_id: self.id,
            borrower_id: self.borrower_id,
            item_id: self.item_id,
            returned_at,
        }));

        Ok(())
    }

    /// 貸出期間を延長する
    ///
    /// ビジネスルール：
    /// - 新しい期間は現在の終了時刻以降に始まること（接するのは可、重なるのは不可）
    /// - 貸出中のみ延長可能
    ///
    /// 両方に違反する場合は期間のエラーを優先する。
    ///
    /// # エラー
    /// - 新しい期間が現在の終了より前に始まる：`LoanError::InvalidExtension`
    /// - 返却済み：`LoanError::AlreadyReturned`
    pub fn extend(&mut self, new_period: LoanPeriod) -> Result<(), LoanError> {
        if !self.period.can_be_followed_by(&new_period) {
            return Err(LoanError::InvalidExtension);
        }

        if self.is_returned() {
            return Err(LoanError::AlreadyReturned);
        }

        let old_period = self.period;
        self.period = new_period;
        self.events.push(DomainEvent::LoanExtended(LoanExtended {
            loan_id: self.id,
            old_period,
            new_period,
        }));

        Ok(())
    }
}

impl AggregateRoot for Loan {
    fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}
