use chrono::{DateTime, Utc};

use super::{
    AggregateRoot, BookBorrowed, BookReturned, BorrowerError, BorrowerId, DomainEvent, Item,
    ItemId, ItemStatus, Loan, LoanId, LoanPeriod,
};

/// Borrower集約 - 貸出の持ち主
///
/// 自身のLoanを排他的に所有し、1回の貸出・返却でLoanとItemを1つずつ整合させる。
///
/// 不変条件：同じ蔵書に対する貸出中のLoanは常に高々1件
///
/// ここでの重複チェックは高速な事前判定であり、並行実行に対する最終的な保証は
/// 永続化層の楽観的排他制御（トランザクション）が担う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Borrower {
    id: BorrowerId,
    loans: Vec<Loan>,
    events: Vec<DomainEvent>,
}

impl Borrower {
    pub fn new(id: BorrowerId) -> Self {
        Self {
            id,
            loans: Vec::new(),
            events: Vec::new(),
        }
    }

    /// 永続化された状態から復元する（イベントは積まない）
    pub fn restore(id: BorrowerId, loans: Vec<Loan>) -> Self {
        Self {
            id,
            loans,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> BorrowerId {
        self.id
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub fn active_loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.iter().filter(|loan| loan.is_active())
    }

    /// 指定した蔵書の貸出中のLoan
    pub fn active_loan_for(&self, item_id: ItemId) -> Option<&Loan> {
        self.active_loans().find(|loan| loan.item_id() == item_id)
    }

    pub fn loan(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.iter().find(|loan| loan.id() == loan_id)
    }

    /// 蔵書を借りる
    ///
    /// ビジネスルール：
    /// - 蔵書のステータスが`Available`であること
    /// - 同じ蔵書の貸出中のLoanがないこと
    /// - Loanがこの利用者とこの蔵書を参照していること
    ///
    /// 失敗時は利用者・蔵書のどちらも変更しない。
    ///
    /// # エラー
    /// - `BorrowerError::LoanMismatch`
    /// - `BorrowerError::BookNotAvailable`
    /// - `BorrowerError::LoanAlreadyExists`
    /// - `BorrowerError::Item(ItemError::NotAvailable)`（古い読み取りでステータス判定をすり抜けた場合）
    pub fn borrow_item(&mut self, item: &mut Item, loan: Loan) -> Result<(), BorrowerError> {
        if loan.borrower_id() != self.id || loan.item_id() != item.id() {
            return Err(BorrowerError::LoanMismatch);
        }

        if item.status() != ItemStatus::Available {
            return Err(BorrowerError::BookNotAvailable);
        }

        if self.active_loan_for(item.id()).is_some() {
            return Err(BorrowerError::LoanAlreadyExists);
        }

        item.mark_as_borrowed()?;

        let loan_id = loan.id();
        self.loans.push(loan);
        self.events.push(DomainEvent::BookBorrowed(BookBorrowed {
            borrower_id: self.id,
            item_id: item.id(),
            loan_id,
        }));

        Ok(())
    }

    /// 蔵書を返却する
    ///
    /// 貸出中のLoanを返却済みにし、蔵書の貸出可能冊数を1冊戻す。
    /// 蔵書が削除済みでもLoanは返却済みになる（蔵書側は変更なし）。
    ///
    /// # 戻り値
    /// 返却済みになったLoanのID
    ///
    /// # エラー
    /// `BorrowerError::BookNotBorrowed`：この蔵書の貸出中のLoanがない
    pub fn return_item(
        &mut self,
        item: &mut Item,
        returned_at: DateTime<Utc>,
    ) -> Result<LoanId, BorrowerError> {
        let item_id = item.id();
        let loan = self
            .loans
            .iter_mut()
            .find(|loan| loan.is_active() && loan.item_id() == item_id)
            .ok_or(BorrowerError::BookNotBorrowed)?;

        loan.mark_as_returned(returned_at)?;
        item.mark_as_returned();

        let loan_id = loan.id();
        self.events.push(DomainEvent::BookReturned(BookReturned {
            borrower_id: self.id,
            item_id,
            loan_id,
            returned_at,
        }));

        Ok(loan_id)
    }

    /// 自身のLoanを延長する
    ///
    /// # エラー
    /// - `BorrowerError::LoanNotFound`
    /// - `BorrowerError::Loan(..)`：`Loan::extend`のエラー
    pub fn extend_loan(
        &mut self,
        loan_id: LoanId,
        new_period: LoanPeriod,
    ) -> Result<(), BorrowerError> {
        let loan = self
            .loans
            .iter_mut()
            .find(|loan| loan.id() == loan_id)
            .ok_or(BorrowerError::LoanNotFound)?;

        loan.extend(new_period)?;
        Ok(())
    }
}

impl AggregateRoot for Borrower {
    /// 所有するLoanのイベントを先に、続けて利用者自身のイベントを返す
    fn take_events(&mut self) -> Vec<DomainEvent> {
        let mut events: Vec<DomainEvent> = self
            .loans
            .iter_mut()
            .flat_map(|loan| loan.take_events())
            .collect();
        events.append(&mut self.events);
        events
    }
}
