use chrono::{DateTime, Duration, TimeZone, Utc};
use rusty_library_lending::adapters::mock::{
    Clock as MockClock, EventPublisher as MockEventPublisher, LendingStore as MockLendingStore,
};
use rusty_library_lending::application::lending::*;
use rusty_library_lending::domain::commands::*;
use rusty_library_lending::domain::*;
use rusty_library_lending::ports::{LendingStore as _, LoanStatus};
use std::sync::Arc;

// ============================================================================
// テスト用のセットアップ
// ============================================================================

struct TestContext {
    deps: ServiceDependencies,
    store: Arc<MockLendingStore>,
    publisher: Arc<MockEventPublisher>,
    clock: Arc<MockClock>,
}

fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

fn setup() -> TestContext {
    let store = Arc::new(MockLendingStore::new());
    let publisher = Arc::new(MockEventPublisher::new());
    let clock = Arc::new(MockClock::new(test_now()));

    let deps = ServiceDependencies {
        store: store.clone(),
        loan_read_model: store.clone(),
        event_publisher: publisher.clone(),
        clock: clock.clone(),
    };

    TestContext {
        deps,
        store,
        publisher,
        clock,
    }
}

fn add_dune(catalog_id: CatalogId, quantity: i64) -> AddItemToCatalog {
    AddItemToCatalog {
        catalog_id,
        title: "Dune".to_string(),
        author_first_name: "Frank".to_string(),
        author_last_name: "Herbert".to_string(),
        author_country: "USA".to_string(),
        quantity,
    }
}

/// 目録・蔵書・利用者を用意する
async fn seed(ctx: &TestContext, quantity: i64) -> (ItemId, BorrowerId) {
    let catalog_id = create_catalog(
        &ctx.deps,
        CreateCatalog {
            name: "Main Library".to_string(),
        },
    )
    .await
    .unwrap();
    let item_id = add_item_to_catalog(&ctx.deps, add_dune(catalog_id, quantity))
        .await
        .unwrap();
    let borrower_id = register_borrower(&ctx.deps).await.unwrap();

    (item_id, borrower_id)
}

async fn borrow_between(
    ctx: &TestContext,
    borrower_id: BorrowerId,
    item_id: ItemId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<LoanId> {
    borrow_item(
        &ctx.deps,
        BorrowItem {
            borrower_id,
            item_id,
            start,
            end,
        },
    )
    .await
}

async fn borrow_for_two_weeks(
    ctx: &TestContext,
    borrower_id: BorrowerId,
    item_id: ItemId,
) -> Result<LoanId> {
    let now = ctx.clock_now();
    borrow_between(ctx, borrower_id, item_id, now, now + Duration::days(14)).await
}

impl TestContext {
    fn clock_now(&self) -> DateTime<Utc> {
        use rusty_library_lending::ports::Clock as _;
        self.clock.now()
    }

    async fn item(&self, item_id: ItemId) -> Item {
        self.store.load_item(item_id).await.unwrap().unwrap().value
    }

    fn outbox_types(&self) -> Vec<&'static str> {
        self.store
            .outbox()
            .iter()
            .map(DomainEvent::event_type)
            .collect()
    }
}

// ============================================================================
// 貸出・返却
// ============================================================================

#[tokio::test]
async fn test_borrow_and_return_round_trip() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;

    let loan_id = borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();

    let item = ctx.item(item_id).await;
    assert_eq!(item.available_copies(), 0);
    assert_eq!(item.status(), ItemStatus::Borrowed);

    ctx.clock.advance(Duration::days(3));
    let returned = return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id,
        },
    )
    .await
    .unwrap();
    assert_eq!(returned, loan_id);

    let item = ctx.item(item_id).await;
    assert_eq!(item.available_copies(), 1);
    assert_eq!(item.total_copies(), 1);
    assert_eq!(item.status(), ItemStatus::Available);

    let loan = get_loan(&ctx.deps, loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Returned);
    assert_eq!(loan.returned_at, Some(test_now() + Duration::days(3)));

    assert_eq!(
        ctx.outbox_types(),
        vec![
            "CatalogCreated",
            "ItemCreated",
            "ItemAddedToCatalog",
            "LoanCreated",
            "BookBorrowed",
            "ItemBorrowed",
            "LoanReturned",
            "BookReturned",
            "ItemReturned",
        ]
    );
    assert_eq!(ctx.publisher.published(), ctx.store.outbox());
}

#[tokio::test]
async fn test_borrow_rejects_item_already_marked_borrowed() {
    // 冊数が残っていてもステータスがBorrowedの間は貸し出さない
    let ctx = setup();
    let (item_id, first) = seed(&ctx, 2).await;
    let second = register_borrower(&ctx.deps).await.unwrap();

    borrow_for_two_weeks(&ctx, first, item_id).await.unwrap();
    let result = borrow_for_two_weeks(&ctx, second, item_id).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        LendingApplicationError::Borrower(BorrowerError::BookNotAvailable)
    ));
    assert_eq!(err.code(), "Borrower.BookNotAvailable");
    assert_eq!(ctx.item(item_id).await.available_copies(), 1);
}

#[tokio::test]
async fn test_borrow_rejects_invalid_period_before_loading() {
    let ctx = setup();
    let now = test_now();

    let result = borrow_item(
        &ctx.deps,
        BorrowItem {
            borrower_id: BorrowerId::new(),
            item_id: ItemId::new(),
            start: now,
            end: now,
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(LendingApplicationError::LoanPeriod(LoanPeriodError::InvalidPeriod))
    ));
}

#[tokio::test]
async fn test_borrow_period_rules_follow_the_clock() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let now = test_now();
    let start_of_today = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

    // 昨日からの貸出は不可
    let yesterday = start_of_today - Duration::minutes(1);
    let err = borrow_between(
        &ctx,
        borrower_id,
        item_id,
        yesterday,
        yesterday + Duration::days(7),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LendingApplicationError::LoanStartInPast));
    assert_eq!(err.code(), "Loan.StartInPast");

    // 開始は1日先まで
    let too_late = now + Duration::days(1) + Duration::seconds(1);
    let err = borrow_between(
        &ctx,
        borrower_id,
        item_id,
        too_late,
        too_late + Duration::days(7),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        LendingApplicationError::LoanStartTooFarAhead { max_days: 1 }
    ));

    // 期間は30日まで
    let err = borrow_between(
        &ctx,
        borrower_id,
        item_id,
        now,
        now + Duration::days(30) + Duration::seconds(1),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        LendingApplicationError::LoanPeriodTooLong { max_days: 30 }
    ));
    assert_eq!(err.code(), "Loan.PeriodTooLong");

    assert_eq!(ctx.item(item_id).await.available_copies(), 1);

    // 今日の0時からちょうど30日は受け付ける
    let loan_id = borrow_between(
        &ctx,
        borrower_id,
        item_id,
        start_of_today,
        start_of_today + Duration::days(30),
    )
    .await
    .unwrap();
    let loan = get_loan(&ctx.deps, loan_id).await.unwrap();
    assert_eq!(loan.period_start, start_of_today);
    assert_eq!(loan.status, LoanStatus::Active);
}

#[tokio::test]
async fn test_borrow_may_start_tomorrow() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let start = test_now() + Duration::days(1);

    let result = borrow_between(&ctx, borrower_id, item_id, start, start + Duration::days(14))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_borrow_unknown_borrower_or_item() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;

    let result = borrow_for_two_weeks(&ctx, BorrowerId::new(), item_id).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::BorrowerNotFound)
    ));

    let result = borrow_for_two_weeks(&ctx, borrower_id, ItemId::new()).await;
    assert!(matches!(result, Err(LendingApplicationError::ItemNotFound)));
}

#[tokio::test]
async fn test_return_without_active_loan() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;

    let result = return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id,
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(LendingApplicationError::Borrower(
            BorrowerError::BookNotBorrowed
        ))
    ));
    assert_eq!(ctx.item(item_id).await.available_copies(), 1);
}

// ============================================================================
// 目録・在庫
// ============================================================================

#[tokio::test]
async fn test_add_item_rejects_duplicate_title_and_author() {
    let ctx = setup();
    let catalog_id = create_catalog(
        &ctx.deps,
        CreateCatalog {
            name: "Main Library".to_string(),
        },
    )
    .await
    .unwrap();

    add_item_to_catalog(&ctx.deps, add_dune(catalog_id, 1))
        .await
        .unwrap();
    let result = add_item_to_catalog(&ctx.deps, add_dune(catalog_id, 3)).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        LendingApplicationError::Catalog(CatalogError::DuplicateItem)
    ));
    assert_eq!(err.code(), "Catalog.DuplicateItem");

    // 国が違えば別の蔵書
    let mut other = add_dune(catalog_id, 1);
    other.author_country = "UK".to_string();
    assert!(add_item_to_catalog(&ctx.deps, other).await.is_ok());
}

#[tokio::test]
async fn test_add_item_rejects_non_positive_quantity() {
    let ctx = setup();
    let catalog_id = create_catalog(
        &ctx.deps,
        CreateCatalog {
            name: "Main Library".to_string(),
        },
    )
    .await
    .unwrap();

    for quantity in [0, -3] {
        let result = add_item_to_catalog(&ctx.deps, add_dune(catalog_id, quantity)).await;
        assert!(matches!(
            result,
            Err(LendingApplicationError::InvalidQuantity)
        ));
    }
}

#[tokio::test]
async fn test_add_item_validates_title_and_catalog() {
    let ctx = setup();

    let mut cmd = add_dune(CatalogId::new(), 1);
    cmd.title = "   ".to_string();
    let result = add_item_to_catalog(&ctx.deps, cmd).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::Validation(ValidationError::EmptyTitle))
    ));

    let result = add_item_to_catalog(&ctx.deps, add_dune(CatalogId::new(), 1)).await;
    assert!(matches!(result, Err(LendingApplicationError::CatalogNotFound)));

    let result = create_catalog(
        &ctx.deps,
        CreateCatalog {
            name: String::new(),
        },
    )
    .await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::Validation(
            ValidationError::EmptyCatalogName
        ))
    ));
}

#[tokio::test]
async fn test_add_stock() {
    let ctx = setup();
    let (item_id, _) = seed(&ctx, 1).await;

    add_stock(&ctx.deps, AddStock { item_id, count: 3 })
        .await
        .unwrap();

    let item = ctx.item(item_id).await;
    assert_eq!(item.total_copies(), 4);
    assert_eq!(item.available_copies(), 4);

    let result = add_stock(&ctx.deps, AddStock { item_id, count: 0 }).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::Item(ItemError::InvalidStockCount))
    ));
}

#[tokio::test]
async fn test_delete_item_rules() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;

    // 貸出可能な冊があるうちは削除できない
    let result = delete_item(&ctx.deps, DeleteItem { item_id }).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::Item(ItemError::StillAvailable))
    ));

    borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();
    delete_item(&ctx.deps, DeleteItem { item_id }).await.unwrap();
    assert_eq!(ctx.item(item_id).await.status(), ItemStatus::Deleted);

    // 削除は終端状態
    let result = delete_item(&ctx.deps, DeleteItem { item_id }).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::Item(ItemError::AlreadyDeleted))
    ));

    let result = add_stock(&ctx.deps, AddStock { item_id, count: 1 }).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::Item(ItemError::AlreadyDeleted))
    ));

    // 削除後でも貸出中だった冊は返却できる
    let loan_id = return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id,
        },
    )
    .await
    .unwrap();

    let loan = get_loan(&ctx.deps, loan_id).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Returned);
    assert!(
        get_borrower_loans(&ctx.deps, borrower_id, true)
            .await
            .unwrap()
            .is_empty()
    );

    // 1年後も延滞にはならない
    ctx.clock.advance(Duration::days(365));
    let overdue = get_overdue_loans(&ctx.deps).await.unwrap();
    assert!(overdue.iter().all(|view| view.loan_id != loan_id));

    let item = ctx.item(item_id).await;
    assert_eq!(item.status(), ItemStatus::Deleted);
    assert_eq!(item.available_copies(), 0);
}

// ============================================================================
// 延長
// ============================================================================

#[tokio::test]
async fn test_extend_loan() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let loan_id = borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();

    let new_end = test_now() + Duration::days(30);
    extend_loan(
        &ctx.deps,
        ExtendLoan {
            borrower_id,
            loan_id,
            new_end,
        },
    )
    .await
    .unwrap();

    let loan = get_loan(&ctx.deps, loan_id).await.unwrap();
    assert_eq!(loan.period_start, test_now() + Duration::days(14));
    assert_eq!(loan.period_end, new_end);
    assert_eq!(ctx.outbox_types().last(), Some(&"LoanExtended"));
}

#[tokio::test]
async fn test_extend_loan_rejects_bad_dates() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let loan_id = borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();

    let extend_to = |new_end| ExtendLoan {
        borrower_id,
        loan_id,
        new_end,
    };

    let result = extend_loan(&ctx.deps, extend_to(test_now() - Duration::hours(1))).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::ExtensionNotInFuture)
    ));

    let result = extend_loan(
        &ctx.deps,
        extend_to(test_now() + Duration::days(MAX_EXTENSION_DAYS + 1)),
    )
    .await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::ExtensionTooLong { max_days: 60 })
    ));

    // 現在の期限より前への「延長」
    let result = extend_loan(&ctx.deps, extend_to(test_now() + Duration::days(7))).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::LoanPeriod(LoanPeriodError::InvalidPeriod))
    ));

    let result = extend_loan(
        &ctx.deps,
        ExtendLoan {
            borrower_id,
            loan_id: LoanId::new(),
            new_end: test_now() + Duration::days(20),
        },
    )
    .await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::Borrower(BorrowerError::LoanNotFound))
    ));
}

#[tokio::test]
async fn test_extend_returned_loan() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let loan_id = borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();
    return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id,
        },
    )
    .await
    .unwrap();

    let result = extend_loan(
        &ctx.deps,
        ExtendLoan {
            borrower_id,
            loan_id,
            new_end: test_now() + Duration::days(20),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(LendingApplicationError::Borrower(BorrowerError::Loan(
            LoanError::AlreadyReturned
        )))
    ));
}

// ============================================================================
// 照会
// ============================================================================

#[tokio::test]
async fn test_overdue_loans_follow_the_clock() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let loan_id = borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();

    assert!(get_overdue_loans(&ctx.deps).await.unwrap().is_empty());

    ctx.clock.advance(Duration::days(15));
    let overdue = get_overdue_loans(&ctx.deps).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].loan_id, loan_id);
    assert_eq!(overdue[0].status, LoanStatus::Overdue);

    let active = get_borrower_loans(&ctx.deps, borrower_id, true)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id,
        },
    )
    .await
    .unwrap();

    assert!(get_overdue_loans(&ctx.deps).await.unwrap().is_empty());
    assert!(
        get_borrower_loans(&ctx.deps, borrower_id, true)
            .await
            .unwrap()
            .is_empty()
    );
    let all = get_borrower_loans(&ctx.deps, borrower_id, false)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, LoanStatus::Returned);
}

#[tokio::test]
async fn test_active_loans_include_overdue_and_exclude_returned() {
    let ctx = setup();
    let (first_item, borrower_id) = seed(&ctx, 1).await;
    let catalog_id = ctx.item(first_item).await.catalog_id();
    let second_item = add_item_to_catalog(
        &ctx.deps,
        AddItemToCatalog {
            catalog_id,
            title: "Hyperion".to_string(),
            author_first_name: "Dan".to_string(),
            author_last_name: "Simmons".to_string(),
            author_country: "USA".to_string(),
            quantity: 1,
        },
    )
    .await
    .unwrap();

    let first_loan = borrow_for_two_weeks(&ctx, borrower_id, first_item)
        .await
        .unwrap();
    ctx.clock.advance(Duration::days(10));
    let second_loan = borrow_for_two_weeks(&ctx, borrower_id, second_item)
        .await
        .unwrap();

    ctx.clock.advance(Duration::days(5));
    let active = get_active_loans(&ctx.deps).await.unwrap();
    let summary: Vec<(LoanId, LoanStatus)> =
        active.iter().map(|loan| (loan.loan_id, loan.status)).collect();
    assert_eq!(
        summary,
        vec![
            (first_loan, LoanStatus::Overdue),
            (second_loan, LoanStatus::Active),
        ]
    );

    return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id: first_item,
        },
    )
    .await
    .unwrap();

    let active = get_active_loans(&ctx.deps).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].loan_id, second_loan);
}

#[tokio::test]
async fn test_item_queries() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let catalog_id = ctx.item(item_id).await.catalog_id();

    let view = get_item(&ctx.deps, item_id).await.unwrap();
    assert_eq!(view.title, "Dune");
    assert_eq!(view.author_last_name, "Herbert");
    assert_eq!(view.catalog_id, catalog_id);
    assert_eq!((view.total_copies, view.available_copies), (1, 1));
    assert!(view.is_available);

    borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();
    let view = get_item(&ctx.deps, item_id).await.unwrap();
    assert_eq!(view.status, ItemStatus::Borrowed);
    assert!(!view.is_available);

    // 削除済みの蔵書も目録に残る
    delete_item(&ctx.deps, DeleteItem { item_id }).await.unwrap();
    let items = get_catalog_items(&ctx.deps, catalog_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item_id, item_id);
    assert_eq!(items[0].status, ItemStatus::Deleted);
    assert!(!items[0].is_available);

    assert!(matches!(
        get_item(&ctx.deps, ItemId::new()).await,
        Err(LendingApplicationError::ItemNotFound)
    ));
    assert!(matches!(
        get_catalog_items(&ctx.deps, CatalogId::new()).await,
        Err(LendingApplicationError::CatalogNotFound)
    ));
}

#[tokio::test]
async fn test_get_unknown_loan() {
    let ctx = setup();
    let result = get_loan(&ctx.deps, LoanId::new()).await;
    assert!(matches!(result, Err(LendingApplicationError::LoanNotFound)));
}

// ============================================================================
// 排他制御・イベント配信
// ============================================================================

#[tokio::test]
async fn test_conflict_is_retried_once() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;

    ctx.store.fail_next_commits(1);
    let result = borrow_for_two_weeks(&ctx, borrower_id, item_id).await;

    assert!(result.is_ok());
    assert_eq!(ctx.item(item_id).await.available_copies(), 0);
}

#[tokio::test]
async fn test_persistent_conflict_surfaces_without_changes() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let outbox_before = ctx.store.outbox().len();

    ctx.store.fail_next_commits(MAX_COMMIT_ATTEMPTS as usize);
    let result = borrow_for_two_weeks(&ctx, borrower_id, item_id).await;

    let err = result.unwrap_err();
    assert!(matches!(err, LendingApplicationError::ConcurrencyConflict));
    assert!(err.is_retryable());
    assert_eq!(ctx.item(item_id).await.available_copies(), 1);
    assert_eq!(ctx.store.outbox().len(), outbox_before);
    assert!(
        get_borrower_loans(&ctx.deps, borrower_id, false)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_publish_failure_does_not_fail_the_command() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let published_before = ctx.publisher.published().len();

    ctx.publisher.set_failing(true);
    let result = borrow_for_two_weeks(&ctx, borrower_id, item_id).await;

    assert!(result.is_ok());
    assert_eq!(ctx.publisher.published().len(), published_before);
    assert_eq!(
        &ctx.outbox_types()[ctx.outbox_types().len() - 3..],
        &["LoanCreated", "BookBorrowed", "ItemBorrowed"]
    );
    assert_eq!(ctx.store.unpublished_count(), 3);
}

#[tokio::test]
async fn test_successful_publish_marks_outbox_entries_published() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;

    borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();

    assert_eq!(ctx.store.unpublished_count(), 0);
    // 再配信するものは何もない
    assert_eq!(publish_pending_events(&ctx.deps).await.unwrap(), 0);
    assert_eq!(ctx.publisher.published(), ctx.store.outbox());
}

#[tokio::test]
async fn test_unpublished_events_are_delivered_later_in_order() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let published_before = ctx.publisher.published().len();

    ctx.publisher.set_failing(true);
    borrow_for_two_weeks(&ctx, borrower_id, item_id)
        .await
        .unwrap();
    ctx.clock.advance(Duration::days(1));
    return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id,
        },
    )
    .await
    .unwrap();
    assert_eq!(ctx.store.unpublished_count(), 6);

    // 配信先が復旧していなければ何も配信済みにならない
    let result = publish_pending_events(&ctx.deps).await;
    assert!(matches!(
        result,
        Err(LendingApplicationError::PublishError(_))
    ));
    assert_eq!(ctx.store.unpublished_count(), 6);

    ctx.publisher.set_failing(false);
    assert_eq!(publish_pending_events(&ctx.deps).await.unwrap(), 6);
    assert_eq!(ctx.store.unpublished_count(), 0);

    let redelivered: Vec<&'static str> = ctx.publisher.published()[published_before..]
        .iter()
        .map(DomainEvent::event_type)
        .collect();
    assert_eq!(
        redelivered,
        [
            "LoanCreated",
            "BookBorrowed",
            "ItemBorrowed",
            "LoanReturned",
            "BookReturned",
            "ItemReturned",
        ]
    );

    // 一度配信済みになったものは再配信されない
    assert_eq!(publish_pending_events(&ctx.deps).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_command_publishes_nothing() {
    let ctx = setup();
    let (item_id, borrower_id) = seed(&ctx, 1).await;
    let published_before = ctx.publisher.published().len();

    let result = return_item(
        &ctx.deps,
        ReturnItem {
            borrower_id,
            item_id,
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(ctx.publisher.published().len(), published_before);
}
