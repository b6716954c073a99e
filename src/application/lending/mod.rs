mod catalog_queries;
mod catalog_service;
mod dependencies;
mod errors;
mod loan_queries;
mod loan_service;
mod outbox_relay;

pub use catalog_queries::{ItemView, get_catalog_items, get_item};
pub use catalog_service::{add_item_to_catalog, add_stock, create_catalog, delete_item};
pub use dependencies::{MAX_COMMIT_ATTEMPTS, ServiceDependencies};
pub use errors::{LendingApplicationError, Result};
pub use loan_queries::{get_active_loans, get_borrower_loans, get_loan, get_overdue_loans};
pub use loan_service::{
    MAX_EXTENSION_DAYS, MAX_LOAN_DAYS, MAX_START_AHEAD_DAYS, borrow_item, extend_loan,
    register_borrower, return_item,
};
pub use outbox_relay::{OUTBOX_BATCH_SIZE, publish_pending_events};
