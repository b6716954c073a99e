pub mod clock;
pub mod event_publisher;
pub mod lending_store;
pub mod loan_read_model;

pub use clock::Clock;
pub use event_publisher::EventPublisher;
pub use lending_store::{
    LendingStore, OutboxEntry, Pending, StoreError, UnitOfWork, Versioned,
};
pub use loan_read_model::{LoanReadModel, LoanStatus, LoanView};
