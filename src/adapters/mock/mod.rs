pub mod clock;
pub mod event_publisher;
pub mod lending_store;

#[allow(unused_imports)]
pub use clock::Clock;
#[allow(unused_imports)]
pub use event_publisher::EventPublisher;
#[allow(unused_imports)]
pub use lending_store::LendingStore;
