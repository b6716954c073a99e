pub mod borrower;
pub mod catalog;
pub mod commands;
pub mod errors;
pub mod events;
pub mod item;
pub mod loan;
pub mod loan_period;
pub mod value_objects;

pub use borrower::Borrower;
pub use catalog::Catalog;
pub use errors::*;
pub use events::*;
pub use item::{Item, ItemStatus};
pub use loan::{Loan, LoanState};
pub use loan_period::LoanPeriod;
pub use value_objects::*;
