//! Collection reset between test runs
//!
//! Only the whitelisted collections in [`CollectionName`] are ever touched.
//! `users` keeps its administrative accounts; everything else is emptied.

pub mod collections;
pub mod coordinator;
pub mod outcome;

pub use collections::CollectionName;
pub use coordinator::CollectionResetCoordinator;
pub use outcome::{CollectionFailure, ResetOutcome};
