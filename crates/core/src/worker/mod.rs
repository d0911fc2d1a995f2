//! Background catalog worker.
//!
//! Keeps the catalog in step with the ROM folder: archives whose file
//! changed are hashed and their entry replaced, archives gone from disk are
//! removed. Every change is written through to persistence.

mod runner;
mod types;

pub use runner::CatalogWorker;
pub use types::{ProcessOutcome, WorkerError};
