//! Domain logic for essay correction ingestion.
//!
//! - [`normalizer`] -- turns an arbitrary grading reply into canonical [`feedback::Feedback`].
//! - [`correction`] -- ownership check and status-fallback write of a correction.
//! - [`store`] -- the persistence seam implemented by `redacao-db`.

pub mod correction;
pub mod error;
pub mod feedback;
pub mod normalizer;
pub mod store;
pub mod submission;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
