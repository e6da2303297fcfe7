//! Outbound relay to the external essay grader.
//!
//! [`GradingRelay`] POSTs a JSON payload to the configured grading webhook
//! and captures the reply as text. Transport failures, timeouts and non-2xx
//! statuses never surface as errors: they degrade to a [`RawReply`] with an
//! empty body, which the normalizer turns into placeholder feedback.

pub mod relay;

pub use relay::{GradingRelay, RawReply, RelayConfig, RelayError};
