//! Tracing decorator logic.
//!
//! Generated trace methods open a span named after the method (or the
//! policy's override) with the configured argument attributes, then run the
//! inner call through [`traced`]. The span must declare an
//! `otel.status_code` field, left empty, so a failure can be recorded on it.

use std::fmt::Display;
use std::future::Future;

use tracing::{Instrument, Span};

/// Field recorded on the span when the call fails.
pub const STATUS_FIELD: &str = "otel.status_code";

/// Value recorded in [`STATUS_FIELD`] for a failed call.
pub const STATUS_ERROR: &str = "ERROR";

/// Run `call` inside `span`. An `Err` outcome marks the span as failed and
/// emits an error event carrying the error text. The result is returned
/// unchanged.
pub async fn traced<T, E, Fut>(span: Span, call: Fut) -> Result<T, E>
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    let result = call.instrument(span.clone()).await;
    if let Err(err) = &result {
        span.record(STATUS_FIELD, STATUS_ERROR);
        tracing::error!(parent: &span, error = %err, "call failed");
    }
    result
}
