//! Failure reporting for access token validation.
//!
//! Every failed validation is reported exactly once to a
//! [`ValidationLogger`] before being turned into a
//! [`ValidationResult`](crate::ValidationResult). Successful runs are never
//! reported.
//!
//! - [`TracingValidationLogger`]: emits a structured `tracing` event at `ERROR`
//! - [`NoopValidationLogger`]: discards everything
//!
//! Custom implementations can forward failures to an audit sink or a SIEM.

use std::sync::Arc;

/// Receiver of validation failure messages.
pub trait ValidationLogger: Send + Sync {
    /// Records one failure message.
    fn error(&self, message: &str);
}

impl<L: ValidationLogger + ?Sized> ValidationLogger for Arc<L> {
    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Logger that emits `tracing` events.
///
/// Field mapping:
/// - `validation.error`: the failure message
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingValidationLogger;

impl ValidationLogger for TracingValidationLogger {
    fn error(&self, message: &str) {
        tracing::error!(validation.error = %message, "access token validation failed");
    }
}

/// Logger that discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidationLogger;

impl ValidationLogger for NoopValidationLogger {
    fn error(&self, _message: &str) {}
}
