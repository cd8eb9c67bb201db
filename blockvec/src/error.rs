//! Group-wide failure type.

use thiserror::Error;

/// The error every rank receives when the collective health check fails.
///
/// `context` names the operation that voted the group down. The top-level
/// driver is the single place that turns this into a diagnostic line and a
/// failure exit; nothing below it terminates the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("In {context}, {message}")]
pub struct Abort {
    pub context: &'static str,
    pub message: String,
}

impl Abort {
    pub fn new(context: &'static str, message: &str) -> Self {
        Abort {
            context,
            message: message.to_string(),
        }
    }
}
