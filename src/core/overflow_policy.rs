//! Overflow policies for bounded executor queues
//!
//! An asynchronous backend may cap how many writes wait on its worker. The
//! policy decides what a full queue does to the caller. Entries already queued
//! are never evicted, so there is no drop-oldest policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy for handling a full queue
///
/// # Example
///
/// ```
/// use rust_logit::backends::RotatingFileConfig;
/// use rust_logit::OverflowPolicy;
///
/// // At most 1024 queued writes; callers wait for room
/// let config = RotatingFileConfig::new("logs").with_queue_limit(1024, OverflowPolicy::Block);
/// assert_eq!(config.max_queue_size, Some(1024));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Block the caller until the worker makes room
    #[default]
    Block,

    /// Reject the new entry and count it as dropped
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}
