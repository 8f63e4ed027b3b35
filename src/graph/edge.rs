//! Defines the `EdgeRecord` type, the payload of a publisher -> subscriber dependency.

use super::attrs::Attributes;
use crate::schedule::ExecuteTimes;

/// Data attached to one dependency edge.
///
/// The edge itself only says "the subscriber consumes the publisher's output".
/// `execute_time` optionally pins when along the trading day the subscriber's
/// computation for this input should run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeRecord {
    pub execute_time: Option<ExecuteTimes>,
    pub attrs: Attributes,
}
