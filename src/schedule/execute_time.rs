//! Per-edge execute-time annotations: when along the trading day a
//! subscriber should run its computation for a given publisher.

use crate::error::{GraphError, GraphResult};
use crate::graph::{AttrTarget, GraphStore, NodeId};
use chrono::NaiveTime;
use smallvec::SmallVec;
use tracing::trace;

/// Attribute key under which execute times are reported when missing.
pub const EXECUTE_TIME_KEY: &str = "execute_time";

/// A non-empty, ascending, duplicate-free list of times of day.
///
/// Most edges carry one or two times (open/close), so they are kept inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteTimes(SmallVec<[NaiveTime; 2]>);

impl ExecuteTimes {
    pub fn as_slice(&self) -> &[NaiveTime] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    /// Always false: an empty schedule is rejected at construction.
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn first(&self) -> NaiveTime { self.0[0] }
    pub fn iter(&self) -> impl Iterator<Item = &NaiveTime> { self.0.iter() }

    /// The earliest scheduled time strictly after `t`, if any remains today.
    pub fn next_after(&self, t: NaiveTime) -> Option<NaiveTime> {
        let idx = self.0.partition_point(|&x| x <= t);
        self.0.get(idx).copied()
    }
}

/// What a caller may hand to `set_execute_time`.
///
/// A single time is normalised into a one-element sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteTimeInput {
    Single(NaiveTime),
    Sequence(Vec<NaiveTime>),
    Absent,
}

impl ExecuteTimeInput {
    /// Parses a comma-separated list of `HH:MM` or `HH:MM:SS` values.
    pub fn parse(text: &str) -> GraphResult<Self> {
        let mut times = Vec::new();
        for part in text.split(',').map(str::trim) {
            if part.is_empty() {
                return Err(GraphError::InvalidTime(format!("empty entry in '{}'", text)));
            }
            let t = NaiveTime::parse_from_str(part, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(part, "%H:%M"))
                .map_err(|e| GraphError::InvalidTime(format!("'{}': {}", part, e)))?;
            times.push(t);
        }
        Ok(ExecuteTimeInput::Sequence(times))
    }

    pub fn normalize(self) -> GraphResult<ExecuteTimes> {
        let mut times: SmallVec<[NaiveTime; 2]> = match self {
            ExecuteTimeInput::Single(t) => smallvec::smallvec![t],
            ExecuteTimeInput::Sequence(v) => v.into_iter().collect(),
            ExecuteTimeInput::Absent => {
                return Err(GraphError::InvalidTime("no execute time given".to_string()))
            }
        };
        if times.is_empty() {
            return Err(GraphError::InvalidTime("empty execute time sequence".to_string()));
        }
        times.sort_unstable();
        times.dedup();
        Ok(ExecuteTimes(times))
    }
}

impl From<NaiveTime> for ExecuteTimeInput {
    fn from(t: NaiveTime) -> Self { ExecuteTimeInput::Single(t) }
}

impl From<Vec<NaiveTime>> for ExecuteTimeInput {
    fn from(v: Vec<NaiveTime>) -> Self { ExecuteTimeInput::Sequence(v) }
}

impl From<&[NaiveTime]> for ExecuteTimeInput {
    fn from(v: &[NaiveTime]) -> Self { ExecuteTimeInput::Sequence(v.to_vec()) }
}

impl<T: Into<ExecuteTimeInput>> From<Option<T>> for ExecuteTimeInput {
    fn from(v: Option<T>) -> Self {
        v.map_or(ExecuteTimeInput::Absent, Into::into)
    }
}

impl GraphStore {
    /// Annotates the `publisher -> subscriber` edge with the times its
    /// computation should run. Replaces any previous annotation.
    pub fn set_execute_time(
        &mut self,
        publisher: NodeId,
        subscriber: NodeId,
        times: impl Into<ExecuteTimeInput>,
    ) -> GraphResult<()> {
        let times = times.into().normalize()?;
        trace!(
            publisher = publisher.index(),
            subscriber = subscriber.index(),
            count = times.len(),
            "set execute time"
        );
        self.edge_mut(publisher, subscriber)?.execute_time = Some(times);
        Ok(())
    }

    pub fn get_execute_time(
        &self,
        publisher: NodeId,
        subscriber: NodeId,
    ) -> GraphResult<&ExecuteTimes> {
        self.edge(publisher, subscriber)?
            .execute_time
            .as_ref()
            .ok_or_else(|| GraphError::AttributeNotFound {
                target: AttrTarget::Edge(publisher, subscriber),
                key: EXECUTE_TIME_KEY.to_string(),
            })
    }
}
