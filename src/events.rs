//! Projections over a task's progress log.
//!
//! Selection is first-match in log order. A task that goes done, gets
//! reopened, and is finished again is measured from its *first* done event.
//! A description naming a transition ("Moved from Done to In Progress")
//! only marks the state it moves into.

use chrono::{DateTime, Utc};

use crate::model::{EventKind, ProgressEvent};

/// Well-known transitions recorded in a progress log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    EnteredInProgress,
    EnteredDone,
}

impl Marker {
    pub fn matches(self, event: &ProgressEvent) -> bool {
        if event.kind != EventKind::StatusChange {
            return false;
        }
        let desc = event.description.to_lowercase();
        let target = destination(&desc);
        match self {
            Marker::EnteredInProgress => {
                target.contains("in progress") || target.contains("inprogress")
            }
            Marker::EnteredDone => target.contains("done") || target.contains("completed"),
        }
    }
}

/// The state a transition description moves into: the text after the last
/// ` to ` or `->`, or the whole description when it names no transition.
fn destination(desc: &str) -> &str {
    [" to ", "->"]
        .iter()
        .filter_map(|sep| desc.rfind(sep).map(|i| i + sep.len()))
        .max()
        .map_or(desc, |start| &desc[start..])
}

/// The first entry, in log order, satisfying `predicate`.
pub fn first_event_matching<P>(log: &[ProgressEvent], predicate: P) -> Option<&ProgressEvent>
where
    P: Fn(&ProgressEvent) -> bool,
{
    log.iter().find(|e| predicate(e))
}

/// Timestamp of the first event matching `marker`.
pub fn marker_instant(log: &[ProgressEvent], marker: Marker) -> Option<DateTime<Utc>> {
    first_event_matching(log, |e| marker.matches(e)).map(|e| e.timestamp)
}
