use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

///
/// An event type
///
/// Carries everything that stays the same over all occurrences of the event:
/// the display name, the origin (a dotted hierarchical path, e.g. a package or
/// namespace) and the thread/caller path. The number of observed occurrences
/// is derived once when the [`EventLog`] is built.
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Unique non-negative id of the event type (never reused)
    pub id: usize,
    /// Display name
    pub name: String,
    /// Origin of the event as a dotted hierarchical path
    pub origin: String,
    /// Thread or caller path of the event
    pub thread: String,
    /// Number of observed occurrences over the whole log
    pub count: u64,
}

impl Event {
    /// Create a new [`Event`] with an occurrence count of zero
    pub fn new(
        id: usize,
        name: impl Into<String>,
        origin: impl Into<String>,
        thread: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            origin: origin.into(),
            thread: thread.into(),
            count: 0,
        }
    }
}

///
/// A single occurrence of an [`Event`]
///
/// Belongs to exactly one [`Trace`], identified by the case id.
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventInstance {
    /// Id of the [`Event`] type this instance belongs to
    pub event: usize,
    /// Case identifier of the trace this instance belongs to
    pub case_id: String,
    /// Timestamp of the occurrence
    pub timestamp: DateTime<Utc>,
}

///
/// One case's time-ordered sequence of [`EventInstance`]s
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    /// Case identifier
    pub case_id: String,
    /// Event instances, ordered by timestamp
    pub events: Vec<EventInstance>,
}

///
/// Error encountered while building an [`EventLog`]
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// An [`EventInstance`] references an event id outside the known vocabulary
    UnknownEvent {
        /// The offending event id
        event: usize,
        /// Case id of the instance referencing it
        case_id: String,
    },
}

impl std::fmt::Display for EventLogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLogError::UnknownEvent { event, case_id } => write!(
                f,
                "event instance in case {case_id:?} references unknown event id {event}"
            ),
        }
    }
}

impl std::error::Error for EventLogError {}

///
/// An immutable event log: event-type vocabulary plus per-case ordered traces
///
/// Built once via [`EventLog::from_instances`] and read-only afterwards.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    /// Event-type vocabulary
    pub events: Vec<Event>,
    /// Traces, keyed by case id
    pub traces: HashMap<String, Trace>,
}

impl EventLog {
    ///
    /// Build an [`EventLog`] from an event vocabulary and a flat list of instances
    ///
    /// Instances are grouped by case id and each case is sorted by timestamp.
    /// The occurrence `count` of every [`Event`] is derived from the instances,
    /// overwriting whatever count the passed events carried.
    ///
    /// Fails with [`EventLogError::UnknownEvent`] if an instance references an
    /// event id not present in `events`.
    ///
    pub fn from_instances(
        mut events: Vec<Event>,
        instances: Vec<EventInstance>,
    ) -> Result<Self, EventLogError> {
        let mut counts: HashMap<usize, u64> = events.iter().map(|e| (e.id, 0)).collect();
        for instance in &instances {
            match counts.get_mut(&instance.event) {
                Some(c) => *c += 1,
                None => {
                    return Err(EventLogError::UnknownEvent {
                        event: instance.event,
                        case_id: instance.case_id.clone(),
                    })
                }
            }
        }
        for event in &mut events {
            event.count = counts[&event.id];
        }

        let mut traces: HashMap<String, Trace> = HashMap::new();
        for instance in instances {
            traces
                .entry(instance.case_id.clone())
                .or_insert_with(|| Trace {
                    case_id: instance.case_id.clone(),
                    events: Vec::new(),
                })
                .events
                .push(instance);
        }
        // Traces are independent, so establishing the per-case ordering can run in parallel
        traces
            .par_iter_mut()
            .for_each(|(_, t)| t.events.sort_by_key(|e| e.timestamp));

        Ok(Self { events, traces })
    }

    /// Get the event with the given id, if known
    pub fn event_by_id(&self, id: usize) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    ///
    /// The distinct event ids that start at least one trace
    ///
    /// Sorted ascending for deterministic downstream use.
    ///
    pub fn trace_start_events(&self) -> Vec<usize> {
        let mut starts: Vec<usize> = self
            .traces
            .values()
            .filter_map(|t| t.events.first().map(|e| e.event))
            .collect();
        starts.sort_unstable();
        starts.dedup();
        starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn instance(event: usize, case_id: &str, secs: i64) -> EventInstance {
        EventInstance {
            event,
            case_id: case_id.to_string(),
            timestamp: ts(secs),
        }
    }

    #[test]
    fn builds_sorted_traces_and_counts() {
        let events = vec![
            Event::new(0, "a", "app.core", "main"),
            Event::new(1, "b", "app.core", "main"),
        ];
        // Deliberately out of order within the case
        let instances = vec![
            instance(1, "c1", 5),
            instance(0, "c1", 1),
            instance(0, "c2", 2),
        ];
        let log = EventLog::from_instances(events, instances).unwrap();

        assert_eq!(log.traces.len(), 2);
        let c1 = &log.traces["c1"];
        assert_eq!(
            c1.events.iter().map(|e| e.event).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(log.event_by_id(0).unwrap().count, 2);
        assert_eq!(log.event_by_id(1).unwrap().count, 1);
        assert_eq!(log.trace_start_events(), vec![0]);
    }

    #[test]
    fn rejects_unknown_event_ids() {
        let events = vec![Event::new(0, "a", "app", "main")];
        let instances = vec![instance(7, "c1", 0)];
        let err = EventLog::from_instances(events, instances).unwrap_err();
        assert_eq!(
            err,
            EventLogError::UnknownEvent {
                event: 7,
                case_id: "c1".to_string()
            }
        );
    }

    #[test]
    fn empty_log_is_fine() {
        let log = EventLog::from_instances(Vec::new(), Vec::new()).unwrap();
        assert!(log.events.is_empty());
        assert!(log.trace_start_events().is_empty());
    }
}
