#[cfg(test)]
pub mod test_utils {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::event_log::event_log_struct::{EventInstance, Trace};

    pub fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    /// Build a trace from event ids with one-second timestamp spacing
    pub fn trace_of(case_id: &str, event_ids: &[usize]) -> Trace {
        Trace {
            case_id: case_id.to_string(),
            events: event_ids
                .iter()
                .enumerate()
                .map(|(i, id)| EventInstance {
                    event: *id,
                    case_id: case_id.to_string(),
                    timestamp: ts(i as i64),
                })
                .collect(),
        }
    }
}
