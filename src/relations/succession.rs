use std::collections::HashMap;
use std::io;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::event_log::event_log_struct::{Event, Trace};

///
/// Kind of a mined relation between two events
///
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// One or the other is taken, never both (reserved; never produced by mining)
    ExclusiveChoice,
    /// One-directional precedence
    Sequence,
    /// Both directions observed; order is unknown
    Parallel,
}

impl RelationKind {
    /// The symbol used in the matrix display of a relation table
    pub fn symbol(&self) -> &'static str {
        match self {
            RelationKind::ExclusiveChoice => "?",
            RelationKind::Sequence => ">",
            RelationKind::Parallel => "|",
        }
    }
}

///
/// A directed, weighted relation between two events
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relation {
    /// Source event id
    pub source: usize,
    /// Target event id
    pub target: usize,
    /// Relation kind
    pub kind: RelationKind,
    /// Accumulated weight
    pub weight: u64,
}

impl Relation {
    /// Create a new [`Relation`]
    pub fn new(source: usize, target: usize, kind: RelationKind, weight: u64) -> Self {
        Self {
            source,
            target,
            kind,
            weight,
        }
    }
}

///
/// A k-successor relation table
///
/// Folds traces into a directed, weighted relation table using a bounded
/// lookahead window of `k` trace positions: for the event at position `i`,
/// every event at a position in `(i, i + k]` is considered a successor.
/// A pair observed in only one direction is a [`RelationKind::Sequence`];
/// once the reverse direction is discovered, both entries are reclassified as
/// [`RelationKind::Parallel`].
///
/// The table accumulates over repeated [`KSuccessorTable::add_trace`] calls,
/// once per trace, and is read-only afterwards.
///
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KSuccessorTable {
    /// Maximum lookahead distance within a trace
    pub k: usize,
    /// Mined relations: source id → (target id → relation)
    #[serde_as(as = "Vec<(_, _)>")]
    pub relations: HashMap<usize, HashMap<usize, Relation>>,
}

impl KSuccessorTable {
    /// Create an empty table with the given lookahead
    pub fn new(k: usize) -> Self {
        Self {
            k,
            relations: HashMap::new(),
        }
    }

    ///
    /// Fold one [`Trace`] into the relation table
    ///
    /// May be called repeatedly, once per trace, in any order. Events
    /// referenced by the trace are expected to come from the vocabulary the
    /// log was built against; the log builder already rejects anything else.
    ///
    /// When the new direction of an already-mined pair is discovered, the
    /// existing entry keeps its accumulated weight while the new direction is
    /// seeded with weight 1. This asymmetry matches the reference behavior
    /// and is pinned by tests.
    ///
    pub fn add_trace(&mut self, trace: &Trace) {
        let events = &trace.events;
        for i in 0..events.len() {
            // Look at the next item (j = i + 1) until the trace is exhausted
            // or k followers have been examined (j <= i + k)
            for j in (i + 1)..events.len() {
                if j > i + self.k {
                    break;
                }
                let start = events[i].event;
                let end = events[j].event;

                let exists = self
                    .relations
                    .get(&start)
                    .is_some_and(|m| m.contains_key(&end));
                if exists {
                    if let Some(rel) = self
                        .relations
                        .get_mut(&start)
                        .and_then(|m| m.get_mut(&end))
                    {
                        rel.weight += 1;
                    }
                } else if self
                    .relations
                    .get(&end)
                    .is_some_and(|m| m.contains_key(&start))
                {
                    // The reverse direction was already mined: both become parallel,
                    // the existing entry keeping its weight
                    if let Some(rev) = self
                        .relations
                        .get_mut(&end)
                        .and_then(|m| m.get_mut(&start))
                    {
                        rev.kind = RelationKind::Parallel;
                    }
                    self.relations.entry(start).or_default().insert(
                        end,
                        Relation::new(start, end, RelationKind::Parallel, 1),
                    );
                } else {
                    self.relations.entry(start).or_default().insert(
                        end,
                        Relation::new(start, end, RelationKind::Sequence, 1),
                    );
                }

                // A self-reference closes the window for this position
                if start == end {
                    break;
                }
            }
        }
    }

    /// Get the mined relation from `source` to `target`, if any
    pub fn get(&self, source: usize, target: usize) -> Option<&Relation> {
        self.relations.get(&source)?.get(&target)
    }

    /// Whether any relation with the given source id was mined
    pub fn contains_source(&self, source: usize) -> bool {
        self.relations.contains_key(&source)
    }

    /// Total number of (source, target) entries in the table
    pub fn len(&self) -> usize {
        self.relations.values().map(HashMap::len).sum()
    }

    /// Whether the table holds no relations at all
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    ///
    /// Write the relation table as a CSV matrix
    ///
    /// Header and rows are the event names sorted by name. Cells hold the
    /// relation symbol (`>` sequence, `|` parallel and self-relations on the
    /// diagonal), `<` for the reverse side of a mined sequence and `+` where
    /// no relation was mined.
    ///
    pub fn write_matrix_csv<W: io::Write>(
        &self,
        events: &[Event],
        writer: W,
    ) -> Result<(), csv::Error> {
        let mut events: Vec<&Event> = events.iter().collect();
        events.sort_by(|a, b| a.name.cmp(&b.name));

        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec![String::new()];
        header.extend(events.iter().map(|e| e.name.clone()));
        wtr.write_record(&header)?;

        for row in &events {
            let mut record = vec![row.name.clone()];
            for column in &events {
                let symbol = if let Some(rel) = self.get(row.id, column.id) {
                    if row.id == column.id {
                        "|"
                    } else {
                        rel.kind.symbol()
                    }
                } else if self
                    .get(column.id, row.id)
                    .is_some_and(|r| r.kind == RelationKind::Sequence)
                {
                    "<"
                } else {
                    "+"
                };
                record.push(symbol.to_string());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::trace_of;
    use std::io::Read;

    #[test]
    fn single_trace_mines_sequences() {
        // Scenario: events A(0), B(1), C(2); one trace A,B,C at k=1
        let mut table = KSuccessorTable::new(1);
        table.add_trace(&trace_of("c1", &[0, 1, 2]));

        assert_eq!(table.len(), 2);
        let ab = table.get(0, 1).unwrap();
        assert_eq!(ab.kind, RelationKind::Sequence);
        assert_eq!(ab.weight, 1);
        let bc = table.get(1, 2).unwrap();
        assert_eq!(bc.kind, RelationKind::Sequence);
        assert_eq!(bc.weight, 1);
        assert!(table.get(1, 0).is_none());
    }

    #[test]
    fn reverse_direction_reclassifies_to_parallel() {
        // Traces [A,B] and [B,A]: both directions end as parallel, with the
        // pre-existing direction keeping its accumulated weight and the new
        // one seeded at 1
        let mut table = KSuccessorTable::new(1);
        table.add_trace(&trace_of("c1", &[0, 1]));
        table.add_trace(&trace_of("c2", &[0, 1]));
        table.add_trace(&trace_of("c3", &[1, 0]));

        let ab = table.get(0, 1).unwrap();
        let ba = table.get(1, 0).unwrap();
        assert_eq!(ab.kind, RelationKind::Parallel);
        assert_eq!(ba.kind, RelationKind::Parallel);
        assert_eq!(ab.weight, 2);
        assert_eq!(ba.weight, 1);
    }

    #[test]
    fn parallel_is_symmetric() {
        let mut table = KSuccessorTable::new(2);
        table.add_trace(&trace_of("c1", &[0, 1, 0, 1]));

        for (source, targets) in &table.relations {
            for (target, rel) in targets {
                if rel.kind == RelationKind::Parallel {
                    let rev = table.get(*target, *source);
                    assert!(rev.map_or(true, |r| r.kind == RelationKind::Parallel));
                }
            }
        }
    }

    #[test]
    fn pair_count_is_bounded_by_n_times_k() {
        let mut table = KSuccessorTable::new(2);
        table.add_trace(&trace_of("c1", &[0, 1, 2, 3, 4]));

        // Every examined pair contributes exactly weight 1
        let total_weight: u64 = table
            .relations
            .values()
            .flat_map(|m| m.values())
            .map(|r| r.weight)
            .sum();
        assert!(total_weight <= 5 * 2);
    }

    #[test]
    fn self_reference_closes_the_window() {
        // With k=3 and trace A,A,B the window of the first A stops at the
        // self-relation: no (A,B) pair is mined from position 0
        let mut table = KSuccessorTable::new(3);
        table.add_trace(&trace_of("c1", &[0, 0, 1]));

        let aa = table.get(0, 0).unwrap();
        assert_eq!(aa.kind, RelationKind::Sequence);
        assert_eq!(aa.weight, 1);
        // Only the second A contributes an (A,B) pair
        assert_eq!(table.get(0, 1).unwrap().weight, 1);
    }

    #[test]
    fn matrix_csv_shape() {
        let events = vec![
            Event::new(0, "a", "app", "main"),
            Event::new(1, "b", "app", "main"),
            Event::new(2, "c", "app", "main"),
        ];
        let mut table = KSuccessorTable::new(1);
        table.add_trace(&trace_of("c1", &[0, 1, 2]));

        let mut file = tempfile::tempfile().unwrap();
        table.write_matrix_csv(&events, &file).unwrap();

        use std::io::Seek;
        file.rewind().unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], ",a,b,c");
        assert_eq!(lines[1], "a,+,>,+");
        assert_eq!(lines[2], "b,<,+,>");
        assert_eq!(lines[3], "c,+,<,+");
    }

    #[test]
    fn json_round_trip() {
        let mut table = KSuccessorTable::new(1);
        table.add_trace(&trace_of("c1", &[0, 1]));
        let json = serde_json::to_string(&table).unwrap();
        let back: KSuccessorTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.k, 1);
        assert_eq!(back.get(0, 1), table.get(0, 1));
    }
}
