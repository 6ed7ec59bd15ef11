use std::path::Path;

use crate::flow_model::flow_model_struct::{FlowModel, FlowNodeKind};
use crate::relations::succession::RelationKind;

use super::{edge_batches, node_batches};

///
/// Error encountered while exporting to a kuzu database
///
#[derive(Debug)]
pub enum GraphDBExportError {
    /// Error originating in kuzu
    KuzuDBError(kuzu::Error),
    /// General IO Error (e.g., when creating the database file)
    IOError(std::io::Error),
}

impl std::fmt::Display for GraphDBExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to export to kuzudb: {self:?}")
    }
}

impl std::error::Error for GraphDBExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphDBExportError::KuzuDBError(e) => Some(e),
            GraphDBExportError::IOError(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for GraphDBExportError {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

impl From<kuzu::Error> for GraphDBExportError {
    fn from(e: kuzu::Error) -> Self {
        Self::KuzuDBError(e)
    }
}

fn kind_label(kind: FlowNodeKind) -> &'static str {
    match kind {
        FlowNodeKind::Activity => "Activity",
        FlowNodeKind::Start => "Start",
        FlowNodeKind::End => "End",
    }
}

fn relation_table(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::Sequence => "SEQUENCE",
        RelationKind::Parallel => "PARALLEL",
        RelationKind::ExclusiveChoice => "EXCLUSIVE_CHOICE",
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

///
/// Export a [`FlowModel`] as a [kuzu](https://github.com/kuzudb/kuzu) database
///
/// Nodes are written in batches grouped by their kind, edges in batches
/// grouped by their relation kind (see [`super::node_batches`] and
/// [`super::edge_batches`] for the batch limits). Every row is applied with
/// `MERGE` on its key, so re-running the export against the same database
/// never duplicates nodes or relationships, and a failure mid-export leaves
/// the already-written batches intact.
///
pub fn export_flow_model_to_kuzudb<P: AsRef<Path>>(
    db_path: P,
    model: &FlowModel,
) -> Result<(), GraphDBExportError> {
    use kuzu::{Connection, Database, SystemConfig};

    let db = Database::new(db_path, SystemConfig::default())?;
    let conn = Connection::new(&db)?;

    conn.query(
        "CREATE NODE TABLE IF NOT EXISTS FlowNode(id INT64 PRIMARY KEY, label STRING, kind STRING);",
    )?;
    for kind in [
        RelationKind::Sequence,
        RelationKind::Parallel,
        RelationKind::ExclusiveChoice,
    ] {
        conn.query(&format!(
            "CREATE REL TABLE IF NOT EXISTS {}(FROM FlowNode TO FlowNode, weight INT64);",
            relation_table(kind)
        ))?;
    }

    for (kind, batch) in node_batches(&model.nodes) {
        for node in batch {
            conn.query(&format!(
                "MERGE (n:FlowNode {{id: {}}}) ON CREATE SET n.label = '{label}', n.kind = '{kind}' ON MATCH SET n.label = '{label}', n.kind = '{kind}';",
                node.id,
                label = escape(&node.label),
                kind = kind_label(kind),
            ))?;
        }
    }

    for (kind, batch) in edge_batches(model) {
        let table = relation_table(kind);
        for relation in batch {
            conn.query(&format!(
                "MATCH (a:FlowNode {{id: {}}}), (b:FlowNode {{id: {}}}) \
                 MERGE (a)-[r:{table}]->(b) ON CREATE SET r.weight = {weight} ON MATCH SET r.weight = {weight};",
                relation.source,
                relation.target,
                weight = relation.weight,
            ))?;
        }
    }
    Ok(())
}
