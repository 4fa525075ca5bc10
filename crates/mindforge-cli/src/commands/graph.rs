use clap::Subcommand;
use mindforge_core::synapse::{EdgeKind, Importance, NodeKind};
use mindforge_core::{NewEdge, NewNode};
use serde_json::json;

use super::{open_store, parse_name, print_json, CliResult};

#[derive(Subcommand)]
pub enum GraphAction {
    /// List nodes as JSON
    Nodes,
    /// List edges as JSON
    Edges {
        /// Only edges touching this node
        #[arg(long)]
        node: Option<String>,
    },
    /// Add a node
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "idea", value_parser = parse_name::<NodeKind>)]
        kind: NodeKind,
        #[arg(long, default_value = "medium", value_parser = parse_name::<Importance>)]
        importance: Importance,
    },
    /// Remove a node and its edges
    Remove {
        id: String,
    },
    /// Connect two nodes
    Link {
        source: String,
        target: String,
        /// 0.0 - 1.0
        #[arg(long, default_value = "0.5")]
        strength: f64,
        #[arg(long, default_value = "direct", value_parser = parse_name::<EdgeKind>)]
        kind: EdgeKind,
    },
    /// Remove an edge
    Unlink {
        id: String,
    },
}

pub fn run(action: GraphAction) -> CliResult {
    let (db, mut store) = open_store()?;

    match action {
        GraphAction::Nodes => {
            let nodes: Vec<_> = store
                .state()
                .graph
                .nodes
                .iter()
                .map(|n| {
                    json!({
                        "id": n.id,
                        "title": n.title,
                        "kind": n.kind,
                        "importance": n.importance,
                        "color": n.display_color(),
                        "position": n.position,
                        "source": n.source,
                    })
                })
                .collect();
            print_json(&nodes)?;
        }
        GraphAction::Edges { node } => {
            let graph = &store.state().graph;
            match node {
                Some(node) => print_json(&graph.edges_for(&node).collect::<Vec<_>>())?,
                None => print_json(&graph.edges)?,
            }
        }
        GraphAction::Add {
            title,
            description,
            kind,
            importance,
        } => {
            let id = store.add_node(NewNode {
                title,
                description,
                kind,
                importance,
                position: None,
                color: None,
                source: None,
            })?;
            print_json(&store.state().graph.node(&id))?;
        }
        GraphAction::Remove { id } => {
            let removed_edges = store.remove_node(&id)?;
            print_json(&json!({ "node_id": id, "removed_edges": removed_edges }))?;
        }
        GraphAction::Link {
            source,
            target,
            strength,
            kind,
        } => {
            let id = store.add_edge(NewEdge {
                source_node_id: source,
                target_node_id: target,
                strength,
                kind,
            })?;
            print_json(&json!({ "edge_id": id }))?;
        }
        GraphAction::Unlink { id } => {
            store.remove_edge(&id)?;
            print_json(&json!({ "type": "edge_removed", "edge_id": id }))?;
        }
    }

    store.flush(&db)?;
    Ok(())
}
