//! Synapse knowledge graph: a node/edge registry with referential integrity.
//!
//! Every edge references two nodes that exist. Adding an edge with a missing
//! endpoint fails, and removing a node removes its incident edges with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, EntityKind, ReferentialError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Idea,
    Concept,
    Memory,
    Learning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Medium,
    High,
}

impl Importance {
    pub fn color(self) -> &'static str {
        match self {
            Importance::Low => "#94a3b8",
            Importance::Medium => "#3b82f6",
            Importance::High => "#f59e0b",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Document,
    Session,
    Interaction,
}

/// Where a node came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSource {
    pub kind: SourceKind,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseNode {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: NodeKind,
    pub importance: Importance,
    pub position: Position,
    /// Explicit colour; the importance colour is used when unset.
    pub color: Option<String>,
    pub source: Option<NodeSource>,
    pub created_at: DateTime<Utc>,
}

impl SynapseNode {
    pub fn display_color(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| self.importance.color())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Direct,
    Indirect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseEdge {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    /// 0.0 ..= 1.0
    pub strength: f64,
    pub kind: EdgeKind,
}

impl SynapseEdge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub title: String,
    pub description: String,
    pub kind: NodeKind,
    pub importance: Importance,
    /// Laid out automatically when unset.
    pub position: Option<Position>,
    pub color: Option<String>,
    pub source: Option<NodeSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<NodeKind>,
    pub importance: Option<Importance>,
    pub position: Option<Position>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    pub source_node_id: String,
    pub target_node_id: String,
    pub strength: f64,
    pub kind: EdgeKind,
}

/// Node and edge registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynapseGraph {
    pub nodes: Vec<SynapseNode>,
    pub edges: Vec<SynapseEdge>,
}

/// Golden-angle spiral so generated nodes do not stack on each other.
pub fn spiral_position(index: usize) -> Position {
    const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
    const SPACING: f64 = 60.0;
    let i = index as f64;
    let radius = SPACING * i.sqrt();
    Position {
        x: radius * (i * GOLDEN_ANGLE).cos(),
        y: radius * (i * GOLDEN_ANGLE).sin(),
    }
}

impl SynapseGraph {
    pub fn node(&self, id: &str) -> Option<&SynapseNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Edges with `node_id` at either end, in insertion order.
    pub fn edges_for<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a SynapseEdge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    pub fn add_node(&mut self, new: NewNode) -> Result<String, ValidationError> {
        if new.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        let node = SynapseNode {
            id: format!("node-{}", uuid::Uuid::new_v4()),
            title: new.title,
            description: new.description,
            kind: new.kind,
            importance: new.importance,
            position: new
                .position
                .unwrap_or_else(|| spiral_position(self.nodes.len())),
            color: new.color,
            source: new.source,
            created_at: Utc::now(),
        };
        let id = node.id.clone();
        self.nodes.push(node);
        Ok(id)
    }

    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<(), CoreError> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ValidationError::MissingField("title").into());
        }
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Node, id))?;

        if let Some(title) = patch.title {
            node.title = title;
        }
        if let Some(description) = patch.description {
            node.description = description;
        }
        if let Some(kind) = patch.kind {
            node.kind = kind;
        }
        if let Some(importance) = patch.importance {
            node.importance = importance;
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(color) = patch.color {
            node.color = Some(color);
        }
        Ok(())
    }

    /// Remove a node and every edge incident to it. Returns the removed edges.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<SynapseEdge>, CoreError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Node, id))?;
        self.nodes.remove(index);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.touches(id));
        self.edges = kept;
        Ok(removed)
    }

    pub fn add_edge(&mut self, new: NewEdge) -> Result<String, CoreError> {
        if !new.strength.is_finite() || !(0.0..=1.0).contains(&new.strength) {
            return Err(ValidationError::InvalidValue {
                field: "strength",
                message: format!("{} is outside 0.0..=1.0", new.strength),
            }
            .into());
        }
        for endpoint in [&new.source_node_id, &new.target_node_id] {
            if !self.contains_node(endpoint) {
                return Err(ReferentialError::DanglingEdge {
                    missing: endpoint.clone(),
                }
                .into());
            }
        }

        let edge = SynapseEdge {
            id: format!("edge-{}", uuid::Uuid::new_v4()),
            source_node_id: new.source_node_id,
            target_node_id: new.target_node_id,
            strength: new.strength,
            kind: new.kind,
        };
        let id = edge.id.clone();
        self.edges.push(edge);
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<SynapseEdge, CoreError> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Edge, id))?;
        Ok(self.edges.remove(index))
    }

    /// Whether every edge endpoint resolves to a node.
    pub fn is_consistent(&self) -> bool {
        self.edges
            .iter()
            .all(|e| self.contains_node(&e.source_node_id) && self.contains_node(&e.target_node_id))
    }
}
