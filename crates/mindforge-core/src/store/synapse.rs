use super::DomainStore;
use crate::error::Result;
use crate::events::Event;
use crate::synapse::{NewEdge, NewNode, NodePatch};

impl DomainStore {
    pub fn add_node(&mut self, new: NewNode) -> Result<String> {
        let mut next = self.draft();
        let id = next.graph.add_node(new)?;
        self.publish(next, Event::NodeAdded { node_id: id.clone() });
        Ok(id)
    }

    pub fn update_node(&mut self, node_id: &str, patch: NodePatch) -> Result<()> {
        let mut next = self.draft();
        next.graph.update_node(node_id, patch)?;
        self.publish(
            next,
            Event::NodeUpdated {
                node_id: node_id.to_string(),
            },
        );
        Ok(())
    }

    /// Remove a node together with its incident edges. Returns the ids of the
    /// removed edges.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Vec<String>> {
        let mut next = self.draft();
        let removed_edges: Vec<String> = next
            .graph
            .remove_node(node_id)?
            .into_iter()
            .map(|e| e.id)
            .collect();
        self.publish(
            next,
            Event::NodeRemoved {
                node_id: node_id.to_string(),
                removed_edges: removed_edges.clone(),
            },
        );
        Ok(removed_edges)
    }

    /// Connect two existing nodes. Fails with a dangling-edge error when an
    /// endpoint is missing.
    pub fn add_edge(&mut self, new: NewEdge) -> Result<String> {
        let mut next = self.draft();
        let id = next.graph.add_edge(new)?;
        self.publish(next, Event::EdgeAdded { edge_id: id.clone() });
        Ok(id)
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Result<()> {
        let mut next = self.draft();
        next.graph.remove_edge(edge_id)?;
        self.publish(
            next,
            Event::EdgeRemoved {
                edge_id: edge_id.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::super::{Collaborators, DomainStore};
    use crate::error::{CoreError, ReferentialError};
    use crate::events::Event;
    use crate::storage::Config;
    use crate::synapse::{EdgeKind, Importance, NewEdge, NewNode, NodeKind, NodePatch};

    fn store() -> DomainStore {
        DomainStore::new(Config::default(), Collaborators::in_memory())
    }

    fn node(title: &str) -> NewNode {
        NewNode {
            title: title.into(),
            description: String::new(),
            kind: NodeKind::Concept,
            importance: Importance::Low,
            position: None,
            color: None,
            source: None,
        }
    }

    fn edge(a: &str, b: &str) -> NewEdge {
        NewEdge {
            source_node_id: a.into(),
            target_node_id: b.into(),
            strength: 0.5,
            kind: EdgeKind::Direct,
        }
    }

    #[test]
    fn removing_a_node_removes_its_edges() {
        let mut store = store();
        let a = store.add_node(node("A")).unwrap();
        let b = store.add_node(node("B")).unwrap();
        let c = store.add_node(node("C")).unwrap();
        let ab = store.add_edge(edge(&a, &b)).unwrap();
        let bc = store.add_edge(edge(&b, &c)).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event, _| sink.borrow_mut().push(event.clone()));

        let removed = store.remove_node(&b).unwrap();
        assert_eq!(removed, vec![ab.clone(), bc.clone()]);
        assert!(store.state().graph.edges.is_empty());
        assert!(store.state().graph.is_consistent());

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            Event::NodeRemoved {
                node_id: b,
                removed_edges: vec![ab, bc],
            }
        );
    }

    #[test]
    fn dangling_edges_are_rejected() {
        let mut store = store();
        let a = store.add_node(node("A")).unwrap();
        let err = store.add_edge(edge(&a, "node-ghost")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Referential(ReferentialError::DanglingEdge { ref missing }) if missing == "node-ghost"
        ));
        assert!(store.state().graph.edges.is_empty());
    }

    #[test]
    fn strength_must_be_in_unit_range() {
        let mut store = store();
        let a = store.add_node(node("A")).unwrap();
        let b = store.add_node(node("B")).unwrap();
        let mut strong = edge(&a, &b);
        strong.strength = 1.5;
        assert!(store.add_edge(strong).is_err());
        let mut nan = edge(&a, &b);
        nan.strength = f64::NAN;
        assert!(store.add_edge(nan).is_err());
    }

    #[test]
    fn update_changes_derived_color() {
        let mut store = store();
        let a = store.add_node(node("A")).unwrap();
        assert_eq!(store.state().graph.node(&a).unwrap().display_color(), "#94a3b8");
        store
            .update_node(
                &a,
                NodePatch {
                    importance: Some(Importance::High),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.state().graph.node(&a).unwrap().display_color(), "#f59e0b");
    }

    #[test]
    fn missing_ids_are_reported() {
        let mut store = store();
        assert!(store.remove_node("node-missing").is_err());
        assert!(store.remove_edge("edge-missing").is_err());
        assert!(store.update_node("node-missing", NodePatch::default()).is_err());
    }
}
