use tracing::{info, warn};

use super::{DomainStore, TimerTask};
use crate::connections::{ApiConnection, ConnectionPatch, NewConnection};
use crate::error::{CoreError, EntityKind, Result};
use crate::events::Event;

impl DomainStore {
    pub fn create_connection(&mut self, new: NewConnection) -> Result<String> {
        new.validate()?;
        let connection = new.build();
        let id = connection.id.clone();

        let mut next = self.draft();
        next.connections.push(connection);
        self.publish(
            next,
            Event::ConnectionCreated {
                connection_id: id.clone(),
            },
        );
        Ok(id)
    }

    pub fn update_connection(&mut self, connection_id: &str, patch: ConnectionPatch) -> Result<()> {
        let mut next = self.draft();
        connection_mut(&mut next.connections, connection_id)?.apply(patch)?;
        self.publish(
            next,
            Event::ConnectionUpdated {
                connection_id: connection_id.to_string(),
            },
        );
        Ok(())
    }

    /// Remove a connection and cancel its pending test.
    pub fn remove_connection(&mut self, connection_id: &str) -> Result<()> {
        let mut next = self.draft();
        let index = next
            .connections
            .iter()
            .position(|c| c.id == connection_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Connection, connection_id))?;
        next.connections.remove(index);

        if let Some(handle) = self.owners.connection_tests.remove(connection_id) {
            self.timers.cancel(handle);
        }
        self.publish(
            next,
            Event::ConnectionRemoved {
                connection_id: connection_id.to_string(),
            },
        );
        Ok(())
    }

    /// Schedule a reachability test. The result lands as a
    /// `ConnectionTested` event once the test delay elapses. Testing a
    /// connection that already has a test pending is a no-op.
    pub fn test_connection(&mut self, connection_id: &str) -> Result<()> {
        if self.state.connection(connection_id).is_none() {
            return Err(CoreError::not_found(EntityKind::Connection, connection_id));
        }
        if self.owners.connection_tests.contains_key(connection_id) {
            return Ok(());
        }
        let handle = self.timers.schedule(
            self.config.connections.test_delay_ms,
            TimerTask::ConnectionTest {
                connection_id: connection_id.to_string(),
            },
        );
        self.owners
            .connection_tests
            .insert(connection_id.to_string(), handle);
        Ok(())
    }

    pub fn connection_test_pending(&self, connection_id: &str) -> bool {
        self.owners.connection_tests.contains_key(connection_id)
    }

    pub(super) fn on_connection_test(&mut self, connection_id: &str) {
        let mut next = self.draft();
        let Some(connection) = next.connections.iter_mut().find(|c| c.id == connection_id) else {
            return;
        };

        let result = self.collaborators.probe.probe(connection);
        match &result {
            Ok(()) => info!(connection = %connection.name, "connection test passed"),
            Err(e) => warn!(connection = %connection.name, error = %e, "connection test failed"),
        }
        connection.record_test(result);
        let state = connection.state;

        self.publish(
            next,
            Event::ConnectionTested {
                connection_id: connection_id.to_string(),
                state,
            },
        );
    }
}

fn connection_mut<'a>(connections: &'a mut [ApiConnection], id: &str) -> Result<&'a mut ApiConnection> {
    connections
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| CoreError::not_found(EntityKind::Connection, id))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::super::{Collaborators, DomainStore};
    use crate::connections::{
        ApiConnection, ApiKind, ConnectionPatch, ConnectionProbe, ConnectionState, HttpMethod,
        NewConnection, ProbeError,
    };
    use crate::storage::Config;

    const DELAY: u64 = 1500;

    fn store() -> DomainStore {
        DomainStore::new(Config::default(), Collaborators::in_memory())
    }

    fn weather(url: &str) -> NewConnection {
        NewConnection {
            name: "Weather".into(),
            url: url.into(),
            kind: ApiKind::Rest,
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
            clone_authorized: false,
            interpretation_notes: String::new(),
        }
    }

    #[derive(Default)]
    struct CountingProbe(AtomicUsize);

    impl ConnectionProbe for CountingProbe {
        fn probe(&self, _: &ApiConnection) -> Result<(), ProbeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_resolves_after_delay() {
        let mut store = store();
        let id = store.create_connection(weather("https://api.weather.example/v1")).unwrap();
        store.test_connection(&id).unwrap();
        assert!(store.connection_test_pending(&id));

        store.advance(DELAY - 1);
        assert_eq!(store.state().connection(&id).unwrap().state, ConnectionState::Inactive);

        store.advance(1);
        let connection = store.state().connection(&id).unwrap();
        assert_eq!(connection.state, ConnectionState::Active);
        assert!(connection.last_access.is_some());
        assert!(!store.connection_test_pending(&id));
    }

    #[test]
    fn unreachable_url_records_error() {
        let mut store = store();
        let id = store.create_connection(weather("ftp://files.example")).unwrap();
        store.test_connection(&id).unwrap();
        store.advance(DELAY);
        let connection = store.state().connection(&id).unwrap();
        assert_eq!(connection.state, ConnectionState::Error);
        assert!(connection.last_error.is_some());
    }

    #[test]
    fn repeated_tests_probe_once() {
        let probe = Arc::new(CountingProbe::default());
        let mut store = DomainStore::new(
            Config::default(),
            Collaborators::in_memory().with_probe(Arc::clone(&probe) as Arc<dyn ConnectionProbe>),
        );
        let id = store.create_connection(weather("https://a.example")).unwrap();
        store.test_connection(&id).unwrap();
        store.test_connection(&id).unwrap();
        store.advance(DELAY * 2);
        assert_eq!(probe.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_cancels_pending_test() {
        let probe = Arc::new(CountingProbe::default());
        let mut store = DomainStore::new(
            Config::default(),
            Collaborators::in_memory().with_probe(Arc::clone(&probe) as Arc<dyn ConnectionProbe>),
        );
        let id = store.create_connection(weather("https://a.example")).unwrap();
        store.test_connection(&id).unwrap();
        store.remove_connection(&id).unwrap();
        assert_eq!(store.pending_timers(), 0);

        store.advance(DELAY);
        assert_eq!(probe.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn update_and_missing_ids() {
        let mut store = store();
        let id = store.create_connection(weather("https://a.example")).unwrap();
        store
            .update_connection(
                &id,
                ConnectionPatch {
                    clone_authorized: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.state().connection(&id).unwrap().clone_authorized);

        assert!(store.test_connection("conn-missing").is_err());
        assert!(store.remove_connection("conn-missing").is_err());
        assert!(store
            .update_connection("conn-missing", ConnectionPatch::default())
            .is_err());
        assert!(store.create_connection(weather("")).is_err());
    }
}
