//! Ingestion actions and the per-document progress ticker.

use tracing::{info, warn};

use super::{DomainStore, TimerTask};
use crate::error::{CoreError, EntityKind, Result};
use crate::events::Event;
use crate::ingest::{validate_upload, Document, DocumentState, TickOutcome, UploadRequest};
use crate::storage::UploadMetadata;
use crate::synapse::{Importance, NewNode, NodeKind, NodeSource, SourceKind};
use crate::training::session_for_document;

impl DomainStore {
    /// Validate, upload and start processing a document.
    ///
    /// Rejected uploads create nothing. A storage failure still creates the
    /// document, in the `error` state.
    pub fn upload_document(&mut self, request: UploadRequest) -> Result<String> {
        let ingestion = &self.config.ingestion;
        let kind = validate_upload(&request, &ingestion.allowed_kinds, ingestion.max_upload_bytes)?;

        let mut document = Document::new(request.name.clone(), kind, request.byte_size());
        let metadata = UploadMetadata {
            name: document.name.clone(),
            kind,
            byte_size: document.byte_size,
        };

        match self.collaborators.storage.upload(&request.bytes, &metadata) {
            Ok(receipt) => {
                document.remote_url = Some(receipt.url);
                document.begin_processing()?;
            }
            Err(e) => {
                warn!(document = %document.name, error = %e, "upload failed");
                document.fail(e.to_string())?;
            }
        }

        let id = document.id.clone();
        let state = document.state;
        let name = document.name.clone();

        let mut next = self.draft();
        next.documents.push(document);
        if state == DocumentState::Processing {
            self.pending_content.insert(id.clone(), request.bytes);
            self.arm_ingest(&id);
        }
        self.publish(
            next,
            Event::DocumentUploaded {
                document_id: id.clone(),
                name,
                state,
            },
        );
        Ok(id)
    }

    /// Schedule the next progress tick, replacing any pending one.
    pub(super) fn arm_ingest(&mut self, document_id: &str) {
        if let Some(previous) = self.owners.ingest.remove(document_id) {
            self.timers.cancel(previous);
        }
        let handle = self.timers.schedule(
            self.config.ingestion.tick_interval_ms,
            TimerTask::IngestTick {
                document_id: document_id.to_string(),
            },
        );
        self.owners.ingest.insert(document_id.to_string(), handle);
    }

    pub(super) fn on_ingest_tick(&mut self, document_id: &str) {
        let mut next = self.draft();
        let Some(document) = next.documents.iter_mut().find(|d| d.id == document_id) else {
            return;
        };

        match document.tick(self.config.ingestion.progress_step) {
            Ok(TickOutcome::Advanced(progress)) => {
                self.arm_ingest(document_id);
                self.publish(
                    next,
                    Event::DocumentProgress {
                        document_id: document_id.to_string(),
                        progress,
                    },
                );
            }
            Ok(TickOutcome::Finished) => {
                let content = self.pending_content.remove(document_id).unwrap_or_default();
                let event = match self.collaborators.extractor.extract(document, &content) {
                    Ok(extraction) => match document.complete(extraction) {
                        Ok(()) => {
                            info!(document = %document.name, topics = ?document.topics, "document completed");
                            let completed = document.clone();
                            let (session_id, node_id) = self.seed_from_document(&mut next, &completed);
                            Event::DocumentCompleted {
                                document_id: document_id.to_string(),
                                topics: completed.topics,
                                session_id,
                                node_id,
                            }
                        }
                        Err(e) => {
                            warn!(document_id, error = %e, "document completion rejected");
                            return;
                        }
                    },
                    Err(e) => {
                        warn!(document = %document.name, error = %e, "extraction failed");
                        let message = e.to_string();
                        if document.fail(message.clone()).is_err() {
                            return;
                        }
                        Event::DocumentFailed {
                            document_id: document_id.to_string(),
                            message,
                        }
                    }
                };
                self.publish(next, event);
            }
            // The document left `processing`; the ticker just stops.
            Err(_) => {}
        }
    }

    /// Derived entities for a freshly completed document, gated by config.
    fn seed_from_document(
        &self,
        next: &mut super::StoreState,
        document: &Document,
    ) -> (Option<String>, Option<String>) {
        let session_id = self.config.ingestion.auto_generate_sessions.then(|| {
            let session = session_for_document(document).build(Some(document.id.clone()));
            let id = session.id.clone();
            next.sessions.push(session);
            id
        });

        let node_id = if self.config.ingestion.auto_link_nodes {
            let new = NewNode {
                title: document
                    .topics
                    .first()
                    .cloned()
                    .unwrap_or_else(|| document.name.clone()),
                description: document.keywords.join(", "),
                kind: NodeKind::Concept,
                importance: Importance::Medium,
                position: None,
                color: None,
                source: Some(NodeSource {
                    kind: SourceKind::Document,
                    id: document.id.clone(),
                    name: document.name.clone(),
                }),
            };
            match next.graph.add_node(new) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(document = %document.name, error = %e, "could not link document node");
                    None
                }
            }
        } else {
            None
        };

        (session_id, node_id)
    }

    /// Remove a document and cancel its ticker. The remote copy is removed
    /// on a best-effort basis.
    pub fn remove_document(&mut self, document_id: &str) -> Result<()> {
        let mut next = self.draft();
        let index = next
            .documents
            .iter()
            .position(|d| d.id == document_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Document, document_id))?;
        let removed = next.documents.remove(index);

        if let Some(handle) = self.owners.ingest.remove(document_id) {
            self.timers.cancel(handle);
        }
        self.pending_content.remove(document_id);

        if let Some(url) = &removed.remote_url {
            if let Err(e) = self.collaborators.storage.remove(url) {
                warn!(document = %removed.name, error = %e, "remote remove failed");
            }
        }

        self.publish(
            next,
            Event::DocumentRemoved {
                document_id: document_id.to_string(),
            },
        );
        Ok(())
    }

    /// Returns the new favorite flag.
    pub fn toggle_document_favorite(&mut self, document_id: &str) -> Result<bool> {
        let mut next = self.draft();
        let document = next
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Document, document_id))?;
        document.is_favorite = !document.is_favorite;
        let favorite = document.is_favorite;

        self.publish(
            next,
            Event::DocumentUpdated {
                document_id: document_id.to_string(),
            },
        );
        Ok(favorite)
    }

    /// Make `document_id` the single profile base document.
    pub fn set_profile_base(&mut self, document_id: &str) -> Result<()> {
        let mut next = self.draft();
        if next.document(document_id).is_none() {
            return Err(CoreError::not_found(EntityKind::Document, document_id));
        }
        for document in next.documents.iter_mut() {
            document.is_profile_base = document.id == document_id;
        }

        self.publish(
            next,
            Event::DocumentUpdated {
                document_id: document_id.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::super::{Collaborators, DomainStore};
    use crate::error::{CoreError, ReferentialError, ValidationError};
    use crate::events::Event;
    use crate::ingest::{
        Document, DocumentKind, DocumentState, Extraction, ExtractionError, TopicExtractor,
        UploadRequest,
    };
    use crate::storage::{Config, MemoryObjectStore};
    use crate::synapse::SourceKind;

    const TICK: u64 = 500;

    fn store_with(storage: Arc<MemoryObjectStore>) -> DomainStore {
        DomainStore::new(
            Config::default(),
            Collaborators::in_memory().with_storage(storage),
        )
    }

    fn store() -> DomainStore {
        store_with(Arc::new(MemoryObjectStore::new()))
    }

    struct FailingExtractor;

    impl TopicExtractor for FailingExtractor {
        fn extract(&self, document: &Document, _: &[u8]) -> Result<Extraction, ExtractionError> {
            Err(ExtractionError {
                document: document.name.clone(),
                message: "model unavailable".into(),
            })
        }
    }

    #[test]
    fn pdf_upload_completes_after_ten_ticks() {
        let mut store = store();
        let id = store
            .upload_document(UploadRequest::new("paper.pdf", vec![0u8; 2_000_000]))
            .unwrap();

        let doc = store.state().document(&id).unwrap();
        assert_eq!(doc.state, DocumentState::Processing);
        assert_eq!(doc.progress, 0);

        store.advance(TICK * 9);
        let doc = store.state().document(&id).unwrap();
        assert_eq!(doc.state, DocumentState::Processing);
        assert_eq!(doc.progress, 90);

        store.advance(TICK);
        let doc = store.state().document(&id).unwrap();
        assert_eq!(doc.state, DocumentState::Completed);
        assert_eq!(doc.progress, 100);
        assert!(!doc.topics.is_empty());
        assert_eq!(store.pending_timers(), 0);
    }

    #[test]
    fn progress_events_are_monotonic() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |event, _| {
            if let Event::DocumentProgress { progress, .. } = event {
                sink.borrow_mut().push(*progress);
            }
        });

        store
            .upload_document(UploadRequest::new("notes.txt", b"some text".to_vec()))
            .unwrap();
        store.advance(TICK * 20);

        let seen = seen.borrow();
        assert_eq!(*seen, vec![10, 20, 30, 40, 50, 60, 70, 80, 90]);
    }

    #[test]
    fn completion_seeds_session_and_node() {
        let mut store = store();
        let id = store
            .upload_document(UploadRequest::new(
                "stoicism.md",
                b"virtue virtue control control control".to_vec(),
            ))
            .unwrap();
        store.advance(TICK * 10);

        let state = store.state();
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.sessions[0].source_document_id.as_deref(), Some(id.as_str()));
        assert_eq!(state.graph.nodes.len(), 1);
        let node = &state.graph.nodes[0];
        assert_eq!(node.title, "Control");
        let source = node.source.as_ref().unwrap();
        assert_eq!(source.kind, SourceKind::Document);
        assert_eq!(source.id, id);
    }

    #[test]
    fn seeding_can_be_disabled() {
        let mut config = Config::default();
        config.ingestion.auto_generate_sessions = false;
        config.ingestion.auto_link_nodes = false;
        let mut store = DomainStore::new(config, Collaborators::in_memory());
        store
            .upload_document(UploadRequest::new("a.txt", b"alpha".to_vec()))
            .unwrap();
        store.advance(TICK * 10);
        assert!(store.state().sessions.is_empty());
        assert!(store.state().graph.nodes.is_empty());
    }

    #[test]
    fn rejected_upload_creates_nothing() {
        let mut store = store();
        let err = store
            .upload_document(UploadRequest::new("image.png", vec![1, 2, 3]))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnsupportedFileType { .. })
        ));

        let huge = vec![0u8; 10 * 1024 * 1024 + 1];
        let err = store
            .upload_document(UploadRequest::new("huge.pdf", huge))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::FileTooLarge { .. })
        ));
        assert!(store.state().documents.is_empty());
        assert_eq!(store.pending_timers(), 0);
    }

    #[test]
    fn storage_failure_records_error_state() {
        let storage = Arc::new(MemoryObjectStore::new());
        storage.fail_uploads(true);
        let mut store = store_with(Arc::clone(&storage));

        let id = store
            .upload_document(UploadRequest::new("notes.md", b"hello".to_vec()))
            .unwrap();
        let doc = store.state().document(&id).unwrap();
        assert_eq!(doc.state, DocumentState::Error);
        assert!(doc.error_message.is_some());
        assert_eq!(store.pending_timers(), 0);

        store.advance(TICK * 20);
        assert_eq!(store.state().document(&id).unwrap().state, DocumentState::Error);
    }

    #[test]
    fn extraction_failure_moves_to_error() {
        let mut store = DomainStore::new(
            Config::default(),
            Collaborators::in_memory().with_extractor(Arc::new(FailingExtractor)),
        );
        let id = store
            .upload_document(UploadRequest::new("notes.md", b"hello".to_vec()))
            .unwrap();
        store.advance(TICK * 10);

        let doc = store.state().document(&id).unwrap();
        assert_eq!(doc.state, DocumentState::Error);
        assert_eq!(doc.progress, 100);
        assert!(store.state().sessions.is_empty());
    }

    #[test]
    fn non_utf8_text_document_completes() {
        let mut store = store();
        let id = store
            .upload_document(UploadRequest::new("latin1.txt", b"caf\xe9 recipes recipes".to_vec()))
            .unwrap();
        store.advance(TICK * 10);

        let doc = store.state().document(&id).unwrap();
        assert_eq!(doc.state, DocumentState::Completed);
        assert_eq!(doc.topics[0], "Recipes");
    }

    #[test]
    fn remove_cancels_ticker_and_remote_copy() {
        let storage = Arc::new(MemoryObjectStore::new());
        let mut store = store_with(Arc::clone(&storage));
        let id = store
            .upload_document(UploadRequest::new("a.csv", b"x,y".to_vec()))
            .unwrap();
        let url = store.state().document(&id).unwrap().remote_url.clone().unwrap();
        assert!(storage.contains(&url));

        store.advance(TICK * 3);
        store.remove_document(&id).unwrap();
        assert_eq!(store.pending_timers(), 0);
        assert!(!storage.contains(&url));

        store.advance(TICK * 20);
        assert!(store.state().documents.is_empty());
        assert!(store.state().sessions.is_empty());
    }

    #[test]
    fn remote_remove_failure_is_swallowed() {
        let storage = Arc::new(MemoryObjectStore::new());
        storage.fail_removes(true);
        let mut store = store_with(Arc::clone(&storage));
        let id = store
            .upload_document(UploadRequest::new("a.txt", b"x".to_vec()))
            .unwrap();
        store.remove_document(&id).unwrap();
        assert!(store.state().documents.is_empty());
    }

    #[test]
    fn profile_base_is_exclusive() {
        let mut store = store();
        let a = store.upload_document(UploadRequest::new("a.txt", b"a".to_vec())).unwrap();
        let b = store.upload_document(UploadRequest::new("b.txt", b"b".to_vec())).unwrap();

        store.set_profile_base(&a).unwrap();
        store.set_profile_base(&b).unwrap();
        let bases: Vec<_> = store
            .state()
            .documents
            .iter()
            .filter(|d| d.is_profile_base)
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(bases, vec![b]);
    }

    #[test]
    fn favorite_toggles_and_missing_ids_are_reported() {
        let mut store = store();
        let id = store.upload_document(UploadRequest::new("a.txt", b"a".to_vec())).unwrap();
        assert!(store.toggle_document_favorite(&id).unwrap());
        assert!(!store.toggle_document_favorite(&id).unwrap());

        assert!(matches!(
            store.toggle_document_favorite("doc-missing"),
            Err(CoreError::Referential(ReferentialError::NotFound { .. }))
        ));
        assert!(store.remove_document("doc-missing").is_err());
        assert!(store.set_profile_base("doc-missing").is_err());
    }

    #[test]
    fn caller_can_narrow_accepted_kinds() {
        let mut store = store();
        let request = UploadRequest::new("data.csv", b"a,b".to_vec())
            .accepting(&[DocumentKind::Pdf, DocumentKind::Docx, DocumentKind::Txt]);
        assert!(store.upload_document(request).is_err());
    }
}
