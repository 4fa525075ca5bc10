//! Domain store.
//!
//! The store is the single owner of every slice. Callers read immutable
//! [`Snapshot`]s and change state only through the named actions, each of
//! which either fails without touching anything or applies its whole change
//! at once and then notifies every subscriber synchronously.
//!
//! ## Mutation model
//!
//! Actions build the next state on a private draft and swap it in with
//! `publish`. A failed action drops its draft, so partial updates are never
//! observable. Actions targeting a missing id return
//! [`ReferentialError::NotFound`](crate::error::ReferentialError) and emit no
//! event.
//!
//! ## Timers
//!
//! Simulated asynchronous work (ingestion progress, sleep hints, connection
//! tests, assistant replies) runs on a virtual-clock [`TimerQueue`] driven by
//! [`DomainStore::advance`]. Every scheduled timer has exactly one owner
//! field holding its [`TimerHandle`], and that owner cancels it.

mod connections;
mod habits;
mod ingest;
mod mode;
mod prompts;
mod synapse;
mod training;

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chat::{unanswered, ChatMessage};
use crate::connections::{ApiConnection, ConnectionProbe, UrlProbe};
use crate::error::Result;
use crate::events::Event;
use crate::habits::{suggested_habits, Habit};
use crate::ingest::{Document, DocumentState, KeywordExtractor, TopicExtractor};
use crate::mode::{Mode, ModeEffects, ModeSlice};
use crate::prompts::PromptLibrary;
use crate::storage::{Config, Database, MemoryObjectStore, ObjectStorage};
use crate::synapse::SynapseGraph;
use crate::timer::{TimerHandle, TimerQueue};
use crate::training::{TrainingProgress, TrainingSession};

/// Full store contents at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub documents: Vec<Document>,
    pub sessions: Vec<TrainingSession>,
    pub progress: TrainingProgress,
    pub habits: Vec<Habit>,
    pub graph: SynapseGraph,
    pub prompts: PromptLibrary,
    pub connections: Vec<ApiConnection>,
    pub mode: ModeSlice,
    pub messages: Vec<ChatMessage>,
}

/// Immutable, cheaply clonable view of the store.
pub type Snapshot = Arc<StoreState>;

impl StoreState {
    /// Startup defaults.
    pub fn initial(config: &Config) -> Self {
        let habits = if config.habits.seed_suggestions {
            suggested_habits().into_iter().map(|h| h.build(true)).collect()
        } else {
            Vec::new()
        };
        Self {
            documents: Vec::new(),
            sessions: Vec::new(),
            progress: TrainingProgress::new(config.training.initial_experience_needed),
            habits,
            graph: SynapseGraph::default(),
            prompts: PromptLibrary::default(),
            connections: Vec::new(),
            mode: ModeSlice::default(),
            messages: Vec::new(),
        }
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn documents_in(&self, state: DocumentState) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(move |d| d.state == state)
    }

    pub fn profile_base(&self) -> Option<&Document> {
        self.documents.iter().find(|d| d.is_profile_base)
    }

    pub fn session(&self, id: &str) -> Option<&TrainingSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == id)
    }

    pub fn connection(&self, id: &str) -> Option<&ApiConnection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn mode_effects(&self) -> ModeEffects {
        ModeEffects::derive(&self.mode)
    }
}

/// External collaborators the store calls but does not implement.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn ObjectStorage>,
    pub extractor: Arc<dyn TopicExtractor>,
    pub probe: Arc<dyn ConnectionProbe>,
}

impl Collaborators {
    /// In-process storage, keyword extraction and the offline URL probe.
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryObjectStore::new()),
            extractor: Arc::new(KeywordExtractor::default()),
            probe: Arc::new(UrlProbe),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TopicExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectionProbe>) -> Self {
        self.probe = probe;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TimerTask {
    IngestTick { document_id: String },
    SleepCycle,
    SleepHide,
    ConnectionTest { connection_id: String },
    AssistantReply { in_reply_to: String },
}

/// Owners of every pending timer.
#[derive(Debug, Default)]
struct TimerOwners {
    ingest: HashMap<String, TimerHandle>,
    connection_tests: HashMap<String, TimerHandle>,
    replies: HashMap<String, TimerHandle>,
    sleep_cycle: Option<TimerHandle>,
    sleep_hide: Option<TimerHandle>,
}

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Event, &StoreState)>;

pub struct DomainStore {
    config: Config,
    collaborators: Collaborators,
    state: Snapshot,
    timers: TimerQueue<TimerTask>,
    owners: TimerOwners,
    /// Raw upload bytes, kept until extraction.
    pending_content: HashMap<String, Vec<u8>>,
    rng: Pcg64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for DomainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainStore")
            .field("now_ms", &self.timers.now_ms())
            .field("pending_timers", &self.timers.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl DomainStore {
    /// Create a store with startup defaults.
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let state = StoreState::initial(&config);
        Self::with_state(config, collaborators, state)
    }

    /// Rebuild a store from a flushed snapshot.
    ///
    /// Timers are not persisted: documents still processing get a fresh
    /// ingestion ticker, sleep mode restarts its hint cycle, and outside
    /// sleep every unanswered user message gets its reply scheduled again.
    /// Pending connection tests are dropped; call `test_connection` again.
    pub fn restore(config: Config, collaborators: Collaborators, mut state: StoreState) -> Self {
        state.mode.show_floating_message = false;
        state.mode.floating_message = None;
        let mut store = Self::with_state(config, collaborators, state);

        let processing: Vec<String> = store
            .state
            .documents_in(DocumentState::Processing)
            .map(|d| d.id.clone())
            .collect();
        for id in processing {
            store.arm_ingest(&id);
        }
        if store.state.mode.mode == Mode::Sleep {
            store.arm_sleep_cycle();
        } else {
            let waiting: Vec<String> = unanswered(&store.state.messages)
                .map(|m| m.id.clone())
                .collect();
            for id in waiting {
                store.arm_reply(&id);
            }
        }
        info!(
            documents = store.state.documents.len(),
            pending_timers = store.timers.len(),
            "store restored"
        );
        store
    }

    /// Restore from the database's last flushed snapshot, or start fresh.
    pub fn load(config: Config, collaborators: Collaborators, db: &Database) -> Result<Self> {
        Ok(match db.load_snapshot()? {
            Some(state) => Self::restore(config, collaborators, state),
            None => Self::new(config, collaborators),
        })
    }

    fn with_state(config: Config, collaborators: Collaborators, state: StoreState) -> Self {
        let rng = match config.mode.rng_seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };
        Self {
            config,
            collaborators,
            state: Arc::new(state),
            timers: TimerQueue::new(),
            owners: TimerOwners::default(),
            pending_content: HashMap::new(),
            rng,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current snapshot; stays valid and unchanged after later mutations.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn mode_effects(&self) -> ModeEffects {
        self.state.mode_effects()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a listener called after every mutation with the event and
    /// the new state.
    pub fn subscribe(&mut self, listener: impl FnMut(&Event, &StoreState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ── Mutation plumbing ────────────────────────────────────────────

    fn draft(&self) -> StoreState {
        (*self.state).clone()
    }

    fn publish(&mut self, next: StoreState, event: Event) {
        debug!(?event, "store mutation");
        self.state = Arc::new(next);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event, &self.state);
        }
    }

    // ── Time ─────────────────────────────────────────────────────────

    /// Move virtual time forward by `ms`, firing every timer that falls due.
    /// Timers scheduled by a fire and due within the window fire too.
    pub fn advance(&mut self, ms: u64) {
        let target = self.timers.now_ms().saturating_add(ms);
        while let Some((handle, task)) = self.timers.pop_due(target) {
            self.fire(handle, task);
        }
        self.timers.set_now(target);
    }

    /// Fire timers one at a time, up to `max_ms` ahead, until `done` holds.
    /// Returns whether it did.
    pub fn advance_until(&mut self, max_ms: u64, done: impl Fn(&StoreState) -> bool) -> bool {
        let deadline = self.timers.now_ms().saturating_add(max_ms);
        while !done(&self.state) {
            match self.timers.pop_due(deadline) {
                Some((handle, task)) => self.fire(handle, task),
                None => {
                    self.timers.set_now(deadline);
                    return done(&self.state);
                }
            }
        }
        true
    }

    fn fire(&mut self, handle: TimerHandle, task: TimerTask) {
        debug!(?task, now_ms = self.timers.now_ms(), "timer fired");
        match task {
            TimerTask::IngestTick { document_id } => {
                if self.owners.ingest.get(&document_id) == Some(&handle) {
                    self.owners.ingest.remove(&document_id);
                }
                self.on_ingest_tick(&document_id);
            }
            TimerTask::SleepCycle => {
                if self.owners.sleep_cycle == Some(handle) {
                    self.owners.sleep_cycle = None;
                }
                self.on_sleep_cycle();
            }
            TimerTask::SleepHide => {
                if self.owners.sleep_hide == Some(handle) {
                    self.owners.sleep_hide = None;
                }
                self.on_sleep_hide();
            }
            TimerTask::ConnectionTest { connection_id } => {
                if self.owners.connection_tests.get(&connection_id) == Some(&handle) {
                    self.owners.connection_tests.remove(&connection_id);
                }
                self.on_connection_test(&connection_id);
            }
            TimerTask::AssistantReply { in_reply_to } => {
                if self.owners.replies.get(&in_reply_to) == Some(&handle) {
                    self.owners.replies.remove(&in_reply_to);
                }
                self.on_assistant_reply(&in_reply_to);
            }
        }
    }

    // ── Store-wide actions ───────────────────────────────────────────

    /// Cancel every timer and return to startup defaults. Subscribers stay
    /// registered.
    pub fn reset(&mut self) {
        let cancelled = self.timers.clear();
        self.owners = TimerOwners::default();
        self.pending_content.clear();
        info!(cancelled, "store reset");
        let next = StoreState::initial(&self.config);
        self.publish(next, Event::StoreReset);
    }

    /// Write the current snapshot to persistent storage.
    pub fn flush(&self, db: &Database) -> Result<()> {
        db.save_snapshot(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::habits::{HabitCategory, HabitFrequency, HabitPriority, NewHabit};

    fn test_store() -> DomainStore {
        let mut config = Config::default();
        config.mode.rng_seed = Some(42);
        DomainStore::new(config, Collaborators::in_memory())
    }

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: name.into(),
            description: String::new(),
            category: HabitCategory::Health,
            frequency: HabitFrequency::Daily,
            custom_days: Vec::new(),
            priority: HabitPriority::Medium,
        }
    }

    #[test]
    fn initial_state_seeds_defaults() {
        let store = test_store();
        let state = store.state();
        assert_eq!(state.progress.level, 1);
        assert_eq!(state.progress.experience_needed, 1000);
        assert_eq!(state.progress.achievements.len(), 4);
        assert_eq!(state.habits.len(), 3);
        assert!(state.habits.iter().all(|h| h.ai_suggested));
        assert_eq!(state.mode.mode, Mode::Normal);
    }

    #[test]
    fn subscribers_get_every_mutation_in_order() {
        let mut store = test_store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |event, state| {
            sink.borrow_mut().push((event.clone(), state.habits.len()));
        });

        let a = store.create_habit(new_habit("A")).unwrap();
        store.remove_habit(&a).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0].0, Event::HabitCreated { .. }));
        assert_eq!(seen[0].1, 4);
        assert!(matches!(seen[1].0, Event::HabitRemoved { .. }));
        assert_eq!(seen[1].1, 3);
    }

    #[test]
    fn failed_actions_do_not_notify() {
        let mut store = test_store();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        store.subscribe(move |_, _| *counter.borrow_mut() += 1);

        assert!(store.remove_habit("habit-missing").is_err());
        assert!(store.create_habit(new_habit("  ")).is_err());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut store = test_store();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let id = store.subscribe(move |_, _| *counter.borrow_mut() += 1);

        store.create_habit(new_habit("A")).unwrap();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.create_habit(new_habit("B")).unwrap();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn snapshots_are_immutable() {
        let mut store = test_store();
        let before = store.snapshot();
        store.create_habit(new_habit("A")).unwrap();
        assert_eq!(before.habits.len(), 3);
        assert_eq!(store.snapshot().habits.len(), 4);
    }

    #[test]
    fn reset_restores_defaults_and_cancels_timers() {
        let mut store = test_store();
        store
            .upload_document(crate::ingest::UploadRequest::new("a.txt", b"hello".to_vec()))
            .unwrap();
        store.set_mode(Mode::Sleep);
        assert!(store.pending_timers() > 0);

        store.reset();
        assert_eq!(store.pending_timers(), 0);
        assert!(store.state().documents.is_empty());
        assert_eq!(store.state().mode.mode, Mode::Normal);

        store.advance(60_000);
        assert!(store.state().documents.is_empty());
        assert!(!store.mode_effects().show_floating_message);
    }

    #[test]
    fn flush_and_load_roundtrip() {
        let db = Database::open_memory().unwrap();
        let mut store = test_store();
        store.create_habit(new_habit("Persisted")).unwrap();
        store.flush(&db).unwrap();

        let loaded = DomainStore::load(Config::default(), Collaborators::in_memory(), &db).unwrap();
        assert!(loaded.state().habits.iter().any(|h| h.name == "Persisted"));
    }

    #[test]
    fn restore_rearms_processing_documents() {
        let mut store = test_store();
        let id = store
            .upload_document(crate::ingest::UploadRequest::new("notes.md", b"graph".to_vec()))
            .unwrap();
        store.advance(store.config().ingestion.tick_interval_ms * 3);
        let saved = (*store.snapshot()).clone();

        let mut restored = DomainStore::restore(Config::default(), Collaborators::in_memory(), saved);
        assert_eq!(restored.pending_timers(), 1);
        assert_eq!(restored.state().document(&id).unwrap().progress, 30);

        restored.advance(restored.config().ingestion.tick_interval_ms * 7);
        let doc = restored.state().document(&id).unwrap();
        assert_eq!(doc.state, DocumentState::Completed);
        assert!(!doc.topics.is_empty());
    }

    #[test]
    fn restore_schedules_missing_replies() {
        let mut store = test_store();
        let answered = store.send_message("first").unwrap();
        store.advance(store.config().chat.reply_delay_ms);
        let waiting = store.send_message("second").unwrap();
        let saved = (*store.snapshot()).clone();

        let mut restored = DomainStore::restore(Config::default(), Collaborators::in_memory(), saved);
        assert_eq!(restored.pending_timers(), 1);
        restored.advance(restored.config().chat.reply_delay_ms);

        let replies: Vec<_> = restored
            .state()
            .messages
            .iter()
            .filter_map(|m| m.in_reply_to.clone())
            .collect();
        assert_eq!(replies, vec![answered, waiting]);
    }

    #[test]
    fn restore_restarts_sleep_cycle() {
        let mut store = test_store();
        store.set_mode(Mode::Sleep);
        let saved = (*store.snapshot()).clone();
        let mut config = Config::default();
        config.mode.rng_seed = Some(1);
        let mut restored = DomainStore::restore(config, Collaborators::in_memory(), saved);
        assert!(!restored.mode_effects().show_floating_message);
        restored.advance(restored.config().mode.sleep_message_interval_ms);
        assert!(restored.mode_effects().show_floating_message);
    }
}
