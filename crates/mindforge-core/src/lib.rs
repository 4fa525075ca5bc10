//! # Mindforge Core Library
//!
//! This library provides the domain engine behind Mindforge, a personal
//! knowledge and self-improvement assistant. Every operation goes through a
//! single [`DomainStore`]; the `mindforge-cli` binary is a thin front end over
//! the same library.
//!
//! ## Architecture
//!
//! - **Domain Store**: sole owner of every slice. Callers read immutable
//!   snapshots and mutate only through named actions, each followed by one
//!   [`Event`] to every subscriber
//! - **Timer Queue**: virtual clock the caller advances; all simulated async
//!   work (ingestion progress, sleep hints, connection tests, replies) is a
//!   timer fire
//! - **Ingestion**: per-document state machine with pluggable topic extraction
//! - **Training**: sessions, blocks, leveling and achievements
//! - **Habits**, **Synapse** graph, **Prompts**, **API connections**, **Mode**
//! - **Storage**: TOML configuration and a SQLite snapshot store
//!
//! ## Key Components
//!
//! - [`DomainStore`]: the store and all mutation actions
//! - [`TimerQueue`]: cancellable virtual-clock scheduling
//! - [`Config`]: application configuration management
//! - [`Database`]: snapshot and flag persistence
//! - [`ObjectStorage`], [`TopicExtractor`], [`ConnectionProbe`]: collaborator
//!   traits

pub mod chat;
pub mod connections;
pub mod error;
pub mod events;
pub mod habits;
pub mod ingest;
pub mod mode;
pub mod prompts;
pub mod storage;
pub mod store;
pub mod synapse;
pub mod timer;
pub mod training;

pub use chat::{ChatMessage, Role};
pub use connections::{ApiConnection, ConnectionProbe, ConnectionState, NewConnection, UrlProbe};
pub use error::{
    ConfigError, CoreError, DatabaseError, ReferentialError, StorageError, TransitionError,
    ValidationError,
};
pub use events::Event;
pub use habits::{Habit, NewHabit};
pub use ingest::{Document, DocumentKind, DocumentState, KeywordExtractor, TopicExtractor, UploadRequest};
pub use mode::{Mode, ModeEffects};
pub use prompts::{NewPrompt, Prompt};
pub use storage::{Config, Database, MemoryObjectStore, ObjectStorage};
pub use store::{Collaborators, DomainStore, Snapshot, StoreState, SubscriptionId};
pub use synapse::{NewEdge, NewNode, SynapseGraph};
pub use timer::{drive, TimerHandle, TimerQueue};
pub use training::{NewSession, TrainingProgress, TrainingSession};
