//! Knowledge ingestion: documents and their processing state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Pending -> Processing -> (Completed | Error)
//! Pending -> Error
//! ```
//!
//! `Completed` and `Error` are terminal. Progress only moves forward while
//! processing, in fixed steps driven by the store's ingestion ticker.

mod extractor;

pub use extractor::{Extraction, ExtractionError, KeywordExtractor, TopicExtractor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TransitionError, ValidationError};

/// Accepted document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Txt,
    Md,
    Docx,
    Csv,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Pdf,
        DocumentKind::Txt,
        DocumentKind::Md,
        DocumentKind::Docx,
        DocumentKind::Csv,
    ];

    /// Case-insensitive extension lookup (`"PDF"` -> `Pdf`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Txt),
            "md" | "markdown" => Some(DocumentKind::Md),
            "docx" => Some(DocumentKind::Docx),
            "csv" => Some(DocumentKind::Csv),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Txt => "txt",
            DocumentKind::Md => "md",
            DocumentKind::Docx => "docx",
            DocumentKind::Csv => "csv",
        }
    }

    /// Whether the raw bytes are plain text worth scanning for keywords.
    pub fn is_text(self) -> bool {
        matches!(self, DocumentKind::Txt | DocumentKind::Md | DocumentKind::Csv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentState {
    Pending,
    Processing,
    Completed,
    Error,
}

impl DocumentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentState::Completed | DocumentState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentState::Pending => "pending",
            DocumentState::Processing => "processing",
            DocumentState::Completed => "completed",
            DocumentState::Error => "error",
        }
    }
}

/// An uploaded knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub kind: DocumentKind,
    pub byte_size: u64,
    /// 0..=100
    pub progress: u8,
    pub state: DocumentState,
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
    pub is_favorite: bool,
    pub is_profile_base: bool,
    /// Location in remote storage once uploaded.
    pub remote_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of a single ingestion tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Progress moved but is below 100.
    Advanced(u8),
    /// Progress reached 100; the document awaits extraction.
    Finished,
}

impl Document {
    pub fn new(name: impl Into<String>, kind: DocumentKind, byte_size: u64) -> Self {
        Self {
            id: format!("doc-{}", uuid::Uuid::new_v4()),
            name: name.into(),
            kind,
            byte_size,
            progress: 0,
            state: DocumentState::Pending,
            topics: Vec::new(),
            keywords: Vec::new(),
            is_favorite: false,
            is_profile_base: false,
            remote_url: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn transition_error(&self, action: &'static str) -> TransitionError {
        TransitionError::Document {
            id: self.id.clone(),
            state: self.state.as_str().to_string(),
            action,
        }
    }

    /// Pending -> Processing.
    pub fn begin_processing(&mut self) -> Result<(), TransitionError> {
        if self.state != DocumentState::Pending {
            return Err(self.transition_error("start processing"));
        }
        self.state = DocumentState::Processing;
        self.progress = 0;
        Ok(())
    }

    /// Advance progress by `step`, saturating at 100.
    pub fn tick(&mut self, step: u8) -> Result<TickOutcome, TransitionError> {
        if self.state != DocumentState::Processing {
            return Err(self.transition_error("advance"));
        }
        self.progress = self.progress.saturating_add(step).min(100);
        if self.progress == 100 {
            Ok(TickOutcome::Finished)
        } else {
            Ok(TickOutcome::Advanced(self.progress))
        }
    }

    /// Processing at 100% -> Completed, with extraction results.
    pub fn complete(&mut self, extraction: Extraction) -> Result<(), TransitionError> {
        if self.state != DocumentState::Processing || self.progress < 100 {
            return Err(self.transition_error("complete"));
        }
        self.topics = extraction.topics;
        self.keywords = extraction.keywords;
        self.state = DocumentState::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Any non-terminal state -> Error.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(self.transition_error("fail"));
        }
        self.state = DocumentState::Error;
        self.error_message = Some(message.into());
        Ok(())
    }
}

/// A request to ingest a file.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Narrows the configured accept set for this caller.
    pub accept: Option<Vec<DocumentKind>>,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            accept: None,
        }
    }

    pub fn accepting(mut self, kinds: &[DocumentKind]) -> Self {
        self.accept = Some(kinds.to_vec());
        self
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Check extension and size before anything is created.
///
/// A kind must be both in `allowed` and, when the request narrows it, in the
/// request's own accept list.
pub fn validate_upload(
    request: &UploadRequest,
    allowed: &[DocumentKind],
    max_bytes: u64,
) -> Result<DocumentKind, ValidationError> {
    if request.name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }

    let extension = request
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default();
    let unsupported = || ValidationError::UnsupportedFileType {
        name: request.name.clone(),
        extension: extension.to_string(),
    };

    let kind = DocumentKind::from_extension(extension).ok_or_else(unsupported)?;
    let accepted = allowed.contains(&kind)
        && request
            .accept
            .as_ref()
            .map_or(true, |narrowed| narrowed.contains(&kind));
    if !accepted {
        return Err(unsupported());
    }

    let size = request.byte_size();
    if size > max_bytes {
        return Err(ValidationError::FileTooLarge {
            name: request.name.clone(),
            size,
            limit: max_bytes,
        });
    }

    Ok(kind)
}
