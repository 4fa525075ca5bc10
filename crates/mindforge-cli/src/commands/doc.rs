use std::path::PathBuf;

use clap::Subcommand;
use mindforge_core::{DocumentKind, UploadRequest};
use serde_json::json;

use super::{open_store, parse_name, print_json, CliResult};

#[derive(Subcommand)]
pub enum DocAction {
    /// Upload a file and process it to completion
    Upload {
        /// File to ingest
        path: PathBuf,
        /// Restrict accepted kinds (e.g. --accept pdf --accept txt)
        #[arg(long, value_parser = parse_name::<DocumentKind>)]
        accept: Vec<DocumentKind>,
    },
    /// List documents as JSON
    List,
    /// Remove a document
    Remove {
        id: String,
    },
    /// Toggle the favorite flag
    Favorite {
        id: String,
    },
    /// Mark a document as the profile base
    Profile {
        id: String,
    },
}

pub fn run(action: DocAction) -> CliResult {
    let (db, mut store) = open_store()?;

    match action {
        DocAction::Upload { path, accept } => {
            let bytes = std::fs::read(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut request = UploadRequest::new(name, bytes);
            if !accept.is_empty() {
                request = request.accepting(&accept);
            }
            let id = store.upload_document(request)?;

            // Run the ingestion ticker to completion on the virtual clock.
            let ingestion = &store.config().ingestion;
            let ticks = 100 / u64::from(ingestion.progress_step.max(1)) + 2;
            let budget = ingestion.tick_interval_ms.saturating_mul(ticks);
            store.advance_until(budget, |state| {
                state.document(&id).map_or(true, |d| d.state.is_terminal())
            });
            print_json(&store.state().document(&id))?;
        }
        DocAction::List => {
            print_json(&store.state().documents)?;
        }
        DocAction::Remove { id } => {
            store.remove_document(&id)?;
            print_json(&json!({ "type": "document_removed", "document_id": id }))?;
        }
        DocAction::Favorite { id } => {
            let is_favorite = store.toggle_document_favorite(&id)?;
            print_json(&json!({ "document_id": id, "is_favorite": is_favorite }))?;
        }
        DocAction::Profile { id } => {
            store.set_profile_base(&id)?;
            print_json(&json!({ "document_id": id, "is_profile_base": true }))?;
        }
    }

    store.flush(&db)?;
    Ok(())
}
