use clap::Subcommand;
use serde_json::json;

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum TrainAction {
    /// List sessions with their progress
    List,
    /// Complete a block, optionally with a 0-100 score
    Complete {
        session_id: String,
        block_id: String,
        #[arg(long)]
        score: Option<u8>,
    },
    /// Answer a reasoning block with one of its options
    Answer {
        session_id: String,
        block_id: String,
        option_id: String,
    },
    /// Show level, experience and achievements
    Progress,
}

pub fn run(action: TrainAction) -> CliResult {
    let (db, mut store) = open_store()?;

    match action {
        TrainAction::List => {
            let sessions: Vec<_> = store
                .state()
                .sessions
                .iter()
                .map(|s| {
                    json!({
                        "id": s.id,
                        "title": s.title,
                        "state": s.state,
                        "progress_pct": s.progress_pct(),
                        "blocks": s.blocks,
                    })
                })
                .collect();
            print_json(&sessions)?;
        }
        TrainAction::Complete {
            session_id,
            block_id,
            score,
        } => {
            store.complete_block(&session_id, &block_id, score)?;
            print_json(&store.state().progress)?;
        }
        TrainAction::Answer {
            session_id,
            block_id,
            option_id,
        } => {
            let completion = store.answer_block(&session_id, &block_id, &option_id)?;
            print_json(&json!({
                "correct": completion.score == Some(100),
                "progress_pct": completion.progress_pct,
                "session_completed": completion.session_completed,
            }))?;
        }
        TrainAction::Progress => {
            print_json(&store.state().progress)?;
        }
    }

    store.flush(&db)?;
    Ok(())
}
