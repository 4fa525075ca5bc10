use clap::Subcommand;
use mindforge_core::Mode;
use serde_json::json;

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum ModeAction {
    /// Switch mode: normal, productivity, focus or sleep
    Set {
        mode: Mode,
    },
    /// Print the current mode and its effects
    Show,
}

pub fn run(action: ModeAction) -> CliResult {
    let (db, mut store) = open_store()?;

    match action {
        ModeAction::Set { mode } => {
            let changed = store.set_mode(mode);
            print_json(&json!({ "mode": mode, "changed": changed }))?;
        }
        ModeAction::Show => {
            print_json(&json!({
                "mode": store.state().mode.mode,
                "effects": store.mode_effects(),
            }))?;
        }
    }

    store.flush(&db)?;
    Ok(())
}
