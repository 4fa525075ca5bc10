use clap::Subcommand;
use mindforge_core::storage::database::ONBOARDING_COMPLETED;
use mindforge_core::Database;
use serde_json::json;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum OnboardingAction {
    /// Print whether onboarding has been completed
    Status,
    /// Mark onboarding as completed
    Complete,
    /// Clear the onboarding flag
    Reset,
}

pub fn run(action: OnboardingAction) -> CliResult {
    let db = Database::open()?;

    match action {
        OnboardingAction::Status => {}
        OnboardingAction::Complete => db.set_flag(ONBOARDING_COMPLETED, true)?,
        OnboardingAction::Reset => db.set_flag(ONBOARDING_COMPLETED, false)?,
    }

    print_json(&json!({ "onboarding_completed": db.flag(ONBOARDING_COMPLETED)? }))
}
