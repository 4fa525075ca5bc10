pub mod config;
pub mod doc;
pub mod graph;
pub mod habit;
pub mod mode;
pub mod onboarding;
pub mod prompt;
pub mod run;
pub mod train;

use std::error::Error;

use mindforge_core::{Collaborators, Config, Database, DomainStore};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Restore the store from its last flush.
pub fn open_store() -> Result<(Database, DomainStore), Box<dyn Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let store = DomainStore::load(config, Collaborators::in_memory(), &db)?;
    Ok((db, store))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a lowercase enum name (`"health"`, `"daily"`) through its serde
/// representation. Used as a clap value parser.
pub fn parse_name<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("invalid value '{s}'"))
}
