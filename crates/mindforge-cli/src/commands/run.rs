use std::time::Duration;

use mindforge_core::drive;

use super::{open_store, CliResult};

const POLL: Duration = Duration::from_millis(100);

/// Drive the store's timers in real time, printing one JSON line per event.
pub fn run(seconds: u64) -> CliResult {
    let (db, mut store) = open_store()?;
    store.subscribe(|event, _| match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "could not encode event"),
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(drive(&mut store, POLL, Duration::from_secs(seconds)));

    store.flush(&db)?;
    Ok(())
}
