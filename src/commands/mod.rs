// ABOUTME: Command module aggregator for the hoist CLI.
// ABOUTME: Re-exports deploy and status command handlers.

mod deploy;
mod status;

pub use deploy::deploy;
pub use status::status;

use std::io;
use std::path::Path;

use hoist::config::Config;
use hoist::deploy::RecordStore;
use hoist::diagnostics::{Diagnostics, Warning};

/// Open the journal named by `config` for writing, falling back to an
/// in-memory store if it is unavailable.
fn open_store(config: &Config, diag: &mut Diagnostics) -> RecordStore {
    load_store(config, diag, |path| RecordStore::open(path, config.stale_after()))
}

/// Replay the journal named by `config` without writing to it.
fn read_store(config: &Config, diag: &mut Diagnostics) -> RecordStore {
    load_store(config, diag, |path| RecordStore::read(path))
}

fn load_store(
    config: &Config,
    diag: &mut Diagnostics,
    load: impl FnOnce(&Path) -> io::Result<RecordStore>,
) -> RecordStore {
    let Some(path) = config.deploy.journal_path() else {
        diag.warn(Warning::journal(
            "no state directory available; deployment history will not be kept",
        ));
        return RecordStore::in_memory();
    };

    match load(&path) {
        Ok(store) => {
            for warning in store.take_warnings() {
                diag.warn(Warning::journal(warning));
            }
            store
        }
        Err(e) => {
            diag.warn(Warning::journal(format!(
                "cannot open journal {}: {}",
                path.display(),
                e
            )));
            RecordStore::in_memory()
        }
    }
}
