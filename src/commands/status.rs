// ABOUTME: Status command implementation.
// ABOUTME: Reads deployment records back from the journal without writing to it.

use hoist::config::Config;
use hoist::diagnostics::Diagnostics;
use hoist::error::{Error, Result};
use hoist::output::Output;

use super::read_store;

pub fn status(config: &Config, id: Option<&str>, output: &Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let store = read_store(config, &mut diag);
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    match id {
        Some(id) => {
            let record = store
                .find(id)
                .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            output.record(&record);
        }
        None => {
            let records = store.latest_per_target();
            if records.is_empty() {
                output.progress("No deployments recorded");
            }
            for record in &records {
                output.record(record);
            }
        }
    }

    Ok(())
}
