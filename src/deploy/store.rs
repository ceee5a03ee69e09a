// ABOUTME: Append-only deployment history with per-target mutual exclusion.
// ABOUTME: Optionally journals every record snapshot to a JSON-lines file and replays it.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use crate::config::{DeploymentTarget, TargetKey};
use crate::types::{ImageReference, RecordId};

use super::{DeployError, DeploymentRecord, DeploymentState, RecordUpdate, TransitionEntry};

/// Shared store of deployment records.
///
/// `begin` and `transition` are the only ways records change. A target has
/// at most one non-terminal record at any time.
#[derive(Debug, Default)]
pub struct RecordStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<DeploymentRecord>,
    index: HashMap<RecordId, usize>,
    active: HashMap<TargetKey, RecordId>,
    warnings: Vec<String>,
    journal: Option<Journal>,
}

/// The journal file, held open in append mode for the store's lifetime.
#[derive(Debug)]
struct Journal {
    path: PathBuf,
    file: File,
}

impl Inner {
    fn insert(&mut self, record: DeploymentRecord) {
        match self.index.get(&record.id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Apply a journal snapshot. Snapshots of a record that is already
    /// terminal are dropped, so a finished record never changes.
    fn replay(&mut self, record: DeploymentRecord) -> bool {
        if self.get(&record.id).is_some_and(DeploymentRecord::is_terminal) {
            return false;
        }
        self.insert(record);
        true
    }

    fn get(&self, id: &RecordId) -> Option<&DeploymentRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }
}

impl RecordStore {
    /// A store without a journal; history lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (creating if needed) a journal and replay it.
    ///
    /// Live records that started more than `stale_after` ago are failed as
    /// abandoned; younger ones keep their target locked.
    pub fn open(path: impl Into<PathBuf>, stale_after: Duration) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut inner = replay(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        inner.journal = Some(Journal { path, file });

        let live: Vec<RecordId> = inner
            .records
            .iter()
            .filter(|r| !r.is_terminal())
            .map(|r| r.id.clone())
            .collect();
        for id in live {
            let Some(record) = inner.get(&id) else { continue };
            if record.is_stale(stale_after) {
                tracing::warn!(
                    id = %id,
                    target = %record.target_key(),
                    started_at = %record.started_at,
                    "failing stale deployment left by {}",
                    record.initiated_by
                );
                Self::fail_live(&mut inner, &id, "abandoned");
            } else {
                let key = record.target_key();
                inner.active.insert(key, id);
            }
        }

        Ok(RecordStore {
            inner: Mutex::new(inner),
        })
    }

    /// Replay a journal without writing to it.
    ///
    /// Live records are reported as they were last written, however old.
    /// A missing journal reads as empty.
    pub fn read(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut inner = replay(path.as_ref())?;
        let live: Vec<(TargetKey, RecordId)> = inner
            .records
            .iter()
            .filter(|r| !r.is_terminal())
            .map(|r| (r.target_key(), r.id.clone()))
            .collect();
        inner.active.extend(live);
        Ok(RecordStore {
            inner: Mutex::new(inner),
        })
    }

    /// Start a new `Pending` record for `target`.
    ///
    /// Fails with [`DeployError::Conflict`] if the target already has a live
    /// record, unless `force` is set, in which case that record is failed as
    /// superseded first.
    pub fn begin(
        &self,
        image: ImageReference,
        target: DeploymentTarget,
        force: bool,
    ) -> Result<DeploymentRecord, DeployError> {
        let key = target.key();
        let mut inner = self.inner.lock();

        if let Some(active) = inner.active.get(&key).cloned() {
            if !force {
                return Err(DeployError::Conflict {
                    target: key,
                    active,
                });
            }
            tracing::warn!(id = %active, target = %key, "superseding in-progress deployment");
            Self::fail_live(&mut inner, &active, "superseded");
        }

        let record = DeploymentRecord::new(image, target);
        tracing::info!(id = %record.id, target = %key, image = %record.image, "deployment pending");

        inner.active.insert(key, record.id.clone());
        inner.insert(record.clone());
        Self::append(&mut inner, &record);
        Ok(record)
    }

    /// Move a record to `next`, applying `update` in the same step.
    pub fn transition(
        &self,
        id: &RecordId,
        next: DeploymentState,
        update: RecordUpdate,
    ) -> Result<DeploymentRecord, DeployError> {
        let mut inner = self.inner.lock();
        let &i = inner
            .index
            .get(id)
            .ok_or_else(|| DeployError::UnknownRecord(id.clone()))?;

        let current = &inner.records[i].state;
        if !current.can_transition_to(&next) {
            return Err(DeployError::invalid_transition(id, current, &next));
        }

        let now = Utc::now();
        let record = &mut inner.records[i];
        update.apply(record);
        record.transitions.push(TransitionEntry {
            at: now,
            state: next.clone(),
        });
        record.state = next;
        if record.state.is_terminal() {
            record.finished_at = Some(now);
        }
        let record = record.clone();

        match &record.state {
            DeploymentState::Failed { stage, reason } => {
                tracing::warn!(id = %id, %stage, %reason, "deployment failed");
            }
            state => tracing::info!(id = %id, state = state.name(), "deployment transition"),
        }

        if record.is_terminal() {
            inner.active.remove(&record.target_key());
        }
        Self::append(&mut inner, &record);
        Ok(record)
    }

    /// Fail `id` if it is still live, attributing the failure to its current
    /// stage. Returns the updated record, or `None` if it was already terminal.
    pub fn abandon(&self, id: &RecordId, reason: &str) -> Option<DeploymentRecord> {
        let mut inner = self.inner.lock();
        Self::fail_live(&mut inner, id, reason)
    }

    fn fail_live(inner: &mut Inner, id: &RecordId, reason: &str) -> Option<DeploymentRecord> {
        let &i = inner.index.get(id)?;
        let stage = inner.records[i].state.stage()?;
        if inner.records[i].is_terminal() {
            return None;
        }

        let now = Utc::now();
        let next = DeploymentState::failed(stage, reason);
        let record = &mut inner.records[i];
        record.transitions.push(TransitionEntry {
            at: now,
            state: next.clone(),
        });
        record.state = next;
        record.finished_at = Some(now);
        record.error_detail = Some(reason.to_string());
        let record = record.clone();

        inner.active.remove(&record.target_key());
        Self::append(inner, &record);
        Some(record)
    }

    fn append(inner: &mut Inner, record: &DeploymentRecord) {
        let Some(journal) = inner.journal.as_mut() else {
            return;
        };

        // One write per line keeps concurrent appenders from interleaving.
        let result = serde_json::to_vec(record)
            .map_err(io::Error::from)
            .and_then(|mut line| {
                line.push(b'\n');
                journal.file.write_all(&line)
            });

        if let Err(e) = result {
            let path = journal.path.display().to_string();
            tracing::warn!(path = %path, error = %e, "failed to write deployment journal");
            inner
                .warnings
                .push(format!("failed to write journal {}: {}", path, e));
        }
    }

    pub fn get(&self, id: &RecordId) -> Option<DeploymentRecord> {
        self.inner.lock().get(id).cloned()
    }

    /// Look up by full id or by an unambiguous id prefix.
    pub fn find(&self, prefix: &str) -> Option<DeploymentRecord> {
        let inner = self.inner.lock();
        let mut matches = inner
            .records
            .iter()
            .filter(|r| r.id.as_str().starts_with(prefix));
        let first = matches.next()?;
        if first.id.as_str() != prefix && matches.next().is_some() {
            return None;
        }
        Some(first.clone())
    }

    /// Every record, oldest first.
    pub fn history(&self) -> Vec<DeploymentRecord> {
        self.inner.lock().records.clone()
    }

    /// The most recent record for each target, oldest target first.
    pub fn latest_per_target(&self) -> Vec<DeploymentRecord> {
        let inner = self.inner.lock();
        let mut latest: Vec<DeploymentRecord> = Vec::new();
        for record in &inner.records {
            let key = record.target_key();
            match latest.iter_mut().find(|r| r.target_key() == key) {
                Some(slot) => *slot = record.clone(),
                None => latest.push(record.clone()),
            }
        }
        latest
    }

    /// The live record for `key`, if one holds the target.
    pub fn active(&self, key: &str) -> Option<DeploymentRecord> {
        let inner = self.inner.lock();
        inner.active.get(key).and_then(|id| inner.get(id)).cloned()
    }

    /// The newest `Succeeded` record for `key`: what the target is running.
    pub fn last_succeeded(&self, key: &str) -> Option<DeploymentRecord> {
        self.inner
            .lock()
            .records
            .iter()
            .rev()
            .find(|r| r.state == DeploymentState::Succeeded && r.target_key() == key)
            .cloned()
    }

    /// Non-fatal problems seen while reading or writing the journal.
    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().warnings)
    }
}

/// Read every snapshot in the journal at `path`. Unreadable lines and
/// updates to finished records are skipped with a warning.
fn replay(path: &Path) -> io::Result<Inner> {
    let mut inner = Inner::default();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(inner),
        Err(e) => return Err(e),
    };

    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DeploymentRecord>(&line) {
            Ok(record) => {
                let id = record.id.clone();
                if !inner.replay(record) {
                    tracing::warn!(
                        path = %path.display(),
                        line = n + 1,
                        id = %id,
                        "ignoring update to finished deployment"
                    );
                    inner.warnings.push(format!(
                        "{}:{}: ignored update to finished deployment {}",
                        path.display(),
                        n + 1,
                        id.short()
                    ));
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = n + 1,
                    error = %e,
                    "skipping unreadable journal entry"
                );
                inner.warnings.push(format!(
                    "{}:{}: skipped unreadable entry: {}",
                    path.display(),
                    n + 1,
                    e
                ));
            }
        }
    }
    Ok(inner)
}
