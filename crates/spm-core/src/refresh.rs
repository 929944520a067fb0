//! Background refresh: periodic update checks and snapshot flushes.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::database::{Database, UpdateOutcome};
use crate::error::{CoreError, Result};

/// What one refresh step did. Sent to [`RefreshLoop::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    Updated(UpdateOutcome),
    Saved(PathBuf),
    /// The store had no unsaved changes.
    SaveSkipped,
    Failed(String),
    Stopped { cycles: u64 },
}

/// Handle to the refresh worker thread.
///
/// Each cycle runs the update check, waits `action_gap`, flushes a
/// snapshot if the store is dirty, then waits `cycle_gap`. A stop request
/// is noticed during either wait. A cycle that has started always reaches
/// its flush, so merged records are saved before the worker exits.
/// Dropping the handle stops and joins the worker.
#[derive(Debug)]
pub struct RefreshLoop {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    events: Receiver<RefreshEvent>,
}

impl RefreshLoop {
    /// Starts the worker. A disabled config yields an idle handle.
    pub fn spawn(database: Arc<Database>, config: RefreshConfig) -> Result<Self> {
        let (event_tx, events) = unbounded();
        if !config.enabled {
            debug!("background refresh disabled");
            return Ok(Self {
                stop: None,
                handle: None,
                events,
            });
        }

        let (stop, stop_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("spm-refresh".into())
            .spawn(move || run(&database, &config, &stop_rx, &event_tx))
            .map_err(CoreError::Spawn)?;
        info!("background refresh started");

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
            events,
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Receiver of step reports.
    pub fn events(&self) -> &Receiver<RefreshEvent> {
        &self.events
    }

    /// Signals the worker and waits until it has exited.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        self.join_worker();
    }

    /// Waits for the worker to end on its own (`max_cycles`).
    pub fn join(mut self) {
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("background refresh thread panicked");
            } else {
                info!("background refresh stopped");
            }
        }
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    database: &Database,
    config: &RefreshConfig,
    stop: &Receiver<()>,
    events: &Sender<RefreshEvent>,
) {
    let mut cycles = 0;
    loop {
        let event = match database.update() {
            Ok(outcome) => {
                if outcome == UpdateOutcome::Incompatible {
                    warn!("refresh found an incompatible directory; skipping merge");
                }
                RefreshEvent::Updated(outcome)
            }
            Err(err) => {
                warn!(error = %err, "refresh update failed");
                RefreshEvent::Failed(err.to_string())
            }
        };
        let _ = events.send(event);

        let stopping = wait(stop, config.action_gap());
        let _ = events.send(flush(database));

        cycles += 1;
        if stopping || config.max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }
        if wait(stop, config.cycle_gap()) {
            break;
        }
    }
    debug!(cycles, "refresh loop exiting");
    let _ = events.send(RefreshEvent::Stopped { cycles });
}

fn flush(database: &Database) -> RefreshEvent {
    if !database.is_dirty() {
        return RefreshEvent::SaveSkipped;
    }
    match database.save() {
        Ok(path) => RefreshEvent::Saved(path),
        Err(err) => {
            warn!(error = %err, "refresh save failed");
            RefreshEvent::Failed(err.to_string())
        }
    }
}

/// True when a stop was requested (or the handle is gone) during the wait.
fn wait(stop: &Receiver<()>, gap: Duration) -> bool {
    match stop.recv_timeout(gap) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenOptions;
    use spm_ingest::{DataLoader, LoadError};
    use spm_model::{FileKind, LoadedFile};
    use std::path::Path;
    use std::time::Instant;
    use tempfile::TempDir;

    fn database(dir: &Path) -> Arc<Database> {
        std::fs::write(dir.join("a.dat"), b"0").unwrap();
        let loader: Arc<dyn DataLoader> =
            Arc::new(|_: &Path| -> std::result::Result<LoadedFile, LoadError> {
                Ok(LoadedFile::new(FileKind::Spectrum))
            });
        Arc::new(Database::open(dir, &OpenOptions::default(), loader).unwrap())
    }

    fn quick(max_cycles: u64) -> RefreshConfig {
        RefreshConfig {
            enabled: true,
            action_gap_ms: 0,
            cycle_gap_ms: 0,
            max_cycles: Some(max_cycles),
        }
    }

    #[test]
    fn cycles_update_then_flush() {
        let dir = TempDir::new().unwrap();
        let db = database(dir.path());

        let refresh = RefreshLoop::spawn(Arc::clone(&db), quick(2)).unwrap();
        let events = refresh.events().clone();
        refresh.join();

        let seen: Vec<RefreshEvent> = events.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                RefreshEvent::Updated(UpdateOutcome::NoChanges),
                RefreshEvent::Saved(dir.path().join("_database.spmdb")),
                RefreshEvent::Updated(UpdateOutcome::NoChanges),
                RefreshEvent::SaveSkipped,
                RefreshEvent::Stopped { cycles: 2 },
            ]
        );
        assert!(!db.is_dirty());
    }

    #[test]
    fn stop_interrupts_a_long_wait() {
        let dir = TempDir::new().unwrap();
        let db = database(dir.path());
        let config = RefreshConfig {
            cycle_gap_ms: 600_000,
            ..quick(100)
        };

        let mut refresh = RefreshLoop::spawn(db, config).unwrap();
        let events = refresh.events().clone();
        assert!(matches!(
            events.recv_timeout(Duration::from_secs(10)),
            Ok(RefreshEvent::Updated(_))
        ));

        let started = Instant::now();
        refresh.stop();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!refresh.is_running());
        assert!(matches!(
            events.try_iter().last(),
            Some(RefreshEvent::Stopped { .. })
        ));
    }

    #[test]
    fn stop_during_the_action_gap_still_flushes() {
        let dir = TempDir::new().unwrap();
        let db = database(dir.path());
        assert!(db.is_dirty());
        let config = RefreshConfig {
            action_gap_ms: 60_000,
            ..quick(100)
        };

        let mut refresh = RefreshLoop::spawn(Arc::clone(&db), config).unwrap();
        let events = refresh.events().clone();
        assert_eq!(
            events.recv_timeout(Duration::from_secs(10)),
            Ok(RefreshEvent::Updated(UpdateOutcome::NoChanges))
        );
        refresh.stop();

        let rest: Vec<RefreshEvent> = events.try_iter().collect();
        assert_eq!(
            rest,
            vec![
                RefreshEvent::Saved(dir.path().join("_database.spmdb")),
                RefreshEvent::Stopped { cycles: 1 },
            ]
        );
        assert!(!db.is_dirty());
    }

    #[test]
    fn disabled_config_spawns_nothing() {
        let dir = TempDir::new().unwrap();
        let db = database(dir.path());
        let refresh = RefreshLoop::spawn(db, RefreshConfig::disabled()).unwrap();
        assert!(!refresh.is_running());
    }
}
