//! Hand-off from the browser list to the scan and spectrum viewers.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};
use spm_model::{DataId, FileKind};
use spm_store::WriteMode;
use spm_store::keys::super_keys;
use tracing::{debug, warn};

use crate::database::Database;
use crate::error::{CoreError, Result};

/// Requests a browser list sends to the viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    OpenInViewer(DataId),
}

/// The viewer a record opens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerSlot {
    Scan,
    Spectrum,
}

impl ViewerSlot {
    pub fn for_kind(kind: FileKind) -> Self {
        match kind {
            FileKind::Scan => ViewerSlot::Scan,
            FileKind::Spectrum => ViewerSlot::Spectrum,
        }
    }

    /// Super property holding the record the viewer shows.
    pub fn super_key(self) -> &'static str {
        match self {
            ViewerSlot::Scan => super_keys::SXM_VIEWER_VALUE,
            ViewerSlot::Spectrum => super_keys::DAT_VIEWER_VALUE,
        }
    }
}

impl fmt::Display for ViewerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerSlot::Scan => f.write_str("scan viewer"),
            ViewerSlot::Spectrum => f.write_str("spectrum viewer"),
        }
    }
}

/// Queue of viewer requests, drained against a [`Database`].
#[derive(Debug, Clone)]
pub struct Mediator {
    sender: Sender<ViewerEvent>,
    receiver: Receiver<ViewerEvent>,
}

impl Default for Mediator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mediator {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// A sender for browser lists to hold on to.
    pub fn sender(&self) -> Sender<ViewerEvent> {
        self.sender.clone()
    }

    /// Routes every queued request. Failed requests are logged and
    /// returned alongside the successes.
    pub fn dispatch(&self, database: &Database) -> Vec<Result<(DataId, ViewerSlot)>> {
        self.receiver
            .try_iter()
            .map(|event| {
                let ViewerEvent::OpenInViewer(id) = event;
                let routed = route(database, &id).map(|slot| (id, slot));
                if let Err(err) = &routed {
                    warn!(error = %err, "viewer request dropped");
                }
                routed
            })
            .collect()
    }
}

/// Records `id` as the current record of its viewer.
pub fn route(database: &Database, id: &DataId) -> Result<ViewerSlot> {
    database.modify(|store| {
        if !store.contains(id.as_str()) {
            return Err(CoreError::UnknownRecord(id.to_string()));
        }
        let kind = store
            .kind_of(id.as_str())
            .ok_or_else(|| CoreError::NoViewer(id.to_string()))?;
        let slot = ViewerSlot::for_kind(kind);
        store.write_super(slot.super_key(), id.as_str(), WriteMode::CREATE_KEY);
        debug!(data_id = %id, %slot, "opened in viewer");
        Ok(slot)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenOptions;
    use spm_ingest::{DataLoader, LoadError};
    use spm_model::{LoadedFile, PropValue};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn requests_land_in_the_matching_viewer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.sxm"), b"1").unwrap();
        std::fs::write(dir.path().join("b.dat"), b"2").unwrap();
        let loader: Arc<dyn DataLoader> =
            Arc::new(|path: &Path| -> std::result::Result<LoadedFile, LoadError> {
                Err(LoadError::UnsupportedKind {
                    path: path.to_path_buf(),
                })
            });
        let db = Database::open(dir.path(), &OpenOptions::default(), loader).unwrap();

        let mediator = Mediator::new();
        let sender = mediator.sender();
        for name in ["a.sxm", "b.dat", "ghost.dat"] {
            sender
                .send(ViewerEvent::OpenInViewer(DataId::new(name).unwrap()))
                .unwrap();
        }

        let routed = mediator.dispatch(&db);
        assert_eq!(routed.len(), 3);
        assert_eq!(
            routed[0].as_ref().unwrap(),
            &(DataId::new("a.sxm").unwrap(), ViewerSlot::Scan)
        );
        assert_eq!(routed[1].as_ref().unwrap().1, ViewerSlot::Spectrum);
        assert!(matches!(routed[2], Err(CoreError::UnknownRecord(_))));

        let store = db.store();
        assert_eq!(
            store.get_super(super_keys::SXM_VIEWER_VALUE),
            Some(&PropValue::Text("a.sxm".into()))
        );
        assert_eq!(
            store.get_super(super_keys::DAT_VIEWER_VALUE),
            Some(&PropValue::Text("b.dat".into()))
        );
        assert!(mediator.dispatch(&db).is_empty());
    }
}
