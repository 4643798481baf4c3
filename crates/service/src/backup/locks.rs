//! In-process advisory locks serialising backup work per scope.
//!
//! An all-workspace operation holds the global lock exclusively. A
//! workspace operation holds it shared plus that workspace's mutex, so
//! different workspaces proceed in parallel. Separate processes are not
//! coordinated.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use models::WorkspaceId;

#[derive(Debug, Default)]
pub struct ScopeLocks {
    global: Arc<RwLock<()>>,
    workspaces: DashMap<WorkspaceId, Arc<Mutex<()>>>,
}

/// Released on drop.
#[derive(Debug)]
pub struct ScopeGuard {
    _shared: Option<OwnedRwLockReadGuard<()>>,
    _exclusive: Option<OwnedRwLockWriteGuard<()>>,
    _workspace: Option<OwnedMutexGuard<()>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, scope: Option<WorkspaceId>) -> ScopeGuard {
        match scope {
            None => ScopeGuard {
                _shared: None,
                _exclusive: Some(Arc::clone(&self.global).write_owned().await),
                _workspace: None,
            },
            Some(id) => {
                let shared = Arc::clone(&self.global).read_owned().await;
                // clone out of the map so no shard lock is held across the await
                let mutex = self.workspaces.entry(id).or_default().value().clone();
                ScopeGuard {
                    _shared: Some(shared),
                    _exclusive: None,
                    _workspace: Some(mutex.lock_owned().await),
                }
            }
        }
    }
}
