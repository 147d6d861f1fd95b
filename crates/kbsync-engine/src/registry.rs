//! Folder scope registries
//!
//! A [`FolderScopeRegistry`] holds the set of folder ids currently subject
//! to one synchronization purpose. Two independent instances exist - one
//! for the content-sync scope, one for the tagging-pipeline scope - with no
//! shared state, because they track different aspects.
//!
//! The registry starts *uninitialized*, which is distinct from empty:
//! reading it before the watchdog resolved the initial scope is an error,
//! not an empty result. Mutation comes only from the owning folder handler;
//! content handlers running on the worker pool read it concurrently, which
//! is why the storage is a lock-free concurrent set.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use kbsync_core::domain::newtypes::NodeId;
use tracing::{debug, info};

use crate::handlers::HandlerRole;
use crate::SyncError;

/// Thread-safe set of in-scope folder ids for one handler role
#[derive(Debug)]
pub struct FolderScopeRegistry {
    role: HandlerRole,
    initialized: AtomicBool,
    folders: DashSet<NodeId>,
}

impl FolderScopeRegistry {
    /// Creates an uninitialized registry for the given role
    pub fn new(role: HandlerRole) -> Self {
        Self {
            role,
            initialized: AtomicBool::new(false),
            folders: DashSet::new(),
        }
    }

    /// The role this registry serves
    pub fn role(&self) -> HandlerRole {
        self.role
    }

    /// Seeds the registry with the initially discovered scope
    ///
    /// Duplicates collapse (set semantics). Marks the registry initialized;
    /// subsequent reads succeed even if later mutations empty it again.
    pub fn initialize(&self, folder_ids: impl IntoIterator<Item = NodeId>) {
        for id in folder_ids {
            self.folders.insert(id);
        }
        self.initialized.store(true, Ordering::Release);
        info!(role = %self.role, count = self.folders.len(), "Folder scope initialized");
    }

    /// Returns true once [`initialize`](Self::initialize) has run
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Adds a folder to the scope; re-adding is a no-op
    pub fn add(&self, folder_id: NodeId) {
        debug!(role = %self.role, folder_id = %folder_id, "Folder entering scope");
        self.folders.insert(folder_id);
    }

    /// Removes a folder from the scope; removing an absent id is a no-op
    pub fn remove(&self, folder_id: &NodeId) {
        debug!(role = %self.role, folder_id = %folder_id, "Folder leaving scope");
        self.folders.remove(folder_id);
    }

    /// Tests scope membership
    ///
    /// # Errors
    /// [`SyncError::RegistryUninitialized`] before the initial scope resolved.
    pub fn contains(&self, folder_id: &NodeId) -> Result<bool, SyncError> {
        self.ensure_initialized()?;
        Ok(self.folders.contains(folder_id))
    }

    /// Returns a point-in-time copy of the scope
    ///
    /// # Errors
    /// [`SyncError::RegistryUninitialized`] before the initial scope resolved.
    pub fn snapshot(&self) -> Result<Vec<NodeId>, SyncError> {
        self.ensure_initialized()?;
        Ok(self.folders.iter().map(|entry| entry.clone()).collect())
    }

    fn ensure_initialized(&self) -> Result<(), SyncError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SyncError::RegistryUninitialized { role: self.role })
        }
    }
}
