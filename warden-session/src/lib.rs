//! Warden Session - the persisted login and its in-memory mirror
//!
//! - [`SessionStore`]: save/load/clear of one session record in a durable slot
//! - [`SessionCache`]: the reactive current session, written through to the store
//! - [`SessionClock`]: background reconciliation and expiry eviction
//! - [`OrganizationSelection`]: per-login selected organization, cleared with the session

pub mod cache;
pub mod clock;
pub mod organization;
pub mod slot;
pub mod store;
pub mod types;

pub use cache::{DependentState, SessionCache};
pub use clock::{SessionClock, TickOutcome};
pub use organization::{OrganizationSelection, SelectedOrganization};
pub use slot::{FileSlot, MemorySlot, SessionSlot};
pub use store::SessionStore;
pub use types::{Identity, Session, SessionError};

use std::sync::Arc;
use warden_core::{DiagnosticSink, StorageConfig};

/// The session cache and its organization dependent, wired over file slots
pub struct SessionContext {
    pub cache: Arc<SessionCache>,
    pub organization: Arc<OrganizationSelection>,
}

impl SessionContext {
    pub fn from_config(storage: &StorageConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let organization = Arc::new(OrganizationSelection::new(
            Arc::new(FileSlot::new(storage.organization_path())),
            Arc::clone(&sink),
        ));
        let store = SessionStore::new(Arc::new(FileSlot::new(storage.session_path())), sink);
        let cache = SessionCache::new(store).with_dependent(organization.clone());

        Self {
            cache: Arc::new(cache),
            organization,
        }
    }
}
