//! Selected organization
//!
//! The organization a user is currently working in. It belongs to one login, so
//! it is registered with the session cache as dependent state and disappears on
//! logout or expiration.

use crate::cache::DependentState;
use crate::slot::SessionSlot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use warden_core::DiagnosticSink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOrganization {
    pub uuid: String,
    pub slug: String,
    pub name: String,
}

pub struct OrganizationSelection {
    slot: Arc<dyn SessionSlot>,
    sink: Arc<dyn DiagnosticSink>,
}

impl OrganizationSelection {
    pub fn new(slot: Arc<dyn SessionSlot>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { slot, sink }
    }

    /// Persist the selection; an organization without uuid or slug is refused
    pub fn select(&self, organization: &SelectedOrganization) -> bool {
        if organization.uuid.trim().is_empty() || organization.slug.trim().is_empty() {
            self.sink.capture_message(&format!(
                "Invalid organization selection: {:?}",
                organization
            ));
            return false;
        }

        let written = serde_json::to_string(organization)
            .map_err(std::io::Error::from)
            .and_then(|json| self.slot.write(&json));

        match written {
            Ok(()) => {
                debug!(organization = %organization.slug, "Organization selected");
                true
            }
            Err(e) => {
                self.sink.capture_error(&e);
                false
            }
        }
    }

    pub fn selected(&self) -> Option<SelectedOrganization> {
        let raw = match self.slot.read() {
            Ok(raw) => raw?,
            Err(e) => {
                self.sink.capture_error(&e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(organization) => Some(organization),
            Err(e) => {
                warn!(error = %e, "Discarding malformed organization selection");
                self.sink.capture_error(&e);
                self.clear();
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.slot.remove() {
            self.sink.capture_error(&e);
        }
    }
}

impl DependentState for OrganizationSelection {
    fn clear_dependent(&self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::MemorySlot;
    use warden_core::RecordingSink;

    fn acme() -> SelectedOrganization {
        SelectedOrganization {
            uuid: "o1".to_string(),
            slug: "acme".to_string(),
            name: "Acme".to_string(),
        }
    }

    #[test]
    fn select_and_clear() {
        let slot = MemorySlot::new();
        let sink = Arc::new(RecordingSink::new());
        let selection = OrganizationSelection::new(Arc::new(slot.clone()), sink.clone());

        assert_eq!(selection.selected(), None);
        assert!(selection.select(&acme()));
        assert_eq!(selection.selected(), Some(acme()));

        selection.clear_dependent();
        assert_eq!(selection.selected(), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn rejects_and_discards_bad_records() {
        let slot = MemorySlot::new();
        let sink = Arc::new(RecordingSink::new());
        let selection = OrganizationSelection::new(Arc::new(slot.clone()), sink.clone());

        let mut nameless = acme();
        nameless.slug.clear();
        assert!(!selection.select(&nameless));
        assert_eq!(slot.read().unwrap(), None);

        slot.write("[]").unwrap();
        assert_eq!(selection.selected(), None);
        assert_eq!(slot.read().unwrap(), None);
        assert_eq!(sink.len(), 2);
    }
}
