//! Session Store - persistence of the single session record
//!
//! Nothing here returns an error to the caller. Every failure resolves to the
//! anonymous session (or `false`) and is reported to the diagnostics sink.

use crate::slot::SessionSlot;
use crate::types::{Session, SessionError};
use std::sync::Arc;
use tracing::{debug, warn};
use warden_core::DiagnosticSink;

pub struct SessionStore {
    slot: Arc<dyn SessionSlot>,
    sink: Arc<dyn DiagnosticSink>,
}

impl SessionStore {
    pub fn new(slot: Arc<dyn SessionSlot>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { slot, sink }
    }

    /// Validate and persist. Returns `false` without touching the slot when the
    /// session is structurally invalid or the write fails.
    pub fn save(&self, session: &Session) -> bool {
        if let Err(e) = session.validate() {
            self.report_invalid(session, &e);
            return false;
        }

        let json = match session.to_json() {
            Ok(json) => json,
            Err(e) => {
                self.sink.capture_error(&e);
                return false;
            }
        };

        match self.slot.write(&json) {
            Ok(()) => {
                debug!(
                    slot = %self.slot.describe(),
                    user = %session.identity.slug,
                    "Saved session"
                );
                true
            }
            Err(e) => {
                warn!(slot = %self.slot.describe(), error = %e, "Failed to save session");
                self.sink.capture_error(&SessionError::Storage(e));
                false
            }
        }
    }

    /// The stored record as written, without identity validation.
    ///
    /// Absent or unparsable records yield the anonymous session.
    pub fn load_raw(&self) -> Session {
        match self.read_record() {
            Ok(Some(session)) => session,
            Ok(None) => Session::anonymous(),
            Err(e) => {
                self.sink.capture_error(&e);
                Session::anonymous()
            }
        }
    }

    /// The stored record, if it is structurally valid.
    ///
    /// A record that fails to parse or validate is reported and discarded, and the
    /// anonymous session is returned in its place.
    pub fn load(&self) -> Session {
        let result = self
            .read_record()
            .and_then(|record| match record {
                Some(session) => session.validate().map(|()| Some(session)),
                None => Ok(None),
            });

        match result {
            Ok(Some(session)) => session,
            Ok(None) => Session::anonymous(),
            Err(e) => {
                warn!(slot = %self.slot.describe(), error = %e, "Discarding stored session");
                self.sink
                    .capture_message(&format!("Invalid session in {}: {}", self.slot.describe(), e));
                if e.is_structural() {
                    self.clear();
                }
                Session::anonymous()
            }
        }
    }

    /// Remove the stored record unconditionally
    pub fn clear(&self) {
        if let Err(e) = self.slot.remove() {
            warn!(slot = %self.slot.describe(), error = %e, "Failed to clear session");
            self.sink.capture_error(&SessionError::Storage(e));
        }
    }

    fn read_record(&self) -> Result<Option<Session>, SessionError> {
        match self.slot.read()? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn report_invalid(&self, session: &Session, error: &SessionError) {
        let payload = session
            .sanitized()
            .to_json()
            .unwrap_or_else(|_| "<unserializable>".to_string());
        warn!(error = %error, "Refusing to save invalid session");
        self.sink
            .capture_message(&format!("Invalid session ({}): {}", error, payload));
    }
}
