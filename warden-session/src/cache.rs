//! Session Cache - the reactive "session right now"
//!
//! Readers either take a snapshot with [`SessionCache::current`] or hold a
//! [`watch::Receiver`] from [`SessionCache::subscribe`]. Every writer (login,
//! logout, the clock) goes through one write lock, so an expiration tick cannot
//! interleave with a login that is writing through to storage.

use crate::store::SessionStore;
use crate::types::Session;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::info;

/// State owned by a collaborator that must not outlive the session it was built for
pub trait DependentState: Send + Sync {
    fn clear_dependent(&self);
}

pub struct SessionCache {
    pub(crate) store: SessionStore,
    current: watch::Sender<Session>,
    dependents: Vec<Arc<dyn DependentState>>,
    write_lock: Mutex<()>,
}

impl SessionCache {
    /// Seed the cache from the store
    pub fn new(store: SessionStore) -> Self {
        let (current, _) = watch::channel(store.load());
        Self {
            store,
            current,
            dependents: Vec::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Register state that is cleared on logout and on expiration
    pub fn with_dependent(mut self, dependent: Arc<dyn DependentState>) -> Self {
        self.dependents.push(dependent);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Latest value; never blocks on a writer
    pub fn current(&self) -> Session {
        self.current.borrow().clone()
    }

    /// Bearer token of the current session, empty when anonymous
    pub fn token(&self) -> String {
        self.current.borrow().token.clone()
    }

    /// Run `f` against the current value without cloning it
    pub fn with_current<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.current.borrow())
    }

    /// Receiver notified on every change of the current session
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.current.subscribe()
    }

    /// Replace the cached value. Callers are expected to have written the same
    /// session to the store already (see [`SessionCache::login`]).
    pub fn set_current(&self, session: Session) {
        let _guard = self.lock();
        self.replace(session);
    }

    /// Reset the cached value to the anonymous session
    pub fn clear_current(&self) {
        let _guard = self.lock();
        self.replace(Session::anonymous());
    }

    /// Persist `session` and make it current. Returns `false`, leaving both the
    /// store and the cache untouched, when the store rejects it.
    pub fn login(&self, session: Session) -> bool {
        let _guard = self.lock();
        if !self.store.save(&session) {
            return false;
        }
        info!(user = %session.identity.slug, "Session started");
        self.replace(session);
        true
    }

    /// Forget the session everywhere: store, dependents and cache
    pub fn logout(&self) {
        let _guard = self.lock();
        self.store.clear();
        self.clear_dependents();
        if self.replace(Session::anonymous()) {
            info!("Session ended");
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn clear_dependents(&self) {
        for dependent in &self.dependents {
            dependent.clear_dependent();
        }
    }

    /// Returns whether the value changed; subscribers are only woken on change
    pub(crate) fn replace(&self, session: Session) -> bool {
        self.current.send_if_modified(|current| {
            if *current == session {
                false
            } else {
                *current = session;
                true
            }
        })
    }
}
