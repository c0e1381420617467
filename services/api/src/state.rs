//! Application state shared across all route handlers.

use interview_core::SessionWizard;
use interview_service::WizardFactory;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

struct SessionEntry {
    wizard: Arc<SessionWizard>,
    last_touched: Instant,
}

/// One wizard per session id. Handlers clone the `Arc` out and never hold the
/// map lock across a remote call.
#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<WizardFactory>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_timeout: Duration,
}

impl AppState {
    pub fn new(factory: WizardFactory, idle_timeout: Duration) -> Self {
        Self {
            factory: Arc::new(factory),
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    fn sessions(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_session(&self) -> (Uuid, Arc<SessionWizard>) {
        self.prune_idle();
        let id = Uuid::new_v4();
        let wizard = Arc::new(self.factory.create());
        self.sessions().insert(
            id,
            SessionEntry {
                wizard: Arc::clone(&wizard),
                last_touched: Instant::now(),
            },
        );
        (id, wizard)
    }

    /// Looks a session up and marks it as recently used.
    pub fn session(&self, id: &Uuid) -> Option<Arc<SessionWizard>> {
        let mut sessions = self.sessions();
        let entry = sessions.get_mut(id)?;
        entry.last_touched = Instant::now();
        Some(Arc::clone(&entry.wizard))
    }

    pub fn remove_session(&self, id: &Uuid) -> Option<Arc<SessionWizard>> {
        self.sessions().remove(id).map(|entry| entry.wizard)
    }

    /// Drops sessions untouched for longer than the idle timeout. Sessions
    /// with a request in flight are kept. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = entry.wizard.is_busy()
                || now.duration_since(entry.last_touched) <= self.idle_timeout;
            if !keep {
                tracing::info!("Expiring idle session {}", id);
                entry.wizard.reset();
            }
            keep
        });
        before - sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
