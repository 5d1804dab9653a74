use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::error::{ReelError, ReelResult};

/// Users with a render in flight. A second request for the same user is rejected, not queued.
#[derive(Clone, Debug, Default)]
pub struct RenderLocks {
    active: Arc<Mutex<HashSet<String>>>,
}

impl RenderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `user`; the claim is released when the lease drops.
    pub fn try_acquire(&self, user: &str) -> ReelResult<RenderLease> {
        if !self.guard().insert(user.to_string()) {
            return Err(ReelError::validation(format!(
                "a video is already being rendered for '{user}'"
            )));
        }
        tracing::debug!(user, "render lock taken");
        Ok(RenderLease {
            locks: self.clone(),
            user: user.to_string(),
        })
    }

    pub fn is_active(&self, user: &str) -> bool {
        self.guard().contains(user)
    }

    pub fn active_count(&self) -> usize {
        self.guard().len()
    }
}

#[derive(Debug)]
pub struct RenderLease {
    locks: RenderLocks,
    user: String,
}

impl RenderLease {
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl Drop for RenderLease {
    fn drop(&mut self) {
        self.locks.guard().remove(&self.user);
        tracing::debug!(user = %self.user, "render lock released");
    }
}
