use std::sync::Arc;

use crate::auth::{Auth, TokenVerifier};
use crate::clock::{Clock, SystemClock};
use crate::config::PageLimits;
use crate::deadlines::UrgencyPolicy;
use crate::store::Store;

/// Shared by every handler; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub verifier: Arc<dyn TokenVerifier>,
    /// GoTrue client for sign-up; without it `/api/auth/register` answers 503
    pub auth: Option<Auth>,
    pub policy: UrgencyPolicy,
    pub clock: Arc<dyn Clock>,
    pub pages: PageLimits,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            store,
            verifier,
            auth: None,
            policy: UrgencyPolicy::default(),
            clock: Arc::new(SystemClock),
            pages: PageLimits::default(),
        }
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_policy(mut self, policy: UrgencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_pages(mut self, pages: PageLimits) -> Self {
        self.pages = pages;
        self
    }
}
