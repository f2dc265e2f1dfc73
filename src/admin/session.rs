use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::api::models::User;
use crate::components::view::ComponentView;

pub struct DashboardSession {
    pub token: String,
    pub created_at: Instant,
    /// Bearer token issued by the monitoring backend.
    pub api_token: String,
    pub user: User,
    pub components: ComponentView,
}

impl DashboardSession {
    pub fn new(api_token: String, user: User, components: ComponentView) -> Self {
        DashboardSession {
            token: generate_session_token(),
            created_at: Instant::now(),
            api_token,
            user,
            components,
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

pub struct SessionStore {
    ttl: Duration,
    sessions: HashMap<String, DashboardSession>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            ttl,
            sessions: HashMap::new(),
        }
    }

    /// Stores the session and returns its cookie token.
    pub fn create(&mut self, session: DashboardSession) -> String {
        self.cleanup_expired();
        let token = session.token.clone();
        self.sessions.insert(token.clone(), session);
        token
    }

    pub fn get(&self, token: &str) -> Option<&DashboardSession> {
        self.sessions.get(token).filter(|s| !s.is_expired(self.ttl))
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut DashboardSession> {
        let ttl = self.ttl;
        self.sessions
            .get_mut(token)
            .filter(|s| !s.is_expired(ttl))
    }

    pub fn remove(&mut self, token: &str) {
        if let Some(mut session) = self.sessions.remove(token) {
            session.components.dispose();
        }
    }

    pub fn cleanup_expired(&mut self) {
        let ttl = self.ttl;
        self.sessions.retain(|_, s| {
            let keep = !s.is_expired(ttl);
            if !keep {
                s.components.dispose();
            }
            keep
        });
    }
}

fn generate_session_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.r#gen()).collect();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
