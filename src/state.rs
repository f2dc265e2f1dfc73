use std::sync::Arc;

use tokio::sync::Mutex;

use crate::admin::session::SessionStore;
use crate::admin::throttle::ThrottleRegistry;
use crate::api::client::ApiClient;
use crate::clock::Clock;
use crate::components::visibility::VisibilityConfig;

pub struct AppState {
    pub api: ApiClient,
    pub clock: Arc<dyn Clock>,
    pub visibility: VisibilityConfig,
    pub throttles: Mutex<ThrottleRegistry>,
    pub sessions: Mutex<SessionStore>,
}
