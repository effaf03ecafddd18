use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use log::debug;

use crate::settings::HudConfig;
use crate::utils::sync::lock;

/// Open/closed state of the navigation app, fed by whatever watches the
/// foreground app. While the app is closed its late events are dropped.
#[derive(Debug)]
pub struct NavigationAppGate {
    allow_updates: AtomicBool,
    last_package: Mutex<String>,
}

impl NavigationAppGate {
    pub fn new() -> Self {
        Self {
            allow_updates: AtomicBool::new(true),
            last_package: Mutex::new(String::new()),
        }
    }

    pub fn on_target_changed(&self, package: &str) {
        debug!("navigation app target set to {:?}", package);
        self.set(true, package);
    }

    pub fn on_app_opened(&self, package: &str) {
        debug!("navigation app opened: {}", package);
        self.set(true, package);
    }

    pub fn on_app_closed(&self, package: &str) {
        debug!("navigation app closed: {}", package);
        self.set(false, package);
    }

    /// Always true when no navigation app is configured.
    pub fn should_allow(&self, config: &HudConfig) -> bool {
        config.nav_app_package.trim().is_empty() || self.allow_updates.load(Ordering::SeqCst)
    }

    pub fn last_package(&self) -> String {
        lock(&self.last_package).clone()
    }

    fn set(&self, allow: bool, package: &str) {
        self.allow_updates.store(allow, Ordering::SeqCst);
        *lock(&self.last_package) = package.to_string();
    }
}

impl Default for NavigationAppGate {
    fn default() -> Self {
        Self::new()
    }
}
