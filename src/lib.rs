pub mod dispatch;
pub mod gate;
pub mod maneuver;
pub mod models;
pub mod normalizer;
pub mod settings;
pub mod store;
pub mod timer;
pub mod traffic;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use dispatch::{DownstreamDispatcher, TurnByTurnSink};
use gate::NavigationAppGate;
use maneuver::{IconDirectory, IconSource, ManeuverClassifier, NoIcons};
use models::{NavEvent, NavigationState};
use normalizer::{Collaborators, EventNormalizer};
use settings::ConfigStore;
use store::{ListenerId, StateListener, StateStore};
use timer::{Clock, Scheduler};
use traffic::TrafficLightTracker;

pub use utils::logging::init_logging;

/// Long-lived navigation core: one per process, shared by handle.
///
/// Construct it inside a tokio runtime; its timers run on that runtime.
pub struct HudEngine {
    config: ConfigStore,
    store: StateStore,
    classifier: Arc<ManeuverClassifier>,
    tracker: TrafficLightTracker,
    dispatcher: DownstreamDispatcher,
    gate: Arc<NavigationAppGate>,
    normalizer: EventNormalizer,
}

impl HudEngine {
    pub fn new(
        config: ConfigStore,
        sink: Arc<dyn TurnByTurnSink>,
        icons: Box<dyn IconSource>,
    ) -> Result<Self> {
        let scheduler = Scheduler::current()?;
        Ok(Self::with_scheduler(config, sink, icons, &scheduler, Clock::new()))
    }

    /// Engine whose reference icons come from `maneuver_icon_dir` in the
    /// config, or with no references when it is unset.
    pub fn from_config(config: ConfigStore, sink: Arc<dyn TurnByTurnSink>) -> Result<Self> {
        let icons: Box<dyn IconSource> = match &config.get().maneuver_icon_dir {
            Some(dir) => {
                info!("Loading maneuver references from {}", dir.display());
                Box::new(IconDirectory::new(dir))
            }
            None => Box::new(NoIcons),
        };
        Self::new(config, sink, icons)
    }

    pub fn with_scheduler(
        config: ConfigStore,
        sink: Arc<dyn TurnByTurnSink>,
        icons: Box<dyn IconSource>,
        scheduler: &Scheduler,
        clock: Clock,
    ) -> Self {
        let store = StateStore::new();
        let classifier = Arc::new(ManeuverClassifier::new(icons));
        let tracker = TrafficLightTracker::new(store.clone(), config.clone(), clock, scheduler);
        let dispatcher = DownstreamDispatcher::new(store.clone(), config.clone(), sink, scheduler);
        let gate = Arc::new(NavigationAppGate::new());
        let normalizer = EventNormalizer::new(
            Collaborators {
                store: store.clone(),
                config: config.clone(),
                clock,
                tracker: tracker.clone(),
                classifier: Arc::clone(&classifier),
                dispatcher: dispatcher.clone(),
                gate: Arc::clone(&gate),
            },
            scheduler,
        );

        Self {
            config,
            store,
            classifier,
            tracker,
            dispatcher,
            gate,
            normalizer,
        }
    }

    /// Apply one event. Returns false when it was dropped by the app gate.
    pub fn handle(&self, event: NavEvent) -> bool {
        self.normalizer.handle(event)
    }

    pub fn handle_json(&self, line: &str) -> Result<bool> {
        let event = NavEvent::from_json(line).with_context(|| format!("Bad navigation event: {line}"))?;
        Ok(self.handle(event))
    }

    pub fn set_vehicle_speed(&self, speed_kmh: Option<i32>) {
        self.normalizer.set_vehicle_speed(speed_kmh);
    }

    pub fn snapshot(&self) -> Arc<NavigationState> {
        self.store.snapshot()
    }

    pub fn subscribe(&self, listener: Arc<dyn StateListener>) -> ListenerId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn classifier(&self) -> &ManeuverClassifier {
        &self.classifier
    }

    pub fn tracker(&self) -> &TrafficLightTracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &DownstreamDispatcher {
        &self.dispatcher
    }

    pub fn gate(&self) -> &NavigationAppGate {
        &self.gate
    }
}
