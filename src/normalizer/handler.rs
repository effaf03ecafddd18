use std::sync::{Arc, Weak};

use crate::{
    dispatch::{DownstreamDispatcher, Trigger},
    gate::NavigationAppGate,
    maneuver::ManeuverClassifier,
    models::{
        AltSpeedEvent, AltSpeedInfo, ManeuverEvent, NavEvent, NavigationState, RoadCameraEvent,
        RoadCameraInfo, RouteUpdate, RoutePolyline, TextEvent,
    },
    settings::ConfigStore,
    store::StateStore,
    timer::{Clock, Scheduler, TimerSlot},
    traffic::TrafficLightTracker,
    utils::text::{extract_trailing_unit, non_blank_or, normalize_text},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Provenance recorded for fields that come from the vendor navigation app.
pub const VENDOR_SOURCE: &str = "yandex";
pub const STREET_RESET_ACTION: &str = "street_reset";
pub const NAV_END_TIMEOUT_ACTION: &str = "nav_end_timeout";

const SECONDARY_SEPARATOR: &str = " • ";

/// Everything the normalizer reads from or writes to.
pub struct Collaborators {
    pub store: StateStore,
    pub config: ConfigStore,
    pub clock: Clock,
    pub tracker: TrafficLightTracker,
    pub classifier: Arc<ManeuverClassifier>,
    pub dispatcher: DownstreamDispatcher,
    pub gate: Arc<NavigationAppGate>,
}

struct NormalizerInner {
    deps: Collaborators,
    street_reset: TimerSlot,
    nav_end: TimerSlot,
}

/// Turns inbound navigation events into state updates.
///
/// Events are partial and arrive out of order across fields, so a blank value
/// never replaces a non-blank one unless the event explicitly clears it.
#[derive(Clone)]
pub struct EventNormalizer {
    inner: Arc<NormalizerInner>,
}

impl EventNormalizer {
    pub fn new(deps: Collaborators, scheduler: &Scheduler) -> Self {
        Self {
            inner: Arc::new(NormalizerInner {
                deps,
                street_reset: scheduler.slot("street-reset"),
                nav_end: scheduler.slot("nav-end"),
            }),
        }
    }

    /// Apply one event. Returns false when the event was dropped by the
    /// navigation app gate.
    pub fn handle(&self, event: NavEvent) -> bool {
        let action = event.action();
        let config = self.inner.deps.config.get();
        if !matches!(event, NavEvent::NativeNavStop) && !self.inner.deps.gate.should_allow(&config) {
            log_debug!("Ignoring {} while the navigation app is closed", action);
            return false;
        }

        match event {
            NavEvent::RouteUpdate(update) => self.on_route_update(update, action),
            NavEvent::Maneuver(maneuver) => self.on_maneuver(maneuver, action),
            NavEvent::NextText(event) => self.on_next_text(event, action),
            NavEvent::NextStreet(event) => self.on_next_street(event, action),
            NavEvent::SpeedLimit(event) => self.on_speed_limit(event, action),
            NavEvent::Arrival(event) => {
                let raw = normalize_text(&event.text);
                self.apply(action, None, |state| {
                    state.arrival = non_blank_or(&raw, &state.arrival);
                    state.raw.arrival = raw;
                    state.source = VENDOR_SOURCE.to_string();
                });
            }
            NavEvent::Distance(event) => {
                let raw = normalize_text(&event.text);
                self.apply(action, None, |state| {
                    state.distance = non_blank_or(&raw, &state.distance);
                    state.raw.distance = raw;
                    state.source = VENDOR_SOURCE.to_string();
                });
                self.inner.deps.dispatcher.trigger(Trigger::Distance);
            }
            NavEvent::Time(event) => {
                let raw = normalize_text(&event.text);
                self.apply(action, None, |state| {
                    state.time = non_blank_or(&raw, &state.time);
                    state.raw.time = raw;
                    state.source = VENDOR_SOURCE.to_string();
                });
                self.inner.deps.dispatcher.trigger(Trigger::Time);
            }
            NavEvent::NavActive(event) => self.on_nav_active(event.active, action),
            NavEvent::RoadCamera(event) => self.on_road_camera(event, action),
            NavEvent::TrafficLight(event) => self.inner.deps.tracker.handle(&event, action),
            NavEvent::RoutePolyline(polyline) => log_polyline(&polyline),
            NavEvent::NativeNavStop => {
                log_info!("Navigation stopped by the native navigation integration");
                self.end_navigation(action, self.inner.deps.clock.now_ms());
            }
            NavEvent::AltSpeedSource(event) => self.on_alt_speed(event, action),
        }
        true
    }

    /// Vehicle speed from the host's sensors. Survives navigation resets.
    pub fn set_vehicle_speed(&self, speed_kmh: Option<i32>) {
        self.inner.deps.store.update(|current| NavigationState {
            speed_kmh,
            ..current.clone()
        });
    }

    pub fn is_street_reset_pending(&self) -> bool {
        self.inner.street_reset.is_pending()
    }

    pub fn is_nav_end_pending(&self) -> bool {
        self.inner.nav_end.is_pending()
    }

    fn on_route_update(&self, update: RouteUpdate, action: &str) {
        let timestamp = if update.timestamp > 0 {
            update.timestamp
        } else {
            self.inner.deps.clock.now_ms()
        };

        if !update.route_active {
            log_info!("Route reported inactive, resetting navigation state");
            self.end_navigation(action, timestamp);
            return;
        }

        let title = normalize_text(&update.title);
        let text = normalize_text(&update.text);
        let subtext = normalize_text(&update.subtext);
        let speed_limit = normalize_text(&update.speed_limit);
        let source = normalize_text(&update.source);

        let primary = if title.is_empty() { text.clone() } else { title.clone() };
        let secondary = [text.as_str(), subtext.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty() && *part != primary)
            .collect::<Vec<_>>()
            .join(SECONDARY_SEPARATOR);

        log_debug!(
            "route update primary={:?} secondary={:?} speed_limit={:?}",
            primary,
            secondary,
            speed_limit
        );

        self.apply(action, Some(timestamp), |state| {
            state.primary_text = non_blank_or(&primary, &state.primary_text);
            state.secondary_text = non_blank_or(&secondary, &state.secondary_text);
            state.speed_limit = non_blank_or(&speed_limit, &state.speed_limit);
            state.source = non_blank_or(&source, &state.source);
            state.route_active = Some(true);
            state.raw.title = title;
            state.raw.text = text;
            state.raw.subtext = subtext;
            state.raw.speed_limit = speed_limit;
        });
    }

    fn on_maneuver(&self, event: ManeuverEvent, action: &str) {
        let explicit = event
            .maneuver_type
            .as_deref()
            .map(normalize_text)
            .filter(|name| !name.is_empty());

        let name = match (explicit, &event.icon_bitmap) {
            (Some(name), _) => Some(name),
            (None, Some(bitmap)) => {
                let result = self.inner.deps.classifier.analyze(bitmap.image());
                log_debug!(
                    "classified maneuver icon {}x{} as {:?} (distance {})",
                    bitmap.width(),
                    bitmap.height(),
                    result.best_name,
                    result.best_distance
                );
                result.is_match().then_some(result.best_name)
            }
            (None, None) => None,
        };

        let config = self.inner.deps.config.get();
        let turn_id = name
            .as_deref()
            .and_then(|name| config.maneuver_turn_ids.get(name).copied());
        let bitmap = event.icon_bitmap;

        self.apply(action, None, |state| {
            if let Some(bitmap) = bitmap {
                state.maneuver_bitmap = Some(bitmap);
            }
            if let Some(name) = name {
                state.maneuver_name = name;
                state.native_turn_id = turn_id;
            }
            state.source = VENDOR_SOURCE.to_string();
        });
        self.inner.deps.dispatcher.trigger(Trigger::Maneuver);
    }

    fn on_next_text(&self, event: TextEvent, action: &str) {
        let raw = normalize_text(&event.text);
        let unit = extract_trailing_unit(&raw);
        self.apply(action, None, |state| {
            state.primary_text = non_blank_or(&raw, &state.primary_text);
            state.distance_unit = non_blank_or(&unit, &state.distance_unit);
            state.raw.next_text = raw;
            state.source = VENDOR_SOURCE.to_string();
        });
        self.inner.deps.dispatcher.trigger(Trigger::Distance);
    }

    fn on_next_street(&self, event: TextEvent, action: &str) {
        let raw = normalize_text(&event.text);
        self.apply(action, None, |state| {
            state.secondary_text = non_blank_or(&raw, &state.secondary_text);
            state.raw.next_street = raw;
            state.source = VENDOR_SOURCE.to_string();
        });

        let weak: Weak<NormalizerInner> = Arc::downgrade(&self.inner);
        let delay = self.inner.deps.config.get().street_reset();
        self.inner.street_reset.arm(delay, move || {
            if let Some(inner) = weak.upgrade() {
                EventNormalizer { inner }.on_street_reset();
            }
        });
        self.inner.deps.dispatcher.trigger(Trigger::Street);
    }

    fn on_street_reset(&self) {
        log_debug!("No street update received, clearing street text");
        self.apply(STREET_RESET_ACTION, None, |state| {
            state.secondary_text.clear();
            state.raw.next_street.clear();
        });
        self.inner.deps.dispatcher.trigger(Trigger::Street);
    }

    fn on_speed_limit(&self, event: TextEvent, action: &str) {
        if self.inner.deps.config.get().prefer_alt_speed_source {
            log_debug!("Ignoring navigation speed limit; alternate source preferred");
            return;
        }
        let raw = normalize_text(&event.text);
        self.apply(action, None, |state| {
            state.speed_limit = non_blank_or(&raw, &state.speed_limit);
            state.raw.speed_limit = raw;
            state.source = VENDOR_SOURCE.to_string();
        });
    }

    fn on_nav_active(&self, active: bool, action: &str) {
        if !active {
            let weak: Weak<NormalizerInner> = Arc::downgrade(&self.inner);
            let delay = self.inner.deps.config.get().nav_end_timeout();
            log_debug!("Navigation inactive, ending in {}ms unless reactivated", delay.as_millis());
            self.inner.nav_end.arm(delay, move || {
                if let Some(inner) = weak.upgrade() {
                    let normalizer = EventNormalizer { inner };
                    log_info!("Navigation ended after inactivity timeout");
                    let now = normalizer.inner.deps.clock.now_ms();
                    normalizer.end_navigation(NAV_END_TIMEOUT_ACTION, now);
                }
            });
            return;
        }

        self.inner.nav_end.cancel();
        self.apply(action, None, |state| {
            state.route_active = Some(true);
            state.source = non_blank_or(&state.source, VENDOR_SOURCE);
        });
    }

    fn on_road_camera(&self, event: RoadCameraEvent, action: &str) {
        let id = normalize_text(&event.id);
        let camera = if id.is_empty() {
            RoadCameraInfo::default()
        } else {
            RoadCameraInfo {
                id,
                distance: normalize_text(&event.distance),
                icon: event.icon,
            }
        };
        self.apply(action, None, |state| {
            state.road_camera = camera;
        });
    }

    fn on_alt_speed(&self, event: AltSpeedEvent, action: &str) {
        let limit = event.effective_limit();
        let prefer = self.inner.deps.config.get().prefer_alt_speed_source;
        let now = self.inner.deps.clock.now_ms();
        let info = AltSpeedInfo {
            present: true,
            has_camera: event.has_camera,
            distance_m: event.distance,
            cam_type: event.cam_type,
            cam_flag: event.cam_flag,
            limit,
            updated_at: now,
        };
        self.apply(action, Some(now), |state| {
            state.alt_speed = info;
            if let (true, Some(limit)) = (prefer, limit) {
                state.speed_limit = limit.to_string();
            }
        });
    }

    /// Reset shared by route-inactive, native stop and the nav-end timeout.
    fn end_navigation(&self, action: &str, timestamp: i64) {
        let deps = &self.inner.deps;
        self.inner.street_reset.cancel();
        self.inner.nav_end.cancel();
        deps.tracker.clear();
        deps.store
            .reset(action, timestamp, deps.config.get().reset_preserve);
        deps.dispatcher.stop();
    }

    /// Copy-on-write update that also stamps the revision.
    fn apply<F>(&self, action: &str, timestamp: Option<i64>, mutate: F)
    where
        F: FnOnce(&mut NavigationState),
    {
        let timestamp = timestamp.unwrap_or_else(|| self.inner.deps.clock.now_ms());
        self.inner.deps.store.update(|current| {
            let mut next = current.clone();
            mutate(&mut next);
            next.last_updated = timestamp;
            next.last_action = action.to_string();
            next
        });
    }
}

fn log_polyline(polyline: &RoutePolyline) {
    log_info!(
        "route polyline id={:?} active={} points={}",
        polyline.id,
        polyline.active,
        polyline.points.len()
    );
}
