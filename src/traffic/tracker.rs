use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
    time::Duration,
};

use crate::{
    models::{NavigationState, TrafficLightEvent, TrafficLightInfo},
    settings::ConfigStore,
    store::StateStore,
    timer::{Clock, Scheduler, TimerSlot},
    utils::{sync::lock, text::normalize_text},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Lights sent with this id cannot be addressed individually; they are only
/// removed by expiry.
pub const UNIDENTIFIED_LIGHT_ID: i64 = 0;

pub const EXPIRED_ACTION: &str = "traffic_light_expired";

struct TrackerInner {
    lights: Mutex<HashMap<i64, TrafficLightInfo>>,
    store: StateStore,
    config: ConfigStore,
    clock: Clock,
    expiry: TimerSlot,
}

/// Tracks every traffic light the navigation app currently reports and
/// publishes the most recent ones into the navigation state.
#[derive(Clone)]
pub struct TrafficLightTracker {
    inner: Arc<TrackerInner>,
}

impl TrafficLightTracker {
    pub fn new(store: StateStore, config: ConfigStore, clock: Clock, scheduler: &Scheduler) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                lights: Mutex::new(HashMap::new()),
                store,
                config,
                clock,
                expiry: scheduler.slot("traffic-light-expiry"),
            }),
        }
    }

    pub fn handle(&self, event: &TrafficLightEvent, action: &str) {
        let now = self.inner.clock.now_ms();
        let timestamp = if event.timestamp > 0 { event.timestamp } else { now };
        let id = event.id.unwrap_or(timestamp);
        let color = normalize_text(&event.color);
        let countdown = normalize_text(&event.countdown);

        let mut lights = lock(&self.inner.lights);
        if event.visible {
            let ttl_ms = countdown_ttl_ms(&countdown)
                .unwrap_or_else(|| self.default_ttl_ms());
            log_debug!(
                "traffic light {} visible color={} countdown={:?} ttl={}ms",
                id,
                color,
                countdown,
                ttl_ms
            );
            lights.insert(
                id,
                TrafficLightInfo {
                    id,
                    color: color.clone(),
                    countdown_text: countdown.clone(),
                    arrow_icon: event.arrow_icon.clone(),
                    arrow_direction: event.arrow_direction.clone(),
                    last_updated: timestamp,
                    expires_at: now.saturating_add(ttl_ms),
                },
            );
        } else if id == UNIDENTIFIED_LIGHT_ID {
            log_debug!("ignoring invisibility for unidentified traffic light; it leaves on expiry");
            return;
        } else if lights.remove(&id).is_none() {
            log_debug!("traffic light {} already gone", id);
            return;
        } else {
            log_debug!("traffic light {} no longer visible", id);
        }

        self.publish(&lights, |state| {
            state.raw.traffic_light = color;
            state.raw.traffic_countdown = countdown;
            state.last_updated = timestamp;
            state.last_action = action.to_string();
        });
        self.reschedule(&lights, now);
    }

    /// Forget every light without publishing. Used when navigation resets.
    pub fn clear(&self) {
        let mut lights = lock(&self.inner.lights);
        lights.clear();
        self.inner.expiry.cancel();
    }

    pub fn tracked_count(&self) -> usize {
        lock(&self.inner.lights).len()
    }

    fn on_expiry(&self) {
        let now = self.inner.clock.now_ms();
        let mut lights = lock(&self.inner.lights);
        let before = lights.len();
        lights.retain(|_, light| light.expires_at > now);
        let purged = before - lights.len();
        if purged > 0 {
            log_info!("{} traffic light(s) expired, {} remaining", purged, lights.len());
            self.publish(&lights, |state| {
                state.last_updated = now;
                state.last_action = EXPIRED_ACTION.to_string();
            });
        }
        self.reschedule(&lights, now);
    }

    /// Recompute the visible subset and publish it. Caller holds the lights
    /// lock so the map and the published list never disagree.
    fn publish<F>(&self, lights: &HashMap<i64, TrafficLightInfo>, stamp: F)
    where
        F: FnOnce(&mut NavigationState),
    {
        let max_active = self.inner.config.get().max_active_lights();
        let visible = visible_lights(lights.values(), max_active);
        let (color, countdown) = visible
            .first()
            .map(|light| (light.color.clone(), light.countdown_text.clone()))
            .unwrap_or_default();

        self.inner.store.update(move |current| {
            let mut next = current.clone();
            next.traffic_light = color;
            next.traffic_countdown = countdown;
            next.traffic_lights = visible;
            stamp(&mut next);
            next
        });
    }

    fn reschedule(&self, lights: &HashMap<i64, TrafficLightInfo>, now: i64) {
        let Some(next_expiry) = lights.values().map(|light| light.expires_at).min() else {
            self.inner.expiry.cancel();
            return;
        };
        let delay_ms = u64::try_from(next_expiry.saturating_sub(now)).unwrap_or(0);
        let weak: Weak<TrackerInner> = Arc::downgrade(&self.inner);
        self.inner.expiry.arm(Duration::from_millis(delay_ms), move || {
            if let Some(inner) = weak.upgrade() {
                TrafficLightTracker { inner }.on_expiry();
            }
        });
    }

    fn default_ttl_ms(&self) -> i64 {
        i64::try_from(self.inner.config.get().traffic_light_default_ttl_ms).unwrap_or(i64::MAX)
    }
}

/// Most recently updated first, ties broken by ascending id, capped at
/// `max_active`.
pub fn visible_lights<'a, I>(lights: I, max_active: usize) -> Vec<TrafficLightInfo>
where
    I: IntoIterator<Item = &'a TrafficLightInfo>,
{
    let mut sorted: Vec<TrafficLightInfo> = lights.into_iter().cloned().collect();
    sorted.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted.truncate(max_active.max(1));
    sorted
}

/// Lifetime implied by a countdown such as `"10"` or `"10 с"`; `None` when
/// there is no positive leading number.
pub fn countdown_ttl_ms(countdown: &str) -> Option<i64> {
    let digits: String = countdown
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let seconds: i64 = digits.parse().ok()?;
    (seconds > 0).then(|| seconds.saturating_mul(1_000))
}
