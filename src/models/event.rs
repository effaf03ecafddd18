use serde::{Deserialize, Serialize};

use super::Bitmap;

/// One inbound navigation event.
///
/// The `action` tag and field names are the wire contract with producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavEvent {
    RouteUpdate(RouteUpdate),
    Maneuver(ManeuverEvent),
    NextText(TextEvent),
    NextStreet(TextEvent),
    SpeedLimit(TextEvent),
    Arrival(TextEvent),
    Distance(TextEvent),
    Time(TextEvent),
    NavActive(NavActiveEvent),
    RoadCamera(RoadCameraEvent),
    TrafficLight(TrafficLightEvent),
    RoutePolyline(RoutePolyline),
    NativeNavStop,
    AltSpeedSource(AltSpeedEvent),
}

impl NavEvent {
    pub fn action(&self) -> &'static str {
        match self {
            NavEvent::RouteUpdate(_) => "route_update",
            NavEvent::Maneuver(_) => "maneuver",
            NavEvent::NextText(_) => "next_text",
            NavEvent::NextStreet(_) => "next_street",
            NavEvent::SpeedLimit(_) => "speed_limit",
            NavEvent::Arrival(_) => "arrival",
            NavEvent::Distance(_) => "distance",
            NavEvent::Time(_) => "time",
            NavEvent::NavActive(_) => "nav_active",
            NavEvent::RoadCamera(_) => "road_camera",
            NavEvent::TrafficLight(_) => "traffic_light",
            NavEvent::RoutePolyline(_) => "route_polyline",
            NavEvent::NativeNavStop => "native_nav_stop",
            NavEvent::AltSpeedSource(_) => "alt_speed_source",
        }
    }

    /// Parse one JSON-encoded event.
    pub fn from_json(line: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteUpdate {
    pub title: String,
    pub text: String,
    pub subtext: String,
    pub speed_limit: String,
    pub route_active: bool,
    pub source: String,
    /// Producer timestamp in ms; 0 when absent.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManeuverEvent {
    pub icon_bitmap: Option<Bitmap>,
    pub maneuver_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextEvent {
    pub text: String,
}

impl TextEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavActiveEvent {
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadCameraEvent {
    pub id: String,
    pub distance: String,
    pub icon: Option<Bitmap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficLightEvent {
    /// `None` lets the tracker derive an id from the timestamp.
    pub id: Option<i64>,
    pub visible: bool,
    pub color: String,
    pub countdown: String,
    pub timestamp: i64,
    pub arrow_icon: Option<Bitmap>,
    pub arrow_direction: Option<String>,
}

impl Default for TrafficLightEvent {
    fn default() -> Self {
        Self {
            id: None,
            visible: true,
            color: String::new(),
            countdown: String::new(),
            timestamp: 0,
            arrow_icon: None,
            arrow_direction: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutePolyline {
    pub active: bool,
    pub id: String,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltSpeedEvent {
    pub has_camera: bool,
    pub distance: Option<i32>,
    pub limit1: Option<i32>,
    pub limit2: Option<i32>,
    pub cam_type: Option<i32>,
    pub cam_flag: Option<i32>,
}

impl AltSpeedEvent {
    /// First positive limit, preferring `limit1`.
    pub fn effective_limit(&self) -> Option<i32> {
        [self.limit1, self.limit2]
            .into_iter()
            .flatten()
            .find(|limit| *limit > 0)
    }
}
