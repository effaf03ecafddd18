use serde::Serialize;

use super::Bitmap;
use crate::settings::ResetPreserve;
use crate::utils::text::{append_unit_if_missing, normalize_to_24_hour};

/// Unprocessed copies of the inbound text fields, as last received.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFields {
    pub next_text: String,
    pub next_street: String,
    pub speed_limit: String,
    pub arrival: String,
    pub distance: String,
    pub time: String,
    pub traffic_light: String,
    pub traffic_countdown: String,
    pub title: String,
    pub text: String,
    pub subtext: String,
}

/// Speed data from the alternate (non-navigation-app) speed source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AltSpeedInfo {
    pub present: bool,
    pub has_camera: bool,
    pub distance_m: Option<i32>,
    pub cam_type: Option<i32>,
    pub cam_flag: Option<i32>,
    pub limit: Option<i32>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadCameraInfo {
    pub id: String,
    pub distance: String,
    #[serde(skip)]
    pub icon: Option<Bitmap>,
}

impl RoadCameraInfo {
    pub fn is_present(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLightInfo {
    pub id: i64,
    pub color: String,
    pub countdown_text: String,
    #[serde(skip)]
    pub arrow_icon: Option<Bitmap>,
    pub arrow_direction: Option<String>,
    pub last_updated: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub primary_text: String,
    pub secondary_text: String,
    pub speed_kmh: Option<i32>,
    pub speed_limit: String,
    pub arrival: String,
    pub distance: String,
    pub time: String,
    pub traffic_light: String,
    pub traffic_countdown: String,
    #[serde(skip)]
    pub maneuver_bitmap: Option<Bitmap>,
    pub maneuver_name: String,
    pub source: String,
    pub route_active: Option<bool>,
    pub last_updated: i64,
    pub last_action: String,
    pub raw: RawFields,
    pub distance_unit: String,
    pub native_turn_id: Option<i32>,
    pub alt_speed: AltSpeedInfo,
    pub road_camera: RoadCameraInfo,
    pub traffic_lights: Vec<TrafficLightInfo>,
}

impl NavigationState {
    pub fn is_empty(&self) -> bool {
        self.primary_text.trim().is_empty()
            && self.secondary_text.trim().is_empty()
            && self.speed_kmh.is_none()
            && self.speed_limit.trim().is_empty()
            && self.arrival.trim().is_empty()
            && self.distance.trim().is_empty()
            && self.time.trim().is_empty()
            && self.traffic_light.trim().is_empty()
            && self.traffic_countdown.trim().is_empty()
            && self.maneuver_bitmap.is_none()
    }

    /// State after the route ended. Numeric speed always survives; the rest of
    /// `preserve` decides about speed limit, road camera and alt-speed data.
    pub fn reset(&self, last_action: &str, timestamp: i64, preserve: ResetPreserve) -> Self {
        let mut next = Self {
            speed_kmh: self.speed_kmh,
            route_active: Some(false),
            last_updated: timestamp,
            last_action: last_action.to_string(),
            ..Self::default()
        };
        if preserve.speed_limit {
            next.speed_limit = self.speed_limit.clone();
            next.raw.speed_limit = self.raw.speed_limit.clone();
        }
        if preserve.road_camera {
            next.road_camera = self.road_camera.clone();
        }
        if preserve.alt_speed {
            next.alt_speed = self.alt_speed.clone();
        }
        next
    }

    /// Primary text with the remembered distance unit appended when the
    /// navigation app sent a bare number.
    pub fn primary_with_unit(&self) -> String {
        append_unit_if_missing(&self.primary_text, &self.distance_unit)
    }

    /// Arrival clock time in 24-hour form, or the raw arrival text when it
    /// does not contain a recognisable time.
    pub fn arrival_24h(&self) -> String {
        let arrival = self.arrival.trim();
        normalize_to_24_hour(arrival).unwrap_or_else(|| arrival.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> NavigationState {
        NavigationState {
            primary_text: "Turn left".into(),
            secondary_text: "Main St".into(),
            speed_kmh: Some(54),
            speed_limit: "60".into(),
            time: "12 мин".into(),
            maneuver_name: "turn_left".into(),
            route_active: Some(true),
            road_camera: RoadCameraInfo {
                id: "cam-1".into(),
                distance: "300".into(),
                icon: None,
            },
            alt_speed: AltSpeedInfo {
                present: true,
                limit: Some(70),
                ..AltSpeedInfo::default()
            },
            raw: RawFields {
                speed_limit: "60".into(),
                next_street: "Main St".into(),
                ..RawFields::default()
            },
            ..NavigationState::default()
        }
    }

    #[test]
    fn test_reset_preserves_selected_fields() {
        let state = populated().reset("ended", 42, ResetPreserve::SPEED_LIMIT_ONLY);
        assert_eq!(state.speed_limit, "60");
        assert_eq!(state.raw.speed_limit, "60");
        assert_eq!(state.speed_kmh, Some(54));
        assert!(state.primary_text.is_empty());
        assert!(state.secondary_text.is_empty());
        assert!(state.maneuver_name.is_empty());
        assert!(state.raw.next_street.is_empty());
        assert!(!state.road_camera.is_present());
        assert!(!state.alt_speed.present);
        assert_eq!(state.route_active, Some(false));
        assert_eq!(state.last_action, "ended");
        assert_eq!(state.last_updated, 42);
    }

    #[test]
    fn test_reset_with_full_preserve_keeps_camera_and_alt_speed() {
        let state = populated().reset("ended", 1, ResetPreserve::default());
        assert!(state.road_camera.is_present());
        assert_eq!(state.alt_speed.limit, Some(70));
    }

    #[test]
    fn test_is_empty() {
        assert!(NavigationState::default().is_empty());
        assert!(!populated().is_empty());
    }

    #[test]
    fn test_display_helpers() {
        let state = NavigationState {
            primary_text: "350".into(),
            distance_unit: "м".into(),
            arrival: "7:05 PM".into(),
            ..NavigationState::default()
        };
        assert_eq!(state.primary_with_unit(), "350 м");
        assert_eq!(state.arrival_24h(), "19:05");
    }
}
