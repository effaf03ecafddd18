use serde::Serialize;

use super::parse::{parse_distance_meters, parse_eta_seconds};
use crate::models::NavigationState;
use crate::settings::HudConfig;

/// Consolidated turn-by-turn update handed to the downstream sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnUpdate {
    pub turn_id: i32,
    pub street: String,
    pub distance_to_maneuver_m: u32,
    pub distance_to_destination_m: u32,
    pub total_distance_m: u32,
    pub eta_seconds: u32,
}

impl TurnUpdate {
    /// `total_distance_m` is the longest destination distance seen so far in
    /// the session; the larger of it and the current one is used.
    pub fn from_state(state: &NavigationState, config: &HudConfig, total_distance_m: u32) -> Self {
        let maneuver_text = if state.raw.next_text.trim().is_empty() {
            &state.primary_text
        } else {
            &state.raw.next_text
        };
        let distance_to_destination_m = parse_distance_meters(&state.distance);

        Self {
            turn_id: state
                .native_turn_id
                .unwrap_or_else(|| config.turn_id_for(&state.maneuver_name)),
            street: state.secondary_text.clone(),
            distance_to_maneuver_m: parse_distance_meters(maneuver_text),
            distance_to_destination_m,
            total_distance_m: total_distance_m.max(distance_to_destination_m),
            eta_seconds: parse_eta_seconds(&state.time).unwrap_or(0),
        }
    }

    /// Nothing worth starting a session for.
    pub fn is_empty(&self, default_turn_id: i32) -> bool {
        self.turn_id == default_turn_id
            && self.distance_to_maneuver_m == 0
            && self.distance_to_destination_m == 0
            && self.total_distance_m == 0
            && self.eta_seconds == 0
    }
}
