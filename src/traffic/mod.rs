pub mod tracker;

pub use tracker::{TrafficLightTracker, UNIDENTIFIED_LIGHT_ID};
