pub mod bitmap;
pub mod event;
pub mod navigation;

pub use bitmap::Bitmap;
pub use event::{
    AltSpeedEvent, ManeuverEvent, NavActiveEvent, NavEvent, RoadCameraEvent, RouteUpdate,
    RoutePolyline, TextEvent, TrafficLightEvent,
};
pub use navigation::{AltSpeedInfo, NavigationState, RawFields, RoadCameraInfo, TrafficLightInfo};
