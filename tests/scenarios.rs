use std::{
    collections::HashMap,
    fs,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use image::{Rgba, RgbaImage};
use navhud_lib::{
    dispatch::{TurnByTurnSink, TurnUpdate},
    maneuver::NoIcons,
    models::{Bitmap, ManeuverEvent, NavEvent, NavigationState, RouteUpdate, TextEvent, TrafficLightEvent},
    settings::{ConfigStore, HudConfig},
    timer::{Clock, Scheduler},
    HudEngine,
};
use tokio::time;

#[derive(Default)]
struct RecordingSink {
    started: Mutex<usize>,
    updates: Mutex<Vec<TurnUpdate>>,
    stopped: Mutex<usize>,
}

impl TurnByTurnSink for RecordingSink {
    fn start_session(&self) -> Result<()> {
        *self.started.lock().unwrap() += 1;
        Ok(())
    }

    fn update_session(&self, update: &TurnUpdate) -> Result<()> {
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    fn stop_session(&self) -> Result<()> {
        *self.stopped.lock().unwrap() += 1;
        Ok(())
    }

    fn is_active(&self) -> bool {
        *self.started.lock().unwrap() > *self.stopped.lock().unwrap()
    }
}

fn engine(config: HudConfig) -> (HudEngine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let engine = HudEngine::with_scheduler(
        ConfigStore::in_memory(config),
        sink.clone(),
        Box::new(NoIcons),
        &Scheduler::current().unwrap(),
        Clock::starting_at(1_700_000_000_000),
    );
    (engine, sink)
}

fn mapped_config() -> HudConfig {
    HudConfig {
        maneuver_turn_ids: HashMap::from([("turn_left".to_string(), 2)]),
        ..HudConfig::default()
    }
}

fn route(title: &str, active: bool) -> NavEvent {
    NavEvent::RouteUpdate(RouteUpdate {
        title: title.into(),
        speed_limit: "60".into(),
        route_active: active,
        ..RouteUpdate::default()
    })
}

fn turn_left() -> NavEvent {
    NavEvent::Maneuver(ManeuverEvent {
        icon_bitmap: None,
        maneuver_type: Some("turn_left".into()),
    })
}

#[tokio::test(start_paused = true)]
async fn street_text_clears_after_quiet_window_and_notifies_downstream() {
    let (engine, sink) = engine(mapped_config());

    engine.handle(route("Turn left", true));
    engine.handle(turn_left());
    engine.handle(NavEvent::NextStreet(TextEvent::new("Main St")));
    time::sleep(Duration::from_millis(200)).await;

    assert_eq!(engine.snapshot().secondary_text, "Main St");
    let sent = sink.updates.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].street, "Main St");
    assert_eq!(sent[0].turn_id, 2);

    time::sleep(Duration::from_millis(5_000)).await;

    let state = engine.snapshot();
    assert_eq!(state.primary_text, "Turn left");
    assert!(state.secondary_text.is_empty());
    let sent = sink.updates.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].street, "");
    assert_eq!(*sink.started.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn route_end_resets_state_and_stops_session() {
    let (engine, sink) = engine(mapped_config());

    engine.handle(route("Turn left", true));
    engine.handle(turn_left());
    engine.handle(NavEvent::Distance(TextEvent::new("4,5 км")));
    engine.handle(NavEvent::Time(TextEvent::new("1 ч 5 мин")));
    time::sleep(Duration::from_millis(200)).await;

    let sent = sink.updates.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].distance_to_destination_m, 4_500);
    assert_eq!(sent[0].total_distance_m, 4_500);
    assert_eq!(sent[0].eta_seconds, 3_900);

    engine.handle(route("", false));
    let state = engine.snapshot();
    assert!(state.primary_text.is_empty());
    assert!(state.maneuver_name.is_empty());
    assert_eq!(state.speed_limit, "60");
    assert!(!engine.dispatcher().is_session_active());
    time::sleep(Duration::from_millis(10)).await;
    assert_eq!(*sink.stopped.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_every_revision() {
    let (engine, _sink) = engine(HudConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let id = engine.subscribe(Arc::new(move |state: &NavigationState| {
        recorder.lock().unwrap().push(state.last_action.clone());
    }));

    engine.handle(NavEvent::NextText(TextEvent::new("350 м")));
    engine.handle(NavEvent::Arrival(TextEvent::new("7:05 PM")));
    assert!(engine.unsubscribe(id));
    engine.handle(NavEvent::Time(TextEvent::new("12 мин")));

    assert_eq!(*seen.lock().unwrap(), vec!["", "next_text", "arrival"]);
    assert_eq!(engine.snapshot().arrival_24h(), "19:05");
}

#[tokio::test(start_paused = true)]
async fn traffic_light_with_countdown_expires_on_time() {
    let (engine, _sink) = engine(HudConfig::default());
    engine.handle(NavEvent::TrafficLight(TrafficLightEvent {
        id: Some(11),
        color: "GREEN".into(),
        countdown: "10".into(),
        ..TrafficLightEvent::default()
    }));

    time::sleep(Duration::from_millis(9_900)).await;
    assert_eq!(engine.snapshot().traffic_lights.len(), 1);

    time::sleep(Duration::from_millis(200)).await;
    let state = engine.snapshot();
    assert!(state.traffic_lights.is_empty());
    assert!(state.traffic_light.is_empty());
}

#[tokio::test(start_paused = true)]
async fn json_events_drive_the_engine() {
    let (engine, _sink) = engine(HudConfig::default());
    assert!(engine
        .handle_json(r#"{"action":"route_update","title":"Keep right","text":"A1","route_active":true}"#)
        .unwrap());
    assert!(engine.handle_json(r#"{"action":"teleport"}"#).is_err());

    let state = engine.snapshot();
    assert_eq!(state.primary_text, "Keep right");
    assert_eq!(state.secondary_text, "A1");
}

fn keep_left_icon() -> RgbaImage {
    RgbaImage::from_fn(90, 60, |x, y| {
        let alpha = if x < 30 || (y > 20 && y < 40) { 255 } else { 0 };
        Rgba([0, 0, 0, alpha])
    })
}

#[tokio::test(start_paused = true)]
async fn icons_from_configured_directory_classify_maneuvers() {
    let dir = std::env::temp_dir().join(format!("navhud-scenario-icons-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    keep_left_icon().save(dir.join("turn_left.png")).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let engine = HudEngine::from_config(
        ConfigStore::in_memory(HudConfig {
            maneuver_icon_dir: Some(dir.clone()),
            ..mapped_config()
        }),
        sink.clone(),
    )
    .unwrap();

    engine.handle(NavEvent::Maneuver(ManeuverEvent {
        icon_bitmap: Some(Bitmap::new(keep_left_icon())),
        maneuver_type: None,
    }));
    let state = engine.snapshot();
    fs::remove_dir_all(&dir).unwrap();

    assert_eq!(state.maneuver_name, "turn_left");
    assert_eq!(state.native_turn_id, Some(2));

    time::sleep(Duration::from_millis(200)).await;
    let sent = sink.updates.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].turn_id, 2);
}
