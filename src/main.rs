//! Replays a JSON-lines capture of navigation events through the engine and
//! logs how the navigation state evolves.
//!
//! Usage: `navhud-replay <events.jsonl> [config.json]`
//!
//! Each line is either an event (`{"action":"next_text","text":"350 м"}`) or
//! a pause (`{"wait_ms":5000}`) that lets timers run.

use std::{env, fs, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::Deserialize;

use navhud_lib::{
    dispatch::{select_sink, LoggingSink, SinkFactory, TurnByTurnSink},
    init_logging,
    models::{NavEvent, NavigationState},
    settings::ConfigStore,
    HudEngine,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayStep {
    Wait { wait_ms: u64 },
    Event(NavEvent),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let mut args = env::args().skip(1);
    let Some(events_path) = args.next() else {
        bail!("usage: navhud-replay <events.jsonl> [config.json]");
    };
    let config = match args.next() {
        Some(path) => ConfigStore::load(&path)?,
        None => ConfigStore::default(),
    };

    let enabled = config.get().native_nav_enabled;
    let factories: Vec<SinkFactory> = vec![Box::new(|| {
        Some(Arc::new(LoggingSink::default()) as Arc<dyn TurnByTurnSink>)
    })];
    let engine = HudEngine::from_config(config, select_sink(enabled, factories))?;
    engine.subscribe(Arc::new(|state: &NavigationState| {
        info!("{}", summarize(state));
    }));

    let contents = fs::read_to_string(&events_path)
        .with_context(|| format!("Failed to read events from {events_path}"))?;

    let mut applied = 0usize;
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<ReplayStep>(line) {
            Ok(ReplayStep::Wait { wait_ms }) => {
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
            Ok(ReplayStep::Event(event)) => {
                if engine.handle(event) {
                    applied += 1;
                }
            }
            Err(err) => warn!("Skipping line {}: {}", index + 1, err),
        }
        // Let any timer that came due run before the next line.
        tokio::task::yield_now().await;
    }

    let state = engine.snapshot();
    info!("Replayed {} event(s); final state: {}", applied, summarize(&state));
    println!("{}", serde_json::to_string_pretty(&*state)?);
    Ok(())
}

fn summarize(state: &NavigationState) -> String {
    format!(
        "[{}] primary={:?} secondary={:?} maneuver={:?} limit={:?} eta={:?} arrival={:?} lights={}",
        state.last_action,
        state.primary_with_unit(),
        state.secondary_text,
        state.maneuver_name,
        state.speed_limit,
        state.time,
        state.arrival_24h(),
        state.traffic_lights.len()
    )
}
