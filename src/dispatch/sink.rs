use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use log::info;

use super::TurnUpdate;

/// External turn-by-turn consumer, e.g. a vehicle head unit integration.
pub trait TurnByTurnSink: Send + Sync {
    fn start_session(&self) -> Result<()>;

    fn update_session(&self, update: &TurnUpdate) -> Result<()>;

    fn stop_session(&self) -> Result<()>;

    fn is_active(&self) -> bool;
}

/// Produces a sink when its integration is available on this system.
pub type SinkFactory = Box<dyn FnOnce() -> Option<Arc<dyn TurnByTurnSink>> + Send>;

/// First sink a factory can provide, or [`NoopSink`] when forwarding is
/// disabled or nothing is available.
pub fn select_sink<I>(enabled: bool, factories: I) -> Arc<dyn TurnByTurnSink>
where
    I: IntoIterator<Item = SinkFactory>,
{
    if !enabled {
        return Arc::new(NoopSink::default());
    }
    factories
        .into_iter()
        .find_map(|factory| factory())
        .unwrap_or_else(|| Arc::new(NoopSink::default()))
}

/// Accepts everything and goes nowhere.
#[derive(Debug, Default)]
pub struct NoopSink {
    active: AtomicBool,
}

impl TurnByTurnSink for NoopSink {
    fn start_session(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn update_session(&self, _update: &TurnUpdate) -> Result<()> {
        Ok(())
    }

    fn stop_session(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Writes every session call to the log.
#[derive(Debug, Default)]
pub struct LoggingSink {
    active: AtomicBool,
}

impl TurnByTurnSink for LoggingSink {
    fn start_session(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        info!("turn-by-turn session started");
        Ok(())
    }

    fn update_session(&self, update: &TurnUpdate) -> Result<()> {
        info!(
            "turn-by-turn update: turn={} street={:?} next={}m remaining={}m/{}m eta={}s",
            update.turn_id,
            update.street,
            update.distance_to_maneuver_m,
            update.distance_to_destination_m,
            update.total_distance_m,
            update.eta_seconds
        );
        Ok(())
    }

    fn stop_session(&self) -> Result<()> {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("turn-by-turn session stopped");
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
