use std::sync::{Arc, Mutex, Weak};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::Instant,
};

use super::{TurnByTurnSink, TurnUpdate};
use crate::{
    settings::ConfigStore,
    store::StateStore,
    timer::{Scheduler, TimerSlot},
    utils::sync::lock,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Why a downstream update was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Maneuver,
    Distance,
    Street,
    Time,
}

#[derive(Default)]
struct Session {
    /// Bumped by every stop; work queued for an older session is dropped.
    epoch: u64,
    active: bool,
    last_sent: Option<TurnUpdate>,
    total_distance_m: u32,
    last_maneuver_trigger: Option<Instant>,
}

enum SinkCommand {
    Deliver { update: TurnUpdate, epoch: u64 },
    Stop,
}

struct DispatcherInner {
    store: StateStore,
    config: ConfigStore,
    debounce: TimerSlot,
    session: Arc<Mutex<Session>>,
    commands: UnboundedSender<SinkCommand>,
}

/// Coalesces state changes into debounced, deduplicated updates for the
/// external turn-by-turn sink.
///
/// Sink calls run in order on a blocking worker, never on the timer task and
/// never under the session lock.
#[derive(Clone)]
pub struct DownstreamDispatcher {
    inner: Arc<DispatcherInner>,
}

impl DownstreamDispatcher {
    pub fn new(
        store: StateStore,
        config: ConfigStore,
        sink: Arc<dyn TurnByTurnSink>,
        scheduler: &Scheduler,
    ) -> Self {
        let session = Arc::new(Mutex::new(Session::default()));
        let (commands, receiver) = mpsc::unbounded_channel();
        scheduler.spawn(run_sink_worker(receiver, sink, Arc::clone(&session)));

        Self {
            inner: Arc::new(DispatcherInner {
                store,
                config,
                debounce: scheduler.slot("dispatch-debounce"),
                session,
                commands,
            }),
        }
    }

    /// Request an update. Returns false when a maneuver trigger was dropped by
    /// the rate limit.
    pub fn trigger(&self, trigger: Trigger) -> bool {
        let config = self.inner.config.get();

        if trigger == Trigger::Maneuver {
            let mut session = lock(&self.inner.session);
            let now = Instant::now();
            if let Some(last) = session.last_maneuver_trigger {
                if now.duration_since(last) < config.maneuver_rate_limit() {
                    log_debug!("maneuver trigger rate limited");
                    return false;
                }
            }
            session.last_maneuver_trigger = Some(now);
        }

        let weak: Weak<DispatcherInner> = Arc::downgrade(&self.inner);
        self.inner.debounce.arm(config.dispatch_debounce(), move || {
            if let Some(inner) = weak.upgrade() {
                DownstreamDispatcher { inner }.flush();
            }
        });
        true
    }

    /// End the downstream session and forget everything sent so far.
    pub fn stop(&self) {
        self.inner.debounce.cancel();
        let was_active = {
            let mut session = lock(&self.inner.session);
            let was_active = session.active;
            *session = Session {
                epoch: session.epoch.wrapping_add(1),
                ..Session::default()
            };
            was_active
        };
        if was_active {
            self.send(SinkCommand::Stop);
        }
    }

    pub fn is_session_active(&self) -> bool {
        lock(&self.inner.session).active
    }

    pub fn last_sent(&self) -> Option<TurnUpdate> {
        lock(&self.inner.session).last_sent.clone()
    }

    fn flush(&self) {
        let config = self.inner.config.get();
        let state = self.inner.store.snapshot();

        let command = {
            let mut session = lock(&self.inner.session);
            let update = TurnUpdate::from_state(&state, &config, session.total_distance_m);
            session.total_distance_m = update.total_distance_m;

            if !session.active && update.is_empty(config.default_turn_id) {
                log_debug!("skipping empty turn-by-turn payload");
                return;
            }
            SinkCommand::Deliver {
                update,
                epoch: session.epoch,
            }
        };
        self.send(command);
    }

    fn send(&self, command: SinkCommand) {
        if self.inner.commands.send(command).is_err() {
            log_warn!("turn-by-turn worker is gone; dropping sink call");
        }
    }
}

async fn run_sink_worker(
    mut commands: UnboundedReceiver<SinkCommand>,
    sink: Arc<dyn TurnByTurnSink>,
    session: Arc<Mutex<Session>>,
) {
    while let Some(command) = commands.recv().await {
        let result = tokio::task::spawn_blocking({
            let sink = Arc::clone(&sink);
            let session = Arc::clone(&session);
            move || execute(command, sink.as_ref(), &session)
        })
        .await;
        if let Err(err) = result {
            log_warn!("turn-by-turn sink worker join failed: {}", err);
        }
    }
}

fn execute(command: SinkCommand, sink: &dyn TurnByTurnSink, session: &Mutex<Session>) {
    let (update, epoch) = match command {
        SinkCommand::Stop => {
            match sink.stop_session() {
                Ok(()) => log_info!("turn-by-turn session stopped"),
                Err(err) => log_warn!("Failed to stop turn-by-turn session: {:#}", err),
            }
            return;
        }
        SinkCommand::Deliver { update, epoch } => (update, epoch),
    };

    let (started, unchanged) = {
        let session = lock(session);
        if session.epoch != epoch {
            return;
        }
        (session.active, session.last_sent.as_ref() == Some(&update))
    };
    let receiver_active = sink.is_active();

    if started && receiver_active && unchanged {
        log_debug!("turn-by-turn payload unchanged");
        return;
    }

    if !started || !receiver_active {
        if started {
            log_info!("turn-by-turn session dropped by the receiver, restarting");
        }
        if let Err(err) = sink.start_session() {
            log_warn!("Failed to start turn-by-turn session: {:#}", err);
            let mut session = lock(session);
            if session.epoch == epoch {
                session.active = false;
                session.last_sent = None;
            }
            return;
        }

        let mut session = lock(session);
        if session.epoch != epoch {
            drop(session);
            // Stopped while starting; close what was just opened.
            if let Err(err) = sink.stop_session() {
                log_warn!("Failed to stop turn-by-turn session: {:#}", err);
            }
            return;
        }
        session.active = true;
        log_info!("turn-by-turn session started");
    }

    if let Err(err) = sink.update_session(&update) {
        log_warn!("Failed to send turn-by-turn update: {:#}", err);
        let mut session = lock(session);
        if session.epoch == epoch {
            session.last_sent = None;
        }
        return;
    }

    let mut session = lock(session);
    if session.epoch == epoch {
        session.last_sent = Some(update);
    }
}
