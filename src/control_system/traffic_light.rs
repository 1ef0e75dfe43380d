// control_system/traffic_light.rs
use crate::communication::Channel;
use crate::config::LightConfig;
use crate::error::ControlError;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Possible states of a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Red,
    Green,
}

impl Phase {
    pub fn toggled(self) -> Self {
        match self {
            Phase::Red => Phase::Green,
            Phase::Green => Phase::Red,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Red => write!(f, "red"),
            Phase::Green => write!(f, "green"),
        }
    }
}

/// State shared between the light and its oscillator task.
struct Shared {
    /// Published phase; the oscillator is the only writer.
    phase: watch::Sender<Phase>,
    /// Toggles for single-delivery waiters. Only fed while one is registered.
    updates: Channel<Toggle>,
    waiters: Mutex<ChannelWaiters>,
}

#[derive(Debug, Clone, Copy)]
struct Toggle {
    sequence: u64,
    phase: Phase,
}

#[derive(Debug, Default)]
struct ChannelWaiters {
    registered: usize,
    /// Toggles published since the light was created.
    toggles: u64,
}

/// Registration of one [`TrafficLight::wait_for_green`] call. The last one to
/// leave discards toggles nobody consumed.
struct ChannelWaiter<'a> {
    shared: &'a Shared,
    since: u64,
}

impl<'a> ChannelWaiter<'a> {
    fn register(shared: &'a Shared) -> Self {
        let mut waiters = shared.waiters.lock();
        waiters.registered += 1;
        Self {
            shared,
            since: waiters.toggles,
        }
    }
}

impl Drop for ChannelWaiter<'_> {
    fn drop(&mut self) {
        let mut waiters = self.shared.waiters.lock();
        waiters.registered -= 1;
        if waiters.registered == 0 {
            self.shared.updates.clear();
        }
    }
}

/// A traffic light that toggles between red and green after a randomized dwell.
///
/// The light starts red. Once [`TrafficLight::start`] is called, a background
/// task holds each phase for a dwell drawn uniformly from the configured
/// bounds, then flips it and publishes the new phase.
pub struct TrafficLight {
    label: String,
    config: LightConfig,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TrafficLight {
    pub fn new(label: impl Into<String>, config: LightConfig) -> Self {
        let (phase, _) = watch::channel(Phase::Red);
        Self {
            label: label.into(),
            config,
            shared: Arc::new(Shared {
                phase,
                updates: Channel::new(),
                waiters: Mutex::new(ChannelWaiters::default()),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &LightConfig {
        &self.config
    }

    /// Current phase. Does not synchronize with the oscillator, so the value
    /// may be about to change.
    pub fn phase(&self) -> Phase {
        *self.shared.phase.borrow()
    }

    pub fn is_green(&self) -> bool {
        self.phase() == Phase::Green
    }

    /// Observe every phase published after this call.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.shared.phase.subscribe()
    }

    /// Toggles sent to [`TrafficLight::wait_for_green`] callers but not yet
    /// consumed. Always zero while nobody is waiting.
    pub fn pending_updates(&self) -> usize {
        self.shared.updates.len()
    }

    /// Spawns the oscillator task on the current tokio runtime.
    pub fn start(&self) -> Result<(), ControlError> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(ControlError::AlreadyStarted);
        }

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let label = self.label.clone();
        *task = Some(tokio::spawn(cycle_through_phases(shared, config, label)));
        log::debug!("Traffic light {} started", self.label);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels the oscillator task and waits for it to wind down. The light
    /// keeps whatever phase it last published.
    pub async fn stop(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            log::debug!("Traffic light {} stopped at {}", self.label, self.phase());
        }
    }

    /// Consumes toggle notifications until a green one published after this
    /// call arrives.
    ///
    /// Each toggle is delivered to a single caller: when several tasks wait
    /// concurrently, one green toggle releases only one of them and the rest
    /// keep waiting for a later green.
    pub async fn wait_for_green(&self) {
        let waiter = ChannelWaiter::register(&self.shared);
        loop {
            let toggle = self.shared.updates.receive().await;
            if toggle.sequence > waiter.since && toggle.phase == Phase::Green {
                return;
            }
        }
    }

    /// Waits for the next toggle to green. Every caller waiting at the moment
    /// of the toggle is released by it.
    pub async fn wait_until_green(&self) -> Result<(), ControlError> {
        let mut phase = self.shared.phase.subscribe();
        loop {
            phase.changed().await.map_err(|_| ControlError::Stopped)?;
            if *phase.borrow_and_update() == Phase::Green {
                return Ok(());
            }
        }
    }
}

impl Drop for TrafficLight {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

async fn cycle_through_phases(shared: Arc<Shared>, config: LightConfig, label: String) {
    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let mut last_toggle = Instant::now();
    loop {
        let dwell = config.draw_dwell(&mut rng);
        sleep_until(last_toggle + dwell).await;

        let mut next = Phase::Red;
        {
            let mut waiters = shared.waiters.lock();
            waiters.toggles += 1;
            shared.phase.send_modify(|phase| {
                *phase = phase.toggled();
                next = *phase;
            });
            if waiters.registered > 0 {
                shared.updates.send(Toggle {
                    sequence: waiters.toggles,
                    phase: next,
                });
            }
        }
        last_toggle = Instant::now();

        log::debug!(
            "Traffic light {} switched to {} after {} ms",
            label,
            next,
            dwell.as_millis()
        );
    }
}
