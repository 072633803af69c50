//! Idle-driven power mode controller.
//!
//! Two-state control loop: polls idle time and drives the GPU between
//! low-power and high-performance modes with an asymmetric poll cadence.
//! In low-power mode polls are frequent so user activity is picked up
//! quickly; in high-performance mode polls are slow since the only thing
//! to detect is the eventual idle threshold crossing.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::idle::IdleSource;
use crate::power::{PowerMode, PowerSwitch};

/// Tunables for the control loop.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How long the system must be idle before switching to low power.
    pub idle_threshold: Duration,

    /// Poll interval while in low-power mode.
    pub poll_low_power: Duration,

    /// Poll interval while in high-performance mode.
    pub poll_high_power: Duration,
}

/// The idle-power controller.
///
/// Owns the current mode and the two injected collaborators: the idle
/// time source and the mode-switch invoker.
pub struct Controller<I, S> {
    mode: PowerMode,
    idle: I,
    switch: S,
    config: ControllerConfig,
}

impl<I, S> Controller<I, S>
where
    I: IdleSource,
    S: PowerSwitch,
{
    /// Create a new controller. The initial mode is low power; no switch
    /// command is issued until the first transition.
    pub fn new(idle: I, switch: S, config: ControllerConfig) -> Self {
        Self {
            mode: PowerMode::Low,
            idle,
            switch,
            config,
        }
    }

    /// The mode the GPU was last driven to.
    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    /// Run the control loop until the token is cancelled, then force the
    /// GPU back to low power so it is not left performant unsupervised.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            "Controller started (idle threshold {:?}, polling {:?} low / {:?} high)",
            self.config.idle_threshold, self.config.poll_low_power, self.config.poll_high_power
        );

        loop {
            let delay = self.tick().await;

            tokio::select! {
                () = time::sleep(delay) => {}
                () = shutdown.cancelled() => {
                    self.shutdown().await;
                    return;
                }
            }
        }
    }

    /// One poll cycle: sample idle time, apply the transition policy, and
    /// return how long to sleep before the next poll.
    async fn tick(&mut self) -> Duration {
        let idle_ms = match self.idle.sample_idle_ms() {
            Ok(ms) => ms,
            Err(e) => {
                // Fail toward the responsive state: a lost sample counts
                // as user activity.
                warn!("Idle sample failed: {}. Assuming activity.", e);
                0
            }
        };

        debug!("Poll - idle time: {}ms, mode: {}", idle_ms, self.mode.as_str());

        let idle = Duration::from_millis(idle_ms);
        match self.mode {
            PowerMode::Low if idle < self.config.idle_threshold => {
                self.transition(PowerMode::High).await;

                // No High -> Low crossing is possible before the idle
                // threshold has elapsed, so skip polling until then.
                let wait = self.config.idle_threshold - idle + Duration::from_millis(1);
                debug!("Polling again in {:?}", wait);
                wait
            }
            PowerMode::Low => self.config.poll_low_power,
            PowerMode::High => {
                if idle >= self.config.idle_threshold {
                    self.transition(PowerMode::Low).await;
                }
                self.config.poll_high_power
            }
        }
    }

    /// Issue the mode-switch action and record the new mode.
    ///
    /// The update is optimistic: a failed action is logged but the mode is
    /// recorded as switched anyway. No retry, no rollback.
    async fn transition(&mut self, target: PowerMode) {
        if let Err(e) = self.switch.activate(target).await {
            warn!("Failed to switch to {}: {}", target.as_str(), e);
        }
        self.mode = target;

        match target {
            PowerMode::High => info!(
                "Switched to high power - polling for idle every {:?}",
                self.config.poll_high_power
            ),
            PowerMode::Low => info!(
                "Switched to low power - polling for activity every {:?}",
                self.config.poll_low_power
            ),
        }
    }

    /// Force the low-power mode. Shared by the signal-driven shutdown path
    /// and any normal exit path.
    async fn shutdown(&mut self) {
        debug!("Shutdown requested, forcing low power");
        self.transition(PowerMode::Low).await;
    }
}
