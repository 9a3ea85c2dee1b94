//! Duty-cycled sampling scheduler
//!
//! The scheduler spends almost all of its time asleep in short power-saving
//! ticks. After every tick it polls the rain switch; once every
//! `epoch_ticks` ticks it runs a full oversampled pass over all analog
//! channels and publishes the results to the [`StationState`].
//!
//! ```text
//!            tick < N
//!          ┌──────────┐
//!          ▼          │
//!     ┌──────────┐    │      ┌──────────┐
//! ──► │ Sleeping │ ───┴────► │ Sampling │
//!     └──────────┘  tick = N └──────────┘
//!          ▲                      │
//!          └──────────────────────┘
//! ```

use core::future::Future;

use embassy_time::Duration;
use embedded_hal::digital::InputPin;
use log::{debug, info};

use crate::app_state::StationState;
use crate::config::{ConfigError, StationConfig};
use crate::sensors::{AdcReader, Channel, Oversampler, RainFlipDetector};

/// Platform low-power primitive.
///
/// `idle` returns after roughly `duration`. While idle, the ADC and unused
/// timers may be powered down, but the edge interrupts and the bus link must
/// stay live.
pub trait PowerSaver {
    fn idle(&mut self, duration: Duration) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Sleeping,
    Sampling,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Slept and polled the rain switch
    Slept,
    /// Slept, polled the rain switch and refreshed every channel
    Sampled,
}

pub struct Scheduler<'a, A, P, S> {
    config: StationConfig,
    state: &'a StationState,
    sampler: Oversampler<A>,
    rain: RainFlipDetector<P>,
    power: S,
    phase: SchedulerPhase,
    ticks: u16,
    passes: u32,
}

impl<'a, A, P, S> Scheduler<'a, A, P, S>
where
    A: AdcReader,
    P: InputPin,
    S: PowerSaver,
{
    /// Build a scheduler for `config`, rejecting configurations the
    /// oversampler cannot run.
    pub fn new(
        config: StationConfig,
        state: &'a StationState,
        adc: A,
        rain_pin: P,
        power: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            state,
            sampler: Oversampler::new(adc, config.oversample_bits),
            rain: RainFlipDetector::new(rain_pin),
            power,
            phase: SchedulerPhase::Sleeping,
            ticks: 0,
            passes: 0,
        })
    }

    pub const fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Ticks elapsed in the current epoch.
    pub const fn ticks(&self) -> u16 {
        self.ticks
    }

    /// Completed sampling passes since start.
    pub const fn passes(&self) -> u32 {
        self.passes
    }

    pub fn sampler_mut(&mut self) -> &mut Oversampler<A> {
        &mut self.sampler
    }

    pub fn power_mut(&mut self) -> &mut S {
        &mut self.power
    }

    pub fn rain_mut(&mut self) -> &mut RainFlipDetector<P> {
        &mut self.rain
    }

    /// Sleep one tick, poll the rain switch, and sample if the epoch is over.
    pub async fn tick(&mut self) -> TickOutcome {
        self.phase = SchedulerPhase::Sleeping;
        self.power.idle(self.config.tick).await;

        self.ticks = self.ticks.saturating_add(1);
        self.rain.poll(self.state.counters());

        if self.ticks < self.config.epoch_ticks {
            return TickOutcome::Slept;
        }

        self.phase = SchedulerPhase::Sampling;
        self.ticks = 0;
        self.sample_all();
        self.phase = SchedulerPhase::Sleeping;
        TickOutcome::Sampled
    }

    /// Run forever.
    pub async fn run(&mut self) {
        info!(
            "Scheduler running: {} ms ticks, sampling every {} ticks at {} bits",
            self.config.tick.as_millis(),
            self.config.epoch_ticks,
            self.config.effective_bits()
        );

        loop {
            self.tick().await;
        }
    }

    fn sample_all(&mut self) {
        let readings = self.state.readings();
        for channel in Channel::ALL {
            readings.store(channel, self.sampler.take_sample(channel));
        }

        self.passes = self.passes.wrapping_add(1);
        let [battery, temperature, current, wind_direction] = readings.load_all();
        debug!(
            "Pass {}: battery={} temperature={} current={} wind_dir={}",
            self.passes, battery, temperature, current, wind_direction
        );
    }
}
