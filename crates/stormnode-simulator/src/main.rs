//! Desktop simulator for the stormnode weather-station sensor node.
//!
//! Runs the stormnode-core scheduler and bus responder against simulated
//! hardware. Separate threads stand in for the execution contexts of the real
//! node:
//!
//! | Thread     | Stands in for                                        |
//! |------------|------------------------------------------------------|
//! | main       | Scheduler mainline (sleep ticks, rain poll, sampling)  |
//! | weather    | Lightning / anemometer edge interrupts, rain bucket    |
//! | responder  | Bus peripheral answering host requests                 |
//! | host       | Host controller polling the node once per epoch        |
//!
//! Set `RUST_LOG=debug` to see every sampling pass.

mod link;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use embassy_futures::block_on;
use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin};
use log::{error, info, warn};
use rand_core::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

use stormnode_core::app_state::StationState;
use stormnode_core::bus::{BusResponder, SNAPSHOT_LEN, Snapshot};
use stormnode_core::config::StationConfig;
use stormnode_core::sampling::{PowerSaver, Scheduler};
use stormnode_core::sensors::{AdcReader, Channel};

use crate::link::ChannelLink;

// ---------------------------------------------------------------------------
// Station configuration
// ---------------------------------------------------------------------------

const CONFIG: StationConfig = StationConfig::DEFAULT;

static STATION: StationState = StationState::new(CONFIG.resolution_max());

/// Interval at which the simulated host polls the node.
const HOST_POLL_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// How long the host waits for a complete frame.
const HOST_READ_TIMEOUT: StdDuration = StdDuration::from_millis(500);

/// Battery divider and reference constants used by the reference host.
const BATTERY_SCALE: f32 = 4.934 * 3.102;

/// Level of the simulated rain-bucket switch.
static RAIN_SWITCH: AtomicBool = AtomicBool::new(false);

// ---------------------------------------------------------------------------
// Simulated hardware
// ---------------------------------------------------------------------------

/// Uniform value in `0..bound`.
fn below(rng: &mut impl RngCore, bound: u32) -> u32 {
    rng.next_u32() % bound.max(1)
}

/// Generates slowly drifting raw ADC codes with one LSB of dither.
struct SimAdc {
    started: Instant,
    noise: Pcg32,
    full_scale: f64,
}

impl SimAdc {
    fn new(base_bits: u8) -> Self {
        Self {
            started: Instant::now(),
            noise: Pcg32::seed_from_u64(0x5EED),
            full_scale: ((1u32 << base_bits) - 1) as f64,
        }
    }

    /// Fraction of full scale for `channel` at time `t` seconds.
    fn level(channel: Channel, t: f64) -> f64 {
        match channel {
            // 3.7–4.1 V through the divider
            Channel::Battery => (3.9 + 0.2 * (t / 90.0).sin()) / BATTERY_SCALE as f64,
            // LM35 at 10 mV/°C on a 5 V reference, 15–25 °C
            Channel::Temperature => (20.0 + 5.0 * (t / 120.0).sin()) * 0.010 / 5.0,
            // Bidirectional sensor centred at half scale
            Channel::Current => 0.5 + 0.1 * (t / 17.0).sin(),
            // Vane sweeping the full circle
            Channel::WindDirection => (t / 60.0).rem_euclid(1.0),
        }
    }
}

impl AdcReader for SimAdc {
    fn convert(&mut self, channel: Channel) -> u16 {
        let t = self.started.elapsed().as_secs_f64();
        let code = Self::level(channel, t) * self.full_scale + below(&mut self.noise, 2) as f64;
        code.clamp(0.0, self.full_scale) as u16
    }
}

/// Rain-bucket switch backed by [`RAIN_SWITCH`].
struct SimRainSwitch;

impl ErrorType for SimRainSwitch {
    type Error = core::convert::Infallible;
}

impl InputPin for SimRainSwitch {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(RAIN_SWITCH.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!RAIN_SWITCH.load(Ordering::Relaxed))
    }
}

/// Sleeps the scheduler thread; the other threads keep running.
struct ThreadSleep;

impl PowerSaver for ThreadSleep {
    async fn idle(&mut self, duration: Duration) {
        thread::sleep(StdDuration::from_micros(duration.as_micros()));
    }
}

/// Fires anemometer and lightning edges and tips the rain bucket.
fn weather_loop() {
    const STEP: StdDuration = StdDuration::from_millis(50);

    let mut rng = Pcg32::seed_from_u64(0xC0FFEE);
    let started = Instant::now();
    let mut next_tip = StdDuration::from_secs(5);

    loop {
        let t = started.elapsed();
        let gust = 1.0 + (t.as_secs_f64() / 30.0).sin();

        // Up to ~2 pulses per step in gusts
        for _ in 0..below(&mut rng, (gust * 2.0) as u32 + 1) {
            STATION.counters().on_wind_speed_edge();
        }

        // Roughly one strike every ten seconds
        if below(&mut rng, 200) == 0 {
            STATION.counters().on_lightning_edge();
        }

        if t >= next_tip {
            RAIN_SWITCH.fetch_xor(true, Ordering::Relaxed);
            next_tip = t + StdDuration::from_secs(3 + below(&mut rng, 8) as u64);
        }

        thread::sleep(STEP);
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

fn responder_loop(mut link: ChannelLink) {
    let mut responder = BusResponder::new(&STATION, CONFIG.bus_address);

    match block_on(responder.serve(&mut link)) {
        Ok(()) => info!("Responder stopped"),
        Err(e) => warn!(
            "Responder stopped after {} transfers: {}",
            responder.transfers(),
            e
        ),
    }
}

/// Polls the node like the host controller and converts the battery code.
fn host_loop(link: ChannelLink) {
    let mut frame = [0u8; SNAPSHOT_LEN];

    loop {
        thread::sleep(HOST_POLL_INTERVAL);

        let stale = link.drain();
        if stale > 0 {
            warn!("Host: dropped {} stale bytes", stale);
        }

        if link.send_byte(CONFIG.bus_address).is_err() {
            error!("Host: link closed");
            return;
        }

        match link.recv_exact(&mut frame, HOST_READ_TIMEOUT) {
            Ok(true) => {}
            Ok(false) => {
                warn!("Host: no answer within {:?}", HOST_READ_TIMEOUT);
                continue;
            }
            Err(_) => {
                error!("Host: link closed");
                return;
            }
        }

        let snapshot = Snapshot::decode(&frame);
        let battery_volts =
            snapshot.battery as f32 * BATTERY_SCALE / snapshot.resolution.max(1) as f32;

        info!(
            "Host: Vbat={:.2} V temp={} current={} wind_dir={} | lightning={} wind_pulses={} rain_flips={}",
            battery_volts,
            snapshot.temperature,
            snapshot.current,
            snapshot.wind_direction,
            snapshot.lightning,
            snapshot.wind_speed,
            snapshot.rain
        );
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting stormnode simulator");

    let mut scheduler = match Scheduler::new(
        CONFIG,
        &STATION,
        SimAdc::new(CONFIG.base_bits),
        SimRainSwitch,
        ThreadSleep,
    ) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("Invalid station configuration: {}", e);
            return;
        }
    };

    let host_interval = Duration::from_millis(HOST_POLL_INTERVAL.as_millis() as u64);
    if !CONFIG.matches_poll_interval(host_interval, Duration::from_millis(100)) {
        warn!(
            "Sampling epoch of {} ms does not match host poll interval of {} ms",
            CONFIG.epoch_duration().as_millis(),
            host_interval.as_millis()
        );
    }

    info!(
        "Resolution constant {} ({} bits), bus address {:#04x}",
        STATION.resolution(),
        CONFIG.effective_bits(),
        CONFIG.bus_address
    );

    let (host_link, node_link) = link::pair();

    thread::Builder::new()
        .name("weather".into())
        .spawn(weather_loop)
        .expect("Failed to spawn weather thread");
    thread::Builder::new()
        .name("responder".into())
        .spawn(move || responder_loop(node_link))
        .expect("Failed to spawn responder thread");
    thread::Builder::new()
        .name("host".into())
        .spawn(move || host_loop(host_link))
        .expect("Failed to spawn host thread");

    block_on(scheduler.run());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_stays_in_range() {
        let mut rng = Pcg32::seed_from_u64(7);

        assert!((0..1000).all(|_| below(&mut rng, 8) < 8));
        assert_eq!(below(&mut rng, 0), 0);
    }

    #[test]
    fn test_sim_adc_codes_fit_base_resolution() {
        let mut adc = SimAdc::new(10);

        for channel in Channel::ALL {
            for _ in 0..100 {
                assert!(adc.convert(channel) <= 1023, "{}", channel.label());
            }
        }
    }
}
