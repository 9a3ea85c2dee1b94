//! Hardware bindings for the stormnode sensor board
//!
//! Pin map (ESP32-S3):
//!
//! | Signal             | Pin    | Mode                          |
//! |--------------------|--------|-------------------------------|
//! | Battery divider    | GPIO1  | ADC1, 11 dB                   |
//! | LM35 temperature   | GPIO2  | ADC1, 11 dB                   |
//! | Current sensor     | GPIO3  | ADC1, 11 dB                   |
//! | Wind vane          | GPIO4  | ADC1, 11 dB                   |
//! | Lightning detector | GPIO5  | Input, pull-up, falling edge  |
//! | Anemometer         | GPIO6  | Input, pull-up, falling edge  |
//! | Rain bucket switch | GPIO7  | Input, pull-up, polled        |
//! | Host link TX / RX  | GPIO17 / GPIO18 | UART1                |

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::{Duration, Timer};
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::gpio::{Event, Input, InputConfig, Io, Pull};
use esp_hal::handler;
use esp_hal::peripherals::{ADC1, GPIO1, GPIO2, GPIO3, GPIO4};
use log::info;

use stormnode_core::sampling::PowerSaver;
use stormnode_core::sensors::{AdcReader, Channel};

use super::STATION;

static LIGHTNING_PIN: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));
static WIND_SPEED_PIN: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

/// The four analog channels on ADC1.
pub struct AdcBank<'d> {
    adc: Adc<'d, ADC1<'d>, esp_hal::Blocking>,
    battery: AdcPin<GPIO1<'d>, ADC1<'d>>,
    temperature: AdcPin<GPIO2<'d>, ADC1<'d>>,
    current: AdcPin<GPIO3<'d>, ADC1<'d>>,
    wind_direction: AdcPin<GPIO4<'d>, ADC1<'d>>,
}

impl<'d> AdcBank<'d> {
    pub fn new(
        adc1: ADC1<'d>,
        battery: GPIO1<'d>,
        temperature: GPIO2<'d>,
        current: GPIO3<'d>,
        wind_direction: GPIO4<'d>,
    ) -> Self {
        let mut config = AdcConfig::new();
        let battery = config.enable_pin(battery, Attenuation::_11dB);
        let temperature = config.enable_pin(temperature, Attenuation::_11dB);
        let current = config.enable_pin(current, Attenuation::_11dB);
        let wind_direction = config.enable_pin(wind_direction, Attenuation::_11dB);

        Self {
            adc: Adc::new(adc1, config),
            battery,
            temperature,
            current,
            wind_direction,
        }
    }
}

impl AdcReader for AdcBank<'_> {
    fn convert(&mut self, channel: Channel) -> u16 {
        match channel {
            Channel::Battery => self.adc.read_blocking(&mut self.battery),
            Channel::Temperature => self.adc.read_blocking(&mut self.temperature),
            Channel::Current => self.adc.read_blocking(&mut self.current),
            Channel::WindDirection => self.adc.read_blocking(&mut self.wind_direction),
        }
    }
}

/// Pulled-up input, as used by all three digital sensors.
pub fn sensor_input(pin: impl esp_hal::gpio::InputPin + 'static) -> Input<'static> {
    Input::new(pin, InputConfig::default().with_pull(Pull::Up))
}

/// Hand the lightning and anemometer inputs to the GPIO interrupt handler.
///
/// Both count falling edges from then on.
pub fn init_edge_interrupts(
    io: &mut Io<'_>,
    mut lightning: Input<'static>,
    mut wind_speed: Input<'static>,
) {
    io.set_interrupt_handler(edge_handler);

    critical_section::with(|cs| {
        lightning.listen(Event::FallingEdge);
        LIGHTNING_PIN.borrow_ref_mut(cs).replace(lightning);

        wind_speed.listen(Event::FallingEdge);
        WIND_SPEED_PIN.borrow_ref_mut(cs).replace(wind_speed);
    });

    info!("Edge interrupts armed");
}

#[handler]
fn edge_handler() {
    critical_section::with(|cs| {
        if let Some(pin) = LIGHTNING_PIN.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                STATION.counters().on_lightning_edge();
                pin.clear_interrupt();
            }
        }

        if let Some(pin) = WIND_SPEED_PIN.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                STATION.counters().on_wind_speed_edge();
                pin.clear_interrupt();
            }
        }
    });
}

/// Sleeps on an embassy timer.
///
/// With no task ready the executor parks the core in `waiti`; the GPIO and
/// UART interrupts still wake it.
pub struct TimerSleep;

impl PowerSaver for TimerSleep {
    async fn idle(&mut self, duration: Duration) {
        Timer::after(duration).await;
    }
}
