#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_time::Duration;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Io;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use log::{info, warn};

use stormnode_core::bus::BusResponder;
use stormnode_core::sampling::Scheduler;
use stormnode_firmware::app_state::{
    AdcBank, CONFIG, STATION, TimerSleep, init_edge_interrupts, sensor_input,
};
use stormnode_firmware::bus_link::UartLink;

/// Interval at which the host controller reads the node.
const HOST_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    // Lowest clock the ADC and UART are happy with
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::_80MHz);
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    if !CONFIG.matches_poll_interval(HOST_POLL_INTERVAL, Duration::from_millis(100)) {
        warn!(
            "Sampling epoch of {} ms does not match the {} ms host poll interval",
            CONFIG.epoch_duration().as_millis(),
            HOST_POLL_INTERVAL.as_millis()
        );
    }

    // 1. Edge-counted sensors
    let mut io = Io::new(peripherals.IO_MUX);
    init_edge_interrupts(
        &mut io,
        sensor_input(peripherals.GPIO5),
        sensor_input(peripherals.GPIO6),
    );

    // 2. Analog channels and the polled rain bucket
    let adc = AdcBank::new(
        peripherals.ADC1,
        peripherals.GPIO1,
        peripherals.GPIO2,
        peripherals.GPIO3,
        peripherals.GPIO4,
    );
    let rain = sensor_input(peripherals.GPIO7);

    // 3. Host link
    let uart = Uart::new(
        peripherals.UART1,
        UartConfig::default().with_baudrate(115_200),
    )
    .expect("Failed to initialize host UART")
    .with_tx(peripherals.GPIO17)
    .with_rx(peripherals.GPIO18)
    .into_async();
    let mut link = UartLink::new(uart);

    info!(
        "Station ready: resolution {} ({} bits), bus address {:#04x}",
        STATION.resolution(),
        CONFIG.effective_bits(),
        CONFIG.bus_address
    );

    let mut scheduler = match Scheduler::new(CONFIG, &STATION, adc, rain, TimerSleep) {
        Ok(scheduler) => scheduler,
        Err(e) => panic!("Invalid station configuration: {}", e),
    };
    let mut responder = BusResponder::new(&STATION, CONFIG.bus_address);

    join(scheduler.run(), serve_forever(&mut responder, &mut link)).await;

    unreachable!("scheduler and responder run forever")
}

/// Keep answering the host; a link error only restarts the request loop.
async fn serve_forever(responder: &mut BusResponder<'_>, link: &mut UartLink<'_>) {
    loop {
        if let Err(e) = responder.serve(link).await {
            warn!("Bus responder restarting: {}", e);
        }
    }
}
