//! Hardware-independent core library for stormnode
//!
//! This crate contains all platform-agnostic logic for the stormnode weather
//! station sensor node: oversampled analog acquisition, interrupt-driven event
//! counting, the duty-cycled sampling scheduler, and the bus responder that
//! hands snapshots of the station state to the host controller.
//!
//! It is `#![no_std]` and allocation-free so it compiles on both embedded
//! targets (ESP32-S3) and desktop hosts (for the simulator and tests).
//!
//! Hardware is reached only through small traits:
//!
//! - [`sensors::AdcReader`] for raw analog conversions
//! - [`sampling::PowerSaver`] for the low-power sleep between ticks
//! - [`embedded_hal::digital::InputPin`] for the rain-bucket switch
//! - [`embedded_io_async::Read`] / [`embedded_io_async::Write`] for the bus link

#![no_std]

pub mod app_state;
pub mod bus;
pub mod config;
pub mod sampling;
pub mod sensors;
