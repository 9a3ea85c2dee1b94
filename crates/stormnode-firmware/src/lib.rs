//! ESP32-S3 firmware-specific modules for stormnode
//!
//! This crate binds the hardware-independent `stormnode_core` traits to the
//! ESP32-S3 peripherals: ADC1 oneshot conversions, GPIO edge interrupts for
//! the lightning detector and anemometer, the rain-bucket input, and a UART
//! link to the host controller.

#![no_std]

pub mod app_state;
pub mod bus_link;
