#![no_std]
//! Async driver for the MS5611 barometric pressure sensor on a shared
//! serial bus.
//!
//! The crate splits along the same lines as the hardware protocol: the
//! [`BaroBus`] trait captures the claim/select/transfer contract of the
//! shared bus, [`Ms5611`] owns the calibration constants and the
//! fixed-point compensation state, and [`BaroSampler`] runs the periodic
//! pressure/temperature interleave and publishes [`BaroSample`]s to a
//! capacity-1 queue.

mod bus;
mod device;
mod errors;
mod sampler;

pub use bus::BaroBus;
pub use device::{
    conversion_delay_ms, self_test, Config, Conversion, Ms5611, Osr,
};
pub use errors::Error;
pub use sampler::{
    register_baro_queue, BaroQueue, BaroReceiver, BaroSample, BaroSampler,
    SensorKind, SensorRegistry,
};
