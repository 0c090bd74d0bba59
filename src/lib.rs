//! # coopd
//!
//! Internal library for the coopd daemon: sunrise/dusk driven door, tunnel,
//! lamp and IR automation for an unattended chicken coop.
//!
//! The library exists so the internals can be tested and so `main.rs` stays a
//! thin CLI dispatcher.
//!
//! ## Architecture
//!
//! - **Solar times**: `geo` resolves sunrise, civil dusk and sunset, falling
//!   back to a remembered or configured time of day when a calculation fails
//! - **Actuation**: `actuator` maps commands to output channels and owns the
//!   shared busy guard; `hardware` drives the relay board
//! - **Scheduling**: `scheduler` derives each day's jobs and fires them from a
//!   single timeline thread, re-installing itself shortly after midnight
//! - **Manual override**: `gateway` is shared by the `web` page and the
//!   `io::ipc` control socket used by `coopd trigger`
//! - **Audit trail**: `event_log` is the rotating coop log
//! - **Infrastructure**: configuration, signals, instance lock, logging

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod actuator;
pub mod app;
pub mod args;
pub mod commands;
pub mod common;
pub mod config;
pub mod event_log;
pub mod gateway;
pub mod geo;
pub mod hardware;
pub mod io;
pub mod scheduler;
pub mod sensors;
pub mod time_source;
pub mod web;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;

pub use app::{ApplicationRunner, Coop};
