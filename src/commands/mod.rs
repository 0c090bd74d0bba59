//! One-shot command-line commands.
//!
//! Each command lives in its own submodule; the daemon itself is run from
//! [`crate::app`].

pub mod schedule;
pub mod trigger;
