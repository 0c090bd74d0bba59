//! Location-based solar event times.
//!
//! - [`solar`]: astronomical sunrise, civil dusk and sunset for the coop's
//!   coordinates, with a per-event fallback that keeps the schedule running
//!   when a calculation fails.

pub mod solar;

pub use solar::{
    AstronomicalSource, FallbackTimes, Provenance, ResolvedTime, SolarEvent, SolarSource,
    SolarTimeResolver, SolarTimes, log_solar_times,
};
