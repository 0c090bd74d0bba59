//! `coopd schedule [--date YYYY-MM-DD]`: show what would be installed.
//!
//! Resolves the solar times for the date and derives the job list exactly as
//! the daemon's install does, without touching hardware or the event log.

use anyhow::Result;
use chrono::NaiveDate;

use crate::config::Config;
use crate::geo::{SolarTimeResolver, SolarTimes, log_solar_times};
use crate::scheduler::{PlanSettings, PlannedJob, derive_plan};

/// Solar times and planned jobs for `date`.
pub fn plan_for(config: &Config, date: NaiveDate) -> (SolarTimes, Vec<PlannedJob>) {
    let resolver = SolarTimeResolver::from_config(config);
    let times = resolver.resolve_day(date);
    let jobs = derive_plan(&times, &PlanSettings::from_config(config));
    (times, jobs)
}

pub fn handle_schedule_command(
    config_dir: Option<&str>,
    date: Option<NaiveDate>,
    debug_enabled: bool,
) -> Result<()> {
    log_version!();
    if let Some(dir) = config_dir {
        crate::config::set_config_dir(Some(dir.to_string()))?;
    }
    let config = Config::load()?;
    if debug_enabled {
        config.log_config();
    }

    let date = date.unwrap_or_else(|| {
        crate::time_source::now()
            .with_timezone(&config.timezone())
            .date_naive()
    });
    let (times, jobs) = plan_for(&config, date);

    log_block_start!("Solar times for {date} ({})", config.timezone());
    log_solar_times(&times);

    log_block_start!("Jobs");
    for job in &jobs {
        log_indented!(
            "{} {}",
            job.fire_at.format("%H:%M:%S"),
            job.command.label()
        );
    }
    log_end!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::Command;

    #[test]
    fn test_plan_for_winter_day_includes_light() {
        let config = Config::default();
        let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        let (times, jobs) = plan_for(&config, date);

        assert!(times.sunrise.is_live());
        let commands: Vec<Command> = jobs.iter().map(|job| job.command).collect();
        assert!(commands.contains(&Command::LightOn));
        assert!(commands.contains(&Command::LightOff));
        assert!(commands.contains(&Command::OpenTunnel));
    }
}
