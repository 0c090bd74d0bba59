//! Daemon assembly and lifecycle.
//!
//! [`Coop`] wires the components together for a given configuration, output
//! port and clock; [`ApplicationRunner`] adds the process concerns around it
//! (signals, instance lock, scheduler thread, control socket, web server).
//!
//! Startup order:
//! 1. Load configuration and take the instance lock
//! 2. Open the event log and drive every output channel inactive
//! 3. Install today's schedule, arm the refresh job, log `Startup Check`
//! 4. Start the scheduler thread and the control socket
//! 5. Serve the web page (or idle) until a shutdown signal arrives

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::actuator::{ActuatorCoordinator, Enclosure};
use crate::common::constants::*;
use crate::config::Config;
use crate::event_log::EventLog;
use crate::gateway::OverrideGateway;
use crate::geo::SolarTimeResolver;
use crate::hardware::{OutputPort, create_output, initialize_outputs};
use crate::io::ipc::{self, IpcServer};
use crate::io::lock::acquire_lock;
use crate::io::signals::setup_signal_handler;
use crate::logger::Log;
use crate::scheduler::DailyScheduler;
use crate::sensors::{ClimateSensor, IioClimateSensor};
use crate::time_source::{self, TimeSource};
use crate::web::{self, AppState};

const IDLE_POLL: Duration = Duration::from_millis(200);

/// The running coop: every component, wired together.
pub struct Coop {
    pub events: Arc<EventLog>,
    pub enclosure: Arc<Enclosure>,
    pub scheduler: Arc<DailyScheduler>,
    pub gateway: Arc<OverrideGateway>,
    pub clock: Arc<dyn TimeSource>,
}

impl Coop {
    /// Build the components and drive every output channel inactive.
    pub fn assemble(
        config: &Config,
        output: Arc<dyn OutputPort>,
        resolver: SolarTimeResolver,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        let events = Arc::new(
            EventLog::open(
                &config.log_file(),
                config.log_max_bytes.unwrap_or(DEFAULT_LOG_MAX_BYTES),
                config.log_backups.unwrap_or(DEFAULT_LOG_BACKUPS),
                config.timezone(),
                clock.clone(),
            )
            .context("Failed to open the event log")?,
        );

        let failures = initialize_outputs(output.as_ref(), &config.pins().channels());
        if failures > 0 {
            log_warning!("{failures} output channel(s) failed to initialise");
        }

        let coordinator = ActuatorCoordinator::new(
            output,
            events.clone(),
            clock.clone(),
            config.settle_time(),
        );
        let enclosure = Arc::new(Enclosure::new(config, coordinator));
        let scheduler = Arc::new(DailyScheduler::new(
            config,
            Arc::new(resolver),
            enclosure.clone(),
            events.clone(),
            clock.clone(),
        ));
        let gateway = Arc::new(OverrideGateway::new(enclosure.clone(), events.clone()));

        Ok(Self {
            events,
            enclosure,
            scheduler,
            gateway,
            clock,
        })
    }

    /// Install today's jobs and the daily refresh, then log the startup marker.
    pub fn start(&self) {
        self.scheduler.install_today_schedule();
        self.scheduler.arm_refresh();
        self.scheduler.log_schedule("Startup Check");
    }

    pub fn web_state(&self, config: &Config) -> AppState {
        let sensor = config
            .climate_sensor()
            .map(|device| Arc::new(IioClimateSensor::new(device)) as Arc<dyn ClimateSensor>);
        AppState {
            gateway: self.gateway.clone(),
            scheduler: self.scheduler.clone(),
            sensor,
            clock: self.clock.clone(),
            tz: config.timezone(),
        }
    }
}

/// Builder for running the daemon.
pub struct ApplicationRunner {
    debug_enabled: bool,
    web_enabled: bool,
    create_lock: bool,
    socket_path: Option<PathBuf>,
}

impl ApplicationRunner {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            web_enabled: true,
            create_lock: true,
            socket_path: None,
        }
    }

    /// Skip the web server even if the configuration enables it.
    pub fn without_web(mut self) -> Self {
        self.web_enabled = false;
        self
    }

    /// Skip the single-instance lock.
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    /// Listen for `coopd trigger` on a non-default socket.
    pub fn with_socket_path(mut self, path: PathBuf) -> Self {
        self.socket_path = Some(path);
        self
    }

    pub fn run(self) -> Result<()> {
        log_version!();
        if self.debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled - showing detailed operations");
        }

        let signal_state = setup_signal_handler(self.debug_enabled)?;
        let running = signal_state.running.clone();

        let config = Config::load()?;
        config.log_config();

        let _lock = if self.create_lock {
            let lock = acquire_lock()?;
            log_block_start!("Lock acquired, starting coopd...");
            Some(lock)
        } else {
            None
        };

        let coop = Coop::assemble(
            &config,
            create_output(&config),
            SolarTimeResolver::from_config(&config),
            time_source::shared(),
        )?;
        coop.start();

        let scheduler_thread = {
            let scheduler = coop.scheduler.clone();
            let running = running.clone();
            thread::Builder::new()
                .name("scheduler".to_string())
                .spawn(move || scheduler.run(&running))
                .context("Failed to spawn scheduler thread")?
        };

        let socket_path = self.socket_path.clone().unwrap_or_else(ipc::socket_path);
        let ipc_server = match IpcServer::start(
            socket_path,
            coop.gateway.clone(),
            running.clone(),
            self.debug_enabled,
        ) {
            Ok(server) => Some(server),
            Err(e) => {
                log_warning!("Command line triggers unavailable: {e:#}");
                None
            }
        };

        if self.web_enabled
            && config.web_enabled()
            && let Err(e) = self.serve_web(&config, &coop, running.clone())
        {
            log_error!("{e:#}");
            log_indented!("Continuing without the web page");
        }

        // Idle until a signal clears the flag (the web server returns only then,
        // unless it failed to start)
        while running.load(Ordering::SeqCst) {
            thread::sleep(IDLE_POLL);
        }

        log_block_start!("Shutting down...");
        if scheduler_thread.join().is_err() {
            log_error!("Scheduler thread panicked");
        }
        if let Some(server) = ipc_server {
            server.shutdown()?;
        }
        signal_state.close();
        log_end!();
        Ok(())
    }

    fn serve_web(&self, config: &Config, coop: &Coop, running: Arc<AtomicBool>) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start the async runtime")?;
        let state = coop.web_state(config);
        runtime.block_on(web::serve(config.listen(), state, running))
    }
}

/// Set timestamps and the config directory before anything logs.
pub fn prepare(config_dir: Option<String>, timestamps: bool) -> Result<()> {
    Log::set_timestamps(timestamps);
    if config_dir.is_some() {
        crate::config::set_config_dir(config_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::Command;
    use crate::config::GpioBackend;
    use crate::hardware::{DryRunOutput, Level};
    use crate::testing::FixedSolarSource;
    use crate::time_source::ManualTimeSource;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn test_assemble_initialises_outputs_and_logs_startup() {
        let dir = tempdir().unwrap();
        let config = Config {
            gpio_backend: Some(GpioBackend::DryRun),
            log_file: Some(dir.path().join("coop.log").display().to_string()),
            ..Default::default()
        };
        let tz = config.timezone();
        let clock: Arc<dyn TimeSource> = Arc::new(ManualTimeSource::new(
            tz.with_ymd_and_hms(2024, 6, 1, 0, 5, 0)
                .unwrap()
                .with_timezone(&Utc),
        ));
        let output = Arc::new(DryRunOutput::new());
        let resolver = SolarTimeResolver::new(
            Box::new(FixedSolarSource::new(tz, "05:30", "21:15", "20:50")),
            tz,
            crate::geo::FallbackTimes {
                sunrise: config.fallback_sunrise(),
                dusk: config.fallback_dusk(),
                sunset: config.fallback_sunset(),
            },
        );

        let coop = Coop::assemble(&config, output.clone(), resolver, clock).unwrap();
        for (_, channel) in config.pins().channels() {
            assert_eq!(output.level(channel), Some(Level::Inactive));
        }

        coop.start();
        let pending = coop.scheduler.pending_jobs();
        // Four door jobs and the refresh; June needs no lamp
        assert_eq!(pending.len(), 5);

        let log = std::fs::read_to_string(coop.events.path()).unwrap();
        assert!(log.contains(" - Startup Check\n"));
        assert!(log.contains("scheduled - Schedule Refresh (next run at: 2024-06-01 00:10:00 PDT)"));

        assert!(coop.enclosure.actuator(Command::OpenCoop).is_some());
    }
}
