//! Main application entry point.
//!
//! Parses the command line and hands off to the library: the daemon runner
//! for `run`, or one of the one-shot commands.

use anyhow::Result;

use coopd::actuator::Outcome;
use coopd::args::{self, CliAction, ParsedArgs};
use coopd::commands;
use coopd::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use coopd::{ApplicationRunner, app, log_end, log_error, log_pipe};

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::parse(std::env::args());

    let result = match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(EXIT_SUCCESS)
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(EXIT_SUCCESS)
        }
        CliAction::ShowHelpDueToError { reason } => {
            log_pipe!();
            log_error!("{reason}");
            args::display_help();
            Ok(EXIT_FAILURE)
        }
        CliAction::Run {
            debug_enabled,
            config_dir,
            no_web,
            timestamps,
        } => app::prepare(config_dir, timestamps).and_then(|()| {
            let runner = ApplicationRunner::new(debug_enabled);
            let runner = if no_web { runner.without_web() } else { runner };
            runner.run().map(|()| EXIT_SUCCESS)
        }),
        CliAction::Trigger {
            debug_enabled,
            command,
        } => commands::trigger::handle_trigger_command(command, debug_enabled).map(|outcome| {
            match outcome {
                Outcome::Completed => EXIT_SUCCESS,
                Outcome::Skipped | Outcome::Failed => EXIT_FAILURE,
            }
        }),
        CliAction::Schedule {
            debug_enabled,
            config_dir,
            date,
        } => commands::schedule::handle_schedule_command(config_dir.as_deref(), date, debug_enabled)
            .map(|()| EXIT_SUCCESS),
    };

    match result {
        Ok(EXIT_SUCCESS) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log_pipe!();
            log_error!("{e:#}");
            log_end!();
            std::process::exit(EXIT_FAILURE);
        }
    }
}
