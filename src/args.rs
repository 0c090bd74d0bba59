//! Command-line argument parsing.
//!
//! ```text
//! coopd [run] [--debug] [--config DIR] [--no-web] [--timestamps]
//! coopd trigger <command> [--debug]
//! coopd schedule [--date YYYY-MM-DD] [--config DIR] [--debug]
//! coopd help | --help | --version
//! ```

use chrono::NaiveDate;

use crate::actuator::Command;
use crate::time_source::parse_date;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        no_web: bool,
        timestamps: bool,
    },
    /// Ask the running daemon to carry out one command now
    Trigger {
        debug_enabled: bool,
        command: Command,
    },
    /// Print the plan for a date without touching hardware
    Schedule {
        debug_enabled: bool,
        config_dir: Option<String>,
        date: Option<NaiveDate>,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help after a usage error and exit non-zero
    ShowHelpDueToError { reason: String },
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

#[derive(Default)]
struct Flags {
    debug: bool,
    config_dir: Option<String>,
    no_web: bool,
    timestamps: bool,
    date: Option<String>,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    /// Parse arguments; the first item is the program name and is skipped.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let action = match Self::parse_action(args) {
            Ok(action) => action,
            Err(reason) => CliAction::ShowHelpDueToError { reason },
        };
        ParsedArgs { action }
    }

    fn parse_action<I, S>(args: I) -> Result<CliAction, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = Flags::default();
        let mut positional: Vec<String> = Vec::new();

        let mut iter = args.into_iter().skip(1).map(|s| s.as_ref().to_string());
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-d" | "--debug" => flags.debug = true,
                "-h" | "--help" => flags.help = true,
                "-V" | "-v" | "--version" => flags.version = true,
                "--no-web" => flags.no_web = true,
                "--timestamps" => flags.timestamps = true,
                "-c" | "--config" => {
                    flags.config_dir = Some(iter.next().ok_or("--config requires a directory")?);
                }
                "--date" => {
                    flags.date = Some(iter.next().ok_or("--date requires YYYY-MM-DD")?);
                }
                other if other.starts_with('-') => {
                    return Err(format!("Unknown option '{other}'"));
                }
                _ => positional.push(arg),
            }
        }

        // Help and version take precedence over everything else
        if flags.version {
            return Ok(CliAction::ShowVersion);
        }
        if flags.help {
            return Ok(CliAction::ShowHelp);
        }

        let subcommand = positional.first().map(String::as_str).unwrap_or("run");
        let rest = positional.get(1..).unwrap_or_default();

        match subcommand {
            "run" => {
                no_extra(rest)?;
                reject_flag(flags.date.is_some(), "--date", "run")?;
                Ok(CliAction::Run {
                    debug_enabled: flags.debug,
                    config_dir: flags.config_dir,
                    no_web: flags.no_web,
                    timestamps: flags.timestamps,
                })
            }
            "trigger" | "t" => {
                let name = match rest {
                    [name] => name,
                    [] => return Err("trigger requires a command name".to_string()),
                    _ => return Err("trigger takes exactly one command name".to_string()),
                };
                reject_flag(flags.config_dir.is_some(), "--config", "trigger")?;
                reject_flag(flags.date.is_some(), "--date", "trigger")?;
                reject_flag(flags.no_web, "--no-web", "trigger")?;
                Ok(CliAction::Trigger {
                    debug_enabled: flags.debug,
                    command: name.parse()?,
                })
            }
            "schedule" | "s" => {
                no_extra(rest)?;
                reject_flag(flags.no_web, "--no-web", "schedule")?;
                let date = flags.date.as_deref().map(parse_date).transpose()?;
                Ok(CliAction::Schedule {
                    debug_enabled: flags.debug,
                    config_dir: flags.config_dir,
                    date,
                })
            }
            "help" => Ok(CliAction::ShowHelp),
            other => Err(format!("Unknown command '{other}'")),
        }
    }
}

fn no_extra(rest: &[String]) -> Result<(), String> {
    match rest.first() {
        Some(extra) => Err(format!("Unexpected argument '{extra}'")),
        None => Ok(()),
    }
}

fn reject_flag(present: bool, flag: &str, subcommand: &str) -> Result<(), String> {
    if present {
        Err(format!("{flag} cannot be used with '{subcommand}'"))
    } else {
        Ok(())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("coopd [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("    --no-web           Do not start the web control page");
    log_indented!("    --timestamps       Prefix console lines with the time");
    log_indented!("    --date <date>      Date for 'schedule' (YYYY-MM-DD)");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("run                    Run the daemon (default)");
    log_indented!("trigger, t <command>   Run a command now through the running daemon");
    log_indented!("schedule, s            Print the solar times and jobs for a day");
    log_block_start!("Trigger commands:");
    let names: Vec<&str> = Command::ALL.iter().map(|c| c.as_str()).collect();
    log_indented!("{}", names.join(", "));
    log_end!();
}
