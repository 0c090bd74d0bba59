use super::*;
use crate::actuator::{ActuatorCoordinator, Command, Enclosure, Outcome};
use crate::common::constants::DEFAULT_PIN_TUNNEL_OPEN;
use crate::config::Config;
use crate::event_log::EventLog;
use crate::hardware::dry_run::DryRunOutput;
use crate::time_source::{ManualTimeSource, TimeSource};
use chrono::{TimeZone, Utc};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

struct Fixture {
    dir: TempDir,
    output: Arc<DryRunOutput>,
    enclosure: Arc<Enclosure>,
    events: Arc<EventLog>,
    running: Arc<AtomicBool>,
    server: IpcServer,
}

impl Fixture {
    fn socket(&self) -> PathBuf {
        self.dir.path().join("coopd.sock")
    }

    /// Shut the listener down, handing back the directory so it outlives the check.
    fn stop(self) -> TempDir {
        self.running.store(false, Ordering::SeqCst);
        self.server.shutdown().unwrap();
        self.dir
    }
}

fn start() -> Fixture {
    let dir = tempdir().unwrap();
    let clock: Arc<dyn TimeSource> = Arc::new(ManualTimeSource::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
    ));
    let events = Arc::new(
        EventLog::open(
            &dir.path().join("coop.log"),
            1_000_000,
            2,
            chrono_tz::US::Pacific,
            clock.clone(),
        )
        .unwrap(),
    );
    let output = Arc::new(DryRunOutput::new());
    let coordinator =
        ActuatorCoordinator::new(output.clone(), events.clone(), clock, Duration::from_secs(1));
    let enclosure = Arc::new(Enclosure::new(&Config::default(), coordinator));
    let gateway = Arc::new(OverrideGateway::new(enclosure.clone(), events.clone()));
    let running = Arc::new(AtomicBool::new(true));
    let server = IpcServer::start(
        dir.path().join("coopd.sock"),
        gateway,
        running.clone(),
        false,
    )
    .unwrap();

    Fixture {
        dir,
        output,
        enclosure,
        events,
        running,
        server,
    }
}

#[test]
fn test_trigger_over_socket_runs_actuator() {
    let fixture = start();
    let reply = IpcClient::connect_to(&fixture.socket())
        .unwrap()
        .send(Command::OpenTunnel)
        .unwrap();

    assert_eq!(reply.result, "Opened tunnel");
    assert_eq!(reply.outcome, Outcome::Completed);
    assert_eq!(fixture.output.activations(DEFAULT_PIN_TUNNEL_OPEN), 1);

    let log = std::fs::read_to_string(fixture.events.path()).unwrap();
    assert!(log.contains("Tunnel Opened via command line"));

    let socket = fixture.socket();
    assert!(socket.exists());
    let _dir = fixture.stop();
    assert!(!socket.exists());
}

#[test]
fn test_trigger_while_door_busy_is_skipped() {
    let fixture = start();
    let guard = fixture.enclosure.coordinator().try_acquire().unwrap();

    let reply = IpcClient::connect_to(&fixture.socket())
        .unwrap()
        .send(Command::CloseCoop)
        .unwrap();
    assert_eq!(reply.outcome, Outcome::Skipped);

    drop(guard);
    fixture.stop();
}

#[test]
fn test_unknown_command_gets_error_line() {
    let fixture = start();
    let mut stream = UnixStream::connect(fixture.socket()).unwrap();
    stream
        .write_all(b"{\"command\":\"coop-explode\"}\n")
        .unwrap();

    let mut line = String::new();
    BufReader::new(&stream).read_line(&mut line).unwrap();
    let response: IpcResponse = serde_json::from_str(line.trim()).unwrap();
    match response {
        IpcResponse::Error { error } => assert!(error.contains("coop-explode")),
        other => panic!("expected an error, got {other:?}"),
    }

    fixture.stop();
}

#[test]
fn test_connect_without_daemon_fails_cleanly() {
    let dir = tempdir().unwrap();
    let err = IpcClient::connect_to(&dir.path().join("missing.sock"))
        .err()
        .unwrap();
    assert!(err.to_string().contains("Is coopd running?"));
}
