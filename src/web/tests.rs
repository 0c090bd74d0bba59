use super::*;
use crate::actuator::{ActuatorCoordinator, Enclosure};
use crate::config::Config;
use crate::event_log::EventLog;
use crate::geo::{FallbackTimes, SolarTimeResolver};
use crate::hardware::dry_run::DryRunOutput;
use crate::sensors::{ClimateReading, ClimateSensor};
use crate::testing::FixedSolarSource;
use crate::time_source::ManualTimeSource;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

struct Fixture {
    _dir: TempDir,
    enclosure: Arc<Enclosure>,
    state: AppState,
}

struct SteadySensor;

impl ClimateSensor for SteadySensor {
    fn read(&self) -> anyhow::Result<ClimateReading> {
        Ok(ClimateReading {
            celsius: 20.0,
            humidity: 55.25,
        })
    }
}

fn fixture(sensor: Option<Arc<dyn ClimateSensor>>) -> Fixture {
    let dir = tempdir().unwrap();
    let tz = chrono_tz::US::Pacific;
    let clock: Arc<dyn TimeSource> = Arc::new(ManualTimeSource::new(
        tz.with_ymd_and_hms(2024, 6, 1, 0, 15, 0)
            .unwrap()
            .with_timezone(&Utc),
    ));
    let config = Config {
        supplemental_lighting: Some(false),
        ..Default::default()
    };
    let events = Arc::new(
        EventLog::open(&dir.path().join("coop.log"), 1_000_000, 2, tz, clock.clone()).unwrap(),
    );
    let coordinator = ActuatorCoordinator::new(
        Arc::new(DryRunOutput::new()),
        events.clone(),
        clock.clone(),
        config.settle_time(),
    );
    let enclosure = Arc::new(Enclosure::new(&config, coordinator));
    let resolver = Arc::new(SolarTimeResolver::new(
        Box::new(FixedSolarSource::new(tz, "05:30", "21:15", "20:50")),
        tz,
        FallbackTimes {
            sunrise: config.fallback_sunrise(),
            dusk: config.fallback_dusk(),
            sunset: config.fallback_sunset(),
        },
    ));
    let scheduler = Arc::new(DailyScheduler::new(
        &config,
        resolver,
        enclosure.clone(),
        events.clone(),
        clock.clone(),
    ));
    scheduler.install_today_schedule();

    let state = AppState {
        gateway: Arc::new(OverrideGateway::new(enclosure.clone(), events)),
        scheduler,
        sensor,
        clock,
        tz,
    };
    Fixture {
        _dir: dir,
        enclosure,
        state,
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
}

#[tokio::test]
async fn test_manual_route_runs_command() {
    let f = fixture(None);
    let (status, json) = get_json(build_router(f.state.clone()), "/manualcoopopen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "result": "Opened coop" }));

    let (status, json) = get_json(build_router(f.state), "/manualcooplightoff").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "Turned light off");
}

#[tokio::test]
async fn test_manual_route_conflicts_while_door_runs() {
    let f = fixture(None);
    let _held = f.enclosure.coordinator().try_acquire().unwrap();

    let (status, json) = get_json(build_router(f.state.clone()), "/manualtunnelclose").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["result"].as_str().unwrap().contains("did not run"));

    // Level devices are not guarded by default
    let (status, _) = get_json(build_router(f.state), "/manualiron").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_every_command_has_a_route() {
    let f = fixture(None);
    for command in Command::ALL {
        let (status, _) = get_json(build_router(f.state.clone()), &format!("/{}", command.route())).await;
        assert_eq!(status, StatusCode::OK, "{}", command.route());
    }
    let (status, _) = get(build_router(f.state), "/manualcoopexplode").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_reports_schedule_and_zero_climate_without_sensor() {
    let f = fixture(None);
    let (status, json) = get_json(build_router(f.state), "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(json["time"], "Saturday, June 01  0:15");
    assert_eq!(json["temperature_f"], 32.0);
    assert_eq!(json["humidity"], 0.0);
    assert_eq!(json["sunrise"], "06-01-24 05:30");
    assert_eq!(json["sunrise_provenance"], "live");
    assert_eq!(json["dusk"], "06-01-24 21:15");
    assert_eq!(json["fallback_sunrise"], "05:30");

    let labels: Vec<&str> = json["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Coop Open", "Tunnel Open", "Coop Close", "Tunnel Close"]);
}

#[tokio::test]
async fn test_dashboard_renders_climate_and_buttons() {
    let f = fixture(Some(Arc::new(SteadySensor)));
    let (status, html) = get(build_router(f.state), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Temperature 68.0&deg;F"));
    assert!(html.contains("Humidity 55.3%"));
    assert!(html.contains("Tunnel Open (next run at: 2024-06-01 06:00:00 PDT)"));
    assert!(html.contains("trigger('manualcooplighton')"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let f = fixture(None);
    let req = Request::builder()
        .uri("/api/status")
        .header("origin", "http://example.net")
        .body(Body::empty())
        .unwrap();
    let response = build_router(f.state).oneshot(req).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
