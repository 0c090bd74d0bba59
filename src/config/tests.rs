use super::loading::{apply_defaults, load_geo_override_from_path};
use super::validation::validate_config;
use super::*;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

fn write_config(dir: &std::path::Path, body: &str) -> PathBuf {
    let path = dir.join(CONFIG_FILE_NAME);
    fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn test_config_load_default_creation() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("coopd").join("coopd.toml");

    let original = std::env::var("XDG_CONFIG_HOME").ok();
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    let result = Config::load();

    unsafe {
        match original {
            Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    let config = result.expect("default config should load");
    assert!(config_path.exists());
    assert_eq!(config.coordinates(), (DEFAULT_LATITUDE, DEFAULT_LONGITUDE));
    assert_eq!(config.pins().door_open, Some(DEFAULT_PIN_DOOR_OPEN));
    assert_eq!(config.past_due(), PastDuePolicy::Fire);
}

#[test]
fn test_default_file_round_trips_through_loader() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join(CONFIG_FILE_NAME);
    create_default_config(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("#[Schedule]"));
    assert!(content.contains("[pulses]"));

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.refresh_at().format("%H:%M").to_string(), "00:10");
    assert_eq!(config.fallback_sunset().format("%H:%M").to_string(), "18:30");
    assert_eq!(config.pulses().coop_close, Some(DEFAULT_PULSE_COOP_CLOSE));
    assert_eq!(config.gpio_backend(), GpioBackend::Sysfs);
}

#[test]
fn test_config_toml_parsing() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(
        temp_dir.path(),
        r#"
latitude = 45.5
longitude = -73.6
timezone = "America/Toronto"
tunnel_open_delay = 45
past_due = "skip"
gpio_backend = "dry-run"
active_low = false

[pins]
door_open = 17

[pulses]
coop_open = 20
"#,
    );

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.coordinates(), (45.5, -73.6));
    assert_eq!(config.timezone(), chrono_tz::America::Toronto);
    assert_eq!(config.tunnel_open_delay(), chrono::Duration::minutes(45));
    assert_eq!(config.past_due(), PastDuePolicy::Skip);
    assert_eq!(config.gpio_backend(), GpioBackend::DryRun);
    assert_eq!(config.active_low, Some(false));

    // Partially specified tables are completed with defaults
    let pins = config.pins();
    assert_eq!(pins.door_open, Some(17));
    assert_eq!(pins.door_close, Some(DEFAULT_PIN_DOOR_CLOSE));
    assert_eq!(config.pulses().coop_open, Some(20));
    assert_eq!(config.pulses().tunnel_close, Some(DEFAULT_PULSE_TUNNEL_CLOSE));
}

#[test]
fn test_config_malformed_toml() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(temp_dir.path(), "latitude = [not toml");
    assert!(load_from_path(&path).is_err());

    let path = write_config(temp_dir.path(), "past_due = \"later\"");
    assert!(load_from_path(&path).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("absent.toml");
    let err = load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_config_validation_basic() {
    let mut config = Config::default();
    apply_defaults(&mut config);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_config_validation_rejects_bad_values() {
    let cases: Vec<(&str, Box<dyn Fn(&mut Config)>)> = vec![
        ("latitude", Box::new(|c: &mut Config| c.latitude = Some(91.0))),
        ("longitude", Box::new(|c: &mut Config| c.longitude = Some(-181.0))),
        ("timezone", Box::new(|c: &mut Config| c.timezone = Some("Mars/Olympus".into()))),
        ("refresh_at", Box::new(|c: &mut Config| c.refresh_at = Some("25:00".into()))),
        (
            "fallback_sunrise",
            Box::new(|c: &mut Config| c.fallback_sunrise = Some("sunrise".into())),
        ),
        (
            "fallback order",
            Box::new(|c: &mut Config| {
                c.fallback_sunrise = Some("19:00".into());
                c.fallback_sunset = Some("07:00".into());
            }),
        ),
        ("tunnel_open_delay", Box::new(|c: &mut Config| c.tunnel_open_delay = Some(721))),
        ("target_daylight", Box::new(|c: &mut Config| c.target_daylight = Some(1441))),
        ("settle_time", Box::new(|c: &mut Config| c.settle_time = Some(61))),
        (
            "pulse zero",
            Box::new(|c: &mut Config| {
                c.pulses = Some(PulseConfig {
                    coop_open: Some(0),
                    ..Default::default()
                })
            }),
        ),
        (
            "pulse too long",
            Box::new(|c: &mut Config| {
                c.pulses = Some(PulseConfig {
                    coop_close: Some(MAXIMUM_PULSE_SECONDS + 1),
                    ..Default::default()
                })
            }),
        ),
        ("log_max_bytes", Box::new(|c: &mut Config| c.log_max_bytes = Some(10))),
        ("log_backups", Box::new(|c: &mut Config| c.log_backups = Some(21))),
        ("no backups", Box::new(|c: &mut Config| c.log_backups = Some(0))),
        ("listen", Box::new(|c: &mut Config| c.listen = Some("localhost".into()))),
    ];

    for (name, mutate) in cases {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(
            validate_config(&config).is_err(),
            "{name} should have been rejected"
        );
    }
}

#[test]
fn test_config_validation_duplicate_channel() {
    let config = Config {
        pins: Some(PinConfig {
            door_open: Some(23), // same as default door_close
            ..Default::default()
        }),
        ..Default::default()
    };
    let err = validate_config(&config).unwrap_err().to_string();
    assert!(err.contains("output channel 23"), "{err}");
}

#[test]
fn test_accessors_fall_back_to_defaults() {
    let config = Config::default();
    assert_eq!(config.timezone(), chrono_tz::US::Pacific);
    assert_eq!(config.fallback_sunrise().format("%H:%M").to_string(), "07:00");
    assert_eq!(config.fallback_dusk().format("%H:%M").to_string(), "19:00");
    assert_eq!(config.settle_time(), std::time::Duration::from_secs(1));
    assert_eq!(config.listen(), DEFAULT_LISTEN);
    assert!(config.log_file().ends_with("coopd/coop.log"));
}

#[test]
fn test_geo_toml_overrides_main_config() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(temp_dir.path(), "latitude = 10.0\nlongitude = 20.0\n");
    fs::write(
        temp_dir.path().join("geo.toml"),
        "latitude = 51.4779\nlongitude = -0.0015\n",
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.coordinates(), (51.4779, -0.0015));
}

#[test]
fn test_geo_toml_out_of_range_is_validated() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(temp_dir.path(), "");
    fs::write(temp_dir.path().join("geo.toml"), "latitude = 123.0\n").unwrap();
    assert!(load_from_path(&path).is_err());
}

#[test]
fn test_malformed_geo_toml_fallback() {
    let temp_dir = tempdir().unwrap();
    let path = write_config(temp_dir.path(), "latitude = 10.0\n");
    fs::write(temp_dir.path().join("geo.toml"), "latitude = \"north\"").unwrap();

    let mut config: Config = toml::from_str("latitude = 10.0").unwrap();
    load_geo_override_from_path(&mut config, &path).unwrap();
    assert_eq!(config.latitude, Some(10.0));
}

#[test]
fn test_default_config_omits_coordinates_when_geo_exists() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("geo.toml"),
        "latitude = 60.0\nlongitude = 10.0\n",
    )
    .unwrap();
    let path = temp_dir.path().join(CONFIG_FILE_NAME);
    create_default_config(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(!content.contains("latitude"));
    assert_eq!(load_from_path(&path).unwrap().coordinates(), (60.0, 10.0));
}
