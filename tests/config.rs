use log::LevelFilter;
use space_journey::config::{AppConfig, CaptureFormat, MissionConfig};
use space_journey::error::ConfigError;
use std::time::Duration;

#[test]
fn empty_file_means_defaults() {
    let config: AppConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.level_filter(), Ok(LevelFilter::Info));

    let mission = &config.mission;
    assert_eq!(mission.target_count, 5);
    assert_eq!(mission.spawn_delay(), Duration::from_secs(3));
    assert_eq!(mission.tick_interval(), Duration::from_millis(16));
    assert_eq!(mission.dwell_duration(), Duration::from_secs(5));
    assert_eq!(mission.target_assets.last().map(String::as_str), Some("moon.svg"));
    assert_eq!(config.camera.facing_mode, "environment");
    assert!(!config.camera.audio);
    assert_eq!(config.capture.formats[0], CaptureFormat::new("video/mp4", "mp4"));
}

#[test]
fn partial_override_keeps_other_defaults() {
    let config: AppConfig = serde_json::from_str(
        r#"{
            "mission": { "dwell_ms": 3000, "spawn_delay_ms": 7000 },
            "camera": { "facing_mode": "user" },
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    assert_eq!(config.mission.dwell_duration(), Duration::from_secs(3));
    assert_eq!(config.mission.spawn_delay(), Duration::from_secs(7));
    assert_eq!(config.mission.target_count, 5);
    assert_eq!(config.camera.facing_mode, "user");
    assert_eq!(config.capture, AppConfig::default().capture);
    assert_eq!(config.level_filter(), Ok(LevelFilter::Debug));
}

#[test]
fn bad_log_level_is_rejected() {
    let config = AppConfig {
        log_level: "loud".to_string(),
        ..AppConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::InvalidLogLevel("loud".to_string()))
    );
}

#[test]
fn mission_limits() {
    let cases = [
        (
            MissionConfig {
                target_count: 0,
                ..MissionConfig::default()
            },
            ConfigError::ZeroTargets,
        ),
        (
            MissionConfig {
                spawn_delay_ms: 0,
                ..MissionConfig::default()
            },
            ConfigError::ZeroSpawnDelay,
        ),
        (
            MissionConfig {
                proximity_threshold: 0.0,
                ..MissionConfig::default()
            },
            ConfigError::NonPositiveThreshold(0.0),
        ),
        (
            MissionConfig {
                target_assets: Vec::new(),
                ..MissionConfig::default()
            },
            ConfigError::NoTargetAssets,
        ),
    ];
    for (config, expected) in cases {
        assert_eq!(config.validate(), Err(expected));
    }
}

#[test]
fn infinite_speed_is_rejected() {
    let config = MissionConfig {
        speed: f64::INFINITY,
        ..MissionConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonFiniteSpeed(_))
    ));
}

#[test]
fn configured_level_reaches_the_log_facade() {
    let config = AppConfig {
        log_level: "warn".to_string(),
        ..AppConfig::default()
    };
    space_journey::browser::set_log_level(config.level_filter().unwrap());
    assert_eq!(log::max_level(), LevelFilter::Warn);
}
