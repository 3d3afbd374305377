// Loading viewer configuration files from disk

use std::io::Write;

use tempest_viewer::{Viewer, ViewerConfig, ViewerError};

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_toml() {
    let file = write_temp(
        ".toml",
        r#"
        [window]
        title = "Storm"

        [thunder]
        first_threshold = 4.0

        [toggles]
        fog = true
        night_mode = true
        "#,
    );

    let config = ViewerConfig::load(file.path()).unwrap();

    assert_eq!(config.window.title, "Storm");
    assert_eq!(config.thunder.first_threshold, 4.0);
    assert!(config.toggles.fog);
    assert!(config.toggles.night_mode);
    assert!(!config.toggles.rain);
    assert_eq!(config.rain.capacity, 50_000);
}

#[test]
fn test_load_json() {
    let file = write_temp(".json", r#"{ "rain": { "capacity": 10, "segment_length": 1.5 } }"#);

    let config = ViewerConfig::load(file.path()).unwrap();

    assert_eq!(config.rain.capacity, 10);
    assert_eq!(config.rain.segment_length, 1.5);
    assert_eq!(config.rain.point_capacity(), 20);
}

#[test]
fn test_malformed_file_is_load_error() {
    let file = write_temp(".toml", "[rain\ncapacity = ");
    let err = ViewerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ViewerError::ConfigLoad { .. }));
}

#[test]
fn test_missing_file_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ViewerConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ViewerError::ConfigLoad { .. }));
}

#[test]
fn test_invalid_rain_section_still_loads() {
    let file = write_temp(".toml", "[rain]\ncapacity = 0\n\n[toggles]\nfog = true\nrain = true\n");

    let config = ViewerConfig::load(file.path()).unwrap();

    assert_eq!(config.rain.capacity, 0);
    assert!(config.toggles.fog);
}

#[test]
fn test_invalid_rain_section_only_disables_weather() {
    let file = write_temp(".toml", "[rain]\ncapacity = 0\n\n[toggles]\nrain = true\n");
    let config = ViewerConfig::load(file.path()).unwrap();

    let summary = Viewer::new(config).run_headless(10, 1).unwrap();

    assert_eq!(summary.frames, 10);
    assert_eq!(summary.shadow_passes, 10);
    assert_eq!(summary.last_rain_points, 0);
}

#[test]
fn test_invalid_thunder_values_are_configuration_errors() {
    let file = write_temp(".toml", "[thunder]\nduration = -1.0\n");
    let err = ViewerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ViewerError::Configuration { .. }));
}
