use super::{load_settings_with, normalize_service_url, Placement, StudioSettings};

use std::{
    collections::HashMap,
    env, fs,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("sticker_settings_test_{suffix}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("stickers.toml");
    fs::write(&path, contents).expect("write settings");
    path
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_match_canvas_constants() {
    let settings = StudioSettings::default();
    assert_eq!(settings.fallback_timeout, Duration::from_secs(5));
    assert_eq!(settings.transfer_delay, Duration::from_millis(800));
    assert_eq!(settings.min_box_side, 50.0);
    assert_eq!(settings.placement, Placement::default());
}

#[test]
fn placement_cascades_along_diagonal() {
    let placement = Placement::default();
    assert_eq!(placement.position(0), (100.0, 100.0));
    assert_eq!(placement.position(1), (130.0, 130.0));
    assert_eq!(placement.position(4), (220.0, 220.0));
}

#[test]
fn missing_file_yields_defaults() {
    let settings = load_settings_with(
        &env::temp_dir().join("definitely-not-here/stickers.toml"),
        no_env,
    );
    assert_eq!(settings, StudioSettings::default());
}

#[test]
fn file_values_are_applied() {
    let path = temp_settings_file(
        r#"
service_url = "https://stickers.example.com/"
fallback_timeout_ms = "2500"
transfer_delay_ms = "100"
history_limit = "3"
"#,
    );

    let settings = load_settings_with(&path, no_env);
    assert_eq!(settings.service_url, "https://stickers.example.com");
    assert_eq!(settings.fallback_timeout, Duration::from_millis(2500));
    assert_eq!(settings.transfer_delay, Duration::from_millis(100));
    assert_eq!(settings.history_limit, 3);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn environment_overrides_file() {
    let path = temp_settings_file(
        r#"
service_url = "https://from-file.example.com"
fallback_timeout_ms = "2500"
"#,
    );
    let vars: HashMap<&str, &str> = HashMap::from([
        ("STICKER_SERVICE_URL", "http://legacy.example.com"),
        ("APP__SERVICE_URL", "http://127.0.0.1:9000/"),
        ("APP__FALLBACK_TIMEOUT_MS", "not-a-number"),
        ("APP__REQUEST_TIMEOUT_SECS", "30"),
    ]);

    let settings = load_settings_with(&path, |key| vars.get(key).map(|v| v.to_string()));
    assert_eq!(settings.service_url, "http://127.0.0.1:9000");
    assert_eq!(settings.fallback_timeout, Duration::from_millis(2500));
    assert_eq!(settings.request_timeout, Duration::from_secs(30));

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn invalid_service_url_keeps_default() {
    let settings = load_settings_with(
        &env::temp_dir().join("definitely-not-here/stickers.toml"),
        |key| (key == "APP__SERVICE_URL").then(|| "ftp://stickers.example.com".to_string()),
    );
    assert_eq!(settings.service_url, super::DEFAULT_SERVICE_URL);
}

#[test]
fn normalizes_service_urls() {
    assert_eq!(
        normalize_service_url("  https://svc.example.com/// ").expect("valid"),
        "https://svc.example.com"
    );
    assert_eq!(
        normalize_service_url("").expect("empty falls back"),
        super::DEFAULT_SERVICE_URL
    );
    assert!(normalize_service_url("not a url").is_err());
    assert!(normalize_service_url("file:///tmp/x").is_err());
}
