use std::io::Write;
use std::time::Duration;

use echosight::config::DashboardConfig;
use echosight::error::ConfigError;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
        [backend]
        ws_url = "ws://127.0.0.1:8000/stream/ws"
        http_url = "http://127.0.0.1:8000/"
        lan_ip = "192.168.0.42"
        haptic_path = "/pulse"
        request_timeout_ms = 2500

        [session]
        reconnect_delay_ms = 500
        keepalive_interval_secs = 30

        [history]
        capacity = 20

        [audio]
        player = ["aplay", "-q"]
        "#,
    );

    let cfg = DashboardConfig::load(file.path()).expect("config loads");

    assert_eq!(cfg.stream_url(), "ws://192.168.0.42:8000/stream/ws");
    assert_eq!(cfg.http_url(), "http://192.168.0.42:8000");
    assert_eq!(cfg.backend_paths().haptic, "/pulse");
    assert_eq!(cfg.backend_paths().speak, "/tts");
    assert_eq!(cfg.request_timeout(), Duration::from_millis(2500));
    assert_eq!(cfg.audio.player, vec!["aplay", "-q"]);

    let reactor = cfg.reactor_config();
    assert_eq!(reactor.history_capacity, 20);
    assert_eq!(reactor.session.reconnect_delay, Duration::from_millis(500));
    assert_eq!(reactor.session.keepalive_interval, Duration::from_secs(30));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_empty_file_is_all_defaults() {
    let file = write_config("");
    let cfg = DashboardConfig::load(file.path()).expect("config loads");
    assert_eq!(cfg, DashboardConfig::default());
}

#[test]
fn test_malformed_file_reports_path() {
    let file = write_config("[backend\nport = ");

    match DashboardConfig::load(file.path()) {
        Err(ConfigError::Parse { path, .. }) => {
            assert_eq!(path, file.path().display().to_string())
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.toml");

    assert!(matches!(
        DashboardConfig::load(&missing),
        Err(ConfigError::Read { .. })
    ));
}
