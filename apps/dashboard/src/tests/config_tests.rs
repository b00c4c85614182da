use std::{collections::HashMap, io::Write};

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let settings = load_settings_with_env(None, env_from(&[])).expect("settings");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_url, "http://127.0.0.1:8000");
    assert_eq!(settings.poll_policy(), PollPolicy::default());
    assert_eq!(settings.request_timeout(), Duration::from_secs(120));
}

#[test]
fn file_values_override_defaults() {
    let file = write_config(
        r#"
server_url = "http://news.internal:8080"
poll_interval_ms = 500
export_dir = "reports"
"#,
    );

    let settings = load_settings_with_env(Some(file.path()), env_from(&[])).expect("settings");

    assert_eq!(settings.server_url, "http://news.internal:8080");
    assert_eq!(settings.poll_interval_ms, 500);
    assert_eq!(settings.export_dir, PathBuf::from("reports"));
    assert_eq!(settings.poll_max_attempts, 30);
}

#[test]
fn env_overrides_file_and_app_prefix_wins() {
    let file = write_config("server_url = \"http://from-file:1\"\nlog_level = \"warn\"\n");
    let env = env_from(&[
        ("NEWSDESK_SERVER_URL", "http://from-newsdesk:2"),
        ("APP__SERVER_URL", "http://from-app:3"),
        ("NEWSDESK_POLL_MAX_ATTEMPTS", "5"),
        ("NEWSDESK_LOG_LEVEL", " "),
    ]);

    let settings = load_settings_with_env(Some(file.path()), env).expect("settings");

    assert_eq!(settings.server_url, "http://from-app:3");
    assert_eq!(settings.poll_max_attempts, 5);
    assert_eq!(settings.log_level, "warn");
}

#[test]
fn invalid_numbers_and_unknown_keys_are_errors() {
    let env = env_from(&[("APP__REQUEST_TIMEOUT_SECS", "soon")]);
    let err = load_settings_with_env(None, env).expect_err("bad number");
    assert!(err.to_string().contains("REQUEST_TIMEOUT_SECS"));

    let file = write_config("sever_url = \"typo\"\n");
    let err = load_settings_with_env(Some(file.path()), env_from(&[])).expect_err("unknown key");
    assert!(err.to_string().contains("invalid config file"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");
    let err = load_settings_with_env(Some(&missing), env_from(&[])).expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn blank_app_value_falls_back_to_newsdesk_prefix() {
    let env = env_from(&[
        ("APP__SERVER_URL", "  "),
        ("NEWSDESK_SERVER_URL", "http://backend:9000"),
        ("APP__POLL_INTERVAL_MS", ""),
        ("NEWSDESK_POLL_INTERVAL_MS", "750"),
    ]);

    let settings = load_settings_with_env(None, env).expect("settings");

    assert_eq!(settings.server_url, "http://backend:9000");
    assert_eq!(settings.poll_interval_ms, 750);
}
