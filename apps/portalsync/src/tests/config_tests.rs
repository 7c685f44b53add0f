use super::{load_settings_with, normalize_base_url, Settings};

use std::{
    collections::HashMap,
    env, fs,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

static NEXT_DIR: AtomicU64 = AtomicU64::new(0);

fn no_env(_key: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn temp_config(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let n = NEXT_DIR.fetch_add(1, Ordering::SeqCst);
    let dir = env::temp_dir().join(format!("portalsync_config_test_{suffix}_{n}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("portalsync.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_point_at_local_backend() {
    let settings = Settings::default();
    assert_eq!(settings.api_base_url, "http://127.0.0.1:8000/api");
    assert_eq!(settings.hospitals_path, "benefits/hospitals/");
    assert_eq!(settings.request_timeout_secs, 30);
    assert_eq!(settings.ai_api_key, None);
    assert!(settings.gemini_config().is_none());
}

#[test]
fn normalizes_whitespace_and_trailing_slashes() {
    assert_eq!(
        normalize_base_url("  https://hr.example.com/api///  "),
        "https://hr.example.com/api"
    );
}

#[test]
fn file_values_override_defaults() {
    let path = temp_config(
        r#"
api_base_url = "https://hr.example.com/api/"
hospitals_path = "hospitals/"
request_timeout_secs = 5
"#,
    );
    let settings = load_settings_with(Some(path.as_path()), no_env).expect("settings");
    assert_eq!(settings.api_base_url, "https://hr.example.com/api");
    assert_eq!(settings.hospitals_path, "hospitals/");
    assert_eq!(
        settings.gateway_config().timeout,
        Duration::from_secs(5)
    );
    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn environment_overrides_file() {
    let path = temp_config("api_base_url = \"https://file.example.com/api\"\nai_model = \"file-model\"\n");
    let settings = load_settings_with(
        Some(path.as_path()),
        env_from(&[
            ("PORTALSYNC_API_URL", "https://env.example.com/"),
            ("GEMINI_API_KEY", " secret "),
            ("APP__REQUEST_TIMEOUT_SECS", "not-a-number"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.api_base_url, "https://env.example.com/api");
    assert_eq!(settings.ai_model, "file-model");
    assert_eq!(settings.request_timeout_secs, 30);

    let gemini = settings.gemini_config().expect("gemini config");
    assert_eq!(gemini.api_key, "secret");
    assert_eq!(gemini.model, "file-model");
    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

#[test]
fn app_prefixed_base_url_wins_over_portalsync_url() {
    let settings = load_settings_with(
        Some(temp_config("").as_path()),
        env_from(&[
            ("PORTALSYNC_API_URL", "https://one.example.com"),
            ("APP__API_BASE_URL", "https://two.example.com/api/"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.api_base_url, "https://two.example.com/api");
}

#[test]
fn blank_api_key_counts_as_unset() {
    let settings = load_settings_with(Some(temp_config("").as_path()), env_from(&[("API_KEY", "  ")]))
        .expect("settings");
    assert_eq!(settings.ai_api_key, None);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let missing = env::temp_dir().join("portalsync-no-such-dir").join("portalsync.toml");
    let err = load_settings_with(Some(missing.as_path()), no_env).expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn unknown_keys_are_rejected() {
    let path = temp_config("database_url = \"sqlite://x.db\"\n");
    let err = load_settings_with(Some(path.as_path()), no_env).expect_err("unknown key");
    assert!(err.to_string().contains("invalid config file"));
}
