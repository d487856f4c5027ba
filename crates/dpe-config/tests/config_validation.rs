//! Policy validation + resolution tests against real files.
//!
//! Covers:
//! - Fixture policies (JSON and TOML) through load and validation
//! - Resolution order (CLI > env path > env config dir > defaults)
//! - Snapshot provenance and hashing

use dpe_config::resolve::{ENV_CONFIG_DIR, ENV_POLICY_PATH};
use dpe_config::{
    load_policy, resolve_policy_path, validate_policy, ConfigSource, Policy, PresetName,
    ValidationError,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

#[test]
fn valid_json_fixture_loads_and_validates() {
    let path = fixtures_dir().join("policy_valid.json");
    let loaded = load_policy(Some(&path), None).expect("load fixture");
    assert_eq!(loaded.policy.policy_id.as_deref(), Some("ed-chest-pain"));
    assert_eq!(loaded.policy.thresholds.test_threshold, 0.02);
    assert_eq!(loaded.policy.store.confirmation_ceiling, Some(0.99));
    assert_eq!(loaded.snapshot.policy_source, "CLI argument");
    assert_eq!(loaded.snapshot.catalog_size, 2);

    let ctpa = loaded.policy.find_test("CTPA").expect("catalog entry");
    let lrs = ctpa
        .characteristics()
        .and_then(|c| c.likelihood_ratios())
        .expect("ratios");
    assert!((lrs.lr_positive - 0.83 / 0.04).abs() < 1e-9);
}

#[test]
fn valid_toml_fixture_loads() {
    let path = fixtures_dir().join("policy_valid.toml");
    let loaded = load_policy(Some(&path), None).expect("load toml fixture");
    assert_eq!(loaded.policy.thresholds.treatment_threshold, 0.75);
    assert!(loaded.policy.test_catalog.is_empty());
}

#[test]
fn inverted_thresholds_are_a_configuration_error() {
    let path = fixtures_dir().join("policy_inverted.json");
    let policy = Policy::from_file(&path).expect("parses");
    let err = validate_policy(&policy).unwrap_err();
    assert!(matches!(err, ValidationError::SemanticError(_)));

    let err = load_policy(Some(&path), None).unwrap_err();
    assert!(err.to_string().contains("test_threshold"));
}

#[test]
fn snapshot_hash_tracks_file_content() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("policy.json");
    fs::copy(fixtures_dir().join("policy_valid.json"), &path).expect("copy fixture");
    let first = load_policy(Some(&path), None).expect("load");

    let mut policy = first.policy.clone();
    policy.thresholds.treatment_threshold = 0.95;
    fs::write(&path, policy.to_json().expect("serialize")).expect("rewrite");
    let second = load_policy(Some(&path), None).expect("reload");

    assert!(!first.snapshot.matches(&second.snapshot));
    assert_eq!(second.policy.thresholds.treatment_threshold, 0.95);
}

#[test]
fn env_policy_path_is_used_without_cli() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_POLICY_PATH, ENV_CONFIG_DIR]);
        let path = fixtures_dir().join("policy_valid.json");
        env::set_var(ENV_POLICY_PATH, &path);
        env::remove_var(ENV_CONFIG_DIR);

        let resolved = resolve_policy_path(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path.as_deref(), Some(path.as_path()));
    });
}

#[test]
fn env_config_dir_finds_toml_policy() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_POLICY_PATH, ENV_CONFIG_DIR]);
        let tmp = TempDir::new().expect("tempdir");
        fs::copy(
            fixtures_dir().join("policy_valid.toml"),
            tmp.path().join("policy.toml"),
        )
        .expect("copy fixture");
        env::remove_var(ENV_POLICY_PATH);
        env::set_var(ENV_CONFIG_DIR, tmp.path());

        let loaded = load_policy(None, None).expect("load from config dir");
        assert_eq!(loaded.policy.policy_id.as_deref(), Some("toml-policy"));
        assert_eq!(loaded.snapshot.policy_source, "environment variable");
    });
}

#[test]
fn cli_path_beats_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_POLICY_PATH]);
        env::set_var(ENV_POLICY_PATH, fixtures_dir().join("policy_valid.toml"));
        let cli = fixtures_dir().join("policy_valid.json");
        let resolved = resolve_policy_path(Some(&cli));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path.as_deref(), Some(cli.as_path()));
    });
}

#[test]
fn preset_beats_env_but_not_cli() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_POLICY_PATH]);
        env::set_var(ENV_POLICY_PATH, fixtures_dir().join("policy_valid.json"));

        let preset = load_policy(None, Some(PresetName::RuleOut)).expect("preset");
        assert_eq!(preset.policy.thresholds.test_threshold, 0.01);

        let cli = fixtures_dir().join("policy_valid.toml");
        let explicit = load_policy(Some(&cli), Some(PresetName::RuleOut)).expect("cli");
        assert_eq!(explicit.policy.thresholds.test_threshold, 0.03);
    });
}
