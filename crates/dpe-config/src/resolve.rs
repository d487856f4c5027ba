//! Policy resolution and loading.
//!
//! Resolution order: CLI argument → environment variables → XDG paths →
//! system config → preset or built-in default.

use std::path::{Path, PathBuf};

use crate::policy::Policy;
use crate::preset::{get_preset, PresetName};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_policy, ValidationError, ValidationResult};

/// Where the policy came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/dpe/.
    SystemConfig,

    /// Named preset.
    Preset,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::Preset => write!(f, "preset"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Resolved policy file location.
#[derive(Debug, Clone, Default)]
pub struct PolicyPath {
    /// Path to the policy file, or None for built-in defaults.
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// A validated policy with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedPolicy {
    pub policy: Policy,
    pub snapshot: ConfigSnapshot,
}

/// Environment variable names.
pub const ENV_POLICY_PATH: &str = "DPE_POLICY";
pub const ENV_CONFIG_DIR: &str = "DPE_CONFIG_DIR";

/// Policy file names, in lookup order.
const POLICY_FILENAMES: [&str; 2] = ["policy.json", "policy.toml"];

/// Application name for XDG and system directories.
const APP_NAME: &str = "dpe";

/// Resolve the policy path.
///
/// An explicit CLI path is returned even if missing so that loading reports
/// it; every other location is only used when the file exists.
pub fn resolve_policy_path(cli_path: Option<&Path>) -> PolicyPath {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return PolicyPath {
            path: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_POLICY_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return PolicyPath {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = find_in_dir(Path::new(&config_dir)) {
            return PolicyPath {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        if let Some(path) = find_in_dir(&dir) {
            return PolicyPath {
                path: Some(path),
                source: ConfigSource::XdgConfig,
            };
        }
    }

    // 5. System config
    if let Some(path) = find_in_dir(&system_config_dir()) {
        return PolicyPath {
            path: Some(path),
            source: ConfigSource::SystemConfig,
        };
    }

    // 6. Built-in default
    PolicyPath::default()
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    POLICY_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Load, validate and snapshot the active policy.
///
/// A preset is used only when no explicit CLI path is given; it takes
/// precedence over files found in the environment or config directories.
pub fn load_policy(
    cli_path: Option<&Path>,
    preset: Option<PresetName>,
) -> ValidationResult<LoadedPolicy> {
    if let (None, Some(name)) = (cli_path, preset) {
        let policy = get_preset(name);
        validate_policy(&policy)?;
        let resolved = PolicyPath {
            path: None,
            source: ConfigSource::Preset,
        };
        let snapshot = ConfigSnapshot::new(&policy, &resolved, None);
        return Ok(LoadedPolicy { policy, snapshot });
    }

    let resolved = resolve_policy_path(cli_path);
    let Some(path) = resolved.path.as_deref() else {
        let policy = Policy::default();
        let snapshot = ConfigSnapshot::new(&policy, &resolved, None);
        return Ok(LoadedPolicy { policy, snapshot });
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let policy = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Policy::from_toml_str(&content)?,
        _ => Policy::from_json_str(&content)?,
    };
    validate_policy(&policy)?;

    let snapshot = ConfigSnapshot::new(&policy, &resolved, Some(&content));
    Ok(LoadedPolicy { policy, snapshot })
}

/// Get the XDG config directory for dpe.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(format!("{}", ConfigSource::Preset), "preset");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_cli_path_wins_even_if_missing() {
        let resolved = resolve_policy_path(Some(Path::new("/nonexistent/policy.json")));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        let err = load_policy(Some(Path::new("/nonexistent/policy.json")), None).unwrap_err();
        assert!(matches!(err, ValidationError::IoError(_)));
    }

    #[test]
    fn test_preset_without_cli_path() {
        let loaded = load_policy(None, Some(PresetName::Conservative)).unwrap();
        assert_eq!(loaded.policy.thresholds.treatment_threshold, 0.97);
        assert_eq!(loaded.snapshot.policy_source, "preset");
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/dpe"));
    }
}
