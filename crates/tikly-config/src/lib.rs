//! Profile configuration for tikly.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `tikly_core::SessionConfig`, which applications hand
//! to `tikly_core::Session::connect` together with their `Connector`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tikly_api::{Credentials, TlsMode, TransportConfig};
use tikly_core::{CaseConvention, SessionConfig};

const KEYRING_SERVICE: &str = "tikly";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, falling back to `default_profile` when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(key, profile)| (key.as_str(), profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Field naming for returned rows.
    #[serde(default)]
    pub case: CaseConvention,

    #[serde(default)]
    pub tls: bool,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            case: CaseConvention::default(),
            tls: false,
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_use_keyring() -> bool {
    true
}

/// A named device profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Router address, e.g. "192.168.88.1".
    pub host: String,

    /// API port; 8728, or 8729 with TLS, when unset.
    pub port: Option<u16>,

    /// Login name (defaults to "admin").
    pub username: Option<String>,

    /// Plaintext password. Keyring or an env var is preferred.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Consult the system keyring for the password.
    #[serde(default = "default_use_keyring")]
    pub use_keyring: bool,

    /// Connect with API-SSL.
    pub tls: Option<bool>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed router certificates.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override row field naming.
    pub case: Option<CaseConvention>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("rs", "tikly", "tikly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tikly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Environment keys use `TIKLY_` and `__` for nesting, e.g.
/// `TIKLY_PROFILES__LAB__HOST=10.0.0.1`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TIKLY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the login password from the credential chain.
///
/// Order: the profile's `password_env` variable, `TIKLY_PASSWORD`, the
/// system keyring (unless `use_keyring = false`), then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Global env var
    if let Ok(pw) = std::env::var("TIKLY_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if profile.use_keyring {
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
            if let Ok(pw) = entry.get_password() {
                return Ok(SecretString::from(pw));
            }
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a `SessionConfig` from a profile and the global defaults.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has an empty host"),
        });
    }

    let password = resolve_password(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else if profile.tls.unwrap_or(defaults.tls) {
        TlsMode::System
    } else {
        TlsMode::Disabled
    };

    let transport = TransportConfig {
        host: profile.host.clone(),
        port: profile.port,
        credentials: Credentials {
            username: profile.username.clone().unwrap_or_else(|| "admin".into()),
            password,
        },
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        keepalive: true,
    };

    Ok(SessionConfig {
        transport,
        case: profile.case.unwrap_or(defaults.case),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn profile(host: &str) -> Profile {
        Profile {
            host: host.into(),
            port: None,
            username: Some("api".into()),
            password: Some("secret".into()),
            password_env: None,
            use_keyring: false,
            tls: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            case: None,
        }
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "lab"

[defaults]
case = "snake"
timeout = 10

[profiles.lab]
host = "10.0.0.1"
username = "api"
tls = true
use_keyring = false
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.defaults.case, CaseConvention::Snake);
        let (name, lab) = config.profile(None).unwrap();
        assert_eq!(name, "lab");
        assert_eq!(lab.host, "10.0.0.1");
        assert_eq!(lab.tls, Some(true));
        assert!(!lab.use_keyring);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.timeout, 30);
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert("default".into(), profile("192.168.88.1"));
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let (_, p) = loaded.profile(Some("default")).unwrap();
        assert_eq!(p.host, "192.168.88.1");
        assert_eq!(p.password.as_deref(), Some("secret"));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let err = Config::default().profile(Some("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { profile } if profile == "nope"));
    }

    #[test]
    fn named_env_var_wins_over_plaintext() {
        let mut p = profile("r1");
        p.password_env = Some("PATH".into());
        let resolved = resolve_password(&p, "r1").unwrap();
        assert_eq!(resolved.expose_secret(), std::env::var("PATH").unwrap());
    }

    #[test]
    fn plaintext_is_the_last_resort() {
        let mut p = profile("r1");
        p.password = None;
        if std::env::var("TIKLY_PASSWORD").is_err() {
            assert!(matches!(
                resolve_password(&p, "r1"),
                Err(ConfigError::NoCredentials { .. })
            ));
        }
    }

    #[test]
    fn profile_maps_to_session_config() {
        let mut p = profile("192.168.88.1");
        p.tls = Some(true);
        p.case = Some(CaseConvention::Snake);
        let session = profile_to_session_config(&p, "default", &Defaults::default()).unwrap();
        assert_eq!(session.case, CaseConvention::Snake);
        assert_eq!(session.transport.tls, TlsMode::System);
        assert_eq!(session.transport.port(), 8729);
        assert_eq!(session.transport.credentials.username, "api");
        assert_eq!(session.transport.timeout, Duration::from_secs(30));
    }

    #[test]
    fn insecure_overrides_ca_cert() {
        let mut p = profile("r1");
        p.ca_cert = Some(PathBuf::from("/etc/ca.pem"));
        let defaults = Defaults {
            insecure: true,
            ..Defaults::default()
        };
        let session = profile_to_session_config(&p, "r1", &defaults).unwrap();
        assert_eq!(session.transport.tls, TlsMode::DangerAcceptInvalid);
    }

    #[test]
    fn empty_host_is_rejected() {
        let err = profile_to_session_config(&profile(" "), "r1", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "host"));
    }
}
