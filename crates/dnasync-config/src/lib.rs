//! Shared configuration for dnasync.
//!
//! TOML file plus `DNASYNC_` environment overrides, tenant definitions,
//! credential resolution (env var, keyring, plaintext) and translation to
//! `dnasync_core::Tenant`.

use std::collections::BTreeMap;
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
use url::Url;

use dnasync_core::{CoreError, Tenant, TenantSource};

/// Keyring service name for every stored secret.
pub const KEYRING_SERVICE: &str = "dnasync";
/// Prefix for environment overrides, e.g. `DNASYNC_DESTINATION__URL`.
pub const ENV_PREFIX: &str = "DNASYNC_";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for '{target}'")]
    NoCredentials { target: String },

    #[error("no [destination] section configured")]
    NoDestination,

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

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// The NetBox instance records are written to.
    pub destination: Option<DestinationConfig>,

    #[serde(default)]
    pub sync: SyncSettings,

    /// Controllers keyed by hostname.
    #[serde(default)]
    pub tenants: BTreeMap<String, TenantConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            output: default_output(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_output() -> String {
    "table".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DestinationConfig {
    /// NetBox base URL, with or without the trailing `/api`.
    pub url: String,

    /// API token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the API token.
    pub token_env: Option<String>,

    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Expiry of the full-sync single-flight marker.
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_secs: u64,

    /// Controller device page size (1..=500).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lease_ttl_secs: default_lease_ttl(),
            page_size: default_page_size(),
        }
    }
}

fn default_lease_ttl() -> u64 {
    600
}
fn default_page_size() -> usize {
    500
}

/// One DNA Center controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantConfig {
    pub username: String,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Controllers usually carry self-signed certificates.
    #[serde(default)]
    pub verify_tls: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "dnasync", "dnasync").map_or_else(
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
    p.push("dnasync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the configuration: defaults, then `path`, then
/// `DNASYNC_` environment variables (`__` separates nesting levels).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    debug!(path = %path.display(), tenants = config.tenants.len(), "loaded config");
    Ok(config)
}

/// Load from the canonical config path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=500).contains(&self.sync.page_size) {
            return Err(ConfigError::Validation {
                field: "sync.page_size".into(),
                reason: format!("expected 1..=500, got {}", self.sync.page_size),
            });
        }
        if self.sync.lease_ttl_secs == 0 {
            return Err(ConfigError::Validation {
                field: "sync.lease_ttl_secs".into(),
                reason: "must be positive".into(),
            });
        }
        if let Some(destination) = &self.destination {
            parse_url("destination.url", &destination.url)?;
        }
        for (hostname, tenant) in &self.tenants {
            if hostname.trim().is_empty() || hostname.contains(char::is_whitespace) {
                return Err(ConfigError::Validation {
                    field: "tenants".into(),
                    reason: format!("invalid hostname {hostname:?}"),
                });
            }
            if tenant.username.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("tenants.{hostname}.username"),
                    reason: "must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.timeout)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.sync.lease_ttl_secs)
    }

    /// Every configured tenant as a core `Tenant`, credentials resolved.
    pub fn tenants(&self) -> Result<Vec<Tenant>, ConfigError> {
        self.tenants
            .iter()
            .map(|(hostname, tenant)| tenant_to_core(hostname, tenant))
            .collect()
    }

    /// Resolved destination connection settings.
    pub fn destination(&self) -> Result<Destination, ConfigError> {
        let destination = self.destination.as_ref().ok_or(ConfigError::NoDestination)?;
        Ok(Destination {
            url: parse_url("destination.url", &destination.url)?,
            token: resolve_destination_token(destination)?,
            verify_tls: destination.verify_tls,
        })
    }

    /// A copy with every plaintext secret masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(destination) = &mut copy.destination {
            if destination.token.is_some() {
                destination.token = Some(REDACTED.into());
            }
        }
        for tenant in copy.tenants.values_mut() {
            if tenant.password.is_some() {
                tenant.password = Some(REDACTED.into());
            }
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL {raw:?}: {e}"),
    })
}

/// Destination settings ready to build a client from.
#[derive(Debug)]
pub struct Destination {
    pub url: Url,
    pub token: SecretString,
    pub verify_tls: bool,
}

// ── Credential resolution ───────────────────────────────────────────

/// Named env var, then the system keyring, then plaintext.
fn resolve_secret(
    env_name: Option<&str>,
    account: &str,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    // 1. Env var named in config
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            debug!(%account, source = "env", "resolved secret");
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, account) {
        if let Ok(secret) = entry.get_password() {
            debug!(%account, source = "keyring", "resolved secret");
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    plaintext.map(|p| {
        debug!(%account, source = "config", "resolved secret");
        SecretString::from(p.to_owned())
    })
}

pub fn resolve_tenant_password(
    hostname: &str,
    tenant: &TenantConfig,
) -> Result<SecretString, ConfigError> {
    resolve_secret(
        tenant.password_env.as_deref(),
        &format!("{hostname}/password"),
        tenant.password.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        target: hostname.into(),
    })
}

pub fn resolve_destination_token(
    destination: &DestinationConfig,
) -> Result<SecretString, ConfigError> {
    resolve_secret(
        destination.token_env.as_deref(),
        "destination/token",
        destination.token.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        target: "destination".into(),
    })
}

/// Build a core `Tenant` from its config entry.
///
/// A disabled tenant needs no password; it is never logged in to.
pub fn tenant_to_core(hostname: &str, tenant: &TenantConfig) -> Result<Tenant, ConfigError> {
    let password = if tenant.enabled {
        resolve_tenant_password(hostname, tenant)?
    } else {
        resolve_tenant_password(hostname, tenant).unwrap_or_else(|_| SecretString::from(""))
    };

    Ok(Tenant {
        hostname: hostname.to_owned(),
        username: tenant.username.clone(),
        password,
        verify_tls: tenant.verify_tls,
        enabled: tenant.enabled,
    })
}

// ── Tenant source ───────────────────────────────────────────────────

/// Tenants read from the config file, re-read on every `load()` so each
/// run sees the current file.
#[derive(Debug, Clone)]
pub struct FileTenants {
    path: PathBuf,
}

impl FileTenants {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TenantSource for FileTenants {
    fn load(&self) -> Result<Vec<Tenant>, CoreError> {
        let config = load_config_from(&self.path)?;
        Ok(config.tenants()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    const SAMPLE: &str = r#"
[defaults]
timeout = 10

[destination]
url = "https://netbox.example.com"
token = "0123456789abcdef"

[sync]
page_size = 200

[tenants."dnac1.example.com"]
username = "admin"
password = "s3cret"

[tenants."dnac2.example.com"]
username = "admin"
enabled = false
"#;

    #[test]
    fn loads_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&write(&dir, SAMPLE)).unwrap();

        assert_eq!(config.defaults.timeout, 10);
        assert_eq!(config.defaults.output, "table");
        assert_eq!(config.sync.page_size, 200);
        assert_eq!(config.sync.lease_ttl_secs, 600);
        assert_eq!(config.tenants.len(), 2);

        let dnac1 = &config.tenants["dnac1.example.com"];
        assert!(dnac1.enabled);
        assert!(!dnac1.verify_tls);
        assert!(config.destination.as_ref().unwrap().verify_tls);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.tenants.is_empty());
        assert!(config.destination.is_none());
        assert!(matches!(config.destination(), Err(ConfigError::NoDestination)));
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[sync]\npage_size = 0\n");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "sync.page_size"));
    }

    #[test]
    fn rejects_bad_destination_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[destination]\nurl = \"not a url\"\ntoken = \"t\"\n");
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn tenants_resolve_plaintext_passwords() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&write(&dir, SAMPLE)).unwrap();
        let tenants = config.tenants().unwrap();

        assert_eq!(tenants[0].hostname, "dnac1.example.com");
        assert_eq!(tenants[0].password.expose_secret(), "s3cret");
        // Disabled without a password is fine.
        assert!(!tenants[1].enabled);
    }

    #[test]
    fn enabled_tenant_without_password_fails() {
        let tenant = TenantConfig {
            username: "admin".into(),
            password: None,
            password_env: Some("DNASYNC_TEST_UNSET_PASSWORD_VAR".into()),
            verify_tls: false,
            enabled: true,
        };
        let err = tenant_to_core("lonely.example.com", &tenant).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref target } if target == "lonely.example.com"));
    }

    #[test]
    fn unset_env_var_falls_back_to_plaintext() {
        let destination = DestinationConfig {
            url: "https://netbox.example.com".into(),
            token: Some("plain".into()),
            token_env: Some("DNASYNC_TEST_UNSET_TOKEN_VAR".into()),
            verify_tls: true,
        };
        let token = resolve_destination_token(&destination).unwrap();
        assert_eq!(token.expose_secret(), "plain");
    }

    #[test]
    fn redaction_masks_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&write(&dir, SAMPLE)).unwrap();
        let rendered = config.redacted().to_toml().unwrap();

        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains(REDACTED));
    }

    #[test]
    fn file_tenants_reread_every_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, SAMPLE);
        let source = FileTenants::new(&path);
        assert_eq!(source.load().unwrap().len(), 2);

        std::fs::write(
            &path,
            "[tenants.\"dnac3.example.com\"]\nusername = \"ops\"\npassword = \"x\"\n",
        )
        .unwrap();
        let tenants = source.load().unwrap();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].hostname, "dnac3.example.com");
    }
}
