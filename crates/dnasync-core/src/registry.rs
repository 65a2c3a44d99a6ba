// ── Tenant registry ──
//
// Configured controllers are re-read from the `TenantSource` at the start
// of every run and never cached across runs. Authentication failures are
// recorded per tenant and never abort the other tenants.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;
use tracing::{info, warn};

use crate::controller::{Connector, ControllerSource};
use crate::error::CoreError;

// ── Tenant ───────────────────────────────────────────────────────────

/// One configured controller instance.
#[derive(Debug, Clone)]
pub struct Tenant {
    /// Unique key, also the destination tenant name.
    pub hostname: String,
    pub username: String,
    pub password: SecretString,
    pub verify_tls: bool,
    pub enabled: bool,
}

impl Tenant {
    /// `https://<hostname>`, unless the hostname already carries a scheme.
    pub fn base_url(&self) -> String {
        if self.hostname.starts_with("http://") || self.hostname.starts_with("https://") {
            self.hostname.clone()
        } else {
            format!("https://{}", self.hostname)
        }
    }
}

/// Per-tenant authentication outcome for the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum AuthStatus {
    Disabled,
    Success,
    Failed(String),
}

impl AuthStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Success => f.write_str("success"),
            Self::Failed(reason) => f.write_str(reason),
        }
    }
}

impl From<AuthStatus> for String {
    fn from(status: AuthStatus) -> Self {
        status.to_string()
    }
}

/// Which tenants an operation covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    All,
    Tenant(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all tenants"),
            Self::Tenant(hostname) => f.write_str(hostname),
        }
    }
}

// ── Tenant source ────────────────────────────────────────────────────

/// Where tenant definitions come from.
pub trait TenantSource: Send + Sync {
    fn load(&self) -> Result<Vec<Tenant>, CoreError>;
}

/// A fixed tenant list.
pub struct StaticTenants(pub Vec<Tenant>);

impl TenantSource for StaticTenants {
    fn load(&self) -> Result<Vec<Tenant>, CoreError> {
        Ok(self.0.clone())
    }
}

// ── Sessions ─────────────────────────────────────────────────────────

/// A tenant paired with its client (when authenticated) for one run.
#[derive(Clone)]
pub struct ControllerSession {
    pub tenant: Tenant,
    pub client: Option<Arc<dyn ControllerSource>>,
    pub status: AuthStatus,
}

impl fmt::Debug for ControllerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerSession")
            .field("tenant", &self.tenant.hostname)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

// ── Registry ─────────────────────────────────────────────────────────

pub struct TenantRegistry {
    source: Arc<dyn TenantSource>,
    connector: Arc<dyn Connector>,
}

impl TenantRegistry {
    pub fn new(source: Arc<dyn TenantSource>, connector: Arc<dyn Connector>) -> Self {
        Self { source, connector }
    }

    /// Tenants covered by `scope`, ordered by hostname.
    pub fn tenants(&self, scope: &Scope) -> Result<Vec<Tenant>, CoreError> {
        let mut tenants = self.source.load()?;
        tenants.sort_by(|a, b| a.hostname.cmp(&b.hostname));

        match scope {
            Scope::All => Ok(tenants),
            Scope::Tenant(hostname) => {
                let tenant = tenants
                    .into_iter()
                    .find(|t| t.hostname == *hostname)
                    .ok_or_else(|| CoreError::not_found("Tenant", hostname.clone()))?;
                Ok(vec![tenant])
            }
        }
    }

    /// Enabled tenants, ordered by hostname.
    pub fn list_enabled(&self) -> Result<Vec<Tenant>, CoreError> {
        Ok(self
            .tenants(&Scope::All)?
            .into_iter()
            .filter(|t| t.enabled)
            .collect())
    }

    /// Log in to one tenant, recording the outcome under its hostname.
    pub async fn authenticate(
        &self,
        tenant: &Tenant,
        statuses: &mut BTreeMap<String, AuthStatus>,
    ) -> Result<Arc<dyn ControllerSource>, CoreError> {
        if !tenant.enabled {
            statuses.insert(tenant.hostname.clone(), AuthStatus::Disabled);
            return Err(CoreError::AuthenticationFailed {
                message: format!("{} is disabled", tenant.hostname),
            });
        }

        match self.connector.connect(tenant).await {
            Ok(client) => {
                statuses.insert(tenant.hostname.clone(), AuthStatus::Success);
                Ok(client)
            }
            Err(e) => {
                warn!(tenant = %tenant.hostname, error = %e, "authentication failed");
                statuses.insert(tenant.hostname.clone(), AuthStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Authenticate every tenant in scope. Disabled tenants are reported
    /// with `AuthStatus::Disabled` and no login attempt.
    pub async fn open(&self, scope: &Scope) -> Result<Vec<ControllerSession>, CoreError> {
        let tenants = self.tenants(scope)?;
        let mut statuses = BTreeMap::new();
        let mut sessions = Vec::with_capacity(tenants.len());

        for tenant in tenants {
            let client = if tenant.enabled {
                self.authenticate(&tenant, &mut statuses).await.ok()
            } else {
                statuses.insert(tenant.hostname.clone(), AuthStatus::Disabled);
                None
            };
            let status = statuses
                .get(&tenant.hostname)
                .cloned()
                .unwrap_or(AuthStatus::Disabled);
            sessions.push(ControllerSession {
                tenant,
                client,
                status,
            });
        }

        let ready = sessions.iter().filter(|s| s.client.is_some()).count();
        info!(%scope, tenants = sessions.len(), ready, "opened controller sessions");
        Ok(sessions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::model::{RemoteDevice, RemoteSite};

    struct EmptySource;

    #[async_trait]
    impl ControllerSource for EmptySource {
        async fn list_sites(&self) -> Result<Vec<RemoteSite>, CoreError> {
            Ok(Vec::new())
        }

        async fn count_sites(&self) -> Result<u64, CoreError> {
            Ok(0)
        }

        async fn list_devices(&self) -> Result<Vec<RemoteDevice>, CoreError> {
            Ok(Vec::new())
        }

        async fn site_members(&self, _site_id: &str) -> Result<Vec<RemoteDevice>, CoreError> {
            Ok(Vec::new())
        }

        async fn map_devices_to_sites(&self) -> Result<HashMap<String, String>, CoreError> {
            Ok(HashMap::new())
        }
    }

    /// Counts logins; rejects the one hostname it is told to.
    #[derive(Default)]
    struct CountingConnector {
        calls: AtomicUsize,
        rejected: Option<String>,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn ControllerSource>, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.rejected.as_deref() == Some(tenant.hostname.as_str()) {
                return Err(CoreError::AuthenticationFailed {
                    message: "bad credentials".into(),
                });
            }
            Ok(Arc::new(EmptySource))
        }
    }

    fn tenant(hostname: &str, enabled: bool) -> Tenant {
        Tenant {
            hostname: hostname.into(),
            username: "admin".into(),
            password: SecretString::from("secret"),
            verify_tls: true,
            enabled,
        }
    }

    fn registry(connector: Arc<CountingConnector>) -> TenantRegistry {
        let source = StaticTenants(vec![
            tenant("dnac2.example.com", false),
            tenant("dnac1.example.com", true),
        ]);
        TenantRegistry::new(Arc::new(source), connector)
    }

    #[test]
    fn tenants_are_sorted_and_enabled_filters() {
        let registry = registry(Arc::default());

        let all: Vec<String> = registry
            .tenants(&Scope::All)
            .unwrap()
            .into_iter()
            .map(|t| t.hostname)
            .collect();
        assert_eq!(all, ["dnac1.example.com", "dnac2.example.com"]);

        let enabled = registry.list_enabled().unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].hostname, "dnac1.example.com");
    }

    #[test]
    fn unknown_tenant_is_not_found() {
        let registry = registry(Arc::default());
        let err = registry
            .tenants(&Scope::Tenant("nope.example.com".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn disabled_tenant_is_never_logged_in() {
        let connector = Arc::new(CountingConnector::default());
        let registry = registry(Arc::clone(&connector));

        let sessions = registry.open(&Scope::All).await.unwrap();

        assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].status, AuthStatus::Success);
        assert!(sessions[0].client.is_some());
        assert_eq!(sessions[1].status, AuthStatus::Disabled);
        assert!(sessions[1].client.is_none());
    }

    #[tokio::test]
    async fn failed_login_is_recorded_under_hostname() {
        let connector = Arc::new(CountingConnector {
            rejected: Some("dnac1.example.com".into()),
            ..CountingConnector::default()
        });
        let registry = registry(Arc::clone(&connector));
        let mut statuses = BTreeMap::new();

        let result = registry
            .authenticate(&tenant("dnac1.example.com", true), &mut statuses)
            .await;

        assert!(result.is_err());
        assert!(matches!(
            statuses.get("dnac1.example.com"),
            Some(AuthStatus::Failed(reason)) if reason.contains("bad credentials")
        ));
    }

    #[tokio::test]
    async fn authenticating_disabled_tenant_skips_connector() {
        let connector = Arc::new(CountingConnector::default());
        let registry = registry(Arc::clone(&connector));
        let mut statuses = BTreeMap::new();

        let result = registry
            .authenticate(&tenant("dnac2.example.com", false), &mut statuses)
            .await;

        assert!(result.is_err());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
        assert_eq!(statuses["dnac2.example.com"], AuthStatus::Disabled);
    }
}
