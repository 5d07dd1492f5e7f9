//! LDAP / Active Directory provider (ldap3)

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{DirectoryEntry, DirectoryProvider, DirectorySession};
use crate::error::SyncError;
use crate::models::credentials::DirectoryCredentials;

/// LDAP invalidCredentials
const RC_INVALID_CREDENTIALS: u32 = 49;

pub struct LdapDirectory {
    connect_timeout: Duration,
}

impl LdapDirectory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl DirectoryProvider for LdapDirectory {
    async fn connect(
        &self,
        creds: &DirectoryCredentials,
    ) -> Result<Box<dyn DirectorySession>, SyncError> {
        debug!(url = %creds.url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &creds.url)
            .await
            .map_err(|e| {
                SyncError::connectivity(format!(
                    "failed to connect to LDAP server {}: {}",
                    creds.url, e
                ))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let result = ldap
            .simple_bind(&creds.bind_dn, creds.bind_password.expose_secret())
            .await
            .map_err(|e| SyncError::Authentication(format!("LDAP bind failed: {}", e)))?;

        if result.rc != 0 {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind after failed bind");
            }
            let reason = if result.rc == RC_INVALID_CREDENTIALS {
                "invalid credentials".to_string()
            } else {
                format!("code {}: {}", result.rc, result.text)
            };
            return Err(SyncError::Authentication(format!(
                "LDAP bind failed for {}: {}",
                creds.bind_dn, reason
            )));
        }

        info!(server = %creds.name, "LDAP connection established");
        Ok(Box::new(LdapSession { ldap }))
    }
}

struct LdapSession {
    ldap: Ldap,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn find_user(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Option<DirectoryEntry>, SyncError> {
        let result = self
            .ldap
            .search(base_dn, Scope::Subtree, filter, attrs.to_vec())
            .await
            .map_err(|e| SyncError::fetch(format!("LDAP search failed: {}", e)))?;

        let (entries, _) = result
            .success()
            .map_err(|e| SyncError::fetch(format!("LDAP search failed: {}", e)))?;

        Ok(entries.into_iter().next().map(|e| {
            let entry = SearchEntry::construct(e);
            DirectoryEntry {
                dn: entry.dn,
                attrs: entry.attrs,
            }
        }))
    }

    async fn close(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            warn!(error = %e, "Error during LDAP unbind");
        }
    }
}
