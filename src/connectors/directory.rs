//! Directory (LDAP / AD) attribute connector
//!
//! 只查询库存中已存在的用户名，不会发现新用户。bind 失败中止整个拉取，
//! 单个用户的搜索失败或无匹配只记录并跳过。

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::ConnectorRun;
use crate::models::{credentials::DirectoryCredentials, workspace::DirectoryAttributes};
use crate::providers::{DirectoryEntry, DirectoryProvider};
use crate::repository::InventoryStore;

pub const DEFAULT_SEARCH_FILTER: &str = "(sAMAccountName={username})";
const USERNAME_PLACEHOLDER: &str = "{username}";

pub const USER_ATTRIBUTES: [&str; 5] = ["displayName", "mail", "department", "title", "manager"];

/// 将转义后的用户名代入过滤器模板
pub fn build_filter(template: Option<&str>, user_name: &str) -> String {
    let template = template
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_SEARCH_FILTER);
    template.replace(USERNAME_PLACEHOLDER, &ldap3::ldap_escape(user_name))
}

impl From<&DirectoryEntry> for DirectoryAttributes {
    fn from(entry: &DirectoryEntry) -> Self {
        Self {
            full_name: entry.first("displayName"),
            email: entry.first("mail"),
            department: entry.first("department"),
            job_title: entry.first("title"),
            manager: entry.first("manager"),
        }
    }
}

pub struct DirectoryConnector {
    store: Arc<dyn InventoryStore>,
    provider: Arc<dyn DirectoryProvider>,
}

impl DirectoryConnector {
    pub fn new(store: Arc<dyn InventoryStore>, provider: Arc<dyn DirectoryProvider>) -> Self {
        Self { store, provider }
    }

    #[instrument(skip(self, creds), fields(server = %creds.name))]
    pub async fn run(&self, creds: &DirectoryCredentials) -> ConnectorRun {
        let user_names = match self.store.distinct_user_names().await {
            Ok(names) => names,
            Err(e) => return ConnectorRun::failed(0, e.into()),
        };

        let mut session = match self.provider.connect(creds).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Directory bind failed");
                return e.into();
            }
        };

        let mut processed = 0i64;
        for user_name in &user_names {
            let filter = build_filter(creds.search_filter.as_deref(), user_name);

            let entry = match session
                .find_user(&creds.base_dn, &filter, &USER_ATTRIBUTES)
                .await
            {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    info!(user_name = %user_name, "User not found in directory");
                    continue;
                }
                Err(e) => {
                    warn!(user_name = %user_name, error = %e, "Directory search failed");
                    continue;
                }
            };

            let attributes = DirectoryAttributes::from(&entry);
            match self
                .store
                .apply_directory_attributes(user_name, &attributes)
                .await
            {
                Ok(rows) => {
                    debug!(user_name = %user_name, rows, "Directory attributes applied");
                    processed += 1;
                }
                Err(e) => warn!(
                    user_name = %user_name,
                    error = %e,
                    "Failed to update directory attributes"
                ),
            }
        }

        session.close().await;
        info!(processed, users = user_names.len(), "Directory users synced");
        ConnectorRun::completed(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_filter_escapes_username() {
        assert_eq!(
            build_filter(None, "jdoe"),
            "(sAMAccountName=jdoe)"
        );
        assert_eq!(
            build_filter(Some("(&(objectClass=user)(uid={username}))"), "a*b(c)"),
            "(&(objectClass=user)(uid=a\\2ab\\28c\\29))"
        );
        assert_eq!(build_filter(Some("  "), "x"), "(sAMAccountName=x)");
    }

    #[test]
    fn test_attributes_from_entry() {
        let mut attrs = HashMap::new();
        attrs.insert("displayName".to_string(), vec!["Jane Doe".to_string()]);
        attrs.insert("title".to_string(), vec!["Engineer".to_string()]);
        let entry = DirectoryEntry {
            dn: "CN=Jane Doe".to_string(),
            attrs,
        };

        let attributes = DirectoryAttributes::from(&entry);
        assert_eq!(attributes.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(attributes.job_title.as_deref(), Some("Engineer"));
        assert_eq!(attributes.email, None);
    }
}
