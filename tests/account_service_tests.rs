//! 账号管理与连接测试

use secrecy::{ExposeSecret, Secret};

use workspaces_inventory::{
    error::AppError,
    models::account::{
        AccountKind, AccountStatus, CreateAccountRequest, UpdateAccountRequest,
    },
    providers::ConnectionProbe,
    services::{AccountService, CredentialResolver},
};

mod common;
use common::{CloudScript, Harness};

fn account_service(h: &Harness) -> AccountService {
    AccountService::new(
        h.accounts.clone(),
        h.settings.clone(),
        h.cloud.clone(),
        h.directory.clone(),
        h.cipher.clone(),
    )
}

fn aws_request(name: &str, access_key_id: &str) -> CreateAccountRequest {
    CreateAccountRequest {
        kind: AccountKind::Aws,
        name: name.to_string(),
        region_or_url: "us-east-1".to_string(),
        principal: access_key_id.to_string(),
        secret: Secret::new("wJalrXUtnFEMI".to_string()),
        base_dn: None,
        search_filter: None,
        is_default: true,
    }
}

fn ldap_request(name: &str) -> CreateAccountRequest {
    CreateAccountRequest {
        kind: AccountKind::Ldap,
        name: name.to_string(),
        region_or_url: "ldaps://dc.corp.local".to_string(),
        principal: "CN=svc,DC=corp,DC=local".to_string(),
        secret: Secret::new("password".to_string()),
        base_dn: Some("DC=corp,DC=local".to_string()),
        search_filter: None,
        is_default: false,
    }
}

#[tokio::test]
async fn test_create_stores_encrypted_credentials() {
    let h = Harness::new();
    let service = account_service(&h);

    let account = service.create(aws_request("prod", "AKIAPROD")).await.unwrap();

    assert_eq!(account.status, AccountStatus::Pending);
    assert!(account.is_default);
    assert!(!account.credentials.contains("wJalrXUtnFEMI"));
    assert!(!account.credentials.contains("AKIAPROD"));

    let listed = service.list(AccountKind::Aws).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(service.list(AccountKind::Ldap).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_invalid_ldap_server() {
    let h = Harness::new();
    let service = account_service(&h);

    let mut request = ldap_request("corp-ad");
    request.region_or_url = "dc.corp.local".to_string();
    assert!(matches!(
        service.create(request).await,
        Err(AppError::Validation(_))
    ));

    let mut request = ldap_request("corp-ad");
    request.base_dn = None;
    assert!(matches!(
        service.create(request).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_create_duplicate_name_conflicts() {
    let h = Harness::new();
    let service = account_service(&h);

    service.create(aws_request("prod", "AKIA1")).await.unwrap();
    assert!(matches!(
        service.create(aws_request("prod", "AKIA2")).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_new_default_replaces_previous_default() {
    let h = Harness::new();
    let service = account_service(&h);

    let first = service.create(aws_request("prod", "AKIA1")).await.unwrap();
    let second = service.create(aws_request("staging", "AKIA2")).await.unwrap();

    assert!(!service.get(first.id).await.unwrap().is_default);
    assert!(service.get(second.id).await.unwrap().is_default);
}

#[tokio::test]
async fn test_update_secret_keeps_access_key() {
    let h = Harness::new();
    let service = account_service(&h);
    let account = service.create(aws_request("prod", "AKIAPROD")).await.unwrap();

    let updated = service
        .update(
            account.id,
            UpdateAccountRequest {
                secret: Some(Secret::new("rotated".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let resolver = CredentialResolver::new(h.accounts.clone(), h.settings.clone(), h.cipher.clone());
    let creds = resolver.aws_from_account(&updated).unwrap();
    assert_eq!(creds.access_key_id, "AKIAPROD");
    assert_eq!(creds.secret_access_key.expose_secret(), "rotated");
    assert_eq!(creds.region, "us-east-1");
}

#[tokio::test]
async fn test_update_rejects_non_ldap_url() {
    let h = Harness::new();
    let service = account_service(&h);
    let account = service.create(ldap_request("corp-ad")).await.unwrap();

    let result = service
        .update(
            account.id,
            UpdateAccountRequest {
                region_or_url: Some("https://dc.corp.local".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_deactivate_hides_account() {
    let h = Harness::new();
    let service = account_service(&h);
    let account = service.create(aws_request("prod", "AKIAPROD")).await.unwrap();

    service.deactivate(account.id).await.unwrap();

    assert!(matches!(
        service.get(account.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.deactivate(account.id).await,
        Err(AppError::NotFound(_))
    ));
    // 名称可以重新使用
    service.create(aws_request("prod", "AKIAPROD")).await.unwrap();
}

// ==================== 连接测试 ====================

#[tokio::test]
async fn test_connection_records_external_account_id() {
    let h = Harness::new();
    let service = account_service(&h);
    let account = service.create(aws_request("prod", "AKIAPROD")).await.unwrap();

    let result = service.test_connection(account.id).await.unwrap();

    assert_eq!(result.status, AccountStatus::Connected);
    assert_eq!(result.external_account_id.as_deref(), Some("123456789012"));
    let stored = service.get(account.id).await.unwrap();
    assert_eq!(stored.status, AccountStatus::Connected);
    assert_eq!(stored.external_account_id.as_deref(), Some("123456789012"));
}

#[tokio::test]
async fn test_connection_without_workspaces_access_is_limited() {
    let h = Harness::new();
    let service = account_service(&h);
    let account = service.create(aws_request("prod", "AKIAPROD")).await.unwrap();
    h.cloud.script(
        "AKIAPROD",
        CloudScript {
            probe: Some(Ok(ConnectionProbe {
                external_account_id: "210987654321".to_string(),
                workspaces_access: false,
            })),
            ..Default::default()
        },
    );

    let result = service.test_connection(account.id).await.unwrap();

    assert_eq!(result.status, AccountStatus::Limited);
    assert_eq!(
        service.get(account.id).await.unwrap().external_account_id.as_deref(),
        Some("210987654321")
    );
}

#[tokio::test]
async fn test_connection_rejected_credentials() {
    let h = Harness::new();
    let service = account_service(&h);
    let account = service.create(aws_request("prod", "AKIAPROD")).await.unwrap();
    h.cloud.script(
        "AKIAPROD",
        CloudScript {
            probe: Some(Err("InvalidClientTokenId".to_string())),
            ..Default::default()
        },
    );

    let result = service.test_connection(account.id).await.unwrap();

    assert_eq!(result.status, AccountStatus::Error);
    assert_eq!(result.external_account_id, None);
    assert!(result.message.contains("InvalidClientTokenId"));
    assert_eq!(
        service.get(account.id).await.unwrap().status,
        AccountStatus::Error
    );
}

#[tokio::test]
async fn test_directory_connection_test() {
    let h = Harness::new();
    let service = account_service(&h);
    let account = service.create(ldap_request("corp-ad")).await.unwrap();

    let ok = service.test_connection(account.id).await.unwrap();
    assert_eq!(ok.status, AccountStatus::Connected);

    h.directory.reject_bind("CN=svc,DC=corp,DC=local");
    let failed = service.test_connection(account.id).await.unwrap();
    assert_eq!(failed.status, AccountStatus::Error);
    assert_eq!(
        service.get(account.id).await.unwrap().status,
        AccountStatus::Error
    );
}

#[tokio::test]
async fn test_connection_unknown_account() {
    let h = Harness::new();
    let service = account_service(&h);

    assert!(matches!(
        service.test_connection(42).await,
        Err(AppError::NotFound(_))
    ));
}
