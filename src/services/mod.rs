//! Business logic services layer

pub mod account_service;
pub mod credential_service;
pub mod notification_service;
pub mod sync_service;

pub use account_service::{AccountService, ConnectionTestResult};
pub use credential_service::{AccountRef, CredentialResolver};
pub use notification_service::{NotificationService, NotificationSink};
pub use sync_service::{SyncDependencies, SyncService};
