//! 数据模型模块
//! 账号、库存、审计、账单、用量与同步历史

pub mod account;
pub mod audit_event;
pub mod billing;
pub mod credentials;
pub mod notification;
pub mod settings;
pub mod sync;
pub mod usage;
pub mod workspace;
