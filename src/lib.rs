//! WorkSpaces 库存同步服务
//! 从 AWS 与 LDAP/AD 拉取库存、审计、账单与目录属性并写入 PostgreSQL

pub mod config;
pub mod connectors;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod worker;
