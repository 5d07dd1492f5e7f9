//! AWS SDK backed provider
//! WorkSpaces / CloudTrail / Cost Explorer / STS

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudtrail::types::{LookupAttribute, LookupAttributeKey};
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension, DimensionValues, Expression, Granularity, GroupDefinition,
    GroupDefinitionType,
};
use aws_sdk_workspaces::config::Credentials;
use aws_sdk_workspaces::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use tracing::debug;

use super::{
    AuditEventItem, AuditWindow, CloudProvider, ConnectionProbe, CostBucket, CostGroup,
    CostQuery, EventResource, PageStream, WorkspaceItem,
};
use crate::error::SyncError;
use crate::models::credentials::AwsCredentials;

/// Cost Explorer 只在 us-east-1 提供服务
const COST_EXPLORER_REGION: &str = "us-east-1";
const CREDENTIALS_PROVIDER_NAME: &str = "workspaces-inventory";

/// 账单返回的两个指标，第一个作为金额
const COST_METRICS: [&str; 2] = ["UnblendedCost", "UsageQuantity"];

pub struct AwsProvider {
    page_size: i32,
}

impl AwsProvider {
    pub fn new(page_size: i32) -> Self {
        Self { page_size }
    }

    async fn sdk_config(creds: &AwsCredentials, region: &str) -> SdkConfig {
        let credentials = Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.expose_secret().clone(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await
    }
}

fn sdk_error<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}

fn to_utc(dt: &aws_sdk_cloudtrail::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn workspaces(
        &self,
        creds: &AwsCredentials,
    ) -> Result<Box<dyn PageStream<WorkspaceItem>>, SyncError> {
        let config = Self::sdk_config(creds, &creds.region).await;
        Ok(Box::new(WorkspacePages {
            client: aws_sdk_workspaces::Client::new(&config),
            next_token: None,
            done: false,
        }))
    }

    async fn audit_events(
        &self,
        creds: &AwsCredentials,
        window: AuditWindow,
    ) -> Result<Box<dyn PageStream<AuditEventItem>>, SyncError> {
        let config = Self::sdk_config(creds, &creds.region).await;
        let attribute = LookupAttribute::builder()
            .attribute_key(LookupAttributeKey::ResourceType)
            .attribute_value(window.resource_type.clone())
            .build()
            .map_err(|e| SyncError::fetch(e.to_string()))?;

        Ok(Box::new(AuditEventPages {
            client: aws_sdk_cloudtrail::Client::new(&config),
            attribute,
            window,
            page_size: self.page_size,
            next_token: None,
            done: false,
        }))
    }

    async fn cost_and_usage(
        &self,
        creds: &AwsCredentials,
        query: CostQuery,
    ) -> Result<Box<dyn PageStream<CostBucket>>, SyncError> {
        let config = Self::sdk_config(creds, COST_EXPLORER_REGION).await;
        let period = DateInterval::builder()
            .start(query.start.format("%Y-%m-%d").to_string())
            .end(query.end.format("%Y-%m-%d").to_string())
            .build()
            .map_err(|e| SyncError::fetch(e.to_string()))?;

        Ok(Box::new(CostPages {
            client: aws_sdk_costexplorer::Client::new(&config),
            period,
            query,
            next_token: None,
            done: false,
        }))
    }

    async fn probe(&self, creds: &AwsCredentials) -> Result<ConnectionProbe, SyncError> {
        let config = Self::sdk_config(creds, &creds.region).await;

        let identity = aws_sdk_sts::Client::new(&config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| SyncError::Authentication(sdk_error(&e)))?;
        let external_account_id = identity.account().unwrap_or_default().to_string();

        let workspaces_access = match aws_sdk_workspaces::Client::new(&config)
            .describe_workspaces()
            .limit(1)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %sdk_error(&e), "DescribeWorkspaces denied during probe");
                false
            }
        };

        Ok(ConnectionProbe {
            external_account_id,
            workspaces_access,
        })
    }
}

// ==================== Pagers ====================

struct WorkspacePages {
    client: aws_sdk_workspaces::Client,
    next_token: Option<String>,
    done: bool,
}

#[async_trait]
impl PageStream<WorkspaceItem> for WorkspacePages {
    async fn next_page(&mut self) -> Option<Result<Vec<WorkspaceItem>, SyncError>> {
        if self.done {
            return None;
        }

        let result = self
            .client
            .describe_workspaces()
            .set_next_token(self.next_token.take())
            .send()
            .await;

        match result {
            Ok(resp) => {
                self.next_token = resp.next_token().map(str::to_string);
                self.done = self.next_token.is_none();
                Some(Ok(resp.workspaces().iter().map(workspace_item).collect()))
            }
            Err(e) => {
                self.done = true;
                Some(Err(SyncError::fetch(sdk_error(&e))))
            }
        }
    }
}

fn workspace_item(ws: &aws_sdk_workspaces::types::Workspace) -> WorkspaceItem {
    let props = ws.workspace_properties();
    WorkspaceItem {
        workspace_id: ws.workspace_id().map(str::to_string),
        user_name: ws.user_name().map(str::to_string),
        directory_id: ws.directory_id().map(str::to_string),
        ip_address: ws.ip_address().map(str::to_string),
        state: ws.state().map(|s| s.as_str().to_string()),
        bundle_id: ws.bundle_id().map(str::to_string),
        subnet_id: ws.subnet_id().map(str::to_string),
        computer_name: ws.computer_name().map(str::to_string),
        running_mode: props
            .and_then(|p| p.running_mode())
            .map(|m| m.as_str().to_string()),
        compute_type_name: props
            .and_then(|p| p.compute_type_name())
            .map(|c| c.as_str().to_string()),
        root_volume_size_gib: props.and_then(|p| p.root_volume_size_gib()),
        user_volume_size_gib: props.and_then(|p| p.user_volume_size_gib()),
    }
}

struct AuditEventPages {
    client: aws_sdk_cloudtrail::Client,
    attribute: LookupAttribute,
    window: AuditWindow,
    page_size: i32,
    next_token: Option<String>,
    done: bool,
}

#[async_trait]
impl PageStream<AuditEventItem> for AuditEventPages {
    async fn next_page(&mut self) -> Option<Result<Vec<AuditEventItem>, SyncError>> {
        if self.done {
            return None;
        }

        let result = self
            .client
            .lookup_events()
            .lookup_attributes(self.attribute.clone())
            .start_time(aws_sdk_cloudtrail::primitives::DateTime::from_secs(
                self.window.start.timestamp(),
            ))
            .end_time(aws_sdk_cloudtrail::primitives::DateTime::from_secs(
                self.window.end.timestamp(),
            ))
            .max_results(self.page_size)
            .set_next_token(self.next_token.take())
            .send()
            .await;

        match result {
            Ok(resp) => {
                self.next_token = resp.next_token().map(str::to_string);
                self.done = self.next_token.is_none();
                let events = resp
                    .events()
                    .iter()
                    .map(|event| AuditEventItem {
                        event_id: event.event_id().map(str::to_string),
                        event_name: event.event_name().map(str::to_string),
                        event_time: event.event_time().and_then(to_utc),
                        event_source: event.event_source().map(str::to_string),
                        username: event.username().map(str::to_string),
                        resources: event
                            .resources()
                            .iter()
                            .map(|r| EventResource {
                                resource_type: r.resource_type().map(str::to_string),
                                resource_name: r.resource_name().map(str::to_string),
                            })
                            .collect(),
                        cloud_trail_event: event.cloud_trail_event().map(str::to_string),
                    })
                    .collect();
                Some(Ok(events))
            }
            Err(e) => {
                self.done = true;
                Some(Err(SyncError::fetch(sdk_error(&e))))
            }
        }
    }
}

struct CostPages {
    client: aws_sdk_costexplorer::Client,
    period: DateInterval,
    query: CostQuery,
    next_token: Option<String>,
    done: bool,
}

#[async_trait]
impl PageStream<CostBucket> for CostPages {
    async fn next_page(&mut self) -> Option<Result<Vec<CostBucket>, SyncError>> {
        if self.done {
            return None;
        }

        let filter = Expression::builder()
            .dimensions(
                DimensionValues::builder()
                    .key(Dimension::Service)
                    .values(self.query.service.clone())
                    .build(),
            )
            .build();
        let group = GroupDefinition::builder()
            .r#type(GroupDefinitionType::Dimension)
            .key(self.query.group_by.clone())
            .build();

        let mut request = self
            .client
            .get_cost_and_usage()
            .time_period(self.period.clone())
            .granularity(Granularity::Daily)
            .filter(filter)
            .group_by(group)
            .set_next_page_token(self.next_token.take());
        for metric in COST_METRICS {
            request = request.metrics(metric);
        }

        match request.send().await {
            Ok(resp) => {
                self.next_token = resp.next_page_token().map(str::to_string);
                self.done = self.next_token.is_none();
                let buckets = resp
                    .results_by_time()
                    .iter()
                    .map(|result| CostBucket {
                        start: result
                            .time_period()
                            .map(|p| p.start().to_string())
                            .unwrap_or_default(),
                        end: result
                            .time_period()
                            .map(|p| p.end().to_string())
                            .unwrap_or_default(),
                        groups: result
                            .groups()
                            .iter()
                            .map(|g| {
                                let cost = g.metrics().and_then(|m| m.get(COST_METRICS[0]));
                                CostGroup {
                                    keys: g.keys().to_vec(),
                                    amount: cost.and_then(|c| c.amount()).map(str::to_string),
                                    unit: cost.and_then(|c| c.unit()).map(str::to_string),
                                }
                            })
                            .collect(),
                    })
                    .collect();
                Some(Ok(buckets))
            }
            Err(e) => {
                self.done = true;
                Some(Err(SyncError::fetch(sdk_error(&e))))
            }
        }
    }
}
