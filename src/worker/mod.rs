//! 同步任务队列
//!
//! submit(request) -> handle：提交时写入 running 历史记录并立即返回，
//! 有界队列提供背压，信号量限制同时执行的同步数量。

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{AppError, Result};
use crate::models::sync::{SyncOutcome, SyncRequest};
use crate::services::SyncService;

/// 队列中的一个同步任务
struct SyncJob {
    sync_id: i32,
    request: SyncRequest,
    reply: oneshot::Sender<SyncOutcome>,
}

/// 已提交同步的句柄；丢弃句柄不会取消同步
#[derive(Debug)]
pub struct SyncHandle {
    pub sync_id: i32,
    outcome: oneshot::Receiver<SyncOutcome>,
}

impl SyncHandle {
    /// 等待终态；worker 在完成前退出时返回 None
    pub async fn wait(self) -> Option<SyncOutcome> {
        self.outcome.await.ok()
    }
}

#[derive(Clone)]
pub struct SyncQueue {
    sender: mpsc::Sender<SyncJob>,
    service: Arc<SyncService>,
    capacity: usize,
}

impl SyncQueue {
    /// 创建队列并启动分发循环
    pub fn start(service: Arc<SyncService>, config: &SyncConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let semaphore = Arc::new(Semaphore::new(config.worker_count));
        let dispatcher = tokio::spawn(dispatch_loop(receiver, service.clone(), semaphore));

        info!(
            workers = config.worker_count,
            capacity = config.queue_capacity,
            "Sync queue started"
        );

        (
            Self {
                sender,
                service,
                capacity: config.queue_capacity,
            },
            dispatcher,
        )
    }

    /// 提交同步；队列已满时返回 QueueFull 且不创建历史记录
    pub async fn submit(&self, request: SyncRequest) -> Result<SyncHandle> {
        let permit = self.sender.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => AppError::internal_error("sync queue closed"),
        })?;

        let history = self.service.begin(request).await?;
        let (reply, outcome) = oneshot::channel();
        permit.send(SyncJob {
            sync_id: history.id,
            request,
            reply,
        });

        debug!(sync_id = history.id, "Sync queued");
        Ok(SyncHandle {
            sync_id: history.id,
            outcome,
        })
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<SyncJob>,
    service: Arc<SyncService>,
    semaphore: Arc<Semaphore>,
) {
    while let Some(job) = receiver.recv().await {
        // 获取信号量许可
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(sync_id = job.sync_id, "Worker pool closed, dropping sync");
                break;
            }
        };

        let service = service.clone();
        tokio::spawn(async move {
            let outcome = service.execute(job.sync_id, job.request).await;
            if job.reply.send(outcome).is_err() {
                debug!(sync_id = job.sync_id, "Sync handle dropped before completion");
            }
            drop(permit);
        });
    }

    info!("Sync queue closed");
}
