//! 消息处理池
//!
//! 提交时不阻塞：有空闲名额就交给后台任务，池满时在调用方就地执行，
//! 任何消息都不会被丢弃。

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// 任务的执行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// 已交给后台任务
    Spawned,
    /// 池已满，在调用方执行完毕
    Inline,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 当前空闲名额
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn execute<F>(&self, task: F) -> Dispatch
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                tokio::spawn(async move {
                    task.await;
                    drop(permit);
                });
                Dispatch::Spawned
            }
            Err(_) => {
                debug!(size = self.size, "Worker pool saturated, running inline");
                task.await;
                Dispatch::Inline
            }
        }
    }
}
