//! 执行控制器 - 编排层
//!
//! 把长时间运行的工作放到后台任务中执行，调用方只等待结果。
//! 同一时刻最多只有一个工作单元在运行，后来的请求排队等待。

use crate::error::{AppResult, ExecutionError};
use crate::services::progress::{ProgressReporter, StatusUpdate};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// 执行控制器
pub struct ExecutionController {
    gate: Arc<Mutex<()>>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ExecutionController {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            gate: Arc::new(Mutex::new(())),
            reporter,
        }
    }

    /// 独占执行一个工作单元
    ///
    /// 工作单元在独立的 tokio 任务中运行。panic 不会传播给调用方，
    /// 而是转换为 `ExecutionError` 并以失败状态上报。
    ///
    /// 锁由后台任务持有：调用方放弃等待（超时、select）后，
    /// 下一个工作单元仍要等这个任务结束才会开始。
    pub async fn run_exclusive<T, F>(&self, unit: &str, work: F) -> AppResult<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.gate.clone().lock_owned().await;
        debug!("▶ 开始任务: {}", unit);

        let outcome = tokio::spawn(async move {
            let _guard = guard;
            work.await
        })
        .await;
        debug!("■ 任务结束: {}", unit);

        match outcome {
            Ok(value) => Ok(value),
            Err(join_error) => {
                let err = if join_error.is_panic() {
                    ExecutionError::Panicked {
                        unit: unit.to_string(),
                        message: panic_message(join_error.into_panic()),
                    }
                } else {
                    ExecutionError::Cancelled {
                        unit: unit.to_string(),
                    }
                };
                error!("❌ {}", err);
                self.reporter
                    .report(StatusUpdate::failure(format!("错误: {}", err), None));
                Err(err.into())
            }
        }
    }

    /// 当前是否有工作单元在运行
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知错误".to_string()
    }
}
