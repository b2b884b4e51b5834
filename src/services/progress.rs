//! 进度 / 状态上报 - 业务能力层
//!
//! 编排层把人类可读的状态信息和完成百分比推送到这里，
//! 由界面（或日志、文件、通道）消费。

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// 状态类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Info,
    Success,
    Failure,
}

/// 一条状态更新
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub message: String,
    /// 完成百分比（0–100）；None 表示进度不变
    pub percent: Option<f64>,
    pub kind: StatusKind,
}

impl StatusUpdate {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            percent: None,
            kind: StatusKind::Info,
        }
    }

    pub fn progress(message: impl Into<String>, percent: f64) -> Self {
        Self {
            message: message.into(),
            percent: Some(percent),
            kind: StatusKind::Info,
        }
    }

    pub fn success(message: impl Into<String>, percent: Option<f64>) -> Self {
        Self {
            message: message.into(),
            percent,
            kind: StatusKind::Success,
        }
    }

    pub fn failure(message: impl Into<String>, percent: Option<f64>) -> Self {
        Self {
            message: message.into(),
            percent,
            kind: StatusKind::Failure,
        }
    }
}

/// 状态接收端
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: StatusUpdate);
}

/// 输出到 tracing 日志
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, update: StatusUpdate) {
        let percent = update
            .percent
            .map(|p| format!("[{:>5.1}%] ", p))
            .unwrap_or_default();
        match update.kind {
            StatusKind::Info => info!("{}{}", percent, update.message),
            StatusKind::Success => info!("{}✅ {}", percent, update.message),
            StatusKind::Failure => error!("{}❌ {}", percent, update.message),
        }
    }
}

/// 推送到 tokio 通道，供界面或测试消费
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, update: StatusUpdate) {
        // 接收端已关闭时丢弃
        let _ = self.tx.send(update);
    }
}

/// 同时推送给多个接收端
#[derive(Default)]
pub struct Reporters {
    sinks: Vec<Arc<dyn ProgressReporter>>,
}

impl Reporters {
    pub fn new(sinks: Vec<Arc<dyn ProgressReporter>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn ProgressReporter>) {
        self.sinks.push(sink);
    }
}

impl ProgressReporter for Reporters {
    fn report(&self, update: StatusUpdate) {
        for sink in &self.sinks {
            sink.report(update.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_out_delivers_to_every_sink() {
        let (first, mut first_rx) = ChannelReporter::new();
        let (second, mut second_rx) = ChannelReporter::new();
        let mut reporters = Reporters::default();
        reporters.push(Arc::new(first));
        reporters.push(Arc::new(second));
        reporters.push(Arc::new(TracingReporter));

        reporters.report(StatusUpdate::progress("正在提取特征...", 0.0));

        assert_eq!(first_rx.try_recv().unwrap().message, "正在提取特征...");
        assert_eq!(second_rx.try_recv().unwrap().percent, Some(0.0));
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (reporter, rx) = ChannelReporter::new();
        drop(rx);
        reporter.report(StatusUpdate::failure("boom", None));
    }
}
