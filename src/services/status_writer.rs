//! 状态日志写入服务 - 业务能力层
//!
//! 只负责"把状态行追加到日志文件"能力，不关心流程

use crate::services::progress::{ProgressReporter, StatusKind, StatusUpdate};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// 状态日志写入服务
///
/// 职责：
/// - 将每条状态更新追加到日志文件
/// - 写入失败只记录警告，不影响流水线
pub struct StatusWriter {
    log_file_path: PathBuf,
    lock: Mutex<()>,
}

impl StatusWriter {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            log_file_path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 追加一条状态
    pub fn write(&self, update: &StatusUpdate) -> std::io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)?;

        let tag = match update.kind {
            StatusKind::Info => "INFO",
            StatusKind::Success => " OK ",
            StatusKind::Failure => "FAIL",
        };
        let percent = update
            .percent
            .map(|p| format!("{:>5.1}%", p))
            .unwrap_or_else(|| "     -".to_string());
        let line = format!(
            "{} [{}] {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            tag,
            percent,
            update.message
        );

        file.write_all(line.as_bytes())
    }
}

impl ProgressReporter for StatusWriter {
    fn report(&self, update: StatusUpdate) {
        if let Err(e) = self.write(&update) {
            warn!("写入状态日志失败 ({}): {}", self.log_file_path.display(), e);
        } else {
            debug!("状态已写入 {}", self.log_file_path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_update() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scan_log.txt");
        std::fs::write(&path, "header\n").unwrap();

        let writer = StatusWriter::with_path(&path);
        writer.report(StatusUpdate::progress("正在构建稀疏地图...", 33.2));
        writer.report(StatusUpdate::failure("mapper 退出码 1", Some(33.2)));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "header");
        assert!(lines[1].contains("[INFO]"));
        assert!(lines[1].contains(" 33.2%"));
        assert!(lines[2].contains("[FAIL]"));
        assert!(lines[2].ends_with("mapper 退出码 1"));
    }
}
