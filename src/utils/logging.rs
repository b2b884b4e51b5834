//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{PipelineRun, RunStatus};
use std::fs;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则 verbose 时输出 debug，包括引擎的原始输出。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径，已存在时覆盖
pub fn init_log_file(log_file_path: &Path) -> AppResult<()> {
    if let Some(parent) = log_file_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|e| AppError::create_dir_failed(parent, e))?;
        }
    }

    let log_header = format!(
        "{}\n三维重建日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 照片三维重建");
    info!("🔧 重建引擎: {}", config.engine_path);
    info!("📁 工作目录: {}", config.base_dir.display());
    if let Some(viewer) = &config.viewer_command {
        info!("🖥️ 模型查看器: {}", viewer);
    }
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始信息
///
/// # 参数
/// - `position`: 阶段序号（从 1 开始）
/// - `total`: 阶段总数
/// - `name`: 阶段名
pub fn log_stage_start(position: usize, total: usize, name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📦 阶段 {}/{}: {}", position, total, name);
    info!("{}", "─".repeat(60));
}

/// 打印一次运行的最终统计
pub fn log_run_summary(run: &PipelineRun, log_file_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 重建运行结束");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if let (Some(started), Some(finished)) = (run.started_at, run.finished_at) {
        let elapsed = finished.signed_duration_since(started);
        info!("耗时: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }
    info!("{}", "=".repeat(60));
    match run.status {
        RunStatus::Completed => info!("✅ 全部 {} 个阶段完成", run.completed_stages.len()),
        _ => {
            error!(
                "❌ 停在第 {} 个阶段 ({:.1}%)",
                run.current_stage_index,
                run.percent_complete()
            );
            if let Some(err) = &run.last_error {
                error!("原因: {}", truncate_text(err, 300));
            }
        }
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("正在融合结果", 4), "正在融合...");
        assert_eq!(truncate_text("mapper", 10), "mapper");
    }

    #[test]
    fn log_file_header_overwrites_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("scan_log.txt");

        init_log_file(&path).unwrap();
        std::fs::write(&path, "old content").unwrap();
        init_log_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("三维重建日志"));
        assert!(!content.contains("old content"));
    }
}
