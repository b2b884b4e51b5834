use crate::error::{AppError, AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Poisson 表面重建的八叉树深度
pub const POISSON_DEPTH: u32 = 9;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 重建引擎（COLMAP）可执行文件路径
    pub engine_path: String,
    /// 工作目录，所有产物都放在这里
    pub base_dir: PathBuf,
    /// 图像目录（为空时使用 `<base_dir>/images`）
    pub image_dir: Option<PathBuf>,
    /// 外部模型查看器程序（为空时只输出摘要）
    pub viewer_command: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 状态日志文件
    pub output_log_file: String,
    /// 完整运行结束后是否写入 pipeline_run.json
    pub write_run_report: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine_path: "colmap".to_string(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            image_dir: None,
            viewer_command: None,
            verbose_logging: false,
            output_log_file: "scan_log.txt".to_string(),
            write_run_report: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            engine_path: std::env::var("COLMAP_PATH").unwrap_or(default.engine_path),
            base_dir: std::env::var("SCAN_BASE_DIR").map(PathBuf::from).unwrap_or(default.base_dir),
            image_dir: std::env::var("SCAN_IMAGE_DIR").ok().map(PathBuf::from).or(default.image_dir),
            viewer_command: std::env::var("MODEL_VIEWER").ok().filter(|v| !v.is_empty()).or(default.viewer_command),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            write_run_report: std::env::var("WRITE_RUN_REPORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.write_run_report),
        }
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(path, e))?;
        Self::from_toml_str(&content).map_err(|source| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: path.to_path_buf(),
                source,
            })
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 状态日志文件的完整路径（相对路径基于工作目录）
    pub fn log_file_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.output_log_file);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }
}
