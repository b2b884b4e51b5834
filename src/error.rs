use std::path::{Path, PathBuf};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 图像目录校验错误
    #[error("图像校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 重建阶段执行错误
    #[error("阶段执行错误: {0}")]
    Stage(#[from] StageError),
    /// 产物（模型 / 网格）错误
    #[error("产物错误: {0}")]
    Artifact(#[from] ArtifactError),
    /// 外部进程错误
    #[error("外部进程错误: {0}")]
    Engine(#[from] EngineError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 后台执行错误
    #[error("执行错误: {0}")]
    Execution(#[from] ExecutionError),
}

/// 图像目录校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 目录不存在
    #[error("图像目录不存在: {}", .path.display())]
    NotFound { path: PathBuf },
    /// 路径不是目录
    #[error("路径不是目录: {}", .path.display())]
    NotADirectory { path: PathBuf },
    /// 目录为空
    #[error("图像目录为空: {}", .path.display())]
    Empty { path: PathBuf },
    /// 存在无法识别为图像的文件
    #[error("目录中只能包含图像，无法识别: {file_name}")]
    NotAnImage { file_name: String },
    /// 读取目录或文件失败
    #[error("无法读取 {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 重建阶段错误
#[derive(Debug, Error)]
pub enum StageError {
    /// 前置条件不满足，阶段未启动
    #[error("{stage} 前置条件不满足: {reason}")]
    Precondition { stage: &'static str, reason: String },
    /// 外部进程以非零状态退出
    #[error("{stage} 退出码 {}: {message}", exit_code_label(.code))]
    NonZeroExit {
        stage: &'static str,
        code: Option<i32>,
        message: String,
    },
    /// 外部进程无法启动或等待失败
    #[error("{stage} 无法执行: {source}")]
    Launch {
        stage: &'static str,
        #[source]
        source: EngineError,
    },
}

impl StageError {
    /// 出错的阶段名
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Precondition { stage, .. }
            | StageError::NonZeroExit { stage, .. }
            | StageError::Launch { stage, .. } => stage,
        }
    }
}

/// 产物错误
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// 点云模型文件不存在
    #[error("三维模型文件不存在: {}", .path.display())]
    ModelNotFound { path: PathBuf },
    /// 网格文件不存在
    #[error("三维网格文件不存在: {}", .path.display())]
    MeshNotFound { path: PathBuf },
    /// PLY 文件无法解析
    #[error("PLY 文件无效 ({}): {reason}", .path.display())]
    InvalidPly { path: PathBuf, reason: String },
}

/// 外部进程错误
#[derive(Debug, Error)]
pub enum EngineError {
    /// 启动进程失败
    #[error("无法启动 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 等待进程结束失败
    #[error("等待 {program} 结束失败: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 创建目录失败
    #[error("创建目录失败 ({}): {source}", .path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 解析失败
    #[error("配置文件解析失败 ({}): {source}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 未知的阶段名
    #[error("未知的阶段: {name}")]
    UnknownStage { name: String },
}

/// 后台执行错误
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// 任务 panic
    #[error("任务 {unit} 异常终止: {message}")]
    Panicked { unit: String, message: String },
    /// 任务被取消
    #[error("任务 {unit} 被取消")]
    Cancelled { unit: String },
    /// 组合操作中的一步未完成，原因已由执行者上报
    #[error("{unit} 已中止: {reason}")]
    Aborted { unit: String, reason: String },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "未知".to_string(),
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建模型不存在错误
    pub fn model_not_found(path: impl AsRef<Path>) -> Self {
        AppError::Artifact(ArtifactError::ModelNotFound {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// 创建网格不存在错误
    pub fn mesh_not_found(path: impl AsRef<Path>) -> Self {
        AppError::Artifact(ArtifactError::MeshNotFound {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// 创建目录创建失败错误
    pub fn create_dir_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::CreateDirFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// 是否为“产物不存在”类错误
    pub fn is_artifact_not_found(&self) -> bool {
        matches!(
            self,
            AppError::Artifact(ArtifactError::ModelNotFound { .. })
                | AppError::Artifact(ArtifactError::MeshNotFound { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_reports_stage_name() {
        let err = StageError::NonZeroExit {
            stage: "mapper",
            code: Some(3),
            message: "no good initial pair".to_string(),
        };
        assert_eq!(err.stage(), "mapper");
        let text = err.to_string();
        assert!(text.contains("mapper"));
        assert!(text.contains('3'));
    }

    #[test]
    fn unknown_exit_code_is_rendered() {
        let err = StageError::NonZeroExit {
            stage: "stereo_fusion",
            code: None,
            message: String::new(),
        };
        assert!(err.to_string().contains("未知"));
    }

    #[test]
    fn artifact_not_found_detection() {
        assert!(AppError::model_not_found("/tmp/none.ply").is_artifact_not_found());
        assert!(AppError::mesh_not_found("/tmp/none.ply").is_artifact_not_found());
        let other = AppError::Config(ConfigError::UnknownStage {
            name: "x".to_string(),
        });
        assert!(!other.is_artifact_not_found());
    }
}
