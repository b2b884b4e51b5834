//! 几何 / 可视化 - 基础设施层
//!
//! 表面重建和模型查看都交给外部协作方完成，这里只定义边界：
//! - `SurfaceReconstructor`：(点云, 深度) -> (网格, 每顶点密度)
//! - `ModelViewer`：显示点云或网格，阻塞到用户关闭窗口为止

use crate::error::{AppError, AppResult, ArtifactError, EngineError, StageError};
use crate::infrastructure::engine::{EngineInvocation, ReconstructionEngine};
use crate::models::ply::PlyHeader;
use crate::models::stage::{MeshSlot, MESH_COMMAND};
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

/// Poisson 表面重建请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoissonRequest {
    pub point_cloud: PathBuf,
    pub mesh_out: PathBuf,
    pub depth: u32,
}

/// Poisson 表面重建结果
#[derive(Debug, Clone, Default)]
pub struct PoissonOutput {
    pub mesh: PathBuf,
    /// 每个顶点的密度，后端不提供时为空
    pub densities: Vec<f32>,
}

/// 表面重建
pub trait SurfaceReconstructor: Send + Sync {
    fn reconstruct<'a>(&'a self, request: &'a PoissonRequest) -> BoxFuture<'a, AppResult<PoissonOutput>>;
}

/// 通过引擎的 `poisson_mesher` 子命令完成表面重建
pub struct EngineMesher {
    engine: Arc<dyn ReconstructionEngine>,
}

impl EngineMesher {
    pub fn new(engine: Arc<dyn ReconstructionEngine>) -> Self {
        Self { engine }
    }

    async fn mesh(&self, request: &PoissonRequest) -> AppResult<PoissonOutput> {
        let args = MESH_COMMAND.bind_with(|slot| match slot {
            MeshSlot::PointCloud => request.point_cloud.clone().into_os_string(),
            MeshSlot::Mesh => request.mesh_out.clone().into_os_string(),
            MeshSlot::Depth => OsString::from(request.depth.to_string()),
        });
        let invocation = EngineInvocation::new(MESH_COMMAND.subcommand, args);

        let exit = self
            .engine
            .run(&invocation)
            .await
            .map_err(|source| StageError::Launch {
                stage: MESH_COMMAND.subcommand,
                source,
            })?;

        if !exit.success() {
            return Err(StageError::NonZeroExit {
                stage: MESH_COMMAND.subcommand,
                code: exit.code,
                message: exit.message(),
            }
            .into());
        }

        Ok(PoissonOutput {
            mesh: request.mesh_out.clone(),
            densities: Vec::new(),
        })
    }
}

impl SurfaceReconstructor for EngineMesher {
    fn reconstruct<'a>(&'a self, request: &'a PoissonRequest) -> BoxFuture<'a, AppResult<PoissonOutput>> {
        Box::pin(self.mesh(request))
    }
}

/// 要显示的产物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    PointCloud,
    Mesh,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::PointCloud => write!(f, "点云"),
            ArtifactKind::Mesh => write!(f, "网格"),
        }
    }
}

/// 模型查看器
pub trait ModelViewer: Send + Sync {
    /// 显示产物，直到查看器关闭才返回
    fn show<'a>(&'a self, artifact: &'a Path, kind: ArtifactKind) -> BoxFuture<'a, AppResult<()>>;
}

/// 启动外部查看器程序（例如 meshlab），等待其退出
pub struct CommandViewer {
    program: String,
}

impl CommandViewer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn open(&self, artifact: &Path, kind: ArtifactKind) -> AppResult<()> {
        info!("🖥️ 使用 {} 显示{}: {}", self.program, kind, artifact.display());

        let status = Command::new(&self.program)
            .arg(artifact)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| {
                AppError::Engine(EngineError::Spawn {
                    program: self.program.clone(),
                    source,
                })
            })?;

        if !status.success() {
            warn!("查看器 {} 退出状态异常: {:?}", self.program, status.code());
        }
        Ok(())
    }
}

impl ModelViewer for CommandViewer {
    fn show<'a>(&'a self, artifact: &'a Path, kind: ArtifactKind) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(self.open(artifact, kind))
    }
}

/// 无界面环境下的查看器：读取 PLY 文件头并输出摘要
#[derive(Debug, Default)]
pub struct SummaryViewer;

impl SummaryViewer {
    async fn summarize(&self, artifact: &Path, kind: ArtifactKind) -> AppResult<()> {
        let path = artifact.to_path_buf();
        let header = tokio::task::spawn_blocking(move || PlyHeader::from_path(&path))
            .await
            .map_err(|e| AppError::Artifact(ArtifactError::InvalidPly {
                path: artifact.to_path_buf(),
                reason: e.to_string(),
            }))?
            .map_err(|reason| AppError::Artifact(ArtifactError::InvalidPly {
                path: artifact.to_path_buf(),
                reason,
            }))?;

        info!("📐 {}: {}", kind, artifact.display());
        info!(
            "   格式: {} | 顶点: {} | 面: {} | 颜色: {} | 法向: {}",
            header.format,
            header.vertex_count,
            header.face_count,
            if header.has_colors { "有" } else { "无" },
            if header.has_normals { "有" } else { "无" },
        );
        if kind == ArtifactKind::Mesh && header.is_point_cloud() {
            warn!("网格文件中没有面: {}", artifact.display());
        }
        Ok(())
    }
}

impl ModelViewer for SummaryViewer {
    fn show<'a>(&'a self, artifact: &'a Path, kind: ArtifactKind) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(self.summarize(artifact, kind))
    }
}
