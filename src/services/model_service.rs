//! 模型服务 - 业务能力层
//!
//! 加载 / 显示点云模型，以及从点云生成网格

use crate::config::POISSON_DEPTH;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{ArtifactKind, ModelViewer, PoissonOutput, PoissonRequest, SurfaceReconstructor};
use crate::models::{PostAction, Workspace};
use crate::services::progress::{ProgressReporter, StatusUpdate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 模型服务
///
/// 职责：
/// - 检查产物是否存在
/// - 调用表面重建
/// - 交给查看器显示
pub struct ModelService {
    reconstructor: Arc<dyn SurfaceReconstructor>,
    viewer: Arc<dyn ModelViewer>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ModelService {
    pub fn new(
        reconstructor: Arc<dyn SurfaceReconstructor>,
        viewer: Arc<dyn ModelViewer>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            reconstructor,
            viewer,
            reporter,
        }
    }

    /// 显示点云模型
    ///
    /// 文件不存在时返回 `ModelNotFound`，查看器不会被调用。
    pub async fn load_model(&self, model_path: &Path) -> AppResult<()> {
        if !model_path.is_file() {
            return Err(AppError::model_not_found(model_path));
        }

        self.reporter.report(StatusUpdate::info(format!(
            "{}: {}",
            PostAction::VisualizePointCloud.status_message(),
            model_path.display()
        )));
        self.viewer.show(model_path, ArtifactKind::PointCloud).await
    }

    /// 由工作区中的点云生成网格并显示
    ///
    /// 返回生成的网格路径。
    pub async fn generate_mesh(&self, workspace: &Workspace) -> AppResult<PathBuf> {
        let point_cloud = workspace.model_path();
        if !point_cloud.is_file() {
            return Err(AppError::model_not_found(point_cloud));
        }

        self.reporter
            .report(StatusUpdate::info(PostAction::GenerateMesh.status_message()));
        let request = PoissonRequest {
            point_cloud: point_cloud.to_path_buf(),
            mesh_out: workspace.mesh_path().to_path_buf(),
            depth: POISSON_DEPTH,
        };
        info!("🧊 Poisson 表面重建 (depth={}): {}", request.depth, point_cloud.display());

        // 密度值目前不使用
        let PoissonOutput { mesh, densities } = self.reconstructor.reconstruct(&request).await?;
        debug!("表面重建返回 {} 个密度值", densities.len());

        if !mesh.is_file() {
            return Err(AppError::mesh_not_found(&mesh));
        }

        let file_name = mesh
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| mesh.display().to_string());
        self.reporter.report(StatusUpdate::success(
            format!("网格已生成并保存为 {}", file_name),
            None,
        ));

        self.viewer.show(&mesh, ArtifactKind::Mesh).await?;
        Ok(mesh)
    }
}
