//! 工作区：重建流程读写的固定路径集合

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::image_set::ImageSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 工作区路径
///
/// 启动时从工作目录推导，之后只有 `image_dir`（重新选择图像）
/// 和 `model_path`（加载外部模型）可以在两次运行之间修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    base_dir: PathBuf,
    image_dir: PathBuf,
    database_path: PathBuf,
    sparse_dir: PathBuf,
    dense_dir: PathBuf,
    model_path: PathBuf,
    mesh_path: PathBuf,
}

impl Workspace {
    /// 以 `base_dir` 为根创建工作区
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            image_dir: base_dir.join("images"),
            database_path: base_dir.join("database.db"),
            sparse_dir: base_dir.join("sparse"),
            dense_dir: base_dir.join("dense"),
            model_path: base_dir.join("model.ply"),
            mesh_path: base_dir.join("mesh.ply"),
            base_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut workspace = Self::new(&config.base_dir);
        if let Some(image_dir) = &config.image_dir {
            workspace.image_dir = image_dir.clone();
        }
        workspace
    }

    /// 确保稀疏 / 稠密输出目录存在
    pub fn ensure_output_dirs(&self) -> AppResult<()> {
        for dir in [&self.sparse_dir, &self.dense_dir] {
            if !dir.is_dir() {
                debug!("创建目录: {}", dir.display());
                fs::create_dir_all(dir).map_err(|e| AppError::create_dir_failed(dir, e))?;
            }
        }
        Ok(())
    }

    /// 使用校验通过的图像集替换图像目录
    pub fn set_image_dir(&mut self, images: &ImageSet) {
        self.image_dir = images.directory().to_path_buf();
    }

    pub fn set_model_path(&mut self, path: impl Into<PathBuf>) {
        self.model_path = path.into();
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn sparse_dir(&self) -> &Path {
        &self.sparse_dir
    }

    /// 映射器生成的第一个重建结果
    pub fn sparse_model_dir(&self) -> PathBuf {
        self.sparse_dir.join("0")
    }

    pub fn dense_dir(&self) -> &Path {
        &self.dense_dir
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn mesh_path(&self) -> &Path {
        &self.mesh_path
    }

    /// 完整运行结束后写入的运行报告
    pub fn run_report_path(&self) -> PathBuf {
        self.base_dir.join("pipeline_run.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_derived_from_base_dir() {
        let ws = Workspace::new("/scan");
        assert_eq!(ws.image_dir(), Path::new("/scan/images"));
        assert_eq!(ws.database_path(), Path::new("/scan/database.db"));
        assert_eq!(ws.sparse_dir(), Path::new("/scan/sparse"));
        assert_eq!(ws.sparse_model_dir(), PathBuf::from("/scan/sparse/0"));
        assert_eq!(ws.dense_dir(), Path::new("/scan/dense"));
        assert_eq!(ws.model_path(), Path::new("/scan/model.ply"));
        assert_eq!(ws.mesh_path(), Path::new("/scan/mesh.ply"));
    }

    #[test]
    fn config_image_dir_overrides_default() {
        let config = Config {
            base_dir: PathBuf::from("/scan"),
            image_dir: Some(PathBuf::from("/photos/statue")),
            ..Config::default()
        };
        let ws = Workspace::from_config(&config);
        assert_eq!(ws.image_dir(), Path::new("/photos/statue"));
        assert_eq!(ws.database_path(), Path::new("/scan/database.db"));
    }

    #[test]
    fn ensure_output_dirs_creates_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        assert!(!ws.sparse_dir().exists());

        ws.ensure_output_dirs().unwrap();
        assert!(ws.sparse_dir().is_dir());
        assert!(ws.dense_dir().is_dir());

        // 已存在时再次调用不报错
        ws.ensure_output_dirs().unwrap();
    }
}
