//! 重建阶段目录
//!
//! 六个重建阶段按固定顺序排列，每个阶段由一个外部命令模板、
//! 声明的输入 / 输出、前置条件和进度权重组成。另有两个
//! 不属于流水线的后处理动作（查看点云、生成网格）。
//!
//! 目录在编译期确定，运行期间不会修改。

use crate::models::workspace::Workspace;
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// 进度总量（以 0.1% 为单位）
pub const TOTAL_PROGRESS_TENTHS: u16 = 1000;

/// 重建阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    FeatureExtraction,
    ExhaustiveMatching,
    SparseMapping,
    ImageUndistortion,
    DenseStereo,
    StereoFusion,
}

impl StageKind {
    /// 阶段定义
    pub fn definition(self) -> &'static StageDefinition {
        &STAGES[self.position() - 1]
    }

    /// 在流水线中的序号（从 1 开始）
    pub fn position(self) -> usize {
        match self {
            StageKind::FeatureExtraction => 1,
            StageKind::ExhaustiveMatching => 2,
            StageKind::SparseMapping => 3,
            StageKind::ImageUndistortion => 4,
            StageKind::DenseStereo => 5,
            StageKind::StereoFusion => 6,
        }
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StageKind {
    type Err = String;

    /// 接受引擎子命令名（`mapper`）或其连字符写法（`image-undistorter`）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        STAGES
            .iter()
            .find(|stage| stage.name == normalized)
            .map(|stage| stage.kind)
            .ok_or_else(|| s.to_string())
    }
}

/// 可以绑定到命令参数上的工作区路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePath {
    ImageDir,
    Database,
    SparseDir,
    SparseModel,
    DenseDir,
    Model,
    Mesh,
}

impl WorkspacePath {
    pub fn resolve(self, workspace: &Workspace) -> PathBuf {
        match self {
            WorkspacePath::ImageDir => workspace.image_dir().to_path_buf(),
            WorkspacePath::Database => workspace.database_path().to_path_buf(),
            WorkspacePath::SparseDir => workspace.sparse_dir().to_path_buf(),
            WorkspacePath::SparseModel => workspace.sparse_model_dir(),
            WorkspacePath::DenseDir => workspace.dense_dir().to_path_buf(),
            WorkspacePath::Model => workspace.model_path().to_path_buf(),
            WorkspacePath::Mesh => workspace.mesh_path().to_path_buf(),
        }
    }
}

/// 命令参数：固定字面量，或运行时绑定的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<S: 'static> {
    Lit(&'static str),
    Slot(S),
}

/// 外部命令模板：子命令 + 有序参数列表
#[derive(Debug, Clone, Copy)]
pub struct CommandTemplate<S: 'static> {
    pub subcommand: &'static str,
    pub args: &'static [Arg<S>],
}

impl<S: 'static> CommandTemplate<S> {
    /// 按顺序展开参数，槽位交给 `resolve` 解析
    pub fn bind_with(&self, mut resolve: impl FnMut(&S) -> OsString) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg {
                Arg::Lit(value) => OsString::from(*value),
                Arg::Slot(slot) => resolve(slot),
            })
            .collect()
    }
}

impl CommandTemplate<WorkspacePath> {
    pub fn bind(&self, workspace: &Workspace) -> Vec<OsString> {
        self.bind_with(|path| path.resolve(workspace).into_os_string())
    }
}

/// 阶段启动前必须满足的磁盘状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// 图像目录存在且非空
    ImagesPresent,
    /// 特征数据库已生成
    DatabasePresent,
    /// `sparse/0` 下至少有一个重建结果
    SparseModelPresent,
    /// 去畸变后的稠密工作区已生成
    UndistortedWorkspace,
    /// 稠密立体匹配的深度图已生成
    DepthMapsPresent,
}

impl Precondition {
    /// 检查前置条件，不满足时返回原因
    pub fn check(self, workspace: &Workspace) -> Result<(), String> {
        match self {
            Precondition::ImagesPresent => {
                let dir = workspace.image_dir();
                let mut entries = fs::read_dir(dir)
                    .map_err(|e| format!("无法读取图像目录 {}: {}", dir.display(), e))?;
                if entries.next().is_none() {
                    return Err(format!("图像目录为空: {}", dir.display()));
                }
                Ok(())
            }
            Precondition::DatabasePresent => {
                let db = workspace.database_path();
                if db.is_file() {
                    Ok(())
                } else {
                    Err(format!("特征数据库不存在: {}", db.display()))
                }
            }
            Precondition::SparseModelPresent => {
                let model = workspace.sparse_model_dir();
                if model.is_dir() {
                    Ok(())
                } else {
                    Err(format!("没有找到稀疏重建结果: {}", model.display()))
                }
            }
            // COLMAP 稠密工作区布局：image_undistorter 生成 stereo/，
            // patch_match_stereo 把深度图写到 stereo/depth_maps/
            Precondition::UndistortedWorkspace => {
                let stereo = workspace.dense_dir().join("stereo");
                if stereo.is_dir() {
                    Ok(())
                } else {
                    Err(format!("稠密工作区尚未去畸变: {}", stereo.display()))
                }
            }
            Precondition::DepthMapsPresent => {
                let depth_maps = workspace.dense_dir().join("stereo").join("depth_maps");
                if depth_maps.is_dir() {
                    Ok(())
                } else {
                    Err(format!("深度图不存在: {}", depth_maps.display()))
                }
            }
        }
    }
}

/// 阶段定义
#[derive(Debug)]
pub struct StageDefinition {
    pub kind: StageKind,
    /// 阶段名，同时也是引擎子命令名
    pub name: &'static str,
    /// 开始时显示的状态信息
    pub status_message: &'static str,
    pub command: CommandTemplate<WorkspacePath>,
    pub inputs: &'static [WorkspacePath],
    pub outputs: &'static [WorkspacePath],
    pub precondition: Precondition,
    /// 进度权重（0.1% 为单位），六个阶段合计 1000
    pub weight_tenths: u16,
}

impl StageDefinition {
    /// 进度权重（百分比）
    pub fn progress_weight(&self) -> f64 {
        f64::from(self.weight_tenths) / 10.0
    }
}

use Arg::{Lit, Slot};
use WorkspacePath::*;

/// 六个重建阶段，按执行顺序排列
pub static STAGES: [StageDefinition; 6] = [
    StageDefinition {
        kind: StageKind::FeatureExtraction,
        name: "feature_extractor",
        status_message: "正在提取特征...",
        command: CommandTemplate {
            subcommand: "feature_extractor",
            args: &[
                Lit("--database_path"),
                Slot(Database),
                Lit("--image_path"),
                Slot(ImageDir),
            ],
        },
        inputs: &[ImageDir],
        outputs: &[Database],
        precondition: Precondition::ImagesPresent,
        weight_tenths: 166,
    },
    StageDefinition {
        kind: StageKind::ExhaustiveMatching,
        name: "exhaustive_matcher",
        status_message: "正在进行穷举匹配...",
        command: CommandTemplate {
            subcommand: "exhaustive_matcher",
            args: &[Lit("--database_path"), Slot(Database)],
        },
        inputs: &[Database],
        outputs: &[Database],
        precondition: Precondition::DatabasePresent,
        weight_tenths: 166,
    },
    StageDefinition {
        kind: StageKind::SparseMapping,
        name: "mapper",
        status_message: "正在构建稀疏地图...",
        command: CommandTemplate {
            subcommand: "mapper",
            args: &[
                Lit("--database_path"),
                Slot(Database),
                Lit("--image_path"),
                Slot(ImageDir),
                Lit("--output_path"),
                Slot(SparseDir),
            ],
        },
        inputs: &[Database, ImageDir],
        outputs: &[SparseDir],
        precondition: Precondition::DatabasePresent,
        weight_tenths: 166,
    },
    StageDefinition {
        kind: StageKind::ImageUndistortion,
        name: "image_undistorter",
        status_message: "正在对图像去畸变...",
        command: CommandTemplate {
            subcommand: "image_undistorter",
            args: &[
                Lit("--image_path"),
                Slot(ImageDir),
                Lit("--input_path"),
                Slot(SparseModel),
                Lit("--output_path"),
                Slot(DenseDir),
                Lit("--output_type"),
                Lit("COLMAP"),
            ],
        },
        inputs: &[ImageDir, SparseModel],
        outputs: &[DenseDir],
        precondition: Precondition::SparseModelPresent,
        weight_tenths: 166,
    },
    StageDefinition {
        kind: StageKind::DenseStereo,
        name: "patch_match_stereo",
        status_message: "正在计算稠密立体匹配...",
        command: CommandTemplate {
            subcommand: "patch_match_stereo",
            args: &[
                Lit("--workspace_path"),
                Slot(DenseDir),
                Lit("--workspace_format"),
                Lit("COLMAP"),
                Lit("--PatchMatchStereo.geom_consistency"),
                Lit("true"),
            ],
        },
        inputs: &[DenseDir],
        outputs: &[DenseDir],
        precondition: Precondition::UndistortedWorkspace,
        weight_tenths: 166,
    },
    StageDefinition {
        kind: StageKind::StereoFusion,
        name: "stereo_fusion",
        status_message: "正在融合结果...",
        command: CommandTemplate {
            subcommand: "stereo_fusion",
            args: &[
                Lit("--workspace_path"),
                Slot(DenseDir),
                Lit("--workspace_format"),
                Lit("COLMAP"),
                Lit("--input_type"),
                Lit("geometric"),
                Lit("--output_path"),
                Slot(Model),
            ],
        },
        inputs: &[DenseDir],
        outputs: &[Model],
        precondition: Precondition::DepthMapsPresent,
        weight_tenths: 170,
    },
];

/// 流水线之外的后处理动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    /// 查看点云模型
    VisualizePointCloud,
    /// 生成网格并查看
    GenerateMesh,
}

impl PostAction {
    pub fn name(self) -> &'static str {
        match self {
            PostAction::VisualizePointCloud => "show_model",
            PostAction::GenerateMesh => "generate_mesh",
        }
    }

    pub fn status_message(self) -> &'static str {
        match self {
            PostAction::VisualizePointCloud => "正在显示三维模型",
            PostAction::GenerateMesh => "正在生成多边形网格...",
        }
    }
}

/// Poisson 网格命令的参数槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshSlot {
    PointCloud,
    Mesh,
    Depth,
}

/// 引擎的 Poisson 表面重建命令
pub static MESH_COMMAND: CommandTemplate<MeshSlot> = CommandTemplate {
    subcommand: "poisson_mesher",
    args: &[
        Lit("--input_path"),
        Slot(MeshSlot::PointCloud),
        Lit("--output_path"),
        Slot(MeshSlot::Mesh),
        Lit("--PoissonMeshing.depth"),
        Slot(MeshSlot::Depth),
    ],
};
