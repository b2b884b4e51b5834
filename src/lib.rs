//! # Scanner 3D
//!
//! 从一组照片重建三维模型的 Rust 应用程序：驱动外部重建引擎（COLMAP）
//! 依次完成特征提取、匹配、稀疏重建、去畸变、稠密匹配和融合，
//! 然后显示点云并生成网格。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部进程，只暴露能力
//! - `ColmapEngine` - 运行一个引擎子命令，返回退出码
//! - `EngineMesher` / `CommandViewer` / `SummaryViewer` - 表面重建与模型显示
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `image_validator` - 图像目录校验能力
//! - `ProgressReporter` - 状态 / 进度上报能力
//! - `StatusWriter` - 写状态日志能力
//! - `ModelService` - 显示模型、生成网格能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个阶段"的完整处理流程
//! - `StageCtx` - 上下文封装（阶段序号 + 阶段定义）
//! - `StageRunner` - 流程编排（前置条件 → 绑定参数 → 引擎 → 退出码）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 流水线编排器，按顺序执行六个阶段
//! - `orchestrator/controller` - 执行控制器，后台运行且互斥
//! - `orchestrator/app` - 应用入口，分发用户动作
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ColmapEngine, ReconstructionEngine};
pub use models::{PipelineRun, RunStatus, StageKind, Workspace, STAGES};
pub use orchestrator::{Action, ActionOutcome, App, AppComponents, ExecutionController, PipelineOrchestrator};
pub use services::{ProgressReporter, StatusUpdate};
pub use workflow::{StageCtx, StageRunner};
