//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责流程调度和后台执行，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、动作分发）
//! - 持有工作区和当前图像集
//! - 统一的错误边界
//!
//! ### `pipeline` - 流水线编排器
//! - 按顺序执行六个阶段
//! - 维护 PipelineRun（阶段序号、进度、错误）
//! - 上报进度
//!
//! ### `controller` - 执行控制器
//! - 在后台任务中运行工作单元
//! - 保证同一时刻只有一个工作单元
//! - 捕获 panic 并转为失败状态
//!
//! ## 层次关系
//!
//! ```text
//! app (处理 Action)
//!     ↓
//! controller (后台执行，互斥)
//!     ↓
//! pipeline (处理 6 个阶段)
//!     ↓
//! workflow::StageRunner (处理单个阶段)
//!     ↓
//! services (能力层：校验 / 进度 / 模型)
//!     ↓
//! infrastructure (基础设施：引擎 / 几何 / 查看器)
//! ```

pub mod app;
pub mod controller;
pub mod pipeline;

// 重新导出主要类型
pub use app::{Action, ActionOutcome, App, AppComponents};
pub use controller::ExecutionController;
pub use pipeline::PipelineOrchestrator;
