//! 流水线编排器 - 编排层
//!
//! ## 职责
//!
//! 按固定顺序执行六个重建阶段，维护运行状态并上报进度。
//!
//! ## 核心规则
//!
//! 1. **严格顺序**：阶段 k 成功后才开始阶段 k+1
//! 2. **失败即停**：任一阶段失败，运行立即结束，之后的阶段不执行
//! 3. **进度单调**：每个阶段成功后累加其权重，完成时为 100%
//! 4. **不清理产物**：失败前生成的文件保留在工作区

use crate::error::AppResult;
use crate::infrastructure::ReconstructionEngine;
use crate::models::{PipelineRun, StageKind, Workspace, STAGES};
use crate::services::progress::{ProgressReporter, StatusUpdate};
use crate::utils::logging::{log_stage_start, truncate_text};
use crate::workflow::{StageCtx, StageRunner};
use std::sync::Arc;
use tracing::{error, info};

/// 失败信息在状态栏中的最大长度
const STATUS_ERROR_MAX_CHARS: usize = 300;

/// 流水线编排器
pub struct PipelineOrchestrator {
    runner: StageRunner,
    reporter: Arc<dyn ProgressReporter>,
}

impl PipelineOrchestrator {
    pub fn new(engine: Arc<dyn ReconstructionEngine>, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            runner: StageRunner::new(engine),
            reporter,
        }
    }

    /// 执行完整流水线
    ///
    /// 总是返回终止状态的 `PipelineRun`（Completed 或 Failed），错误记录在 `last_error` 中。
    pub async fn run(&self, workspace: &Workspace) -> PipelineRun {
        let mut run = PipelineRun::new();
        run.start();
        info!("🚀 开始三维重建: {}", workspace.base_dir().display());
        self.reporter
            .report(StatusUpdate::progress("开始三维重建", run.percent_complete()));

        if let Err(e) = workspace.ensure_output_dirs() {
            self.abort(&mut run, e.to_string());
            return run;
        }

        for stage in STAGES.iter() {
            let ctx = StageCtx::new(stage);
            run.begin_stage(ctx.position);
            log_stage_start(ctx.position, ctx.total, ctx.name());
            self.reporter
                .report(StatusUpdate::progress(stage.status_message, run.percent_complete()));

            match self.runner.run(&ctx, workspace).await {
                Ok(()) => run.complete_stage(stage),
                Err(e) => {
                    self.abort(&mut run, e.to_string());
                    return run;
                }
            }
        }

        run.complete();
        info!("🎉 三维重建完成: {}", workspace.model_path().display());
        self.reporter.report(StatusUpdate::success(
            "三维重建完成",
            Some(run.percent_complete()),
        ));
        run
    }

    /// 单独执行一个阶段（调试 / 重跑用）
    ///
    /// 前置条件按磁盘状态检查，与完整流水线中一致。
    pub async fn run_stage(&self, kind: StageKind, workspace: &Workspace) -> AppResult<()> {
        workspace.ensure_output_dirs()?;

        let ctx = StageCtx::new(kind.definition());
        log_stage_start(ctx.position, ctx.total, ctx.name());
        self.reporter.report(StatusUpdate::info(ctx.stage.status_message));

        self.runner.run(&ctx, workspace).await?;

        self.reporter
            .report(StatusUpdate::success(format!("{} 完成", ctx.name()), None));
        Ok(())
    }

    fn abort(&self, run: &mut PipelineRun, message: String) {
        error!("❌ 流水线在第 {} 个阶段中止: {}", run.current_stage_index, message);
        self.reporter.report(StatusUpdate::failure(
            format!("错误: {}", truncate_text(&message, STATUS_ERROR_MAX_CHARS)),
            Some(run.percent_complete()),
        ));
        run.fail(message);
    }
}
