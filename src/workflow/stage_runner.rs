//! 单阶段执行流程 - 流程层
//!
//! 定义"一个阶段"的完整处理流程：
//! 前置条件检查 → 绑定参数 → 调用引擎 → 判断退出码
//!
//! 不关心阶段顺序和进度，这些由编排层负责。

use crate::error::StageError;
use crate::infrastructure::{EngineInvocation, ReconstructionEngine};
use crate::models::Workspace;
use crate::utils::logging::truncate_text;
use crate::workflow::stage_ctx::StageCtx;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// 阶段执行器
///
/// 持有引擎引用，可被多次复用。
#[derive(Clone)]
pub struct StageRunner {
    engine: Arc<dyn ReconstructionEngine>,
}

impl StageRunner {
    pub fn new(engine: Arc<dyn ReconstructionEngine>) -> Self {
        Self { engine }
    }

    /// 执行一个阶段
    ///
    /// 前置条件不满足时不会启动外部进程。
    pub async fn run(&self, ctx: &StageCtx, workspace: &Workspace) -> Result<(), StageError> {
        let stage = ctx.stage;

        // ========== 1. 前置条件 ==========
        if let Err(reason) = stage.precondition.check(workspace) {
            warn!("{} ⚠️ 前置条件不满足: {}", ctx, reason);
            return Err(StageError::Precondition {
                stage: stage.name,
                reason,
            });
        }

        // ========== 2. 绑定参数 ==========
        let invocation = EngineInvocation::new(stage.command.subcommand, stage.command.bind(workspace));
        for input in stage.inputs {
            debug!("{} 输入: {}", ctx, input.resolve(workspace).display());
        }
        for output in stage.outputs {
            debug!("{} 输出: {}", ctx, output.resolve(workspace).display());
        }

        // ========== 3. 调用引擎 ==========
        let started = Instant::now();
        let exit = self
            .engine
            .run(&invocation)
            .await
            .map_err(|source| {
                error!("{} ❌ 无法执行: {}", ctx, source);
                StageError::Launch {
                    stage: stage.name,
                    source,
                }
            })?;

        // ========== 4. 退出码 ==========
        if exit.success() {
            info!("{} ✓ 完成 ({:.1}s)", ctx, started.elapsed().as_secs_f64());
            Ok(())
        } else {
            let message = exit.message();
            error!(
                "{} ❌ 退出码 {:?}: {}",
                ctx,
                exit.code,
                truncate_text(&message, 200)
            );
            Err(StageError::NonZeroExit {
                stage: stage.name,
                code: exit.code,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::infrastructure::EngineExit;
    use crate::models::StageKind;
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    struct CannedEngine {
        result: Mutex<Option<Result<EngineExit, EngineError>>>,
        calls: Mutex<usize>,
    }

    impl CannedEngine {
        fn new(result: Result<EngineExit, EngineError>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                calls: Mutex::new(0),
            })
        }
    }

    impl ReconstructionEngine for CannedEngine {
        fn run<'a>(
            &'a self,
            _invocation: &'a EngineInvocation,
        ) -> BoxFuture<'a, Result<EngineExit, EngineError>> {
            *self.calls.lock().unwrap() += 1;
            let result = self.result.lock().unwrap().take().unwrap_or_else(|| Ok(EngineExit::ok()));
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn unmet_precondition_never_invokes_engine() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let engine = CannedEngine::new(Ok(EngineExit::ok()));
        let runner = StageRunner::new(engine.clone());

        let ctx = StageCtx::new(StageKind::ExhaustiveMatching.definition());
        let err = runner.run(&ctx, &ws).await.unwrap_err();

        assert!(matches!(err, StageError::Precondition { stage: "exhaustive_matcher", .. }));
        assert_eq!(*engine.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn non_zero_exit_carries_code_and_message() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        std::fs::write(ws.database_path(), b"").unwrap();
        let engine = CannedEngine::new(Ok(EngineExit::failed(2, "no matches")));
        let runner = StageRunner::new(engine);

        let ctx = StageCtx::new(StageKind::ExhaustiveMatching.definition());
        match runner.run(&ctx, &ws).await.unwrap_err() {
            StageError::NonZeroExit { stage, code, message } => {
                assert_eq!(stage, "exhaustive_matcher");
                assert_eq!(code, Some(2));
                assert_eq!(message, "no matches");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn spawn_failure_becomes_launch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        std::fs::write(ws.database_path(), b"").unwrap();
        let engine = CannedEngine::new(Err(EngineError::Spawn {
            program: "colmap".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }));
        let runner = StageRunner::new(engine);

        let ctx = StageCtx::new(StageKind::ExhaustiveMatching.definition());
        let err = runner.run(&ctx, &ws).await.unwrap_err();
        assert!(matches!(err, StageError::Launch { .. }));
    }
}
