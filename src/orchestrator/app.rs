//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、引擎、查看器、状态接收端
//! 2. **动作分发**：把用户动作（加载图像、运行流水线……）交给对应的处理函数
//! 3. **后台执行**：所有耗时工作经由 `ExecutionController` 在后台任务中运行
//! 4. **错误边界**：处理函数的错误在这里统一转为失败状态，不会让程序崩溃

use crate::config::Config;
use crate::error::{AppError, AppResult, ExecutionError};
use crate::infrastructure::{
    ColmapEngine, CommandViewer, EngineMesher, ModelViewer, ReconstructionEngine, SummaryViewer,
    SurfaceReconstructor,
};
use crate::models::{ImageSet, PipelineRun, PostAction, RunStatus, StageKind, Workspace};
use crate::orchestrator::controller::ExecutionController;
use crate::orchestrator::pipeline::PipelineOrchestrator;
use crate::services::progress::{ProgressReporter, Reporters, StatusUpdate, TracingReporter};
use crate::services::{image_validator, ModelService, StatusWriter};
use crate::utils::logging::{init_log_file, log_run_summary, log_startup};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// 用户可以触发的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// 校验并选择图像目录
    LoadImages(PathBuf),
    /// 运行完整流水线
    RunPipeline,
    /// 单独运行一个阶段
    RunStage(StageKind),
    /// 显示点云模型（可指定其他模型文件）
    LoadAndShowModel(Option<PathBuf>),
    /// 生成网格并显示
    GenerateMesh,
    /// 选择图像 → 流水线 → 显示模型 → 生成网格
    AutoRun(PathBuf),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::LoadImages(_) => "load_images",
            Action::RunPipeline => "run_pipeline",
            Action::RunStage(_) => "run_stage",
            Action::LoadAndShowModel(_) => PostAction::VisualizePointCloud.name(),
            Action::GenerateMesh => PostAction::GenerateMesh.name(),
            Action::AutoRun(_) => "auto_run",
        }
    }
}

/// 动作执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: &'static str,
    pub ok: bool,
    pub message: String,
}

/// 可替换的外部协作方
///
/// 正式运行由 `App::initialize` 按配置创建；测试中可以注入替身。
pub struct AppComponents {
    pub engine: Arc<dyn ReconstructionEngine>,
    pub reconstructor: Arc<dyn SurfaceReconstructor>,
    pub viewer: Arc<dyn ModelViewer>,
    pub reporter: Arc<dyn ProgressReporter>,
}

impl AppComponents {
    /// 按配置创建正式组件
    pub fn from_config(config: &Config) -> Self {
        let engine: Arc<dyn ReconstructionEngine> = Arc::new(ColmapEngine::new(&config.engine_path));
        let reconstructor: Arc<dyn SurfaceReconstructor> = Arc::new(EngineMesher::new(engine.clone()));
        let viewer: Arc<dyn ModelViewer> = match &config.viewer_command {
            Some(program) => Arc::new(CommandViewer::new(program.clone())),
            None => Arc::new(SummaryViewer),
        };
        let reporter: Arc<dyn ProgressReporter> = Arc::new(Reporters::new(vec![
            Arc::new(TracingReporter),
            Arc::new(StatusWriter::with_path(config.log_file_path())),
        ]));

        Self {
            engine,
            reconstructor,
            viewer,
            reporter,
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    workspace: Workspace,
    image_set: Option<ImageSet>,
    controller: ExecutionController,
    orchestrator: Arc<PipelineOrchestrator>,
    models: Arc<ModelService>,
    reporter: Arc<dyn ProgressReporter>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        // 初始化日志文件
        init_log_file(&config.log_file_path())?;

        log_startup(&config);

        let workspace = Workspace::from_config(&config);
        workspace.ensure_output_dirs()?;

        let components = AppComponents::from_config(&config);
        Ok(Self::with_components(config, workspace, components))
    }

    /// 使用指定组件创建应用，不写日志文件
    pub fn with_components(config: Config, workspace: Workspace, components: AppComponents) -> Self {
        let AppComponents {
            engine,
            reconstructor,
            viewer,
            reporter,
        } = components;

        Self {
            config,
            workspace,
            image_set: None,
            controller: ExecutionController::new(reporter.clone()),
            orchestrator: Arc::new(PipelineOrchestrator::new(engine, reporter.clone())),
            models: Arc::new(ModelService::new(reconstructor, viewer, reporter.clone())),
            reporter,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn image_set(&self) -> Option<&ImageSet> {
        self.image_set.as_ref()
    }

    /// 执行一个动作
    ///
    /// 不返回错误：失败会上报为失败状态并体现在 `ActionOutcome` 中。
    pub async fn perform(&mut self, action: Action) -> ActionOutcome {
        let name = action.name();
        info!("▶ 动作: {}", name);

        let result = match action {
            Action::LoadImages(dir) => self
                .load_images(&dir)
                .map(|images| format!("已加载 {} 张图像: {}", images.len(), images.directory().display())),
            Action::RunPipeline => {
                let run = self.run_pipeline().await;
                // 流水线失败已由编排器上报，这里不再重复
                return ActionOutcome {
                    action: name,
                    ok: run.status == RunStatus::Completed,
                    message: run_message(&run),
                };
            }
            Action::RunStage(kind) => self
                .run_stage(kind)
                .await
                .map(|()| format!("{} 完成", kind)),
            Action::LoadAndShowModel(path) => self
                .load_and_show_model(path)
                .await
                .map(|()| format!("已显示模型: {}", self.workspace.model_path().display())),
            Action::GenerateMesh => self
                .generate_mesh()
                .await
                .map(|mesh| format!("网格已生成: {}", mesh.display())),
            Action::AutoRun(dir) => self
                .auto_run(&dir)
                .await
                .map(|mesh| format!("自动流程完成: {}", mesh.display())),
        };

        match result {
            Ok(message) => ActionOutcome {
                action: name,
                ok: true,
                message,
            },
            Err(e) => {
                self.report_error(&e);
                ActionOutcome {
                    action: name,
                    ok: false,
                    message: e.to_string(),
                }
            }
        }
    }

    // ========== 动作处理函数 ==========

    /// 校验图像目录，成功后替换工作区的图像目录
    ///
    /// 校验失败时工作区保持不变。
    pub fn load_images(&mut self, dir: &Path) -> AppResult<&ImageSet> {
        self.reporter
            .report(StatusUpdate::info(format!("正在校验图像目录: {}", dir.display())));

        let images = image_validator::validate(dir)?;
        self.workspace.set_image_dir(&images);
        self.reporter.report(StatusUpdate::success(
            format!("图像加载成功 ({} 张)", images.len()),
            None,
        ));

        Ok(self.image_set.insert(images))
    }

    /// 运行完整流水线
    pub async fn run_pipeline(&self) -> PipelineRun {
        let orchestrator = self.orchestrator.clone();
        let workspace = self.workspace.clone();

        let run = match self
            .controller
            .run_exclusive("run_pipeline", async move { orchestrator.run(&workspace).await })
            .await
        {
            Ok(run) => run,
            Err(e) => {
                // 后台任务异常终止，控制器已上报
                let mut run = PipelineRun::new();
                run.start();
                run.fail(e.to_string());
                run
            }
        };

        log_run_summary(&run, &self.config.log_file_path());
        if self.config.write_run_report {
            if let Err(e) = self.write_run_report(&run) {
                warn!("⚠️ 写入运行报告失败: {}", e);
            }
        }
        run
    }

    /// 单独运行一个阶段
    pub async fn run_stage(&self, kind: StageKind) -> AppResult<()> {
        let orchestrator = self.orchestrator.clone();
        let workspace = self.workspace.clone();

        self.controller
            .run_exclusive(kind.name(), async move { orchestrator.run_stage(kind, &workspace).await })
            .await?
    }

    /// 显示点云模型
    ///
    /// 指定了路径时先检查文件存在，再把它设为工作区的模型文件；
    /// 文件不存在时保留之前的选择。
    pub async fn load_and_show_model(&mut self, path: Option<PathBuf>) -> AppResult<()> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(AppError::model_not_found(&path));
            }
            self.workspace.set_model_path(path);
        }

        let models = self.models.clone();
        let model_path = self.workspace.model_path().to_path_buf();
        self.controller
            .run_exclusive(PostAction::VisualizePointCloud.name(), async move {
                models.load_model(&model_path).await
            })
            .await?
    }

    /// 生成网格并显示，返回网格路径
    pub async fn generate_mesh(&self) -> AppResult<PathBuf> {
        let models = self.models.clone();
        let workspace = self.workspace.clone();
        self.controller
            .run_exclusive(PostAction::GenerateMesh.name(), async move {
                models.generate_mesh(&workspace).await
            })
            .await?
    }

    /// 自动流程：选择图像 → 流水线 → 显示模型 → 生成网格
    ///
    /// 图像校验失败时什么都不执行。之后的三步总是依次尝试，
    /// 每一步的失败各自上报，返回值携带第一个失败。
    pub async fn auto_run(&mut self, dir: &Path) -> AppResult<PathBuf> {
        self.load_images(dir)?;

        let mut first_failure: Option<AppError> = None;

        let run = self.run_pipeline().await;
        if run.status != RunStatus::Completed {
            // 流水线失败已由编排器上报
            first_failure = Some(
                ExecutionError::Aborted {
                    unit: "run_pipeline".to_string(),
                    reason: run_message(&run),
                }
                .into(),
            );
        }

        if let Err(e) = self.load_and_show_model(None).await {
            self.keep_first_failure(&mut first_failure, e);
        }

        let mesh = self.generate_mesh().await;
        match (first_failure, mesh) {
            (None, mesh) => mesh,
            (Some(first), Ok(_)) => Err(first),
            (Some(first), Err(later)) => {
                self.report_error(&later);
                Err(first)
            }
        }
    }

    // ========== 辅助函数 ==========

    fn write_run_report(&self, run: &PipelineRun) -> AppResult<()> {
        let path = self.workspace.run_report_path();
        let json = serde_json::to_string_pretty(run).map_err(|e| {
            AppError::file_write_failed(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        fs::write(&path, json).map_err(|e| AppError::file_write_failed(&path, e))?;
        info!("📝 运行报告已写入: {}", path.display());
        Ok(())
    }

    /// 第一个失败留给调用方，之后的失败立即上报
    fn keep_first_failure(&self, first: &mut Option<AppError>, e: AppError) {
        if first.is_some() {
            self.report_error(&e);
        } else {
            *first = Some(e);
        }
    }

    fn report_error(&self, e: &AppError) {
        // 后台任务异常由控制器上报，流水线失败由编排器上报
        if let AppError::Execution(
            ExecutionError::Panicked { .. }
            | ExecutionError::Cancelled { .. }
            | ExecutionError::Aborted { .. },
        ) = e
        {
            return;
        }
        warn!("⚠️ {}", e);
        self.reporter
            .report(StatusUpdate::failure(format!("错误: {}", e), None));
    }
}

fn run_message(run: &PipelineRun) -> String {
    match (&run.status, &run.last_error) {
        (RunStatus::Completed, _) => "三维重建完成".to_string(),
        (_, Some(err)) => err.clone(),
        (status, None) => format!("流水线未完成: {:?}", status),
    }
}
