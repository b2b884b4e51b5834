use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scanner_3d::error::ConfigError;
use scanner_3d::utils::logging;
use scanner_3d::{Action, App, Config, StageKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// 照片三维重建
#[derive(Parser, Debug)]
#[command(name = "scanner-3d", version, about = "从照片重建三维模型", long_about = None)]
struct Args {
    /// TOML 配置文件（不指定时从环境变量读取）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 工作目录
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// 重建引擎可执行文件
    #[arg(long)]
    engine: Option<String>,

    /// 外部模型查看器
    #[arg(long)]
    viewer: Option<String>,

    /// 输出详细日志
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 校验图像目录
    LoadImages { dir: PathBuf },
    /// 运行完整流水线
    Run {
        /// 图像目录（默认 <base_dir>/images）
        #[arg(long)]
        images: Option<PathBuf>,
    },
    /// 单独运行一个阶段，例如 mapper
    Stage {
        name: String,
        #[arg(long)]
        images: Option<PathBuf>,
    },
    /// 显示点云模型
    ShowModel { path: Option<PathBuf> },
    /// 由点云生成网格
    Mesh,
    /// 选择图像后自动完成全部步骤
    Auto { dir: PathBuf },
}

impl Command {
    fn into_action(self, config: &mut Config) -> Result<Action> {
        let action = match self {
            Command::LoadImages { dir } => Action::LoadImages(dir),
            Command::Run { images } => {
                config.image_dir = images.or(config.image_dir.take());
                Action::RunPipeline
            }
            Command::Stage { name, images } => {
                config.image_dir = images.or(config.image_dir.take());
                let kind: StageKind = name
                    .parse()
                    .map_err(|name| ConfigError::UnknownStage { name })?;
                Action::RunStage(kind)
            }
            Command::ShowModel { path } => Action::LoadAndShowModel(path),
            Command::Mesh => Action::GenerateMesh,
            Command::Auto { dir } => Action::AutoRun(dir),
        };
        Ok(action)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // 加载配置
    let mut config = match &args.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("无法加载配置文件 {}", path.display()))?,
        None => Config::from_env(),
    };
    if let Some(base_dir) = args.base_dir {
        config.base_dir = base_dir;
    }
    if let Some(engine) = args.engine {
        config.engine_path = engine;
    }
    if let Some(viewer) = args.viewer {
        config.viewer_command = Some(viewer);
    }
    config.verbose_logging |= args.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    let action = args.command.into_action(&mut config)?;

    // 初始化并运行应用
    let mut app = App::initialize(config).context("初始化失败")?;
    let outcome = app.perform(action).await;

    if outcome.ok {
        info!("✅ {}: {}", outcome.action, outcome.message);
        Ok(ExitCode::SUCCESS)
    } else {
        error!("❌ {}: {}", outcome.action, outcome.message);
        Ok(ExitCode::FAILURE)
    }
}
