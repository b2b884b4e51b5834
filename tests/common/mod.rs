//! 集成测试共用的替身：按脚本执行的引擎、记录调用的查看器

#![allow(dead_code)]

use futures::future::BoxFuture;
use scanner_3d::error::{AppResult, EngineError};
use scanner_3d::infrastructure::{
    ArtifactKind, EngineExit, EngineInvocation, EngineMesher, ModelViewer, ReconstructionEngine,
};
use scanner_3d::services::{ChannelReporter, StatusUpdate};
use scanner_3d::{AppComponents, Workspace};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

/// 按子命令名写出对应产物的引擎
///
/// `fail_on` 指定的子命令返回退出码 1，`silent_on` 指定的子命令
/// 返回成功但不生成任何文件。
#[derive(Default)]
pub struct ScriptedEngine {
    pub fail_on: Option<&'static str>,
    pub silent_on: Option<&'static str>,
    pub delay: Duration,
    pub calls: Mutex<Vec<&'static str>>,
}

impl ScriptedEngine {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(subcommand: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(subcommand),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    async fn execute(&self, invocation: &EngineInvocation) -> Result<EngineExit, EngineError> {
        self.calls.lock().unwrap().push(invocation.subcommand);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_on == Some(invocation.subcommand) {
            return Ok(EngineExit::failed(1, format!("{} crashed", invocation.subcommand)));
        }
        if self.silent_on != Some(invocation.subcommand) {
            write_outputs(invocation);
        }
        Ok(EngineExit::ok())
    }
}

impl ReconstructionEngine for ScriptedEngine {
    fn run<'a>(
        &'a self,
        invocation: &'a EngineInvocation,
    ) -> BoxFuture<'a, Result<EngineExit, EngineError>> {
        Box::pin(self.execute(invocation))
    }
}

fn arg_path(invocation: &EngineInvocation, flag: &str) -> PathBuf {
    PathBuf::from(invocation.arg_value(flag).unwrap())
}

fn write_outputs(invocation: &EngineInvocation) {
    match invocation.subcommand {
        "feature_extractor" => {
            fs::write(arg_path(invocation, "--database_path"), b"SQLite format 3\0").unwrap();
        }
        "mapper" => {
            fs::create_dir_all(arg_path(invocation, "--output_path").join("0")).unwrap();
        }
        "image_undistorter" => {
            let dense = arg_path(invocation, "--output_path");
            fs::create_dir_all(dense.join("images")).unwrap();
            fs::create_dir_all(dense.join("stereo")).unwrap();
        }
        "patch_match_stereo" => {
            let dense = arg_path(invocation, "--workspace_path");
            fs::create_dir_all(dense.join("stereo").join("depth_maps")).unwrap();
        }
        "stereo_fusion" => {
            fs::write(arg_path(invocation, "--output_path"), point_cloud_ply()).unwrap();
        }
        "poisson_mesher" => {
            fs::write(arg_path(invocation, "--output_path"), mesh_ply()).unwrap();
        }
        _ => {}
    }
}

pub fn point_cloud_ply() -> &'static str {
    "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n"
}

pub fn mesh_ply() -> &'static str {
    "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\n\
     element face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n"
}

/// 记录显示请求的查看器
#[derive(Default)]
pub struct RecordingViewer {
    shown: Mutex<Vec<(PathBuf, ArtifactKind)>>,
}

impl RecordingViewer {
    pub fn shown(&self) -> Vec<(PathBuf, ArtifactKind)> {
        self.shown.lock().unwrap().clone()
    }
}

impl ModelViewer for RecordingViewer {
    fn show<'a>(&'a self, artifact: &'a Path, kind: ArtifactKind) -> BoxFuture<'a, AppResult<()>> {
        self.shown.lock().unwrap().push((artifact.to_path_buf(), kind));
        Box::pin(async { Ok(()) })
    }
}

/// 在 `dir` 下写入 `count` 张图像
pub fn write_images(dir: &Path, count: usize) {
    fs::create_dir_all(dir).unwrap();
    for i in 1..=count {
        fs::write(dir.join(format!("IMG_{:04}.png", i)), PNG_MAGIC).unwrap();
    }
}

/// 带图像的工作区
pub fn workspace_with_images(base: &Path) -> Workspace {
    let ws = Workspace::new(base);
    write_images(ws.image_dir(), 3);
    ws
}

/// 组装测试用组件
pub fn components(
    engine: Arc<ScriptedEngine>,
    viewer: Arc<RecordingViewer>,
) -> (AppComponents, UnboundedReceiver<StatusUpdate>) {
    let (reporter, rx) = ChannelReporter::new();
    let components = AppComponents {
        engine: engine.clone(),
        reconstructor: Arc::new(EngineMesher::new(engine)),
        viewer,
        reporter: Arc::new(reporter),
    };
    (components, rx)
}

/// 取出通道中已有的全部状态
pub fn drain(rx: &mut UnboundedReceiver<StatusUpdate>) -> Vec<StatusUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}
