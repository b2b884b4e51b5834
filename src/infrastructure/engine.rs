//! 重建引擎 - 基础设施层
//!
//! 持有外部可执行文件路径，只暴露"运行一个子命令并返回退出码"的能力

use crate::error::EngineError;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// 出错时保留的 stderr 行数
const STDERR_TAIL_LINES: usize = 20;

/// 一次子命令调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub subcommand: &'static str,
    pub args: Vec<OsString>,
}

impl EngineInvocation {
    pub fn new(subcommand: &'static str, args: Vec<OsString>) -> Self {
        Self { subcommand, args }
    }

    /// 查找某个参数后面的值
    pub fn arg_value(&self, flag: &str) -> Option<&OsString> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
    }
}

/// 外部进程的退出结果
///
/// 只关心退出码；stderr 最后几行仅用于错误信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineExit {
    /// 被信号终止时为 None
    pub code: Option<i32>,
    pub stderr_tail: Vec<String>,
}

impl EngineExit {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            stderr_tail: Vec::new(),
        }
    }

    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stderr_tail: vec![message.into()],
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// 进程报告的错误信息
    pub fn message(&self) -> String {
        self.stderr_tail.join("\n")
    }
}

/// 重建引擎
///
/// 职责：
/// - 启动一个子命令并阻塞等待其结束
/// - 不解析输出，只返回退出码
/// - 不认识阶段 / 流水线
pub trait ReconstructionEngine: Send + Sync {
    fn run<'a>(
        &'a self,
        invocation: &'a EngineInvocation,
    ) -> BoxFuture<'a, Result<EngineExit, EngineError>>;
}

/// COLMAP 命令行引擎
pub struct ColmapEngine {
    program: PathBuf,
}

impl ColmapEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn execute(&self, invocation: &EngineInvocation) -> Result<EngineExit, EngineError> {
        let program = self.program.display().to_string();
        info!("▶ 启动 {} {}", program, invocation.subcommand);
        debug!("参数: {:?}", invocation.args);

        let mut cmd = Command::new(&self.program);
        cmd.arg(invocation.subcommand)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            program: program.clone(),
            source,
        })?;

        let subcommand = invocation.subcommand;

        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[{}] {}", subcommand, line);
                }
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[{}] {}", subcommand, line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail)
            })
        });

        let status = child
            .wait()
            .await
            .map_err(|source| EngineError::Wait { program, source })?;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        debug!("{} 退出: {:?}", subcommand, status.code());

        Ok(EngineExit {
            code: status.code(),
            stderr_tail,
        })
    }
}

impl ReconstructionEngine for ColmapEngine {
    fn run<'a>(
        &'a self,
        invocation: &'a EngineInvocation,
    ) -> BoxFuture<'a, Result<EngineExit, EngineError>> {
        Box::pin(self.execute(invocation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_value_finds_flag_operand() {
        let invocation = EngineInvocation::new(
            "mapper",
            vec!["--database_path".into(), "/scan/database.db".into(), "--output_path".into()],
        );
        assert_eq!(
            invocation.arg_value("--database_path"),
            Some(&OsString::from("/scan/database.db"))
        );
        // 最后一个参数没有值
        assert_eq!(invocation.arg_value("--output_path"), None);
        assert_eq!(invocation.arg_value("--image_path"), None);
    }

    #[test]
    fn exit_message_joins_stderr_tail() {
        let exit = EngineExit {
            code: Some(1),
            stderr_tail: vec!["E0101 mapper.cc".into(), "No good initial image pair found.".into()],
        };
        assert!(!exit.success());
        assert_eq!(exit.message(), "E0101 mapper.cc\nNo good initial image pair found.");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let engine = ColmapEngine::new("/definitely/not/a/real/colmap-binary");
        let invocation = EngineInvocation::new("feature_extractor", Vec::new());
        let err = engine.run(&invocation).await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_exit_code_and_stderr_of_real_process() {
        // 用 sh -c 模拟一个写 stderr 后失败的引擎
        let engine = ColmapEngine::new("sh");
        let invocation = EngineInvocation::new(
            "-c",
            vec!["echo progress; echo 'bad things' 1>&2; exit 3".into()],
        );
        let exit = engine.run(&invocation).await.unwrap();
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.stderr_tail, vec!["bad things".to_string()]);
    }
}
