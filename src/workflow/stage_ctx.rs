//! 阶段执行上下文
//!
//! 封装"我正在执行流水线的第几个阶段"这一信息

use crate::models::{StageDefinition, STAGES};
use std::fmt::Display;

/// 阶段执行上下文
#[derive(Debug, Clone, Copy)]
pub struct StageCtx {
    /// 阶段序号（从1开始）
    pub position: usize,

    /// 阶段总数（单独执行时也按完整流水线计）
    pub total: usize,

    pub stage: &'static StageDefinition,
}

impl StageCtx {
    /// 创建阶段上下文
    pub fn new(stage: &'static StageDefinition) -> Self {
        Self {
            position: stage.kind.position(),
            total: STAGES.len(),
            stage,
        }
    }

    pub fn name(&self) -> &'static str {
        self.stage.name
    }
}

impl Display for StageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[阶段 {}/{} {}]", self.position, self.total, self.stage.name)
    }
}
