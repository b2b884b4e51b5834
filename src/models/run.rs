//! 一次完整流水线运行的状态

use crate::models::stage::{StageDefinition, TOTAL_PROGRESS_TENTHS};
use chrono::{DateTime, Local};
use serde::Serialize;

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// 流水线运行记录
///
/// 每次运行新建一个；结束后只用于查看终止状态。
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    /// 正在执行（或最后尝试）的阶段序号，从 1 开始；未开始时为 0
    pub current_stage_index: usize,
    pub status: RunStatus,
    pub last_error: Option<String>,
    /// 已完成的阶段名，按完成顺序
    pub completed_stages: Vec<&'static str>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    #[serde(rename = "percent_complete", serialize_with = "serialize_percent")]
    progress_tenths: u16,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            current_stage_index: 0,
            status: RunStatus::NotStarted,
            last_error: None,
            completed_stages: Vec::new(),
            started_at: None,
            finished_at: None,
            progress_tenths: 0,
        }
    }

    /// 开始运行，进度归零
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.current_stage_index = 0;
        self.progress_tenths = 0;
        self.last_error = None;
        self.completed_stages.clear();
        self.started_at = Some(Local::now());
        self.finished_at = None;
    }

    pub fn begin_stage(&mut self, index: usize) {
        self.current_stage_index = index;
    }

    /// 阶段成功，进度增加该阶段的权重
    pub fn complete_stage(&mut self, stage: &StageDefinition) {
        self.progress_tenths = (self.progress_tenths + stage.weight_tenths).min(TOTAL_PROGRESS_TENTHS);
        self.completed_stages.push(stage.name);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.last_error = Some(error.into());
        self.finished_at = Some(Local::now());
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.progress_tenths = TOTAL_PROGRESS_TENTHS;
        self.finished_at = Some(Local::now());
    }

    /// 完成百分比（0–100）
    pub fn percent_complete(&self) -> f64 {
        f64::from(self.progress_tenths) / 10.0
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Failed)
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_percent<S: serde::Serializer>(tenths: &u16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(f64::from(*tenths) / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::STAGES;

    #[test]
    fn progress_accumulates_stage_weights() {
        let mut run = PipelineRun::new();
        run.start();
        run.complete_stage(&STAGES[0]);
        run.complete_stage(&STAGES[1]);
        assert_eq!(run.percent_complete(), 33.2);
        assert_eq!(run.completed_stages, vec!["feature_extractor", "exhaustive_matcher"]);
        assert_eq!(run.status, RunStatus::Running);
    }

    #[test]
    fn start_resets_previous_progress() {
        let mut run = PipelineRun::new();
        run.start();
        run.complete_stage(&STAGES[0]);
        run.fail("boom");

        run.start();
        assert_eq!(run.percent_complete(), 0.0);
        assert!(run.last_error.is_none());
        assert!(run.completed_stages.is_empty());
        assert!(!run.is_terminal());
    }

    #[test]
    fn completion_pins_progress_to_one_hundred() {
        let mut run = PipelineRun::new();
        run.start();
        for stage in STAGES.iter() {
            run.complete_stage(stage);
        }
        run.complete();
        assert_eq!(run.percent_complete(), 100.0);
        assert!(run.is_terminal());
    }

    #[test]
    fn serializes_percent_as_number() {
        let mut run = PipelineRun::new();
        run.start();
        run.complete_stage(&STAGES[0]);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["percent_complete"], serde_json::json!(16.6));
        assert_eq!(json["status"], serde_json::json!("Running"));
    }
}
