pub mod stage_ctx;
pub mod stage_runner;

pub use stage_ctx::StageCtx;
pub use stage_runner::StageRunner;
