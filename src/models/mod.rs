pub mod image_set;
pub mod ply;
pub mod run;
pub mod stage;
pub mod workspace;

pub use image_set::ImageSet;
pub use ply::{PlyFormat, PlyHeader};
pub use run::{PipelineRun, RunStatus};
pub use stage::{PostAction, StageDefinition, StageKind, STAGES};
pub use workspace::Workspace;
