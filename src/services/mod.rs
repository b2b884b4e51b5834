pub mod image_validator;
pub mod model_service;
pub mod progress;
pub mod status_writer;

pub use model_service::ModelService;
pub use progress::{ChannelReporter, ProgressReporter, Reporters, StatusKind, StatusUpdate, TracingReporter};
pub use status_writer::StatusWriter;
