pub mod engine;
pub mod geometry;

pub use engine::{ColmapEngine, EngineExit, EngineInvocation, ReconstructionEngine};
pub use geometry::{
    ArtifactKind, CommandViewer, EngineMesher, ModelViewer, PoissonOutput, PoissonRequest,
    SummaryViewer, SurfaceReconstructor,
};
