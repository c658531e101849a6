pub mod engine;
pub mod lock;
pub mod matcher;
pub mod normalize;
pub mod projection;
pub mod settlement;
pub mod stats;

pub use engine::{EngineSettings, ReconcileEngine};
