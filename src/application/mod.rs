pub mod engine;

pub use engine::{Engine, EngineOptions, EngineParts};
