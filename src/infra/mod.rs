pub mod config;
pub mod engine_adapter;
pub mod http;

pub use engine_adapter::{Engine, EngineAdapter};
