pub mod agent;
pub mod config;
pub mod dataset;
pub mod llm;

// Re-exports for convenience
pub use agent::core::Agent;
pub use config::Config;
pub use dataset::AcquisitionResult;
