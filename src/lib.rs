// Crossmod: dual-service moderation scoring for forum post datasets
//
// This is the library root. Each module corresponds to a major subsystem
// of the batch processing pipeline.

pub mod config;
pub mod db;
pub mod moderation;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod status;
pub mod store;
