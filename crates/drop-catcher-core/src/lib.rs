pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod mover;
pub mod pipeline;
pub mod stability;
pub mod storage;
pub mod watcher;

pub use analysis::{AnalysisResult, AnalyzerRegistry, FileAnalyzer};
pub use config::AppConfig;
pub use engine::DropCatcher;
pub use error::{Error, ErrorCode};
pub use pipeline::IngestionPipeline;
pub use stability::{Interrupt, StabilityDetector};
pub use storage::{Database, MoveRecord, MoveRecordStore, MoveStatus};
pub use watcher::{DirectoryWatcher, NameFilter, WatchHandle};
