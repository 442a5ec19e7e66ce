use std::fs;
use tracing::{debug, info};

use crate::analysis::{self, AnalyzerRegistry};
use crate::config::AppConfig;
use crate::error::Error;
use crate::pipeline::IngestionPipeline;
use crate::stability::{Interrupt, StabilityDetector};
use crate::storage::Database;
use crate::watcher::{DirectoryWatcher, NameFilter, WatchHandle};

/// Wires configuration into a pipeline and a directory watcher.
pub struct DropCatcher {
    config: AppConfig,
    interrupt: Interrupt,
}

impl DropCatcher {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            interrupt: Interrupt::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Raising this aborts the stability wait of the file in flight.
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn open_database(&self) -> Result<Database, Error> {
        if let Some(parent) = self.config.database_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Database::open(&self.config.database_path)?)
    }

    pub fn pipeline(&self) -> Result<IngestionPipeline<Database>, Error> {
        let registry = analysis::default_registry(&self.config.naming)?;
        self.pipeline_with(registry)
    }

    /// Pipeline over the configured database with a caller-supplied registry.
    pub fn pipeline_with(&self, registry: AnalyzerRegistry) -> Result<IngestionPipeline<Database>, Error> {
        fs::create_dir_all(&self.config.output_dir)?;
        let db = self.open_database()?;
        let stability = StabilityDetector::new(self.config.stability.clone())
            .with_interrupt(self.interrupt.clone());
        debug!("Stability settings: {:?}", stability.settings());
        info!(
            "Moving analyzed files from {} to {}",
            self.config.input_dir.display(),
            self.config.output_dir.display()
        );
        Ok(IngestionPipeline::new(db, registry, stability, &self.config.output_dir))
    }

    pub fn subscribe(&self) -> Result<(DirectoryWatcher, WatchHandle), Error> {
        let filter = NameFilter::new(&self.config.ignore_patterns);
        DirectoryWatcher::subscribe(&self.config.input_dir, filter)
    }
}
