//! Process-scoped application context.
//!
//! Built once at startup and shared by the HTTP server and the CLI. Holds the
//! configuration and the orchestrator, which in turn owns the registry, the
//! reasoner and the artifact log.

use std::sync::Arc;

use crate::artifacts::{ArtifactLog, SqliteArtifactStore};
use crate::config::GatewayConfig;
use crate::dispatch::Orchestrator;
use crate::error::StorageResult;
use crate::normalizer::Normalizer;
use crate::reasoner::{self, Reasoner};
use crate::registry::AnalyzerRegistry;

#[derive(Clone)]
pub struct AppContext {
    pub config: GatewayConfig,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    /// Open the artifact store, register the built-in analyzers and pick the
    /// reasoner backend.
    pub fn from_config(config: GatewayConfig) -> StorageResult<Self> {
        let store = SqliteArtifactStore::open(&config.db_path)?;
        let artifacts = artifact_log(&config, ArtifactLog::new(Arc::new(store)));
        let reasoner = reasoner::from_config(&config.reasoner);
        Ok(Self::assemble(config, reasoner, artifacts))
    }

    /// Same wiring with an explicit reasoner and log.
    pub fn with_parts(
        config: GatewayConfig,
        reasoner: Arc<dyn Reasoner>,
        artifacts: ArtifactLog,
    ) -> Self {
        let artifacts = artifact_log(&config, artifacts);
        Self::assemble(config, reasoner, artifacts)
    }

    fn assemble(config: GatewayConfig, reasoner: Arc<dyn Reasoner>, artifacts: ArtifactLog) -> Self {
        let registry = AnalyzerRegistry::builtin().with_fallback_descriptors(config.fallback_domains);
        let orchestrator = Orchestrator::new(
            Arc::new(registry),
            reasoner,
            artifacts,
            Normalizer::new(&config.limits),
        );

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }
}

fn artifact_log(config: &GatewayConfig, log: ArtifactLog) -> ArtifactLog {
    log.with_strict_listing(config.strict_listing)
        .with_default_limit(config.limits.list_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoner::UnavailableReasoner;

    #[test]
    fn test_from_config_opens_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig::default().with_db_path(dir.path().join("a.db"));

        let context = AppContext::from_config(config).unwrap();
        assert!(!context.orchestrator.registry().is_empty());
        assert!(!context.orchestrator.reasoner().is_available());
        assert!(dir.path().join("a.db").exists());
    }

    #[test]
    fn test_list_limit_applied() {
        let mut config = GatewayConfig::default();
        config.limits.list_limit = 7;

        let context = AppContext::with_parts(
            config,
            Arc::new(UnavailableReasoner::new("test")),
            ArtifactLog::in_memory(),
        );
        assert_eq!(context.orchestrator.artifacts().default_limit(), 7);
    }
}
