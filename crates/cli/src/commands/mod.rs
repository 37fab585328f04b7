pub mod analyze;
pub mod gaps;
pub mod ingest;
pub mod init;
pub mod recommend;
pub mod scenarios;
pub mod sources;
pub mod status;
pub mod traces;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::path::{Path, PathBuf};
use trustgate_config::{AppConfig, CorpusBackend};
use trustgate_core::corpus::CorpusStore;
use trustgate_corpus::{InMemoryCorpus, SqliteCorpus};
use trustgate_evidence::{SqliteTraceLog, TraceLog, TraceStore};

/// Settings shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub json: bool,
}

/// The configured corpus and the decision traces kept beside it.
pub struct Stores {
    pub corpus: Box<dyn CorpusStore>,
    pub traces: Box<dyn TraceStore>,
}

impl Context {
    pub fn load(path: Option<&Path>, json: bool) -> trustgate_core::Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
        let config = AppConfig::load_with_env(&config_path).map_err(|e| {
            trustgate_core::Error::Config {
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            config,
            config_path,
            json,
        })
    }

    /// Open the configured corpus backend.
    pub async fn open_store(&self) -> trustgate_core::Result<Box<dyn CorpusStore>> {
        Ok(self.open_stores().await?.corpus)
    }

    /// Open the corpus and its trace store. The sqlite backend keeps both
    /// in one database file.
    pub async fn open_stores(&self) -> trustgate_core::Result<Stores> {
        match self.config.corpus.backend {
            CorpusBackend::Sqlite => {
                let db_path = self.config.corpus.db_path();
                if let Some(parent) = db_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        trustgate_core::Error::Internal(format!(
                            "Failed to create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
                let corpus = SqliteCorpus::new(&self.config.corpus.database_url()).await?;
                let traces = SqliteTraceLog::from_pool(corpus.pool().clone())
                    .await
                    .map_err(|e| trustgate_core::Error::Internal(e.to_string()))?;
                Ok(Stores {
                    corpus: Box::new(corpus),
                    traces: Box::new(traces),
                })
            }
            CorpusBackend::Memory => {
                tracing::warn!("Memory corpus backend: nothing survives this process");
                Ok(Stores {
                    corpus: Box::new(InMemoryCorpus::new()),
                    traces: Box::new(TraceLog::new()),
                })
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let value = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid JSON in {}: {e}", path.display()))?;
    Ok(value)
}
