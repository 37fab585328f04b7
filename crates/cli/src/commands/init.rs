//! `trustgate init`: first-time setup.

use super::{Context, print_json};
use serde_json::json;
use trustgate_config::{AppConfig, CorpusBackend};

pub async fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = &ctx.config_path;

    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let created = !config_path.exists();
    if created {
        std::fs::write(config_path, AppConfig::default_toml()?)?;
    }

    // Opening the store runs the migrations
    let store = ctx.open_store().await?;
    let persistent = ctx.config.corpus.backend == CorpusBackend::Sqlite;

    if ctx.json {
        return print_json(&json!({
            "config_path": config_path,
            "config_created": created,
            "backend": store.name(),
            "database": persistent.then(|| ctx.config.corpus.db_path()),
        }));
    }

    println!("trustgate setup");
    println!("===============\n");
    if created {
        println!("  Wrote default config: {}", config_path.display());
    } else {
        println!("  Config exists: {}", config_path.display());
    }
    if persistent {
        println!("  Corpus ready: {}", ctx.config.corpus.db_path().display());
    } else {
        println!("  Corpus backend: {} (not persisted)", store.name());
    }

    println!("\nNext: `trustgate ingest <file.json>` to load a source.");
    Ok(())
}
