//! `trustgate status`: show configuration and corpus health.

use super::{Context, print_json};
use serde_json::json;

pub async fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = &ctx.config;
    let stores = ctx.open_stores().await?;
    let stats = stores.corpus.corpus_stats().await?;
    let traces = stores.traces.trace_stats().await?;

    if ctx.json {
        return print_json(&json!({
            "config_path": ctx.config_path,
            "config_found": ctx.config_path.exists(),
            "backend": config.corpus.backend.to_string(),
            "database": config.corpus.db_path(),
            "evidence": config.evidence,
            "corpus": stats,
            "traces": traces,
        }));
    }

    let policy = &config.evidence;
    println!("trustgate status");
    println!("================");
    println!("  Config:           {}", ctx.config_path.display());
    println!("  Backend:          {}", config.corpus.backend);
    println!("  Database:         {}", config.corpus.db_path().display());
    println!("  Min similarity:   {}", policy.min_similarity);
    println!("  Min chunks:       {}", policy.min_supporting_chunks);
    println!("  Conflict window:  {}", policy.conflict_window);
    println!("  Log level:        {}", config.logging.level);
    println!(
        "  Sources:          {} active / {} total",
        stats.active_sources, stats.total_sources
    );
    println!("  Chunks:           {}", stats.total_chunks);
    println!(
        "  Decisions:        {} traced / {} abstained",
        traces.total, traces.abstained
    );

    if ctx.config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults. Run `trustgate init` to write one.");
    }

    Ok(())
}
