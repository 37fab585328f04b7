//! `trustgate sources | chain | stats`: corpus reads.

use super::{Context, print_json};
use trustgate_core::source::{Source, SourceId, SourceStatus};

pub async fn run(
    ctx: &Context,
    status: Option<SourceStatus>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store().await?;
    let sources = store.list_sources(status).await?;

    if ctx.json {
        return print_json(&sources);
    }

    if sources.is_empty() {
        println!("No sources.");
        return Ok(());
    }
    print_table(&sources);
    Ok(())
}

pub async fn chain(ctx: &Context, id: SourceId) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store().await?;
    let chain = store.supersession_chain(id).await?;

    if ctx.json {
        return print_json(&chain);
    }

    println!("Supersession chain from source {id} to the current version");
    print_table(&chain);
    Ok(())
}

pub async fn stats(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store().await?;
    let stats = store.corpus_stats().await?;

    if ctx.json {
        return print_json(&stats);
    }

    println!("Corpus statistics ({})", store.name());
    println!("=====================");
    println!("  Sources:      {}", stats.total_sources);
    println!("    active:     {}", stats.active_sources);
    println!("    superseded: {}", stats.superseded_sources);
    println!("    archived:   {}", stats.archived_sources);
    println!("  Chunks:       {}", stats.total_chunks);

    if !stats.by_authority_level.is_empty() {
        println!("\n  Active by authority:");
        for (level, count) in &stats.by_authority_level {
            println!("    {:<12} {count}", level.as_str());
        }
    }
    if !stats.by_source_type.is_empty() {
        println!("\n  Active by type:");
        for (source_type, count) in &stats.by_source_type {
            println!("    {:<24} {count}", source_type.as_str());
        }
    }
    Ok(())
}

fn print_table(sources: &[Source]) {
    println!(
        "  {:>5}  {:<11}  {:<10}  {:<24}  name",
        "id", "status", "authority", "external id"
    );
    for source in sources {
        let successor = source
            .superseded_by
            .map(|id| format!(" -> {id}"))
            .unwrap_or_default();
        println!(
            "  {:>5}  {:<11}  {:<10}  {:<24}  {}{successor}",
            source.id,
            source.status.as_str(),
            source.authority_level.as_str(),
            source.external_id,
            source.name
        );
    }
}
