//! `trustgate ingest | supersede | archive`: corpus lifecycle writes.

use super::{Context, print_json, read_json};
use serde::{Deserialize, Serialize};
use std::path::Path;
use trustgate_core::chunk::{NewChunk, SourceChunk};
use trustgate_core::source::{NewSource, Source, SourceId};

/// Input file layout shared by `ingest` and `supersede`.
#[derive(Debug, Deserialize)]
struct SourceDocument {
    source: NewSource,
    #[serde(default)]
    chunks: Vec<NewChunk>,
}

#[derive(Debug, Serialize)]
struct IngestReport<'a> {
    source: &'a Source,
    chunks: &'a [SourceChunk],
}

pub async fn run(ctx: &Context, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc: SourceDocument = read_json(file)?;
    let store = ctx.open_store().await?;

    let source = store.create_source(doc.source).await?;
    let chunks = store
        .create_source_chunks_batch(source.id, doc.chunks)
        .await?;

    report(ctx, "Ingested", &source, &chunks)
}

pub async fn supersede(
    ctx: &Context,
    old_id: SourceId,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc: SourceDocument = read_json(file)?;
    let store = ctx.open_store().await?;

    let source = store.supersede_source(old_id, doc.source).await?;
    let chunks = store
        .create_source_chunks_batch(source.id, doc.chunks)
        .await?;

    if !ctx.json {
        println!("Source {old_id} superseded");
    }
    report(ctx, "Created successor", &source, &chunks)
}

pub async fn archive(ctx: &Context, id: SourceId) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store().await?;
    let source = store.archive_source(id).await?;

    if ctx.json {
        return print_json(&source);
    }
    println!("Archived source {} ({})", source.id, source.external_id);
    Ok(())
}

fn report(
    ctx: &Context,
    verb: &str,
    source: &Source,
    chunks: &[SourceChunk],
) -> Result<(), Box<dyn std::error::Error>> {
    if ctx.json {
        return print_json(&IngestReport { source, chunks });
    }

    println!("{verb} source {}", source.id);
    println!("  External id:  {}", source.external_id);
    println!("  Name:         {}", source.name);
    println!("  Type:         {}", source.source_type);
    println!("  Authority:    {}", source.authority_level);
    if let Some(version) = &source.version {
        println!("  Version:      {version}");
    }
    println!("  Chunks:       {}", chunks.len());
    Ok(())
}
