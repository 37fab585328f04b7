//! trustgate CLI: the main entry point.
//!
//! Commands:
//! - `init`       Write the default config and create the corpus database
//! - `status`     Show configuration and corpus health
//! - `ingest`     Add a source and its chunks from a JSON file
//! - `supersede`  Replace a source with a new version
//! - `archive`    Retire a source
//! - `sources`    List sources, `chain` shows a supersession chain
//! - `stats`      Corpus statistics
//! - `analyze`    Decide whether retrieval hits can back an answer
//! - `traces`     Look up recorded decisions by id, recency, or outcome
//! - `gaps`       Present-state ESRS coverage gaps for a sector
//! - `scenarios`  List regulatory scenarios
//! - `simulate`   Project a scenario onto current coverage
//! - `recommend`  Rank GS1 attributes to populate next

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trustgate_core::policy::QueryDomain;
use trustgate_core::source::{SourceId, SourceStatus};
use trustgate_evidence::TraceFilter;
use trustgate_reasoning::CompanySize;
use uuid::Uuid;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(
    name = "trustgate",
    about = "trustgate: evidence and epistemic guardrails for ESG compliance answers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of ~/.trustgate/config.toml
    #[arg(short, long, global = true, env = "TRUSTGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the corpus database
    Init,

    /// Show configuration and corpus health
    Status,

    /// Ingest a source and its chunks from a JSON file
    Ingest {
        /// `{"source": {...}, "chunks": [...]}`
        file: PathBuf,
    },

    /// Supersede a source with a new version read from a JSON file
    Supersede {
        /// Id of the source being replaced
        old_id: SourceId,

        /// Same layout as `ingest`
        file: PathBuf,
    },

    /// Archive a source
    Archive { id: SourceId },

    /// List sources
    Sources {
        /// Only list sources in this status
        #[arg(short, long)]
        status: Option<SourceStatus>,
    },

    /// Show the supersession chain through a source
    Chain { id: SourceId },

    /// Show corpus statistics
    Stats,

    /// Check retrieval hits for evidence sufficiency
    Analyze {
        /// The user question
        #[arg(short, long)]
        query: String,

        /// JSON file with retrieval hits and optional claims
        #[arg(long)]
        hits: PathBuf,

        /// Override the domain inferred from the query
        #[arg(short, long)]
        domain: Option<QueryDomain>,
    },

    /// List recorded evidence decisions, newest first
    Traces {
        /// Show a single trace
        #[arg(long)]
        id: Option<Uuid>,

        /// Only abstentions
        #[arg(long, conflicts_with = "errors")]
        abstained: bool,

        /// Only retrieval and input failures
        #[arg(long)]
        errors: bool,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Aggregate counts instead of a listing
        #[arg(long)]
        stats: bool,
    },

    /// Find ESRS coverage gaps for a sector
    Gaps {
        /// JSON file with requirement-to-attribute mappings
        #[arg(short, long)]
        mappings: PathBuf,

        #[arg(short, long)]
        sector: String,

        #[arg(long, default_value = "large")]
        size: CompanySize,

        /// Attribute ids already populated (comma separated)
        #[arg(long, value_delimiter = ',')]
        current: Vec<String>,
    },

    /// List regulatory scenarios
    Scenarios {
        /// Only scenarios affecting this sector
        #[arg(short, long)]
        sector: Option<String>,
    },

    /// Simulate a regulatory scenario against current coverage
    Simulate {
        #[arg(long)]
        scenario: String,

        #[arg(short, long)]
        sector: String,

        #[arg(long, default_value = "large")]
        size: CompanySize,

        /// Attribute ids already populated (comma separated)
        #[arg(long, value_delimiter = ',')]
        current: Vec<String>,
    },

    /// Recommend GS1 attributes for a sector
    Recommend {
        #[arg(short, long)]
        sector: String,

        /// Target regulations (comma separated, e.g. CSRD,DPP)
        #[arg(short, long, value_delimiter = ',')]
        regulation: Vec<String>,

        /// Attribute ids already populated (comma separated)
        #[arg(long, value_delimiter = ',')]
        current: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let ctx = Context::load(cli.config.as_deref(), cli.json)?;

    // Logs go to stderr so `--json` output stays parseable
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        ctx.config.logging.level.clone()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if ctx.config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Init => commands::init::run(&ctx).await?,
        Commands::Status => commands::status::run(&ctx).await?,
        Commands::Ingest { file } => commands::ingest::run(&ctx, &file).await?,
        Commands::Supersede { old_id, file } => {
            commands::ingest::supersede(&ctx, old_id, &file).await?
        }
        Commands::Archive { id } => commands::ingest::archive(&ctx, id).await?,
        Commands::Sources { status } => commands::sources::run(&ctx, status).await?,
        Commands::Chain { id } => commands::sources::chain(&ctx, id).await?,
        Commands::Stats => commands::sources::stats(&ctx).await?,
        Commands::Analyze {
            query,
            hits,
            domain,
        } => commands::analyze::run(&ctx, &query, &hits, domain).await?,
        Commands::Traces {
            id,
            abstained,
            errors,
            limit,
            stats,
        } => {
            let filter = match (abstained, errors) {
                (true, _) => TraceFilter::Abstained,
                (_, true) => TraceFilter::Errors,
                _ => TraceFilter::All,
            };
            commands::traces::run(&ctx, id, filter, limit, stats).await?
        }
        Commands::Gaps {
            mappings,
            sector,
            size,
            current,
        } => commands::gaps::run(&ctx, &mappings, sector, size, current).await?,
        Commands::Scenarios { sector } => commands::scenarios::run(&ctx, sector.as_deref()).await?,
        Commands::Simulate {
            scenario,
            sector,
            size,
            current,
        } => commands::scenarios::simulate(&ctx, scenario, sector, size, current).await?,
        Commands::Recommend {
            sector,
            regulation,
            current,
        } => commands::recommend::run(&ctx, sector, regulation, current).await?,
    }

    Ok(())
}
