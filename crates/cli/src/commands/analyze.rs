//! `trustgate analyze`: evidence sufficiency for a set of retrieval hits.

use super::{Context, print_json, read_json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use trustgate_core::chunk::ChunkId;
use trustgate_core::policy::QueryDomain;
use trustgate_evidence::{
    Claim, DecisionTrace, EvidenceAnalyzer, EvidenceDecision, EvidenceQuery, RetrievalHit,
    resolve_candidates,
};
use uuid::Uuid;

/// `{"hits": [...], "claims": {"<chunk id>": {"topic": .., "conclusion": ..}}}`
#[derive(Debug, Deserialize)]
struct HitsFile {
    hits: Vec<RetrievalHit>,
    #[serde(default)]
    claims: HashMap<ChunkId, Claim>,
}

#[derive(Debug, Serialize)]
struct AnalyzeReport<'a> {
    trace_id: Uuid,
    query: &'a EvidenceQuery,
    decision: &'a EvidenceDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<&'static str>,
}

pub async fn run(
    ctx: &Context,
    query: &str,
    hits_path: &Path,
    domain: Option<QueryDomain>,
) -> Result<(), Box<dyn std::error::Error>> {
    let HitsFile { hits, claims } = read_json(hits_path)?;
    let query = match domain {
        Some(domain) => EvidenceQuery::with_domain(query, domain),
        None => EvidenceQuery::new(query),
    };

    let analyzer = EvidenceAnalyzer::new(ctx.config.evidence.clone())
        .map_err(|e| format!("Invalid evidence policy: {e}"))?;
    let stores = ctx.open_stores().await?;

    // A hit the corpus cannot resolve is an abstention, not a crash
    let resolved = resolve_candidates(&*stores.corpus, &hits, &claims).await;
    let decision = analyzer.analyze_resolved(&query, resolved);

    let trace = DecisionTrace::new(&query, &hits, &decision);
    stores.traces.save(&trace).await?;
    let trace_id = trace.trace_id;

    if ctx.json {
        return print_json(&AnalyzeReport {
            trace_id,
            query: &query,
            decision: &decision,
            explanation: decision.explanation(),
        });
    }

    let details = &decision.details;
    println!("Query:     {}", query.text);
    println!(
        "Domain:    {} (requires {} authority)",
        details.domain, details.required_authority
    );
    println!("Trace:     {trace_id}");
    println!();

    match decision.reason_code() {
        None => {
            println!("ANSWER  confidence {:.2}", decision.confidence);
            let ids: Vec<String> = decision.evidence_set.iter().map(|id| id.to_string()).collect();
            println!("  Evidence chunks:  {}", ids.join(", "));
            println!("  Sources:          {}", details.distinct_sources);
            println!("  Agreement:        {:.2}", details.agreement_ratio);
        }
        Some(reason) => {
            println!("ABSTAIN  {}", reason.as_str());
            println!("  {}", reason.template());
            if let Some(error) = &details.error {
                println!("  Cause: {error}");
            }
            for pair in &details.conflicting_pairs {
                println!(
                    "  Conflict on '{}': chunks {} and {}",
                    pair.topic, pair.first, pair.second
                );
            }
        }
    }

    Ok(())
}
