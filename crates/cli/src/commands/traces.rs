//! `trustgate traces`: look up earlier evidence decisions.

use super::{Context, print_json};
use trustgate_evidence::{DecisionTrace, TraceFilter};
use uuid::Uuid;

pub async fn run(
    ctx: &Context,
    id: Option<Uuid>,
    filter: TraceFilter,
    limit: usize,
    stats: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stores = ctx.open_stores().await?;

    if let Some(id) = id {
        let trace = stores
            .traces
            .load(id)
            .await?
            .ok_or_else(|| format!("No trace with id {id}"))?;
        if ctx.json {
            return print_json(&trace);
        }
        print_trace(&trace);
        return Ok(());
    }

    if stats {
        let stats = stores.traces.trace_stats().await?;
        if ctx.json {
            return print_json(&stats);
        }
        println!("Decision traces");
        println!("===============");
        println!("  Total:      {}", stats.total);
        println!("  Answered:   {}", stats.answered);
        println!("  Abstained:  {}", stats.abstained);
        if let Some(avg) = stats.average_answer_confidence {
            println!("  Avg answer confidence: {avg:.2}");
        }
        for (reason, count) in &stats.by_reason {
            println!("    {:<26} {count}", reason.as_str());
        }
        return Ok(());
    }

    let traces = stores.traces.recent(filter, limit).await?;
    if ctx.json {
        return print_json(&traces);
    }
    if traces.is_empty() {
        println!("No traces.");
        return Ok(());
    }

    for trace in &traces {
        let outcome = match trace.decision.reason_code() {
            None => format!("ANSWER {:.2}", trace.decision.confidence),
            Some(reason) => reason.as_str().to_string(),
        };
        println!(
            "  {}  {}  {:<26} {}",
            trace.trace_id,
            trace.created_at.format("%Y-%m-%d %H:%M:%S"),
            outcome,
            trace.query
        );
    }
    Ok(())
}

fn print_trace(trace: &DecisionTrace) {
    let decision = &trace.decision;
    println!("Trace:     {}", trace.trace_id);
    println!("At:        {}", trace.created_at.to_rfc3339());
    println!("Query:     {}", trace.query);
    println!("Domain:    {}", trace.domain);
    println!("Hits:      {}", trace.hits.len());
    match decision.reason_code() {
        None => {
            println!("ANSWER  confidence {:.2}", decision.confidence);
            let ids: Vec<String> = decision.evidence_set.iter().map(|id| id.to_string()).collect();
            println!("  Evidence chunks:  {}", ids.join(", "));
        }
        Some(reason) => {
            println!("ABSTAIN  {}", reason.as_str());
            println!("  {}", reason.template());
            if let Some(error) = &decision.details.error {
                println!("  Cause: {error}");
            }
        }
    }
}
