//! `trustgate gaps`: present-state ESRS coverage for a sector.

use super::{Context, print_json, read_json};
use std::path::Path;
use trustgate_reasoning::{
    CompanySize, CorpusSnapshot, GapAnalysisInput, GapAnalyzer, RequirementMapping,
};

pub async fn run(
    ctx: &Context,
    mappings_path: &Path,
    sector: String,
    size: CompanySize,
    current: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mappings: Vec<RequirementMapping> = read_json(mappings_path)?;
    let store = ctx.open_store().await?;
    let snapshot = CorpusSnapshot::load(&*store).await?;

    let input = GapAnalysisInput {
        sector,
        company_size: size,
        current_attributes: current,
    };
    let result = GapAnalyzer::new(snapshot).analyze(&input, &mappings)?;

    if ctx.json {
        return print_json(&result);
    }

    let summary = &result.summary;
    println!("Gap analysis: {} ({})", input.sector, input.company_size);
    println!("============");
    println!("  Requirements:   {}", summary.total_requirements);
    println!("  Covered:        {}", summary.covered_requirements);
    println!("  Partial:        {}", summary.partial_coverage);
    println!("  Gaps:           {}", summary.gaps);
    println!("  Coverage:       {}%", summary.coverage_percentage);
    if summary.skipped_stale > 0 {
        println!("  Skipped:        {} (source no longer current)", summary.skipped_stale);
    }
    if let Some(year) = summary.csrd_phase_in {
        println!("  CSRD reporting: from financial year {year}");
    }

    if !result.gaps.is_empty() {
        println!("\n  Gaps by priority:");
        for gap in &result.gaps {
            println!(
                "    [{:<8}] {} {}: {} ({}, {})",
                gap.priority.as_str(),
                gap.id,
                gap.esrs_standard,
                gap.short_name,
                gap.marker.status(),
                gap.marker.confidence()
            );
        }
    }

    if !result.remediation_paths.is_empty() {
        println!("\n  Remediation:");
        for path in &result.remediation_paths {
            println!(
                "    {} ({} effort, {} steps)",
                path.gap_id,
                path.estimated_effort,
                path.steps.len()
            );
        }
    }

    Ok(())
}
