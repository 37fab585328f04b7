//! `trustgate recommend`: rank GS1 attributes for a sector.

use super::{Context, print_json};
use trustgate_reasoning::{AttributeRecommender, RecommendationInput};

pub async fn run(
    ctx: &Context,
    sector: String,
    regulations: Vec<String>,
    current: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = RecommendationInput {
        sector,
        target_regulations: regulations,
        current_attributes: current,
    };
    let result = AttributeRecommender::new().recommend(&input)?;

    if ctx.json {
        return print_json(&result);
    }

    if result.recommendations.is_empty() {
        println!("Nothing to recommend for '{}': every relevant attribute is populated.", input.sector);
        return Ok(());
    }

    let summary = &result.summary;
    println!("Attribute recommendations: {}", input.sector);
    println!("=========================");
    for rec in &result.recommendations {
        let regulations: Vec<&str> = rec
            .regulatory_relevance
            .iter()
            .map(|r| r.regulation.as_str())
            .collect();
        println!(
            "  {:>2}. {:<32} {:.2} {:<6} {} effort  [{}]",
            rec.priority_rank,
            rec.attribute_name,
            rec.confidence_score,
            rec.confidence_level.as_str(),
            rec.estimated_effort,
            regulations.join(", ")
        );
    }

    println!();
    println!(
        "  Confidence:  {} high / {} medium / {} low",
        summary.high_confidence, summary.medium_confidence, summary.low_confidence
    );
    if !summary.regulations_covered.is_empty() {
        println!("  Covers:      {}", summary.regulations_covered.join(", "));
    }
    if let Some(effort) = summary.average_effort {
        println!("  Avg effort:  {effort}");
    }
    Ok(())
}
