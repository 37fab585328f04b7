//! `trustgate scenarios | simulate`: regulatory scenario projection.

use super::{Context, print_json};
use trustgate_reasoning::{
    AttributeRef, CompanySize, ImpactSimulator, ScenarioCatalog, SimulationInput,
    catalog::sector_key,
};

/// Built-in scenarios overlaid with the configured catalog file, if any.
fn load_catalog(ctx: &Context) -> Result<ScenarioCatalog, Box<dyn std::error::Error>> {
    let builtin = ScenarioCatalog::builtin()?;
    let Some(path) = &ctx.config.reasoning.scenarios_path else {
        return Ok(builtin);
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read scenarios at {}: {e}", path.display()))?;
    let custom = ScenarioCatalog::from_toml(&content)
        .map_err(|e| format!("Invalid scenarios in {}: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), count = custom.len(), "Custom scenarios loaded");
    Ok(builtin.merge(custom))
}

pub async fn run(ctx: &Context, sector: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(ctx)?;
    let sector = sector.map(sector_key);
    let scenarios: Vec<_> = match &sector {
        Some(sector) => catalog.for_sector(sector).collect(),
        None => catalog.scenarios().iter().collect(),
    };

    if ctx.json {
        return print_json(&scenarios);
    }

    if scenarios.is_empty() {
        println!("No scenarios.");
        return Ok(());
    }

    println!("Regulatory scenarios");
    println!("====================");
    for scenario in scenarios {
        println!(
            "  {:<12} {:<8} {}  ({} date confidence)",
            scenario.id, scenario.regulation, scenario.expected_date, scenario.date_confidence
        );
        println!("               {}", scenario.name);
    }
    Ok(())
}

pub async fn simulate(
    ctx: &Context,
    scenario_id: String,
    sector: String,
    size: CompanySize,
    current: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let simulator = ImpactSimulator::new(load_catalog(ctx)?);
    let input = SimulationInput {
        scenario_id,
        sector,
        company_size: size,
        current_attributes: current,
    };
    let result = simulator.simulate(&input, &AttributeRef::from_catalog())?;

    if ctx.json {
        return print_json(&result);
    }

    let comparison = &result.comparison;
    println!("{} ({}), expected {}", result.scenario_name, result.regulation, result.expected_date);
    println!("==========");
    println!("  Affected requirements:  {}", comparison.affected_requirements);
    println!("  Coverage today:         {}%", comparison.current_coverage);
    println!("  Coverage projected:     {}%", comparison.projected_coverage);
    println!("  New gaps:               {}", comparison.new_gaps_count);

    if !result.projected_gaps.is_empty() {
        println!("\n  Projected requirements:");
        for gap in &result.projected_gaps {
            println!(
                "    {:<10} {:<12} -> {:<16} {}",
                gap.requirement_id,
                gap.current_status.as_str(),
                gap.future_status.as_str(),
                gap.requirement
            );
        }
    }

    if !result.no_regret_actions.is_empty() {
        println!("\n  No-regret actions:");
        for action in &result.no_regret_actions {
            println!("    {} ({} effort)", action.action, action.estimated_effort);
        }
    }
    if !result.contingent_actions.is_empty() {
        println!("\n  Contingent actions:");
        for action in &result.contingent_actions {
            println!("    {} ({} effort)", action.action, action.estimated_effort);
            if let Some(trigger) = &action.trigger_condition {
                println!("      when: {trigger}");
            }
        }
    }

    if !result.active_assumptions.is_empty() {
        println!("\n  Assumptions:");
        for assumption in &result.active_assumptions {
            println!("    [{}] {}", assumption.confidence, assumption.assumption);
        }
    }

    println!("\n  {}", result.disclaimer);
    Ok(())
}
