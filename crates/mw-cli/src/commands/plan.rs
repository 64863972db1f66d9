use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use mw_simulation::systems::standard_layout;
use mw_simulation::{Lane, SimConfig};

pub fn run(layout: bool) -> Result<(), String> {
    let config = SimConfig::default();
    let (_, graph) = super::standard_session(&config)?;
    let schedule = if layout {
        graph.compile_with_layout(&standard_layout())
    } else {
        graph.compile()
    }
    .map_err(|e| format!("invalid schedule: {e}"))?;

    let source = if layout { "hand-written layout" } else { "automatic placement" };
    println!(
        "  {} {}",
        "Lane plan".bold(),
        format!(
            "({source}, {} systems, {} checkpoints)",
            schedule.system_count(),
            schedule.checkpoint_count()
        )
        .dimmed()
    );
    println!();

    let main = schedule.segments(Lane::Main);
    let background = schedule.segments(Lane::Background);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Segment", "Main", "Background"]);
    for (segment, (m, b)) in main.iter().zip(&background).enumerate() {
        table.add_row(vec![segment.to_string(), cell(m), cell(b)]);
    }
    println!("{table}");
    println!();

    let order: Vec<String> = schedule
        .sequential_order()
        .into_iter()
        .map(|(_, name)| name.to_string())
        .collect();
    println!("  {} {}", "Sequential order:".bold(), order.join(" -> "));

    Ok(())
}

fn cell(names: &[&str]) -> String {
    if names.is_empty() {
        "-".dimmed().to_string()
    } else {
        names.join("\n")
    }
}
