use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use tracing::info;

use mw_simulation::spawn::SpawnSaveState;
use mw_simulation::systems::{CellCountingSystem, TimedLifeSystem};
use mw_simulation::{
    ExecutionPreference, SimEventKind, Simulation, SpawnSystem, TickInput, TickSummary,
};

/// Everything `mw run` accepts on the command line.
#[derive(Debug)]
pub struct RunOptions {
    pub ticks: u64,
    pub seed: Option<u64>,
    pub delta: f32,
    pub sequential: bool,
    pub workers: Option<usize>,
    pub config: Option<PathBuf>,
    pub load_state: Option<PathBuf>,
    pub save_state: Option<PathBuf>,
    pub verbose: bool,
}

pub fn run(options: &RunOptions) -> Result<(), String> {
    let mut config = super::load_config(options.config.as_deref())?;
    if let Some(seed) = options.seed {
        config = config.with_seed(seed);
    }
    if let Some(workers) = options.workers {
        config = config.with_workers(workers);
    }
    if options.sequential {
        config = config.with_execution(ExecutionPreference::Sequential);
    }

    let (catalog, graph) = super::standard_session(&config)?;
    let (world, player) = super::standard_world()?;
    let mut sim = Simulation::new(world, &config, graph)
        .map_err(|e| format!("simulation setup failed: {e}"))?;

    if let Some(path) = &options.load_state {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let state = SpawnSaveState::from_json(&json).map_err(|e| e.to_string())?;
        spawn_system(&mut sim)?
            .load_state(state, &catalog)
            .map_err(|e| format!("cannot restore spawn state: {e}"))?;
    }

    let mut last: Option<TickSummary> = None;
    for _ in 0..options.ticks {
        let position = sim
            .world()
            .map_err(|e| e.to_string())?
            .get_entity(player)
            .map(|entity| entity.position)
            .ok_or("the player entity disappeared")?;
        let input = TickInput {
            player_position: Some(position),
            run_ai: config.run_ai,
        };
        let summary = sim
            .run_step(options.delta, &input)
            .map_err(|e| format!("simulation error: {e}"))?;
        last = Some(summary);
    }
    info!(ticks = options.ticks, elapsed = sim.clock().elapsed(), "session finished");

    print_header(&sim, options, config.seed);
    if options.verbose {
        print_events(&sim);
    }
    if let Some(summary) = &last {
        print_population(summary);
    }
    print_activity(&sim);

    if let Some(path) = &options.save_state {
        let json = spawn_system(&mut sim)?
            .save_state()
            .to_json()
            .map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        println!("  Spawn state saved to {}", path.display());
    }

    Ok(())
}

fn spawn_system(sim: &mut Simulation) -> Result<&mut SpawnSystem, String> {
    sim.get_system_mut::<SpawnSystem>()
        .ok_or_else(|| "no spawn system registered".to_string())
}

fn print_header(sim: &Simulation, options: &RunOptions, seed: u64) {
    println!(
        "  {} {}",
        "Simulation".bold(),
        format!(
            "({} ticks, seed={seed}, delta={}s, mode={}, workers={})",
            options.ticks,
            options.delta,
            sim.mode(),
            sim.scheduler().worker_count()
        )
        .dimmed()
    );
    println!(
        "  {:.1}s simulated, {} events logged",
        sim.clock().elapsed(),
        sim.events().len()
    );
    println!();
}

fn print_events(sim: &Simulation) {
    println!("  {}", "Event Log".bold().underline());
    println!();
    let events = sim.events();
    for event in events.events() {
        let tick_label = format!("[tick {:>4}]", event.tick).dimmed();
        println!("  {tick_label} {}", colorize_event(&event.kind, &event.description));
    }
    if events.is_empty() {
        println!("  {}", "(no events)".dimmed());
    }
    println!();
}

fn print_population(summary: &TickSummary) {
    println!("  {}", "Population".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Kind", "Count"]);
    for (kind, count) in &summary.entity_counts {
        table.add_row(vec![kind.clone(), count.to_string()]);
    }
    table.add_row(vec!["total".bold().to_string(), summary.total_entities.to_string()]);
    println!("{table}");
    println!(
        "  {} tracked by the spawn manager, {} cells",
        summary.tracked_entities, summary.cells
    );
    println!();
}

fn print_activity(sim: &Simulation) {
    let events = sim.events();
    let tally = |pred: fn(&SimEventKind) -> bool| events.count_where(pred).to_string();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Activity", "Count"]);
    table.add_row(vec![
        "spawn events".to_string(),
        tally(|k| matches!(k, SimEventKind::SpawnEvent { .. })),
    ]);
    table.add_row(vec![
        "wanderers".to_string(),
        tally(|k| matches!(k, SimEventKind::WandererQueued)),
    ]);
    table.add_row(vec![
        "spawned".to_string(),
        tally(|k| matches!(k, SimEventKind::Spawned { .. })),
    ]);
    table.add_row(vec![
        "despawned".to_string(),
        tally(|k| matches!(k, SimEventKind::Despawned { .. })),
    ]);
    let dropped: u32 = events
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            SimEventKind::PlacementsDropped { count } => Some(count),
            _ => None,
        })
        .sum();
    table.add_row(vec!["dropped at cap".to_string(), dropped.to_string()]);
    if let Some(timed) = sim.get_system::<TimedLifeSystem>() {
        table.add_row(vec!["expired".to_string(), timed.expired_total().to_string()]);
    }
    if let Some(counter) = sim.get_system::<CellCountingSystem>() {
        table.add_row(vec!["cells (last count)".to_string(), counter.last_count().to_string()]);
    }

    println!("  {}", "Activity".bold().underline());
    println!();
    println!("{table}");
    println!();
}

fn colorize_event(kind: &SimEventKind, description: &str) -> colored::ColoredString {
    match kind {
        SimEventKind::SpawnEvent { .. } => description.cyan(),
        SimEventKind::WandererQueued => description.blue(),
        SimEventKind::PlacementsDropped { .. } => description.yellow(),
        SimEventKind::Spawned { .. } => description.green(),
        SimEventKind::Despawned { .. } | SimEventKind::Expired { .. } => description.red(),
        SimEventKind::Custom { .. } => description.normal(),
    }
}
