use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Which execution mode the scheduler should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPreference {
    /// Threaded when the executor has a spare worker, sequential otherwise.
    #[default]
    Auto,
    /// Always use a background lane. Fails if there is no worker.
    Threaded,
    /// Run every system on the calling thread.
    Sequential,
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for deterministic simulation.
    pub seed: u64,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Threaded or sequential execution.
    pub execution: ExecutionPreference,
    /// Worker threads to report to the scheduler. `None` = detect.
    pub workers: Option<usize>,
    /// Whether AI-driven systems should run.
    pub run_ai: bool,
    /// Makes every microbe invulnerable.
    pub god_mode: bool,
    /// Spawn and despawn tuning.
    pub spawn: SpawnConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_events: 0,
            execution: ExecutionPreference::Auto,
            workers: None,
            run_ai: true,
            god_mode: false,
            spawn: SpawnConfig::default(),
        }
    }
}

impl SimConfig {
    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the execution preference.
    pub fn with_execution(mut self, execution: ExecutionPreference) -> Self {
        self.execution = execution;
        self
    }

    /// Override the detected worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the god mode flag.
    pub fn with_god_mode(mut self, god_mode: bool) -> Self {
        self.god_mode = god_mode;
        self
    }

    /// Replace the spawn configuration.
    pub fn with_spawn(mut self, spawn: SpawnConfig) -> Self {
        self.spawn = spawn;
        self
    }

    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value; fails with [`SimError::Config`].
    pub fn validate(&self) -> SimResult<()> {
        self.spawn.validate()
    }
}

/// Tuning constants for procedural spawning and despawning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Side length of a spawn grid cell, in world units.
    pub grid_cell_size: f32,
    /// Cells scanned around the reference cell in each direction.
    pub scan_radius_cells: i32,
    /// Fewest placements in one spawn event.
    pub event_count_min: u32,
    /// Most placements in one spawn event (inclusive).
    pub event_count_max: u32,
    /// Scatter radius of placements around an event centre.
    pub event_radius: f32,
    /// Despawn radius given to spawned entities. Also the margin kept
    /// between an event centre and its cell edges.
    pub despawn_item_radius: f32,
    /// Pending placements realized per tick.
    pub max_spawns_per_step: usize,
    /// Entities removed by the despawn sweep per tick.
    pub max_despawns_per_step: usize,
    /// Placements are dropped while this many entities are tracked.
    pub max_alive_entities: usize,
    /// Distance from the reference point at which wanderers appear.
    pub wanderer_spawn_radius: f32,
    /// Seconds over which the whole wanderer pool is spawned once.
    pub wanderer_spawn_budget: f32,
    /// Grid cells remembered as already visited.
    pub visited_cell_capacity: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 150.0,
            scan_radius_cells: 1,
            event_count_min: 3,
            event_count_max: 6,
            event_radius: 30.0,
            despawn_item_radius: 15.0,
            max_spawns_per_step: 15,
            max_despawns_per_step: 5,
            max_alive_entities: 1000,
            wanderer_spawn_radius: 100.0,
            wanderer_spawn_budget: 120.0,
            visited_cell_capacity: 50,
        }
    }
}

impl SpawnConfig {
    /// Number of cells in the square scan window.
    pub fn scan_window_cells(&self) -> usize {
        let side = 2 * self.scan_radius_cells.max(0) as usize + 1;
        side * side
    }

    /// Check sizes, ranges and capacities; fails with [`SimError::Config`].
    pub fn validate(&self) -> SimResult<()> {
        let fail = |msg: String| Err(SimError::Config(msg));

        if self.grid_cell_size.is_nan() || self.grid_cell_size <= 0.0 {
            return fail(format!(
                "grid_cell_size must be positive, got {}",
                self.grid_cell_size
            ));
        }
        if self.scan_radius_cells < 0 {
            return fail(format!(
                "scan_radius_cells must not be negative, got {}",
                self.scan_radius_cells
            ));
        }
        if self.event_count_min > self.event_count_max {
            return fail(format!(
                "event_count_min ({}) is greater than event_count_max ({})",
                self.event_count_min, self.event_count_max
            ));
        }
        if self.max_spawns_per_step == 0 {
            return fail("max_spawns_per_step must be at least 1".to_string());
        }
        if self.despawn_item_radius < 0.0 || self.despawn_item_radius * 2.0 >= self.grid_cell_size
        {
            return fail(format!(
                "despawn_item_radius ({}) must leave room inside a grid cell of {}",
                self.despawn_item_radius, self.grid_cell_size
            ));
        }
        if self.event_radius < 0.0 || self.wanderer_spawn_radius < 0.0 {
            return fail("spawn radii must not be negative".to_string());
        }
        if self.wanderer_spawn_budget.is_nan() || self.wanderer_spawn_budget <= 0.0 {
            return fail(format!(
                "wanderer_spawn_budget must be positive, got {}",
                self.wanderer_spawn_budget
            ));
        }
        if self.visited_cell_capacity < self.scan_window_cells() {
            return fail(format!(
                "visited_cell_capacity ({}) is smaller than the {} cells of the scan window",
                self.visited_cell_capacity,
                self.scan_window_cells()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = SimConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_events, 0);
        assert_eq!(config.execution, ExecutionPreference::Auto);
        config.validate().unwrap();
    }

    #[test]
    fn config_builder_chain() {
        let config = SimConfig::default()
            .with_seed(123)
            .with_max_events(500)
            .with_execution(ExecutionPreference::Sequential)
            .with_workers(3);
        assert_eq!(config.seed, 123);
        assert_eq!(config.max_events, 500);
        assert_eq!(config.execution, ExecutionPreference::Sequential);
        assert_eq!(config.workers, Some(3));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config =
            SimConfig::from_json(r#"{ "seed": 7, "spawn": { "max_alive_entities": 5 } }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.spawn.max_alive_entities, 5);
        assert_eq!(config.spawn.grid_cell_size, SpawnConfig::default().grid_cell_size);
    }

    #[test]
    fn inverted_event_range_is_rejected() {
        let spawn = SpawnConfig {
            event_count_min: 5,
            event_count_max: 2,
            ..SpawnConfig::default()
        };
        assert!(matches!(spawn.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn zero_spawn_drain_is_rejected() {
        let spawn = SpawnConfig {
            max_spawns_per_step: 0,
            ..SpawnConfig::default()
        };
        assert!(matches!(spawn.validate(), Err(SimError::Config(_))));
        assert!(SimConfig::default().with_spawn(spawn).validate().is_err());
    }

    #[test]
    fn visited_capacity_must_cover_scan_window() {
        let spawn = SpawnConfig {
            scan_radius_cells: 2,
            visited_cell_capacity: 24,
            ..SpawnConfig::default()
        };
        assert_eq!(spawn.scan_window_cells(), 25);
        assert!(spawn.validate().is_err());

        let spawn = SpawnConfig {
            visited_cell_capacity: 25,
            ..spawn
        };
        spawn.validate().unwrap();
    }

    #[test]
    fn bad_json_is_a_config_error() {
        assert!(matches!(
            SimConfig::from_json("{ not json"),
            Err(SimError::Config(_))
        ));
    }
}
