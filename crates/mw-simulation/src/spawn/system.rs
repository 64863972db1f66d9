use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec3;
use mw_core::component::SpawnedComponent;
use mw_core::entity::SPAWNED_GROUP;
use mw_core::{EntityId, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use tracing::{debug, info, warn};

use crate::clock::sanitize_delta;
use crate::config::SpawnConfig;
use crate::context::TickContext;
use crate::error::{SimError, SimResult};
use crate::event::SimEventKind;
use crate::spawn::bag::SpawnBag;
use crate::spawn::grid::{DespawnWindow, GridCell, VisitedCells};
use crate::spawn::item::{SpawnCatalog, SpawnItem};
use crate::spawn::state::{PendingPlacement, SpawnSaveState};
use crate::system::System;

#[derive(Debug, Clone)]
struct Pending {
    item: Arc<dyn SpawnItem>,
    position: Vec3,
}

#[derive(Debug, Clone, Copy)]
enum BagKind {
    General,
    Wanderer,
}

/// What one [`SpawnSystem::process`] call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnReport {
    /// Cells that triggered, with the placements each queued.
    pub events: Vec<(GridCell, u32)>,
    /// Wanderers queued by the timer.
    pub wanderers: u32,
    /// Placements thrown away at the population cap.
    pub dropped: u32,
    /// Entities realized from the pending queue.
    pub spawned: Vec<EntityId>,
    /// Entities removed by the despawn sweep.
    pub despawned: Vec<EntityId>,
}

/// Spawns procedural content around a moving reference point and removes
/// tracked entities that fall behind it.
///
/// All state is owned here and only touched from `process` and friends,
/// which take `&mut self`.
#[derive(Debug)]
pub struct SpawnSystem {
    config: SpawnConfig,
    rng: ChaCha12Rng,
    spawn_bag: SpawnBag<Arc<dyn SpawnItem>>,
    wanderer_bag: SpawnBag<Arc<dyn SpawnItem>>,
    visited: VisitedCells,
    pending: VecDeque<Pending>,
    elapsed: f32,
    wanderer_timer: f32,
    despawns_left: usize,
    despawn_cursor: Option<EntityId>,
    last_report: SpawnReport,
}

impl SpawnSystem {
    /// A spawn system with empty bags. Fails if `config` does not validate.
    pub fn new(config: SpawnConfig, seed: u64) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
            spawn_bag: SpawnBag::new(),
            wanderer_bag: SpawnBag::new(),
            visited: VisitedCells::new(config.visited_cell_capacity),
            pending: VecDeque::new(),
            elapsed: 0.0,
            wanderer_timer: 0.0,
            despawns_left: config.max_despawns_per_step,
            despawn_cursor: None,
            last_report: SpawnReport::default(),
            config,
        })
    }

    // -----------------------------------------------------------------------
    // Pools
    // -----------------------------------------------------------------------

    /// Add an item to the general bag used by grid spawn events.
    pub fn add_spawn_item(&mut self, item: Arc<dyn SpawnItem>) {
        self.spawn_bag.add(item);
    }

    /// Add a creature to the wanderer bag. A larger pool spawns wanderers
    /// more often.
    pub fn add_wanderer_item(&mut self, item: Arc<dyn SpawnItem>) {
        self.wanderer_bag.add(item);
    }

    /// Empty both bags and their pools.
    pub fn clear_bags(&mut self) {
        self.spawn_bag.clear();
        self.wanderer_bag.clear();
    }

    // -----------------------------------------------------------------------
    // Per-tick processing
    // -----------------------------------------------------------------------

    /// Run one spawn/despawn step around `reference`.
    pub fn process(&mut self, delta: f32, reference: Vec3, world: &mut World) -> SimResult<SpawnReport> {
        self.begin_step(delta);
        let reference = Vec3::new(reference.x, 0.0, reference.z);

        let mut report = SpawnReport::default();
        self.spawn_event_grid(reference, world, &mut report);
        self.spawn_wanderer(reference, world, &mut report);
        self.spawn_pending(world, &mut report)?;
        report.despawned = self.despawn_entities(reference, world)?;
        Ok(report)
    }

    /// A step without a reference point: timers and the pending queue
    /// advance, nothing new is scanned or despawned.
    pub fn advance(&mut self, delta: f32, world: &mut World) -> SimResult<SpawnReport> {
        self.begin_step(delta);
        let mut report = SpawnReport::default();
        self.spawn_pending(world, &mut report)?;
        Ok(report)
    }

    fn begin_step(&mut self, delta: f32) {
        let delta = sanitize_delta(delta);
        self.elapsed += delta;
        self.wanderer_timer += delta;
        self.despawns_left = self.config.max_despawns_per_step;
    }

    fn spawn_event_grid(&mut self, reference: Vec3, world: &World, report: &mut SpawnReport) {
        let center = GridCell::containing(reference, self.config.grid_cell_size);
        for cell in center.window(self.config.scan_radius_cells) {
            if self.visited.contains(cell) {
                continue;
            }
            let queued = self.spawn_event(cell, reference, world, report);
            self.visited.insert(cell);
            debug!(cell = %cell, queued, "spawn event");
            report.events.push((cell, queued));
        }
    }

    fn spawn_event(
        &mut self,
        cell: GridCell,
        reference: Vec3,
        world: &World,
        report: &mut SpawnReport,
    ) -> u32 {
        let center = self.event_center(cell, reference);
        let count = self
            .rng
            .random_range(self.config.event_count_min..=self.config.event_count_max);

        let mut queued = 0;
        for _ in 0..count {
            let radius = (self.rng.random::<f32>() + 0.1) * self.config.event_radius;
            let angle = self.rng.random::<f32>() * TAU;
            let position = center + Vec3::new(radius * angle.sin(), 0.0, radius * angle.cos());
            if self.queue_placement(BagKind::General, position, world, report) {
                queued += 1;
            }
        }
        queued
    }

    /// Random point inside `cell`, kept `despawn_item_radius` away from the
    /// cell edges. An axis that lands too close to the reference is
    /// mirrored to the other side of the cell.
    fn event_center(&mut self, cell: GridCell, reference: Vec3) -> Vec3 {
        let size = self.config.grid_cell_size;
        let margin = self.config.despawn_item_radius;
        let event_radius = self.config.event_radius;
        let origin = cell.origin(size);

        let offset = |rng: &mut ChaCha12Rng, cell_start: f32, reference: f32| {
            let offset = rng.random::<f32>() * (size - margin * 2.0) + margin;
            if (reference - (cell_start + offset)).abs() - event_radius < margin {
                size - offset
            } else {
                offset
            }
        };
        let x = offset(&mut self.rng, origin.x, reference.x);
        let z = offset(&mut self.rng, origin.z, reference.z);
        origin + Vec3::new(x, 0.0, z)
    }

    fn spawn_wanderer(&mut self, reference: Vec3, world: &World, report: &mut SpawnReport) {
        let pool = self.wanderer_bag.pool().len();
        if pool == 0 {
            return;
        }
        let period = self.config.wanderer_spawn_budget / pool as f32;
        if self.wanderer_timer <= period {
            return;
        }
        self.wanderer_timer = 0.0;

        let angle = self.rng.random::<f32>() * TAU;
        let distance = self.config.wanderer_spawn_radius;
        let position = reference + Vec3::new(distance * angle.sin(), 0.0, distance * angle.cos());
        if self.queue_placement(BagKind::Wanderer, position, world, report) {
            debug!(period, "wanderer queued");
            report.wanderers += 1;
        }
    }

    /// Draw from a bag and queue the item, unless the population cap is hit.
    fn queue_placement(
        &mut self,
        bag: BagKind,
        position: Vec3,
        world: &World,
        report: &mut SpawnReport,
    ) -> bool {
        let bag = match bag {
            BagKind::General => &mut self.spawn_bag,
            BagKind::Wanderer => &mut self.wanderer_bag,
        };
        let Some(item) = bag.pop(&mut self.rng) else {
            return false;
        };

        let tracked = world.group_len(SPAWNED_GROUP);
        if tracked >= self.config.max_alive_entities {
            debug!(tracked, item = item.key(), "population cap reached, placement dropped");
            report.dropped += 1;
            return false;
        }

        self.pending.push_back(Pending { item, position });
        true
    }

    fn spawn_pending(&mut self, world: &mut World, report: &mut SpawnReport) -> SimResult<()> {
        for _ in 0..self.config.max_spawns_per_step {
            let Some(next) = self.pending.pop_front() else {
                break;
            };
            for id in next.item.realize(next.position, world)? {
                Self::attach_tracking(world, id, self.config.despawn_item_radius)?;
                report.spawned.push(id);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tracking and despawning
    // -----------------------------------------------------------------------

    /// Start tracking an entity created outside the spawn system.
    pub fn track_entity(&self, world: &mut World, id: EntityId, despawn_radius: f32) -> SimResult<()> {
        Self::attach_tracking(world, id, despawn_radius)
    }

    fn attach_tracking(world: &mut World, id: EntityId, despawn_radius: f32) -> SimResult<()> {
        let entity = world
            .get_entity_mut(id)
            .ok_or(SimError::EntityNotFound(id))?;
        entity.components.spawned = Some(SpawnedComponent { despawn_radius });
        world.add_to_group(id, SPAWNED_GROUP)?;
        Ok(())
    }

    /// Remove tracked entities outside the window around `reference`.
    ///
    /// Removals share one budget per step, so calling this again in the same
    /// step never removes more than `max_despawns_per_step` in total. The
    /// sweep resumes after the last removed entity.
    pub fn despawn_entities(&mut self, reference: Vec3, world: &mut World) -> SimResult<Vec<EntityId>> {
        let mut removed = Vec::new();
        if self.despawns_left == 0 {
            return Ok(removed);
        }

        let size = self.config.grid_cell_size;
        let window = DespawnWindow::around(
            GridCell::containing(reference, size),
            self.config.scan_radius_cells,
            size,
        );

        let tracked = world.ids_in_group(SPAWNED_GROUP);
        let start = self
            .despawn_cursor
            .map_or(0, |cursor| tracked.partition_point(|id| *id <= cursor));
        let (before, after) = tracked.split_at(start);

        for &id in after.iter().chain(before) {
            let Some(entity) = world.get_entity(id) else {
                continue;
            };
            if entity.components.spawned.is_none() {
                warn!(entity = %id, name = %entity.name, "tracked entity has no despawn data, skipping");
                continue;
            }
            if window.contains(entity.position) {
                continue;
            }

            world.remove_entity(id)?;
            removed.push(id);
            self.despawn_cursor = Some(id);
            self.despawns_left -= 1;
            if self.despawns_left == 0 {
                break;
            }
        }
        Ok(removed)
    }

    /// Remove every tracked entity, ignoring the budget.
    pub fn despawn_all(&mut self, world: &mut World) -> SimResult<Vec<EntityId>> {
        let ids = world.ids_in_group(SPAWNED_GROUP);
        for &id in &ids {
            world.remove_entity(id)?;
        }
        self.despawn_cursor = None;
        Ok(ids)
    }

    /// Mark the scan window around a new reference position as visited, so
    /// teleporting there doesn't trigger a burst of spawn events.
    pub fn respawn_player(&mut self, position: Vec3) {
        let center = GridCell::containing(position, self.config.grid_cell_size);
        let seeded = center
            .window(self.config.scan_radius_cells)
            .filter(|cell| self.visited.insert(*cell))
            .count();
        info!(cell = %center, seeded, "pre-seeded visited cells after respawn");
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// The spawn configuration in use.
    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Placements queued but not yet realized.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Entities in `world` currently tracked for despawning.
    pub fn tracked_count(&self, world: &World) -> usize {
        world.group_len(SPAWNED_GROUP)
    }

    /// Cells that already had their spawn event.
    pub fn visited(&self) -> &VisitedCells {
        &self.visited
    }

    /// Bag used by grid spawn events.
    pub fn spawn_bag(&self) -> &SpawnBag<Arc<dyn SpawnItem>> {
        &self.spawn_bag
    }

    /// Bag used by the wanderer timer.
    pub fn wanderer_bag(&self) -> &SpawnBag<Arc<dyn SpawnItem>> {
        &self.wanderer_bag
    }

    /// Seconds of simulated time seen so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Report of the last step run through the scheduler.
    pub fn last_report(&self) -> &SpawnReport {
        &self.last_report
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Snapshot everything needed to resume spawning.
    pub fn save_state(&self) -> SpawnSaveState {
        SpawnSaveState {
            elapsed: self.elapsed,
            wanderer_timer: self.wanderer_timer,
            spawn_pool: item_keys(self.spawn_bag.pool().iter()),
            spawn_bag: item_keys(self.spawn_bag.remaining()),
            wanderer_pool: item_keys(self.wanderer_bag.pool().iter()),
            wanderer_bag: item_keys(self.wanderer_bag.remaining()),
            visited: self.visited.iter().copied().collect(),
            pending: self
                .pending
                .iter()
                .map(|p| PendingPlacement {
                    item: p.item.key().to_string(),
                    position: p.position,
                })
                .collect(),
            despawn_cursor: self.despawn_cursor,
            rng: self.rng.clone(),
        }
    }

    /// Restore a saved state. Items are resolved through `catalog`; nothing
    /// changes if one of them is missing.
    pub fn load_state(&mut self, state: SpawnSaveState, catalog: &SpawnCatalog) -> SimResult<()> {
        let resolve = |keys: &[String]| -> SimResult<Vec<Arc<dyn SpawnItem>>> {
            keys.iter().map(|key| catalog.resolve(key)).collect()
        };
        let spawn_bag = SpawnBag::restore(resolve(&state.spawn_pool)?, resolve(&state.spawn_bag)?);
        let wanderer_bag =
            SpawnBag::restore(resolve(&state.wanderer_pool)?, resolve(&state.wanderer_bag)?);
        let pending = state
            .pending
            .iter()
            .map(|p| {
                Ok(Pending {
                    item: catalog.resolve(&p.item)?,
                    position: p.position,
                })
            })
            .collect::<SimResult<VecDeque<_>>>()?;

        let mut visited = VisitedCells::new(self.config.visited_cell_capacity);
        for cell in state.visited {
            visited.insert(cell);
        }

        self.spawn_bag = spawn_bag;
        self.wanderer_bag = wanderer_bag;
        self.pending = pending;
        self.visited = visited;
        self.elapsed = state.elapsed;
        self.wanderer_timer = state.wanderer_timer;
        self.despawn_cursor = state.despawn_cursor;
        self.rng = state.rng;
        Ok(())
    }
}

fn item_keys<'a>(items: impl Iterator<Item = &'a Arc<dyn SpawnItem>>) -> Vec<String> {
    items.map(|item| item.key().to_string()).collect()
}

impl System for SpawnSystem {
    fn name(&self) -> &str {
        "spawn"
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> SimResult<()> {
        let report = {
            let mut world = ctx.world_mut()?;
            match ctx.input().player_position {
                Some(reference) => self.process(ctx.delta(), reference, &mut world)?,
                None => self.advance(ctx.delta(), &mut world)?,
            }
        };

        for &(cell, placements) in &report.events {
            ctx.emit(
                SimEventKind::SpawnEvent { cell, placements },
                format!("spawn event at cell {cell}"),
            );
        }
        for _ in 0..report.wanderers {
            ctx.emit(SimEventKind::WandererQueued, "wanderer queued");
        }
        if report.dropped > 0 {
            ctx.emit(
                SimEventKind::PlacementsDropped {
                    count: report.dropped,
                },
                format!("{} placements dropped at the population cap", report.dropped),
            );
        }
        for &entity in &report.spawned {
            ctx.emit(SimEventKind::Spawned { entity }, format!("spawned {entity}"));
        }
        for &entity in &report.despawned {
            ctx.emit(SimEventKind::Despawned { entity }, format!("despawned {entity}"));
        }

        self.last_report = report;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
