use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLockReadGuard};

use mw_core::entity::SPAWNED_GROUP;
use mw_core::{EntityKind, World};
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::context::{SharedWorld, TickContext, TickInput};
use crate::error::SimResult;
use crate::event::EventLog;
use crate::executor::{InlineExecutor, TaskExecutor, ThreadExecutor};
use crate::graph::{CompiledSchedule, LaneLayout, SystemGraph};
use crate::scheduler::{ExecutionMode, Scheduler, StepReport};
use crate::system::System;

/// Bookkeeping for one completed tick, handed to every system's
/// [`post_step`](System::post_step).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSummary {
    /// Index of the finished tick.
    pub tick: u64,
    /// Sanitized delta; zero when time didn't advance.
    pub delta: f32,
    /// Mode the tick ran in.
    pub mode: ExecutionMode,
    /// Systems that completed.
    pub systems_run: usize,
    /// Checkpoints each lane passed. Zero in sequential mode.
    pub checkpoints_passed: usize,
    /// Live entities per kind, keyed by the kind's display name.
    pub entity_counts: BTreeMap<String, usize>,
    /// Live entities overall.
    pub total_entities: usize,
    /// Entities owned by the spawn manager.
    pub tracked_entities: usize,
    /// Microbes that have a cell body.
    pub cells: usize,
    /// Simulated seconds since the start.
    pub elapsed: f64,
}

/// The top-level simulation orchestrator.
///
/// Owns the world, clock, event log and scheduler. Each call to
/// [`run_step`](Simulation::run_step) is one fixed step: both lanes run to
/// completion, then every system gets a `post_step` call.
pub struct Simulation {
    world: SharedWorld,
    clock: SimClock,
    events: Mutex<EventLog>,
    scheduler: Scheduler,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// The executor `config` asks for: inline for zero workers, threads otherwise.
pub fn executor_for(config: &SimConfig) -> Arc<dyn TaskExecutor> {
    match config.workers {
        Some(0) => Arc::new(InlineExecutor),
        Some(workers) => Arc::new(ThreadExecutor::with_workers(workers)),
        None => Arc::new(ThreadExecutor::new()),
    }
}

impl Simulation {
    /// Compile `graph` automatically and build a simulation around `world`.
    pub fn new(world: World, config: &SimConfig, graph: SystemGraph) -> SimResult<Self> {
        let schedule = graph.compile()?;
        Self::with_schedule(world, config, graph, schedule, executor_for(config))
    }

    /// Like [`new`](Simulation::new), but with a hand-written lane layout.
    pub fn with_layout(
        world: World,
        config: &SimConfig,
        graph: SystemGraph,
        layout: &LaneLayout,
    ) -> SimResult<Self> {
        let schedule = graph.compile_with_layout(layout)?;
        Self::with_schedule(world, config, graph, schedule, executor_for(config))
    }

    /// Build from an already compiled schedule and an explicit executor.
    pub fn with_schedule(
        world: World,
        config: &SimConfig,
        graph: SystemGraph,
        schedule: CompiledSchedule,
        executor: Arc<dyn TaskExecutor>,
    ) -> SimResult<Self> {
        config.validate()?;
        let scheduler = Scheduler::new(graph, schedule, executor, config.execution)?;
        Ok(Self {
            world: SharedWorld::new(world),
            clock: SimClock::new(),
            events: Mutex::new(EventLog::new(config.max_events)),
            scheduler,
        })
    }

    /// Advance the simulation by one step of `delta` seconds.
    ///
    /// Zero, negative or NaN deltas still count as a tick: systems run with
    /// a zero delta and `post_step` is called as usual. If a system fails,
    /// the rest of the tick is skipped and the error returned; changes made
    /// before the failure are kept.
    pub fn run_step(&mut self, delta: f32, input: &TickInput) -> SimResult<TickSummary> {
        let (tick, delta) = self.clock.advance(delta);
        debug!(tick, delta, mode = %self.scheduler.mode(), "tick start");

        let report = {
            let ctx = TickContext::new(tick, delta, &self.world, input, &self.events);
            self.scheduler.run_step(&ctx)
        }
        .inspect_err(|e| warn!(tick, error = %e, "tick aborted"))?;

        let world = self.world.read()?;
        let summary = self.summarize(tick, delta, report, &world);
        for system in self.scheduler.systems_mut() {
            system.post_step(&world, &summary);
        }

        debug!(
            tick,
            systems = summary.systems_run,
            entities = summary.total_entities,
            tracked = summary.tracked_entities,
            "tick end"
        );
        Ok(summary)
    }

    /// Run `ticks` steps with the same delta and input.
    pub fn run(&mut self, ticks: u64, delta: f32, input: &TickInput) -> SimResult<()> {
        for _ in 0..ticks {
            self.run_step(delta, input)?;
        }
        Ok(())
    }

    fn summarize(&self, tick: u64, delta: f32, report: StepReport, world: &World) -> TickSummary {
        let entity_counts = world
            .entity_counts_by_kind()
            .into_iter()
            .map(|(kind, count)| (kind.to_string(), count))
            .collect();
        let cells = world
            .query()
            .kind(EntityKind::Microbe)
            .with(|c| c.cell.is_some())
            .count();
        TickSummary {
            tick,
            delta,
            mode: self.scheduler.mode(),
            systems_run: report.systems_run,
            checkpoints_passed: report.checkpoints_passed,
            entity_counts,
            total_entities: world.entity_count(),
            tracked_entities: world.group_len(SPAWNED_GROUP),
            cells,
            elapsed: self.clock.elapsed(),
        }
    }

    /// Read access to the world between ticks.
    pub fn world(&self) -> SimResult<RwLockReadGuard<'_, World>> {
        self.world.read()
    }

    /// Direct access to the world between ticks.
    pub fn world_mut(&mut self) -> SimResult<&mut World> {
        self.world.get_mut()
    }

    /// Extract the world, consuming the simulation.
    pub fn into_world(self) -> SimResult<World> {
        self.world.into_inner()
    }

    /// The event log.
    pub fn events(&self) -> MutexGuard<'_, EventLog> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The scheduler running the systems.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The compiled lane plan.
    pub fn schedule(&self) -> &CompiledSchedule {
        self.scheduler.schedule()
    }

    /// Threaded or sequential.
    pub fn mode(&self) -> ExecutionMode {
        self.scheduler.mode()
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Ticks completed so far.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.scheduler.get_system::<T>()
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.scheduler.get_system_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use mw_core::component::{MotionComponent, TimedLifeComponent};
    use mw_core::{Entity, Vec3};

    use super::*;
    use crate::config::ExecutionPreference;
    use crate::context::TickContext;
    use crate::error::SimError;
    use crate::event::SimEventKind;
    use crate::graph::SystemNode;
    use crate::spawn::SpawnSystem;
    use crate::systems::{
        CellCountingSystem, MovementSystem, TimedLifeSystem, standard_catalog, standard_graph,
        standard_layout, standard_spawn_system,
    };

    fn sequential() -> SimConfig {
        SimConfig::default().with_execution(ExecutionPreference::Sequential)
    }

    fn standard(config: &SimConfig) -> Simulation {
        let catalog = standard_catalog().unwrap();
        let spawn = standard_spawn_system(config, &catalog).unwrap();
        Simulation::new(World::new(), config, standard_graph(config, spawn)).unwrap()
    }

    #[derive(Debug, Default)]
    struct PostStepRecorder {
        updates: usize,
        summaries: Vec<(u64, f32)>,
    }

    impl System for PostStepRecorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn update(&mut self, _ctx: &TickContext<'_>) -> SimResult<()> {
            self.updates += 1;
            Ok(())
        }
        fn post_step(&mut self, _world: &World, summary: &TickSummary) {
            self.summaries.push((summary.tick, summary.delta));
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[test]
    fn standard_session_spawns_around_player() {
        let mut sim = standard(&sequential());
        let summary = sim.run_step(0.1, &TickInput::at(Vec3::ZERO)).unwrap();

        assert_eq!(summary.tick, 1);
        assert_eq!(summary.systems_run, 6);
        assert_eq!(summary.mode, ExecutionMode::Sequential);
        assert!(summary.tracked_entities > 0);
        assert_eq!(summary.tracked_entities, summary.total_entities);
        let spawn_events = sim
            .events()
            .count_where(|kind| matches!(kind, SimEventKind::SpawnEvent { .. }));
        assert_eq!(spawn_events, 9);
    }

    #[test]
    fn post_step_runs_for_zero_delta_ticks() {
        let mut graph = SystemGraph::new();
        graph.add(SystemNode::main("recorder"), PostStepRecorder::default());
        let mut sim = Simulation::new(World::new(), &sequential(), graph).unwrap();

        sim.run_step(0.5, &TickInput::default()).unwrap();
        sim.run_step(0.0, &TickInput::default()).unwrap();
        sim.run_step(f32::NAN, &TickInput::default()).unwrap();

        let recorder = sim.get_system::<PostStepRecorder>().unwrap();
        assert_eq!(recorder.updates, 3);
        assert_eq!(recorder.summaries, vec![(1, 0.5), (2, 0.0), (3, 0.0)]);
        assert_eq!(sim.clock().elapsed(), 0.5);
    }

    #[test]
    fn cell_counting_sees_spawned_microbes() {
        let mut sim = standard(&sequential());
        let input = TickInput::at(Vec3::ZERO);
        sim.run(20, 0.1, &input).unwrap();
        let summary = sim.run_step(0.0, &input).unwrap();
        let counter = sim.get_system::<CellCountingSystem>().unwrap();
        assert_eq!(counter.last_tick(), Some(21));
        assert_eq!(counter.last_count(), summary.cells);
    }

    #[test]
    fn hand_layout_runs_with_trailing_checkpoint() {
        let config = SimConfig::default().with_workers(1);
        let catalog = standard_catalog().unwrap();
        let spawn = standard_spawn_system(&config, &catalog).unwrap();
        let graph = standard_graph(&config, spawn);
        let mut sim =
            Simulation::with_layout(World::new(), &config, graph, &standard_layout()).unwrap();
        assert_eq!(sim.mode(), ExecutionMode::Threaded);

        let summary = sim.run_step(0.1, &TickInput::at(Vec3::ZERO)).unwrap();
        assert_eq!(summary.checkpoints_passed, 4);
        assert_eq!(summary.systems_run, 6);
    }

    #[test]
    fn zero_workers_fall_back_to_sequential() {
        let sim = standard(&SimConfig::default().with_workers(0));
        assert_eq!(sim.mode(), ExecutionMode::Sequential);
    }

    #[test]
    fn forced_threading_without_workers_is_rejected() {
        let config = SimConfig::default()
            .with_workers(0)
            .with_execution(ExecutionPreference::Threaded);
        let result = Simulation::new(World::new(), &config, SystemGraph::new());
        assert!(matches!(
            result,
            Err(SimError::Schedule(crate::error::ScheduleError::NoWorkers))
        ));
    }

    #[test]
    fn movement_and_timed_life_share_a_world() {
        let mut world = World::new();
        let mut puff = Entity::new(EntityKind::CompoundCloud, "puff");
        puff.components.motion = Some(MotionComponent {
            velocity: Vec3::new(1.0, 0.0, 0.0),
        });
        puff.components.timed_life = Some(TimedLifeComponent { remaining: 1.0 });
        let id = world.add_entity(puff).unwrap();

        let mut graph = SystemGraph::new();
        graph
            .add(SystemNode::main("movement"), MovementSystem::default())
            .add(
                SystemNode::background("timed_life").after("movement"),
                TimedLifeSystem::new(),
            );
        let mut sim = Simulation::new(world, &SimConfig::default().with_workers(1), graph).unwrap();

        sim.run_step(0.5, &TickInput::default()).unwrap();
        assert_eq!(sim.world().unwrap().get_entity(id).unwrap().position.x, 0.5);

        sim.run_step(0.5, &TickInput::default()).unwrap();
        assert!(!sim.world().unwrap().contains(id));
        assert_eq!(sim.events().events_for_entity(id).len(), 1);
    }

    #[test]
    fn spawn_system_is_reachable_for_respawn() {
        let mut sim = standard(&sequential());
        sim.get_system_mut::<SpawnSystem>()
            .unwrap()
            .respawn_player(Vec3::new(5000.0, 0.0, 5000.0));

        let summary = sim
            .run_step(0.1, &TickInput::at(Vec3::new(5000.0, 0.0, 5000.0)))
            .unwrap();
        assert_eq!(summary.tracked_entities, 0);
        assert_eq!(sim.into_world().unwrap().entity_count(), 0);
    }
}
