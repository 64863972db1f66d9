use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ExecutionPreference;
use crate::context::TickContext;
use crate::error::{ScheduleError, ScheduleResult, SimError, SimResult};
use crate::executor::TaskExecutor;
use crate::graph::{CompiledSchedule, Lane, PlanStep, SystemGraph};
use crate::rendezvous::{AbortOnUnwind, Rendezvous, RendezvousError};
use crate::system::System;

/// How ticks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Background lane on a worker, main lane on the caller.
    Threaded,
    /// Every system on the caller, in the plan's sequential order.
    Sequential,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threaded => write!(f, "threaded"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// What one call to [`Scheduler::run_step`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Systems that completed.
    pub systems_run: usize,
    /// Checkpoints passed by each lane. Zero in sequential mode.
    pub checkpoints_passed: usize,
}

#[derive(Debug, Clone, Copy)]
enum LaneStep {
    Run(usize),
    Checkpoint(usize),
}

#[derive(Debug, Default)]
struct LaneRuntime {
    steps: Vec<LaneStep>,
    systems: Vec<Box<dyn System>>,
}

impl LaneRuntime {
    fn run(
        &mut self,
        lane: Lane,
        ctx: &TickContext<'_>,
        rendezvous: &Rendezvous,
    ) -> SimResult<StepReport> {
        let _guard = AbortOnUnwind(rendezvous);
        let result = self.run_steps(lane, ctx, rendezvous);
        if result.is_err() {
            rendezvous.abort();
        }
        result
    }

    fn run_steps(
        &mut self,
        lane: Lane,
        ctx: &TickContext<'_>,
        rendezvous: &Rendezvous,
    ) -> SimResult<StepReport> {
        let mut report = StepReport::default();
        for step in &self.steps {
            match *step {
                LaneStep::Run(index) => {
                    run_system(self.systems[index].as_mut(), ctx)?;
                    report.systems_run += 1;
                }
                LaneStep::Checkpoint(checkpoint) => {
                    rendezvous.wait(checkpoint).map_err(|e| match e {
                        RendezvousError::Aborted => SimError::LaneAborted { lane, checkpoint },
                        RendezvousError::Mismatch { expected, found } => {
                            ScheduleError::CheckpointMismatch { expected, found }.into()
                        }
                    })?;
                    report.checkpoints_passed += 1;
                }
            }
        }
        Ok(report)
    }
}

fn run_system(system: &mut dyn System, ctx: &TickContext<'_>) -> SimResult<()> {
    system.update(ctx).inspect_err(|e| {
        warn!(system = system.name(), tick = ctx.tick(), error = %e, "system failed, aborting tick");
    })
}

/// Runs a compiled plan once per tick, threaded or sequentially.
pub struct Scheduler {
    schedule: CompiledSchedule,
    main: LaneRuntime,
    background: LaneRuntime,
    sequential: Vec<(Lane, usize)>,
    executor: Arc<dyn TaskExecutor>,
    mode: ExecutionMode,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("mode", &self.mode)
            .field("systems", &self.schedule.system_count())
            .field("checkpoints", &self.schedule.checkpoint_count())
            .field("executor", &self.executor)
            .finish()
    }
}

impl Scheduler {
    /// Distribute the graph's systems over the lanes of `schedule`.
    ///
    /// `schedule` must have been compiled from `graph`.
    pub fn new(
        graph: SystemGraph,
        schedule: CompiledSchedule,
        executor: Arc<dyn TaskExecutor>,
        preference: ExecutionPreference,
    ) -> ScheduleResult<Self> {
        let mut by_name: HashMap<String, Box<dyn System>> = HashMap::new();
        for (node, system) in graph.into_entries() {
            if by_name.insert(node.name.clone(), system).is_some() {
                return Err(ScheduleError::DuplicateSystem(node.name));
            }
        }

        let mut main = LaneRuntime::default();
        let mut background = LaneRuntime::default();
        for (lane, runtime) in [(Lane::Main, &mut main), (Lane::Background, &mut background)] {
            for step in schedule.lane(lane) {
                match step {
                    PlanStep::System(name) => {
                        let system = by_name
                            .remove(name)
                            .ok_or_else(|| ScheduleError::UnknownSystem(name.clone()))?;
                        runtime.steps.push(LaneStep::Run(runtime.systems.len()));
                        runtime.systems.push(system);
                    }
                    PlanStep::Checkpoint(c) => runtime.steps.push(LaneStep::Checkpoint(*c)),
                }
            }
        }
        if let Some(name) = by_name.into_keys().next() {
            return Err(ScheduleError::MissingFromLayout(name));
        }

        let sequential = sequential_indices(&schedule);
        let mode = select_mode(preference, executor.worker_count())?;
        info!(
            mode = %mode,
            workers = executor.worker_count(),
            systems = schedule.system_count(),
            checkpoints = schedule.checkpoint_count(),
            "system schedule ready"
        );

        Ok(Self {
            schedule,
            main,
            background,
            sequential,
            executor,
            mode,
        })
    }

    /// Threaded or sequential.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// The plan the lanes follow.
    pub fn schedule(&self) -> &CompiledSchedule {
        &self.schedule
    }

    /// Worker threads the executor reports.
    pub fn worker_count(&self) -> usize {
        self.executor.worker_count()
    }

    /// Run every system once.
    ///
    /// The first failing system aborts the rest of the tick. Work already
    /// done by other systems in this tick stays applied.
    pub fn run_step(&mut self, ctx: &TickContext<'_>) -> SimResult<StepReport> {
        match self.mode {
            ExecutionMode::Threaded => self.run_threaded(ctx),
            ExecutionMode::Sequential => self.run_sequential(ctx),
        }
    }

    fn run_sequential(&mut self, ctx: &TickContext<'_>) -> SimResult<StepReport> {
        for &(lane, index) in &self.sequential {
            let runtime = match lane {
                Lane::Main => &mut self.main,
                Lane::Background => &mut self.background,
            };
            run_system(runtime.systems[index].as_mut(), ctx)?;
        }
        Ok(StepReport {
            systems_run: self.sequential.len(),
            checkpoints_passed: 0,
        })
    }

    fn run_threaded(&mut self, ctx: &TickContext<'_>) -> SimResult<StepReport> {
        let rendezvous = Rendezvous::new();
        let Self {
            main,
            background,
            executor,
            ..
        } = self;

        let mut main_result = None;
        let mut background_result = None;
        executor
            .run_with_background(
                &mut || background_result = Some(background.run(Lane::Background, ctx, &rendezvous)),
                &mut || main_result = Some(main.run(Lane::Main, ctx, &rendezvous)),
            )
            .map_err(|e| SimError::system("scheduler", format!("background lane: {e}")))?;

        let mut aborted = None;
        let mut total = StepReport::default();
        for result in [main_result, background_result] {
            match result {
                Some(Ok(report)) => {
                    total.systems_run += report.systems_run;
                    total.checkpoints_passed = total.checkpoints_passed.max(report.checkpoints_passed);
                }
                Some(Err(e @ SimError::LaneAborted { .. })) => {
                    aborted.get_or_insert(e);
                }
                Some(Err(e)) => return Err(e),
                None => return Err(SimError::system("scheduler", "a lane did not run")),
            }
        }
        match aborted {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }

    /// Iterate over all systems, main lane first.
    pub fn systems(&self) -> impl Iterator<Item = &dyn System> {
        self.main
            .systems
            .iter()
            .chain(&self.background.systems)
            .map(|s| s.as_ref())
    }

    /// All systems, mutably, main lane first.
    pub fn systems_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn System>> {
        self.main
            .systems
            .iter_mut()
            .chain(self.background.systems.iter_mut())
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.systems().find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }
}

fn select_mode(preference: ExecutionPreference, workers: usize) -> ScheduleResult<ExecutionMode> {
    match preference {
        ExecutionPreference::Sequential => Ok(ExecutionMode::Sequential),
        ExecutionPreference::Threaded if workers == 0 => Err(ScheduleError::NoWorkers),
        ExecutionPreference::Threaded => Ok(ExecutionMode::Threaded),
        ExecutionPreference::Auto if workers == 0 => {
            info!("no worker threads available, falling back to sequential execution");
            Ok(ExecutionMode::Sequential)
        }
        ExecutionPreference::Auto => Ok(ExecutionMode::Threaded),
    }
}

/// Map the plan's sequential order onto per-lane system indices.
fn sequential_indices(schedule: &CompiledSchedule) -> Vec<(Lane, usize)> {
    let mut positions: HashMap<(Lane, &str), usize> = HashMap::new();
    for lane in Lane::ALL {
        let names = schedule.lane(lane).iter().filter_map(|step| match step {
            PlanStep::System(name) => Some(name.as_str()),
            PlanStep::Checkpoint(_) => None,
        });
        for (index, name) in names.enumerate() {
            positions.insert((lane, name), index);
        }
    }
    schedule
        .sequential_order()
        .into_iter()
        .filter_map(|key| positions.get(&key).map(|&index| (key.0, index)))
        .collect()
}
