//! Declarative system graph and its compilation into a two-lane plan.
//!
//! A [`SystemGraph`] lists every system with the lane it must run on and
//! its ordering constraints. Compiling it yields a [`CompiledSchedule`]:
//! the linear step list of each lane, with numbered checkpoints where the
//! lanes rendezvous. Systems on different lanes between the same pair of
//! checkpoints have no ordering relative to each other.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};
use crate::system::System;

/// One of the two execution lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// The calling thread.
    Main,
    /// The worker thread.
    Background,
}

impl Lane {
    /// Both lanes, main first.
    pub const ALL: [Lane; 2] = [Lane::Main, Lane::Background];
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Background => write!(f, "background"),
        }
    }
}

/// Where a system runs and what it must run after or before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemNode {
    /// Unique system name.
    pub name: String,
    /// Lane the system runs on.
    pub lane: Lane,
    /// Systems that must finish before this one starts.
    pub runs_after: Vec<String>,
    /// Systems that may only start after this one finished.
    pub runs_before: Vec<String>,
    /// Lowest segment automatic placement may use. Explicit layouts ignore it.
    pub earliest_slot: usize,
}

impl SystemNode {
    /// A node without constraints.
    pub fn new(name: impl Into<String>, lane: Lane) -> Self {
        Self {
            name: name.into(),
            lane,
            runs_after: Vec::new(),
            runs_before: Vec::new(),
            earliest_slot: 0,
        }
    }

    /// A node on the main lane.
    pub fn main(name: impl Into<String>) -> Self {
        Self::new(name, Lane::Main)
    }

    /// A node on the background lane.
    pub fn background(name: impl Into<String>) -> Self {
        Self::new(name, Lane::Background)
    }

    /// This system must run after `other`.
    pub fn after(mut self, other: impl Into<String>) -> Self {
        self.runs_after.push(other.into());
        self
    }

    /// This system must run before `other`.
    pub fn before(mut self, other: impl Into<String>) -> Self {
        self.runs_before.push(other.into());
        self
    }

    /// Keep automatic placement at or after segment `slot`.
    pub fn not_before_slot(mut self, slot: usize) -> Self {
        self.earliest_slot = slot;
        self
    }
}

/// A step in a compiled lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStep {
    /// Run the named system.
    System(String),
    /// Meet the other lane at this checkpoint index.
    Checkpoint(usize),
}

/// A step in a hand-written lane layout. Checkpoints are numbered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStep {
    /// Run the named system.
    System(String),
    /// Meet the other lane before continuing.
    Checkpoint,
}

/// A hand-written assignment of systems to lane positions.
///
/// ```
/// use mw_simulation::graph::{Lane, LaneLayout};
///
/// let layout = LaneLayout::new()
///     .segment(Lane::Main, ["fetch", "mucocyst"])
///     .segment(Lane::Background, ["absorb"])
///     .system(Lane::Main, "movement")
///     .system(Lane::Background, "venting");
/// assert_eq!(layout.checkpoints(Lane::Main), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLayout {
    /// Steps of the main lane.
    #[serde(default)]
    pub main: Vec<LayoutStep>,
    /// Steps of the background lane.
    #[serde(default)]
    pub background: Vec<LayoutStep>,
}

impl LaneLayout {
    /// An empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps of one lane.
    pub fn steps(&self, lane: Lane) -> &[LayoutStep] {
        match lane {
            Lane::Main => &self.main,
            Lane::Background => &self.background,
        }
    }

    fn steps_mut(&mut self, lane: Lane) -> &mut Vec<LayoutStep> {
        match lane {
            Lane::Main => &mut self.main,
            Lane::Background => &mut self.background,
        }
    }

    /// Append a system to `lane`.
    pub fn system(mut self, lane: Lane, name: impl Into<String>) -> Self {
        self.steps_mut(lane).push(LayoutStep::System(name.into()));
        self
    }

    /// Append a checkpoint to `lane`.
    pub fn checkpoint(mut self, lane: Lane) -> Self {
        self.steps_mut(lane).push(LayoutStep::Checkpoint);
        self
    }

    /// Append systems followed by a checkpoint.
    pub fn segment<I, S>(mut self, lane: Lane, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = self.steps_mut(lane);
        steps.extend(names.into_iter().map(|n| LayoutStep::System(n.into())));
        steps.push(LayoutStep::Checkpoint);
        self
    }

    /// Checkpoints on one lane.
    pub fn checkpoints(&self, lane: Lane) -> usize {
        self.steps(lane)
            .iter()
            .filter(|s| matches!(s, LayoutStep::Checkpoint))
            .count()
    }
}

/// The lanes' step lists, ready to be executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledSchedule {
    main: Vec<PlanStep>,
    background: Vec<PlanStep>,
    checkpoints: usize,
}

impl CompiledSchedule {
    /// Steps of one lane in run order.
    pub fn lane(&self, lane: Lane) -> &[PlanStep] {
        match lane {
            Lane::Main => &self.main,
            Lane::Background => &self.background,
        }
    }

    /// Checkpoints each lane passes per tick.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints
    }

    /// Segments per lane, one more than the checkpoints.
    pub fn segment_count(&self) -> usize {
        self.checkpoints + 1
    }

    /// Systems across both lanes.
    pub fn system_count(&self) -> usize {
        Lane::ALL
            .iter()
            .map(|lane| self.lane(*lane).len())
            .sum::<usize>()
            - 2 * self.checkpoints
    }

    /// System names of a lane, grouped by segment.
    pub fn segments(&self, lane: Lane) -> Vec<Vec<&str>> {
        let mut segments = vec![Vec::new(); self.segment_count()];
        let mut current = 0;
        for step in self.lane(lane) {
            match step {
                PlanStep::System(name) => segments[current].push(name.as_str()),
                PlanStep::Checkpoint(_) => current += 1,
            }
        }
        segments
    }

    /// The single-lane order used when running sequentially: segment by
    /// segment, main lane first.
    pub fn sequential_order(&self) -> Vec<(Lane, &str)> {
        let main = self.segments(Lane::Main);
        let background = self.segments(Lane::Background);
        main.into_iter()
            .zip(background)
            .flat_map(|(m, b)| {
                m.into_iter()
                    .map(|name| (Lane::Main, name))
                    .chain(b.into_iter().map(|name| (Lane::Background, name)))
            })
            .collect()
    }
}

impl CompiledSchedule {
    /// One line per lane, segments separated by `|`, empty ones shown as `-`.
    pub fn describe(&self) -> String {
        Lane::ALL
            .iter()
            .map(|&lane| {
                let segments: Vec<String> = self
                    .segments(lane)
                    .iter()
                    .map(|names| match names.as_slice() {
                        [] => "-".to_string(),
                        names => names.join(", "),
                    })
                    .collect();
                format!("{:<10} {}", lane.to_string(), segments.join(" | "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The full set of systems with their placement rules.
#[derive(Debug, Default)]
pub struct SystemGraph {
    entries: Vec<(SystemNode, Box<dyn System>)>,
}

impl SystemGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system. Within a lane, systems keep registration order.
    pub fn add<S: System + 'static>(&mut self, node: SystemNode, system: S) -> &mut Self {
        self.add_boxed(node, Box::new(system))
    }

    /// Register an already boxed system.
    pub fn add_boxed(&mut self, node: SystemNode, system: Box<dyn System>) -> &mut Self {
        self.entries.push((node, system));
        self
    }

    /// Registered nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &SystemNode> {
        self.entries.iter().map(|(node, _)| node)
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(SystemNode, Box<dyn System>)> {
        self.entries
    }

    /// Place every system automatically.
    ///
    /// Each system gets the lowest segment that respects its lane order and
    /// constraints: a constraint on the same lane only needs lane order, one
    /// across lanes needs a checkpoint in between.
    pub fn compile(&self) -> ScheduleResult<CompiledSchedule> {
        let index = self.index()?;
        let constraints = self.constraints(&index)?;
        let nodes: Vec<&SystemNode> = self.nodes().collect();
        let n = nodes.len();

        let mut edges: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        for lane in Lane::ALL {
            let members: Vec<usize> = (0..n).filter(|&i| nodes[i].lane == lane).collect();
            for pair in members.windows(2) {
                edges[pair[0]].push((pair[1], 0));
                indegree[pair[1]] += 1;
            }
        }
        for &(before, after) in &constraints {
            let weight = usize::from(nodes[before].lane != nodes[after].lane);
            edges[before].push((after, weight));
            indegree[after] += 1;
        }

        let mut slot: Vec<usize> = nodes.iter().map(|n| n.earliest_slot).collect();
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut placed = 0;
        while let Some(current) = queue.pop_front() {
            placed += 1;
            for &(next, weight) in &edges[current] {
                slot[next] = slot[next].max(slot[current] + weight);
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        if placed < n {
            let stuck = (0..n)
                .filter(|&i| indegree[i] > 0)
                .map(|i| nodes[i].name.clone())
                .collect();
            return Err(ScheduleError::ContradictoryOrdering(stuck));
        }

        let segments = slot.iter().max().map_or(1, |max| max + 1);
        let mut lanes = [Vec::new(), Vec::new()];
        for (lane_index, lane) in Lane::ALL.into_iter().enumerate() {
            let steps = &mut lanes[lane_index];
            for segment in 0..segments {
                steps.extend(
                    (0..n)
                        .filter(|&i| nodes[i].lane == lane && slot[i] == segment)
                        .map(|i| PlanStep::System(nodes[i].name.clone())),
                );
                if segment + 1 < segments {
                    steps.push(PlanStep::Checkpoint(segment));
                }
            }
        }
        let [main, background] = lanes;
        Ok(CompiledSchedule {
            main,
            background,
            checkpoints: segments - 1,
        })
    }

    /// Check a hand-written layout against the graph and compile it.
    pub fn compile_with_layout(&self, layout: &LaneLayout) -> ScheduleResult<CompiledSchedule> {
        let index = self.index()?;
        let constraints = self.constraints(&index)?;

        let main_checkpoints = layout.checkpoints(Lane::Main);
        let background_checkpoints = layout.checkpoints(Lane::Background);
        if main_checkpoints != background_checkpoints {
            return Err(ScheduleError::AsymmetricCheckpoints {
                main: main_checkpoints,
                background: background_checkpoints,
            });
        }

        let nodes: Vec<&SystemNode> = self.nodes().collect();
        // (position within lane, segment) of every placed system
        let mut placement: Vec<Option<(usize, usize)>> = vec![None; nodes.len()];
        let mut lanes = [Vec::new(), Vec::new()];

        for (lane_index, lane) in Lane::ALL.into_iter().enumerate() {
            let steps = &mut lanes[lane_index];
            let mut segment = 0;
            for (position, step) in layout.steps(lane).iter().enumerate() {
                match step {
                    LayoutStep::Checkpoint => {
                        steps.push(PlanStep::Checkpoint(segment));
                        segment += 1;
                    }
                    LayoutStep::System(name) => {
                        let &i = index
                            .get(name.as_str())
                            .ok_or_else(|| ScheduleError::UnknownSystem(name.clone()))?;
                        if placement[i].is_some() {
                            return Err(ScheduleError::DuplicateInLayout(name.clone()));
                        }
                        if nodes[i].lane != lane {
                            return Err(ScheduleError::WrongLane {
                                system: name.clone(),
                                declared: nodes[i].lane,
                                found: lane,
                            });
                        }
                        placement[i] = Some((position, segment));
                        steps.push(PlanStep::System(name.clone()));
                    }
                }
            }
        }

        let mut placed = Vec::with_capacity(nodes.len());
        for (i, p) in placement.into_iter().enumerate() {
            placed.push(p.ok_or_else(|| ScheduleError::MissingFromLayout(nodes[i].name.clone()))?);
        }

        for &(before, after) in &constraints {
            let (before_pos, before_segment) = placed[before];
            let (after_pos, after_segment) = placed[after];
            let satisfied = if nodes[before].lane == nodes[after].lane {
                before_pos < after_pos
            } else {
                before_segment < after_segment
            };
            if !satisfied {
                return Err(ScheduleError::ConstraintViolated {
                    before: nodes[before].name.clone(),
                    after: nodes[after].name.clone(),
                });
            }
        }

        let [main, background] = lanes;
        Ok(CompiledSchedule {
            main,
            background,
            checkpoints: main_checkpoints,
        })
    }

    fn index(&self) -> ScheduleResult<HashMap<&str, usize>> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for (i, node) in self.nodes().enumerate() {
            if index.insert(node.name.as_str(), i).is_some() {
                return Err(ScheduleError::DuplicateSystem(node.name.clone()));
            }
        }
        Ok(index)
    }

    /// All constraints as `(runs first, runs second)` index pairs.
    fn constraints(&self, index: &HashMap<&str, usize>) -> ScheduleResult<Vec<(usize, usize)>> {
        let lookup = |name: &String| {
            index
                .get(name.as_str())
                .copied()
                .ok_or_else(|| ScheduleError::UnknownSystem(name.clone()))
        };
        let mut pairs = Vec::new();
        for (i, node) in self.nodes().enumerate() {
            for other in &node.runs_after {
                pairs.push((lookup(other)?, i));
            }
            for other in &node.runs_before {
                pairs.push((i, lookup(other)?));
            }
        }
        if let Some(&(a, _)) = pairs.iter().find(|(a, b)| a == b) {
            let name = self.entries[a].0.name.clone();
            return Err(ScheduleError::ContradictoryOrdering(vec![name]));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TickContext;
    use crate::error::SimResult;

    #[derive(Debug)]
    struct Stub(&'static str);

    impl System for Stub {
        fn name(&self) -> &str {
            self.0
        }
        fn update(&mut self, _ctx: &TickContext<'_>) -> SimResult<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn graph(nodes: Vec<SystemNode>) -> SystemGraph {
        let mut graph = SystemGraph::new();
        for node in nodes {
            graph.add(node, Stub("stub"));
        }
        graph
    }

    #[test]
    fn independent_lanes_share_one_segment() {
        let plan = graph(vec![
            SystemNode::main("a"),
            SystemNode::main("b"),
            SystemNode::background("c"),
        ])
        .compile()
        .unwrap();
        assert_eq!(plan.checkpoint_count(), 0);
        assert_eq!(plan.segments(Lane::Main), vec![vec!["a", "b"]]);
        assert_eq!(plan.segments(Lane::Background), vec![vec!["c"]]);
        assert_eq!(plan.system_count(), 3);
    }

    #[test]
    fn cross_lane_dependency_adds_checkpoint() {
        let plan = graph(vec![
            SystemNode::background("fetch"),
            SystemNode::main("mucocyst").after("fetch"),
            SystemNode::background("movement").after("mucocyst"),
        ])
        .compile()
        .unwrap();

        assert_eq!(plan.checkpoint_count(), 2);
        assert_eq!(
            plan.lane(Lane::Main),
            &[
                PlanStep::Checkpoint(0),
                PlanStep::System("mucocyst".into()),
                PlanStep::Checkpoint(1),
            ]
        );
        assert_eq!(
            plan.sequential_order(),
            vec![
                (Lane::Background, "fetch"),
                (Lane::Main, "mucocyst"),
                (Lane::Background, "movement"),
            ]
        );
        assert_eq!(
            plan.describe(),
            "main       - | mucocyst | -\nbackground fetch | - | movement"
        );
    }

    #[test]
    fn same_lane_constraint_needs_no_checkpoint() {
        let plan = graph(vec![
            SystemNode::main("fetch"),
            SystemNode::main("mucocyst").after("fetch").before("move"),
            SystemNode::main("move"),
        ])
        .compile()
        .unwrap();
        assert_eq!(plan.checkpoint_count(), 0);
    }

    #[test]
    fn earliest_slot_pushes_system_later() {
        let plan = graph(vec![
            SystemNode::main("a"),
            SystemNode::background("b").not_before_slot(2),
        ])
        .compile()
        .unwrap();
        assert_eq!(plan.checkpoint_count(), 2);
        assert_eq!(
            plan.segments(Lane::Background),
            vec![vec![], vec![], vec!["b"]]
        );
    }

    #[test]
    fn backwards_constraint_in_lane_is_contradictory() {
        let err = graph(vec![
            SystemNode::main("a").after("b"),
            SystemNode::main("b"),
        ])
        .compile()
        .unwrap_err();
        assert!(matches!(err, ScheduleError::ContradictoryOrdering(_)));
    }

    #[test]
    fn cross_lane_cycle_is_contradictory() {
        let err = graph(vec![
            SystemNode::main("a").after("b"),
            SystemNode::background("b").after("a"),
        ])
        .compile()
        .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::ContradictoryOrdering(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn self_constraint_is_contradictory() {
        let err = graph(vec![SystemNode::main("a").after("a")])
            .compile()
            .unwrap_err();
        assert_eq!(err, ScheduleError::ContradictoryOrdering(vec!["a".into()]));
    }

    #[test]
    fn unknown_and_duplicate_names() {
        let err = graph(vec![SystemNode::main("a").after("ghost")])
            .compile()
            .unwrap_err();
        assert_eq!(err, ScheduleError::UnknownSystem("ghost".into()));

        let err = graph(vec![SystemNode::main("a"), SystemNode::background("a")])
            .compile()
            .unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateSystem("a".into()));
    }

    #[test]
    fn layout_with_asymmetric_checkpoints_is_rejected() {
        let g = graph(vec![SystemNode::main("a"), SystemNode::background("b")]);
        let mut layout = LaneLayout::new()
            .system(Lane::Main, "a")
            .system(Lane::Background, "b");
        for _ in 0..8 {
            layout = layout.checkpoint(Lane::Main).checkpoint(Lane::Background);
        }
        layout = layout.checkpoint(Lane::Main);

        assert_eq!(
            g.compile_with_layout(&layout).unwrap_err(),
            ScheduleError::AsymmetricCheckpoints {
                main: 9,
                background: 8
            }
        );
    }

    #[test]
    fn layout_must_place_every_system_once_in_its_lane() {
        let g = graph(vec![SystemNode::main("a"), SystemNode::background("b")]);

        let missing = LaneLayout::new().system(Lane::Main, "a");
        assert_eq!(
            g.compile_with_layout(&missing).unwrap_err(),
            ScheduleError::MissingFromLayout("b".into())
        );

        let twice = LaneLayout::new()
            .system(Lane::Main, "a")
            .system(Lane::Main, "a")
            .system(Lane::Background, "b");
        assert_eq!(
            g.compile_with_layout(&twice).unwrap_err(),
            ScheduleError::DuplicateInLayout("a".into())
        );

        let wrong = LaneLayout::new()
            .system(Lane::Main, "a")
            .system(Lane::Main, "b");
        assert!(matches!(
            g.compile_with_layout(&wrong).unwrap_err(),
            ScheduleError::WrongLane { .. }
        ));
    }

    #[test]
    fn layout_cross_lane_constraint_needs_checkpoint() {
        let g = graph(vec![
            SystemNode::main("fetch"),
            SystemNode::background("mucocyst").after("fetch"),
        ]);

        let same_segment = LaneLayout::new()
            .system(Lane::Main, "fetch")
            .system(Lane::Background, "mucocyst");
        assert_eq!(
            g.compile_with_layout(&same_segment).unwrap_err(),
            ScheduleError::ConstraintViolated {
                before: "fetch".into(),
                after: "mucocyst".into()
            }
        );

        let separated = LaneLayout::new()
            .segment(Lane::Main, ["fetch"])
            .checkpoint(Lane::Background)
            .system(Lane::Background, "mucocyst");
        let plan = g.compile_with_layout(&separated).unwrap();
        assert_eq!(plan.checkpoint_count(), 1);
        assert_eq!(
            plan.sequential_order(),
            vec![(Lane::Main, "fetch"), (Lane::Background, "mucocyst")]
        );
    }

    #[test]
    fn layout_deserializes_from_json() {
        let layout: LaneLayout = serde_json::from_str(
            r#"{ "main": [{ "system": "a" }, "checkpoint"], "background": ["checkpoint"] }"#,
        )
        .unwrap();
        assert_eq!(layout.checkpoints(Lane::Main), 1);
        assert_eq!(layout.checkpoints(Lane::Background), 1);
    }
}
