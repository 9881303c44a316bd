//! Greedy multi-stream restoration scheduling.

use super::repair_set::RepairPlan;
use serde::Serialize;
use sira_core::{NodeIndex, SiraError, SiraResult, SystemModel};
use std::collections::HashMap;
use tracing::debug;

const TIME_EPS: f64 = 1e-9;

/// One scheduled repair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestorationTask {
    #[serde(skip)]
    pub node: NodeIndex,
    pub component_id: String,
    /// Output line that claimed the component
    pub line: String,
    pub duration: f64,
    pub start: f64,
    pub end: f64,
    /// 1-based wave number in queue order
    pub sequence: usize,
    /// 0-based stream the task ran on
    pub stream: usize,
    pub economic_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub stream_count: usize,
    pub start_offset: f64,
    pub tasks: Vec<RestorationTask>,
}

impl Schedule {
    /// Latest end time, or the start offset when nothing is scheduled.
    pub fn makespan(&self) -> f64 {
        self.tasks.iter().map(|t| t.end).fold(self.start_offset, f64::max)
    }

    pub fn tasks_on_stream(&self, stream: usize) -> impl Iterator<Item = &RestorationTask> {
        self.tasks.iter().filter(move |t| t.stream == stream)
    }

    pub fn task(&self, component_id: &str) -> Option<&RestorationTask> {
        self.tasks.iter().find(|t| t.component_id == component_id)
    }
}

/// Completion of one output line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRestoration {
    pub line: String,
    pub capacity_fraction: f64,
    pub completion_time: f64,
    pub feasible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityPoint {
    pub time: f64,
    /// Sum of capacity fractions of the lines restored by `time`
    pub capacity: f64,
    /// Restored capacity fraction per output line, in priority order
    pub line_capacity: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleOutcome {
    pub schedule: Schedule,
    pub lines: Vec<LineRestoration>,
    pub capacity_series: Vec<CapacityPoint>,
}

/// Stream slot assigned to a queued task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSlot {
    pub stream: usize,
    pub start: f64,
    pub end: f64,
}

/// List-schedule `(key, duration)` pairs in queue order onto `stream_count`
/// streams.
///
/// The first `stream_count` tasks start at `start_offset`, one per stream.
/// Every later task goes to the stream that frees up first; equal free times
/// go to the stream whose running task has the lowest key.
pub fn assign_streams(
    queue: &[(usize, f64)],
    stream_count: usize,
    start_offset: f64,
) -> Vec<StreamSlot> {
    // (free_at, key of the task occupying the stream)
    let mut streams: Vec<(f64, usize)> = Vec::with_capacity(stream_count);
    let mut slots = Vec::with_capacity(queue.len());
    for &(key, duration) in queue {
        let (stream, start) = if streams.len() < stream_count {
            streams.push((start_offset, key));
            (streams.len() - 1, start_offset)
        } else {
            let mut chosen = 0;
            for (i, &(free_at, occupant)) in streams.iter().enumerate().skip(1) {
                let (best_free, best_occupant) = streams[chosen];
                if free_at < best_free - TIME_EPS
                    || ((free_at - best_free).abs() <= TIME_EPS && occupant < best_occupant)
                {
                    chosen = i;
                }
            }
            (chosen, streams[chosen].0)
        };
        let end = start + duration;
        streams[stream] = (end, key);
        slots.push(StreamSlot { stream, start, end });
    }
    slots
}

pub struct RestorationScheduler<'a> {
    model: &'a SystemModel,
    restore_time_max: f64,
    time_step: f64,
    /// Position of each component in component-id order
    id_rank: Vec<usize>,
}

impl<'a> RestorationScheduler<'a> {
    pub fn new(model: &'a SystemModel, restore_time_max: f64, time_step: f64) -> SiraResult<Self> {
        if !(time_step > 0.0) {
            return Err(SiraError::Validation(format!(
                "capacity series step must be positive, got {time_step}"
            )));
        }
        let mut by_id: Vec<NodeIndex> =
            model.network().components().map(|(node, _)| node).collect();
        by_id.sort_by(|a, b| model.component(*a).id.cmp(&model.component(*b).id));
        let mut id_rank = vec![0; by_id.len()];
        for (rank, node) in by_id.into_iter().enumerate() {
            id_rank[node.index()] = rank;
        }
        Ok(Self {
            model,
            restore_time_max,
            time_step,
            id_rank,
        })
    }

    /// Schedule the claimed components of `plans` (priority order).
    ///
    /// `durations` and `economic_loss` are indexed by component. Uncosted
    /// components and components with zero duration are not scheduled.
    /// Equal durations and equal stream free times are ordered by component id.
    pub fn schedule(
        &self,
        plans: &[RepairPlan],
        durations: &[f64],
        economic_loss: &[f64],
        stream_count: usize,
        start_offset: f64,
    ) -> SiraResult<ScheduleOutcome> {
        let n = self.model.component_count();
        if durations.len() != n || economic_loss.len() != n {
            return Err(SiraError::Simulation(format!(
                "expected {n} durations and losses, got {} and {}",
                durations.len(),
                economic_loss.len()
            )));
        }
        if stream_count == 0 {
            return Err(SiraError::Validation("stream count must be at least 1".into()));
        }

        let mut queue: Vec<(NodeIndex, usize)> = Vec::new();
        for (line, plan) in plans.iter().enumerate() {
            let mut entries: Vec<NodeIndex> = plan
                .claimed
                .iter()
                .copied()
                .filter(|&node| self.model.is_costed(node) && durations[node.index()] > 0.0)
                .collect();
            entries.sort_by(|a, b| {
                durations[b.index()]
                    .total_cmp(&durations[a.index()])
                    .then(self.id_rank[a.index()].cmp(&self.id_rank[b.index()]))
            });
            queue.extend(entries.into_iter().map(|node| (node, line)));
        }

        let keyed: Vec<(usize, f64)> = queue
            .iter()
            .map(|&(node, _)| (self.id_rank[node.index()], durations[node.index()]))
            .collect();
        let slots = assign_streams(&keyed, stream_count, start_offset);

        let tasks: Vec<RestorationTask> = queue
            .iter()
            .zip(&slots)
            .enumerate()
            .map(|(position, (&(node, line), slot))| RestorationTask {
                node,
                component_id: self.model.component(node).id.clone(),
                line: plans[line].line_id.clone(),
                duration: durations[node.index()],
                start: slot.start,
                end: slot.end,
                sequence: position / stream_count + 1,
                stream: slot.stream,
                economic_loss: economic_loss[node.index()],
            })
            .collect();

        let end_of: HashMap<NodeIndex, f64> = tasks.iter().map(|t| (t.node, t.end)).collect();
        let lines: Vec<LineRestoration> = plans
            .iter()
            .map(|plan| {
                let completion_time = if plan.feasible {
                    plan.nodes
                        .iter()
                        .filter_map(|node| end_of.get(node).copied())
                        .fold(0.0, f64::max)
                } else {
                    self.restore_time_max
                };
                LineRestoration {
                    line: plan.line_id.clone(),
                    capacity_fraction: self.model.outputs()[plan.line].capacity_fraction,
                    completion_time,
                    feasible: plan.feasible,
                }
            })
            .collect();

        let capacity_series = self.capacity_series(&lines);
        let schedule = Schedule {
            stream_count,
            start_offset,
            tasks,
        };
        debug!(
            streams = stream_count,
            tasks = schedule.tasks.len(),
            makespan = schedule.makespan(),
            "restoration schedule built"
        );
        Ok(ScheduleOutcome {
            schedule,
            lines,
            capacity_series,
        })
    }

    /// Restored capacity on `0, step, ...` up to the last line completion.
    pub fn capacity_series(&self, lines: &[LineRestoration]) -> Vec<CapacityPoint> {
        let horizon = lines.iter().map(|l| l.completion_time).fold(0.0, f64::max);
        let steps = (horizon / self.time_step).ceil() as usize;
        (0..=steps)
            .map(|i| {
                let time = i as f64 * self.time_step;
                let line_capacity: Vec<f64> = lines
                    .iter()
                    .map(|l| {
                        if l.completion_time <= time + TIME_EPS {
                            l.capacity_fraction
                        } else {
                            0.0
                        }
                    })
                    .collect();
                CapacityPoint {
                    time,
                    capacity: line_capacity.iter().sum(),
                    line_capacity,
                }
            })
            .collect()
    }
}
