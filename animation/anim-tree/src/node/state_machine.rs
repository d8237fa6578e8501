use std::fmt;

use anim_utils::{float_eq, remap};
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use super::travel::TravelPath;
use super::{NodeId, NodeKind, NodePool};
use crate::config::StateMachineConfig;
use crate::error::{AnimTreeError, Result};
use crate::motion::{BoneSample, UpdateInfo};

/// Index of a state inside its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Index of an edge inside its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// When a transition fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(rename_all = "snake_case"))]
pub enum EdgeMode {
    /// As soon as the crossfade into the source state has completed
    #[default]
    Instant,
    /// Only once the source state's node reports itself done
    OnDone,
}

/// Whether an edge can be traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(rename_all = "snake_case"))]
pub enum EdgeStatus {
    /// Traversed only by travel requests
    #[default]
    On,
    /// Traversed automatically and by travel requests
    Auto,
    /// Like `Auto`, then switches to the edge's `next_status`
    Once,
    /// Never traversed
    Off,
}

impl EdgeStatus {
    fn is_automatic(self) -> bool {
        matches!(self, Self::Auto | Self::Once)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct EdgeParams {
    pub mode: EdgeMode,
    pub status: EdgeStatus,
    /// Status taken after a `Once` edge is traversed
    pub next_status: EdgeStatus,
    /// Crossfade time into the end state, in seconds
    pub cross_fade: f32,
}

/// Snapshot of an edge for inspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeInfo {
    pub id: EdgeId,
    pub begin: StateId,
    pub end: StateId,
    pub params: EdgeParams,
    pub weight: f32,
}

#[derive(Debug)]
pub(crate) struct Edge {
    pub(crate) begin: usize,
    pub(crate) end: usize,
    pub(crate) params: EdgeParams,
    /// Crossfade progress, 0 at the begin state and 1 at the end state
    pub(crate) weight: f32,
}

#[derive(Debug)]
pub(crate) struct State {
    pub(crate) node: NodeId,
    pub(crate) out_edges: Vec<usize>,
    pub(crate) max_out: usize,
    /// Edge currently crossfading into this state
    pub(crate) active_in: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Visit {
    seen: bool,
    remaining: f32,
}

/// Outcome of one transition step inside an update
struct Step {
    consumed: f32,
    fired: bool,
    chain: bool,
    exit_reached: bool,
}

#[derive(Debug)]
pub(crate) struct StateMachineNode {
    config: StateMachineConfig,
    pub(crate) states: Vec<State>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) active: usize,
    visits: Vec<Visit>,
    pub(crate) path: Option<TravelPath>,
}

impl StateMachineNode {
    pub(crate) fn new(config: StateMachineConfig) -> Self {
        Self {
            config,
            states: Vec::with_capacity(config.max_states),
            edges: Vec::with_capacity(config.max_edges),
            active: 0,
            visits: Vec::with_capacity(config.max_states),
            path: config
                .travel
                .then(|| TravelPath::new(config.max_states, config.max_edges)),
        }
    }

    pub(crate) fn config(&self) -> StateMachineConfig {
        self.config
    }

    pub(crate) fn add_state(&mut self, owner: NodeId, node: NodeId, max_out: usize) -> Result<StateId> {
        if self.states.len() >= self.config.max_states {
            log::warn!(
                "Failed to create state in {}: state capacity reached ({})",
                owner,
                self.config.max_states
            );
            return Err(AnimTreeError::StateCapacity {
                node: owner,
                capacity: self.config.max_states,
            });
        }

        self.states.push(State {
            node,
            out_edges: Vec::with_capacity(max_out),
            max_out,
            active_in: None,
        });
        self.visits.push(Visit::default());
        Ok(StateId(self.states.len() - 1))
    }

    pub(crate) fn add_edge(
        &mut self,
        owner: NodeId,
        begin: StateId,
        end: StateId,
        params: EdgeParams,
    ) -> Result<EdgeId> {
        if self.edges.len() >= self.config.max_edges {
            log::warn!(
                "Failed to create edge in {}: edge capacity reached ({})",
                owner,
                self.config.max_edges
            );
            return Err(AnimTreeError::EdgeCapacity {
                node: owner,
                capacity: self.config.max_edges,
            });
        }
        self.check_state(begin.0)?;
        self.check_state(end.0)?;

        let state = &mut self.states[begin.0];
        if state.out_edges.len() >= state.max_out {
            log::warn!(
                "Failed to create edge in {}: state {} has no room for more outgoing edges ({})",
                owner,
                begin,
                state.max_out
            );
            return Err(AnimTreeError::OutEdgeCapacity {
                state: begin.0,
                capacity: state.max_out,
            });
        }

        let index = self.edges.len();
        state.out_edges.push(index);
        self.edges.push(Edge {
            begin: begin.0,
            end: end.0,
            params,
            weight: 0.0,
        });
        Ok(EdgeId(index))
    }

    pub(crate) fn check_state(&self, state: usize) -> Result<()> {
        if state >= self.states.len() {
            log::warn!(
                "Invalid state index {} ({} states)",
                state,
                self.states.len()
            );
            return Err(AnimTreeError::InvalidState {
                state,
                count: self.states.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn edge(&self, edge: EdgeId) -> Result<&Edge> {
        self.edges.get(edge.0).ok_or_else(|| {
            log::warn!("Invalid edge index {} ({} edges)", edge.0, self.edges.len());
            AnimTreeError::InvalidEdge {
                edge: edge.0,
                count: self.edges.len(),
            }
        })
    }

    pub(crate) fn edge_mut(&mut self, edge: EdgeId) -> Result<&mut Edge> {
        let count = self.edges.len();
        self.edges.get_mut(edge.0).ok_or_else(|| {
            log::warn!("Invalid edge index {} ({} edges)", edge.0, count);
            AnimTreeError::InvalidEdge {
                edge: edge.0,
                count,
            }
        })
    }

    pub(crate) fn edge_infos(&self) -> Vec<EdgeInfo> {
        self.edges
            .iter()
            .enumerate()
            .map(|(index, edge)| EdgeInfo {
                id: EdgeId(index),
                begin: StateId(edge.begin),
                end: StateId(edge.end),
                params: edge.params,
                weight: edge.weight,
            })
            .collect()
    }

    /// The state transitions lead to, even while its crossfade is running.
    pub(crate) fn active_state(&self) -> StateId {
        StateId(self.active)
    }

    /// The source state while a crossfade into the active state is still
    /// incomplete, the active state otherwise.
    pub(crate) fn current_state(&self) -> StateId {
        let incoming = self
            .states
            .get(self.active)
            .and_then(|state| state.active_in)
            .map(|edge| &self.edges[edge]);

        match incoming {
            Some(edge) if !float_eq(edge.weight, 1.0) => StateId(edge.begin),
            _ => StateId(self.active),
        }
    }

    fn check_not_empty(&self, owner: NodeId) -> Result<()> {
        if self.states.is_empty() {
            log::warn!("State machine {} has no states", owner);
            return Err(AnimTreeError::EmptyStateMachine(owner));
        }
        Ok(())
    }

    /// Runs transition steps until the elapsed time is used up or no
    /// transition fires. Leftover time of one step is carried into the next.
    pub(crate) fn update(&mut self, pool: &mut NodePool, owner: NodeId, elapsed: f32) -> Result<UpdateInfo> {
        self.check_not_empty(owner)?;
        self.visits.fill(Visit::default());

        let mut active = self.active;
        let mut remaining = elapsed;
        let mut exit_reached;

        loop {
            let visit = &mut self.visits[active];
            if visit.seen && float_eq(visit.remaining, remaining) {
                log::error!(
                    "State machine {}: transition cycle detected at state {} ({}s left)",
                    owner,
                    active,
                    remaining
                );
                return Err(AnimTreeError::TransitionCycle {
                    state: active,
                    remaining,
                });
            }
            *visit = Visit {
                seen: true,
                remaining,
            };

            let step = self.update_state(pool, &mut active, remaining)?;
            remaining -= step.consumed;
            exit_reached = step.exit_reached;

            if step.fired
                && let Some(path) = &mut self.path
            {
                path.advance();
            }

            if float_eq(remaining, 0.0) {
                break;
            }
            if remaining < 0.0 {
                log::warn!(
                    "State machine {}: consumed more time than elapsed ({}s left)",
                    owner,
                    remaining
                );
                return Err(AnimTreeError::TimeOverrun(remaining));
            }
            if !step.chain {
                break;
            }
        }

        self.active = active;

        Ok(UpdateInfo {
            done: exit_reached,
            consumed: elapsed - remaining,
        })
    }

    fn update_state(&mut self, pool: &mut NodePool, active: &mut usize, elapsed: f32) -> Result<Step> {
        let index = *active;
        let mut edge_done = true;
        let mut edge_time = 0.0;

        if let Some(edge) = self.states[index].active_in {
            (edge_time, edge_done) = self.update_edge(pool, edge, elapsed)?;
        }
        if edge_done {
            self.states[index].active_in = None;
        }

        let next_edge = self.find_edge(index);
        let window = next_edge.map_or(0.0, |edge| self.edges[edge].params.cross_fade);
        let info = pool.update(self.states[index].node, elapsed, window)?;

        let node_done = edge_done && info.done;
        let fired = match next_edge {
            Some(edge) => self.next_state(pool, edge, edge_done, node_done, active)?,
            None => false,
        };

        let exit_reached = edge_done && pool.kind(self.states[*active].node)? == NodeKind::Exit;

        Ok(Step {
            consumed: edge_time.max(info.consumed),
            fired,
            chain: node_done && fired && !exit_reached,
            exit_reached,
        })
    }

    /// Advances the crossfade of `edge`. Returns the consumed time and
    /// whether the crossfade finished.
    fn update_edge(&mut self, pool: &mut NodePool, edge: usize, elapsed: f32) -> Result<(f32, bool)> {
        let edge = &mut self.edges[edge];
        let cross_fade = edge.params.cross_fade;

        let (consumed, done) = if cross_fade > elapsed {
            let step = remap(elapsed, 0.0, cross_fade, 0.0, 1.0);
            let raw = edge.weight + step;
            edge.weight = raw.clamp(0.0, 1.0);
            let overflow = raw - edge.weight;
            let consumed = if step > 0.0 {
                elapsed * (1.0 - overflow / step)
            } else {
                elapsed
            };
            (consumed, float_eq(edge.weight, 1.0))
        } else {
            edge.weight = 1.0;
            (cross_fade, true)
        };

        if !done {
            let source = self.states[edge.begin].node;
            pool.update(source, elapsed, 0.0)?;
        }
        Ok((consumed, done))
    }

    /// The queued travel edge, or the first automatic outgoing edge.
    fn find_edge(&self, state: usize) -> Option<usize> {
        if let Some(edge) = self.path.as_ref().and_then(TravelPath::pending) {
            return Some(edge);
        }
        self.states[state]
            .out_edges
            .iter()
            .copied()
            .find(|&edge| self.edges[edge].params.status.is_automatic())
    }

    fn next_state(
        &mut self,
        pool: &mut NodePool,
        edge: usize,
        edge_done: bool,
        node_done: bool,
        active: &mut usize,
    ) -> Result<bool> {
        let transition = &mut self.edges[edge];
        let ready = match transition.params.mode {
            EdgeMode::Instant => edge_done,
            EdgeMode::OnDone => node_done,
        };
        if !ready {
            return Ok(false);
        }

        transition.weight = 0.0;
        if transition.params.status == EdgeStatus::Once {
            transition.params.status = transition.params.next_status;
        }
        let (begin, end) = (transition.begin, transition.end);
        log::trace!("Edge {} fired: state {} -> {}", edge, begin, end);

        self.states[end].active_in = Some(edge);
        pool.reset(self.states[end].node)?;
        *active = end;
        Ok(true)
    }

    /// Blends the source state into the active one while a crossfade runs.
    pub(crate) fn eval(&self, pool: &mut NodePool, owner: NodeId, bone: usize, want_motion: bool) -> Result<BoneSample> {
        self.check_not_empty(owner)?;
        let state = &self.states[self.active];
        let target = pool.eval(state.node, bone, want_motion).inspect_err(|_| {
            log::warn!("Failed to eval state {} of {}", self.active, owner);
        })?;

        let Some(edge) = state.active_in.map(|edge| &self.edges[edge]) else {
            return Ok(target);
        };

        let source = pool
            .eval(self.states[edge.begin].node, bone, want_motion)
            .inspect_err(|_| {
                log::warn!("Failed to eval state {} of {}", edge.begin, owner);
            })?;

        let weight = edge.weight.clamp(0.0, 1.0);
        let root = match (source.root, target.root) {
            (Some(a), Some(b)) => Some(a.lerp(&b, weight)),
            (a, b) => a.or(b),
        };
        Ok(BoneSample {
            transform: source.transform.lerp(&target.transform, weight),
            root,
        })
    }

    /// Returns to the first state and drops any queued travel path.
    pub(crate) fn reset(&mut self, pool: &mut NodePool, owner: NodeId) -> Result<()> {
        self.check_not_empty(owner)?;
        self.active = 0;
        if let Some(path) = &mut self.path {
            path.clear();
        }
        if let Some(edge) = self.states[0].active_in {
            self.edges[edge].weight = 0.0;
        }
        pool.reset(self.states[0].node)
    }
}
