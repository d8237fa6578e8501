//! Multi-hop transitions found by breadth-first search over open edges

use super::state_machine::{Edge, EdgeStatus, State, StateId, StateMachineNode};
use super::{NodeId, NodePool};
use crate::error::Result;

/// What a travel request did to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelOutcome {
    /// The target was already the active state
    AlreadyActive,
    /// A path of `hops` edges was queued for the following updates
    Queued { hops: usize },
    /// No usable path: the target became active immediately
    Jumped,
}

/// Queued path plus the scratch buffers of the search
///
/// Every buffer is allocated once. Partial paths are stored as rows of
/// `max_len` edges in `open` and `next`.
#[derive(Debug)]
pub(crate) struct TravelPath {
    max_len: usize,
    max_open: usize,
    queued: Vec<usize>,
    index: usize,
    open: Vec<usize>,
    next: Vec<usize>,
    marked: Vec<bool>,
}

impl TravelPath {
    pub(crate) fn new(max_states: usize, max_edges: usize) -> Self {
        Self {
            max_len: max_states,
            max_open: max_edges,
            queued: Vec::with_capacity(max_states),
            index: 0,
            open: vec![0; max_states * max_edges],
            next: vec![0; max_states * max_edges],
            marked: vec![false; max_states],
        }
    }

    /// Next edge of the queued path, if any is left.
    pub(crate) fn pending(&self) -> Option<usize> {
        self.queued.get(self.index).copied()
    }

    pub(crate) fn advance(&mut self) {
        if self.index < self.queued.len() {
            self.index += 1;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.queued.clear();
        self.index = 0;
    }

    pub(crate) fn remaining(&self) -> &[usize] {
        &self.queued[self.index..]
    }

    /// Searches for the shortest path from `from` to `target` and queues it.
    fn find(&mut self, states: &[State], edges: &[Edge], from: usize, target: usize) -> bool {
        let width = self.max_len;

        self.marked.clear();
        self.marked.resize(states.len(), false);
        self.marked[from] = true;

        let mut open_count = self.expand(states, edges, None, 0, 0, from);
        std::mem::swap(&mut self.open, &mut self.next);
        let mut len = 1;

        while open_count > 0 {
            let mut next_count = 0;
            for path in 0..open_count {
                let row = path * width;
                let state = edges[self.open[row + len - 1]].end;

                if state == target {
                    self.queued.clear();
                    self.queued.extend_from_slice(&self.open[row..row + len]);
                    self.index = 0;
                    return true;
                }
                if self.marked[state] {
                    continue;
                }
                self.marked[state] = true;

                next_count += self.expand(states, edges, Some(path), len, next_count, state);
            }

            if len < self.max_len {
                len += 1;
            } else {
                log::warn!(
                    "Failed to find travel path: maximum path length exceeded ({})",
                    self.max_len
                );
                return false;
            }

            std::mem::swap(&mut self.open, &mut self.next);
            open_count = next_count;
        }

        false
    }

    /// Writes `prefix` extended by each traversable out edge of `state` into
    /// `next`, starting at row `count`. Returns the number of rows written.
    fn expand(
        &mut self,
        states: &[State],
        edges: &[Edge],
        prefix: Option<usize>,
        len: usize,
        count: usize,
        state: usize,
    ) -> usize {
        let width = self.max_len;
        if len >= width {
            return 0;
        }

        let mut added = 0;
        for &edge in &states[state].out_edges {
            if edges[edge].params.status == EdgeStatus::Off {
                continue;
            }

            let slot = count + added;
            if slot >= self.max_open {
                log::warn!(
                    "Failed to find travel path: maximum open paths exceeded ({})",
                    self.max_open
                );
                break;
            }

            let row = slot * width;
            if let Some(prefix) = prefix {
                let source = prefix * width;
                self.next[row..row + len].copy_from_slice(&self.open[source..source + len]);
            }
            self.next[row + len] = edge;
            added += 1;
        }
        added
    }
}

impl StateMachineNode {
    /// Queues a path to `target`, or cuts to it when no path can be found.
    pub(crate) fn travel_to(&mut self, pool: &mut NodePool, owner: NodeId, target: StateId) -> Result<TravelOutcome> {
        self.check_state(target.0)?;
        if target.0 == self.active {
            return Ok(TravelOutcome::AlreadyActive);
        }

        let found = match &mut self.path {
            Some(path) => path.find(&self.states, &self.edges, self.active, target.0),
            None => {
                log::warn!("State machine {} was created without travel support", owner);
                false
            }
        };

        if found && let Some(path) = &self.path {
            let hops = path.remaining().len();
            log::debug!("State machine {}: travel to {} queued ({} hops)", owner, target, hops);
            return Ok(TravelOutcome::Queued { hops });
        }

        log::debug!("State machine {}: jumping to {}", owner, target);
        let state = &mut self.states[target.0];
        state.active_in = None;
        let node = state.node;
        self.active = target.0;
        if let Some(path) = &mut self.path {
            path.clear();
        }
        pool.reset(node)?;
        Ok(TravelOutcome::Jumped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::state_machine::EdgeParams;

    fn graph(links: &[(usize, usize, EdgeStatus)], state_count: usize) -> (Vec<State>, Vec<Edge>) {
        let mut states: Vec<State> = (0..state_count)
            .map(|_| State {
                node: NodeId(0),
                out_edges: Vec::new(),
                max_out: 8,
                active_in: None,
            })
            .collect();
        let edges = links
            .iter()
            .enumerate()
            .map(|(index, &(begin, end, status))| {
                states[begin].out_edges.push(index);
                Edge {
                    begin,
                    end,
                    params: EdgeParams {
                        status,
                        ..EdgeParams::default()
                    },
                    weight: 0.0,
                }
            })
            .collect();
        (states, edges)
    }

    #[test]
    fn test_finds_shortest_path() {
        use EdgeStatus::On;
        // 0 -> 1 -> 2 -> 3 and a shortcut 0 -> 4 -> 3
        let (states, edges) = graph(&[(0, 1, On), (1, 2, On), (2, 3, On), (0, 4, On), (4, 3, On)], 5);
        let mut path = TravelPath::new(5, 8);

        assert!(path.find(&states, &edges, 0, 3));
        assert_eq!(path.remaining(), &[3, 4]);
        assert_eq!(path.pending(), Some(3));
        path.advance();
        assert_eq!(path.pending(), Some(4));
        path.advance();
        path.advance();
        assert_eq!(path.pending(), None);
    }

    #[test]
    fn test_skips_disabled_edges() {
        use EdgeStatus::{Auto, Off, On};
        let (states, edges) = graph(&[(0, 1, Off), (0, 2, Auto), (2, 1, On)], 3);
        let mut path = TravelPath::new(3, 4);

        assert!(path.find(&states, &edges, 0, 1));
        assert_eq!(path.remaining(), &[1, 2]);
    }

    #[test]
    fn test_unreachable_target() {
        use EdgeStatus::On;
        let (states, edges) = graph(&[(0, 1, On), (1, 0, On)], 3);
        let mut path = TravelPath::new(3, 4);
        assert!(!path.find(&states, &edges, 0, 2));
        assert!(path.remaining().is_empty());
    }

    #[test]
    fn test_path_length_limit() {
        use EdgeStatus::On;
        let (states, edges) = graph(&[(0, 1, On), (1, 2, On), (2, 3, On)], 4);

        let mut short = TravelPath::new(2, 4);
        assert!(!short.find(&states, &edges, 0, 3));

        let mut long = TravelPath::new(3, 4);
        assert!(long.find(&states, &edges, 0, 3));
        assert_eq!(long.remaining(), &[0, 1, 2]);
    }

    #[test]
    fn test_open_path_limit() {
        use EdgeStatus::On;
        // the only route to 3 goes through the third branch
        let (states, edges) = graph(&[(0, 1, On), (0, 2, On), (0, 4, On), (4, 3, On)], 5);

        let mut narrow = TravelPath::new(5, 2);
        assert!(!narrow.find(&states, &edges, 0, 3));

        let mut wide = TravelPath::new(5, 3);
        assert!(wide.find(&states, &edges, 0, 3));
        assert_eq!(wide.remaining(), &[2, 3]);
    }
}
