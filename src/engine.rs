//! Arc-consistency propagation (AC-3) interleaved with board reveals.
//!
//! The engine owns two work queues: arcs waiting to be revised and cells
//! waiting to be revealed. `run` alternates between them until either the
//! board reports a terminal state or no reveal is pending. Before reporting a
//! stall it tries pairwise subset reduction, which catches the 1-1 and 1-2-1
//! patterns single-value revision cannot see.

use crate::board::{Board, GameStatus, RevealOutcome};
use crate::error::{Result, SolveError};
use crate::store::{ConsistencyArc, ConstraintStore};
use crate::types::Coord;
use log::{debug, trace, warn};
use std::collections::{HashMap, HashSet, VecDeque};

/// How a propagation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Terminal(GameStatus),
    /// Fixpoint reached; nothing more follows without search.
    Stalled,
}

#[derive(Debug, Default)]
pub struct Engine {
    arcs: VecDeque<ConsistencyArc>,
    pending: HashSet<ConsistencyArc>,
    reveals: VecDeque<Coord>,
    queued: HashSet<Coord>,
    revisions: usize,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_arc(&mut self, arc: ConsistencyArc) {
        if self.pending.insert(arc) {
            self.arcs.push_back(arc);
        }
    }

    /// Queue a cell for reveal. Returns false if it was already queued.
    pub fn schedule_reveal(&mut self, cell: Coord) -> bool {
        if self.queued.insert(cell) {
            self.reveals.push_back(cell);
            true
        } else {
            false
        }
    }

    pub fn pending_reveals(&self) -> usize {
        self.reveals.len()
    }

    pub fn pending_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Number of `revise` calls so far.
    pub fn revisions(&self) -> usize {
        self.revisions
    }

    /// Commit `cell` to `value` and spread the news: flag mines, queue safe
    /// cells for reveal, and requeue every arc pointing at `cell`.
    pub fn settle<B: Board>(
        &mut self,
        store: &mut ConstraintStore,
        board: &mut B,
        cell: Coord,
        value: u8,
    ) -> Result<bool> {
        if !store.commit(cell, value)? {
            return Ok(false);
        }
        debug!("settled ({}, {}) = {}", cell.0, cell.1, value);
        if value == 1 {
            if !board.is_flagged(cell.0, cell.1) {
                board.flag(cell.0, cell.1);
            }
        } else if !store.is_checked(cell) {
            self.schedule_reveal(cell);
        }
        for &n in store.neighbors(cell) {
            self.enqueue_arc(ConsistencyArc::new(n, cell));
        }
        Ok(true)
    }

    /// Propagate and reveal until terminal or stalled.
    pub fn run<B: Board>(&mut self, store: &mut ConstraintStore, board: &mut B) -> Result<Propagation> {
        loop {
            if let Some(status) = self.reveal_pending(store, board)? {
                return Ok(Propagation::Terminal(status));
            }
            self.drain(store, board)?;

            let status = board.status();
            if status.is_terminal() {
                return Ok(Propagation::Terminal(status));
            }
            if self.reveals.is_empty() {
                if self.reduce_subsets(store, board)? > 0 {
                    continue;
                }
                let retired = store.retire_settled();
                trace!("stalled, retired {} arcs, {} active", retired, store.active_arcs().len());
                return Ok(Propagation::Stalled);
            }
        }
    }

    /// Reveal every queued cell. Returns the board status once it turns terminal.
    pub fn reveal_pending<B: Board>(
        &mut self,
        store: &mut ConstraintStore,
        board: &mut B,
    ) -> Result<Option<GameStatus>> {
        while let Some(cell) = self.reveals.pop_front() {
            self.queued.remove(&cell);
            if store.is_checked(cell) || store.value(cell) == Some(1) {
                continue;
            }
            match board.reveal(cell.0, cell.1) {
                RevealOutcome::Safe(constant) => {
                    store.register_reveal(cell, constant)?;
                    if constant == 0 {
                        self.sync_revealed(store, board)?;
                    }
                }
                RevealOutcome::AlreadyRevealed => self.sync_revealed(store, board)?,
                RevealOutcome::Mine => match store.value(cell) {
                    None => {
                        debug!("probe ({}, {}) hit a mine", cell.0, cell.1);
                        store.commit(cell, 1)?;
                    }
                    // only reachable when the board's mine total is off
                    Some(_) => warn!("({}, {}) was committed safe but holds a mine", cell.0, cell.1),
                },
            }
            self.absorb(store);

            let status = board.status();
            if status.is_terminal() {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    /// Register every cell the board shows but the store has not seen yet
    /// (cascaded zero reveals).
    fn sync_revealed<B: Board>(&mut self, store: &mut ConstraintStore, board: &B) -> Result<()> {
        for (x, y) in board.revealed() {
            if store.is_checked((x, y)) {
                continue;
            }
            if let Some(constant) = board.visible(x, y) {
                store.register_reveal((x, y), constant)?;
            }
        }
        Ok(())
    }

    fn absorb(&mut self, store: &mut ConstraintStore) {
        for arc in store.take_fresh_arcs() {
            self.enqueue_arc(arc);
        }
    }

    /// Empty the arc queue.
    pub fn drain<B: Board>(&mut self, store: &mut ConstraintStore, board: &mut B) -> Result<()> {
        self.absorb(store);
        while let Some(arc) = self.arcs.pop_front() {
            self.pending.remove(&arc);
            let k = arc.from;

            let removed = self.revise(store, arc);
            if !removed.is_empty() {
                let domain = store.domain(k);
                if domain.is_empty() {
                    return Err(SolveError::InternalInconsistency {
                        coord: k,
                        eliminated: removed,
                    });
                }
                if let Some(value) = domain.value() {
                    self.settle(store, board, k, value)?;
                }
            }

            if store.is_satisfied(k) {
                for &n in store.neighbors(k) {
                    if store.value(n) == Some(0) && !store.is_checked(n) {
                        self.schedule_reveal(n);
                    }
                }
            }
        }
        Ok(())
    }

    /// Pairwise constraint reduction. When the open cells of one checked cell
    /// `a` all lie among those of a nearby checked cell `b`, the cells only `b`
    /// sees hold exactly the difference of their missing mine counts. A
    /// difference of zero makes them all safe; one equal to their number makes
    /// them all mines. Returns how many cells were settled.
    pub fn reduce_subsets<B: Board>(&mut self, store: &mut ConstraintStore, board: &mut B) -> Result<usize> {
        let open: HashMap<Coord, (Vec<Coord>, usize)> = store
            .coords()
            .filter_map(|c| store.open_constraint(c).map(|constraint| (c, constraint)))
            .collect();

        let mut forced: Vec<(Coord, u8)> = Vec::new();
        for a in store.coords() {
            let Some((cells_a, missing_a)) = open.get(&a) else {
                continue;
            };
            // constraints sharing an open cell with `a`
            let mut partners: Vec<Coord> = cells_a
                .iter()
                .flat_map(|&u| store.neighbors(u).iter().copied())
                .filter(|&b| b != a && open.contains_key(&b))
                .collect();
            partners.sort_unstable();
            partners.dedup();

            for b in partners {
                let Some((cells_b, missing_b)) = open.get(&b) else {
                    continue;
                };
                if cells_b.len() <= cells_a.len() || !cells_a.iter().all(|c| cells_b.contains(c)) {
                    continue;
                }
                let Some(extra) = missing_b.checked_sub(*missing_a) else {
                    continue;
                };
                let rest: Vec<Coord> = cells_b.iter().copied().filter(|c| !cells_a.contains(c)).collect();
                let value = if extra == 0 {
                    0
                } else if extra == rest.len() {
                    1
                } else {
                    continue;
                };
                forced.extend(rest.into_iter().map(|c| (c, value)));
            }
            if !forced.is_empty() {
                break;
            }
        }

        let mut settled = 0;
        for (cell, value) in forced {
            if store.value(cell).is_none() && self.settle(store, board, cell, value)? {
                settled += 1;
            }
        }
        if settled > 0 {
            trace!("subset reduction settled {} cells", settled);
        }
        Ok(settled)
    }

    /// Remove every value of `arc.from` that leaves some checked cell around
    /// `arc.to` unsatisfiable. Returns the removed values.
    pub fn revise(&mut self, store: &mut ConstraintStore, arc: ConsistencyArc) -> Vec<u8> {
        self.revisions += 1;
        let ConsistencyArc { from: k, to: m } = arc;

        // only cells adjacent to k can feel its value
        let cache = store.neighbor_cache();
        let scope: Vec<Coord> = std::iter::once(m)
            .chain(cache.get(m).iter().copied().filter(|&n| n != k && cache.are_adjacent(n, k)))
            .filter(|&c| store.is_checked(c))
            .collect();
        if scope.is_empty() {
            return Vec::new();
        }

        let mut removed = Vec::new();
        for value in store.domain(k).values() {
            let trial = store.assume(&[(k, value)]);
            if !scope.iter().all(|&c| trial.feasible(c)) {
                removed.push(value);
            }
        }
        for &value in &removed {
            store.eliminate(k, value);
        }
        if !removed.is_empty() {
            trace!("revise ({}, {}) against ({}, {}) removed {:?}", k.0, k.1, m.0, m.1, removed);
        }
        removed
    }
}
