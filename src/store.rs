//! Constraint store: the solver's own view of the grid.
//!
//! Holds, per coordinate, the candidate domain, the committed value and (once
//! revealed) the revealed constant, plus the directed arcs between revealed
//! cells and their neighbors. Nothing in here touches the board.

use crate::error::{Result, SolveError};
use crate::types::{Coord, Domain, Layer, NeighborCache};
use log::trace;
use std::collections::HashSet;
use std::ops::Deref;

/// Directed dependency: the value of `from` is constrained relative to the
/// revealed constant around `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsistencyArc {
    pub from: Coord,
    pub to: Coord,
}

impl ConsistencyArc {
    pub fn new(from: Coord, to: Coord) -> Self {
        Self { from, to }
    }
}

/// Can a cell showing `constant` still be satisfied given its neighbor values?
///
/// `None` is undetermined. Fails on too many mines, or too few undetermined
/// neighbors left to reach the constant.
pub fn constraint_feasible(constant: u8, values: impl IntoIterator<Item = Option<u8>>) -> bool {
    let (mut mines, mut unknown) = (0usize, 0usize);
    for value in values {
        match value {
            Some(1) => mines += 1,
            None => unknown += 1,
            _ => {}
        }
    }
    let constant = constant as usize;
    mines <= constant && mines + unknown >= constant
}

/// Is the constraint fully decided and met: every neighbor determined and the
/// mine count equal to `constant`?
pub fn constraint_satisfied(constant: u8, values: impl IntoIterator<Item = Option<u8>>) -> bool {
    let mut mines = 0usize;
    for value in values {
        match value {
            Some(v) => mines += v as usize,
            None => return false,
        }
    }
    mines == constant as usize
}

pub struct ConstraintStore {
    neighbors: NeighborCache,
    domains: Layer<Domain>,
    values: Layer<Option<u8>>,
    constants: Layer<Option<u8>>,
    checked: usize,
    determined: usize,
    arcs: HashSet<ConsistencyArc>,
    fresh: Vec<ConsistencyArc>,
    /// Bumped on every change to domains, values or constants.
    generation: u64,
}

impl ConstraintStore {
    pub fn new(neighbors: NeighborCache) -> Self {
        let (width, height) = (neighbors.width, neighbors.height);
        Self {
            neighbors,
            domains: Layer::filled(width, height, Domain::BOTH),
            values: Layer::filled(width, height, None),
            constants: Layer::filled(width, height, None),
            checked: 0,
            determined: 0,
            arcs: HashSet::new(),
            fresh: Vec::new(),
            generation: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.neighbors.width
    }

    pub fn height(&self) -> usize {
        self.neighbors.height
    }

    pub fn neighbors(&self, cell: Coord) -> &[Coord] {
        self.neighbors.get(cell)
    }

    pub fn neighbor_cache(&self) -> &NeighborCache {
        &self.neighbors
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.domains.coords()
    }

    pub fn domain(&self, cell: Coord) -> Domain {
        self.domains.get(cell)
    }

    pub fn value(&self, cell: Coord) -> Option<u8> {
        self.values.get(cell)
    }

    /// Revealed constant, `Some` exactly for checked cells.
    pub fn constant(&self, cell: Coord) -> Option<u8> {
        self.constants.get(cell)
    }

    pub fn is_checked(&self, cell: Coord) -> bool {
        self.constants.get(cell).is_some()
    }

    pub fn is_determined(&self, cell: Coord) -> bool {
        self.values.get(cell).is_some()
    }

    pub fn checked_count(&self) -> usize {
        self.checked
    }

    pub fn determined_count(&self) -> usize {
        self.determined
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Coordinates committed as mines.
    pub fn committed_mines(&self) -> usize {
        self.values.iter().filter(|&(_, v)| v == Some(1)).count()
    }

    pub fn domains(&self) -> &Layer<Domain> {
        &self.domains
    }

    /// Undetermined coordinates in storage order.
    pub fn undetermined(&self) -> Vec<Coord> {
        self.coords().filter(|&c| !self.is_determined(c)).collect()
    }

    /// Record a successful reveal: the cell is safe and shows `constant`.
    pub fn register_reveal(&mut self, cell: Coord, constant: u8) -> Result<()> {
        if self.is_checked(cell) {
            return Ok(());
        }
        self.commit(cell, 0)?;
        self.constants.set(cell, Some(constant));
        self.checked += 1;
        self.generation += 1;

        let Self { neighbors, arcs, fresh, .. } = self;
        for &n in neighbors.get(cell) {
            for arc in [ConsistencyArc::new(cell, n), ConsistencyArc::new(n, cell)] {
                if arcs.insert(arc) {
                    fresh.push(arc);
                }
            }
        }
        trace!("registered ({}, {}) = {}", cell.0, cell.1, constant);
        Ok(())
    }

    /// Fix `cell` to `value`. Returns false when it already held that value.
    pub fn commit(&mut self, cell: Coord, value: u8) -> Result<bool> {
        if let Some(committed) = self.values.get(cell) {
            if committed == value {
                return Ok(false);
            }
            return Err(SolveError::ValueConflict {
                coord: cell,
                committed,
                attempted: value,
            });
        }
        let domain = self.domains.get(cell);
        if !domain.contains(value) {
            return Err(SolveError::InternalInconsistency {
                coord: cell,
                eliminated: Domain::BOTH.values().filter(|&v| !domain.contains(v)).collect(),
            });
        }
        self.domains.set(cell, Domain::only(value));
        self.values.set(cell, Some(value));
        self.determined += 1;
        self.generation += 1;
        Ok(true)
    }

    /// Drop `value` from the domain of `cell` and return what is left.
    ///
    /// The domain may come back empty; the caller decides how fatal that is.
    pub fn eliminate(&mut self, cell: Coord, value: u8) -> Domain {
        let mut domain = self.domains.get(cell);
        domain.remove(value);
        self.domains.set(cell, domain);
        self.generation += 1;
        domain
    }

    /// Temporarily give each listed cell a value. Prior values come back when
    /// the guard drops.
    pub fn assume(&mut self, trials: &[(Coord, u8)]) -> Assumption<'_> {
        let saved = trials
            .iter()
            .map(|&(cell, value)| {
                let prior = self.values.get(cell);
                self.values.set(cell, Some(value));
                (cell, prior)
            })
            .collect();
        Assumption { store: self, saved }
    }

    fn neighbor_values(&self, cell: Coord) -> impl Iterator<Item = Option<u8>> + '_ {
        self.neighbors.get(cell).iter().map(move |&n| self.values.get(n))
    }

    /// Local feasibility of a checked cell's constraint. Unchecked cells carry
    /// no constraint and always pass.
    pub fn feasible(&self, cell: Coord) -> bool {
        match self.constant(cell) {
            Some(constant) => constraint_feasible(constant, self.neighbor_values(cell)),
            None => true,
        }
    }

    /// True when every checked neighbor of `cell` is still feasible.
    pub fn neighbors_feasible(&self, cell: Coord) -> bool {
        self.neighbors.get(cell).iter().all(|&n| self.feasible(n))
    }

    /// Would giving `cell` the value `value` break a checked neighbor?
    pub fn violates_constraints(&mut self, cell: Coord, value: u8) -> bool {
        let trial = self.assume(&[(cell, value)]);
        !trial.neighbors_feasible(cell)
    }

    /// Undetermined neighbors of a checked cell and the mines still missing
    /// among them. `None` for unchecked cells, fully determined neighborhoods
    /// and overfull constraints.
    pub fn open_constraint(&self, cell: Coord) -> Option<(Vec<Coord>, usize)> {
        let constant = self.constant(cell)? as usize;
        let mut open = Vec::new();
        let mut mines = 0usize;
        for &n in self.neighbors.get(cell) {
            match self.values.get(n) {
                Some(1) => mines += 1,
                None => open.push(n),
                _ => {}
            }
        }
        if open.is_empty() {
            return None;
        }
        Some((open, constant.checked_sub(mines)?))
    }

    /// A checked cell whose neighbors are all determined and sum to its constant.
    pub fn is_satisfied(&self, cell: Coord) -> bool {
        match self.constant(cell) {
            Some(constant) => constraint_satisfied(constant, self.neighbor_values(cell)),
            None => false,
        }
    }

    /// Determined cells are consistent unless they are checked and their
    /// neighborhood disagrees with the constant.
    pub fn is_cell_consistent(&self, cell: Coord) -> bool {
        self.is_determined(cell) && (!self.is_checked(cell) || self.is_satisfied(cell))
    }

    /// Every coordinate determined and every checked constraint met.
    pub fn is_consistent(&self) -> bool {
        self.coords().all(|c| self.is_cell_consistent(c))
    }

    /// Arcs created by reveals since the last call.
    pub fn take_fresh_arcs(&mut self) -> Vec<ConsistencyArc> {
        std::mem::take(&mut self.fresh)
    }

    pub fn active_arcs(&self) -> &HashSet<ConsistencyArc> {
        &self.arcs
    }

    fn is_settled(&self, cell: Coord) -> bool {
        self.is_determined(cell)
            && (!self.is_checked(cell)
                || self.neighbors.get(cell).iter().all(|&n| self.is_determined(n)))
    }

    /// Drop arcs whose both ends are settled. Returns how many went.
    pub fn retire_settled(&mut self) -> usize {
        let settled: Vec<ConsistencyArc> = self
            .arcs
            .iter()
            .filter(|arc| self.is_settled(arc.from) && self.is_settled(arc.to))
            .copied()
            .collect();
        for arc in &settled {
            self.arcs.remove(arc);
        }
        settled.len()
    }
}

/// Scoped trial values on a [`ConstraintStore`]; read through `Deref`.
pub struct Assumption<'a> {
    store: &'a mut ConstraintStore,
    saved: Vec<(Coord, Option<u8>)>,
}

impl Deref for Assumption<'_> {
    type Target = ConstraintStore;

    fn deref(&self) -> &ConstraintStore {
        self.store
    }
}

impl Drop for Assumption<'_> {
    fn drop(&mut self) {
        for &(cell, prior) in self.saved.iter().rev() {
            self.store.values.set(cell, prior);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(width: usize, height: usize) -> ConstraintStore {
        ConstraintStore::new(NeighborCache::new(width, height))
    }

    #[test]
    fn test_feasible_and_satisfied_predicates() {
        // constant 2, one mine, two unknown
        assert!(constraint_feasible(2, [Some(1), None, None, Some(0)]));
        // too many mines
        assert!(!constraint_feasible(1, [Some(1), Some(1), None]));
        // not enough unknowns left
        assert!(!constraint_feasible(3, [Some(1), None, Some(0)]));

        assert!(constraint_satisfied(1, [Some(1), Some(0), Some(0)]));
        assert!(!constraint_satisfied(1, [Some(1), None]));
        assert!(!constraint_satisfied(2, [Some(1), Some(0)]));
    }

    #[test]
    fn test_register_reveal_seeds_safe_and_arcs() {
        let mut s = store(3, 3);
        s.register_reveal((0, 0), 1).unwrap();

        assert_eq!(s.domain((0, 0)), Domain::SAFE);
        assert_eq!(s.value((0, 0)), Some(0));
        assert_eq!(s.constant((0, 0)), Some(1));
        assert_eq!(s.checked_count(), 1);
        // three neighbors, both directions
        assert_eq!(s.active_arcs().len(), 6);
        assert!(s.active_arcs().contains(&ConsistencyArc::new((1, 1), (0, 0))));
        assert_eq!(s.take_fresh_arcs().len(), 6);
        assert!(s.take_fresh_arcs().is_empty());

        // registering twice changes nothing
        s.register_reveal((0, 0), 1).unwrap();
        assert_eq!(s.checked_count(), 1);
    }

    #[test]
    fn test_reveal_of_committed_mine_is_rejected() {
        let mut s = store(3, 3);
        s.commit((1, 1), 1).unwrap();
        assert_eq!(
            s.register_reveal((1, 1), 0),
            Err(SolveError::ValueConflict {
                coord: (1, 1),
                committed: 1,
                attempted: 0
            })
        );
    }

    #[test]
    fn test_commit_outside_domain_is_inconsistent() {
        let mut s = store(2, 2);
        assert_eq!(s.eliminate((0, 1), 1), Domain::SAFE);
        assert!(matches!(
            s.commit((0, 1), 1),
            Err(SolveError::InternalInconsistency { coord: (0, 1), .. })
        ));
        assert_eq!(s.commit((0, 1), 0), Ok(true));
        assert_eq!(s.commit((0, 1), 0), Ok(false));
        assert_eq!(s.determined_count(), 1);
    }

    #[test]
    fn test_assumption_restores_on_drop() {
        let mut s = store(3, 3);
        s.commit((2, 2), 1).unwrap();
        let generation = s.generation();
        {
            let trial = s.assume(&[((0, 0), 1), ((2, 2), 1), ((1, 0), 0)]);
            assert_eq!(trial.value((0, 0)), Some(1));
            assert_eq!(trial.value((1, 0)), Some(0));
        }
        assert_eq!(s.value((0, 0)), None);
        assert_eq!(s.value((1, 0)), None);
        assert_eq!(s.value((2, 2)), Some(1));
        assert_eq!(s.generation(), generation);
    }

    #[test]
    fn test_violates_constraints_on_corner_pattern() {
        // | 0| 0| 0|
        // | 0| 1| 1|
        // | 0| 1| *|
        let mut s = store(3, 3);
        for cell in [(0, 0), (1, 0), (2, 0), (0, 1), (0, 2)] {
            s.register_reveal(cell, 0).unwrap();
        }
        for cell in [(1, 1), (2, 1), (1, 2)] {
            s.register_reveal(cell, 1).unwrap();
        }
        assert!(s.violates_constraints((2, 2), 0));
        assert!(!s.violates_constraints((2, 2), 1));
        assert_eq!(s.value((2, 2)), None);

        s.commit((2, 2), 1).unwrap();
        assert!(s.is_consistent());
        assert!(s.is_satisfied((1, 1)));
    }

    #[test]
    fn test_open_constraint_counts_missing_mines() {
        let mut s = store(3, 3);
        s.register_reveal((0, 0), 2).unwrap();
        assert_eq!(s.open_constraint((0, 0)), Some((vec![(0, 1), (1, 0), (1, 1)], 2)));
        s.commit((1, 1), 1).unwrap();
        s.commit((0, 1), 0).unwrap();
        assert_eq!(s.open_constraint((0, 0)), Some((vec![(1, 0)], 1)));
        s.commit((1, 0), 1).unwrap();
        assert_eq!(s.open_constraint((0, 0)), None);
        assert_eq!(s.open_constraint((2, 2)), None);
    }

    #[test]
    fn test_retire_settled_keeps_open_arcs() {
        let mut s = store(3, 1);
        s.register_reveal((0, 0), 1).unwrap();
        // (1, 0) undetermined keeps both arcs alive
        assert_eq!(s.retire_settled(), 0);
        s.commit((1, 0), 1).unwrap();
        assert_eq!(s.retire_settled(), 2);
        assert!(s.active_arcs().is_empty());
    }
}
