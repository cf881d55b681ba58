//! Bounded enumeration over the frontier.
//!
//! When propagation stalls, the frontier is split into regions of cells that
//! share a revealed neighbor. Every {0, 1} assignment of a capped region is
//! explored depth-first on an explicit stack. Full assignments are checked
//! against the revealed constants under a scoped [`Assumption`], and the
//! verdicts are memoized by an order-independent signature.
//!
//! [`Assumption`]: crate::store::Assumption

use crate::store::ConstraintStore;
use crate::types::{cell_key, Coord};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};

/// Mine-count window a full frontier assignment must land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MineBounds {
    pub min: usize,
    pub max: usize,
}

impl MineBounds {
    /// `budget` mines are still unplaced and `outside` undetermined cells lie
    /// beyond the frontier; whatever they cannot hold must land inside it.
    pub fn new(budget: usize, outside: usize) -> Self {
        Self {
            min: budget.saturating_sub(outside),
            max: budget,
        }
    }

    pub fn admits(&self, mines: usize) -> bool {
        (self.min..=self.max).contains(&mines)
    }
}

/// Undetermined coordinates adjacent to a committed-safe coordinate, in
/// storage order, at most `max` of them.
pub fn select_frontier(store: &ConstraintStore, max: usize) -> Vec<Coord> {
    store
        .coords()
        .filter(|&c| !store.is_determined(c))
        .filter(|&c| store.neighbors(c).iter().any(|&n| store.value(n) == Some(0)))
        .take(max)
        .collect()
}

/// Frontier cells grouped into connected regions: two cells belong together
/// when they share a checked neighbor. Regions come smallest first (ties in
/// storage order), each truncated to its first `max` cells.
pub fn frontier_regions(store: &ConstraintStore, max: usize) -> Vec<Vec<Coord>> {
    let frontier = select_frontier(store, usize::MAX);
    let members: HashSet<Coord> = frontier.iter().copied().collect();
    let mut visited: HashSet<Coord> = HashSet::new();
    let mut regions = Vec::new();

    for &start in &frontier {
        if !visited.insert(start) {
            continue;
        }
        let mut region = Vec::new();
        let mut stack = vec![start];
        while let Some(cell) = stack.pop() {
            region.push(cell);
            for &constraint in store.neighbors(cell) {
                if !store.is_checked(constraint) {
                    continue;
                }
                for &n in store.neighbors(constraint) {
                    if members.contains(&n) && visited.insert(n) {
                        stack.push(n);
                    }
                }
            }
        }
        region.sort_unstable();
        region.truncate(max);
        regions.push(region);
    }

    regions.sort_by_key(|r| r.len());
    trace!("{} frontier cells in {} regions", frontier.len(), regions.len());
    regions
}

/// Memoized validity verdicts for full frontier assignments.
#[derive(Debug, Default)]
pub struct ValidityCache {
    generation: Option<u64>,
    verdicts: HashMap<Vec<(u32, u8)>, bool>,
    hits: usize,
    misses: usize,
}

impl ValidityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// Forget every verdict once the store has moved on.
    fn sync(&mut self, generation: u64) {
        if self.generation != Some(generation) {
            if !self.verdicts.is_empty() {
                trace!("validity cache reset ({} entries)", self.verdicts.len());
            }
            self.verdicts.clear();
            self.generation = Some(generation);
        }
    }

    /// Does the assignment leave every checked neighbor of every assigned
    /// cell satisfiable?
    pub fn is_valid(&mut self, store: &mut ConstraintStore, assignment: &[(Coord, u8)]) -> bool {
        self.sync(store.generation());
        let key = signature(assignment);
        if let Some(&verdict) = self.verdicts.get(&key) {
            self.hits += 1;
            return verdict;
        }
        self.misses += 1;

        let trial = store.assume(assignment);
        let verdict = assignment.iter().all(|&(cell, _)| trial.neighbors_feasible(cell));
        drop(trial);

        self.verdicts.insert(key, verdict);
        verdict
    }
}

/// Order-independent key: packed coordinates with their values, sorted.
fn signature(assignment: &[(Coord, u8)]) -> Vec<(u32, u8)> {
    let mut key: Vec<(u32, u8)> = assignment
        .iter()
        .map(|&((x, y), v)| (cell_key(x, y), v))
        .collect();
    key.sort_unstable();
    key
}

/// What the accepted solutions say about the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No accepted solution, or nothing to enumerate.
    NoInformation,
    /// Exactly one solution; its values are the truth.
    Unique(Vec<(Coord, u8)>),
    /// Cells that hold the same value in every solution.
    Forced { safe: Vec<Coord>, mines: Vec<Coord> },
    Ambiguous,
}

impl Verdict {
    /// Something can be committed.
    pub fn is_certain(&self) -> bool {
        matches!(self, Verdict::Unique(_) | Verdict::Forced { .. })
    }
}

/// Accepted assignments over a frontier. Each solution is aligned with
/// `frontier` and solutions come out in lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub frontier: Vec<Coord>,
    pub solutions: Vec<Vec<u8>>,
}

impl Enumeration {
    pub fn verdict(&self) -> Verdict {
        match self.solutions.as_slice() {
            [] => Verdict::NoInformation,
            [only] => Verdict::Unique(self.frontier.iter().copied().zip(only.iter().copied()).collect()),
            solutions => {
                let mut safe = Vec::new();
                let mut mines = Vec::new();
                for (i, &cell) in self.frontier.iter().enumerate() {
                    if solutions.iter().all(|s| s[i] == 0) {
                        safe.push(cell);
                    } else if solutions.iter().all(|s| s[i] == 1) {
                        mines.push(cell);
                    }
                }
                if safe.is_empty() && mines.is_empty() {
                    Verdict::Ambiguous
                } else {
                    Verdict::Forced { safe, mines }
                }
            }
        }
    }

    /// Value-0 cells of the first accepted solution.
    pub fn first_solution_safes(&self) -> Vec<Coord> {
        match self.solutions.first() {
            Some(solution) => self
                .frontier
                .iter()
                .zip(solution)
                .filter(|&(_, &v)| v == 0)
                .map(|(&c, _)| c)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Every assignment of `frontier` whose mine count fits `bounds` and which
/// the revealed constants admit.
pub fn enumerate(
    store: &mut ConstraintStore,
    cache: &mut ValidityCache,
    frontier: &[Coord],
    bounds: MineBounds,
) -> Enumeration {
    let mut result = Enumeration {
        frontier: frontier.to_vec(),
        solutions: Vec::new(),
    };
    let len = frontier.len();
    if len == 0 {
        return result;
    }

    let mut assignment: Vec<u8> = Vec::with_capacity(len);
    let mut trial: Vec<(Coord, u8)> = Vec::with_capacity(len);
    let mut visited = 0usize;
    // (depth, value); 1 is pushed first so 0 is explored first
    let mut stack: Vec<(usize, u8)> = vec![(0, 1), (0, 0)];

    while let Some((depth, value)) = stack.pop() {
        visited += 1;
        assignment.truncate(depth);
        assignment.push(value);

        let mines = assignment.iter().filter(|&&v| v == 1).count();
        if mines > bounds.max {
            continue;
        }
        if assignment.len() < len {
            stack.push((depth + 1, 1));
            stack.push((depth + 1, 0));
            continue;
        }
        if !bounds.admits(mines) {
            continue;
        }

        trial.clear();
        trial.extend(frontier.iter().copied().zip(assignment.iter().copied()));
        if cache.is_valid(store, &trial) {
            result.solutions.push(assignment.clone());
        }
    }

    debug!(
        "enumerated {} cells within {:?}: {} nodes, {} solutions",
        len,
        bounds,
        visited,
        result.solutions.len()
    );
    result
}

/// Enumerate `regions` in order until one yields a certain verdict, with
/// `budget` mines left to place. Returns every enumeration tried; when one was
/// certain it is the last.
pub fn enumerate_regions(
    store: &mut ConstraintStore,
    cache: &mut ValidityCache,
    regions: &[Vec<Coord>],
    budget: usize,
) -> Vec<Enumeration> {
    let undetermined = store.undetermined().len();
    let mut tried = Vec::new();
    for region in regions {
        let bounds = MineBounds::new(budget, undetermined - region.len());
        let enumeration = enumerate(store, cache, region, bounds);
        let certain = enumeration.verdict().is_certain();
        tried.push(enumeration);
        if certain {
            break;
        }
    }
    tried
}
