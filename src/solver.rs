//! Decision loop of the solver.
//!
//! Alternates arc-consistency propagation with frontier enumeration until the
//! board reports a terminal state:
//! - Propagate reveals and deductions to a fixpoint
//! - Budget shortcut: with every mine accounted for, everything else is safe
//! - Enumerate frontier regions smallest first and commit what all solutions of
//!   the first certain region agree on
//! - Otherwise probe: an open corner, the first solution's safe cells, or a
//!   random frontier cell

use crate::board::{Board, GameStatus};
use crate::config::SolverConfig;
use crate::engine::{Engine, Propagation};
use crate::error::{Result, SolveError};
use crate::rng::ProbeRng;
use crate::search::{self, Enumeration, ValidityCache, Verdict};
use crate::store::ConstraintStore;
use crate::types::{Coord, Domain, Layer, NeighborCache};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// ─── Decisions ──────────────────────────────────────────────────────────────

/// Probe chosen when enumeration settles nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Fallback {
    Corner(Coord),
    FirstSolution(Vec<Coord>),
    Random(Coord),
}

/// What one outer iteration did after propagation stalled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Decision {
    /// No mines left to place; the remaining cells were marked safe.
    BudgetExhausted { marked: usize },
    /// The frontier had a single consistent layout.
    Resolved { cells: usize, mines: usize },
    Forced { safe: Vec<Coord>, mines: Vec<Coord> },
    Fallback(Fallback),
}

/// Summary of a solve, serializable for the wasm surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveReport {
    pub status: GameStatus,
    pub solved: bool,
    pub checked: usize,
    pub determined: usize,
    pub mines_committed: usize,
    pub decisions: Vec<Decision>,
    pub revisions: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub progress: f64,
}

// ─── Solver ─────────────────────────────────────────────────────────────────

/// Owns the board for the duration of a solve.
pub struct Solver<B: Board> {
    board: B,
    store: ConstraintStore,
    engine: Engine,
    cache: ValidityCache,
    rng: ProbeRng,
    config: SolverConfig,
    decisions: Vec<Decision>,
}

impl<B: Board> Solver<B> {
    pub fn new(board: B) -> Result<Self> {
        Self::with_config(board, SolverConfig::default())
    }

    /// Build a solver and queue the configured start probe and hints.
    pub fn with_config(board: B, config: SolverConfig) -> Result<Self> {
        let (width, height) = (board.width(), board.height());
        config.validate(width, height)?;

        let neighbors = NeighborCache::from_fn(width, height, |x, y| board.neighbors(x, y));
        let mut solver = Self {
            store: ConstraintStore::new(neighbors),
            engine: Engine::new(),
            cache: ValidityCache::new(),
            rng: ProbeRng::from_optional_seed(config.seed),
            decisions: Vec::new(),
            board,
            config,
        };
        for cell in std::iter::once(solver.config.start).chain(solver.config.hints.iter().copied()) {
            solver.engine.schedule_reveal(cell);
        }
        Ok(solver)
    }

    /// Queue an extra coordinate that is known to be safe.
    pub fn hint(&mut self, cell: Coord) -> Result<()> {
        let (width, height) = (self.board.width(), self.board.height());
        if cell.0 >= width || cell.1 >= height {
            return Err(SolveError::InvalidConfig(format!(
                "hint ({}, {}) is outside the {width}x{height} board",
                cell.0, cell.1
            )));
        }
        self.engine.schedule_reveal(cell);
        Ok(())
    }

    /// Run until the board is won or lost. `Ok(true)` means won.
    pub fn solve(&mut self) -> Result<bool> {
        loop {
            if let Propagation::Terminal(status) = self.propagate()? {
                return self.finalize(status);
            }

            let determined = self.store.determined_count();
            let decision = self.decide()?;
            info!("decision: {:?}", decision);
            self.decisions.push(decision);

            if self.store.determined_count() == determined && self.engine.pending_reveals() == 0 {
                return Err(SolveError::NoProgress {
                    checked: self.store.checked_count(),
                    determined,
                });
            }
        }
    }

    /// Propagate to terminal or stalled.
    pub fn propagate(&mut self) -> Result<Propagation> {
        self.engine.run(&mut self.store, &mut self.board)
    }

    /// Mines not yet committed.
    pub fn mine_budget(&self) -> usize {
        self.board.total_mines().saturating_sub(self.store.committed_mines())
    }

    /// Enumerate frontier regions smallest first within the global mine
    /// window. Stops at the first region with a certain verdict, which is
    /// then the last entry.
    pub fn enumerate(&mut self) -> Vec<Enumeration> {
        let regions = search::frontier_regions(&self.store, self.config.max_frontier);
        let budget = self.mine_budget();
        search::enumerate_regions(&mut self.store, &mut self.cache, &regions, budget)
    }

    /// One step of the policy on a stalled store. Commits or queues probes.
    pub fn decide(&mut self) -> Result<Decision> {
        if self.mine_budget() == 0 {
            let remaining = self.store.undetermined();
            for &cell in &remaining {
                self.settle(cell, 0)?;
            }
            return Ok(Decision::BudgetExhausted {
                marked: remaining.len(),
            });
        }

        let tried = self.enumerate();
        match tried.last().map(Enumeration::verdict) {
            Some(Verdict::Unique(assignment)) => {
                let mines = assignment.iter().filter(|&&(_, v)| v == 1).count();
                for &(cell, value) in &assignment {
                    self.settle(cell, value)?;
                }
                Ok(Decision::Resolved {
                    cells: assignment.len(),
                    mines,
                })
            }
            Some(Verdict::Forced { safe, mines }) => {
                for &cell in &safe {
                    self.settle(cell, 0)?;
                }
                for &cell in &mines {
                    self.settle(cell, 1)?;
                }
                Ok(Decision::Forced { safe, mines })
            }
            _ => self.fallback(&tried).map(Decision::Fallback),
        }
    }

    /// Queue a probe when no region is provable.
    pub fn fallback(&mut self, tried: &[Enumeration]) -> Result<Fallback> {
        if self.config.prefer_corners {
            if let Some(corner) = self.open_corner() {
                warn!("guessing corner ({}, {})", corner.0, corner.1);
                self.engine.schedule_reveal(corner);
                return Ok(Fallback::Corner(corner));
            }
        }

        for enumeration in tried {
            let guesses = enumeration.first_solution_safes();
            if !guesses.is_empty() {
                warn!("guessing {} cells from the first of {} solutions", guesses.len(), enumeration.solutions.len());
                for &cell in &guesses {
                    self.engine.schedule_reveal(cell);
                }
                return Ok(Fallback::FirstSolution(guesses));
            }
        }

        let mut pool: Vec<Coord> = tried.iter().flat_map(|e| e.frontier.iter().copied()).collect();
        if pool.is_empty() {
            pool = self.store.undetermined();
        }
        match self.rng.choose(&pool) {
            Some(&cell) => {
                warn!("guessing random cell ({}, {})", cell.0, cell.1);
                self.engine.schedule_reveal(cell);
                Ok(Fallback::Random(cell))
            }
            None => Err(SolveError::NoProgress {
                checked: self.store.checked_count(),
                determined: self.store.determined_count(),
            }),
        }
    }

    /// First board corner that is neither flagged, revealed nor determined.
    fn open_corner(&self) -> Option<Coord> {
        let (right, bottom) = (self.board.width() - 1, self.board.height() - 1);
        [(0, 0), (right, 0), (0, bottom), (right, bottom)]
            .into_iter()
            .find(|&(x, y)| {
                !self.board.is_flagged(x, y) && !self.store.is_checked((x, y)) && !self.store.is_determined((x, y))
            })
    }

    fn settle(&mut self, cell: Coord, value: u8) -> Result<bool> {
        self.engine.settle(&mut self.store, &mut self.board, cell, value)
    }

    /// On a win every concealed cell is a mine: commit and flag them.
    fn finalize(&mut self, status: GameStatus) -> Result<bool> {
        if status == GameStatus::Won {
            for cell in self.store.undetermined() {
                self.store.commit(cell, 1)?;
                if !self.board.is_flagged(cell.0, cell.1) {
                    self.board.flag(cell.0, cell.1);
                }
            }
            let retired = self.store.retire_settled();
            debug!("finalized, retired {} arcs", retired);
        }
        info!(
            "{:?} after {} decisions, {} revealed, {} determined",
            status,
            self.decisions.len(),
            self.store.checked_count(),
            self.store.determined_count()
        );
        Ok(status == GameStatus::Won)
    }

    // ─── Diagnostics ────────────────────────────────────────────────────────

    pub fn domain(&self, cell: Coord) -> Domain {
        self.store.domain(cell)
    }

    pub fn value(&self, cell: Coord) -> Option<u8> {
        self.store.value(cell)
    }

    pub fn domains(&self) -> &Layer<Domain> {
        self.store.domains()
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Fraction of coordinates with a committed value.
    pub fn progress(&self) -> f64 {
        let total = self.store.width() * self.store.height();
        self.store.determined_count() as f64 / total as f64
    }

    pub fn report(&self) -> SolveReport {
        let status = self.board.status();
        SolveReport {
            status,
            solved: status == GameStatus::Won,
            checked: self.store.checked_count(),
            determined: self.store.determined_count(),
            mines_committed: self.store.committed_mines(),
            decisions: self.decisions.clone(),
            revisions: self.engine.revisions(),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            progress: self.progress(),
        }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn store(&self) -> &ConstraintStore {
        &self.store
    }

    pub fn into_board(self) -> B {
        self.board
    }
}
