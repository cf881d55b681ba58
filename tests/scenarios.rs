use mine_csp::board::{Board, GameStatus, Minefield, RevealOutcome};
use mine_csp::config::SolverConfig;
use mine_csp::engine::Propagation;
use mine_csp::search::{self, MineBounds, ValidityCache, Verdict};
use mine_csp::solver::{Decision, Fallback, Solver};
use mine_csp::store::ConstraintStore;
use mine_csp::types::{Coord, Domain, NeighborCache};

/// Delegates to a real field but reports a different mine total.
struct MiscountedBoard {
    inner: Minefield,
    claimed: usize,
}

impl Board for MiscountedBoard {
    fn width(&self) -> usize {
        self.inner.width()
    }
    fn height(&self) -> usize {
        self.inner.height()
    }
    fn total_mines(&self) -> usize {
        self.claimed
    }
    fn neighbors(&self, x: usize, y: usize) -> Vec<Coord> {
        self.inner.neighbors(x, y)
    }
    fn reveal(&mut self, x: usize, y: usize) -> RevealOutcome {
        self.inner.reveal(x, y)
    }
    fn flag(&mut self, x: usize, y: usize) {
        self.inner.flag(x, y)
    }
    fn visible(&self, x: usize, y: usize) -> Option<u8> {
        self.inner.visible(x, y)
    }
    fn is_flagged(&self, x: usize, y: usize) -> bool {
        self.inner.is_flagged(x, y)
    }
    fn revealed(&self) -> Vec<Coord> {
        self.inner.revealed()
    }
    fn flagged(&self) -> Vec<Coord> {
        self.inner.flagged()
    }
    fn status(&self) -> GameStatus {
        self.inner.status()
    }
}

#[test]
fn test_single_corner_mine() {
    // | 0| 0| 0|
    // | 0| 1| 1|
    // | 0| 1| *|
    let field = Minefield::from_mines(3, 3, &[(2, 2)]);
    let mut solver = Solver::new(field).unwrap();

    assert!(solver.solve().unwrap());
    assert_eq!(solver.domain((2, 2)), Domain::MINE);
    assert_eq!(solver.value((2, 2)), Some(1));
    assert!(solver.board().is_flagged(2, 2));
    assert_eq!(solver.store().checked_count(), 8);
    assert!(solver.store().is_consistent());
    assert!(solver.decisions().is_empty());
}

#[test]
fn test_center_mine_needs_no_search() {
    let field = Minefield::from_mines(3, 3, &[(1, 1)]);
    let config = SolverConfig::default().with_hints([(1, 0), (0, 1)]);
    let mut solver = Solver::with_config(field, config).unwrap();

    assert!(solver.solve().unwrap());
    assert_eq!(solver.value((1, 1)), Some(1));
    assert!(solver.decisions().is_empty());
    assert!(solver.store().active_arcs().is_empty());
    assert_eq!(solver.report().cache_misses, 0);

    let field = solver.into_board();
    assert_eq!(field.flagged(), vec![(1, 1)]);
}

#[test]
fn test_two_mines_over_three_cells() {
    // | 0| 0| 0|
    // | 1| 2| 2|   mines at (1, 2) and (2, 2)
    // | ?| ?| ?|
    let mut store = ConstraintStore::new(NeighborCache::new(3, 3));
    for cell in [(0, 0), (1, 0), (2, 0)] {
        store.register_reveal(cell, 0).unwrap();
    }
    store.register_reveal((1, 1), 2).unwrap();
    store.commit((0, 1), 0).unwrap();
    store.commit((2, 1), 0).unwrap();

    let frontier = search::select_frontier(&store, 10);
    assert_eq!(frontier, vec![(0, 2), (1, 2), (2, 2)]);

    let outside = store.undetermined().len() - frontier.len();
    let bounds = MineBounds::new(2, outside);
    assert_eq!(bounds, MineBounds { min: 2, max: 2 });

    let mut cache = ValidityCache::new();
    let result = search::enumerate(&mut store, &mut cache, &frontier, bounds);
    assert_eq!(result.solutions, vec![vec![0, 1, 1], vec![1, 0, 1], vec![1, 1, 0]]);
    for solution in &result.solutions {
        assert_eq!(solution.iter().filter(|&&v| v == 1).count(), 2);
    }
    assert_eq!(result.verdict(), Verdict::Ambiguous);

    // a second pass is served from the cache and agrees
    let misses = cache.misses();
    let again = search::enumerate(&mut store, &mut cache, &frontier, bounds);
    assert_eq!(again.solutions, result.solutions);
    assert_eq!(cache.misses(), misses);
    assert_eq!(cache.hits(), 3);
}

#[test]
fn test_budget_exhausted_marks_rest_safe() {
    // | 1| *| ?| ?| ?|
    let field = Minefield::from_mines(5, 1, &[(1, 0)]);
    let mut solver = Solver::new(field).unwrap();

    assert!(solver.solve().unwrap());
    assert_eq!(solver.decisions(), &[Decision::BudgetExhausted { marked: 3 }]);
    let report = solver.report();
    assert_eq!(report.cache_misses, 0);
    assert_eq!(report.checked, 4);
    assert_eq!(report.status, GameStatus::Won);
}

#[test]
fn test_no_solution_guesses_corner() {
    // claims one mine while the revealed 2 needs two
    let board = MiscountedBoard {
        inner: Minefield::from_mines(3, 3, &[(1, 2), (2, 2)]),
        claimed: 1,
    };
    let config = SolverConfig::default().with_start((1, 1));
    let mut solver = Solver::with_config(board, config).unwrap();

    assert_eq!(solver.propagate().unwrap(), Propagation::Stalled);
    // the eight neighbors of the 2 form a single region
    let tried = solver.enumerate();
    assert_eq!(tried.len(), 1);
    assert_eq!(tried[0].frontier.len(), 8);
    assert_eq!(tried[0].verdict(), Verdict::NoInformation);

    let checked = solver.store().checked_count();
    assert_eq!(
        solver.decide().unwrap(),
        Decision::Fallback(Fallback::Corner((0, 0)))
    );
    solver.propagate().unwrap();
    assert!(solver.store().checked_count() > checked);
}

#[test]
fn test_no_solution_guesses_random_frontier_cell() {
    let board = MiscountedBoard {
        inner: Minefield::from_mines(3, 3, &[(1, 2), (2, 2)]),
        claimed: 1,
    };
    let config = SolverConfig::default()
        .with_start((1, 1))
        .with_corner_preference(false)
        .with_seed(11);
    let mut solver = Solver::with_config(board, config).unwrap();

    assert_eq!(solver.propagate().unwrap(), Propagation::Stalled);
    let checked = solver.store().checked_count();
    let guess = match solver.decide().unwrap() {
        Decision::Fallback(Fallback::Random(cell)) => cell,
        other => panic!("expected a random guess, got {:?}", other),
    };
    assert!(solver.store().neighbors((1, 1)).contains(&guess));

    let outcome = solver.propagate().unwrap();
    assert!(outcome == Propagation::Terminal(GameStatus::Lost) || solver.store().checked_count() > checked);
}

#[test]
fn test_progress_reaches_one_on_win() {
    let field = Minefield::from_mines(4, 4, &[(3, 3)]);
    let mut solver = Solver::new(field).unwrap();
    assert_eq!(solver.progress(), 0.0);
    assert!(solver.solve().unwrap());
    assert!((solver.progress() - 1.0).abs() < f64::EPSILON);
    assert!(solver.store().is_consistent());
}
