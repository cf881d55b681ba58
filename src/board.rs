//! The ground-truth board the solver plays against.
//!
//! The solver only talks to a board through the [`Board`] trait: it reveals,
//! flags and reads what any player could see. [`Minefield`] is the reference
//! implementation used by tests and the wasm exports; mine placement and number
//! calculation live here too.

use crate::rng::ProbeRng;
use crate::types::{Coord, Layer, NeighborCache};
use serde::{Deserialize, Serialize};

/// Terminal status as reported by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Won,
    Lost,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::Playing
    }
}

/// Result of a single reveal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    AlreadyRevealed,
    /// Not a mine; carries the number of neighboring mines.
    Safe(u8),
    Mine,
}

/// Collaborator interface the solver consumes.
pub trait Board {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn total_mines(&self) -> usize;

    /// Edge-clipped 8-neighborhood of `(x, y)`.
    fn neighbors(&self, x: usize, y: usize) -> Vec<Coord>;

    /// Uncover a cell. A revealed zero cascades to its neighbors.
    fn reveal(&mut self, x: usize, y: usize) -> RevealOutcome;

    /// Toggle the flag marker. Never changes the truth of a cell.
    fn flag(&mut self, x: usize, y: usize);

    /// The number shown on a revealed cell, `None` while it is concealed.
    fn visible(&self, x: usize, y: usize) -> Option<u8>;

    fn is_flagged(&self, x: usize, y: usize) -> bool;

    fn revealed(&self) -> Vec<Coord>;

    fn flagged(&self) -> Vec<Coord>;

    fn status(&self) -> GameStatus;
}

/// Place `mine_count` mines uniformly, skipping every cell within `safe_radius`
/// (Chebyshev distance) of `safe`.
///
/// Places fewer mines only when the board has fewer eligible cells.
pub fn place_mines_random(
    width: usize,
    height: usize,
    mine_count: usize,
    safe: Coord,
    safe_radius: usize,
    rng: &mut ProbeRng,
) -> Layer<bool> {
    let mut mines = Layer::filled(width, height, false);
    let mut candidates: Vec<Coord> = mines
        .coords()
        .filter(|&(x, y)| x.abs_diff(safe.0) > safe_radius || y.abs_diff(safe.1) > safe_radius)
        .collect();

    for _ in 0..mine_count.min(candidates.len()) {
        let pick = candidates.swap_remove(rng.gen_range(candidates.len()));
        mines.set(pick, true);
    }
    mines
}

/// Neighbor mine counts for every non-mine cell. Mine cells stay 0.
pub fn calculate_numbers(mines: &Layer<bool>, neighbor_cache: &NeighborCache) -> Layer<u8> {
    let mut numbers = Layer::filled(mines.width, mines.height, 0u8);
    for cell in mines.coords() {
        if mines.get(cell) {
            continue;
        }
        let count = neighbor_cache
            .get(cell)
            .iter()
            .filter(|&&n| mines.get(n))
            .count();
        numbers.set(cell, count as u8);
    }
    numbers
}

/// In-memory board with full ground truth.
#[derive(Clone, Debug)]
pub struct Minefield {
    mines: Layer<bool>,
    numbers: Layer<u8>,
    shown: Layer<bool>,
    flags: Layer<bool>,
    neighbor_cache: NeighborCache,
    mine_count: usize,
    revealed_count: usize,
    status: GameStatus,
}

impl Minefield {
    pub fn from_layer(mines: Layer<bool>) -> Self {
        let neighbor_cache = NeighborCache::new(mines.width, mines.height);
        let numbers = calculate_numbers(&mines, &neighbor_cache);
        let (width, height) = (mines.width, mines.height);
        let mine_count = mines.count();
        let mut field = Self {
            mines,
            numbers,
            shown: Layer::filled(width, height, false),
            flags: Layer::filled(width, height, false),
            neighbor_cache,
            mine_count,
            revealed_count: 0,
            status: GameStatus::Playing,
        };
        field.update_status();
        field
    }

    pub fn from_mines(width: usize, height: usize, mines: &[Coord]) -> Self {
        let mut layer = Layer::filled(width, height, false);
        for &cell in mines {
            layer.set(cell, true);
        }
        Self::from_layer(layer)
    }

    /// Random layout whose first probe at `safe` cannot hit a mine.
    pub fn random(
        width: usize,
        height: usize,
        mine_count: usize,
        safe: Coord,
        safe_radius: usize,
        rng: &mut ProbeRng,
    ) -> Self {
        Self::from_layer(place_mines_random(width, height, mine_count, safe, safe_radius, rng))
    }

    /// Ground truth; for tests and callers that own the layout.
    pub fn is_mine(&self, cell: Coord) -> bool {
        self.mines.get(cell)
    }

    /// Ground-truth neighbor count of a non-mine cell.
    pub fn number(&self, cell: Coord) -> u8 {
        self.numbers.get(cell)
    }

    pub fn mines(&self) -> &Layer<bool> {
        &self.mines
    }

    fn update_status(&mut self) {
        if self.status == GameStatus::Playing
            && self.revealed_count == self.mines.width * self.mines.height - self.mine_count
        {
            self.status = GameStatus::Won;
        }
    }
}

impl Board for Minefield {
    fn width(&self) -> usize {
        self.mines.width
    }

    fn height(&self) -> usize {
        self.mines.height
    }

    fn total_mines(&self) -> usize {
        self.mine_count
    }

    fn neighbors(&self, x: usize, y: usize) -> Vec<Coord> {
        self.neighbor_cache.get((x, y)).to_vec()
    }

    fn reveal(&mut self, x: usize, y: usize) -> RevealOutcome {
        let start = (x, y);
        if self.shown.get(start) {
            return RevealOutcome::AlreadyRevealed;
        }
        if self.mines.get(start) {
            self.status = GameStatus::Lost;
            return RevealOutcome::Mine;
        }

        let mut stack = vec![start];
        while let Some(cell) = stack.pop() {
            if self.shown.get(cell) || self.mines.get(cell) {
                continue;
            }
            self.shown.set(cell, true);
            self.revealed_count += 1;
            if self.numbers.get(cell) == 0 {
                stack.extend(
                    self.neighbor_cache
                        .get(cell)
                        .iter()
                        .filter(|&&n| !self.shown.get(n)),
                );
            }
        }
        self.update_status();
        RevealOutcome::Safe(self.numbers.get(start))
    }

    fn flag(&mut self, x: usize, y: usize) {
        let cell = (x, y);
        if !self.shown.get(cell) {
            self.flags.set(cell, !self.flags.get(cell));
        }
    }

    fn visible(&self, x: usize, y: usize) -> Option<u8> {
        self.shown.get((x, y)).then(|| self.numbers.get((x, y)))
    }

    fn is_flagged(&self, x: usize, y: usize) -> bool {
        self.flags.get((x, y))
    }

    fn revealed(&self) -> Vec<Coord> {
        self.shown.iter().filter(|&(_, v)| v).map(|(c, _)| c).collect()
    }

    fn flagged(&self) -> Vec<Coord> {
        self.flags.iter().filter(|&(_, v)| v).map(|(c, _)| c).collect()
    }

    fn status(&self) -> GameStatus {
        self.status
    }
}
