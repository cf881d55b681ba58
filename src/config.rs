//! Solver configuration.
//!
//! Deserializable with every field optional, so a JS caller can pass `{}` or a
//! partial object through `serde-wasm-bindgen`.

use crate::error::{Result, SolveError};
use crate::types::Coord;
use serde::{Deserialize, Serialize};

/// Default cap on the enumeration frontier (2^10 assignments).
pub const DEFAULT_MAX_FRONTIER: usize = 10;

/// Hard limit for `max_frontier`; beyond this the search blows up.
pub const MAX_FRONTIER_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    /// First probe.
    pub start: Coord,
    /// Extra coordinates revealed alongside the start probe.
    pub hints: Vec<Coord>,
    pub max_frontier: usize,
    /// Probe an untouched board corner before guessing from a solution.
    pub prefer_corners: bool,
    /// Fixed seed for the random probe; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            start: (0, 0),
            hints: Vec::new(),
            max_frontier: DEFAULT_MAX_FRONTIER,
            prefer_corners: true,
            seed: None,
        }
    }
}

impl SolverConfig {
    pub fn with_start(mut self, start: Coord) -> Self {
        self.start = start;
        self
    }

    pub fn with_hints(mut self, hints: impl IntoIterator<Item = Coord>) -> Self {
        self.hints.extend(hints);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_frontier(mut self, max_frontier: usize) -> Self {
        self.max_frontier = max_frontier;
        self
    }

    pub fn with_corner_preference(mut self, prefer_corners: bool) -> Self {
        self.prefer_corners = prefer_corners;
        self
    }

    /// Check the config against the board dimensions.
    pub fn validate(&self, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(SolveError::InvalidConfig(format!(
                "board must not be empty, got {width}x{height}"
            )));
        }
        if !(1..=MAX_FRONTIER_LIMIT).contains(&self.max_frontier) {
            return Err(SolveError::InvalidConfig(format!(
                "max_frontier must be in 1..={MAX_FRONTIER_LIMIT}, got {}",
                self.max_frontier
            )));
        }
        for &(x, y) in std::iter::once(&self.start).chain(&self.hints) {
            if x >= width || y >= height {
                return Err(SolveError::InvalidConfig(format!(
                    "probe ({x}, {y}) is outside the {width}x{height} board"
                )));
            }
        }
        Ok(())
    }
}
