//! Constraint-propagation Minesweeper solver.
//!
//! Infers mine / safe values from revealed numbers with arc consistency
//! (AC-3) and falls back to bounded enumeration over the frontier when
//! propagation stalls. The solver plays against anything implementing
//! [`board::Board`]; [`board::Minefield`] is the bundled reference board.
//!
//! Grid data crossing the wasm boundary is flat and column-major:
//! `cells[x * height + y]` maps to JS `grid[x][y]`.

pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod rng;
pub mod search;
pub mod solver;
pub mod store;
pub mod types;

pub use board::{Board, GameStatus, Minefield, RevealOutcome};
pub use config::SolverConfig;
pub use error::{Result, SolveError};
pub use solver::{Decision, Fallback, SolveReport, Solver};

// ─── WASM Exports (only compiled for wasm32 target) ─────────────────────────

#[cfg(target_arch = "wasm32")]
mod wasm_exports {
    use wasm_bindgen::prelude::*;
    use crate::board::{self, Minefield};
    use crate::config::SolverConfig;
    use crate::solver::Solver;
    use crate::types::{Layer, NeighborCache};

    fn to_js_error(err: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&err.to_string())
    }

    /// Solve a board from its mine layout.
    ///
    /// `config` is an optional `{ start, hints, maxFrontier, preferCorners, seed }`
    /// object. Returns the solve report. Throws when `mines_flat` does not hold
    /// `width * height` cells, or on a solver defect.
    #[wasm_bindgen(js_name = "solveBoard")]
    pub fn wasm_solve_board(
        width: usize,
        height: usize,
        mines_flat: &[u8],
        config: JsValue,
    ) -> Result<JsValue, JsValue> {
        let config: SolverConfig = if config.is_undefined() || config.is_null() {
            SolverConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };

        let mines = Layer::from_flags(width, height, mines_flat).map_err(to_js_error)?;
        let field = Minefield::from_layer(mines);
        let mut solver = Solver::with_config(field, config).map_err(to_js_error)?;
        solver.solve().map_err(to_js_error)?;
        Ok(serde_wasm_bindgen::to_value(&solver.report())?)
    }

    /// Calculate neighbor mine counts for all cells.
    #[wasm_bindgen(js_name = "calculateNumbers")]
    pub fn wasm_calculate_numbers(
        width: usize,
        height: usize,
        mines_flat: &[u8],
    ) -> Result<js_sys::Uint8Array, JsValue> {
        let mines = Layer::from_flags(width, height, mines_flat).map_err(to_js_error)?;
        let nc = NeighborCache::new(width, height);
        let numbers = board::calculate_numbers(&mines, &nc);

        let arr = js_sys::Uint8Array::new_with_length(numbers.as_slice().len() as u32);
        arr.copy_from(numbers.as_slice());
        Ok(arr)
    }

    /// Ping function to verify WASM is loaded.
    #[wasm_bindgen(js_name = "ping")]
    pub fn wasm_ping() -> String {
        "WASM solver ready".to_string()
    }
}
