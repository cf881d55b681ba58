//! Failures a solve can surface.
//!
//! Terminal game states are not errors; they come back as the `solve()` result.
//! A stalled search with nothing to deduce is not an error either: it is routed
//! to a fallback probe inside the decision loop.

use crate::types::Coord;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// A domain was emptied although the board is consistent. Solver defect.
    #[error("domain of {coord:?} emptied after eliminating {eliminated:?}")]
    InternalInconsistency { coord: Coord, eliminated: Vec<u8> },

    /// Something tried to overwrite a committed value.
    #[error("{coord:?} is committed to {committed}, refusing {attempted}")]
    ValueConflict {
        coord: Coord,
        committed: u8,
        attempted: u8,
    },

    /// An outer iteration neither committed a value nor queued a reveal.
    #[error("no progress with {checked} checked and {determined} determined cells")]
    NoProgress { checked: usize, determined: usize },

    #[error("invalid solver config: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = SolveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_cell() {
        let err = SolveError::InternalInconsistency {
            coord: (2, 1),
            eliminated: vec![0, 1],
        };
        assert_eq!(err.to_string(), "domain of (2, 1) emptied after eliminating [0, 1]");

        let err = SolveError::ValueConflict {
            coord: (0, 3),
            committed: 1,
            attempted: 0,
        };
        assert_eq!(err.to_string(), "(0, 3) is committed to 1, refusing 0");
    }
}
