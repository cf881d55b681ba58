//! Core data types shared by the board and the solver.
//!
//! All per-cell storage uses flat `Vec` with column-major layout:
//! `cells[x * height + y]` is the cell at column `x`, row `y`.

use crate::error::{Result, SolveError};
use serde::{Deserialize, Serialize};

/// A grid position `(x, y)`: column, then row.
pub type Coord = (usize, usize);

/// Bit-pack (x, y) into a single u32 key.
#[inline(always)]
pub fn cell_key(x: usize, y: usize) -> u32 {
    ((x as u32) << 16) | (y as u32)
}

/// One value per cell, column-major.
#[derive(Clone, Debug)]
pub struct Layer<T> {
    pub width: usize,
    pub height: usize,
    cells: Vec<T>,
}

impl<T: Copy> Layer<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    #[inline(always)]
    pub fn get(&self, (x, y): Coord) -> T {
        self.cells[x * self.height + y]
    }

    #[inline(always)]
    pub fn set(&mut self, (x, y): Coord, value: T) {
        self.cells[x * self.height + y] = value;
    }

    /// All coordinates in storage order (x-major).
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        let height = self.height;
        (0..self.width).flat_map(move |x| (0..height).map(move |y| (x, y)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, T)> + '_ {
        self.coords().map(move |c| (c, self.get(c)))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

impl Layer<bool> {
    /// Build from a flat 0/1 byte slice in column-major order. The slice must
    /// hold exactly `width * height` bytes.
    pub fn from_flags(width: usize, height: usize, flat: &[u8]) -> Result<Self> {
        if flat.len() != width * height {
            return Err(SolveError::InvalidConfig(format!(
                "expected {} cells for a {width}x{height} board, got {}",
                width * height,
                flat.len()
            )));
        }
        let cells = flat.iter().map(|&byte| byte != 0).collect();
        Ok(Self { width, height, cells })
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }
}

/// Pre-computed neighbor lists for every cell.
///
/// Stores the 8-directional neighbors (clipped to grid bounds) for every cell.
/// Indexed by `x * height + y`, each entry is a slice of coordinates.
#[derive(Clone, Debug)]
pub struct NeighborCache {
    pub width: usize,
    pub height: usize,
    /// Flat storage of all neighbor pairs.
    data: Vec<Coord>,
    /// offsets[i]..offsets[i+1] is the neighbor range of cell i.
    offsets: Vec<usize>,
}

impl NeighborCache {
    /// Build the standard edge-clipped 8-neighborhood for a grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |x, y| {
            let mut out = Vec::with_capacity(8);
            for dx in -1i64..=1 {
                for dy in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx >= 0 && nx < width as i64 && ny >= 0 && ny < height as i64 {
                        out.push((nx as usize, ny as usize));
                    }
                }
            }
            out
        })
    }

    /// Build the cache from an arbitrary neighbor function, e.g. a board's own
    /// `neighbors` query.
    pub fn from_fn<F>(width: usize, height: usize, mut neighbors: F) -> Self
    where
        F: FnMut(usize, usize) -> Vec<Coord>,
    {
        let total = width * height;
        let mut data = Vec::with_capacity(total * 8);
        let mut offsets = Vec::with_capacity(total + 1);

        for x in 0..width {
            for y in 0..height {
                offsets.push(data.len());
                data.extend(neighbors(x, y));
            }
        }
        offsets.push(data.len()); // sentinel

        Self {
            width,
            height,
            data,
            offsets,
        }
    }

    #[inline(always)]
    pub fn get(&self, (x, y): Coord) -> &[Coord] {
        let idx = x * self.height + y;
        &self.data[self.offsets[idx]..self.offsets[idx + 1]]
    }

    #[inline]
    pub fn are_adjacent(&self, a: Coord, b: Coord) -> bool {
        self.get(a).contains(&b)
    }
}

/// Candidate values of one cell: a subset of {0 = safe, 1 = mine}.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct Domain(u8);

impl Domain {
    pub const EMPTY: Domain = Domain(0b00);
    pub const SAFE: Domain = Domain(0b01);
    pub const MINE: Domain = Domain(0b10);
    pub const BOTH: Domain = Domain(0b11);

    /// Singleton domain holding `value`.
    pub fn only(value: u8) -> Self {
        debug_assert!(value < 2);
        Domain(1 << value)
    }

    #[inline]
    pub fn contains(self, value: u8) -> bool {
        value < 2 && self.0 & (1 << value) != 0
    }

    #[inline]
    pub fn remove(&mut self, value: u8) {
        if value < 2 {
            self.0 &= !(1 << value);
        }
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The single remaining value, if the domain is a singleton.
    pub fn value(self) -> Option<u8> {
        match self {
            Domain::SAFE => Some(0),
            Domain::MINE => Some(1),
            _ => None,
        }
    }

    pub fn values(self) -> impl Iterator<Item = u8> {
        (0..2u8).filter(move |&v| self.contains(v))
    }
}

impl From<Domain> for Vec<u8> {
    fn from(domain: Domain) -> Self {
        domain.values().collect()
    }
}

impl TryFrom<Vec<u8>> for Domain {
    type Error = String;

    fn try_from(values: Vec<u8>) -> Result<Self, Self::Error> {
        let mut domain = Domain::EMPTY;
        for v in values {
            if v > 1 {
                return Err(format!("domain value {v} is not 0 or 1"));
            }
            domain.0 |= 1 << v;
        }
        Ok(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_key_orders_like_storage() {
        // sorting packed keys sorts column-major
        assert!(cell_key(0, 900) < cell_key(1, 0));
        assert!(cell_key(3, 4) < cell_key(3, 5));
        assert_ne!(cell_key(1, 2), cell_key(2, 1));
    }

    #[test]
    fn test_layer_get_set() {
        let mut layer = Layer::filled(10, 8, 0u8);
        layer.set((3, 5), 7);
        assert_eq!(layer.get((3, 5)), 7);
        assert_eq!(layer.get((0, 0)), 0);
    }

    #[test]
    fn test_layer_coords_are_column_major() {
        let layer = Layer::filled(2, 3, ());
        let coords: Vec<Coord> = layer.coords().collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_flags_from_flat() {
        let layer = Layer::from_flags(2, 2, &[0, 1, 0, 1]).unwrap();
        assert!(layer.get((0, 1)));
        assert!(layer.get((1, 1)));
        assert_eq!(layer.count(), 2);
    }

    #[test]
    fn test_flags_length_must_match_board() {
        assert!(matches!(
            Layer::from_flags(3, 3, &[0; 8]),
            Err(SolveError::InvalidConfig(_))
        ));
        assert!(Layer::from_flags(2, 2, &[1, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn test_neighbor_cache_corners() {
        let nc = NeighborCache::new(5, 5);
        assert_eq!(nc.get((0, 0)).len(), 3);
        assert_eq!(nc.get((0, 2)).len(), 5);
        assert_eq!(nc.get((2, 2)).len(), 8);
        assert!(nc.are_adjacent((0, 0), (1, 1)));
        assert!(!nc.are_adjacent((0, 0), (2, 2)));
    }

    #[test]
    fn test_neighbor_cache_from_fn() {
        // a ring of four cells where only horizontal moves count
        let nc = NeighborCache::from_fn(4, 1, |x, _| vec![((x + 1) % 4, 0), ((x + 3) % 4, 0)]);
        assert_eq!(nc.get((0, 0)), &[(1, 0), (3, 0)]);
        assert_eq!(nc.get((3, 0)), &[(0, 0), (2, 0)]);
    }

    #[test]
    fn test_domain_shrinks_to_singleton() {
        let mut d = Domain::BOTH;
        assert_eq!(d.len(), 2);
        assert_eq!(d.value(), None);
        d.remove(1);
        assert_eq!(d, Domain::SAFE);
        assert_eq!(d.value(), Some(0));
        d.remove(0);
        assert!(d.is_empty());
        assert_eq!(Domain::only(1), Domain::MINE);
    }

    #[test]
    fn test_domain_serializes_as_values() {
        let values: Vec<u8> = Domain::BOTH.into();
        assert_eq!(values, vec![0, 1]);
        assert_eq!(Domain::try_from(vec![1]), Ok(Domain::MINE));
        assert!(Domain::try_from(vec![2]).is_err());
    }
}
