//! Geohash spatial keys.
//!
//! A key is a base-32 string where every symbol adds 5 bits, alternating
//! longitude and latitude bisections (longitude first). Each added symbol
//! subdivides the cell of the shorter key, so every prefix of a key is itself
//! a key at lower precision.
//!
//! Neighbor enumeration works on the integer cell grid: a key of precision `p`
//! addresses one cell of a `2^lat_bits x 2^lon_bits` grid, and adjacent cells
//! are found by stepping the row/column index modulo the grid size. This wraps
//! across the ±180° meridian and across the poles, the same topology as the
//! classic border/neighbor table algorithm.

use std::str::FromStr;

use crate::error::{NearbyError, Result};
use crate::models::Coordinate;

/// Geohash alphabet (no `a`, `i`, `l`, `o`).
pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Longest key the codec produces or accepts.
pub const MAX_PRECISION: usize = 12;

/// Precision used when computing stored keys at ingestion.
pub const DEFAULT_PRECISION: usize = 9;

/// Precision lookups truncate to before expanding the neighborhood.
pub const LOOKUP_PRECISION: usize = 6;

/// A validated geohash key (1..=12 symbols over [`BASE32`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpatialKey(String);

impl SpatialKey {
    /// Parse and validate a key.
    pub fn parse(key: &str) -> Result<Self> {
        if key.is_empty() || key.len() > MAX_PRECISION {
            return Err(NearbyError::InvalidArgument(format!(
                "spatial key {:?} must have 1..={} symbols",
                key, MAX_PRECISION
            )));
        }
        if let Some(bad) = key.bytes().find(|b| symbol_value(*b).is_none()) {
            return Err(NearbyError::InvalidArgument(format!(
                "spatial key {:?} contains invalid symbol {:?}",
                key, bad as char
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of symbols in the key.
    pub fn precision(&self) -> usize {
        self.0.len()
    }

    /// First `precision` symbols of this key.
    pub fn truncate(&self, precision: usize) -> Result<Self> {
        truncate(self, precision)
    }

    /// The eight adjacent keys, see [`neighbors`].
    pub fn neighbors(&self) -> [SpatialKey; 8] {
        neighbors(self)
    }
}

impl std::fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SpatialKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SpatialKey {
    type Err = NearbyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Compass direction of a neighbor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// Canonical neighbor order.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// (row, column) step: rows grow northwards, columns eastwards.
    fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (1, 0),
            Direction::NorthEast => (1, 1),
            Direction::East => (0, 1),
            Direction::SouthEast => (-1, 1),
            Direction::South => (-1, 0),
            Direction::SouthWest => (-1, -1),
            Direction::West => (0, -1),
            Direction::NorthWest => (1, -1),
        }
    }
}

/// Rectangle covered by a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl CellBounds {
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coordinate.latitude())
            && (self.min_lon..=self.max_lon).contains(&coordinate.longitude())
    }
}

/// Row/column address of a cell on the grid of a given precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridCell {
    row: u64,
    col: u64,
    lat_bits: u32,
    lon_bits: u32,
}

impl GridCell {
    fn bits_for(precision: usize) -> (u32, u32) {
        let total = (precision * 5) as u32;
        (total / 2, total.div_ceil(2))
    }

    fn from_key(key: &SpatialKey) -> Self {
        let (lat_bits, lon_bits) = Self::bits_for(key.precision());
        let mut row = 0u64;
        let mut col = 0u64;
        let mut is_lon = true;

        for byte in key.as_str().bytes() {
            // Keys are validated on construction.
            let value = symbol_value(byte).unwrap_or(0);
            for shift in (0..5).rev() {
                let bit = u64::from((value >> shift) & 1);
                if is_lon {
                    col = (col << 1) | bit;
                } else {
                    row = (row << 1) | bit;
                }
                is_lon = !is_lon;
            }
        }

        Self {
            row,
            col,
            lat_bits,
            lon_bits,
        }
    }

    fn to_key(self) -> SpatialKey {
        let total = self.lat_bits + self.lon_bits;
        let mut out = String::with_capacity((total / 5) as usize);
        let mut lat_left = self.lat_bits;
        let mut lon_left = self.lon_bits;
        let mut value = 0u8;

        for i in 0..total {
            let bit = if i % 2 == 0 {
                lon_left -= 1;
                (self.col >> lon_left) & 1
            } else {
                lat_left -= 1;
                (self.row >> lat_left) & 1
            };
            value = (value << 1) | bit as u8;
            if i % 5 == 4 {
                out.push(BASE32[value as usize] as char);
                value = 0;
            }
        }

        SpatialKey(out)
    }

    fn step(self, direction: Direction) -> Self {
        let (d_row, d_col) = direction.offset();
        Self {
            row: wrap(self.row, d_row, self.lat_bits),
            col: wrap(self.col, d_col, self.lon_bits),
            ..self
        }
    }

    fn bounds(&self) -> CellBounds {
        let lat_size = 180.0 / (1u64 << self.lat_bits) as f64;
        let lon_size = 360.0 / (1u64 << self.lon_bits) as f64;
        let min_lat = -90.0 + self.row as f64 * lat_size;
        let min_lon = -180.0 + self.col as f64 * lon_size;
        CellBounds {
            min_lat,
            max_lat: min_lat + lat_size,
            min_lon,
            max_lon: min_lon + lon_size,
        }
    }
}

fn wrap(index: u64, delta: i64, bits: u32) -> u64 {
    let size = 1i64 << bits;
    (index as i64 + delta).rem_euclid(size) as u64
}

fn symbol_value(byte: u8) -> Option<u8> {
    BASE32.iter().position(|b| *b == byte).map(|p| p as u8)
}

/// Bisect `[lo, hi]` `bits` times, returning the index of the half-open
/// interval containing `value` (upper bound inclusive on the last cell).
fn quantize(value: f64, mut lo: f64, mut hi: f64, bits: u32) -> u64 {
    let mut index = 0u64;
    for _ in 0..bits {
        let mid = (lo + hi) / 2.0;
        if value >= mid {
            index = (index << 1) | 1;
            lo = mid;
        } else {
            index <<= 1;
            hi = mid;
        }
    }
    index
}

/// Encode a coordinate at the given precision.
pub fn encode(coordinate: Coordinate, precision: usize) -> Result<SpatialKey> {
    if precision == 0 || precision > MAX_PRECISION {
        return Err(NearbyError::InvalidArgument(format!(
            "precision {} outside 1..={}",
            precision, MAX_PRECISION
        )));
    }
    let (lat_bits, lon_bits) = GridCell::bits_for(precision);
    let cell = GridCell {
        row: quantize(coordinate.latitude(), -90.0, 90.0, lat_bits),
        col: quantize(coordinate.longitude(), -180.0, 180.0, lon_bits),
        lat_bits,
        lon_bits,
    };
    Ok(cell.to_key())
}

/// First `precision` symbols of `key`.
pub fn truncate(key: &SpatialKey, precision: usize) -> Result<SpatialKey> {
    if precision == 0 || precision > key.precision() {
        return Err(NearbyError::InvalidArgument(format!(
            "cannot truncate {:?} (precision {}) to precision {}",
            key.as_str(),
            key.precision(),
            precision
        )));
    }
    Ok(SpatialKey(key.as_str()[..precision].to_string()))
}

/// The key of the adjacent cell in `direction`, at the same precision.
pub fn adjacent(key: &SpatialKey, direction: Direction) -> SpatialKey {
    GridCell::from_key(key).step(direction).to_key()
}

/// The eight cells sharing an edge or corner with `key`, in
/// [`Direction::ALL`] order.
pub fn neighbors(key: &SpatialKey) -> [SpatialKey; 8] {
    let cell = GridCell::from_key(key);
    Direction::ALL.map(|direction| cell.step(direction).to_key())
}

/// Rectangle covered by `key`.
pub fn decode_bbox(key: &SpatialKey) -> CellBounds {
    GridCell::from_key(key).bounds()
}

/// Center of the cell covered by `key`.
pub fn decode(key: &SpatialKey) -> Coordinate {
    let b = decode_bbox(key);
    Coordinate::new((b.min_lat + b.max_lat) / 2.0, (b.min_lon + b.max_lon) / 2.0)
        .unwrap_or_else(|_| unreachable!("cell centers are always in range"))
}
