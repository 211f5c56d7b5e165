//! Shared primitive types used across the whole data model.

use std::borrow::Borrow;
use std::fmt;

/// Short stable string identifier, the universal key across the data model.
///
/// Every cross-entity reference (unit → class, item → prefab, tile →
/// terrain, ...) is by `Nid`. Comparison and ordering are plain string
/// semantics so `BTreeMap<Nid, _>` iteration is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Nid(String);

impl Nid {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Nid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Nid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for Nid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Nid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Nid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Discrete grid position expressed in tile coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two tiles.
    pub fn distance(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Cardinal neighbors in fixed reading order (up, left, right, down).
    ///
    /// The order is part of the pathfinding tie-break contract and must
    /// not change.
    pub fn neighbors(self) -> [Coord; 4] {
        [
            Coord::new(self.x, self.y - 1),
            Coord::new(self.x - 1, self.y),
            Coord::new(self.x + 1, self.y),
            Coord::new(self.x, self.y + 1),
        ]
    }

    pub fn is_adjacent(self, other: Coord) -> bool {
        self.distance(other) == 1
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Sub-tile position used by the roam sub-mode.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoamPos {
    pub x: f32,
    pub y: f32,
}

impl RoamPos {
    pub fn from_tile(tile: Coord) -> Self {
        Self {
            x: tile.x as f32,
            y: tile.y as f32,
        }
    }

    /// Nearest whole tile, the grid-return step of the roam sub-mode.
    pub fn to_tile(self) -> Coord {
        Coord::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// Dynamically-typed value stored in the variable stores and script args.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// Parses a script token: integer first, then boolean, else a string.
    pub fn parse(token: &str) -> Self {
        if let Ok(n) = token.parse::<i64>() {
            return Value::Int(n);
        }
        match token {
            "true" | "True" => Value::Bool(true),
            "false" | "False" => Value::Bool(false),
            _ => Value::Str(token.to_owned()),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            Value::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_parse_prefers_numbers() {
        assert_eq!(Value::parse("3"), Value::Int(3));
        assert_eq!(Value::parse("-12"), Value::Int(-12));
        assert_eq!(Value::parse("true"), Value::Bool(true));
        assert_eq!(Value::parse("ch2"), Value::Str("ch2".into()));
    }

    #[test]
    fn coord_distance_is_manhattan() {
        assert_eq!(Coord::new(0, 0).distance(Coord::new(3, 4)), 7);
        assert!(Coord::new(2, 2).is_adjacent(Coord::new(2, 3)));
        assert!(!Coord::new(2, 2).is_adjacent(Coord::new(3, 3)));
    }

    #[test]
    fn roam_grid_return_rounds_to_nearest_tile() {
        let pos = RoamPos { x: 2.6, y: 1.2 };
        assert_eq!(pos.to_tile(), Coord::new(3, 1));
    }
}
