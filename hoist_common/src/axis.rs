//! Axis identifiers and the fixed two-slot per-axis map.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use thiserror::Error;

/// One of the two linear degrees of freedom of the hoist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal travel of the hoist body.
    X,
    /// Vertical travel of the hook.
    Z,
}

impl Axis {
    /// Both axes, X first.
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Z];

    /// Lowercase name used in channel names and CLI arguments.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown axis name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown axis '{0}' (expected 'x' or 'z')")]
pub struct AxisParseError(pub String);

impl FromStr for Axis {
    type Err = AxisParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "z" => Ok(Axis::Z),
            other => Err(AxisParseError(other.to_string())),
        }
    }
}

/// One value per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisMap<T> {
    /// Value for [`Axis::X`].
    pub x: T,
    /// Value for [`Axis::Z`].
    pub z: T,
}

impl<T> AxisMap<T> {
    /// Build a map by evaluating `f` for X, then Z.
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        let x = f(Axis::X);
        let z = f(Axis::Z);
        Self { x, z }
    }

    /// Fallible variant of [`AxisMap::from_fn`]; stops at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(Axis) -> Result<T, E>) -> Result<Self, E> {
        let x = f(Axis::X)?;
        let z = f(Axis::Z)?;
        Ok(Self { x, z })
    }

    /// Iterate `(axis, &value)` pairs, X first.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        [(Axis::X, &self.x), (Axis::Z, &self.z)].into_iter()
    }

    /// Iterate `(axis, &mut value)` pairs, X first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Axis, &mut T)> {
        [(Axis::X, &mut self.x), (Axis::Z, &mut self.z)].into_iter()
    }
}

impl<T> Index<Axis> for AxisMap<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        match axis {
            Axis::X => &self.x,
            Axis::Z => &self.z,
        }
    }
}

impl<T> IndexMut<Axis> for AxisMap<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::X => &mut self.x,
            Axis::Z => &mut self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_either_case() {
        assert_eq!("x".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("Z".parse::<Axis>().unwrap(), Axis::Z);
        assert!("y".parse::<Axis>().is_err());
    }

    #[test]
    fn axis_map_indexing_matches_fields() {
        let mut map = AxisMap::from_fn(|axis| axis.name().to_string());
        assert_eq!(map[Axis::X], "x");
        assert_eq!(map[Axis::Z], "z");

        map[Axis::Z].push('!');
        assert_eq!(map.z, "z!");

        let order: Vec<Axis> = map.iter().map(|(axis, _)| axis).collect();
        assert_eq!(order, Axis::ALL);
    }

    #[test]
    fn try_from_fn_stops_at_first_error() {
        let mut calls = 0;
        let result: Result<AxisMap<u8>, &str> = AxisMap::try_from_fn(|axis| {
            calls += 1;
            match axis {
                Axis::X => Err("boom"),
                Axis::Z => Ok(1),
            }
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(calls, 1);
    }
}
