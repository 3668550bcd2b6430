//! Fundamental geometric types for frame modelling.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::errors::FrameError;

/// Number of degrees of freedom carried by every node.
pub const DOFS_PER_NODE: usize = 6;

/// Position in three dimensional space measured in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (other.to_vector() - self.to_vector()).norm()
    }
}

impl From<Vector3<f64>> for Point {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Vector3<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use collapsex::point;
///
/// let apex = point(2.5, 2.5, 4.0);
/// assert_eq!(apex.z, 4.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// One of the six nodal degrees of freedom.
///
/// The discriminant is the offset of the freedom inside a node's block of the
/// global system: three translations followed by three rotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Dof {
    /// Translation along global X.
    Ux = 0,
    /// Translation along global Y.
    Uy = 1,
    /// Translation along global Z.
    Uz = 2,
    /// Rotation about global X.
    Rx = 3,
    /// Rotation about global Y.
    Ry = 4,
    /// Rotation about global Z.
    Rz = 5,
}

impl Dof {
    /// All degrees of freedom in global ordering.
    pub const ALL: [Dof; DOFS_PER_NODE] = [Dof::Ux, Dof::Uy, Dof::Uz, Dof::Rx, Dof::Ry, Dof::Rz];

    /// The three translational freedoms.
    pub const TRANSLATIONS: [Dof; 3] = [Dof::Ux, Dof::Uy, Dof::Uz];

    /// Offset of this freedom inside a node's block.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for Dof {
    type Error = FrameError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Dof::ALL
            .get(value)
            .copied()
            .ok_or(FrameError::InvalidDof(value))
    }
}

impl From<Dof> for usize {
    fn from(value: Dof) -> Self {
        value.index()
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dof::Ux => "ux",
            Dof::Uy => "uy",
            Dof::Uz => "uz",
            Dof::Rx => "rx",
            Dof::Ry => "ry",
            Dof::Rz => "rz",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0, 3.0);
        let vector: Vector3<f64> = origin.into();
        assert_eq!(vector, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = point(0.0, 0.0, 0.0);
        let b = point(3.0, 4.0, 0.0);
        assert!((a.distance_to(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dof_indices_follow_global_ordering() {
        for (expected, dof) in Dof::ALL.iter().enumerate() {
            assert_eq!(dof.index(), expected);
            assert_eq!(Dof::try_from(expected), Ok(*dof));
        }
    }

    #[test]
    fn out_of_range_dof_is_rejected() {
        assert_eq!(Dof::try_from(6), Err(FrameError::InvalidDof(6)));
    }
}
