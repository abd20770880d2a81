//! Axis-aligned bounding box

use serde::{Serialize, Deserialize};

use crate::Vec3;

/// Axis-aligned bounding box stored as upper and lower corners
///
/// A freshly created box is empty: `upper` is at `-f32::MAX` and `lower` at
/// `f32::MAX`, so the first [`put`](Aabb::put) collapses it onto that point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Maximum corner
    pub upper: Vec3,
    /// Minimum corner
    pub lower: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

impl Aabb {
    /// Create an empty box
    pub fn new() -> Self {
        Self {
            upper: Vec3::splat(-f32::MAX),
            lower: Vec3::splat(f32::MAX),
        }
    }

    /// Smallest box containing all `points`
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::new();
        for p in points {
            aabb.put(p);
        }
        aabb
    }

    /// Grow the box to contain `p`
    pub fn put(&mut self, p: Vec3) {
        self.upper = self.upper.max_components(p);
        self.lower = self.lower.min_components(p);
    }

    /// Grow the box to contain `other`
    pub fn merge(&mut self, other: &Aabb) {
        if !other.is_empty() {
            self.put(other.upper);
            self.put(other.lower);
        }
    }

    /// True when no point has been put yet
    pub fn is_empty(&self) -> bool {
        self.lower.x > self.upper.x || self.lower.y > self.upper.y || self.lower.z > self.upper.z
    }

    /// Box centre (origin for an empty box)
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.upper + self.lower) * 0.5
    }

    /// Radius of the sphere around [`center`](Aabb::center) enclosing the box
    pub fn occlusion_radius(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        (self.upper - self.lower).length() * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let aabb = Aabb::new();
        assert!(aabb.is_empty());
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.occlusion_radius(), 0.0);
    }

    #[test]
    fn test_put_single_point() {
        let mut aabb = Aabb::new();
        aabb.put(Vec3::new(1.0, 2.0, 3.0));
        assert!(!aabb.is_empty());
        assert_eq!(aabb.upper, aabb.lower);
        assert_eq!(aabb.occlusion_radius(), 0.0);
    }

    #[test]
    fn test_unit_cube_radius() {
        let aabb = Aabb::from_points([Vec3::splat(-1.0), Vec3::splat(1.0)]);
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert!((aabb.occlusion_radius() - 3.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_merge_ignores_empty() {
        let mut aabb = Aabb::from_points([Vec3::ZERO, Vec3::X]);
        let before = aabb;
        aabb.merge(&Aabb::new());
        assert_eq!(aabb, before);
        aabb.merge(&Aabb::from_points([Vec3::new(0.0, 5.0, 0.0)]));
        assert_eq!(aabb.upper, Vec3::new(1.0, 5.0, 0.0));
    }
}
