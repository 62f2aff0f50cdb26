use glam::DVec3;

/// An axis-aligned bounding box, together with the input points that attain its extremes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3d {
    /// The minimum corner of the AABB.
    pub min: DVec3,
    /// The maximum corner of the AABB.
    pub max: DVec3,
    /// For each axis, the index of the first point with the minimum coordinate.
    pub min_indices: [usize; 3],
    /// For each axis, the index of the first point with the maximum coordinate.
    pub max_indices: [usize; 3],
}

impl Aabb3d {
    /// Creates an AABB with both corners at the given point.
    #[inline]
    pub fn from_point(index: usize, point: DVec3) -> Self {
        Self {
            min: point,
            max: point,
            min_indices: [index; 3],
            max_indices: [index; 3],
        }
    }

    /// Creates an AABB that bounds the given set of points, or `None` if the set is empty.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::from_point(0, *first);
        for (i, point) in rest.iter().enumerate() {
            aabb.extend(i + 1, *point);
        }
        Some(aabb)
    }

    /// Extends the AABB to include the point with the given index.
    #[inline]
    pub fn extend(&mut self, index: usize, point: DVec3) -> &mut Self {
        for axis in 0..3 {
            if point[axis] < self.min[axis] {
                self.min[axis] = point[axis];
                self.min_indices[axis] = index;
            }
            if point[axis] > self.max[axis] {
                self.max[axis] = point[axis];
                self.max_indices[axis] = index;
            }
        }
        self
    }

    /// Returns the diagonal vector of the AABB.
    #[inline]
    pub fn diagonal(&self) -> DVec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_indices() {
        let points = [
            DVec3::new(0.0, 5.0, 0.0),
            DVec3::new(-2.0, 1.0, 3.0),
            DVec3::new(4.0, 1.0, -1.0),
            DVec3::new(4.0, -6.0, 0.0),
        ];
        let aabb = Aabb3d::from_points(&points).unwrap();

        assert_eq!(aabb.min, DVec3::new(-2.0, -6.0, -1.0));
        assert_eq!(aabb.max, DVec3::new(4.0, 5.0, 3.0));
        assert_eq!(aabb.min_indices, [1, 3, 2]);
        // Ties keep the first point reaching the extreme.
        assert_eq!(aabb.max_indices, [2, 0, 1]);
        assert_eq!(aabb.diagonal().max_element(), 11.0);
    }

    #[test]
    fn empty_point_set() {
        assert!(Aabb3d::from_points(&[]).is_none());
    }
}
