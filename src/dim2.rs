use glam::DVec2;

/// A 2D [convex hull] representing the smallest convex set containing
/// all input points in a given point set.
///
/// The 3D hull uses it to reduce coplanar input to the points in convex position.
///
/// [convex hull]: https://en.wikipedia.org/wiki/Convex_hull
///
/// # Example
///
/// ```
/// use cheetah_hull::ConvexHull2d;
/// use glam::DVec2;
///
/// let points = vec![
///     DVec2::new(0.0, 0.0),
///     DVec2::new(1.0, 0.0),
///     DVec2::new(0.0, 1.0),
///     DVec2::new(1.0, 1.0),
///     DVec2::new(0.5, 0.5),
/// ];
///
/// // Create the convex hull.
/// let hull = ConvexHull2d::from_points(&points);
///
/// // The interior point is not part of the hull.
/// assert_eq!(hull.points().len(), 4);
///
/// // The indices of the hull points in the input, in counterclockwise order.
/// let indices = ConvexHull2d::indices_from_points(&points);
/// assert!(!indices.contains(&4));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexHull2d {
    points: Vec<DVec2>,
}

impl ConvexHull2d {
    /// Computes a [`ConvexHull2d`] for the given set of 2D points.
    #[inline]
    pub fn from_points(points: &[DVec2]) -> Self {
        Self {
            points: Self::indices_from_points(points)
                .into_iter()
                .map(|i| points[i])
                .collect(),
        }
    }

    /// Computes the indices of the points on the convex hull of the given point set,
    /// in counterclockwise order.
    ///
    /// Points on the boundary that are not corners and duplicate points are left out.
    pub fn indices_from_points(points: &[DVec2]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..points.len()).collect();

        if indices.len() <= 3 {
            return trivial_hull(points, indices);
        }

        let mut hull = Vec::new();
        let mut remaining: &mut [usize] = &mut indices;

        // Find the points with minimum and maximum `x` coordinates.
        let (min, max) = {
            let mut min_position = 0;
            let mut max_position = 0;
            for (k, &i) in remaining.iter().enumerate() {
                if lexicographic_cmp(&points[i], &points[remaining[min_position]]).is_lt() {
                    min_position = k;
                }
                if lexicographic_cmp(&points[i], &points[remaining[max_position]]).is_gt() {
                    max_position = k;
                }
            }

            if points[remaining[min_position]] == points[remaining[max_position]] {
                // Every point is the same point.
                return vec![remaining[min_position]];
            }

            // Move the min point out of `remaining`.
            let min = *swap_with_first_and_remove(&mut remaining, min_position);

            // If the max point was at position 0, it was just swapped to `min_position`.
            if max_position == 0 {
                max_position = min_position;
            }
            let max = *swap_with_first_and_remove(&mut remaining, max_position - 1);

            (min, max)
        };

        // Recursively find hull points on either side of the line segment `min, max`.
        {
            let (left, _) = partition_slice(remaining, |&i| {
                is_ccw(points[max], points[min], points[i])
            });
            hull_set(points, max, min, left, &mut hull);
        }
        hull.push(max);
        let (right, _) = partition_slice(remaining, |&i| {
            is_ccw(points[min], points[max], points[i])
        });
        hull_set(points, min, max, right, &mut hull);
        hull.push(min);

        hull
    }

    /// Returns the points of the convex hull in counterclockwise order.
    #[inline]
    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    /// Returns the points of the convex hull in counterclockwise order, consuming the hull.
    #[inline]
    pub fn into_points(self) -> Vec<DVec2> {
        self.points
    }
}

/// Constructs the convex hull for a point set of size 3 or less.
///
/// The points are sorted lexicographically, deduplicated and oriented counterclockwise.
/// If three points are collinear, the middle point is removed.
fn trivial_hull(points: &[DVec2], mut indices: Vec<usize>) -> Vec<usize> {
    debug_assert!(indices.len() <= 3);

    indices.sort_unstable_by(|&a, &b| lexicographic_cmp(&points[a], &points[b]));
    indices.dedup_by(|a, b| points[*a] == points[*b]);

    if indices.len() == 3 {
        let orientation = orient2d(points[indices[0]], points[indices[1]], points[indices[2]]);
        if orientation == 0.0 {
            indices.remove(1);
        } else if orientation < 0.0 {
            indices.swap(1, 2);
        }
    }

    indices
}

// Recursively computes the hull points to the left of the directed segment `a -> b`.
fn hull_set(
    points: &[DVec2],
    a: usize,
    b: usize,
    mut indices: &mut [usize],
    hull: &mut Vec<usize>,
) {
    if indices.is_empty() {
        return;
    }

    if indices.len() == 1 {
        hull.push(indices[0]);
        return;
    }

    let origin = points[a];
    let orthogonal = (points[b] - origin).perp();

    // Find the point furthest from the line segment `ab`.
    let Some(furthest_position) = indices
        .iter()
        .map(|&i| orthogonal.dot(points[i] - origin))
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(k, _)| k)
    else {
        return;
    };

    let furthest = *swap_with_first_and_remove(&mut indices, furthest_position);

    // Recursively find hull points on either side of the triangle `a, b, furthest`.
    {
        let (outside, _) = partition_slice(indices, |&i| {
            is_ccw(points[furthest], points[b], points[i])
        });
        hull_set(points, furthest, b, outside, hull);
    }
    hull.push(furthest);
    let (outside, _) = partition_slice(indices, |&i| {
        is_ccw(points[a], points[furthest], points[i])
    });
    hull_set(points, a, furthest, outside, hull);
}

/// Gives the orientation of the triangle formed by `a`, `b`, `c`.
///
/// - `orientation > 0`: counterclockwise
/// - `orientation < 0`: clockwise
/// - `orientation == 0`: collinear
#[inline]
fn orient2d(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    use robust::Coord;
    robust::orient2d(
        Coord { x: a.x, y: a.y },
        Coord { x: b.x, y: b.y },
        Coord { x: c.x, y: c.y },
    )
}

/// Returns `true` if the points `a`, `b`, `c` are oriented counterclockwise.
#[inline]
fn is_ccw(a: DVec2, b: DVec2, c: DVec2) -> bool {
    orient2d(a, b, c) > 0.0
}

/// Compares two 2D points first by `x`, then by `y`.
#[inline]
fn lexicographic_cmp(a: &DVec2, b: &DVec2) -> std::cmp::Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

/// Partitions a mutable slice in-place so that it contains all elements for
/// which `predicate(e)` is `true`, followed by all elements for which
/// `predicate(e)` is `false`. Returns sub-slices to all predicated and
/// non-predicated elements, respectively.
fn partition_slice<T, P>(data: &mut [T], predicate: P) -> (&mut [T], &mut [T])
where
    P: Fn(&T) -> bool,
{
    let len = data.len();

    if len == 0 {
        return (&mut [], &mut []);
    }

    let (mut left, mut right) = (0, len - 1);

    loop {
        while left < len && predicate(&data[left]) {
            left += 1;
        }

        while right > 0 && !predicate(&data[right]) {
            right -= 1;
        }

        if left >= right {
            return data.split_at_mut(left);
        }

        data.swap(left, right);
    }
}

/// Swaps the element at `index` with the first element of `slice`, removes it from the slice,
/// and returns a mutable reference to it.
///
/// # Panics
///
/// Panics if `slice` is empty.
#[inline]
fn swap_with_first_and_remove<'a, T>(slice: &mut &'a mut [T], index: usize) -> &'a mut T {
    let tmp = std::mem::take(slice);
    tmp.swap(0, index);
    let (head, tail) = tmp
        .split_first_mut()
        .expect("cannot remove an element from an empty slice");
    *slice = tail;
    head
}
