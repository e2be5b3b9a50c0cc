use crate::diagnostics::ComputationsCounter;
use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Write as _},
    io,
    ops::{Add, Mul, Sub},
};

/// Trait for the floating point types coordinates and distances are expressed in.
pub trait Scalar:
    Copy
    + PartialOrd
    + Default
    + Debug
    + Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    /// `0` value of the type.
    const ZERO: Self;
    /// Largest finite value of the type, used for distances that are not known yet.
    const MAX: Self;
    /// `infinity` (∞) value of the type.
    const INFINITY: Self;
    /// `-infinity` (-∞) value of the type.
    const NEG_INFINITY: Self;
    /// Size in bytes of the little-endian encoding of the type.
    const BYTES: usize;

    /// Returns the square root of a number.
    fn sqrt(self) -> Self;

    /// Returns the minimum between two numbers.
    fn min(self, rhs: Self) -> Self;

    /// Returns the maximum between two numbers.
    fn max(self, rhs: Self) -> Self;

    /// Returns the middle point of `self` and `rhs`.
    fn midpoint(self, rhs: Self) -> Self;

    /// Returns the ordering between `self` and `rhs`, NaN values included.
    fn total_cmp(&self, rhs: &Self) -> Ordering;

    /// Writes the little-endian encoding of the number.
    fn write_le<W: io::Write + ?Sized>(self, writer: &mut W) -> io::Result<()>;

    /// Reads a number from its little-endian encoding. Returns `None` if `bytes` is not exactly
    /// [`BYTES`](Scalar::BYTES) long.
    fn from_le_slice(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_floats {
    ($s: ty) => {
        impl Scalar for $s {
            const ZERO: Self = 0.0;
            const MAX: Self = <$s>::MAX;
            const INFINITY: Self = <$s>::INFINITY;
            const NEG_INFINITY: Self = <$s>::NEG_INFINITY;
            const BYTES: usize = std::mem::size_of::<$s>();

            #[inline]
            fn sqrt(self) -> Self {
                self.sqrt()
            }

            #[inline]
            fn min(self, rhs: Self) -> Self {
                self.min(rhs)
            }

            #[inline]
            fn max(self, rhs: Self) -> Self {
                self.max(rhs)
            }

            #[inline]
            fn midpoint(self, rhs: Self) -> Self {
                (self + rhs) / 2.0
            }

            #[inline]
            fn total_cmp(&self, rhs: &Self) -> Ordering {
                <$s>::total_cmp(self, rhs)
            }

            #[inline]
            fn write_le<W: io::Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
                writer.write_all(&self.to_le_bytes())
            }

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Option<Self> {
                bytes.try_into().ok().map(<$s>::from_le_bytes)
            }
        }
    };
}

impl_floats!(f32);
impl_floats!(f64);

/// Capability of the geometric region attached to every node of a tree.
///
/// The region decides which metric is used: distances between points, between a point and a
/// region and between two regions must all be expressed with the same metric for pruning to be
/// exact.
pub trait Region {
    /// Scalar type of the coordinates and distances.
    type Scalar: Scalar;

    /// Returns the distance between two points, considering their first `dimension` coordinates.
    fn point_distance(lhs: &[Self::Scalar], rhs: &[Self::Scalar], dimension: usize)
        -> Self::Scalar;

    /// Returns the smallest distance between the region and a point.
    fn distance_to_point<C>(
        &self,
        point: &[Self::Scalar],
        dimension: usize,
        counter: &mut C,
    ) -> Self::Scalar
    where
        C: ComputationsCounter;

    /// Returns the smallest distance between two regions.
    fn distance<C>(&self, other: &Self, dimension: usize, counter: &mut C) -> Self::Scalar
    where
        C: ComputationsCounter;

    /// Orders two children `left` and `right` of this region so that the one closest to `point`
    /// comes first.
    ///
    /// The default implementation compares the distances from the point to both child regions and
    /// favors `left` when they are equal.
    #[inline]
    fn closest_child<N, C>(
        &self,
        left: (N, &Self),
        right: (N, &Self),
        point: &[Self::Scalar],
        dimension: usize,
        counter: &mut C,
    ) -> (N, N)
    where
        C: ComputationsCounter,
    {
        let left_distance = left.1.distance_to_point(point, dimension, counter);
        let right_distance = right.1.distance_to_point(point, dimension, counter);

        counter.record_comparison();
        if left_distance <= right_distance {
            (left.0, right.0)
        } else {
            (right.0, left.0)
        }
    }

    /// Returns a human-readable description of the region.
    fn describe(&self, dimension: usize) -> String;
}

/// An axis-aligned bounding box with a Euclidean metric.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox<S> {
    /// Minimum corner of the box.
    pub min: Vec<S>,
    /// Maximum corner of the box.
    pub max: Vec<S>,
}

impl<S> BoundingBox<S> {
    /// Creates a new [`BoundingBox`] with the given min and max values.
    #[inline]
    pub const fn new(min: Vec<S>, max: Vec<S>) -> Self {
        Self { min, max }
    }

    /// Returns the number of dimensions of the [`BoundingBox`].
    #[inline]
    pub fn dimension(&self) -> usize {
        self.min.len().min(self.max.len())
    }
}

#[allow(clippy::needless_range_loop)]
impl<S: Scalar> BoundingBox<S> {
    /// Creates a new [`BoundingBox`] containing nothing, which becomes the box of the first
    /// position it is extended with.
    #[inline]
    pub fn empty(dimension: usize) -> Self {
        Self::new(
            vec![S::INFINITY; dimension],
            vec![S::NEG_INFINITY; dimension],
        )
    }

    /// Extends the [`BoundingBox`] so that it contains the given position.
    #[inline]
    pub fn extend(&mut self, position: &[S]) {
        for i in 0..self.dimension().min(position.len()) {
            self.min[i] = self.min[i].min(position[i]);
            self.max[i] = self.max[i].max(position[i]);
        }
    }

    /// Creates a new [`BoundingBox`] that contains the given positions.
    #[inline]
    pub fn with<'a, I>(dimension: usize, positions: I) -> Self
    where
        I: IntoIterator<Item = &'a [S]>,
    {
        let mut result = Self::empty(dimension);
        for position in positions {
            result.extend(position);
        }
        result
    }

    /// Returns the center of the [`BoundingBox`].
    #[inline]
    pub fn center(&self) -> Vec<S> {
        let mut r = vec![S::ZERO; self.dimension()];
        for i in 0..r.len() {
            r[i] = self.min[i].midpoint(self.max[i]);
        }
        r
    }

    /// Returns the size of the [`BoundingBox`].
    #[inline]
    pub fn size(&self) -> Vec<S> {
        let mut r = vec![S::ZERO; self.dimension()];
        for i in 0..r.len() {
            r[i] = self.max[i] - self.min[i];
        }
        r
    }

    /// Returns the width of the [`BoundingBox`] (x element of the size).
    #[inline]
    pub fn width(&self) -> S {
        self.size().first().copied().unwrap_or(S::ZERO)
    }

    /// Returns `true` if the position is inside the [`BoundingBox`] or on its boundary.
    #[inline]
    pub fn contains(&self, position: &[S]) -> bool {
        (0..self.dimension().min(position.len()))
            .all(|i| self.min[i] <= position[i] && position[i] <= self.max[i])
    }
}

#[inline]
fn gap<S: Scalar>(lower: S, upper: S) -> S {
    if lower > upper {
        lower - upper
    } else {
        S::ZERO
    }
}

impl<S: Scalar> Region for BoundingBox<S> {
    type Scalar = S;

    #[inline]
    fn point_distance(lhs: &[S], rhs: &[S], dimension: usize) -> S {
        lhs.iter()
            .zip(rhs)
            .take(dimension)
            .fold(S::ZERO, |sum, (&a, &b)| {
                let diff = a - b;
                sum + diff * diff
            })
            .sqrt()
    }

    #[inline]
    fn distance_to_point<C>(&self, point: &[S], dimension: usize, counter: &mut C) -> S
    where
        C: ComputationsCounter,
    {
        counter.record_distance_computation();

        let mut sum = S::ZERO;
        for ((&min, &max), &v) in self.min.iter().zip(&self.max).zip(point).take(dimension) {
            let d = gap(min, v).max(gap(v, max));
            sum = sum + d * d;
        }
        sum.sqrt()
    }

    #[inline]
    fn distance<C>(&self, other: &Self, dimension: usize, counter: &mut C) -> S
    where
        C: ComputationsCounter,
    {
        counter.record_distance_computation();

        let mut sum = S::ZERO;
        for i in 0..dimension.min(self.dimension()).min(other.dimension()) {
            let d = gap(other.min[i], self.max[i]).max(gap(self.min[i], other.max[i]));
            sum = sum + d * d;
        }
        sum.sqrt()
    }

    fn describe(&self, dimension: usize) -> String {
        let mut description = String::new();
        for (name, corner) in [("min", &self.min), ("max", &self.max)] {
            description.push_str(name);
            description.push(':');
            for c in corner.iter().take(dimension) {
                // Writing into a `String` cannot fail.
                let _ = write!(description, " {c}");
            }
            description.push('\n');
        }
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Counter, NoCounter};

    fn unit_box(offset: f64) -> BoundingBox<f64> {
        BoundingBox::new(vec![offset, offset], vec![offset + 1.0, offset + 1.0])
    }

    #[test]
    fn with_contains_every_position() {
        let positions = [[0.0, 3.0], [-2.0, 1.0], [4.0, -1.0]];
        let bbox = BoundingBox::with(2, positions.iter().map(|p| p.as_slice()));

        assert_eq!(bbox.min, vec![-2.0, -1.0]);
        assert_eq!(bbox.max, vec![4.0, 3.0]);
        assert_eq!(bbox.center(), vec![1.0, 1.0]);
        assert_eq!(bbox.width(), 6.0);
        assert!(positions.iter().all(|p| bbox.contains(p)));
    }

    #[test]
    fn point_distance_is_euclidean() {
        let d = BoundingBox::<f64>::point_distance(&[0.0, 0.0], &[3.0, 4.0], 2);
        assert_eq!(d, 5.0);

        // Only the first `dimension` coordinates are considered.
        let d = BoundingBox::<f64>::point_distance(&[0.0, 0.0, 10.0], &[3.0, 4.0, 0.0], 2);
        assert_eq!(d, 5.0);
    }

    #[test]
    fn distance_to_point_is_zero_inside() {
        let bbox = unit_box(0.0);
        let mut counter = Counter::new();

        assert_eq!(bbox.distance_to_point(&[0.5, 0.5], 2, &mut counter), 0.0);
        assert_eq!(bbox.distance_to_point(&[4.0, 5.0], 2, &mut counter), 5.0);
        assert_eq!(bbox.distance_to_point(&[-3.0, 0.5], 2, &mut counter), 3.0);
        assert_eq!(counter.distance_computations, 3);
    }

    #[test]
    fn distance_between_boxes() {
        let a = unit_box(0.0);
        let b = BoundingBox::new(vec![4.0, 5.0], vec![6.0, 6.0]);

        assert_eq!(a.distance(&b, 2, &mut NoCounter), 5.0);
        assert_eq!(b.distance(&a, 2, &mut NoCounter), 5.0);
        assert_eq!(a.distance(&unit_box(0.5), 2, &mut NoCounter), 0.0);
    }

    #[test]
    fn closest_child_favors_left_on_ties() {
        let parent = BoundingBox::new(vec![-1.0, 0.0], vec![2.0, 1.0]);
        let left = BoundingBox::new(vec![-1.0, 0.0], vec![0.0, 1.0]);
        let right = BoundingBox::new(vec![1.0, 0.0], vec![2.0, 1.0]);
        let mut counter = Counter::new();

        let order = parent.closest_child(("l", &left), ("r", &right), &[1.5, 0.5], 2, &mut counter);
        assert_eq!(order, ("r", "l"));

        let order = parent.closest_child(("l", &left), ("r", &right), &[0.5, 0.5], 2, &mut counter);
        assert_eq!(order, ("l", "r"));
        assert_eq!(counter.comparisons, 2);
    }

    #[test]
    fn scalar_le_encoding() {
        let mut bytes = Vec::new();
        1.5f32.write_le(&mut bytes).unwrap();
        (-2.25f64).write_le(&mut bytes).unwrap();

        assert_eq!(bytes.len(), f32::BYTES + f64::BYTES);
        assert_eq!(f32::from_le_slice(&bytes[..4]), Some(1.5));
        assert_eq!(f64::from_le_slice(&bytes[4..]), Some(-2.25));
        assert_eq!(f64::from_le_slice(&bytes[..4]), None);
    }

    #[test]
    fn scalar_order_is_total() {
        let mut values = [f64::NAN, 2.0, f64::MAX, -1.0];
        values.sort_by(<f64 as Scalar>::total_cmp);

        assert_eq!(values[..3], [-1.0, 2.0, f64::MAX]);
        assert!(values[3].is_nan());
        assert_eq!(<f32 as Scalar>::total_cmp(&0.5, &0.5), Ordering::Equal);
    }

    #[test]
    fn describe_lists_both_corners() {
        assert_eq!(unit_box(0.0).describe(2), "min: 0 0\nmax: 1 1\n");
    }
}
