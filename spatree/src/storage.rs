use crate::{neighbor::PointRef, tree::partition::Scalar, Error, PointId};
use std::ops::Deref;

/// Handle over a buffer that either owns its elements or aliases elements owned elsewhere.
///
/// An aliased buffer shares the lifetime `'a` of its owner and is never freed through the handle.
#[derive(Clone, Debug)]
pub enum Buffer<'a, T> {
    /// Buffer exclusively owning its elements.
    Owned(Box<[T]>),
    /// Non-owning view of elements owned elsewhere.
    Aliased(&'a [T]),
}

impl<'a, T> Buffer<'a, T> {
    /// Creates a new [`Buffer`] aliasing the given slice.
    #[inline]
    pub const fn alias(slice: &'a [T]) -> Self {
        Self::Aliased(slice)
    }

    /// Returns `true` if the buffer owns its elements.
    #[inline]
    pub const fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Returns a reference to the elements of the buffer.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Owned(owned) => &owned[..],
            Self::Aliased(aliased) => aliased,
        }
    }

    /// Replaces the content of the buffer with `len` exclusively owned default elements.
    #[inline]
    pub fn reset(&mut self, len: usize)
    where
        T: Clone + Default,
    {
        *self = Self::Owned(vec![T::default(); len].into_boxed_slice());
    }

    /// Returns a mutable reference to the elements of the buffer, copying aliased elements into an
    /// owned buffer first.
    #[inline]
    pub fn to_mut(&mut self) -> &mut [T]
    where
        T: Clone,
    {
        if let Self::Aliased(aliased) = *self {
            *self = Self::Owned(aliased.into());
        }

        match self {
            Self::Owned(owned) => &mut owned[..],
            Self::Aliased(_) => &mut [],
        }
    }
}

impl<T> Default for Buffer<'_, T> {
    #[inline]
    fn default() -> Self {
        Self::Owned(Box::default())
    }
}

impl<T> Deref for Buffer<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> From<Vec<T>> for Buffer<'_, T> {
    #[inline]
    fn from(vec: Vec<T>) -> Self {
        Self::Owned(vec.into_boxed_slice())
    }
}

/// Capability providing the buffers of the nodes of a tree.
pub trait Allocator {
    /// Returns a new exclusively owned buffer of `len` default elements.
    fn allocate<'a, T>(&self, len: usize) -> Buffer<'a, T>
    where
        T: Clone + Default;
}

/// [`Allocator`] using the global heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct Heap;

impl Allocator for Heap {
    #[inline]
    fn allocate<'a, T>(&self, len: usize) -> Buffer<'a, T>
    where
        T: Clone + Default,
    {
        Buffer::Owned(vec![T::default(); len].into_boxed_slice())
    }
}

/// Capability of a set of points nodes copy their coordinates from.
///
/// [`at`](Dataset::at) and [`id_of`](Dataset::id_of) may panic for rows or columns outside of
/// [`rows`](Dataset::rows) and [`dimension`](Dataset::dimension). Nodes check these bounds before
/// reading.
pub trait Dataset {
    /// Scalar type of the coordinates.
    type Scalar: Scalar;

    /// Returns the number of rows (points) of the dataset.
    fn rows(&self) -> usize;

    /// Returns the number of columns (coordinates) available in every row.
    fn dimension(&self) -> usize;

    /// Returns the coordinate at the given row and column.
    fn at(&self, row: usize, col: usize) -> Self::Scalar;

    /// Returns the global identifier of the point at the given row.
    fn id_of(&self, row: usize) -> PointId;
}

/// Row-major dataset of points with their global identifiers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Matrix<S> {
    values: Vec<S>,
    ids: Vec<PointId>,
    dimension: usize,
}

impl<S> Matrix<S> {
    /// Creates a new [`Matrix`] from row-major values. The identifier of every point is its row.
    pub fn new(values: Vec<S>, dimension: usize) -> Result<Self, Error> {
        let rows = Self::rows_of(values.len(), dimension)?;
        Ok(Self {
            values,
            ids: (0..rows as PointId).collect(),
            dimension,
        })
    }

    /// Creates a new [`Matrix`] from row-major values and the identifier of every row.
    pub fn with_ids(values: Vec<S>, ids: Vec<PointId>, dimension: usize) -> Result<Self, Error> {
        let rows = Self::rows_of(values.len(), dimension)?;
        if rows != ids.len() {
            return Err(Error::IdCount {
                expected: rows,
                found: ids.len(),
            });
        }

        Ok(Self {
            values,
            ids,
            dimension,
        })
    }

    /// Creates a new [`Matrix`] from rows of coordinates. The identifier of every point is its
    /// row.
    pub fn from_rows<const D: usize>(rows: &[[S; D]]) -> Self
    where
        S: Clone,
    {
        Self {
            values: rows.iter().flatten().cloned().collect(),
            ids: (0..rows.len() as PointId).collect(),
            dimension: D,
        }
    }

    fn rows_of(len: usize, dimension: usize) -> Result<usize, Error> {
        match dimension {
            0 if len == 0 => Ok(0),
            d if d != 0 && len % d == 0 => Ok(len / d),
            _ => Err(Error::Shape { len, dimension }),
        }
    }

    /// Returns the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the matrix holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the row-major coordinates of every point.
    #[inline]
    pub fn values(&self) -> &[S] {
        &self.values
    }

    /// Returns the identifier of every point.
    #[inline]
    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    /// Returns the coordinates of the point at the given row.
    #[inline]
    pub fn row(&self, row: usize) -> Option<&[S]> {
        let start = row.checked_mul(self.dimension)?;
        self.values.get(start..start + self.dimension)
    }

    /// Returns the point at the given row.
    #[inline]
    pub fn point(&self, row: usize) -> Option<PointRef<'_, S>> {
        Some(PointRef::new(*self.ids.get(row)?, self.row(row)?))
    }
}

impl<S: Scalar> Dataset for Matrix<S> {
    type Scalar = S;

    #[inline]
    fn rows(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> S {
        self.values[row * self.dimension + col]
    }

    #[inline]
    fn id_of(&self, row: usize) -> PointId {
        self.ids[row]
    }
}

/// Trait to implement on types representing one point of a dataset.
///
/// A slice of records is a [`Dataset`] whose dimension is the smallest number of coordinates of
/// its records.
pub trait Record {
    /// Scalar type of the coordinates.
    type Scalar: Scalar;

    /// Returns the global identifier of the point.
    fn id(&self) -> PointId;

    /// Returns the coordinates of the point.
    fn coordinates(&self) -> &[Self::Scalar];
}

impl<S: Scalar, const D: usize> Record for (PointId, [S; D]) {
    type Scalar = S;

    #[inline]
    fn id(&self) -> PointId {
        self.0
    }

    #[inline]
    fn coordinates(&self) -> &[S] {
        &self.1
    }
}

#[cfg(feature = "glam")]
macro_rules! impl_glam_records {
    ($($vector: ident => [$scalar: ty; $n: literal]),*) => {$(
        impl Record for (PointId, glam::$vector) {
            type Scalar = $scalar;

            #[inline]
            fn id(&self) -> PointId {
                self.0
            }

            #[inline]
            fn coordinates(&self) -> &[$scalar] {
                AsRef::<[$scalar; $n]>::as_ref(&self.1)
            }
        }
    )*};
}

#[cfg(feature = "glam")]
impl_glam_records!(
    Vec2 => [f32; 2], Vec3 => [f32; 3], Vec4 => [f32; 4],
    DVec2 => [f64; 2], DVec3 => [f64; 3], DVec4 => [f64; 4]
);

impl<P: Record> Dataset for [P] {
    type Scalar = P::Scalar;

    #[inline]
    fn rows(&self) -> usize {
        self.len()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.iter()
            .map(|p| p.coordinates().len())
            .min()
            .unwrap_or_default()
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> P::Scalar {
        self[row].coordinates()[col]
    }

    #[inline]
    fn id_of(&self, row: usize) -> PointId {
        self[row].id()
    }
}
