use crate::{tree::partition::Scalar, PointId};
use std::{
    io::{self, Read, Write},
    marker::PhantomData,
};

/// A point of a dataset, aliasing its coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointRef<'a, S> {
    /// Global identifier of the point.
    pub id: PointId,
    /// Coordinates of the point.
    pub coordinates: &'a [S],
}

impl<'a, S> PointRef<'a, S> {
    /// Creates a new [`PointRef`] with the given identifier and coordinates.
    #[inline]
    pub const fn new(id: PointId, coordinates: &'a [S]) -> Self {
        Self { id, coordinates }
    }
}

/// Entry of the working list of a nearest neighbor search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate<'t, S> {
    /// Distance between the query point and the candidate.
    pub distance: S,
    /// The candidate point, `None` for padding entries.
    pub point: Option<PointRef<'t, S>>,
}

impl<'t, S: Scalar> Candidate<'t, S> {
    /// Creates a new [`Candidate`] for the given point.
    #[inline]
    pub const fn new(distance: S, point: PointRef<'t, S>) -> Self {
        Self {
            distance,
            point: Some(point),
        }
    }

    /// Padding entry signaling that no candidate was found yet.
    #[inline]
    pub const fn padding() -> Self {
        Self {
            distance: S::MAX,
            point: None,
        }
    }
}

/// Neighbor found for a point: one k-nearest neighbor slot or one fixed-radius match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor<'t, S> {
    /// Global identifier of the point this neighbor was found for.
    pub point_id: PointId,
    /// The neighbor, `None` if none was found yet.
    pub nearest: Option<PointRef<'t, S>>,
    /// Distance between the point and its neighbor.
    pub distance: S,
}

impl<'t, S: Scalar> Neighbor<'t, S> {
    /// Creates a new [`Neighbor`] slot of the given point with no neighbor found yet.
    #[inline]
    pub const fn new(point_id: PointId) -> Self {
        Self {
            point_id,
            nearest: None,
            distance: S::MAX,
        }
    }

    /// Returns the identifier of the neighbor, if any.
    #[inline]
    pub fn nearest_id(&self) -> Option<PointId> {
        self.nearest.map(|p| p.id)
    }

    /// Writes this neighbor as a fixed-size little-endian record of
    /// [`record_size::<S>(dimension)`](record_size) bytes.
    ///
    /// The layout is: `point_id: u64`, `nearest id: u64`, `dimension` nearest coordinates and
    /// `distance`. A missing neighbor is written with the identifier [`PointId::MAX`] and zero
    /// coordinates.
    pub fn write_record<W>(&self, writer: &mut W, dimension: usize) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        let mut record = Vec::with_capacity(record_size::<S>(dimension));
        record.extend_from_slice(&self.point_id.to_le_bytes());

        match self.nearest {
            Some(nearest) => {
                record.extend_from_slice(&nearest.id.to_le_bytes());
                for i in 0..dimension {
                    nearest
                        .coordinates
                        .get(i)
                        .copied()
                        .unwrap_or(S::ZERO)
                        .write_le(&mut record)?;
                }
            }
            None => {
                record.extend_from_slice(&PointId::MAX.to_le_bytes());
                for _ in 0..dimension {
                    S::ZERO.write_le(&mut record)?;
                }
            }
        }

        self.distance.write_le(&mut record)?;
        writer.write_all(&record)
    }
}

/// Returns the size in bytes of a record written by [`Neighbor::write_record`].
#[inline]
pub const fn record_size<S: Scalar>(dimension: usize) -> usize {
    2 * std::mem::size_of::<PointId>() + (dimension + 1) * S::BYTES
}

/// Owned fixed-radius match decoded from a record stream.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeRecord<S> {
    /// Global identifier of the query point.
    pub point_id: PointId,
    /// Global identifier of the matched point.
    pub nearest_id: PointId,
    /// Coordinates of the matched point.
    pub coordinates: Vec<S>,
    /// Distance between the query point and the matched point.
    pub distance: S,
}

/// Iterator decoding the records written by [`Neighbor::write_record`] from a reader.
#[derive(Debug)]
pub struct RecordReader<R, S> {
    reader: R,
    dimension: usize,
    buffer: Vec<u8>,
    _scalar: PhantomData<S>,
}

impl<R: Read, S: Scalar> RecordReader<R, S> {
    /// Creates a new [`RecordReader`] of records of points with the given dimension.
    #[inline]
    pub fn new(reader: R, dimension: usize) -> Self {
        Self {
            reader,
            dimension,
            buffer: vec![0; record_size::<S>(dimension)],
            _scalar: PhantomData,
        }
    }

    /// Returns the underlying reader.
    #[inline]
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn decode(&self) -> io::Result<RangeRecord<S>> {
        let invalid = || io::Error::new(io::ErrorKind::InvalidData, "malformed range record");
        let id_size = std::mem::size_of::<PointId>();

        let (ids, scalars) = self.buffer.split_at(2 * id_size);
        let mut scalars = scalars
            .chunks_exact(S::BYTES)
            .map(|bytes| S::from_le_slice(bytes).ok_or_else(invalid));

        let coordinates = scalars
            .by_ref()
            .take(self.dimension)
            .collect::<io::Result<Vec<_>>>()?;
        let distance = scalars.next().ok_or_else(invalid)??;

        Ok(RangeRecord {
            point_id: PointId::from_le_bytes(ids[..id_size].try_into().map_err(|_| invalid())?),
            nearest_id: PointId::from_le_bytes(ids[id_size..].try_into().map_err(|_| invalid())?),
            coordinates,
            distance,
        })
    }
}

impl<R: Read, S: Scalar> Iterator for RecordReader<R, S> {
    type Item = io::Result<RangeRecord<S>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut filled = 0;
        while filled < self.buffer.len() {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) if filled == 0 => return None,
                Ok(0) => {
                    return Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "truncated range record",
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Some(Err(e)),
            }
        }

        Some(self.decode())
    }
}

/// Search performed by [`Node::find_nearest`](crate::tree::Node::find_nearest).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SearchMode<S> {
    /// Keep the `k` closest points.
    KNearest(usize),
    /// Keep every point within the given distance.
    Radius(S),
}

/// Search performed by [`Node::find_all_nearest`](crate::tree::Node::find_all_nearest) and where
/// its results are written.
pub enum Batch<'b, 't, S> {
    /// Refines the `k` nearest neighbors of every query point, stored in `neighbors` at
    /// `i * k..(i + 1) * k` for the `i`-th point of the query node.
    KNearest {
        /// Number of neighbors per point.
        k: usize,
        /// Neighbor slots of the query node.
        neighbors: &'b mut [Neighbor<'t, S>],
    },
    /// Appends a record for every point within `range` of a query point to `sink`.
    Radius {
        /// Search radius.
        range: S,
        /// Output stream of the records.
        sink: &'b mut dyn Write,
    },
}

impl<S: Copy> Batch<'_, '_, S> {
    /// Returns the [`SearchMode`] of this batch.
    #[inline]
    pub fn mode(&self) -> SearchMode<S> {
        match self {
            Self::KNearest { k, .. } => SearchMode::KNearest(*k),
            Self::Radius { range, .. } => SearchMode::Radius(*range),
        }
    }
}

/// Policy deciding if two point identifiers designate the same point.
///
/// It is used to exclude a query point from its own results.
pub trait Discriminator {
    /// Returns `true` if `lhs` and `rhs` designate the same point.
    fn are_the_same(&self, lhs: PointId, rhs: PointId) -> bool;
}

/// [`Discriminator`] considering points with equal identifiers to be the same.
#[derive(Clone, Copy, Debug, Default)]
pub struct SameId;

impl Discriminator for SameId {
    #[inline]
    fn are_the_same(&self, lhs: PointId, rhs: PointId) -> bool {
        lhs == rhs
    }
}

impl<F> Discriminator for F
where
    F: Fn(PointId, PointId) -> bool,
{
    #[inline]
    fn are_the_same(&self, lhs: PointId, rhs: PointId) -> bool {
        self(lhs, rhs)
    }
}
