use crate::{
    diagnostics::ComputationsCounter,
    neighbor::{Batch, Candidate, Discriminator, Neighbor, PointRef, SearchMode},
    storage::{Allocator, Buffer, Dataset},
    tree::{
        partition::{Region, Scalar},
        NodeID, Tree,
    },
    Error, PointId,
};
use std::fmt::{self, Write as _};

#[derive(Debug)]
enum Layout<'g, S> {
    Unset,
    Internal {
        left: NodeID,
        right: NodeID,
    },
    Leaf {
        points: Buffer<'g, S>,
        index: Buffer<'g, PointId>,
        dimension: usize,
    },
}

/// Vertex of a binary space-partitioning tree, either internal with two children or a leaf
/// storing points.
///
/// The region and statistics of a node are aliased from a [`Geometry`](super::Geometry) arena
/// that outlives it. A leaf stores a copy (or an alias) of the coordinates and global
/// identifiers of its points. Neighbor buffers are never stored in the node: they are passed to
/// every operation that needs them.
#[derive(Debug)]
pub struct Node<'g, R: Region, St> {
    bbox: Option<&'g R>,
    statistics: Option<&'g St>,
    id: Option<NodeID>,
    len: usize,
    layout: Layout<'g, R::Scalar>,
    min_dist_so_far: Option<R::Scalar>,
}

impl<R: Region, St> Default for Node<'_, R, St> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<'g, R: Region, St> Node<'g, R, St> {
    /// Creates a new uninitialized [`Node`] with no region, storage or children.
    #[inline]
    pub const fn new() -> Self {
        Self {
            bbox: None,
            statistics: None,
            id: None,
            len: 0,
            layout: Layout::Unset,
            min_dist_so_far: None,
        }
    }

    /// Initializes an internal node with the given children, `len` being the number of points
    /// stored in its descendants.
    pub fn init_internal(
        &mut self,
        bbox: &'g R,
        statistics: &'g St,
        id: NodeID,
        len: usize,
        (left, right): (NodeID, NodeID),
    ) {
        self.bbox = Some(bbox);
        self.statistics = Some(statistics);
        self.id = Some(id);
        self.len = len;
        self.layout = Layout::Internal { left, right };
        self.min_dist_so_far = None;
    }

    /// Initializes a leaf storing a copy of the `len` rows of `dataset` starting at `start`.
    ///
    /// Returns an error if the rows are out of the bounds of the dataset or if the dataset has
    /// less than `dimension` coordinates per row.
    #[allow(clippy::too_many_arguments)]
    pub fn init_leaf<D, A>(
        &mut self,
        bbox: &'g R,
        statistics: &'g St,
        id: NodeID,
        start: usize,
        len: usize,
        dimension: usize,
        dataset: &D,
        allocator: &A,
    ) -> Result<(), Error>
    where
        D: Dataset<Scalar = R::Scalar> + ?Sized,
        A: Allocator,
    {
        let rows = dataset.rows();
        let end = start
            .checked_add(len)
            .filter(|&end| end <= rows)
            .ok_or(Error::OutOfBounds { start, len, rows })?;

        if dimension == 0 {
            return Err(Error::Shape { len, dimension });
        }
        if dimension > dataset.dimension() {
            return Err(Error::Dimension {
                expected: dimension,
                found: dataset.dimension(),
            });
        }

        let mut points = allocator.allocate::<R::Scalar>(len * dimension);
        let mut index = allocator.allocate::<PointId>(len);

        let rows = (start..end)
            .zip(points.to_mut().chunks_exact_mut(dimension))
            .zip(index.to_mut());
        for ((row, coordinates), id) in rows {
            for (j, c) in coordinates.iter_mut().enumerate() {
                *c = dataset.at(row, j);
            }
            *id = dataset.id_of(row);
        }

        self.init_leaf_with(bbox, statistics, id, points, index, dimension);
        Ok(())
    }

    /// Initializes a leaf aliasing row-major `points` and their global identifiers `index`, both
    /// owned by the caller.
    ///
    /// Returns an error if `points` does not hold exactly `dimension` coordinates per identifier.
    pub fn init_leaf_aliased(
        &mut self,
        bbox: &'g R,
        statistics: &'g St,
        id: NodeID,
        points: &'g [R::Scalar],
        index: &'g [PointId],
        dimension: usize,
    ) -> Result<(), Error> {
        if dimension == 0 {
            return Err(Error::Shape {
                len: points.len(),
                dimension,
            });
        }
        if points.len() != index.len() * dimension {
            return Err(Error::Dimension {
                expected: index.len() * dimension,
                found: points.len(),
            });
        }

        let (points, index) = (Buffer::alias(points), Buffer::alias(index));
        self.init_leaf_with(bbox, statistics, id, points, index, dimension);
        Ok(())
    }

    fn init_leaf_with(
        &mut self,
        bbox: &'g R,
        statistics: &'g St,
        id: NodeID,
        points: Buffer<'g, R::Scalar>,
        index: Buffer<'g, PointId>,
        dimension: usize,
    ) {
        self.bbox = Some(bbox);
        self.statistics = Some(statistics);
        self.id = Some(id);
        self.len = index.len();
        self.layout = Layout::Leaf {
            points,
            index,
            dimension,
        };
        self.min_dist_so_far = None;
    }

    /// Seeds the `k` neighbor slots of every point of this leaf with a placeholder referring to
    /// the point itself, to be overwritten by the searches.
    ///
    /// `neighbors` must hold exactly `k` slots per point.
    pub fn init_k_neighbors(
        &self,
        k: usize,
        neighbors: &mut [Neighbor<'_, R::Scalar>],
    ) -> Result<(), Error> {
        let (_, index, _) = self.leaf()?;
        check_neighbor_buffer(index.len(), k, neighbors.len())?;

        for (i, &id) in index.iter().enumerate() {
            for slot in &mut neighbors[i * k..(i + 1) * k] {
                *slot = Neighbor::new(id);
            }
        }
        Ok(())
    }

    /// Returns the identifier of the node, `None` if it is not initialized.
    #[inline]
    pub const fn id(&self) -> Option<NodeID> {
        self.id
    }

    /// Returns the number of points stored in the leaf or in the descendants of the node.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the node holds no points.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the node is a leaf.
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.layout, Layout::Leaf { .. })
    }

    /// Returns `true` if the node is an internal node.
    #[inline]
    pub const fn is_internal(&self) -> bool {
        matches!(self.layout, Layout::Internal { .. })
    }

    /// Returns the region of the node.
    #[inline]
    pub const fn bbox(&self) -> Option<&'g R> {
        self.bbox
    }

    /// Returns the statistics of the node.
    #[inline]
    pub const fn statistics(&self) -> Option<&'g St> {
        self.statistics
    }

    /// Returns the left and right children of an internal node.
    #[inline]
    pub const fn children(&self) -> Option<(NodeID, NodeID)> {
        match self.layout {
            Layout::Internal { left, right } => Some((left, right)),
            _ => None,
        }
    }

    /// Returns the row-major coordinates of the points of a leaf.
    #[inline]
    pub fn points(&self) -> Option<&[R::Scalar]> {
        self.leaf().ok().map(|(points, _, _)| points)
    }

    /// Returns the global identifiers of the points of a leaf.
    #[inline]
    pub fn index(&self) -> Option<&[PointId]> {
        self.leaf().ok().map(|(_, index, _)| index)
    }

    /// Returns the `i`-th point of a leaf.
    #[inline]
    pub fn point(&self, i: usize) -> Option<PointRef<'_, R::Scalar>> {
        let (points, index, dimension) = self.leaf().ok()?;
        let coordinates = points.get(i * dimension..(i + 1) * dimension)?;
        Some(PointRef::new(*index.get(i)?, coordinates))
    }

    /// Returns the pruning distance stored in the node, `None` if it is not set.
    #[inline]
    pub const fn min_dist_so_far(&self) -> Option<R::Scalar> {
        self.min_dist_so_far
    }

    /// Sets the pruning distance stored in the node.
    #[inline]
    pub fn set_min_dist_so_far(&mut self, distance: Option<R::Scalar>) {
        self.min_dist_so_far = distance;
    }

    #[inline]
    fn leaf(&self) -> Result<(&[R::Scalar], &[PointId], usize), Error> {
        match &self.layout {
            Layout::Leaf {
                points,
                index,
                dimension,
            } => Ok((points.as_slice(), index.as_slice(), *dimension)),
            _ => Err(Error::NotALeaf(self.id)),
        }
    }

    /// Returns the children of this internal node, the one closest to `point` first.
    ///
    /// The decision is delegated to [`Region::closest_child`].
    pub fn closest_child<C>(
        &self,
        tree: &Tree<'_, R, St>,
        point: &[R::Scalar],
        dimension: usize,
        counter: &mut C,
    ) -> Result<(NodeID, NodeID), Error>
    where
        C: ComputationsCounter,
    {
        let (left, right) = self.children().ok_or(Error::NotInternal(self.id))?;
        let bbox = self.bbox.ok_or(Error::Uninitialized)?;
        let child_bbox = |id| tree.get(id).and_then(Node::bbox).ok_or(Error::UnknownNode(id));

        Ok(bbox.closest_child(
            (left, child_bbox(left)?),
            (right, child_bbox(right)?),
            point,
            dimension,
            counter,
        ))
    }

    /// Returns `a` and `b` with the distance between their region and the region of this node,
    /// the closest first.
    ///
    /// If both distances are equal, `b` comes first.
    #[allow(clippy::type_complexity)]
    pub fn closest_node<'n, C>(
        &self,
        a: &'n Self,
        b: &'n Self,
        dimension: usize,
        counter: &mut C,
    ) -> Result<((&'n Self, R::Scalar), (&'n Self, R::Scalar)), Error>
    where
        C: ComputationsCounter,
    {
        let bbox = self.bbox.ok_or(Error::Uninitialized)?;
        let distance_a = bbox.distance(a.bbox.ok_or(Error::Uninitialized)?, dimension, counter);
        let distance_b = bbox.distance(b.bbox.ok_or(Error::Uninitialized)?, dimension, counter);

        if distance_a < distance_b {
            Ok(((a, distance_a), (b, distance_b)))
        } else {
            Ok(((b, distance_b), (a, distance_a)))
        }
    }

    /// Scans the points of this leaf against `query` and adds the matches to `nearest`.
    ///
    /// `nearest` is not cleared, so candidates found in other leaves are merged with the points
    /// of this one. Points the discriminator considers to be the query point are skipped.
    ///
    /// - [`SearchMode::KNearest`]: every point is added, then `nearest` is sorted by ascending
    ///   distance and truncated to `k` entries, or padded with [`Candidate::padding`] entries if
    ///   it holds less.
    /// - [`SearchMode::Radius`]: only the points within the radius are added. `nearest` is neither
    ///   sorted, truncated nor padded.
    pub fn find_nearest<'t, D, C>(
        &'t self,
        query: PointRef<'_, R::Scalar>,
        nearest: &mut Vec<Candidate<'t, R::Scalar>>,
        mode: SearchMode<R::Scalar>,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<(), Error>
    where
        D: Discriminator + ?Sized,
        C: ComputationsCounter,
    {
        let (points, index, stride) = self.leaf()?;
        if dimension != stride {
            return Err(Error::Dimension {
                expected: stride,
                found: dimension,
            });
        }
        if query.coordinates.len() < dimension {
            return Err(Error::Dimension {
                expected: dimension,
                found: query.coordinates.len(),
            });
        }

        for (coordinates, &id) in points.chunks_exact(stride).zip(index) {
            counter.record_distance_computation();
            if discriminator.are_the_same(id, query.id) {
                continue;
            }

            let distance = R::point_distance(query.coordinates, coordinates, dimension);
            match mode {
                SearchMode::Radius(range) if distance > range => {}
                _ => nearest.push(Candidate::new(distance, PointRef::new(id, coordinates))),
            }
        }

        if let SearchMode::KNearest(k) = mode {
            nearest.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            nearest.resize(k, Candidate::padding());
        }

        Ok(())
    }

    /// Updates the neighbors of every point of `query` with the points of this leaf.
    ///
    /// - [`Batch::KNearest`]: the `k` slots of every query point are merged with the points of
    ///   this leaf with [`find_nearest`](Self::find_nearest). Returns the smallest of
    ///   `max_neighbor_distance` and the largest `k`-th neighbor distance of the query points,
    ///   which can be used to prune nodes that cannot improve any of them.
    /// - [`Batch::Radius`]: a record is written to the sink for every pair of query point and
    ///   point of this leaf within the radius. Returns the radius. Writing stops at the first
    ///   error, which is returned as [`Error::Sink`] without retrying. Callers that must not go on
    ///   after a failed write should abort on [`Error::Sink`].
    #[allow(clippy::too_many_arguments)]
    pub fn find_all_nearest<'t, D, C>(
        &'t self,
        query: &Self,
        batch: Batch<'_, 't, R::Scalar>,
        max_neighbor_distance: R::Scalar,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<R::Scalar, Error>
    where
        D: Discriminator + ?Sized,
        C: ComputationsCounter,
    {
        self.leaf()?;
        let (_, query_index, _) = query.leaf()?;
        let query_points = (0..query_index.len()).filter_map(|i| query.point(i));

        match batch {
            Batch::KNearest { k, neighbors } => {
                check_neighbor_buffer(query_index.len(), k, neighbors.len())?;
                if k == 0 {
                    return Ok(max_neighbor_distance.min(R::Scalar::ZERO));
                }

                let mut max_local_distance = R::Scalar::ZERO;
                let mut nearest = Vec::with_capacity(2 * k);
                for (point, slots) in query_points.zip(neighbors.chunks_exact_mut(k)) {
                    nearest.clear();
                    nearest.extend(slots.iter().map(|slot| Candidate {
                        distance: slot.distance,
                        point: slot.nearest,
                    }));

                    let mode = SearchMode::KNearest(k);
                    self.find_nearest(point, &mut nearest, mode, dimension, discriminator, counter)?;
                    if nearest.len() != k {
                        return Err(Error::Cardinality {
                            expected: k,
                            found: nearest.len(),
                        });
                    }

                    for (slot, candidate) in slots.iter_mut().zip(&nearest) {
                        slot.distance = candidate.distance;
                        slot.nearest = candidate.point;
                    }

                    counter.record_comparison();
                    if let Some(last) = nearest.last() {
                        if max_local_distance < last.distance {
                            max_local_distance = last.distance;
                        }
                    }
                }

                if max_neighbor_distance > max_local_distance {
                    Ok(max_local_distance)
                } else {
                    Ok(max_neighbor_distance)
                }
            }
            Batch::Radius { range, sink } => {
                let mut nearest = Vec::new();
                for point in query_points {
                    nearest.clear();

                    let mode = SearchMode::Radius(range);
                    self.find_nearest(point, &mut nearest, mode, dimension, discriminator, counter)?;

                    for candidate in &nearest {
                        let neighbor = Neighbor {
                            point_id: point.id,
                            nearest: candidate.point,
                            distance: candidate.distance,
                        };
                        neighbor.write_record(&mut *sink, dimension)?;
                    }
                }

                Ok(range)
            }
        }
    }

    /// Returns a human-readable description of the node: its kind and identifier, its region,
    /// its number of points and, for leaves, the coordinates and identifier of every point.
    pub fn print(&self, dimension: usize) -> String {
        let mut description = String::new();

        let kind = if self.is_leaf() { "Leaf" } else { "Node" };
        let _ = match self.id {
            Some(id) => writeln!(description, "{kind}: {id}"),
            None => writeln!(description, "{kind}: -"),
        };

        if let Some(bbox) = self.bbox {
            description.push_str(&bbox.describe(dimension));
        }
        let _ = writeln!(description, "num_of_points: {}", self.len);

        if let Ok((points, index, stride)) = self.leaf() {
            for (coordinates, id) in points.chunks_exact(stride).zip(index) {
                for c in coordinates.iter().take(dimension) {
                    let _ = write!(description, "{c} ");
                }
                let _ = writeln!(description, "-{id} ");
            }
        }

        description
    }
}

impl<R: Region, St> fmt::Display for Node<'_, R, St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dimension = match self.layout {
            Layout::Leaf { dimension, .. } => dimension,
            _ => usize::MAX,
        };
        f.write_str(&self.print(dimension))
    }
}

#[inline]
fn check_neighbor_buffer(len: usize, k: usize, found: usize) -> Result<(), Error> {
    let expected = len * k;
    if found != expected {
        return Err(Error::NeighborBuffer { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::{Counter, NoCounter},
        neighbor::SameId,
        storage::{Heap, Matrix},
        tree::{partition::BoundingBox, Geometry},
    };

    type Leaf<'g> = Node<'g, BoundingBox<f64>, ()>;

    fn line() -> Matrix<f64> {
        Matrix::from_rows(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]])
    }

    fn leaf<'g>(bbox: &'g BoundingBox<f64>, dataset: &Matrix<f64>) -> Leaf<'g> {
        let mut node = Node::new();
        node.init_leaf(bbox, &(), 0, 0, dataset.len(), 2, dataset, &Heap)
            .unwrap();
        node
    }

    fn ids(candidates: &[Candidate<'_, f64>]) -> Vec<Option<PointId>> {
        candidates.iter().map(|c| c.point.map(|p| p.id)).collect()
    }

    #[test]
    fn new_node_is_unset() {
        let node = Leaf::new();

        assert_eq!(node.id(), None);
        assert!(node.is_empty());
        assert!(!node.is_leaf() && !node.is_internal());
        assert_eq!(node.bbox(), None);
        assert_eq!(node.children(), None);
        assert_eq!(node.min_dist_so_far(), None);
    }

    #[test]
    fn init_leaf_copies_rows() {
        let dataset = Matrix::with_ids(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], vec![7, 8, 9], 2)
            .unwrap();
        let bbox = BoundingBox::with(2, [[2.0, 3.0].as_slice(), &[4.0, 5.0]]);

        let mut node = Leaf::new();
        node.init_leaf(&bbox, &(), 4, 1, 2, 2, &dataset, &Heap)
            .unwrap();

        assert!(node.is_leaf());
        assert_eq!(node.id(), Some(4));
        assert_eq!(node.len(), 2);
        assert_eq!(node.points(), Some([2.0, 3.0, 4.0, 5.0].as_slice()));
        assert_eq!(node.index(), Some([8, 9].as_slice()));
        assert_eq!(node.point(1), Some(PointRef::new(9, &[4.0, 5.0])));
        assert_eq!(node.point(2), None);
    }

    #[test]
    fn init_leaf_checks_bounds() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let mut node = Leaf::new();

        let error = node.init_leaf(&bbox, &(), 0, 2, 2, 2, &dataset, &Heap);
        assert!(matches!(
            error,
            Err(Error::OutOfBounds {
                start: 2,
                len: 2,
                rows: 3
            })
        ));

        let error = node.init_leaf(&bbox, &(), 0, usize::MAX, 2, 2, &dataset, &Heap);
        assert!(matches!(error, Err(Error::OutOfBounds { .. })));

        let error = node.init_leaf(&bbox, &(), 0, 0, 3, 3, &dataset, &Heap);
        assert!(matches!(
            error,
            Err(Error::Dimension {
                expected: 3,
                found: 2
            })
        ));

        let error = node.init_leaf(&bbox, &(), 0, 0, 3, 0, &dataset, &Heap);
        assert!(matches!(error, Err(Error::Shape { dimension: 0, .. })));
        assert_eq!(node.id(), None);
    }

    #[test]
    fn init_leaf_aliased_shares_memory() {
        let points = [0.0, 0.0, 1.0, 1.0];
        let index = [3, 5];
        let bbox = BoundingBox::with(2, points.chunks(2));

        let mut node = Leaf::new();
        node.init_leaf_aliased(&bbox, &(), 1, &points, &index, 2)
            .unwrap();
        assert_eq!(node.points().map(<[f64]>::as_ptr), Some(points.as_ptr()));
        assert_eq!(node.len(), 2);

        let error = node.init_leaf_aliased(&bbox, &(), 1, &points, &index, 3);
        assert!(matches!(
            error,
            Err(Error::Dimension {
                expected: 6,
                found: 4
            })
        ));
    }

    #[test]
    fn init_internal_sets_children() {
        let bbox = BoundingBox::empty(2);
        let mut node = Leaf::new();
        node.init_internal(&bbox, &(), 2, 10, (0, 1));

        assert!(node.is_internal());
        assert_eq!(node.id(), Some(2));
        assert_eq!(node.len(), 10);
        assert_eq!(node.children(), Some((0, 1)));
        assert_eq!(node.points(), None);
        assert!(matches!(
            node.init_k_neighbors(1, &mut []),
            Err(Error::NotALeaf(Some(2)))
        ));
    }

    #[test]
    fn init_k_neighbors_seeds_self_references() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);

        let mut neighbors = vec![Neighbor::new(99); 6];
        neighbors[3].distance = 1.0;
        node.init_k_neighbors(2, &mut neighbors).unwrap();

        let owners = neighbors.iter().map(|n| n.point_id).collect::<Vec<_>>();
        assert_eq!(owners, vec![0, 0, 1, 1, 2, 2]);
        assert!(neighbors
            .iter()
            .all(|n| n.nearest.is_none() && n.distance == f64::MAX));

        assert!(matches!(
            node.init_k_neighbors(3, &mut neighbors),
            Err(Error::NeighborBuffer {
                expected: 9,
                found: 6
            })
        ));
    }

    #[test]
    fn find_nearest_k_excludes_self_and_sorts() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);
        let query = dataset.point(0).unwrap();

        let mut nearest = Vec::new();
        let mut counter = Counter::new();
        node.find_nearest(
            query,
            &mut nearest,
            SearchMode::KNearest(2),
            2,
            &SameId,
            &mut counter,
        )
        .unwrap();

        assert_eq!(ids(&nearest), vec![Some(1), Some(2)]);
        assert_eq!(nearest[0].distance, 1.0);
        assert_eq!(nearest[1].distance, 2.0);
        assert_eq!(counter.distance_computations, 3);
    }

    #[test]
    fn find_nearest_k_sorts_nan_distances() {
        let dataset = Matrix::from_rows(&[[0.0, 0.0], [f64::NAN, 0.0], [1.0, 0.0]]);
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);
        let query = dataset.point(0).unwrap();

        let mut nearest = Vec::new();
        node.find_nearest(
            query,
            &mut nearest,
            SearchMode::KNearest(3),
            2,
            &SameId,
            &mut NoCounter,
        )
        .unwrap();

        let found = ids(&nearest);
        assert!(found[..2].contains(&Some(1)) && found[..2].contains(&Some(2)));
        assert_eq!(found[2], None);
        assert_eq!(nearest[2].distance, f64::MAX);
    }

    #[test]
    fn find_nearest_k_pads_missing_neighbors() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);

        let mut nearest = Vec::new();
        let query = dataset.point(2).unwrap();
        let mode = SearchMode::KNearest(4);
        node.find_nearest(query, &mut nearest, mode, 2, &SameId, &mut NoCounter)
            .unwrap();

        assert_eq!(ids(&nearest), vec![Some(1), Some(0), None, None]);
        assert_eq!(nearest[2], Candidate::padding());
        assert_eq!(nearest[3].distance, f64::MAX);
    }

    #[test]
    fn find_nearest_k_merges_previous_candidates() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);

        let far = [0.5, 0.0];
        let mut nearest = vec![
            Candidate::new(0.5, PointRef::new(42, &far)),
            Candidate::padding(),
        ];
        let query = dataset.point(0).unwrap();
        let mode = SearchMode::KNearest(2);
        node.find_nearest(query, &mut nearest, mode, 2, &SameId, &mut NoCounter)
            .unwrap();

        assert_eq!(ids(&nearest), vec![Some(42), Some(1)]);
    }

    #[test]
    fn find_nearest_radius_keeps_points_in_range() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);
        let query = dataset.point(0).unwrap();

        let mut nearest = Vec::new();
        let mode = SearchMode::Radius(1.5);
        node.find_nearest(query, &mut nearest, mode, 2, &SameId, &mut NoCounter)
            .unwrap();
        assert_eq!(ids(&nearest), vec![Some(1)]);
        assert_eq!(nearest[0].distance, 1.0);

        // Boundary points are included and nothing is padded or truncated.
        nearest.clear();
        let mode = SearchMode::Radius(2.0);
        node.find_nearest(query, &mut nearest, mode, 2, &SameId, &mut NoCounter)
            .unwrap();
        assert_eq!(nearest.len(), 2);
    }

    #[test]
    fn find_nearest_checks_its_inputs() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);
        let mode = SearchMode::KNearest(1);

        let short = PointRef::new(5, &[0.0][..]);
        let error = node.find_nearest(short, &mut Vec::new(), mode, 2, &SameId, &mut NoCounter);
        assert!(matches!(error, Err(Error::Dimension { .. })));

        let query = dataset.point(0).unwrap();
        let error = node.find_nearest(query, &mut Vec::new(), mode, 3, &SameId, &mut NoCounter);
        assert!(matches!(error, Err(Error::Dimension { .. })));

        let unset = Leaf::new();
        let error = unset.find_nearest(query, &mut Vec::new(), mode, 2, &SameId, &mut NoCounter);
        assert!(matches!(error, Err(Error::NotALeaf(None))));
    }

    #[test]
    fn find_all_nearest_refines_neighbors_and_tightens_bound() {
        let near = Matrix::from_rows(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        let far = Matrix::with_ids(vec![0.0, 0.5, 10.0, 10.0], vec![3, 4], 2).unwrap();
        let bbox = BoundingBox::empty(2);
        let query = leaf(&bbox, &near);
        let other = leaf(&bbox, &far);

        let mut neighbors = vec![Neighbor::new(0); 6];
        query.init_k_neighbors(2, &mut neighbors).unwrap();

        let mut counter = Counter::new();
        let batch = Batch::KNearest {
            k: 2,
            neighbors: &mut neighbors,
        };
        let bound = query
            .find_all_nearest(&query, batch, f64::MAX, 2, &SameId, &mut counter)
            .unwrap();
        assert_eq!(bound, 2.0);
        assert_eq!(counter.comparisons, 3);

        let batch = Batch::KNearest {
            k: 2,
            neighbors: &mut neighbors,
        };
        let tighter = other
            .find_all_nearest(&query, batch, bound, 2, &SameId, &mut counter)
            .unwrap();
        assert!(tighter <= bound);

        let found = neighbors
            .iter()
            .map(|n| (n.point_id, n.nearest_id()))
            .collect::<Vec<_>>();
        assert_eq!(
            found,
            vec![
                (0, Some(3)),
                (0, Some(1)),
                (1, Some(0)),
                (1, Some(2)),
                (2, Some(1)),
                (2, Some(0)),
            ]
        );
        assert_eq!(neighbors[0].distance, 0.5);
        assert!(neighbors
            .chunks(2)
            .all(|slots| slots[0].distance <= slots[1].distance));
        assert_eq!(tighter, 2.0);
    }

    #[test]
    fn find_all_nearest_bound_never_increases() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);

        let mut neighbors = vec![Neighbor::new(0); 3];
        node.init_k_neighbors(1, &mut neighbors).unwrap();

        let batch = Batch::KNearest {
            k: 1,
            neighbors: &mut neighbors,
        };
        let bound = node
            .find_all_nearest(&node, batch, 0.25, 2, &SameId, &mut NoCounter)
            .unwrap();
        assert_eq!(bound, 0.25);
    }

    #[test]
    fn find_all_nearest_checks_buffer() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);

        let mut neighbors = vec![Neighbor::new(0); 5];
        let batch = Batch::KNearest {
            k: 2,
            neighbors: &mut neighbors,
        };
        let error = node.find_all_nearest(&node, batch, f64::MAX, 2, &SameId, &mut NoCounter);
        assert!(matches!(
            error,
            Err(Error::NeighborBuffer {
                expected: 6,
                found: 5
            })
        ));
    }

    #[test]
    fn find_all_nearest_radius_streams_records() {
        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);

        let mut sink = Vec::<u8>::new();
        let batch = Batch::Radius {
            range: 1.5,
            sink: &mut sink,
        };
        let bound = node
            .find_all_nearest(&node, batch, f64::MAX, 2, &SameId, &mut NoCounter)
            .unwrap();
        assert_eq!(bound, 1.5);

        let records = crate::neighbor::RecordReader::<_, f64>::new(sink.as_slice(), 2)
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap();
        let pairs = records
            .iter()
            .map(|r| (r.point_id, r.nearest_id, r.distance))
            .collect::<Vec<_>>();
        assert_eq!(pairs, vec![(0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0), (2, 1, 1.0)]);
        assert_eq!(records[0].coordinates, vec![1.0, 0.0]);
    }

    #[test]
    fn find_all_nearest_radius_reports_sink_failures() {
        struct Full;

        impl std::io::Write for Full {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let dataset = line();
        let bbox = BoundingBox::empty(2);
        let node = leaf(&bbox, &dataset);

        let batch = Batch::Radius {
            range: 1.5,
            sink: &mut Full,
        };
        let error = node.find_all_nearest(&node, batch, f64::MAX, 2, &SameId, &mut NoCounter);
        assert!(matches!(error, Err(Error::Sink(_))));
    }

    #[test]
    fn closest_node_ties_favor_second_argument() {
        let mut geometry = Geometry::new();
        geometry.push(BoundingBox::new(vec![0.0, 0.0], vec![1.0, 1.0]), ());
        geometry.push(BoundingBox::new(vec![3.0, 0.0], vec![4.0, 1.0]), ());
        geometry.push(BoundingBox::new(vec![-3.0, 0.0], vec![-2.0, 1.0]), ());
        geometry.push(BoundingBox::new(vec![0.0, 5.0], vec![1.0, 6.0]), ());

        let nodes = (0..4)
            .map(|i| {
                let (bbox, statistics) = geometry.get(i).unwrap();
                let mut node = Leaf::new();
                node.init_internal(bbox, statistics, i as NodeID, 0, (0, 0));
                node
            })
            .collect::<Vec<_>>();
        let (this, a, b, c) = (&nodes[0], &nodes[1], &nodes[2], &nodes[3]);

        for _ in 0..3 {
            let ((first, d1), (second, d2)) = this.closest_node(a, b, 2, &mut NoCounter).unwrap();
            assert_eq!((first.id(), second.id()), (Some(2), Some(1)));
            assert_eq!((d1, d2), (2.0, 2.0));
        }

        let ((first, d1), (second, d2)) = this.closest_node(a, c, 2, &mut NoCounter).unwrap();
        assert_eq!((first.id(), second.id()), (Some(1), Some(3)));
        assert_eq!((d1, d2), (2.0, 4.0));

        let ((first, _), _) = this.closest_node(c, a, 2, &mut NoCounter).unwrap();
        assert_eq!(first.id(), Some(1));

        assert!(matches!(
            this.closest_node(a, &Leaf::new(), 2, &mut NoCounter),
            Err(Error::Uninitialized)
        ));
    }

    #[test]
    fn closest_child_orders_children() {
        let dataset = line();
        let mut geometry = Geometry::new();
        geometry.push(BoundingBox::with(2, dataset.row(0)), ());
        geometry.push(BoundingBox::with(2, [dataset.row(1), dataset.row(2)].into_iter().flatten()), ());
        geometry.push(BoundingBox::with(2, dataset.values().chunks(2)), ());

        let mut tree = Tree::new();
        let (bbox, statistics) = geometry.get(0).unwrap();
        let mut left = Node::new();
        left.init_leaf(bbox, statistics, 0, 0, 1, 2, &dataset, &Heap)
            .unwrap();
        tree.push(left).unwrap();

        let (bbox, statistics) = geometry.get(1).unwrap();
        let mut right = Node::new();
        right
            .init_leaf(bbox, statistics, 1, 1, 2, 2, &dataset, &Heap)
            .unwrap();
        tree.push(right).unwrap();

        let (bbox, statistics) = geometry.get(2).unwrap();
        let mut root = Node::new();
        root.init_internal(bbox, statistics, 2, 3, (0, 1));

        let mut counter = Counter::new();
        let order = root.closest_child(&tree, &[1.8, 0.0], 2, &mut counter);
        assert_eq!(order.unwrap(), (1, 0));
        let order = root.closest_child(&tree, &[-1.0, 0.0], 2, &mut counter);
        assert_eq!(order.unwrap(), (0, 1));
        assert_eq!(counter.comparisons, 2);

        assert!(matches!(
            tree.get(0).unwrap().closest_child(&tree, &[0.0, 0.0], 2, &mut counter),
            Err(Error::NotInternal(Some(0)))
        ));
    }

    #[test]
    fn print_describes_leaves() {
        let dataset = line();
        let bbox = BoundingBox::with(2, dataset.values().chunks(2));
        let node = leaf(&bbox, &dataset);

        assert_eq!(
            node.print(2),
            "Leaf: 0\nmin: 0 0\nmax: 2 0\nnum_of_points: 3\n0 0 -0 \n1 0 -1 \n2 0 -2 \n"
        );
        assert_eq!(node.to_string(), node.print(2));
        assert_eq!(Leaf::new().print(2), "Node: -\nnum_of_points: 0\n");
    }

    #[test]
    fn display_describes_internal_nodes_in_full() {
        let bbox = BoundingBox::new(vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]);
        let mut node = Leaf::new();
        node.init_internal(&bbox, &(), 4, 7, (2, 3));

        assert_eq!(
            node.to_string(),
            "Node: 4\nmin: 0 1 2\nmax: 3 4 5\nnum_of_points: 7\n"
        );
    }

    #[test]
    fn min_dist_so_far_is_reset_on_init() {
        let bbox = BoundingBox::empty(2);
        let mut node = Leaf::new();
        assert_eq!(node.min_dist_so_far(), None);

        node.set_min_dist_so_far(Some(1.5));
        assert_eq!(node.min_dist_so_far(), Some(1.5));

        node.init_internal(&bbox, &(), 0, 0, (0, 0));
        assert_eq!(node.min_dist_so_far(), None);
    }
}
