use crate::{
    diagnostics::ComputationsCounter,
    neighbor::{Batch, Candidate, Discriminator, Neighbor, PointRef, SearchMode},
    tree::{Node, Region, Scalar, Tree},
    Error,
};
use std::io::Write;

/// Trait to search the neighbors of points stored in a [`Tree`] sequentially.
///
/// The searches descend from the root of the tree, visiting the closest child first and skipping
/// every node whose region is farther than the current search bound, so their results are exact.
pub trait SequentialSearch<S> {
    /// Returns the candidates found in the tree for `query` with the given [`SearchMode`].
    ///
    /// In [`SearchMode::KNearest`] mode, the result holds exactly `k` candidates sorted by
    /// ascending distance, padded with [`Candidate::padding`] entries if the tree holds less than
    /// `k` other points. In [`SearchMode::Radius`] mode, the result holds every point within the
    /// radius, unordered.
    fn nearest<D, C>(
        &self,
        query: PointRef<'_, S>,
        mode: SearchMode<S>,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<Vec<Candidate<'_, S>>, Error>
    where
        D: Discriminator + ?Sized,
        C: ComputationsCounter;

    /// Returns the `k` nearest neighbors of every point stored in the tree.
    ///
    /// The slots are grouped by leaf, in the order of the leaves in the tree, then by point in
    /// the order of the leaf. The `k` slots of a point are sorted by ascending distance.
    fn all_k_nearest<D, C>(
        &self,
        k: usize,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<Vec<Neighbor<'_, S>>, Error>
    where
        D: Discriminator + ?Sized,
        C: ComputationsCounter;

    /// Writes a record to `sink` for every pair of points of the tree within `range` of each
    /// other.
    ///
    /// Records are written leaf by leaf, in the order of the leaves in the tree. Refer to
    /// [`Neighbor::write_record`] for their layout.
    fn all_in_range<W, D, C>(
        &self,
        range: S,
        sink: &mut W,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<(), Error>
    where
        W: Write,
        D: Discriminator + ?Sized,
        C: ComputationsCounter;
}

impl<R: Region, St> SequentialSearch<R::Scalar> for Tree<'_, R, St> {
    fn nearest<D, C>(
        &self,
        query: PointRef<'_, R::Scalar>,
        mode: SearchMode<R::Scalar>,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<Vec<Candidate<'_, R::Scalar>>, Error>
    where
        D: Discriminator + ?Sized,
        C: ComputationsCounter,
    {
        let mut nearest = match mode {
            SearchMode::KNearest(k) => vec![Candidate::padding(); k],
            SearchMode::Radius(_) => Vec::new(),
        };
        let bound = |nearest: &[Candidate<'_, R::Scalar>]| match mode {
            SearchMode::KNearest(k) => nearest
                .get(k.wrapping_sub(1))
                .map_or(R::Scalar::ZERO, |last| last.distance),
            SearchMode::Radius(range) => range,
        };

        let Some(root) = self.root() else {
            return Ok(nearest);
        };

        let mut stack = vec![(root, R::Scalar::ZERO)];
        while let Some((id, distance)) = stack.pop() {
            if distance > bound(&nearest) {
                continue;
            }

            let node = self.node(id)?;
            if node.is_leaf() {
                node.find_nearest(query, &mut nearest, mode, dimension, discriminator, counter)?;
                continue;
            }

            let (near, far) = node.closest_child(self, query.coordinates, dimension, counter)?;
            for child in [far, near] {
                let bbox = self.node(child)?.bbox().ok_or(Error::Uninitialized)?;
                let distance = bbox.distance_to_point(query.coordinates, dimension, counter);
                stack.push((child, distance));
            }
        }

        Ok(nearest)
    }

    fn all_k_nearest<D, C>(
        &self,
        k: usize,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<Vec<Neighbor<'_, R::Scalar>>, Error>
    where
        D: Discriminator + ?Sized,
        C: ComputationsCounter,
    {
        let mut neighbors = vec![Neighbor::new(0); self.point_count() * k];

        let mut remaining = neighbors.as_mut_slice();
        for leaf in self.leaves() {
            let (slots, rest) = std::mem::take(&mut remaining).split_at_mut(leaf.len() * k);
            leaf_k_nearest(self, leaf, k, slots, dimension, discriminator, counter)?;
            remaining = rest;
        }

        Ok(neighbors)
    }

    fn all_in_range<W, D, C>(
        &self,
        range: R::Scalar,
        sink: &mut W,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<(), Error>
    where
        W: Write,
        D: Discriminator + ?Sized,
        C: ComputationsCounter,
    {
        for leaf in self.leaves() {
            leaf_in_range(self, leaf, range, &mut *sink, dimension, discriminator, counter)?;
        }
        Ok(())
    }
}

/// Fills the neighbor slots of the points of the `query` leaf, walking the tree from its root.
#[allow(clippy::too_many_arguments)]
pub(crate) fn leaf_k_nearest<'t, 'g, R, St, D, C>(
    tree: &'t Tree<'g, R, St>,
    query: &Node<'g, R, St>,
    k: usize,
    neighbors: &mut [Neighbor<'t, R::Scalar>],
    dimension: usize,
    discriminator: &D,
    counter: &mut C,
) -> Result<(), Error>
where
    R: Region,
    D: Discriminator + ?Sized,
    C: ComputationsCounter,
{
    query.init_k_neighbors(k, neighbors)?;

    walk(tree, query, R::Scalar::MAX, dimension, counter, |node, bound, counter| {
        let batch = Batch::KNearest {
            k,
            neighbors: &mut *neighbors,
        };
        node.find_all_nearest(query, batch, bound, dimension, discriminator, counter)
    })
}

/// Writes the records of the points of the `query` leaf, walking the tree from its root.
#[allow(clippy::too_many_arguments)]
pub(crate) fn leaf_in_range<'g, R, St, D, C>(
    tree: &Tree<'g, R, St>,
    query: &Node<'g, R, St>,
    range: R::Scalar,
    sink: &mut dyn Write,
    dimension: usize,
    discriminator: &D,
    counter: &mut C,
) -> Result<(), Error>
where
    R: Region,
    D: Discriminator + ?Sized,
    C: ComputationsCounter,
{
    walk(tree, query, range, dimension, counter, |node, bound, counter| {
        let batch = Batch::Radius {
            range,
            sink: &mut *sink,
        };
        node.find_all_nearest(query, batch, bound, dimension, discriminator, counter)
    })
}

// Depth-first traversal of the tree, visiting the closest node to `query` first. Nodes whose
// region is farther from the region of `query` than the bound are skipped. Leaves are handed to
// `visit`, which returns the new bound.
fn walk<'t, 'g, R, St, C, F>(
    tree: &'t Tree<'g, R, St>,
    query: &Node<'g, R, St>,
    mut bound: R::Scalar,
    dimension: usize,
    counter: &mut C,
    mut visit: F,
) -> Result<(), Error>
where
    R: Region,
    C: ComputationsCounter,
    F: FnMut(&'t Node<'g, R, St>, R::Scalar, &mut C) -> Result<R::Scalar, Error>,
{
    let Some(root) = tree.root() else {
        return Ok(());
    };

    let mut stack = vec![(tree.node(root)?, R::Scalar::ZERO)];
    while let Some((node, distance)) = stack.pop() {
        if distance > bound {
            continue;
        }

        match node.children() {
            None => bound = visit(node, bound, counter)?,
            Some((left, right)) => {
                let (left, right) = (tree.node(left)?, tree.node(right)?);
                let (near, far) = query.closest_node(left, right, dimension, counter)?;
                stack.push(far);
                stack.push(near);
            }
        }
    }

    Ok(())
}
