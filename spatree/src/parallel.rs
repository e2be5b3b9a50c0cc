use crate::{
    diagnostics::ComputationsCounter,
    neighbor::{Discriminator, Neighbor},
    sequential::{leaf_in_range, leaf_k_nearest},
    tree::{Node, Region, Tree},
    Error,
};
use rayon::iter::{
    IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, ParallelIterator,
};
use std::io::Write;

/// Trait to search the neighbors of points stored in a [`Tree`] using multiple CPU threads.
///
/// Every leaf of the tree is searched by its own task with its own neighbor slots, counter and
/// record buffer. The results are identical to the ones of the
/// [`SequentialSearch`](crate::sequential::SequentialSearch) trait, and the counters of every task
/// are [merged](ComputationsCounter::merge) into the given counter once the search is done.
pub trait ParallelSearch<S> {
    /// Returns the `k` nearest neighbors of every point stored in the tree.
    ///
    /// Refer to [`SequentialSearch::all_k_nearest`](crate::sequential::SequentialSearch::all_k_nearest)
    /// for the layout of the result.
    fn par_all_k_nearest<D, C>(
        &self,
        k: usize,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<Vec<Neighbor<'_, S>>, Error>
    where
        D: Discriminator + Sync + ?Sized,
        C: ComputationsCounter + Default + Send;

    /// Writes a record to `sink` for every pair of points of the tree within `range` of each
    /// other.
    ///
    /// The records of every leaf are buffered in memory and written to `sink` in the order of the
    /// leaves in the tree, so the output is the same as the one of
    /// [`SequentialSearch::all_in_range`](crate::sequential::SequentialSearch::all_in_range).
    fn par_all_in_range<W, D, C>(
        &self,
        range: S,
        sink: &mut W,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<(), Error>
    where
        W: Write,
        D: Discriminator + Sync + ?Sized,
        C: ComputationsCounter + Default + Send;
}

impl<R, St> ParallelSearch<R::Scalar> for Tree<'_, R, St>
where
    R: Region + Sync,
    St: Sync,
{
    fn par_all_k_nearest<D, C>(
        &self,
        k: usize,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<Vec<Neighbor<'_, R::Scalar>>, Error>
    where
        D: Discriminator + Sync + ?Sized,
        C: ComputationsCounter + Default + Send,
    {
        let leaves = self.leaves().collect::<Vec<_>>();
        let mut neighbors = vec![Neighbor::new(0); self.point_count() * k];

        let mut chunks = Vec::with_capacity(leaves.len());
        let mut remaining = neighbors.as_mut_slice();
        for leaf in &leaves {
            let (chunk, rest) = std::mem::take(&mut remaining).split_at_mut(leaf.len() * k);
            chunks.push(chunk);
            remaining = rest;
        }

        let counters = leaves
            .par_iter()
            .zip(chunks.into_par_iter())
            .map(|(&leaf, chunk)| -> Result<C, Error> {
                let mut local = C::default();
                leaf_k_nearest(self, leaf, k, chunk, dimension, discriminator, &mut local)?;
                Ok(local)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        for local in &counters {
            counter.merge(local);
        }

        Ok(neighbors)
    }

    fn par_all_in_range<W, D, C>(
        &self,
        range: R::Scalar,
        sink: &mut W,
        dimension: usize,
        discriminator: &D,
        counter: &mut C,
    ) -> Result<(), Error>
    where
        W: Write,
        D: Discriminator + Sync + ?Sized,
        C: ComputationsCounter + Default + Send,
    {
        let leaves = self.leaves().collect::<Vec<&Node<'_, R, St>>>();

        let results = leaves
            .par_iter()
            .map(|&leaf| -> Result<(Vec<u8>, C), Error> {
                let (mut buffer, mut local) = (Vec::<u8>::new(), C::default());
                leaf_in_range(self, leaf, range, &mut buffer, dimension, discriminator, &mut local)?;
                Ok((buffer, local))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        for (buffer, local) in &results {
            counter.merge(local);
            sink.write_all(buffer)?;
        }

        Ok(())
    }
}
