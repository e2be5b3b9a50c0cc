#![warn(missing_docs)]
//! # spatree
//!
//! spatree is a crate providing the building blocks of exact nearest neighbor searches over
//! binary space-partitioning trees in Rust.
//!
//! ## Goals
//!
//! The main goal of this crate is to provide the primitives a tree-based neighbor search is made
//! of, without deciding how the tree is built or traversed. It does not include anything related
//! to splitting datasets into nodes and instead only focuses on what happens once the nodes
//! exist: scanning leaves, ordering children and nodes by distance and maintaining the neighbors
//! found so far.
//!
//! ### Searches
//!
//! There are 2 kinds of searches:
//! [k-nearest neighbors](https://en.wikipedia.org/wiki/K-nearest_neighbors_algorithm) and
//! [fixed-radius neighbors](https://en.wikipedia.org/wiki/Fixed-radius_near_neighbors).
//!
//! k-nearest neighbor searches keep a fixed number of candidates per point, sorted by distance,
//! and yield a bound that shrinks as better candidates are found. Fixed-radius searches stream
//! every match to a sink as a fixed-size binary record.
//!
//! spatree uses [rayon](https://github.com/rayon-rs/rayon) for parallelization. Enable the
//! `parallel` feature to access the relevant drivers.
//!
//! ## Using spatree
//!
//! A [`Tree`](tree::Tree) is an arena of [`Nodes`](tree::Node) whose regions and statistics are
//! owned by a [`Geometry`](tree::Geometry). Nodes are initialized bottom-up with
//! [`init_leaf`](tree::Node::init_leaf) and [`init_internal`](tree::Node::init_internal), and
//! pushed in the tree with their children first.
//!
//! ```
//! use spatree::prelude::*;
//!
//! let dataset = Matrix::from_rows(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
//!
//! let mut geometry = Geometry::new();
//! geometry.push(BoundingBox::with(2, dataset.values().chunks(2)), ());
//!
//! let mut tree = Tree::new();
//! let (bbox, statistics) = geometry.get(0).unwrap();
//! let mut leaf = Node::new();
//! leaf.init_leaf(bbox, statistics, 0, 0, dataset.len(), 2, &dataset, &Heap)?;
//! tree.push(leaf)?;
//!
//! let query = dataset.point(0).unwrap();
//! let nearest = tree.nearest(query, SearchMode::KNearest(2), 2, &SameId, &mut NoCounter)?;
//!
//! let found = nearest.iter().map(|c| (c.distance, c.point.map(|p| p.id)));
//! assert!(found.eq([(1.0, Some(1)), (2.0, Some(2))]));
//! # Ok::<(), spatree::Error>(())
//! ```
//!
//! ### Datasets
//!
//! Leaves copy their points from any [`Dataset`](storage::Dataset). [`Matrix`](storage::Matrix)
//! stores row-major coordinates and slices of [`Record`](storage::Record) are datasets too. The
//! [`Record`](storage::Record) trait can be derived when the type has an `id` field and a
//! `position` or `coordinates` array field.
//!
//! ```
//! use spatree::prelude::*;
//!
//! #[derive(Record)]
//! struct Star {
//!     id: u32,
//!     magnitude: f32,
//!     position: [f32; 3],
//! }
//!
//! let stars = [
//!     Star { id: 4, magnitude: 1.2, position: [0.0, 1.0, 2.0] },
//!     Star { id: 9, magnitude: 3.4, position: [1.0, 1.0, 1.0] },
//! ];
//! let dataset: &[Star] = &stars;
//!
//! assert_eq!(dataset.rows(), 2);
//! assert_eq!(dataset.dimension(), 3);
//! assert_eq!(dataset.id_of(1), 9);
//! ```
//!
//! ### Fixed-radius searches
//!
//! ```
//! use spatree::prelude::*;
//!
//! # let dataset = Matrix::from_rows(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
//! # let mut geometry = Geometry::new();
//! # geometry.push(BoundingBox::with(2, dataset.values().chunks(2)), ());
//! # let mut tree = Tree::new();
//! # let (bbox, statistics) = geometry.get(0).unwrap();
//! # let mut leaf = Node::new();
//! # leaf.init_leaf(bbox, statistics, 0, 0, dataset.len(), 2, &dataset, &Heap)?;
//! # tree.push(leaf)?;
//! let mut sink = Vec::<u8>::new();
//! let mut counter = Counter::new();
//! tree.all_in_range(1.5, &mut sink, 2, &SameId, &mut counter)?;
//!
//! let records = RecordReader::<_, f64>::new(sink.as_slice(), 2).collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(records.len(), 4);
//! assert_eq!((records[0].point_id, records[0].nearest_id), (0, 1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Observability of the search primitives.
pub mod diagnostics;
/// Error type of the crate.
pub mod error;
/// Neighbors, candidates and the binary record format of fixed-radius matches.
pub mod neighbor;
/// Searches that use multiple CPU threads.
#[cfg(feature = "parallel")]
pub mod parallel;
/// Searches that use one CPU thread.
pub mod sequential;
/// Buffers, allocators and datasets the nodes are initialized from.
pub mod storage;
/// Tree, node and region implementation.
pub mod tree;

pub use error::Error;

/// Global identifier of a point of a dataset.
pub type PointId = u64;

/// Commonly used types, re-exported.
pub mod prelude {
    // Common traits and their derive macros.
    pub use crate::{
        diagnostics::{ComputationsCounter, Counter, NoCounter},
        neighbor::{
            Batch, Candidate, Discriminator, Neighbor, PointRef, RecordReader, SameId, SearchMode,
        },
        storage::{Allocator, Buffer, Dataset, Heap, Matrix, Record},
        tree::{BoundingBox, Geometry, Node, NodeID, Region, Scalar, Tree},
        Error, PointId,
    };
    pub use spatree_derive::Record;

    pub use crate::sequential::SequentialSearch;
    #[cfg(feature = "parallel")]
    pub use crate::parallel::ParallelSearch;
}
