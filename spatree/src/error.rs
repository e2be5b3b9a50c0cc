use crate::tree::NodeID;
use std::{fmt, io};

/// Errors returned by the nodes, trees and datasets of this crate.
#[derive(Debug)]
pub enum Error {
    /// A range of dataset rows extends past the end of the dataset.
    OutOfBounds {
        /// First row of the range.
        start: usize,
        /// Number of rows of the range.
        len: usize,
        /// Number of rows of the dataset.
        rows: usize,
    },
    /// Fewer coordinates are available than the dimension requires.
    Dimension {
        /// Number of coordinates required.
        expected: usize,
        /// Number of coordinates available.
        found: usize,
    },
    /// A flat buffer of values cannot be split into rows of the given dimension.
    Shape {
        /// Number of values of the buffer.
        len: usize,
        /// Number of coordinates per row.
        dimension: usize,
    },
    /// The number of identifiers differs from the number of rows.
    IdCount {
        /// Number of rows.
        expected: usize,
        /// Number of identifiers.
        found: usize,
    },
    /// A neighbor buffer does not hold exactly `k` slots per point.
    NeighborBuffer {
        /// Required length of the buffer.
        expected: usize,
        /// Actual length of the buffer.
        found: usize,
    },
    /// A k-nearest neighbor search did not yield exactly `k` results.
    Cardinality {
        /// Number of results required.
        expected: usize,
        /// Number of results found.
        found: usize,
    },
    /// The operation requires a leaf node.
    NotALeaf(Option<NodeID>),
    /// The operation requires an internal node.
    NotInternal(Option<NodeID>),
    /// The node has not been initialized.
    Uninitialized,
    /// The node identifier does not match its position in the tree.
    NodeId {
        /// Identifier of the next node of the tree.
        expected: NodeID,
        /// Identifier of the node.
        found: NodeID,
    },
    /// The node is not part of the tree.
    UnknownNode(NodeID),
    /// Writing to the result sink failed.
    Sink(io::Error),
}

struct MaybeId(Option<NodeID>);

impl fmt::Display for MaybeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("-"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { start, len, rows } => write!(
                f,
                "rows {start}..{start}+{len} are out of bounds for a dataset of {rows} rows"
            ),
            Self::Dimension { expected, found } => write!(
                f,
                "{expected} coordinates are required but only {found} are available"
            ),
            Self::Shape { len, dimension } => write!(
                f,
                "{len} values cannot be split into rows of {dimension} coordinates"
            ),
            Self::IdCount { expected, found } => {
                write!(f, "expected {expected} identifiers, found {found}")
            }
            Self::NeighborBuffer { expected, found } => write!(
                f,
                "neighbor buffer holds {found} slots instead of {expected}"
            ),
            Self::Cardinality { expected, found } => {
                write!(f, "during {expected}-nn search, returned {found} results")
            }
            Self::NotALeaf(id) => write!(f, "node {} is not a leaf", MaybeId(*id)),
            Self::NotInternal(id) => write!(f, "node {} is not an internal node", MaybeId(*id)),
            Self::Uninitialized => f.write_str("node is not initialized"),
            Self::NodeId { expected, found } => write!(
                f,
                "node {found} cannot be inserted in place of node {expected}"
            ),
            Self::UnknownNode(id) => write!(f, "node {id} is not part of the tree"),
            Self::Sink(e) => write!(f, "error while writing range nearest neighbors: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sink(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(e: io::Error) -> Self {
        Self::Sink(e)
    }
}
