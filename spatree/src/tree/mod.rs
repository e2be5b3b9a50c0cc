/// Region related traits and types.
pub mod partition;

/// Vertex of a tree and its search operations.
pub mod node;

pub use node::Node;
pub use partition::*;

use crate::Error;

/// Index of a [`Node`] in a [`Tree`].
pub type NodeID = u32;

/// Arena owning the regions and statistics the nodes of a [`Tree`] alias.
///
/// The `boxes` and `statistics` vectors are parallel, so the `i`-th element of both corresponds to
/// the node with identifier `i`.
#[derive(Clone, Debug)]
pub struct Geometry<R, St> {
    /// Region of every node.
    pub boxes: Vec<R>,

    /// Statistics of every node.
    pub statistics: Vec<St>,
}

impl<R, St> Geometry<R, St> {
    /// Creates a new empty [`Geometry`].
    #[inline]
    pub const fn new() -> Self {
        Self {
            boxes: Vec::new(),
            statistics: Vec::new(),
        }
    }

    /// Creates a new empty [`Geometry`] with at least the specified capacity in the `boxes` and
    /// `statistics` vectors.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            boxes: Vec::with_capacity(capacity),
            statistics: Vec::with_capacity(capacity),
        }
    }

    /// Appends the region and statistics of a node and returns their index.
    #[inline]
    pub fn push(&mut self, bbox: R, statistics: St) -> usize {
        self.boxes.push(bbox);
        self.statistics.push(statistics);
        self.boxes.len() - 1
    }

    /// Returns the region and statistics at the given index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<(&R, &St)> {
        Some((self.boxes.get(index)?, self.statistics.get(index)?))
    }

    /// Returns the number of regions.
    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Returns `true` if the arena holds no regions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl<R, St> Default for Geometry<R, St> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Arena of [`Nodes`](Node) addressed by their [`NodeID`].
///
/// Nodes are pushed bottom-up: the identifier of a node is its position in the arena and the
/// children of an internal node are pushed before it, so the root is the last node.
#[derive(Debug)]
pub struct Tree<'g, R: Region, St> {
    nodes: Vec<Node<'g, R, St>>,
}

impl<'g, R: Region, St> Tree<'g, R, St> {
    /// Creates a new empty [`Tree`].
    #[inline]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates a new empty [`Tree`] with at least the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Returns the identifier the next pushed node must have.
    #[inline]
    pub fn next_id(&self) -> NodeID {
        self.nodes.len() as NodeID
    }

    /// Appends an initialized node and returns its identifier.
    ///
    /// Returns an error if the node is not initialized, if its identifier is not
    /// [`next_id`](Self::next_id) or if it has a child that is not part of the tree yet.
    pub fn push(&mut self, node: Node<'g, R, St>) -> Result<NodeID, Error> {
        let id = node.id().ok_or(Error::Uninitialized)?;
        let expected = self.next_id();
        if id != expected {
            return Err(Error::NodeId {
                expected,
                found: id,
            });
        }

        if let Some((left, right)) = node.children() {
            if let Some(&unknown) = [left, right].iter().find(|&&child| child >= id) {
                return Err(Error::UnknownNode(unknown));
            }
        }

        self.nodes.push(node);
        Ok(id)
    }

    /// Returns the node with the given identifier.
    #[inline]
    pub fn get(&self, id: NodeID) -> Option<&Node<'g, R, St>> {
        self.nodes.get(id as usize)
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeID) -> Result<&Node<'g, R, St>, Error> {
        self.get(id).ok_or(Error::UnknownNode(id))
    }

    /// Returns every node of the tree, ordered by identifier.
    #[inline]
    pub fn nodes(&self) -> &[Node<'g, R, St>] {
        &self.nodes
    }

    /// Returns an iterator over the leaves of the tree.
    #[inline]
    pub fn leaves(&self) -> impl Iterator<Item = &Node<'g, R, St>> + Clone {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Returns the identifier of the root of the tree.
    #[inline]
    pub fn root(&self) -> Option<NodeID> {
        self.nodes.len().checked_sub(1).map(|root| root as NodeID)
    }

    /// Returns the number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of points stored in the leaves of the tree.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.leaves().map(Node::len).sum()
    }
}

impl<R: Region, St> Default for Tree<'_, R, St> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
