use std::cell::Cell;

use tl_core::{Box3f, Error, Point3f};
use tl_volume::{EdgeId, NodeId};

/// A tree-structured skeleton: nodes carry world-space positions and tube
/// diameters, edges connect successive skeleton points.
///
/// Skeletons are built incrementally along a path through the tree:
/// [`open_segment`](Skeleton::open_segment) starts a branch that later
/// returns to its opening node, [`extend_segment`](Skeleton::extend_segment)
/// grows the current branch by one node, and
/// [`close_segment`](Skeleton::close_segment) pops back to the enclosing
/// branch point.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    positions: Vec<Point3f>,
    diameters: Vec<f32>,
    edges: Vec<(NodeId, NodeId)>,
    incident: Vec<Vec<EdgeId>>,
    resolution: Point3f,
    offset: Point3f,

    // LIFO of open branch points
    segment_path: Vec<NodeId>,
    previous: Option<NodeId>,

    bounding_box: Cell<Option<Box3f>>,
}

impl Skeleton {
    pub fn new(resolution: Point3f, offset: Point3f) -> Self {
        Self {
            resolution,
            offset,
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, node: NodeId) -> Point3f {
        self.positions[node]
    }

    pub fn positions(&self) -> &[Point3f] {
        &self.positions
    }

    pub fn diameter(&self, node: NodeId) -> f32 {
        self.diameters[node]
    }

    pub fn diameters(&self) -> &[f32] {
        &self.diameters
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.incident[node].len()
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incident[node].iter().map(move |&e| {
            let (u, v) = self.edges[e];
            if u == node { v } else { u }
        })
    }

    pub fn resolution(&self) -> Point3f {
        self.resolution
    }

    pub fn offset(&self) -> Point3f {
        self.offset
    }

    /// Starts a new segment: adds a node like
    /// [`extend_segment`](Skeleton::extend_segment) and marks it as the
    /// point to return to when the segment closes.
    pub fn open_segment(&mut self, position: Point3f, diameter: f32) -> NodeId {
        let node = self.extend_segment(position, diameter);
        self.segment_path.push(node);
        node
    }

    /// Adds a node and connects it to the previously added one.
    pub fn extend_segment(&mut self, position: Point3f, diameter: f32) -> NodeId {
        let node = self.positions.len();
        self.positions.push(position);
        self.diameters.push(diameter);
        self.incident.push(Vec::new());

        if let Some(previous) = self.previous {
            let edge = self.edges.len();
            self.edges.push((previous, node));
            self.incident[previous].push(edge);
            self.incident[node].push(edge);
        }
        self.previous = Some(node);
        self.bounding_box.set(None);

        node
    }

    /// Closes the current segment, backtracking to the enclosing branch
    /// point.
    pub fn close_segment(&mut self) -> Result<(), Error> {
        if self.segment_path.pop().is_none() {
            return Err(Error::UsageError(
                "close_segment called without a prior open_segment",
            ));
        }
        self.previous = self.segment_path.last().copied();
        Ok(())
    }

    /// The box around all node positions, each covering one voxel in world
    /// units. Cached until the skeleton grows.
    pub fn bounding_box(&self) -> Box3f {
        if let Some(cached) = self.bounding_box.get() {
            return cached;
        }

        let mut bb = Box3f::default();
        for &p in &self.positions {
            bb.fit(Box3f::new(p, p + self.resolution));
        }
        self.bounding_box.set(Some(bb));
        bb
    }
}
