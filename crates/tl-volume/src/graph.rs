use std::cell::Cell;

use tl_core::{Box3f, Box3i, Point3f, Point3i};

use crate::ExplicitVolume;

pub type NodeId = usize;
pub type EdgeId = usize;

/// Size of the full neighborhood of a voxel. Nodes with a smaller degree
/// sit on the boundary of the object.
pub const NUM_NEIGHBORS: usize = 26;

/// A 3D binary object as an undirected graph: one node per non-zero voxel,
/// one edge per pair of non-zero 26-neighbors.
///
/// Resolution and offset are inherited from the source volume, so node
/// positions can be mapped back to world space.
#[derive(Debug, Clone, Default)]
pub struct GraphVolume {
    positions: Vec<Point3i>,
    edges: Vec<(NodeId, NodeId)>,
    incident: Vec<Vec<EdgeId>>,
    resolution: Point3f,
    offset: Point3f,
    size: (usize, usize, usize),
    discrete_bounding_box: Cell<Option<Box3i>>,
}

// the 13 lexicographically forward neighbor offsets; iterating them once
// per voxel visits every 26-neighbor pair exactly once
const FORWARD_NEIGHBORS: [(i64, i64, i64); 13] = [
    (1, 0, 0),
    (-1, 1, 0),
    (0, 1, 0),
    (1, 1, 0),
    (-1, -1, 1),
    (0, -1, 1),
    (1, -1, 1),
    (-1, 0, 1),
    (0, 0, 1),
    (1, 0, 1),
    (-1, 1, 1),
    (0, 1, 1),
    (1, 1, 1),
];

impl GraphVolume {
    /// Builds the 26-neighborhood graph of all non-zero voxels.
    pub fn from_volume<T: Copy + Default + PartialEq>(volume: &ExplicitVolume<T>) -> Self {
        let (width, height, depth) = (volume.width(), volume.height(), volume.depth());
        let background = T::default();

        let mut node_at: Vec<Option<NodeId>> = vec![None; volume.len()];
        let mut positions = Vec::new();

        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    if volume.value(x, y, z) == background {
                        continue;
                    }
                    let id = positions.len();
                    node_at[(z * height + y) * width + x] = Some(id);
                    positions.push(Point3i::new(x as u32, y as u32, z as u32));
                }
            }
        }

        let mut edges = Vec::new();
        let mut incident = vec![Vec::new(); positions.len()];

        for (u, &pos) in positions.iter().enumerate() {
            for &(dx, dy, dz) in &FORWARD_NEIGHBORS {
                let nx = pos.x as i64 + dx;
                let ny = pos.y as i64 + dy;
                let nz = pos.z as i64 + dz;
                if nx < 0
                    || ny < 0
                    || nz < 0
                    || nx >= width as i64
                    || ny >= height as i64
                    || nz >= depth as i64
                {
                    continue;
                }

                let neighbor =
                    node_at[((nz as usize) * height + ny as usize) * width + nx as usize];
                let Some(v) = neighbor else { continue };

                let edge = edges.len();
                edges.push((u, v));
                incident[u].push(edge);
                incident[v].push(edge);
            }
        }

        Self {
            positions,
            edges,
            incident,
            resolution: volume.resolution(),
            offset: volume.offset(),
            size: (width, height, depth),
            discrete_bounding_box: Cell::new(None),
        }
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn position(&self, node: NodeId) -> Point3i {
        self.positions[node]
    }

    pub fn positions(&self) -> &[Point3i] {
        &self.positions
    }

    pub fn edge(&self, edge: EdgeId) -> (NodeId, NodeId) {
        self.edges[edge]
    }

    /// The node on the other side of an edge.
    pub fn opposite(&self, edge: EdgeId, node: NodeId) -> NodeId {
        let (u, v) = self.edges[edge];
        if u == node { v } else { u }
    }

    pub fn incident_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.incident[node]
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.incident[node].len()
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incident[node]
            .iter()
            .map(move |&e| self.opposite(e, node))
    }

    pub fn width(&self) -> usize {
        self.size.0
    }

    pub fn height(&self) -> usize {
        self.size.1
    }

    pub fn depth(&self) -> usize {
        self.size.2
    }

    pub fn resolution(&self) -> Point3f {
        self.resolution
    }

    pub fn offset(&self) -> Point3f {
        self.offset
    }

    pub fn discrete_to_world(&self, p: Point3i) -> Point3f {
        p.to_f32() * self.resolution + self.offset
    }

    /// The tight box around the node voxels, cached.
    pub fn discrete_bounding_box(&self) -> Box3i {
        if let Some(cached) = self.discrete_bounding_box.get() {
            return cached;
        }

        let mut bb = Box3i::default();
        for &pos in &self.positions {
            bb.fit(Box3i::from_voxel(pos));
        }
        self.discrete_bounding_box.set(Some(bb));
        bb
    }

    pub fn bounding_box(&self) -> Box3f {
        let dbb = self.discrete_bounding_box().to_f32();
        Box3f::new(
            dbb.min * self.resolution + self.offset,
            dbb.max * self.resolution + self.offset,
        )
    }
}
