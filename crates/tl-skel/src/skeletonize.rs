use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tl_core::{Error, Point3i};
use tl_volume::{EdgeId, GraphVolume, NUM_NEIGHBORS, NodeId};
use tracing::debug;

use crate::{Skeleton, squared_distance_transform_2d, squared_distance_transform_3d};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonizeParameters {
    /// Scale of the boundary penalty in the path cost.
    pub boundary_weight: f32,

    /// Maximal number of segments to extract.
    pub max_num_segments: usize,

    /// Minimal length of an accepted segment in world units, including the
    /// boundary penalty.
    pub min_segment_length: f32,

    /// After the first (longest) segment of length L was extracted, the
    /// minimal segment length is raised to at least `ratio * L`.
    pub min_segment_length_ratio: f32,

    /// Skip boundary nodes that fall within an explanation sphere around
    /// any skeleton node when looking for segment end points.
    pub skip_explained_nodes: bool,

    /// Multiplier on the squared boundary distance that determines the
    /// radius of the explanation spheres.
    pub explanation_weight: f32,
}

impl Default for SkeletonizeParameters {
    fn default() -> Self {
        Self {
            boundary_weight: 1.0,
            max_num_segments: 10,
            min_segment_length: 0.0,
            min_segment_length_ratio: 1.0,
            skip_explained_nodes: false,
            explanation_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeLabel {
    Inside,
    Boundary,
    Explained,
    OnSkeleton,
    Visited,
}

/// Min-heap entry for the shortest-path search.
struct QueueEntry {
    distance: f32,
    node: NodeId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.node == other.node
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed, so the binary max-heap pops the smallest distance
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Extracts a tree-structured skeleton from a voxel grid graph.
///
/// The algorithm follows the TEASAR construction: edge costs reward paths
/// that stay deep inside the object, a root is chosen as the boundary node
/// furthest from the innermost voxel, and segments are peeled off by
/// repeatedly walking from the furthest remaining boundary node back to the
/// growing skeleton. Extracted edges become free, so later segments reuse
/// the skeleton instead of running parallel to it.
pub struct Skeletonize<'a> {
    graph: &'a GraphVolume,
    parameters: SkeletonizeParameters,

    labels: Vec<NodeLabel>,
    boundary: Vec<NodeId>,
    edge_costs: Vec<f32>,

    // squared boundary distances over the padded discrete bounding box
    field: Vec<f32>,
    field_shape: (usize, usize, usize),
    field_min: [i64; 3],
    max_boundary_distance_squared: f32,

    center: NodeId,
    root: NodeId,

    // shortest-path workspace
    distances: Vec<f32>,
    predecessors: Vec<Option<EdgeId>>,
}

impl<'a> Skeletonize<'a> {
    pub fn new(graph: &'a GraphVolume, parameters: SkeletonizeParameters) -> Self {
        let dbb = graph.discrete_bounding_box();
        let field_shape = (
            dbb.width().max(0) as usize + 2,
            dbb.height().max(0) as usize + 2,
            dbb.depth().max(0) as usize + 2,
        );

        Self {
            graph,
            parameters,
            labels: vec![NodeLabel::Inside; graph.node_count()],
            boundary: Vec::new(),
            edge_costs: vec![0.0; graph.edge_count()],
            field: vec![0.0; field_shape.0 * field_shape.1 * field_shape.2],
            field_shape,
            field_min: [dbb.min[0] - 1, dbb.min[1] - 1, dbb.min[2] - 1],
            max_boundary_distance_squared: 0.0,
            center: 0,
            root: 0,
            distances: vec![f32::INFINITY; graph.node_count()],
            predecessors: vec![None; graph.node_count()],
        }
    }

    /// Runs the extraction. Fails with [`Error::NoNodeFound`] when the graph
    /// has no reachable boundary node to root the skeleton in.
    pub fn extract(mut self) -> Result<Skeleton, Error> {
        let resolution = self.graph.resolution();
        if resolution.x <= 0.0 || resolution.y <= 0.0 || resolution.z <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "volume resolution {resolution:?} is not positive"
            )));
        }
        if self.graph.node_count() == 0 {
            return Err(Error::NoNodeFound);
        }

        self.find_boundary_nodes();
        self.initialize_edge_costs();
        self.find_root()?;

        for _ in 0..self.parameters.max_num_segments {
            if !self.extract_longest_segment() {
                break;
            }
        }

        Ok(self.parse_volume_skeleton())
    }

    fn find_boundary_nodes(&mut self) {
        for node in 0..self.graph.node_count() {
            if self.graph.degree(node) != NUM_NEIGHBORS {
                self.boundary.push(node);
                self.labels[node] = NodeLabel::Boundary;
            }
        }
    }

    fn field_index(&self, pos: Point3i) -> usize {
        let x = (pos.x as i64 - self.field_min[0]) as usize;
        let y = (pos.y as i64 - self.field_min[1]) as usize;
        let z = (pos.z as i64 - self.field_min[2]) as usize;
        (z * self.field_shape.1 + y) * self.field_shape.0 + x
    }

    fn boundary_distance(&self, pos: Point3i) -> f32 {
        self.field[self.field_index(pos)]
    }

    /// Computes the boundary distance field and derives the edge costs
    /// `d_uv * (1 + penalty)`: the Euclidean step length between the voxels,
    /// scaled up where the path runs close to the boundary.
    fn initialize_edge_costs(&mut self) {
        let resolution = self.graph.resolution();

        for node in 0..self.graph.node_count() {
            let index = self.field_index(self.graph.position(node));
            self.field[index] = 1.0;
        }

        if self.graph.discrete_bounding_box().depth() == 1 {
            debug!("performing 2D distance transform for the boundary penalty");

            // only the center section holds voxels, the padding planes stay
            // at distance zero
            let plane = self.field_shape.0 * self.field_shape.1;
            squared_distance_transform_2d(
                &mut self.field[plane..2 * plane],
                self.field_shape.0,
                self.field_shape.1,
                (resolution.x, resolution.y),
            );
        } else {
            squared_distance_transform_3d(
                &mut self.field,
                self.field_shape,
                (resolution.x, resolution.y, resolution.z),
            );
        }

        // the innermost voxel seeds the root search
        self.max_boundary_distance_squared = 0.0;
        for node in 0..self.graph.node_count() {
            let distance = self.boundary_distance(self.graph.position(node));
            if distance > self.max_boundary_distance_squared {
                self.center = node;
                self.max_boundary_distance_squared = distance;
            }
        }

        // Euclidean distances between 26-neighbors, indexed by which of the
        // coordinates differ
        let step = [
            0.0,
            resolution.z,
            resolution.y,
            (resolution.y * resolution.y + resolution.z * resolution.z).sqrt(),
            resolution.x,
            (resolution.x * resolution.x + resolution.z * resolution.z).sqrt(),
            (resolution.x * resolution.x + resolution.y * resolution.y).sqrt(),
            (resolution.x * resolution.x
                + resolution.y * resolution.y
                + resolution.z * resolution.z)
                .sqrt(),
        ];

        for edge in 0..self.graph.edge_count() {
            let (u, v) = self.graph.edge(edge);
            let pu = self.graph.position(u);
            let pv = self.graph.position(v);

            let average = 0.5 * (self.boundary_distance(pu) + self.boundary_distance(pv));
            let penalty = self.boundary_penalty(average);

            let mut axes = 0;
            if pu.x != pv.x {
                axes |= 4;
            }
            if pu.y != pv.y {
                axes |= 2;
            }
            if pu.z != pv.z {
                axes |= 1;
            }

            self.edge_costs[edge] = step[axes] * (penalty + 1.0);
        }
    }

    /// `w * (1 - sqrt(bd / max_bd))`: zero at the innermost voxel, `w` at
    /// the boundary.
    fn boundary_penalty(&self, boundary_distance: f32) -> f32 {
        self.parameters.boundary_weight
            * (1.0 - (boundary_distance / self.max_boundary_distance_squared).sqrt())
    }

    fn find_root(&mut self) -> Result<(), Error> {
        self.run_shortest_paths(self.center);

        let mut max_distance = -1.0;
        for &node in &self.boundary {
            let distance = self.distances[node];
            if distance.is_finite() && distance > max_distance {
                self.root = node;
                max_distance = distance;
            }
        }

        if max_distance < 0.0 {
            return Err(Error::NoNodeFound);
        }

        self.labels[self.root] = NodeLabel::OnSkeleton;
        Ok(())
    }

    /// Extracts the path from the furthest admissible boundary node back to
    /// the skeleton. Returns false once no admissible node remains or the
    /// best one is closer than the minimal segment length.
    fn extract_longest_segment(&mut self) -> bool {
        self.run_shortest_paths(self.root);

        let mut furthest = None;
        let mut max_distance = -1.0;
        for &node in &self.boundary {
            if self.parameters.skip_explained_nodes
                && self.labels[node] == NodeLabel::Explained
            {
                continue;
            }
            let distance = self.distances[node];
            if distance.is_finite() && distance > max_distance {
                furthest = Some(node);
                max_distance = distance;
            }
        }

        let Some(furthest) = furthest else {
            return false;
        };
        if max_distance < self.parameters.min_segment_length {
            return false;
        }

        debug!(length = max_distance, "extracting segment");

        // walk backwards to the closest skeleton point, freeing the
        // traversed edges so that later searches reuse them
        let mut node = furthest;
        while self.labels[node] != NodeLabel::OnSkeleton {
            self.labels[node] = NodeLabel::OnSkeleton;

            if self.parameters.skip_explained_nodes {
                self.mark_explained_around(self.graph.position(node));
            }

            let edge = self.predecessors[node]
                .expect("nodes reached by the search have a predecessor");
            node = self.graph.opposite(edge, node);
            self.edge_costs[edge] = 0.0;
        }

        // the first segment ends at the root and fixes the length bound
        if node == self.root {
            debug!(length = max_distance, "longest segment");
            self.parameters.min_segment_length = self
                .parameters
                .min_segment_length
                .max(self.parameters.min_segment_length_ratio * max_distance);
        }

        true
    }

    /// Marks all boundary nodes within the explanation sphere around a new
    /// skeleton voxel.
    fn mark_explained_around(&mut self, center: Point3i) {
        let radius_squared = self.boundary_distance(center)
            * self.parameters.explanation_weight
            * self.parameters.explanation_weight;

        let resolution = self.graph.resolution();
        let (rx2, ry2, rz2) = (
            resolution.x * resolution.x,
            resolution.y * resolution.y,
            resolution.z * resolution.z,
        );

        for &node in &self.boundary {
            let pos = self.graph.position(node);
            let dx = pos.x as f32 - center.x as f32;
            let dy = pos.y as f32 - center.y as f32;
            let dz = pos.z as f32 - center.z as f32;
            let distance_squared = rx2 * dx * dx + ry2 * dy * dy + rz2 * dz * dz;

            if distance_squared <= radius_squared && self.labels[node] != NodeLabel::OnSkeleton
            {
                self.labels[node] = NodeLabel::Explained;
            }
        }
    }

    /// Dijkstra over the current edge costs, filling the distance and
    /// predecessor maps.
    fn run_shortest_paths(&mut self, source: NodeId) {
        self.distances.fill(f32::INFINITY);
        self.predecessors.fill(None);
        self.distances[source] = 0.0;

        let mut queue = BinaryHeap::new();
        queue.push(QueueEntry {
            distance: 0.0,
            node: source,
        });

        while let Some(QueueEntry { distance, node }) = queue.pop() {
            if distance > self.distances[node] {
                continue;
            }

            for &edge in self.graph.incident_edges(node) {
                let neighbor = self.graph.opposite(edge, node);
                let candidate = distance + self.edge_costs[edge];
                if candidate < self.distances[neighbor] {
                    self.distances[neighbor] = candidate;
                    self.predecessors[neighbor] = Some(edge);
                    queue.push(QueueEntry {
                        distance: candidate,
                        node: neighbor,
                    });
                }
            }
        }
    }

    fn zero_cost_degree(&self, node: NodeId) -> usize {
        self.graph
            .incident_edges(node)
            .iter()
            .filter(|&&e| self.edge_costs[e] == 0.0)
            .count()
    }

    /// Branch points, terminals and the root open new segments; nodes in
    /// the middle of a run extend the current one.
    fn is_opening_node(&self, node: NodeId) -> bool {
        node == self.root || self.zero_cost_degree(node) != 2
    }

    /// Serializes the zero-cost subgraph into a [`Skeleton`] by an iterative
    /// depth-first walk: every node is emitted on first sight, openers close
    /// once their subtree is done.
    fn parse_volume_skeleton(&mut self) -> Skeleton {
        let mut skeleton = Skeleton::new(self.graph.resolution(), self.graph.offset());

        let mut stack = vec![self.root];
        while let Some(&node) = stack.last() {
            if self.labels[node] == NodeLabel::Visited {
                if self.is_opening_node(node) {
                    skeleton
                        .close_segment()
                        .expect("every opener was opened on first sight");
                }
                stack.pop();
                continue;
            }
            self.labels[node] = NodeLabel::Visited;

            let pos = self.graph.position(node);
            let world = self.graph.discrete_to_world(pos);
            let diameter = 2.0 * self.boundary_distance(pos).sqrt();

            if self.is_opening_node(node) {
                skeleton.open_segment(world, diameter);
            } else {
                skeleton.extend_segment(world, diameter);
            }

            for &edge in self.graph.incident_edges(node) {
                if self.edge_costs[edge] != 0.0 {
                    continue;
                }
                let neighbor = self.graph.opposite(edge, node);
                if self.labels[neighbor] != NodeLabel::Visited {
                    stack.push(neighbor);
                }
            }
        }

        skeleton
    }
}

#[cfg(test)]
mod tests {
    use tl_core::Point3f;
    use tl_volume::{ExplicitVolume, GraphVolume};

    use super::{Skeletonize, SkeletonizeParameters};

    fn stick(length: usize) -> GraphVolume {
        let volume = ExplicitVolume::<u8>::new_fill(1, 1, length, 1);
        GraphVolume::from_volume(&volume)
    }

    fn is_tree(skeleton: &crate::Skeleton) -> bool {
        if skeleton.is_empty() {
            return true;
        }
        if skeleton.edge_count() != skeleton.node_count() - 1 {
            return false;
        }

        // connectivity by traversal
        let mut seen = vec![false; skeleton.node_count()];
        let mut stack = vec![0];
        seen[0] = true;
        let mut reached = 0;
        while let Some(n) = stack.pop() {
            reached += 1;
            for m in skeleton.neighbors(n) {
                if !seen[m] {
                    seen[m] = true;
                    stack.push(m);
                }
            }
        }
        reached == skeleton.node_count()
    }

    #[test]
    fn straight_stick_becomes_a_chain() {
        let graph = stick(10);
        let skeleton = Skeletonize::new(&graph, SkeletonizeParameters::default())
            .extract()
            .expect("stick has boundary nodes");

        assert_eq!(skeleton.node_count(), 10);
        assert_eq!(skeleton.edge_count(), 9);
        assert!(is_tree(&skeleton));

        // a chain: two terminals, eight pass-through nodes
        let terminals = (0..skeleton.node_count())
            .filter(|&n| skeleton.degree(n) == 1)
            .count();
        assert_eq!(terminals, 2);

        // the outside is padded with zeros, so every voxel of the stick is
        // at squared distance 1 from the boundary
        for n in 0..skeleton.node_count() {
            assert!((skeleton.diameter(n) - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn plus_sign_has_a_degree_four_branch_node() {
        let mut volume = ExplicitVolume::<u8>::new(3, 3, 1);
        volume.set_value(1, 0, 0, 1);
        volume.set_value(0, 1, 0, 1);
        volume.set_value(1, 1, 0, 1);
        volume.set_value(2, 1, 0, 1);
        volume.set_value(1, 2, 0, 1);

        let graph = GraphVolume::from_volume(&volume);
        let parameters = SkeletonizeParameters {
            min_segment_length_ratio: 0.0,
            ..SkeletonizeParameters::default()
        };
        let skeleton = Skeletonize::new(&graph, parameters)
            .extract()
            .expect("plus sign has boundary nodes");

        assert_eq!(skeleton.node_count(), 5);
        assert_eq!(skeleton.edge_count(), 4);
        assert!(is_tree(&skeleton));

        let branch = (0..skeleton.node_count())
            .filter(|&n| skeleton.degree(n) == 4)
            .count();
        let leaves = (0..skeleton.node_count())
            .filter(|&n| skeleton.degree(n) == 1)
            .count();
        assert_eq!(branch, 1);
        assert_eq!(leaves, 4);

        // the branch node sits at the center of the cross
        let center = (0..skeleton.node_count())
            .find(|&n| skeleton.degree(n) == 4)
            .expect("branch node exists");
        assert_eq!(skeleton.position(center), Point3f::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn empty_volume_has_no_root() {
        let volume = ExplicitVolume::<u8>::new(3, 3, 3);
        let graph = GraphVolume::from_volume(&volume);
        let result = Skeletonize::new(&graph, SkeletonizeParameters::default()).extract();
        assert!(result.is_err());
    }

    #[test]
    fn min_segment_length_suppresses_short_segments() {
        let graph = stick(5);
        let parameters = SkeletonizeParameters {
            min_segment_length: 100.0,
            ..SkeletonizeParameters::default()
        };
        let skeleton = Skeletonize::new(&graph, parameters)
            .extract()
            .expect("root is still found");

        // only the root itself remains
        assert_eq!(skeleton.node_count(), 1);
        assert_eq!(skeleton.edge_count(), 0);
    }

    #[test]
    fn max_num_segments_caps_the_extraction() {
        // a 5x5 plate would yield several segments; one is allowed
        let volume = ExplicitVolume::<u8>::new_fill(5, 5, 1, 1);
        let graph = GraphVolume::from_volume(&volume);
        let parameters = SkeletonizeParameters {
            max_num_segments: 1,
            min_segment_length_ratio: 0.0,
            ..SkeletonizeParameters::default()
        };
        let skeleton = Skeletonize::new(&graph, parameters)
            .extract()
            .expect("plate has boundary nodes");

        assert!(is_tree(&skeleton));

        // one segment is a single path: no branch nodes
        assert!(
            (0..skeleton.node_count()).all(|n| skeleton.degree(n) <= 2),
            "a single segment cannot branch"
        );
    }

    #[test]
    fn explained_nodes_are_skipped() {
        let mut volume = ExplicitVolume::<u8>::new(3, 3, 1);
        volume.set_value(1, 0, 0, 1);
        volume.set_value(0, 1, 0, 1);
        volume.set_value(1, 1, 0, 1);
        volume.set_value(2, 1, 0, 1);
        volume.set_value(1, 2, 0, 1);

        let graph = GraphVolume::from_volume(&volume);
        let parameters = SkeletonizeParameters {
            min_segment_length_ratio: 0.0,
            skip_explained_nodes: true,
            explanation_weight: 10.0,
            ..SkeletonizeParameters::default()
        };
        let skeleton = Skeletonize::new(&graph, parameters)
            .extract()
            .expect("plus sign has boundary nodes");

        // the huge explanation spheres swallow the remaining arms after the
        // first segment
        assert!(skeleton.node_count() < 5);
        assert!(is_tree(&skeleton));
    }

    #[test]
    fn single_voxel_yields_a_single_node() {
        let graph = stick(1);
        let skeleton = Skeletonize::new(&graph, SkeletonizeParameters::default())
            .extract()
            .expect("a lone voxel is its own boundary");

        assert_eq!(skeleton.node_count(), 1);
        assert_eq!(skeleton.edge_count(), 0);
    }

    #[test]
    fn world_units_respect_resolution_and_offset() {
        let mut volume = ExplicitVolume::<u8>::new_fill(1, 1, 4, 1);
        volume.set_resolution(Point3f::new(1.0, 1.0, 5.0));
        volume.set_offset(Point3f::new(10.0, 20.0, 30.0));

        let graph = GraphVolume::from_volume(&volume);
        let skeleton = Skeletonize::new(&graph, SkeletonizeParameters::default())
            .extract()
            .expect("stick has boundary nodes");

        assert_eq!(skeleton.node_count(), 4);
        for n in 0..skeleton.node_count() {
            let p = skeleton.position(n);
            assert_eq!((p.x, p.y), (10.0, 20.0));
            assert!((p.z - 30.0) % 5.0 == 0.0);
        }
    }
}
