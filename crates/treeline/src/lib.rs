//! Umbrella crate for the `treeline` workspace.
//!
//! Re-exports the component-tree and skeleton extraction crates. See
//! [`tl_tree::extract_component_tree`] and [`tl_skel::Skeletonize`] for the
//! two entry points.

pub use tl_core::*;
pub use tl_skel::*;
pub use tl_tree::*;
// tl-volume's graph ids would collide with the tree's node ids under a glob
pub use tl_volume::{ExplicitVolume, GraphVolume, ImageStack, NUM_NEIGHBORS, VolumeSlice, intersect};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tl_core::{Image, Point3f};
    use tl_skel::{Skeletonize, SkeletonizeParameters};
    use tl_tree::{ExtractorParameters, downsample, extract_component_tree, prune};
    use tl_volume::{GraphVolume, ImageStack};

    #[test]
    fn image_to_pruned_tree_pipeline() {
        // concentric intensity rings give a nested tree
        let size = 16usize;
        let mut image = Image::new_fill(size, size, 0.0f32);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - 7.5;
                let dy = y as f32 - 7.5;
                let r = (dx * dx + dy * dy).sqrt();
                image.set_pixel(x, y, r / 11.0);
            }
        }

        let tree = extract_component_tree::<u8>(&image, &ExtractorParameters::default())
            .expect("extraction succeeds");
        assert!(tree.count() > 3);

        let root = tree.root().expect("tree has a root");
        assert_eq!(tree.node(root).component.size(), size * size);

        let pruned = prune(&tree, 2);
        let collapsed = downsample(&pruned);
        assert!(collapsed.count() <= pruned.count());

        // the root survives both transformations
        let collapsed_root = collapsed.root().expect("tree has a root");
        assert_eq!(
            collapsed.node(collapsed_root).component.size(),
            size * size
        );
    }

    #[test]
    fn stack_to_skeleton_pipeline() {
        // an L-shaped run of sections
        let mut stack = ImageStack::new(Point3f::splat(1.0), Point3f::default());
        for z in 0..8 {
            let mut section = Image::new_fill(8, 8, 0.0f32);
            section.set_pixel(1, 1, 1.0);
            if z == 7 {
                for x in 1..7 {
                    section.set_pixel(x, 1, 1.0);
                }
            }
            stack.add(Arc::new(section)).expect("matching section");
        }

        let binary = stack.binarize(0.5);
        let graph = GraphVolume::from_volume(&binary);
        assert_eq!(graph.node_count(), 8 + 5);

        let parameters = SkeletonizeParameters {
            min_segment_length_ratio: 0.0,
            ..SkeletonizeParameters::default()
        };
        let skeleton = Skeletonize::new(&graph, parameters)
            .extract()
            .expect("object has boundary nodes");

        // a tree over every voxel of the L
        assert_eq!(skeleton.node_count(), graph.node_count());
        assert_eq!(skeleton.edge_count(), skeleton.node_count() - 1);
    }
}
