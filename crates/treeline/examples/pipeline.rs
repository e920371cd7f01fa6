//! Example: both extraction pipelines on synthetic inputs.
//!
//! Builds a blobby test image, extracts and prunes its component tree, then
//! voxelizes a bent tube and extracts its skeleton. Statistics are printed
//! to stdout.
//!
//! Run from the workspace root:
//!   cargo run -p treeline --example pipeline

use std::sync::Arc;

use anyhow::Result;
use treeline::{
    ExtractorParameters, GraphVolume, Image, ImageStack, Point3f, Skeletonize,
    SkeletonizeParameters, downsample, extract_component_tree, prune,
};

fn blobby_image(size: usize) -> Image<f32> {
    let mut image = Image::new_fill(size, size, 0.0f32);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / size as f32;
            let fy = y as f32 / size as f32;
            let v = (fx * 19.0).sin() * (fy * 13.0).cos() + (fx * 3.0 + fy * 5.0).sin();
            image.set_pixel(x, y, v);
        }
    }
    image
}

fn tube_stack(size: usize) -> ImageStack {
    let mut stack = ImageStack::new(Point3f::new(1.0, 1.0, 2.0), Point3f::default());
    for z in 0..size / 2 {
        let mut section = Image::new_fill(size, size, 0.0f32);
        let cx = 4 + z * (size - 8) / (size / 2);
        for dy in 0..4 {
            for dx in 0..4 {
                section.set_pixel(cx + dx, size / 2 + dy, 1.0);
            }
        }
        stack
            .add(Arc::new(section))
            .expect("sections share one size");
    }
    stack
}

fn main() -> Result<()> {
    // component tree pipeline
    let image = blobby_image(128);
    let parameters = ExtractorParameters {
        min_size: 8,
        ..ExtractorParameters::default()
    };
    let tree = extract_component_tree::<u8>(&image, &parameters)?;
    println!("component tree: {} nodes", tree.count());

    let pruned = prune(&tree, 8);
    println!("pruned to height 8: {} nodes", pruned.count());

    let collapsed = downsample(&pruned);
    println!("unary chains collapsed: {} nodes", collapsed.count());

    // skeleton pipeline
    let stack = tube_stack(64);
    let binary = stack.binarize(0.5);
    let graph = GraphVolume::from_volume(&binary);
    println!(
        "tube graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let skeleton = Skeletonize::new(&graph, SkeletonizeParameters::default()).extract()?;
    println!(
        "skeleton: {} nodes, {} edges",
        skeleton.node_count(),
        skeleton.edge_count()
    );

    for node in 0..skeleton.node_count().min(5) {
        let p = skeleton.position(node);
        println!(
            "  node {node}: ({:.1}, {:.1}, {:.1}) diameter {:.2}",
            p.x,
            p.y,
            p.z,
            skeleton.diameter(node)
        );
    }

    Ok(())
}
