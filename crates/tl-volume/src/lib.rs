//! 3D volumes with world-space placement.
//!
//! An [`ExplicitVolume`] is a dense voxel array with a per-axis resolution
//! (world units per voxel) and a world-space offset; its float bounding box
//! is always the discrete box scaled by the resolution plus the offset. An
//! [`ImageStack`] is an ordered run of equally-sized 2D sections with the
//! same placement information. A [`GraphVolume`] materializes the non-zero
//! voxels of a volume as an undirected graph over the 26-neighborhood,
//! which is the input representation for skeleton extraction.

mod explicit;
mod graph;
mod intersect;
mod stack;

pub use explicit::{ExplicitVolume, VolumeSlice};
pub use graph::{EdgeId, GraphVolume, NUM_NEIGHBORS, NodeId};
pub use intersect::intersect;
pub use stack::ImageStack;
