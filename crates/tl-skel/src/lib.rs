//! Tree-structured skeletons of 3D binary objects.
//!
//! [`Skeletonize`] extracts a skeleton from a
//! [`GraphVolume`](tl_volume::GraphVolume) by repeatedly tracing the
//! shortest path, under a boundary-distance-weighted metric, from a root to
//! the furthest unexplained boundary voxel. The result is a [`Skeleton`]: a
//! tree graph with world-space node positions and per-node diameters.

mod distance;
mod skeleton;
mod skeletonize;
mod skeletons;

pub use distance::{squared_distance_transform_2d, squared_distance_transform_3d};
pub use skeleton::Skeleton;
pub use skeletonize::{Skeletonize, SkeletonizeParameters};
pub use skeletons::Skeletons;
