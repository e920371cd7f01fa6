//! Foundational primitives for component-tree and skeleton extraction.
//!
//! ## Coordinate Conventions
//! 2D pixel coordinates are non-negative integers with `(0, 0)` in the top
//! left corner and x growing to the right. 3D voxel coordinates follow the
//! same convention with z growing across sections.
//!
//! ## Boxes
//! All boxes are half-open axis-aligned regions `[min, max)`. An empty box
//! (any `max <= min`) is absorbing for intersection and neutral for `fit`.
//!
//! ## World Units
//! Discrete structures carry a per-axis resolution (world units per voxel)
//! and a world-space offset. Real-valued bounding boxes are always the
//! discrete box scaled by the resolution plus the offset.

mod error;
mod geom;
mod image;

pub use error::Error;
pub use geom::{Box2f, Box2i, Box3f, Box3i, Pixel, Point3f, Point3i};
pub use image::Image;
