use std::cell::Cell;

use tl_core::{Box3f, Box3i, Image, Point3f, Point3i};

/// A z-plane of a volume, with the plane's world placement.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSlice<T> {
    pub image: Image<T>,
    pub resolution: Point3f,
    pub offset: Point3f,
}

/// A dense 3D voxel array with world-space resolution and offset.
///
/// Voxels are stored row-major with x fastest. The float bounding box is
/// computed lazily from the discrete shape and cached until the volume is
/// resized, transposed or re-placed.
#[derive(Debug, Clone)]
pub struct ExplicitVolume<T> {
    width: usize,
    height: usize,
    depth: usize,
    data: Vec<T>,
    resolution: Point3f,
    offset: Point3f,
    bounding_box: Cell<Option<Box3f>>,
}

impl<T: Copy + Default> Default for ExplicitVolume<T> {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl<T: Copy + Default> ExplicitVolume<T> {
    /// A zero-initialized volume with unit resolution.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self::new_fill(width, height, depth, T::default())
    }

    pub fn new_fill(width: usize, height: usize, depth: usize, value: T) -> Self {
        Self {
            width,
            height,
            depth,
            data: vec![value; width * height * depth],
            resolution: Point3f::splat(1.0),
            offset: Point3f::default(),
            bounding_box: Cell::new(None),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn resolution(&self) -> Point3f {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Point3f) {
        self.resolution = resolution;
        self.bounding_box.set(None);
    }

    pub fn offset(&self) -> Point3f {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Point3f) {
        self.offset = offset;
        self.bounding_box.set(None);
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    pub fn value(&self, x: usize, y: usize, z: usize) -> T {
        assert!(
            x < self.width && y < self.height && z < self.depth,
            "voxel out of bounds"
        );
        self.data[self.index(x, y, z)]
    }

    pub fn set_value(&mut self, x: usize, y: usize, z: usize, value: T) {
        assert!(
            x < self.width && y < self.height && z < self.depth,
            "voxel out of bounds"
        );
        let index = self.index(x, y, z);
        self.data[index] = value;
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<T> {
        if x >= self.width || y >= self.height || z >= self.depth {
            return None;
        }
        Some(self.data[self.index(x, y, z)])
    }

    /// The discrete shape as a zero-based box.
    pub fn discrete_bounding_box(&self) -> Box3i {
        Box3i::new(
            [0, 0, 0],
            [self.width as i64, self.height as i64, self.depth as i64],
        )
    }

    /// The world-space bounding box: the discrete box scaled by the
    /// resolution, shifted by the offset. Cached until the volume changes.
    pub fn bounding_box(&self) -> Box3f {
        if let Some(cached) = self.bounding_box.get() {
            return cached;
        }

        let dbb = self.discrete_bounding_box().to_f32();
        let bb = Box3f::new(
            dbb.min * self.resolution + self.offset,
            dbb.max * self.resolution + self.offset,
        );
        self.bounding_box.set(Some(bb));
        bb
    }

    /// Transforms a world location into discrete voxel coordinates.
    pub fn world_to_discrete(&self, p: Point3f) -> Point3i {
        let local = p - self.offset;
        Point3i::new(
            (local.x / self.resolution.x).floor().max(0.0) as u32,
            (local.y / self.resolution.y).floor().max(0.0) as u32,
            (local.z / self.resolution.z).floor().max(0.0) as u32,
        )
    }

    /// Transforms discrete voxel coordinates into a world location.
    pub fn discrete_to_world(&self, p: Point3i) -> Point3f {
        p.to_f32() * self.resolution + self.offset
    }

    /// Resizes the volume and re-initializes all voxels with zeros.
    pub fn resize(&mut self, width: usize, height: usize, depth: usize) {
        self.width = width;
        self.height = height;
        self.depth = depth;
        self.data.clear();
        self.data.resize(width * height * depth, T::default());
        self.bounding_box.set(None);
    }

    /// The z-plane as a 2D image, with the plane's world offset applied.
    pub fn slice(&self, z: usize) -> VolumeSlice<T> {
        assert!(z < self.depth, "slice out of bounds");

        let start = self.index(0, 0, z);
        let plane = self.data[start..start + self.width * self.height].to_vec();
        let image = Image::from_vec(self.width, self.height, plane)
            .expect("plane matches the volume shape");

        VolumeSlice {
            image,
            resolution: self.resolution,
            offset: Point3f::new(
                self.offset.x,
                self.offset.y,
                self.offset.z + z as f32 * self.resolution.z,
            ),
        }
    }

    /// Reverses the order of the axes, swapping resolution and offset
    /// accordingly.
    pub fn transpose(&mut self) {
        let mut data = vec![T::default(); self.data.len()];
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    let flipped = (x * self.height + y) * self.depth + z;
                    data[flipped] = self.data[self.index(x, y, z)];
                }
            }
        }

        self.data = data;
        std::mem::swap(&mut self.width, &mut self.depth);
        self.resolution = Point3f::new(self.resolution.z, self.resolution.y, self.resolution.x);
        self.offset = Point3f::new(self.offset.z, self.offset.y, self.offset.x);
        self.bounding_box.set(None);
    }

    /// Extracts the sub-volume covered by the intersection of `bounding_box`
    /// with this volume's box into `target`. An empty intersection leaves an
    /// empty target; this is not an error.
    pub fn cut(&self, bounding_box: &Box3f, target: &mut ExplicitVolume<T>) {
        let intersection = bounding_box.intersection(&self.bounding_box());

        if intersection.is_empty() {
            *target = ExplicitVolume::default();
            return;
        }

        // the discrete placement of the requested region in this volume
        let local = intersection.min - self.bounding_box().min;
        let begin = [
            (local.x / self.resolution.x).floor() as usize,
            (local.y / self.resolution.y).floor() as usize,
            (local.z / self.resolution.z).floor() as usize,
        ];
        let size = [
            ((intersection.width() / self.resolution.x).ceil() as usize)
                .min(self.width - begin[0]),
            ((intersection.height() / self.resolution.y).ceil() as usize)
                .min(self.height - begin[1]),
            ((intersection.depth() / self.resolution.z).ceil() as usize)
                .min(self.depth - begin[2]),
        ];

        target.resize(size[0], size[1], size[2]);
        target.set_resolution(self.resolution);
        target.set_offset(
            self.offset
                + Point3f::new(begin[0] as f32, begin[1] as f32, begin[2] as f32)
                    * self.resolution,
        );

        for z in 0..size[2] {
            for y in 0..size[1] {
                for x in 0..size[0] {
                    target.set_value(
                        x,
                        y,
                        z,
                        self.value(begin[0] + x, begin[1] + y, begin[2] + z),
                    );
                }
            }
        }
    }
}

impl ExplicitVolume<f32> {
    /// Rescales all values into `[0, 1]`: a negative minimum is shifted to
    /// zero first; a maximum in `(1, 255]` divides by 255, any larger
    /// maximum divides by itself.
    pub fn normalize(&mut self) {
        if self.data.is_empty() {
            return;
        }

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in &self.data {
            min = min.min(v);
            max = max.max(v);
        }

        let shift = if min < 0.0 { -min } else { 0.0 };
        let mut max = max + shift;
        if shift == 0.0 && max > 1.0 && max <= 255.0 {
            max = 255.0;
        }

        if shift != 0.0 || max != 1.0 {
            let scale = if max == 0.0 { 1.0 } else { 1.0 / max };
            for v in &mut self.data {
                *v = (*v + shift) * scale;
            }
        }
    }
}
