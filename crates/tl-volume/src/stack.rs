use std::sync::Arc;

use tl_core::{Box3f, Error, Image, Point3f};

use crate::ExplicitVolume;

/// An ordered stack of equally-sized 2D float sections with a common
/// resolution and world offset. The depth of the stack is the number of
/// sections.
#[derive(Debug, Clone)]
pub struct ImageStack {
    sections: Vec<Arc<Image<f32>>>,
    resolution: Point3f,
    offset: Point3f,
}

impl Default for ImageStack {
    fn default() -> Self {
        Self::new(Point3f::splat(1.0), Point3f::default())
    }
}

impl ImageStack {
    pub fn new(resolution: Point3f, offset: Point3f) -> Self {
        Self {
            sections: Vec::new(),
            resolution,
            offset,
        }
    }

    /// Appends a section. All sections of a stack have the same size.
    pub fn add(&mut self, section: Arc<Image<f32>>) -> Result<(), Error> {
        if let Some(first) = self.sections.first()
            && (first.width() != section.width() || first.height() != section.height())
        {
            return Err(Error::InvalidInput(format!(
                "section size {}x{} does not match the stack size {}x{}",
                section.width(),
                section.height(),
                first.width(),
                first.height()
            )));
        }
        self.sections.push(section);
        Ok(())
    }

    /// Appends all sections of another stack.
    pub fn add_all(&mut self, other: &ImageStack) -> Result<(), Error> {
        for section in &other.sections {
            self.add(section.clone())?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    pub fn width(&self) -> usize {
        self.sections.first().map_or(0, |s| s.width())
    }

    pub fn height(&self) -> usize {
        self.sections.first().map_or(0, |s| s.height())
    }

    pub fn depth(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, i: usize) -> &Arc<Image<f32>> {
        &self.sections[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Image<f32>>> {
        self.sections.iter()
    }

    pub fn resolution(&self) -> Point3f {
        self.resolution
    }

    pub fn offset(&self) -> Point3f {
        self.offset
    }

    pub fn bounding_box(&self) -> Box3f {
        Box3f::new(
            self.offset,
            self.offset
                + Point3f::new(
                    self.width() as f32,
                    self.height() as f32,
                    self.depth() as f32,
                ) * self.resolution,
        )
    }

    /// Materializes the stack as a dense volume with the same placement.
    pub fn to_volume(&self) -> ExplicitVolume<f32> {
        let mut volume = ExplicitVolume::new(self.width(), self.height(), self.depth());
        volume.set_resolution(self.resolution);
        volume.set_offset(self.offset);

        for (z, section) in self.sections.iter().enumerate() {
            for y in 0..section.height() {
                for x in 0..section.width() {
                    volume.set_value(x, y, z, section.pixel(x, y));
                }
            }
        }

        volume
    }

    /// A binary volume with 1 at every voxel whose value exceeds the
    /// threshold.
    pub fn binarize(&self, threshold: f32) -> ExplicitVolume<u8> {
        let mut volume = ExplicitVolume::new(self.width(), self.height(), self.depth());
        volume.set_resolution(self.resolution);
        volume.set_offset(self.offset);

        for (z, section) in self.sections.iter().enumerate() {
            for y in 0..section.height() {
                for x in 0..section.width() {
                    if section.pixel(x, y) > threshold {
                        volume.set_value(x, y, z, 1);
                    }
                }
            }
        }

        volume
    }
}
