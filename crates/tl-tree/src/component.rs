use std::cell::OnceCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tl_core::{Box2i, Error, Pixel};

use crate::PixelList;

/// A connected set of pixels, found at a certain intensity threshold.
///
/// Components are immutable views of a range inside a pixel list that is
/// usually shared with other components of the same parse. The bounding box
/// and center are computed on construction; the membership bitmap of the
/// bounding box is built on first use.
pub struct ConnectedComponent {
    pixels: Arc<PixelList>,
    begin: usize,
    end: usize,
    value: f32,
    bounding_box: Box2i,
    center: (f32, f32),
    bitmap: OnceCell<Box<[bool]>>,
}

impl ConnectedComponent {
    pub fn new(pixels: Arc<PixelList>, begin: usize, end: usize, value: f32) -> Self {
        let mut bounding_box = Box2i::default();
        let mut sum = (0.0f64, 0.0f64);
        for p in pixels.range(begin, end) {
            bounding_box.fit(Box2i::from_pixel(p));
            sum.0 += p.x as f64;
            sum.1 += p.y as f64;
        }

        let size = end - begin;
        let center = if size == 0 {
            (0.0, 0.0)
        } else {
            ((sum.0 / size as f64) as f32, (sum.1 / size as f64) as f32)
        };

        Self {
            pixels,
            begin,
            end,
            value,
            bounding_box,
            center,
            bitmap: OnceCell::new(),
        }
    }

    /// The original-domain threshold intensity at which this component was
    /// finalized.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn size(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// The index range of this component in the shared pixel list.
    pub fn range(&self) -> (usize, usize) {
        (self.begin, self.end)
    }

    pub fn pixel_list(&self) -> &Arc<PixelList> {
        &self.pixels
    }

    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.pixels.range(self.begin, self.end)
    }

    pub fn bounding_box(&self) -> Box2i {
        self.bounding_box
    }

    /// The mean pixel location.
    pub fn center(&self) -> (f32, f32) {
        self.center
    }

    /// A row-major map of the bounding box with `true` at every member
    /// pixel. Empty for an empty component.
    pub fn bitmap(&self) -> &[bool] {
        self.bitmap.get_or_init(|| {
            let width = self.bounding_box.width().max(0) as usize;
            let height = self.bounding_box.height().max(0) as usize;
            let mut map = vec![false; width * height].into_boxed_slice();
            for p in self.pixels() {
                let x = (p.x as i64 - self.bounding_box.min_x) as usize;
                let y = (p.y as i64 - self.bounding_box.min_y) as usize;
                map[y * width + x] = true;
            }
            map
        })
    }

    /// Membership test in absolute coordinates.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        if !self.bounding_box.contains(x, y) {
            return false;
        }
        let width = self.bounding_box.width() as usize;
        let bx = (x - self.bounding_box.min_x) as usize;
        let by = (y - self.bounding_box.min_y) as usize;
        self.bitmap()[by * width + bx]
    }

    /// A new component shifted by `(dx, dy)`, backed by its own pixel list.
    pub fn translate(&self, dx: i64, dy: i64) -> Result<ConnectedComponent, Error> {
        let list = Arc::new(PixelList::with_capacity(self.size()));
        for p in self.pixels() {
            let x = p.x as i64 + dx;
            let y = p.y as i64 + dy;
            if x < 0 || y < 0 {
                return Err(Error::InvalidInput(format!(
                    "translation by ({dx}, {dy}) moves pixel ({}, {}) out of the image domain",
                    p.x, p.y
                )));
            }
            list.add(Pixel::new(x as u32, y as u32))
                .expect("list sized to the component");
        }
        let size = list.len();
        Ok(ConnectedComponent::new(list, 0, size, self.value))
    }

    /// The component of pixels common to `self` and `other`. May be empty.
    pub fn intersect(&self, other: &ConnectedComponent) -> ConnectedComponent {
        let common: Vec<Pixel> = other
            .pixels()
            .filter(|p| self.contains(p.x as i64, p.y as i64))
            .collect();

        let list = Arc::new(PixelList::with_capacity(common.len()));
        for p in common {
            list.add(p).expect("list sized to the intersection");
        }
        let size = list.len();
        ConnectedComponent::new(list, 0, size, self.value)
    }

    pub fn intersects(&self, other: &ConnectedComponent) -> bool {
        if !self.bounding_box.intersects(&other.bounding_box) {
            return false;
        }
        other
            .pixels()
            .any(|p| self.contains(p.x as i64, p.y as i64))
    }

    /// A hash over the member pixels that is stable across isomorphic
    /// components, regardless of the order of the underlying pixel range.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let width = self.bounding_box.width().max(0) as usize;
        let height = self.bounding_box.height().max(0) as usize;
        let bitmap = self.bitmap();
        for x in 0..width {
            for y in 0..height {
                if bitmap[y * width + x] {
                    (x as i64 + self.bounding_box.min_x).hash(&mut hasher);
                    (y as i64 + self.bounding_box.min_y).hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }
}

/// Equality by geometry: coinciding bounding boxes and mutual containment of
/// all pixels.
impl PartialEq for ConnectedComponent {
    fn eq(&self, other: &Self) -> bool {
        if self.bounding_box != other.bounding_box {
            return false;
        }
        self.pixels()
            .all(|p| other.contains(p.x as i64, p.y as i64))
            && other
                .pixels()
                .all(|p| self.contains(p.x as i64, p.y as i64))
    }
}

impl std::fmt::Debug for ConnectedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectedComponent")
            .field("value", &self.value)
            .field("size", &self.size())
            .field("bounding_box", &self.bounding_box)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tl_core::{Box2i, Pixel};

    use super::ConnectedComponent;
    use crate::PixelList;

    fn component(pixels: &[(u32, u32)], value: f32) -> ConnectedComponent {
        let list = Arc::new(PixelList::with_capacity(pixels.len()));
        for &(x, y) in pixels {
            list.add(Pixel::new(x, y)).expect("within capacity");
        }
        let size = list.len();
        ConnectedComponent::new(list, 0, size, value)
    }

    #[test]
    fn bounding_box_and_center() {
        let c = component(&[(1, 1), (2, 1), (1, 2)], 0.5);
        assert_eq!(c.bounding_box(), Box2i::new(1, 1, 3, 3));
        assert_eq!(c.size(), 3);

        let (cx, cy) = c.center();
        assert!((cx - 4.0 / 3.0).abs() < 1e-6);
        assert!((cy - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn bitmap_marks_member_pixels_only() {
        let c = component(&[(1, 1), (2, 2)], 0.0);
        assert!(c.contains(1, 1));
        assert!(c.contains(2, 2));
        assert!(!c.contains(2, 1));
        assert!(!c.contains(0, 0));
    }

    #[test]
    fn equality_is_geometric() {
        let a = component(&[(0, 0), (1, 0)], 0.1);
        let b = component(&[(1, 0), (0, 0)], 0.9);
        let c = component(&[(0, 0), (1, 1)], 0.1);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn content_hash_stable_across_pixel_order() {
        let a = component(&[(3, 4), (4, 4), (3, 5)], 0.2);
        let b = component(&[(3, 5), (3, 4), (4, 4)], 0.7);
        assert_eq!(a.content_hash(), b.content_hash());

        let c = component(&[(3, 4), (4, 4), (4, 5)], 0.2);
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn translate_shifts_all_pixels() {
        let c = component(&[(1, 1), (2, 1)], 0.3);
        let t = c.translate(2, 3).expect("positive translation");
        assert_eq!(t.bounding_box(), Box2i::new(3, 4, 5, 5));
        assert_eq!(t.size(), 2);
        assert!((t.value() - 0.3).abs() < f32::EPSILON);

        assert!(c.translate(-2, 0).is_err());
    }

    #[test]
    fn intersect_collects_common_pixels() {
        let a = component(&[(0, 0), (1, 0), (1, 1)], 0.5);
        let b = component(&[(1, 0), (1, 1), (2, 1)], 0.5);

        let i = a.intersect(&b);
        assert_eq!(i.size(), 2);
        assert!(i.contains(1, 0));
        assert!(i.contains(1, 1));
        assert!(a.intersects(&b));

        let far = component(&[(9, 9)], 0.5);
        assert!(!a.intersects(&far));
        assert!(a.intersect(&far).is_empty());
    }
}
