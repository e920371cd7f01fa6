use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use tl_core::Box3f;

use crate::Skeleton;

/// An indexed set of skeletons with display colors, remembering insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct Skeletons {
    skeletons: HashMap<u64, Arc<Skeleton>>,
    colors: HashMap<u64, u64>,
    ids: Vec<u64>,
    bounding_box: Cell<Option<Box3f>>,
}

impl Skeletons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a skeleton under an id. Without an explicit color the id itself
    /// is used. Re-adding an id replaces the skeleton and keeps the
    /// original insertion position.
    pub fn add(&mut self, id: u64, skeleton: Arc<Skeleton>, color: Option<u64>) {
        if self.skeletons.insert(id, skeleton).is_none() {
            self.ids.push(id);
        }
        self.colors.insert(id, color.unwrap_or(id));
        self.bounding_box.set(None);
    }

    pub fn remove(&mut self, id: u64) {
        if self.skeletons.remove(&id).is_none() {
            return;
        }
        self.colors.remove(&id);
        self.ids.retain(|&existing| existing != id);
        self.bounding_box.set(None);
    }

    pub fn get(&self, id: u64) -> Option<&Arc<Skeleton>> {
        self.skeletons.get(&id)
    }

    pub fn color(&self, id: u64) -> Option<u64> {
        self.colors.get(&id).copied()
    }

    /// The ids in insertion order.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn contains(&self, id: u64) -> bool {
        self.skeletons.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.skeletons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skeletons.is_empty()
    }

    pub fn clear(&mut self) {
        self.skeletons.clear();
        self.colors.clear();
        self.ids.clear();
        self.bounding_box.set(None);
    }

    /// The union of the contained skeleton boxes, cached.
    pub fn bounding_box(&self) -> Box3f {
        if let Some(cached) = self.bounding_box.get() {
            return cached;
        }

        let mut bb = Box3f::default();
        for skeleton in self.skeletons.values() {
            bb.fit(skeleton.bounding_box());
        }
        self.bounding_box.set(Some(bb));
        bb
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tl_core::Point3f;

    use super::Skeletons;
    use crate::Skeleton;

    fn skeleton_at(x: f32) -> Arc<Skeleton> {
        let mut s = Skeleton::new(Point3f::splat(1.0), Point3f::default());
        s.open_segment(Point3f::new(x, 0.0, 0.0), 1.0);
        Arc::new(s)
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut set = Skeletons::new();
        set.add(7, skeleton_at(0.0), None);
        set.add(3, skeleton_at(1.0), Some(42));
        set.add(9, skeleton_at(2.0), None);

        assert_eq!(set.ids(), &[7, 3, 9]);
        assert_eq!(set.color(7), Some(7));
        assert_eq!(set.color(3), Some(42));

        set.remove(3);
        assert_eq!(set.ids(), &[7, 9]);
        assert!(!set.contains(3));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn bounding_box_unions_members() {
        let mut set = Skeletons::new();
        set.add(1, skeleton_at(0.0), None);
        set.add(2, skeleton_at(9.0), None);

        let bb = set.bounding_box();
        assert_eq!(bb.min.x, 0.0);
        assert_eq!(bb.max.x, 10.0);

        set.remove(2);
        assert_eq!(set.bounding_box().max.x, 1.0);
    }

    #[test]
    fn missing_ids_are_absent() {
        let mut set = Skeletons::new();
        assert!(set.get(5).is_none());
        set.remove(5);
        assert!(set.is_empty());
    }
}
