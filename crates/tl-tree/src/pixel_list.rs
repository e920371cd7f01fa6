use std::cell::Cell;

use tl_core::{Error, Pixel};

/// An append-only list of pixel locations with a capacity fixed at
/// construction.
///
/// Adding pixels never reallocates, so index ranges handed out by
/// [`len`](PixelList::len) markers stay valid until [`clear`](PixelList::clear).
/// Appends work through a shared reference, allowing the list to be shared
/// between a running parser and the components it has already emitted.
pub struct PixelList {
    slots: Box<[Cell<Pixel>]>,
    len: Cell<usize>,
}

impl PixelList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Cell::new(Pixel::default()); capacity].into_boxed_slice(),
            len: Cell::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    /// Appends a pixel. Fails once the capacity is reached.
    pub fn add(&self, pixel: Pixel) -> Result<usize, Error> {
        let index = self.len.get();
        let Some(slot) = self.slots.get(index) else {
            return Err(Error::CapacityExceeded {
                capacity: self.slots.len(),
            });
        };
        slot.set(pixel);
        self.len.set(index + 1);
        Ok(index)
    }

    /// Resets the logical size to zero. The capacity is unchanged.
    pub fn clear(&self) {
        self.len.set(0);
    }

    pub fn get(&self, index: usize) -> Pixel {
        assert!(index < self.len.get(), "pixel index out of bounds");
        self.slots[index].get()
    }

    /// Iterates the pixels in `[begin, end)`.
    pub fn range(&self, begin: usize, end: usize) -> impl Iterator<Item = Pixel> + '_ {
        assert!(begin <= end && end <= self.len.get(), "invalid pixel range");
        self.slots[begin..end].iter().map(Cell::get)
    }
}

impl std::fmt::Debug for PixelList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelList")
            .field("len", &self.len.get())
            .field("capacity", &self.slots.len())
            .finish()
    }
}
