use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tl_core::{Error, Image, Pixel};
use tracing::warn;

use crate::PixelList;

/// Discretization precision of the level parser. The number of thresholds
/// applied is `MAX_LEVEL + 1`.
pub trait Precision: Copy {
    const MAX_LEVEL: u32;

    fn from_level(level: u32) -> Self;
    fn level(self) -> u32;
}

impl Precision for u8 {
    const MAX_LEVEL: u32 = u8::MAX as u32;

    fn from_level(level: u32) -> Self {
        level as u8
    }

    fn level(self) -> u32 {
        self as u32
    }
}

impl Precision for u16 {
    const MAX_LEVEL: u32 = u16::MAX as u32;

    fn from_level(level: u32) -> Self {
        level as u16
    }

    fn level(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserParameters {
    /// Start processing the dark regions.
    pub dark_to_bright: bool,

    /// The min and max intensity of the image, used for discretization into
    /// the precision type. The default is 0 for both, in which case the
    /// image is inspected to find them. Set them to avoid the inspection or
    /// to make component values comparable across images with different
    /// intensity extrema.
    pub min_intensity: f32,
    pub max_intensity: f32,

    /// Treat the image as a spaced edge image: scaled by a factor of 2 in
    /// each dimension, with the original value of pixel (x,y) at (2x,2y)
    /// and odd locations indicating edges. Reported pixel ranges then refer
    /// to a condensed list storing each even location (2x,2y) as (x,y).
    pub spaced_edge_image: bool,
}

impl Default for ParserParameters {
    fn default() -> Self {
        Self {
            dark_to_bright: true,
            min_intensity: 0.0,
            max_intensity: 0.0,
            spaced_edge_image: false,
        }
    }
}

/// Callbacks invoked by [`ImageLevelParser::parse`].
///
/// `finalize_component` is invoked once per connected component and
/// threshold, following a weak ordering by the subset relation: every
/// component is finalized only after all components it contains.
pub trait ParseVisitor {
    /// Receives the list that all reported pixel ranges refer to. Called
    /// once, before any other callback.
    fn set_pixel_list(&mut self, _list: Arc<PixelList>) {}

    /// The parser descends one level: a new component opens at `value` as a
    /// child of the current one.
    fn new_child_component(&mut self, _value: f32) {}

    /// The current component is complete. `[begin, end)` indexes the shared
    /// pixel list; `value` is the original-domain threshold intensity.
    fn finalize_component(&mut self, value: f32, begin: usize, end: usize);
}

const RIGHT: u8 = 0;
const DOWN: u8 = 1;
const LEFT: u8 = 2;
const UP: u8 = 3;

/// Resolves the discretization bounds for an image: explicit parameters
/// win, otherwise the image is scanned; a degenerate range is replaced by
/// `(0, 1)`.
pub(crate) fn intensity_bounds(
    image: &Image<f32>,
    parameters: &ParserParameters,
) -> Result<(f32, f32), Error> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::InvalidInput("cannot parse an empty image".into()));
    }

    let explicit_range = !(parameters.min_intensity == 0.0 && parameters.max_intensity == 0.0);
    if explicit_range && parameters.min_intensity > parameters.max_intensity {
        return Err(Error::InvalidInput(format!(
            "min intensity {} exceeds max intensity {}",
            parameters.min_intensity, parameters.max_intensity
        )));
    }

    let (mut min, mut max) = if explicit_range {
        (parameters.min_intensity, parameters.max_intensity)
    } else {
        image.min_max().expect("image is non-empty")
    };

    // in case the whole image has the same intensity
    if max - min == 0.0 {
        min = 0.0;
        max = 1.0;
    }

    Ok((min, max))
}

/// Discretizes one value into the level range of `P`.
pub(crate) fn discretize_value<P: Precision>(
    value: f32,
    min: f32,
    max: f32,
    dark_to_bright: bool,
) -> u32 {
    let max_level = P::MAX_LEVEL as f32;
    let normalized = ((value - min) / (max - min)) * max_level;
    let level = if dark_to_bright {
        normalized
    } else {
        max_level - normalized
    };
    level.round().clamp(0.0, max_level) as u32
}

/// Parses the pixels of an image in terms of the connected components of
/// varying intensity thresholds, in linear time.
///
/// The input is discretized into the range of `P`, and every threshold in
/// that range is applied. The main loop alternates between flood-filling the
/// current level and ascending to the lowest open boundary level; descending
/// into lower levels is handled with an explicit stack of fill frames, so
/// arbitrarily deep level nestings cannot overflow the host stack.
pub struct ImageLevelParser<P: Precision> {
    levels: Vec<P>,
    width: u32,
    height: u32,

    // min and max value of the original image
    min: f32,
    max: f32,

    parameters: ParserParameters,

    visited: Vec<bool>,

    // the pixel list, shared with visitors
    pixel_list: Arc<PixelList>,

    // a separate pixel list to transparently handle spaced edge images
    condensed: Option<Arc<PixelList>>,

    // per-level stacks of open boundary locations
    boundary: Vec<Vec<Pixel>>,

    // stacks of (level, begin marker) for every open component
    component_begins: Vec<(u32, usize)>,
    condensed_begins: Vec<(u32, usize)>,

    current_pos: Pixel,
    current_level: u32, // up to MAX_LEVEL + 1
}

#[derive(Clone, Copy)]
struct FillFrame {
    /// The level this frame fills.
    target: u32,
    /// Next neighbor direction to inspect.
    next_dir: u8,
    /// Position to restore once all lower levels are drained.
    resume: Option<Pixel>,
}

impl<P: Precision> ImageLevelParser<P> {
    pub fn new(image: &Image<f32>, parameters: ParserParameters) -> Result<Self, Error> {
        let (min, max) = intensity_bounds(image, &parameters)?;

        if max - min > P::MAX_LEVEL as f32 {
            warn!(
                range = max - min,
                precision_max = P::MAX_LEVEL,
                "image intensity range does not fit into the parser precision, clamping"
            );
        }

        let width = image.width() as u32;
        let height = image.height() as u32;
        let num_pixels = image.len();

        let condensed = parameters.spaced_edge_image.then(|| {
            let even_pixels = image.width().div_ceil(2) * image.height().div_ceil(2);
            Arc::new(PixelList::with_capacity(even_pixels))
        });

        let mut parser = Self {
            levels: Vec::with_capacity(num_pixels),
            width,
            height,
            min,
            max,
            parameters,
            visited: vec![false; num_pixels],
            pixel_list: Arc::new(PixelList::with_capacity(num_pixels)),
            condensed,
            boundary: vec![Vec::new(); P::MAX_LEVEL as usize + 1],
            component_begins: Vec::new(),
            condensed_begins: Vec::new(),
            current_pos: Pixel::default(),
            current_level: P::MAX_LEVEL + 1,
        };
        parser.discretize(image);

        Ok(parser)
    }

    /// Parses the image, reporting every connected component of every
    /// threshold to the visitor.
    pub fn parse<V: ParseVisitor>(mut self, visitor: &mut V) {
        if let Some(condensed) = &self.condensed {
            visitor.set_pixel_list(condensed.clone());
        } else {
            visitor.set_pixel_list(self.pixel_list.clone());
        }

        // Pretend we come from one level above the maximum and go to the
        // initial pixel, so that one component per level in between opens.
        self.current_level = P::MAX_LEVEL + 1;
        self.goto_location(Pixel::new(0, 0), visitor);

        loop {
            self.fill_level(visitor);

            // go to the smallest level above the current one; when there is
            // none, all remaining components were closed and we are done
            if !self.goto_higher_level(visitor) {
                return;
            }
        }
    }

    /// The value range the parser discretized with.
    pub fn intensity_range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    fn discretize(&mut self, image: &Image<f32>) {
        for &v in image.data() {
            self.levels.push(P::from_level(discretize_value::<P>(
                v,
                self.min,
                self.max,
                self.parameters.dark_to_bright,
            )));
        }
    }

    /// The original value that corresponds to a discretized level.
    fn original_value(&self, level: u32) -> f32 {
        let range = self.max - self.min;
        let max_level = P::MAX_LEVEL as f32;

        if self.parameters.dark_to_bright {
            (level as f32 / max_level) * range + self.min
        } else {
            ((P::MAX_LEVEL - level) as f32 / max_level) * range + self.min
        }
    }

    fn index(&self, p: Pixel) -> usize {
        (p.y * self.width + p.x) as usize
    }

    fn level_at(&self, p: Pixel) -> u32 {
        self.levels[self.index(p)].level()
    }

    /// Moves to a new location, opening or closing one component per level
    /// in between, and records the location if it was not seen before.
    fn goto_location<V: ParseVisitor>(&mut self, location: Pixel, visitor: &mut V) {
        let new_level = self.level_at(location);

        if self.current_level > new_level {
            // begin a new component for each level that we descend
            for level in (new_level..self.current_level).rev() {
                self.begin_component(level, visitor);
            }
        } else if self.current_level < new_level {
            // close one component for each level that we ascend
            for level in self.current_level..new_level {
                self.end_component(level, visitor);
            }
        }

        self.current_pos = location;
        self.current_level = new_level;

        let index = self.index(location);
        if !self.visited[index] {
            self.visited[index] = true;

            if let Some(condensed) = &self.condensed
                && location.x % 2 == 0
                && location.y % 2 == 0
            {
                condensed
                    .add(location.halved())
                    .expect("condensed list sized to the even pixels");
            }

            self.pixel_list
                .add(location)
                .expect("pixel list sized to the image");
        }
    }

    /// Flood-fills the current level. Smaller neighbor levels are filled
    /// first via an explicit frame stack, equal and larger ones are pushed
    /// onto the boundary stacks for later.
    fn fill_level<V: ParseVisitor>(&mut self, visitor: &mut V) {
        let mut frames = vec![FillFrame {
            target: self.current_level,
            next_dir: 0,
            resume: None,
        }];

        'frames: while let Some(&frame) = frames.last() {
            let FillFrame {
                target,
                mut next_dir,
                resume,
            } = frame;

            // Returning from a nested fill: drain all remaining levels below
            // the target before restoring the saved position.
            if let Some(saved) = resume {
                if self.goto_lowest_level_below(target, visitor) {
                    frames.push(FillFrame {
                        target: self.current_level,
                        next_dir: 0,
                        resume: None,
                    });
                    continue 'frames;
                }
                self.goto_location(saved, visitor);
                frames.last_mut().expect("frame still open").resume = None;
            }

            while next_dir < 4 {
                let dir = next_dir;
                next_dir += 1;

                let Some((neighbor, level)) = self.find_neighbor(dir) else {
                    continue;
                };

                self.push_boundary(neighbor, level);

                if level < target {
                    // a smaller neighbor interrupts filling this level
                    let saved = self.current_pos;
                    if self.goto_lowest_level_below(target, visitor) {
                        let top = frames.last_mut().expect("frame still open");
                        top.next_dir = next_dir;
                        top.resume = Some(saved);
                        frames.push(FillFrame {
                            target: self.current_level,
                            next_dir: 0,
                            resume: None,
                        });
                        continue 'frames;
                    }
                }
            }
            frames.last_mut().expect("frame still open").next_dir = 4;

            // move on to the next unvisited boundary location of this level
            loop {
                let Some(location) = self.boundary[target as usize].pop() else {
                    frames.pop();
                    break;
                };
                if self.visited[self.index(location)] {
                    continue;
                }
                self.goto_location(location, visitor);
                frames.last_mut().expect("frame still open").next_dir = 0;
                break;
            }
        }
    }

    /// Moves to the lowest unvisited boundary location above the current
    /// level, closing one component per level in between. When no such
    /// location exists, all remaining open components are closed and `false`
    /// is returned.
    fn goto_higher_level<V: ParseVisitor>(&mut self, visitor: &mut V) -> bool {
        loop {
            let Some(location) = self.pop_boundary_above(self.current_level) else {
                for level in self.current_level..=P::MAX_LEVEL {
                    self.end_component(level, visitor);
                }
                return false;
            };
            if !self.visited[self.index(location)] {
                self.goto_location(location, visitor);
                return true;
            }
        }
    }

    /// Moves to the lowest unvisited boundary location strictly below the
    /// reference level, opening one component per level descended. Returns
    /// false if there is none.
    fn goto_lowest_level_below<V: ParseVisitor>(
        &mut self,
        reference: u32,
        visitor: &mut V,
    ) -> bool {
        loop {
            let Some(location) = self.pop_boundary_below(reference) else {
                return false;
            };
            if !self.visited[self.index(location)] {
                self.goto_location(location, visitor);
                return true;
            }
        }
    }

    fn push_boundary(&mut self, location: Pixel, level: u32) {
        self.boundary[level as usize].push(location);
    }

    /// Pops the lowest open boundary location with a level below `reference`.
    fn pop_boundary_below(&mut self, reference: u32) -> Option<Pixel> {
        for level in 0..reference.min(P::MAX_LEVEL + 1) {
            if let Some(location) = self.boundary[level as usize].pop() {
                return Some(location);
            }
        }
        None
    }

    /// Pops the lowest open boundary location with a level above `reference`.
    fn pop_boundary_above(&mut self, reference: u32) -> Option<Pixel> {
        if reference >= P::MAX_LEVEL {
            return None;
        }
        for level in reference + 1..=P::MAX_LEVEL {
            if let Some(location) = self.boundary[level as usize].pop() {
                return Some(location);
            }
        }
        None
    }

    fn begin_component<V: ParseVisitor>(&mut self, level: u32, visitor: &mut V) {
        self.component_begins.push((level, self.pixel_list.len()));
        if let Some(condensed) = &self.condensed {
            self.condensed_begins.push((level, condensed.len()));
        }

        visitor.new_child_component(self.original_value(level));
    }

    fn end_component<V: ParseVisitor>(&mut self, level: u32, visitor: &mut V) {
        let (begin_level, begin, end) = if let Some(condensed) = &self.condensed {
            self.component_begins.pop();
            let (begin_level, begin) = self
                .condensed_begins
                .pop()
                .expect("every closed component was opened");
            (begin_level, begin, condensed.len())
        } else {
            let (begin_level, begin) = self
                .component_begins
                .pop()
                .expect("every closed component was opened");
            (begin_level, begin, self.pixel_list.len())
        };

        debug_assert_eq!(begin_level, level);

        visitor.finalize_component(self.original_value(level), begin, end);
    }

    /// The neighbor of the current position in the given direction, unless
    /// it is out of bounds or visited already.
    fn find_neighbor(&self, direction: u8) -> Option<(Pixel, u32)> {
        let Pixel { x, y } = self.current_pos;

        let neighbor = match direction {
            RIGHT => {
                if x + 1 >= self.width {
                    return None;
                }
                Pixel::new(x + 1, y)
            }
            DOWN => {
                if y + 1 >= self.height {
                    return None;
                }
                Pixel::new(x, y + 1)
            }
            LEFT => {
                if x == 0 {
                    return None;
                }
                Pixel::new(x - 1, y)
            }
            UP => {
                if y == 0 {
                    return None;
                }
                Pixel::new(x, y - 1)
            }
            _ => unreachable!("direction is one of the four 4-neighbors"),
        };

        if self.visited[self.index(neighbor)] {
            return None;
        }

        Some((neighbor, self.level_at(neighbor)))
    }
}
