use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tl_core::{Error, Image};

use crate::parser::{discretize_value, intensity_bounds};
use crate::{
    ComponentTree, ConnectedComponent, ImageLevelParser, NodeId, ParseVisitor,
    ParserParameters, PixelList, Precision,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorParameters {
    /// Extract components starting with the darkest.
    pub dark_to_bright: bool,

    /// Only consider components of at least this size.
    pub min_size: usize,

    /// Only consider components smaller than this size. Zero means
    /// unbounded.
    pub max_size: usize,

    /// Discretization bounds, see [`ParserParameters`].
    pub min_intensity: f32,
    pub max_intensity: f32,

    /// Extract a flat tree that has only same-intensity regions.
    pub same_intensity_components: bool,

    /// The image to parse is a spaced edge image, see [`ParserParameters`].
    pub spaced_edge_image: bool,
}

impl Default for ExtractorParameters {
    fn default() -> Self {
        Self {
            dark_to_bright: true,
            min_size: 0,
            max_size: 0,
            min_intensity: 0.0,
            max_intensity: 0.0,
            same_intensity_components: false,
            spaced_edge_image: false,
        }
    }
}

/// Assembles parser callbacks into a component tree.
struct TreeBuilder {
    pixel_list: Option<Arc<PixelList>>,
    tree: ComponentTree,

    // roots of the subtrees built so far, innermost on top
    open_roots: Vec<NodeId>,

    // range of the previously finalized component, to skip levels that
    // added no new pixels
    previous_range: Option<(usize, usize)>,

    min_size: usize,
    max_size: usize,
    total_pixels: usize,
}

impl TreeBuilder {
    fn new(min_size: usize, max_size: usize, total_pixels: usize) -> Self {
        Self {
            pixel_list: None,
            tree: ComponentTree::new(),
            open_roots: Vec::new(),
            previous_range: None,
            min_size,
            max_size,
            total_pixels,
        }
    }

    fn finish(mut self) -> Result<ComponentTree, Error> {
        let root = self
            .open_roots
            .pop()
            .ok_or_else(|| Error::InvalidInput("no components were extracted".into()))?;
        debug_assert!(
            self.open_roots.is_empty(),
            "the full-image component closes all other roots"
        );
        self.tree.set_root(root);
        Ok(self.tree)
    }
}

impl ParseVisitor for TreeBuilder {
    fn set_pixel_list(&mut self, list: Arc<PixelList>) {
        self.pixel_list = Some(list);
    }

    fn finalize_component(&mut self, value: f32, begin: usize, end: usize) {
        // levels that added no pixels repeat the previous range
        if self.previous_range == Some((begin, end)) {
            return;
        }
        self.previous_range = Some((begin, end));

        let size = end - begin;

        // the full-image component is always kept, so the tree has a root
        // even when the size filter would reject it
        let whole_image = size == self.total_pixels;
        if !whole_image {
            if size < self.min_size {
                return;
            }
            if self.max_size > 0 && size >= self.max_size {
                return;
            }
        }

        let list = self
            .pixel_list
            .clone()
            .expect("pixel list is set before any component is finalized");
        let component = Arc::new(ConnectedComponent::new(list, begin, end, value));
        let node = self.tree.add_node(component);

        // all open roots contained in this component become its children
        while let Some(&top) = self.open_roots.last() {
            let (top_begin, _) = self.tree.node(top).component.range();
            if top_begin < begin {
                break;
            }
            let child = self.open_roots.pop().expect("checked non-empty");
            self.tree.add_child(node, child);
        }

        self.open_roots.push(node);
    }
}

/// Zeroes every pixel whose right or down neighbor holds a different
/// non-zero value, turning touching regions of distinct intensities into
/// regions separated by zero.
///
/// Values are compared at the discretized level the parser will assign
/// them, so neighbors that quantize to the same level stay connected.
fn flatten_same_intensity<P: Precision>(
    image: &Image<f32>,
    parameters: &ParserParameters,
) -> Result<Image<f32>, Error> {
    let (min, max) = intensity_bounds(image, parameters)?;
    let level_of =
        |value: f32| discretize_value::<P>(value, min, max, parameters.dark_to_bright);

    let width = image.width();
    let height = image.height();
    let mut out = image.clone();

    for y in 0..height {
        for x in 0..width {
            let level = level_of(image.pixel(x, y));

            let cut_right = x + 1 < width && {
                let right = image.pixel(x + 1, y);
                right != 0.0 && level_of(right) != level
            };
            let cut_down = y + 1 < height && {
                let down = image.pixel(x, y + 1);
                down != 0.0 && level_of(down) != level
            };

            if cut_right || cut_down {
                out.set_pixel(x, y, 0.0);
            }
        }
    }

    Ok(out)
}

/// Extracts the component tree of an image.
///
/// Every maximal connected component of every threshold that passes the
/// size filter becomes a node; parent-child edges follow the subset
/// relation. The returned tree always has a root covering the whole image.
pub fn extract_component_tree<P: Precision>(
    image: &Image<f32>,
    parameters: &ExtractorParameters,
) -> Result<ComponentTree, Error> {
    let parser_parameters = ParserParameters {
        dark_to_bright: parameters.dark_to_bright,
        min_intensity: parameters.min_intensity,
        max_intensity: parameters.max_intensity,
        spaced_edge_image: parameters.spaced_edge_image,
    };

    let flattened;
    let input = if parameters.same_intensity_components {
        flattened = flatten_same_intensity::<P>(image, &parser_parameters)?;
        &flattened
    } else {
        image
    };

    let parser = ImageLevelParser::<P>::new(input, parser_parameters)?;

    let total_pixels = if parameters.spaced_edge_image {
        image.width().div_ceil(2) * image.height().div_ceil(2)
    } else {
        image.len()
    };

    let mut builder = TreeBuilder::new(parameters.min_size, parameters.max_size, total_pixels);
    parser.parse(&mut builder);

    builder.finish()
}
