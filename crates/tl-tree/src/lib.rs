//! Connected components under every intensity threshold, in linear time.
//!
//! ## Parsing Model
//! [`ImageLevelParser`] discretizes a float image into the range of a
//! [`Precision`] type and enumerates the connected components of every
//! threshold set `{p : D(p) <= t}` in a single pass over the pixels. A
//! [`ParseVisitor`] receives each component exactly once, in an order
//! consistent with the subset relation: a component is finalized only after
//! all components it contains.
//!
//! ## Shared Pixel Buffer
//! All components reference ranges of one append-only [`PixelList`]. Ranges
//! stay valid for the life of the list; the buffer never reallocates.
//!
//! ## Trees
//! [`extract_component_tree`] assembles the callbacks into a
//! [`ComponentTree`]. [`prune`] caps subtree heights and
//! [`downsample`] collapses unary chains.

mod component;
mod downsample;
mod extractor;
mod parser;
mod pixel_list;
mod pruner;
mod tree;

pub use component::ConnectedComponent;
pub use downsample::downsample;
pub use extractor::{ExtractorParameters, extract_component_tree};
pub use parser::{ImageLevelParser, ParseVisitor, ParserParameters, Precision};
pub use pixel_list::PixelList;
pub use pruner::prune;
pub use tree::{ComponentTree, Node, NodeId};
