//! DOM renderer: tiles, cards, text, lists and groups as a [`DomNode`] tree.

pub mod marquee;
pub mod node;
pub mod page;
pub mod render;

pub use marquee::{DomMarqueeTrack, FixedWidthLayout, LayoutProbe};
pub use node::DomNode;
pub use page::{diagnostic_panel, document_html, render_page, template_errors};
pub use render::{DomRenderer, OPACITY_CULL};
