//! Renderers for composed section scenes.
//!
//! This module is organized into several submodules:
//! - `dispatch`: splits a scene between the DOM and GPU renderers
//! - `dom`: layer tree output for tiles, cards, text, lists and groups
//! - `raymarch`: one raymarched canvas per primitive, storm or plane node
//! - `marquee`: the shared GPU canvas for `webgl` marquee lists
//! - `texture`: placeholder-first image textures loaded off-thread
//! - `resources`: GPU context / frame loop accounting
//! - `validation`: WGSL validation using naga
//! - `headless`: offscreen render of a GPU node to PNG

pub mod dispatch;
pub mod dom;
pub mod headless;
pub mod marquee;
pub mod raymarch;
pub mod resources;
pub mod texture;
pub mod utils;
pub mod validation;

pub use dispatch::{DispatchPlan, GpuJob, GpuJobKind, RenderTarget, classify};
pub use dom::{DomNode, DomRenderer, document_html, render_page};
pub use headless::{HeadlessOptions, render_node_to_png};
pub use marquee::MarqueeTrack;
pub use raymarch::{RaymarchNode, RaymarchProgram};
pub use resources::{CountingSink, NullSink, ResourceSink};
pub use texture::{DecodedImage, TextureLoader, TextureSlot, TextureSources};
pub use validation::{validate_wgsl, validate_wgsl_with_context};
