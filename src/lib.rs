pub mod asset_store;
pub mod binding;
pub mod color;
pub mod fixtures;
pub mod inject;
pub mod page;
pub mod param;
pub mod preset;
pub mod renderer;
pub mod scene;
pub mod scene_edit;
pub mod validation;
