//! Rendering.

mod pages;
mod render;

pub use render::render;
