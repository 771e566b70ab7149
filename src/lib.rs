#![forbid(unsafe_code)]

//! Raster image synthesis from a declarative configuration tree, plus
//! cadence-driven simulation animation.
//!
//! A config tree is a JSON-shaped dictionary: keys name textures, filters,
//! double filters, or plain parameters, and nesting expresses composition.
//! The [`resolver::Resolver`] interprets the tree against a
//! [`registry::Registry`], producing either a static [`core::PixelBuffer`]
//! or an [`registry::AnimationSpec`] that an [`animate::AnimationRun`] steps
//! on its own cadence, decoupled from frame rate.

pub mod animate;
pub mod builtin;
pub mod core;
pub mod error;
pub mod rasterize;
pub mod registry;
pub mod resolver;
pub mod rng;
pub mod sim;
pub mod stream;
pub mod vocab;

pub use animate::{AnimationRun, CancelToken, FrameSink};
pub use core::{Canvas, PixelBuffer, Rgba8};
pub use error::{WeftError, WeftResult};
pub use registry::{AnimationSpec, Category, Registry, ReseedPolicy};
pub use resolver::{ConfigNode, Resolved, Resolver};
pub use stream::StateStream;
