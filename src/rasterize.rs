//! Pixel loops: turn an evaluator into a concrete buffer.
//!
//! Pixels are visited in row-major order, four channels written alpha-last,
//! once per pixel. Generator correctness must not depend on visit order; the
//! only cross-pixel state is whatever the evaluator captured immutably before
//! the loop began.

use crate::{
    core::{Canvas, PixelBuffer},
    registry::{ShaderFn, TextureEval},
    sim::SimState,
};

/// Evaluates a texture over the whole canvas.
#[tracing::instrument(skip(eval), fields(w = canvas.width, h = canvas.height))]
pub fn rasterize(eval: &TextureEval, canvas: Canvas) -> PixelBuffer {
    let mut buf = PixelBuffer::blank(canvas);
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            buf.put_pixel(x, y, eval(x, y));
        }
    }
    buf
}

/// Evaluates an animation shader against one captured simulation state.
///
/// The state reference is taken once, before the loop; the shader sees the
/// same immutable state for every pixel of the frame.
#[tracing::instrument(skip(shader, state), fields(w = canvas.width, h = canvas.height))]
pub fn rasterize_state(shader: &ShaderFn, state: &SimState, canvas: Canvas) -> PixelBuffer {
    let mut buf = PixelBuffer::blank(canvas);
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            buf.put_pixel(x, y, shader(state, x, y));
        }
    }
    buf
}
