//! Built-in generators: a representative slice of the full generator
//! library, enough to exercise every registry category. The complete library
//! lives outside this crate and registers itself through the same factory
//! interface.

use std::sync::Arc;

use crate::{
    core::{Canvas, PixelBuffer, Rgba8},
    registry::{
        AnimationSpec, DoubleFilterEval, FilterEval, Registry, ReseedPolicy, ShaderFn,
        TextureEval,
    },
    rng::SplitMix64,
    sim::{CellGrid, Raindrop, SimState},
    vocab,
};

pub fn install(registry: &mut Registry) {
    registry.register_texture("solid", Box::new(solid));
    registry.register_texture("squareTiling", Box::new(square_tiling));
    registry.register_texture("verticalGradient", Box::new(vertical_gradient));
    registry.register_texture("horizontalGradient", Box::new(horizontal_gradient));

    registry.register_filter("invert", Box::new(invert));
    registry.register_filter("grayscale", Box::new(grayscale));
    registry.register_filter("flipVertical", Box::new(flip_vertical));

    registry.register_double_filter("blend", Box::new(blend));
    registry.register_double_filter("mask", Box::new(mask));

    registry.register_animation("gameOfLife", Box::new(game_of_life));
    registry.register_animation("greenbergHastings", Box::new(greenberg_hastings));
    registry.register_animation("rain", Box::new(rain));
}

type Params = crate::registry::ResolvedParams;
type TexResult = crate::error::WeftResult<TextureEval>;
type FilterResult = crate::error::WeftResult<FilterEval>;
type DoubleResult = crate::error::WeftResult<DoubleFilterEval>;
type AnimResult = crate::error::WeftResult<AnimationSpec>;

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t)
        .round()
        .clamp(0.0, 255.0) as u8
}

fn lerp_color(a: Rgba8, b: Rgba8, t: f64) -> Rgba8 {
    Rgba8::new(
        lerp_u8(a.r, b.r, t),
        lerp_u8(a.g, b.g, t),
        lerp_u8(a.b, b.b, t),
        lerp_u8(a.a, b.a, t),
    )
}

// ---- textures --------------------------------------------------------------

fn solid(params: &Params, _canvas: Canvas) -> TexResult {
    let color = params.color("color1", vocab::DEFAULT_COLOR);
    Ok(Arc::new(move |x, y| color.at(x, y)))
}

/// Checkerboard over `columns` x `rows` cells. Cell edge lengths come from
/// integer floor division of the tiling extent; the parity pattern simply
/// continues across any remainder pixels.
fn square_tiling(params: &Params, canvas: Canvas) -> TexResult {
    let width = params.u32("width", canvas.width).max(1);
    let height = params.u32("height", canvas.height).max(1);
    let columns = params.u32("columns", 8).max(1);
    let rows = params.u32("rows", 8).max(1);
    let color1 = params.color("color1", Rgba8::opaque(255, 255, 255));
    let color2 = params.color("color2", Rgba8::opaque(0, 0, 0));

    let cell_w = (width / columns).max(1);
    let cell_h = (height / rows).max(1);
    Ok(Arc::new(move |x, y| {
        let parity = (x / cell_w + y / cell_h) % 2;
        if parity == 0 {
            color1.at(x, y)
        } else {
            color2.at(x, y)
        }
    }))
}

fn vertical_gradient(params: &Params, canvas: Canvas) -> TexResult {
    let height = params.u32("height", canvas.height).max(1);
    let color1 = params.color("color1", Rgba8::opaque(0, 0, 0));
    let color2 = params.color("color2", Rgba8::opaque(255, 255, 255));
    let denom = f64::from(height.saturating_sub(1).max(1));
    Ok(Arc::new(move |x, y| {
        let t = (f64::from(y) / denom).min(1.0);
        lerp_color(color1.at(x, y), color2.at(x, y), t)
    }))
}

fn horizontal_gradient(params: &Params, canvas: Canvas) -> TexResult {
    let width = params.u32("width", canvas.width).max(1);
    let color1 = params.color("color1", Rgba8::opaque(0, 0, 0));
    let color2 = params.color("color2", Rgba8::opaque(255, 255, 255));
    let denom = f64::from(width.saturating_sub(1).max(1));
    Ok(Arc::new(move |x, y| {
        let t = (f64::from(x) / denom).min(1.0);
        lerp_color(color1.at(x, y), color2.at(x, y), t)
    }))
}

// ---- filters ---------------------------------------------------------------

fn map_pixels(
    input: &PixelBuffer,
    f: impl Fn(u32, u32, Rgba8) -> Rgba8,
) -> PixelBuffer {
    let canvas = input.canvas();
    let mut out = PixelBuffer::blank(canvas);
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            out.put_pixel(x, y, f(x, y, input.pixel(x, y)));
        }
    }
    out
}

fn invert(_params: &Params) -> FilterResult {
    Ok(Box::new(|input| {
        Ok(map_pixels(input, |_, _, c| {
            Rgba8::new(255 - c.r, 255 - c.g, 255 - c.b, c.a)
        }))
    }))
}

fn grayscale(_params: &Params) -> FilterResult {
    Ok(Box::new(|input| {
        Ok(map_pixels(input, |_, _, c| {
            let y = c.luma();
            Rgba8::new(y, y, y, c.a)
        }))
    }))
}

fn flip_vertical(_params: &Params) -> FilterResult {
    Ok(Box::new(|input| {
        let last_row = input.height() - 1;
        Ok(map_pixels(input, |x, y, _| {
            input.pixel(x, last_row - y)
        }))
    }))
}

// ---- double filters --------------------------------------------------------

fn blend(params: &Params) -> DoubleResult {
    let weight = params.f64("weight", 0.5).clamp(0.0, 1.0);
    Ok(Box::new(move |a, b| {
        Ok(map_pixels(a, |x, y, ca| {
            lerp_color(ca, b.pixel_clamped(x, y), weight)
        }))
    }))
}

/// Keeps operand A where operand B is at least `threshold` bright; elsewhere
/// the pixel is transparent.
fn mask(params: &Params) -> DoubleResult {
    let threshold = params.u32("threshold", 128).min(255) as u8;
    Ok(Box::new(move |a, b| {
        Ok(map_pixels(a, |x, y, ca| {
            if b.pixel_clamped(x, y).luma() >= threshold {
                ca
            } else {
                Rgba8::transparent()
            }
        }))
    }))
}

// ---- animations ------------------------------------------------------------

fn grid_dims(params: &Params, canvas: Canvas) -> (u32, u32, u32) {
    let cell_size = params.u32("cellSize", 8).max(1);
    let grid_w = (canvas.width / cell_size).max(1);
    let grid_h = (canvas.height / cell_size).max(1);
    (cell_size, grid_w, grid_h)
}

fn grid_shader(cell_size: u32, color_for: impl Fn(u8, u32, u32) -> Rgba8 + 'static) -> ShaderFn {
    Arc::new(move |state, x, y| match state.as_grid() {
        Some(grid) => {
            let cx = (x / cell_size).min(grid.width() - 1);
            let cy = (y / cell_size).min(grid.height() - 1);
            color_for(grid.get(cx, cy), x, y)
        }
        None => Rgba8::transparent(),
    })
}

fn game_of_life(params: &Params, canvas: Canvas) -> AnimResult {
    let (cell_size, grid_w, grid_h) = grid_dims(params, canvas);
    let density = params.f64("density", 0.35).clamp(0.0, 1.0);
    let seed = params.u64("seed", 0x5EED);
    let rule = params.rule("rule", vocab::GAME_OF_LIFE);
    let alive = params.color("color1", Rgba8::opaque(255, 255, 255));
    let dead = params.color("color2", Rgba8::opaque(0, 0, 0));

    Ok(AnimationSpec {
        name: "gameOfLife".to_string(),
        step_duration: params.f64("stepDuration", 5.0),
        init: Arc::new(move |generation| {
            let mut rng = SplitMix64::new(seed.wrapping_add(generation));
            SimState::Grid(CellGrid::scattered(grid_w, grid_h, density, &mut rng))
        }),
        step: Arc::new(move |state| match state {
            SimState::Grid(grid) => SimState::Grid(grid.map_cells(|g, x, y, cell| {
                let neighbors = g.count_neighbors(x, y, 1);
                let next_alive = if cell == 1 {
                    rule.survives(neighbors)
                } else {
                    rule.born(neighbors)
                };
                u8::from(next_alive)
            })),
            other => other.clone(),
        }),
        shader: grid_shader(cell_size, move |cell, x, y| {
            if cell == 1 { alive.at(x, y) } else { dead.at(x, y) }
        }),
        reseed: None,
    })
}

/// Three-state excitable medium: resting cells fire when any neighbor is
/// excited, excited cells become refractory, refractory cells recover.
/// Long runs settle visually, so the whole stream reseeds on a
/// size-dependent cadence.
fn greenberg_hastings(params: &Params, canvas: Canvas) -> AnimResult {
    const RESTING: u8 = 0;
    const EXCITED: u8 = 1;
    const REFRACTORY: u8 = 2;

    let (cell_size, grid_w, grid_h) = grid_dims(params, canvas);
    let seed = params.u64("seed", 0x5EED);
    let excited = params.color("color1", Rgba8::opaque(255, 255, 0));
    let refractory = params.color("color2", Rgba8::opaque(255, 64, 0));
    let resting = params.color("color3", Rgba8::opaque(0, 0, 0));
    let every = params.u64("reseedEvery", u64::from(grid_w.max(grid_h)));

    Ok(AnimationSpec {
        name: "greenbergHastings".to_string(),
        step_duration: params.f64("stepDuration", 5.0),
        init: Arc::new(move |generation| {
            let mut rng = SplitMix64::new(seed.wrapping_add(generation));
            let mut grid = CellGrid::new(grid_w, grid_h);
            for y in 0..grid_h {
                for x in 0..grid_w {
                    let roll = rng.next_f64();
                    let cell = if roll < 0.05 {
                        EXCITED
                    } else if roll < 0.10 {
                        REFRACTORY
                    } else {
                        RESTING
                    };
                    grid.set(x, y, cell);
                }
            }
            SimState::Grid(grid)
        }),
        step: Arc::new(move |state| match state {
            SimState::Grid(grid) => SimState::Grid(grid.map_cells(|g, x, y, cell| match cell {
                EXCITED => REFRACTORY,
                REFRACTORY => RESTING,
                _ => u8::from(g.count_neighbors(x, y, EXCITED) > 0),
            })),
            other => other.clone(),
        }),
        shader: grid_shader(cell_size, move |cell, x, y| match cell {
            EXCITED => excited.at(x, y),
            REFRACTORY => refractory.at(x, y),
            _ => resting.at(x, y),
        }),
        reseed: Some(ReseedPolicy { every: every.max(1) }),
    })
}

fn rain(params: &Params, canvas: Canvas) -> AnimResult {
    let count = params.u32("drops", 64).max(1) as usize;
    let seed = params.u64("seed", 0x5EED);
    let streak = params.color("color1", Rgba8::opaque(170, 190, 255));
    let background = params.color("color2", Rgba8::opaque(0, 0, 0));
    let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));

    Ok(AnimationSpec {
        name: "rain".to_string(),
        step_duration: params.f64("stepDuration", 0.1),
        init: Arc::new(move |generation| {
            let mut rng = SplitMix64::new(seed.wrapping_add(generation));
            let drops = (0..count)
                .map(|_| Raindrop {
                    x: (rng.next_f64() * w).floor(),
                    y: rng.next_f64() * h - h,
                    speed: 2.0 + rng.next_f64() * 4.0,
                    len: 4.0 + rng.next_f64() * 8.0,
                })
                .collect();
            SimState::Drops(drops)
        }),
        step: Arc::new(move |state| match state {
            SimState::Drops(drops) => SimState::Drops(
                drops
                    .iter()
                    .map(|d| {
                        let mut y = d.y + d.speed;
                        // Wrap back above the canvas once the tail clears it.
                        if y - d.len > h {
                            y -= h + 2.0 * d.len;
                        }
                        Raindrop { y, ..*d }
                    })
                    .collect(),
            ),
            other => other.clone(),
        }),
        shader: Arc::new(move |state, x, y| {
            let Some(drops) = state.as_drops() else {
                return Rgba8::transparent();
            };
            let (px, py) = (f64::from(x), f64::from(y));
            let hit = drops
                .iter()
                .any(|d| (px - d.x).abs() < 1.0 && py <= d.y && py > d.y - d.len);
            if hit { streak.at(x, y) } else { background.at(x, y) }
        }),
        reseed: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ParamValue, ResolvedParams};
    use serde_json::json;

    fn params(pairs: &[(&str, serde_json::Value)]) -> ResolvedParams {
        let mut p = ResolvedParams::new();
        for (k, v) in pairs {
            p.insert(*k, ParamValue::Json(v.clone()));
        }
        p
    }

    #[test]
    fn solid_ignores_coordinates() {
        let mut p = ResolvedParams::new();
        p.insert("color1", ParamValue::Color(Rgba8::new(1, 2, 3, 4)));
        let eval = solid(&p, Canvas::new(4, 4).unwrap()).unwrap();
        assert_eq!(eval(0, 0), Rgba8::new(1, 2, 3, 4));
        assert_eq!(eval(3, 3), Rgba8::new(1, 2, 3, 4));
    }

    #[test]
    fn square_tiling_floor_division_cells() {
        let mut p = params(&[
            ("width", json!(3)),
            ("height", json!(3)),
            ("rows", json!(3)),
            ("columns", json!(3)),
        ]);
        p.insert("color1", ParamValue::Color(Rgba8::opaque(255, 255, 255)));
        p.insert("color2", ParamValue::Color(Rgba8::opaque(0, 0, 0)));
        let eval = square_tiling(&p, Canvas::new(3, 3).unwrap()).unwrap();
        assert_eq!(eval(0, 0), Rgba8::opaque(255, 255, 255));
        assert_eq!(eval(1, 0), Rgba8::opaque(0, 0, 0));
        assert_eq!(eval(1, 1), Rgba8::opaque(255, 255, 255));
        assert_eq!(eval(2, 2), Rgba8::opaque(255, 255, 255));
    }

    #[test]
    fn invert_preserves_alpha() {
        let canvas = Canvas::new(1, 1).unwrap();
        let input = PixelBuffer::from_bytes(canvas, vec![10, 20, 30, 40]).unwrap();
        let filter = invert(&ResolvedParams::new()).unwrap();
        let out = filter(&input).unwrap();
        assert_eq!(out.pixel(0, 0), Rgba8::new(245, 235, 225, 40));
    }

    #[test]
    fn flip_vertical_mirrors_rows() {
        let canvas = Canvas::new(1, 2).unwrap();
        let mut input = PixelBuffer::blank(canvas);
        input.put_pixel(0, 0, Rgba8::opaque(1, 1, 1));
        input.put_pixel(0, 1, Rgba8::opaque(2, 2, 2));
        let filter = flip_vertical(&ResolvedParams::new()).unwrap();
        let out = filter(&input).unwrap();
        assert_eq!(out.pixel(0, 0), Rgba8::opaque(2, 2, 2));
        assert_eq!(out.pixel(0, 1), Rgba8::opaque(1, 1, 1));
    }

    #[test]
    fn blend_weights_the_second_operand() {
        let canvas = Canvas::new(1, 1).unwrap();
        let a = PixelBuffer::from_bytes(canvas, vec![0, 0, 0, 255]).unwrap();
        let b = PixelBuffer::from_bytes(canvas, vec![100, 200, 50, 255]).unwrap();
        let filter = blend(&params(&[("weight", json!(0.5))])).unwrap();
        let out = filter(&a, &b).unwrap();
        assert_eq!(out.pixel(0, 0), Rgba8::new(50, 100, 25, 255));
    }

    #[test]
    fn life_blinker_oscillates() {
        let p = params(&[("cellSize", json!(1))]);
        let spec = game_of_life(&p, Canvas::new(5, 5).unwrap()).unwrap();
        let mut grid = CellGrid::new(5, 5);
        for x in 1..=3 {
            grid.set(x, 2, 1);
        }
        let horizontal = SimState::Grid(grid);
        let vertical = (spec.step)(&horizontal);
        let v = vertical.as_grid().unwrap();
        assert_eq!(v.get(2, 1), 1);
        assert_eq!(v.get(2, 2), 1);
        assert_eq!(v.get(2, 3), 1);
        assert_eq!(v.get(1, 2), 0);
        let back = (spec.step)(&vertical);
        assert_eq!(back.as_grid().unwrap().get(1, 2), 1);
    }

    #[test]
    fn greenberg_hastings_cycles_states() {
        let p = params(&[("cellSize", json!(1))]);
        let spec = greenberg_hastings(&p, Canvas::new(4, 4).unwrap()).unwrap();
        let mut grid = CellGrid::new(4, 4);
        grid.set(1, 1, 1);
        let s1 = (spec.step)(&SimState::Grid(grid));
        let g1 = s1.as_grid().unwrap();
        // The excited cell refracts; its resting neighbors fire.
        assert_eq!(g1.get(1, 1), 2);
        assert_eq!(g1.get(0, 0), 1);
        assert_eq!(g1.get(2, 2), 1);
        let s2 = (spec.step)(&s1);
        assert_eq!(s2.as_grid().unwrap().get(1, 1), 0);
    }

    #[test]
    fn greenberg_hastings_reseeds_on_grid_size() {
        let p = params(&[("cellSize", json!(1))]);
        let spec = greenberg_hastings(&p, Canvas::new(12, 8).unwrap()).unwrap();
        assert_eq!(spec.reseed, Some(ReseedPolicy { every: 12 }));
    }

    #[test]
    fn rain_wraps_drops_back_above_the_canvas() {
        let p = params(&[("drops", json!(1))]);
        let spec = rain(&p, Canvas::new(8, 8).unwrap()).unwrap();
        let state = SimState::Drops(vec![Raindrop {
            x: 3.0,
            y: 20.0,
            speed: 3.0,
            len: 4.0,
        }]);
        let next = (spec.step)(&state);
        let drop = next.as_drops().unwrap()[0];
        assert!(drop.y < 20.0, "drop should wrap, got y={}", drop.y);
    }

    #[test]
    fn rain_cadence_default_is_fast() {
        let spec = rain(&ResolvedParams::new(), Canvas::new(8, 8).unwrap()).unwrap();
        assert_eq!(spec.step_duration, 0.1);
    }
}
