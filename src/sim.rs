//! Simulation state carried by animation generators.

use crate::rng::SplitMix64;

/// Rectangular cell grid with torus wrapping. Cell values are generator
/// specific: two-state automata use 0/1, excitable media use 0/1/2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellGrid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl CellGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        }
    }

    /// A grid whose cells are 1 with probability `density`.
    pub fn scattered(width: u32, height: u32, density: f64, rng: &mut SplitMix64) -> Self {
        let mut grid = Self::new(width, height);
        for cell in &mut grid.cells {
            *cell = u8::from(rng.chance(density));
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y % self.height) as usize * self.width as usize + (x % self.width) as usize
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let i = self.index(x, y);
        self.cells[i] = value;
    }

    /// Moore neighbors equal to `value`, edges wrapping around.
    pub fn count_neighbors(&self, x: u32, y: u32, value: u8) -> u8 {
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        let mut count = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = (i64::from(x) + dx).rem_euclid(w) as u32;
                let ny = (i64::from(y) + dy).rem_euclid(h) as u32;
                if self.get(nx, ny) == value {
                    count += 1;
                }
            }
        }
        count
    }

    /// Builds the successor grid cell by cell from `next`.
    pub fn map_cells(&self, next: impl Fn(&Self, u32, u32, u8) -> u8) -> Self {
        let mut out = Self::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.set(x, y, next(self, x, y, self.get(x, y)));
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Raindrop {
    /// Column in canvas pixels.
    pub x: f64,
    /// Head position in canvas pixels; may be negative while entering.
    pub y: f64,
    /// Pixels per simulation step.
    pub speed: f64,
    /// Streak length in pixels.
    pub len: f64,
}

/// One realized simulation state. Generators own one variant each; the
/// shader for a generator only ever sees states its own step fn produced.
#[derive(Clone, Debug)]
pub enum SimState {
    Grid(CellGrid),
    Drops(Vec<Raindrop>),
}

impl SimState {
    pub fn as_grid(&self) -> Option<&CellGrid> {
        match self {
            Self::Grid(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_drops(&self) -> Option<&[Raindrop]> {
        match self {
            Self::Drops(d) => Some(d),
            _ => None,
        }
    }
}
