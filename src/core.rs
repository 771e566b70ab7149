use crate::error::{WeftError, WeftResult};

/// Render target dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> WeftResult<Self> {
        if width == 0 || height == 0 {
            return Err(WeftError::validation("canvas width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    pub fn byte_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Straight (non-premultiplied) RGBA, alpha last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub const fn channels(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Rec. 601 luma, rounded.
    pub fn luma(self) -> u8 {
        let y = 0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b);
        y.round().clamp(0.0, 255.0) as u8
    }
}

impl From<[u8; 4]> for Rgba8 {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// Flat RGBA byte buffer, row-major, alpha last per pixel.
///
/// The length invariant `data.len() == width * height * 4` holds for every
/// value of this type; both constructors enforce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A transparent buffer of the given dimensions.
    pub fn blank(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0; canvas.byte_len()],
        }
    }

    /// Wraps raw bytes, rejecting any length other than `width * height * 4`.
    pub fn from_bytes(canvas: Canvas, data: Vec<u8>) -> WeftResult<Self> {
        if data.len() != canvas.byte_len() {
            return Err(WeftError::MalformedDimensions {
                width: canvas.width,
                height: canvas.height,
                expected: canvas.byte_len(),
                actual: data.len(),
            });
        }
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Coordinates outside the buffer clamp to the nearest edge pixel.
    pub fn pixel_clamped(&self, x: u32, y: u32) -> Rgba8 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixel(x, y)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let i = self.offset(x, y);
        Rgba8::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&color.channels());
    }
}
