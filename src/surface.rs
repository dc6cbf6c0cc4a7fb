use crate::error::{ShotreelError, ShotreelResult};

/// Fixed-resolution straight-alpha RGBA8 raster target.
///
/// One surface is created per export run and its resolution never changes for
/// the duration of that run; frames are composited into it and the raw bytes
/// are handed to the encoder as-is.
#[derive(Clone, Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Source-space crop for cover fit: scale uniformly to fill, center-crop the
/// overflow on the dominant axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SrcCrop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Compute the centered source rectangle that cover-fits an `img_w` x `img_h`
/// image onto a `surf_w` x `surf_h` surface.
///
/// A relatively wider image is cropped symmetrically left/right; a relatively
/// taller one symmetrically top/bottom.
pub fn cover_src_rect(img_w: u32, img_h: u32, surf_w: u32, surf_h: u32) -> SrcCrop {
    let iw = f64::from(img_w);
    let ih = f64::from(img_h);
    let img_aspect = iw / ih;
    let surf_aspect = f64::from(surf_w) / f64::from(surf_h);

    if img_aspect > surf_aspect {
        let crop_w = ih * surf_aspect;
        SrcCrop {
            x: (iw - crop_w) / 2.0,
            y: 0.0,
            width: crop_w,
            height: ih,
        }
    } else {
        let crop_h = iw / surf_aspect;
        SrcCrop {
            x: 0.0,
            y: (ih - crop_h) / 2.0,
            width: iw,
            height: crop_h,
        }
    }
}

impl Surface {
    pub fn new(width: u32, height: u32) -> ShotreelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ShotreelError::surface(
                "surface width/height must be non-zero",
            ));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| ShotreelError::surface("surface dimensions overflow"))?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw straight-alpha RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Source-over blend of a straight-alpha color, attenuated by `coverage`
    /// (glyph antialiasing coverage, 0..=255). Destination alpha is preserved.
    pub fn blend_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4], coverage: u8) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return;
        }
        let a = mul_div255(u16::from(rgba[3]), u16::from(coverage));
        if a == 0 {
            return;
        }
        let inv = 255u16 - u16::from(a);
        let i = ((y * self.width + x) * 4) as usize;
        for c in 0..3 {
            let src = mul_div255(u16::from(rgba[c]), u16::from(a));
            let dst = mul_div255(u16::from(self.data[i + c]), inv);
            self.data[i + c] = src.saturating_add(dst);
        }
        self.data[i + 3] = self.data[i + 3].max(a);
    }

    /// Blend a uniform straight-alpha color over one full-width horizontal row.
    pub fn blend_row(&mut self, y: u32, rgba: [u8; 4]) {
        if y >= self.height || rgba[3] == 0 {
            return;
        }
        let a = u16::from(rgba[3]);
        let inv = 255u16 - a;
        let start = (y * self.width * 4) as usize;
        let end = start + (self.width * 4) as usize;
        for px in self.data[start..end].chunks_exact_mut(4) {
            for c in 0..3 {
                let src = mul_div255(u16::from(rgba[c]), a);
                let dst = mul_div255(u16::from(px[c]), inv);
                px[c] = src.saturating_add(dst);
            }
            px[3] = px[3].max(a as u8);
        }
    }

    /// Cover-fit blit: the image fully covers the surface, overflow center-cropped
    /// on the dominant axis, nearest-neighbor sampled.
    pub fn blit_cover(&mut self, img: &image::RgbaImage) {
        if img.width() == 0 || img.height() == 0 {
            return;
        }
        let crop = cover_src_rect(img.width(), img.height(), self.width, self.height);
        let sw = f64::from(self.width);
        let sh = f64::from(self.height);
        for y in 0..self.height {
            let sy = crop.y + (f64::from(y) + 0.5) / sh * crop.height;
            let sy = (sy as u32).min(img.height() - 1);
            for x in 0..self.width {
                let sx = crop.x + (f64::from(x) + 0.5) / sw * crop.width;
                let sx = (sx as u32).min(img.width() - 1);
                let p = img.get_pixel(sx, sy).0;
                self.set_pixel(x, y, [p[0], p[1], p[2], 255]);
            }
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
