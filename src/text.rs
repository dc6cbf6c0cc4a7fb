use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::{ShotreelError, ShotreelResult};

/// Greedy line breaking against a pixel width budget.
///
/// Lines are grown one character at a time; when appending a character would
/// exceed the budget and the current line is non-empty, the line is flushed and
/// the character starts the next one. A single character that alone exceeds the
/// budget is emitted as its own line rather than split, so pathologically narrow
/// budgets still terminate. Concatenating the returned lines reproduces the
/// input exactly.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for ch in text.chars() {
        let mut candidate = line.clone();
        candidate.push(ch);
        if measure(&candidate) > max_width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            line.push(ch);
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[derive(Clone, Debug)]
struct GlyphBitmap {
    width: usize,
    height: usize,
    coverage: Vec<u8>,
}

/// A rasterized glyph positioned in surface space.
pub struct PlacedGlyph {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

/// fontdue-backed subtitle font: string measurement for the wrapper plus glyph
/// rasterization for the compositor, with a per-config raster cache.
pub struct SubtitleFont {
    font: Font,
    cache: HashMap<fontdue::layout::GlyphRasterConfig, GlyphBitmap>,
}

impl SubtitleFont {
    pub fn from_bytes(bytes: &[u8]) -> ShotreelResult<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| ShotreelError::validation(format!("failed to parse font: {e}")))?;
        Ok(Self {
            font,
            cache: HashMap::new(),
        })
    }

    pub fn from_path(path: &Path) -> ShotreelResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ShotreelError::validation(format!("failed to read font '{}': {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Pixel width of `text` at `px`, as the sum of glyph advances.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, px).advance_width)
            .sum()
    }

    /// Lay out one line starting at `(x, y)` (top-left, y-down) and rasterize
    /// each visible glyph.
    pub fn layout_line(&mut self, text: &str, px: f32, x: f32, y: f32) -> Vec<PlacedGlyph> {
        use fontdue::layout::{
            CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign,
            WrapStyle,
        };

        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y,
            max_width: None,
            max_height: None,
            horizontal_align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            line_height: 1.0,
            wrap_style: WrapStyle::Letter,
            wrap_hard_breaks: false,
        });
        layout.append(&[&self.font], &TextStyle::new(text, px, 0));

        let mut out = Vec::new();
        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let bitmap = self.cache.entry(glyph.key).or_insert_with(|| {
                let (_, coverage) = self.font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    coverage,
                }
            });
            out.push(PlacedGlyph {
                x: glyph.x.round() as i32,
                y: glyph.y.round() as i32,
                width: bitmap.width,
                height: bitmap.height,
                coverage: bitmap.coverage.clone(),
            });
        }
        out
    }
}

/// Look for a usable sans-serif TTF in the usual system locations. Used by the
/// CLI when no `--font` is given, and by environment-dependent tests.
pub fn find_system_font() -> Option<std::path::PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
        "/usr/share/fonts/gnu-free/FreeSans.ttf",
        "/System/Library/Fonts/Helvetica.ttc",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    if let Ok(path) = std::env::var("SHOTREEL_FONT") {
        let path = std::path::PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
    }
    CANDIDATES
        .iter()
        .map(std::path::PathBuf::from)
        .find(|p| p.is_file())
}
