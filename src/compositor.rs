use crate::{
    model::{ImageLoadState, Shot},
    surface::Surface,
    text::{wrap_text, SubtitleFont},
};

/// Subtitle and placeholder styling, expressed as fractions of the surface so
/// one profile works across every supported resolution.
#[derive(Clone, Debug)]
pub struct SubtitleStyle {
    /// Font size as a fraction of surface height.
    pub font_size_frac: f32,
    /// Line height as a multiple of font size.
    pub line_height_factor: f32,
    /// Text width budget as a fraction of surface width.
    pub width_frac: f32,
    /// Gap between the text block's bottom and the surface bottom edge.
    pub bottom_margin_frac: f32,
    /// Gradient strap height as a fraction of surface height.
    pub strap_frac: f32,
    /// Opacity ramp of the strap, top to bottom: (position in 0..=1, alpha in 0..=1).
    pub gradient_stops: [(f32, f32); 3],
    /// Outline thickness in pixels.
    pub stroke_px: i32,
    pub fill_rgba: [u8; 4],
    pub stroke_rgba: [u8; 4],
    pub placeholder_rgba: [u8; 4],
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_size_frac: 0.04,
            line_height_factor: 1.35,
            width_frac: 0.85,
            bottom_margin_frac: 0.08,
            strap_frac: 0.25,
            gradient_stops: [(0.0, 0.0), (0.3, 0.45), (1.0, 0.9)],
            stroke_px: 2,
            fill_rgba: [255, 255, 255, 255],
            stroke_rgba: [0, 0, 0, 255],
            placeholder_rgba: [26, 26, 30, 255],
        }
    }
}

impl SubtitleStyle {
    /// Strap alpha at a fractional position (0 = strap top, 1 = surface bottom),
    /// piecewise-linear through the three stops.
    pub fn strap_alpha(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let stops = &self.gradient_stops;
        for pair in stops.windows(2) {
            let (p0, a0) = pair[0];
            let (p1, a1) = pair[1];
            if t <= p1 {
                if p1 <= p0 {
                    return a1;
                }
                let f = (t - p0) / (p1 - p0);
                return a0 + (a1 - a0) * f.clamp(0.0, 1.0);
            }
        }
        stops[2].1
    }
}

/// Composites exactly one shot onto a surface: black base, cover-fit image (or
/// deterministic placeholder), gradient strap and wrapped subtitle lines.
///
/// This component never fails; every contingency is represented visually.
pub struct Compositor {
    font: SubtitleFont,
    style: SubtitleStyle,
}

impl Compositor {
    pub fn new(font: SubtitleFont, style: SubtitleStyle) -> Self {
        Self { font, style }
    }

    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }

    /// Render `shot` with its resolved image into `surface`. The shot itself is
    /// never mutated.
    pub fn compose_shot(&mut self, surface: &mut Surface, shot: &Shot, image: &ImageLoadState) {
        surface.fill([0, 0, 0, 255]);

        match image {
            ImageLoadState::Loaded(img) => surface.blit_cover(img),
            ImageLoadState::Loading | ImageLoadState::Failed => {
                if shot.image_url.is_some() {
                    tracing::warn!(shot = %shot.id, "image unavailable, rendering placeholder");
                }
                self.draw_placeholder(surface);
            }
        }

        if let Some(dialogue) = shot.dialogue_text() {
            self.draw_subtitle(surface, dialogue);
        }
    }

    fn draw_placeholder(&mut self, surface: &mut Surface) {
        surface.fill(self.style.placeholder_rgba);
        let px = self.font_px(surface);
        let label = "missing image";
        let width = self.font.measure(label, px);
        let x = (surface.width() as f32 - width) / 2.0;
        let y = (surface.height() as f32 - px) / 2.0;
        self.draw_line(surface, label, px, x, y);
    }

    fn draw_subtitle(&mut self, surface: &mut Surface, dialogue: &str) {
        self.draw_strap(surface);

        let px = self.font_px(surface);
        let budget = surface.width() as f32 * self.style.width_frac;
        let lines = wrap_text(dialogue, budget, |s| self.font.measure(s, px));
        if lines.is_empty() {
            return;
        }

        let line_height = px * self.style.line_height_factor;
        let block_height = lines.len() as f32 * line_height;
        let block_bottom =
            surface.height() as f32 * (1.0 - self.style.bottom_margin_frac);
        let mut y = block_bottom - block_height;

        for line in &lines {
            let width = self.font.measure(line, px);
            let x = (surface.width() as f32 - width) / 2.0;
            self.draw_line(surface, line, px, x, y);
            y += line_height;
        }
    }

    fn draw_strap(&mut self, surface: &mut Surface) {
        let height = surface.height();
        let strap_height = (height as f32 * self.style.strap_frac).round() as u32;
        if strap_height == 0 {
            return;
        }
        let top = height.saturating_sub(strap_height);
        for y in top..height {
            let t = (y - top) as f32 / strap_height as f32;
            let alpha = (self.style.strap_alpha(t) * 255.0).round() as u8;
            surface.blend_row(y, [0, 0, 0, alpha]);
        }
    }

    /// Stroke pass (eight offset copies) then fill pass, so text stays legible
    /// over arbitrary imagery.
    fn draw_line(&mut self, surface: &mut Surface, text: &str, px: f32, x: f32, y: f32) {
        let glyphs = self.font.layout_line(text, px, x, y);
        let s = self.style.stroke_px.max(0);

        if s > 0 {
            let offsets = [
                (-s, -s),
                (0, -s),
                (s, -s),
                (-s, 0),
                (s, 0),
                (-s, s),
                (0, s),
                (s, s),
            ];
            for (dx, dy) in offsets {
                for glyph in &glyphs {
                    blend_glyph(surface, glyph.x + dx, glyph.y + dy, glyph, self.style.stroke_rgba);
                }
            }
        }
        for glyph in &glyphs {
            blend_glyph(surface, glyph.x, glyph.y, glyph, self.style.fill_rgba);
        }
    }

    fn font_px(&self, surface: &Surface) -> f32 {
        (surface.height() as f32 * self.style.font_size_frac).max(1.0)
    }
}

fn blend_glyph(
    surface: &mut Surface,
    x: i32,
    y: i32,
    glyph: &crate::text::PlacedGlyph,
    rgba: [u8; 4],
) {
    for gy in 0..glyph.height {
        for gx in 0..glyph.width {
            let coverage = glyph.coverage[gy * glyph.width + gx];
            if coverage == 0 {
                continue;
            }
            surface.blend_pixel(x + gx as i32, y + gy as i32, rgba, coverage);
        }
    }
}
