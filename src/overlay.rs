// Face box and label drawing on a copy of the analyzed image

use crate::config::OverlayConfig;
use crate::error::{EmotionDetectorError, Result};
use crate::models::{BoundingBox, RasterImage};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rusttype::{point, Font, Scale};
use std::path::Path;
use tracing::{debug, info, warn};

/// Vertical gap between the label baseline and the top of the box
const LABEL_OFFSET: i32 = 10;

/// Fonts tried in order when no font is configured
const SYSTEM_FONTS: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "DejaVuSans.ttf",
];

/// TrueType text renderer for the face label
pub struct FontRenderer {
    font: Font<'static>,
    size: f32,
}

impl FontRenderer {
    pub fn load<P: AsRef<Path>>(path: P, size: f32) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let font = Font::try_from_vec(data).ok_or_else(|| {
            EmotionDetectorError::Config(format!("{:?} is not a valid TrueType font", path.as_ref()))
        })?;
        info!("Loaded font from {:?}", path.as_ref());
        Ok(Self { font, size })
    }

    /// First readable font among the usual system locations
    pub fn find_system(size: f32) -> Option<Self> {
        SYSTEM_FONTS
            .iter()
            .filter(|p| Path::new(p).exists())
            .find_map(|p| {
                Self::load(p, size)
                    .map_err(|e| debug!("Skipping font {}: {}", p, e))
                    .ok()
            })
    }

    /// Draws `text` with its baseline starting at `(x, y)`, clipped to the image
    pub fn draw_text(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        let scale = Scale::uniform(self.size);
        let (width, height) = img.dimensions();

        for glyph in self.font.layout(text, scale, point(x as f32, y as f32)) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    if v <= 0.2 {
                        return;
                    }
                    let px = i64::from(bb.min.x) + i64::from(gx);
                    let py = i64::from(bb.min.y) + i64::from(gy);
                    if px >= 0 && py >= 0 && px < i64::from(width) && py < i64::from(height) {
                        img.put_pixel(px as u32, py as u32, color);
                    }
                });
            }
        }
    }
}

/// 3x5 block font used when no TrueType font can be found.
/// Each glyph is five rows of three bits, most significant bit on the left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BitmapFont {
    scale: u32,
}

impl BitmapFont {
    pub const GLYPH_WIDTH: u32 = 3;
    pub const GLYPH_HEIGHT: u32 = 5;

    /// Picks a pixel scale so the glyphs come out roughly `size` pixels tall
    pub fn new(size: f32) -> Self {
        let scale = (size / 7.0).round();
        let scale = if scale.is_finite() && scale >= 1.0 { scale as u32 } else { 1 };
        Self { scale }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    fn glyph(c: char) -> [u8; 5] {
        match c.to_ascii_uppercase() {
            '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
            '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
            '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
            '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
            '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
            '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
            '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
            '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
            '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
            '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
            ' ' => [0x0, 0x0, 0x0, 0x0, 0x0],
            '.' => [0x0, 0x0, 0x0, 0x0, 0x2],
            '(' => [0x2, 0x4, 0x4, 0x4, 0x2],
            ')' => [0x2, 0x1, 0x1, 0x1, 0x2],
            'A' => [0x2, 0x5, 0x7, 0x5, 0x5],
            'C' => [0x7, 0x4, 0x4, 0x4, 0x7],
            'D' => [0x6, 0x5, 0x5, 0x5, 0x6],
            'E' => [0x7, 0x4, 0x6, 0x4, 0x7],
            'G' => [0x3, 0x4, 0x5, 0x5, 0x3],
            'H' => [0x5, 0x5, 0x7, 0x5, 0x5],
            'I' => [0x7, 0x2, 0x2, 0x2, 0x7],
            'L' => [0x4, 0x4, 0x4, 0x4, 0x7],
            'M' => [0x5, 0x7, 0x5, 0x5, 0x5],
            'N' => [0x6, 0x5, 0x5, 0x5, 0x5],
            'O' => [0x7, 0x5, 0x5, 0x5, 0x7],
            'P' => [0x7, 0x5, 0x7, 0x4, 0x4],
            'R' => [0x6, 0x5, 0x6, 0x5, 0x5],
            'S' => [0x3, 0x4, 0x2, 0x1, 0x6],
            'T' => [0x7, 0x2, 0x2, 0x2, 0x2],
            'U' => [0x5, 0x5, 0x5, 0x5, 0x7],
            'Y' => [0x5, 0x5, 0x2, 0x2, 0x2],
            _ => [0x7; 5],
        }
    }

    /// Draws `text` with the bottom of the glyphs on row `y - 1`, clipped to the image
    pub fn draw_text(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        let (width, height) = img.dimensions();
        let scale = i64::from(self.scale);
        let advance = (i64::from(Self::GLYPH_WIDTH) + 1) * scale;
        let top = i64::from(y) - i64::from(Self::GLYPH_HEIGHT) * scale;

        for (n, c) in text.chars().enumerate() {
            let left = i64::from(x) + n as i64 * advance;
            if left >= i64::from(width) {
                break;
            }
            for (row, bits) in Self::glyph(c).into_iter().enumerate() {
                for col in 0..Self::GLYPH_WIDTH {
                    if (bits >> (Self::GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = left + i64::from(col) * scale + dx;
                            let py = top + row as i64 * scale + dy;
                            if px >= 0 && py >= 0 && px < i64::from(width) && py < i64::from(height) {
                                img.put_pixel(px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// How the label above the box is rendered
pub enum LabelRenderer {
    TrueType(FontRenderer),
    Bitmap(BitmapFont),
}

impl LabelRenderer {
    /// Configured font, then a system font, then the built-in bitmap font
    pub fn from_settings(settings: &OverlayConfig) -> Self {
        if let Some(path) = &settings.font_path {
            match FontRenderer::load(path, settings.font_size) {
                Ok(font) => return LabelRenderer::TrueType(font),
                Err(e) => warn!("Label font {:?} unavailable: {}", path, e),
            }
        }
        if settings.system_fonts {
            if let Some(font) = FontRenderer::find_system(settings.font_size) {
                return LabelRenderer::TrueType(font);
            }
        }
        info!("Drawing labels with the built-in bitmap font");
        LabelRenderer::Bitmap(BitmapFont::new(settings.font_size))
    }

    fn draw_text(&self, img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match self {
            LabelRenderer::TrueType(font) => font.draw_text(img, x, y, text, color),
            LabelRenderer::Bitmap(font) => font.draw_text(img, x, y, text, color),
        }
    }
}

/// Draws the detection overlay
pub struct Annotator {
    color: Rgb<u8>,
    thickness: u32,
    labels: LabelRenderer,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(&OverlayConfig::default())
    }
}

impl Annotator {
    pub fn new(settings: &OverlayConfig) -> Self {
        Self {
            color: Rgb(settings.box_color),
            thickness: settings.thickness.max(1),
            labels: LabelRenderer::from_settings(settings),
        }
    }

    pub fn label_renderer(&self) -> &LabelRenderer {
        &self.labels
    }

    /// Returns a copy of `image` with the box from `(x, y)` to `(x + w, y + h)`
    /// and `label` with its baseline at `(x, y - 10)`
    pub fn annotate(&self, image: &RasterImage, bbox: &BoundingBox, label: &str) -> Result<RasterImage> {
        let mut img = image.to_rgb_image().ok_or_else(|| {
            EmotionDetectorError::FrameProcessing(format!(
                "{} bytes do not form a {}x{} RGB image",
                image.data.len(),
                image.width,
                image.height
            ))
        })?;
        let (width, height) = img.dimensions();

        // Edges beyond the image are clamped one pixel outside it so they stay invisible
        let left = i64::from(bbox.x);
        let top = i64::from(bbox.y);
        let right = left + i64::from(bbox.w);
        let bottom = top + i64::from(bbox.h);

        // Lines grow inward from the outer edge
        for i in 0..i64::from(self.thickness) {
            let (l, t, r, b) = (left + i, top + i, right - i, bottom - i);
            if l > r || t > b {
                break;
            }
            let l = l.max(-1);
            let t = t.max(-1);
            let r = r.min(i64::from(width));
            let b = b.min(i64::from(height));
            if l > r || t > b {
                break;
            }
            let rect = Rect::at(l as i32, t as i32)
                .of_size((r - l + 1) as u32, (b - t + 1) as u32);
            draw_hollow_rect_mut(&mut img, rect, self.color);
        }

        self.labels.draw_text(
            &mut img,
            bbox.x,
            bbox.y.saturating_sub(LABEL_OFFSET),
            label,
            self.color,
        );

        Ok(RasterImage::from_rgb_image(img))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: [u8; 3] = [0, 255, 0];

    fn pixel(image: &RasterImage, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * image.width + x) * 3) as usize;
        [image.data[idx], image.data[idx + 1], image.data[idx + 2]]
    }

    fn annotator(thickness: u32) -> Annotator {
        Annotator::new(&OverlayConfig {
            thickness,
            ..OverlayConfig::default()
        })
    }

    /// Annotator that always uses the block font, whatever is installed
    fn bitmap_annotator(font_size: f32) -> Annotator {
        Annotator::new(&OverlayConfig {
            thickness: 1,
            font_size,
            system_fonts: false,
            ..OverlayConfig::default()
        })
    }

    fn green_rows(image: &RasterImage, rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| cols.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(image, x, y) == GREEN)
            .count()
    }

    #[test]
    fn test_box_corners_drawn() {
        let image = RasterImage::new(vec![0; 20 * 20 * 3], 20, 20);
        let bbox = BoundingBox::new(2, 2, 10, 10);
        let annotated = annotator(1).annotate(&image, &bbox, "Happy (0.81)").unwrap();

        assert_eq!(pixel(&annotated, 2, 2), GREEN);
        assert_eq!(pixel(&annotated, 12, 12), GREEN);
        assert_eq!(pixel(&annotated, 12, 2), GREEN);
        assert_eq!(pixel(&annotated, 7, 7), [0, 0, 0]);
        assert_eq!(pixel(&annotated, 13, 13), [0, 0, 0]);
    }

    #[test]
    fn test_thickness_grows_inward() {
        let image = RasterImage::new(vec![0; 20 * 20 * 3], 20, 20);
        let bbox = BoundingBox::new(2, 2, 10, 10);
        let annotated = annotator(3).annotate(&image, &bbox, "").unwrap();

        assert_eq!(pixel(&annotated, 4, 4), GREEN);
        assert_eq!(pixel(&annotated, 4, 7), GREEN);
        assert_eq!(pixel(&annotated, 5, 5), [0, 0, 0]);
        assert_eq!(pixel(&annotated, 1, 1), [0, 0, 0]);
    }

    #[test]
    fn test_source_image_untouched() {
        let image = RasterImage::new(vec![9; 8 * 8 * 3], 8, 8);
        let annotated = annotator(3)
            .annotate(&image, &BoundingBox::new(1, 1, 5, 5), "Sad (0.50)")
            .unwrap();

        assert!(image.data.iter().all(|&b| b == 9));
        assert_ne!(annotated, image);
    }

    #[test]
    fn test_box_partly_outside_image() {
        let image = RasterImage::new(vec![0; 10 * 10 * 3], 10, 10);
        let annotated = annotator(3)
            .annotate(&image, &BoundingBox::new(-5, 6, 40, 40), "")
            .unwrap();
        assert_eq!(pixel(&annotated, 0, 6), GREEN);
    }

    #[test]
    fn test_bitmap_label_sits_above_box() {
        let image = RasterImage::new(vec![0; 40 * 40 * 3], 40, 40);
        let bbox = BoundingBox::new(5, 25, 10, 10);
        let annotated = bitmap_annotator(7.0).annotate(&image, &bbox, "H").unwrap();

        // Baseline at y - 10 = 15, glyph rows 10..15
        assert_eq!(pixel(&annotated, 5, 10), GREEN);
        assert_eq!(pixel(&annotated, 6, 10), [0, 0, 0]);
        assert_eq!(pixel(&annotated, 7, 10), GREEN);
        assert_eq!(pixel(&annotated, 6, 12), GREEN);
        assert_eq!(pixel(&annotated, 5, 14), GREEN);
        assert_eq!(green_rows(&annotated, 0..10, 0..40), 0);
        assert_eq!(green_rows(&annotated, 15..25, 0..40), 0);
    }

    #[test]
    fn test_default_annotator_draws_label() {
        let image = RasterImage::new(vec![0; 120 * 80 * 3], 120, 80);
        let bbox = BoundingBox::new(20, 40, 30, 30);
        let annotated = annotator(1).annotate(&image, &bbox, "Happy (0.81)").unwrap();

        assert!(green_rows(&annotated, 0..30, 0..120) > 0);
        let unlabeled = annotator(1).annotate(&image, &bbox, "").unwrap();
        assert_eq!(green_rows(&unlabeled, 0..30, 0..120), 0);
    }

    #[test]
    fn test_bitmap_scale_follows_font_size() {
        assert_eq!(BitmapFont::new(20.0).scale(), 3);
        assert_eq!(BitmapFont::new(1.0).scale(), 1);
        assert_eq!(BitmapFont::new(f32::NAN).scale(), 1);
    }

    #[test]
    fn test_missing_font_falls_back() {
        let annotator = Annotator::new(&OverlayConfig {
            font_path: Some("no/such/font.ttf".into()),
            system_fonts: false,
            ..OverlayConfig::default()
        });
        assert!(matches!(annotator.label_renderer(), LabelRenderer::Bitmap(_)));

        let image = RasterImage::new(vec![0; 60 * 60 * 3], 60, 60);
        let annotated = annotator
            .annotate(&image, &BoundingBox::new(5, 40, 10, 10), "Sad (0.50)")
            .unwrap();
        assert!(green_rows(&annotated, 0..30, 0..60) > 0);
    }

    #[test]
    fn test_huge_box_is_clamped() {
        let image = RasterImage::new(vec![0; 10 * 10 * 3], 10, 10);
        let annotated = annotator(3)
            .annotate(&image, &BoundingBox::new(0, 0, u32::MAX, u32::MAX), "Angry (0.99)")
            .unwrap();
        assert_eq!(pixel(&annotated, 0, 0), GREEN);
        assert_eq!(pixel(&annotated, 2, 5), GREEN);
        assert_eq!(pixel(&annotated, 9, 9), [0, 0, 0]);

        let far = annotator(3)
            .annotate(&image, &BoundingBox::new(i32::MAX, i32::MIN, u32::MAX, 4), "Sad (0.50)")
            .unwrap();
        assert_eq!(far, image);
    }
}
