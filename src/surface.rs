use std::sync::{Arc, OnceLock};

use ab_glyph::{Font as _, FontArc, ScaleFont as _};
use egui::{Color32, Vec2};
use image::ImageEncoder as _;
use vello_cpu::kurbo::{self, Shape as _};
use vello_cpu::peniko;

use crate::element::{LINE_HEIGHT, Placement, TextShape};
use crate::error::ExportError;
use crate::export::ExportFormat;
use crate::raster::RasterImage;

// Flattening tolerance for curved outlines, in pixels
const PATH_TOLERANCE: f64 = 0.1;

/// The drawing primitives the scene needs from a canvas-like backend
pub trait RenderSurface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Paint the whole surface with one color
    fn fill(&mut self, color: Color32);

    /// Rounded rectangle covering the local box `0..size`
    fn draw_rect(&mut self, placement: &Placement, size: Vec2, corner_radius: f32, color: Color32);

    /// Ellipse inscribed in the local box `0..size`
    fn draw_ellipse(&mut self, placement: &Placement, size: Vec2, color: Color32);

    fn draw_text(&mut self, placement: &Placement, text: &TextShape, color: Color32);

    /// Bitmap at its natural size in the local box
    fn draw_bitmap(&mut self, placement: &Placement, image: &RasterImage);

    /// Rasterize everything drawn so far. Readbacks see only flushed drawing.
    fn flush(&mut self);

    /// Copy of the current pixels with straight alpha
    fn pixel_buffer(&self) -> RasterImage;

    /// `quality` is in `0.0..=1.0` and only affects lossy formats
    fn encode(&self, format: ExportFormat, quality: f32) -> Result<Vec<u8>, ExportError>;
}

/// A CPU surface: drawing is recorded into a `vello_cpu` context and rendered
/// into a premultiplied pixmap on [`RenderSurface::flush`].
///
/// Rendering is single-threaded, so the same scene always produces the same pixels.
pub struct RasterSurface {
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    pending: bool,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("pending", &self.pending)
            .finish()
    }
}

impl RasterSurface {
    /// Allocate a transparent surface.
    ///
    /// Fails with `RenderSurfaceUnavailable` for empty sizes and sizes beyond
    /// `max_side` or what the rasterizer can address.
    pub fn acquire(width: u32, height: u32, max_side: u32) -> Result<Self, ExportError> {
        if width == 0 || height == 0 {
            return Err(ExportError::RenderSurfaceUnavailable(format!(
                "empty surface {width}x{height}"
            )));
        }
        if width > max_side || height > max_side {
            return Err(ExportError::RenderSurfaceUnavailable(format!(
                "{width}x{height} exceeds the {max_side}px limit"
            )));
        }
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(ExportError::RenderSurfaceUnavailable(format!(
                "{width}x{height} exceeds the rasterizer limit of {}px",
                u16::MAX
            )));
        };
        Ok(Self {
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
            pending: false,
        })
    }

    /// Premultiplied color at a pixel, as of the last flush
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color32> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let index = (y as usize * self.width() as usize + x as usize) * 4;
        let px = self.pixmap.data_as_u8_slice().get(index..index + 4)?;
        Some(Color32::from_rgba_premultiplied(px[0], px[1], px[2], px[3]))
    }

    /// Fill `shape`, given in the object's local box, with the current paint
    fn fill_local(&mut self, placement: &Placement, pivot_size: Vec2, shape: &impl kurbo::Shape) {
        if placement.is_degenerate() {
            return;
        }
        self.ctx.set_transform(placement_affine(placement, pivot_size));
        self.ctx.set_paint_transform(kurbo::Affine::IDENTITY);
        self.ctx.fill_path(&shape.to_path(PATH_TOLERANCE));
        self.pending = true;
    }
}

/// Maps the local box `0..pivot_size` to canvas space: scale, then rotate about the scaled box centre
fn placement_affine(placement: &Placement, pivot_size: Vec2) -> kurbo::Affine {
    let centre = pivot_size * placement.scale / 2.0;
    let origin = placement.position + centre;
    kurbo::Affine::translate((f64::from(origin.x), f64::from(origin.y)))
        * kurbo::Affine::rotate(f64::from(placement.angle.to_radians()))
        * kurbo::Affine::translate((-f64::from(centre.x), -f64::from(centre.y)))
        * kurbo::Affine::scale_non_uniform(f64::from(placement.scale.x), f64::from(placement.scale.y))
}

fn solid(color: Color32) -> peniko::Color {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    peniko::Color::from_rgba8(r, g, b, a)
}

fn local_rect(size: Vec2) -> kurbo::Rect {
    kurbo::Rect::new(0.0, 0.0, f64::from(size.x), f64::from(size.y))
}

/// Straight-alpha bitmap as an image paint
fn image_paint(image: &RasterImage) -> Option<vello_cpu::Image> {
    let w = u16::try_from(image.width()).ok()?;
    let h = u16::try_from(image.height()).ok()?;
    let pixels: Vec<peniko::color::PremulRgba8> = image
        .pixels()
        .chunks_exact(4)
        .map(|px| {
            let premul = Color32::from_rgba_unmultiplied(px[0], px[1], px[2], px[3]);
            peniko::color::PremulRgba8::from_u8_array(premul.to_array())
        })
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Some(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: peniko::ImageSampler::default(),
    })
}

/// The proportional font bundled with egui: metrics for layout, data for the rasterizer
struct DefaultFont {
    metrics: FontArc,
    data: peniko::FontData,
}

fn default_font() -> Option<&'static DefaultFont> {
    static FONT: OnceLock<Option<DefaultFont>> = OnceLock::new();
    FONT.get_or_init(|| {
        let definitions = egui::FontDefinitions::default();
        let name = definitions
            .families
            .get(&egui::FontFamily::Proportional)?
            .first()?;
        let bytes = definitions.font_data.get(name)?.font.to_vec();
        match FontArc::try_from_vec(bytes.clone()) {
            Ok(metrics) => Some(DefaultFont {
                metrics,
                data: peniko::FontData::new(peniko::Blob::from(bytes), 0),
            }),
            Err(err) => {
                log::warn!("Failed to load font {name}: {err}");
                None
            }
        }
    })
    .as_ref()
}

/// Glyph positions for each line, baseline-relative to the local box's top-left
fn layout_glyphs(font: &FontArc, text: &TextShape) -> Vec<vello_cpu::Glyph> {
    let scaled = font.as_scaled(text.font_size);
    let line_height = text.font_size * LINE_HEIGHT;
    let mut glyphs = Vec::new();
    for (row, line) in text.lines().enumerate() {
        let baseline = row as f32 * line_height + scaled.ascent();
        let mut caret = 0.0f32;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(vello_cpu::Glyph {
                id: u32::from(id.0),
                x: caret,
                y: baseline,
            });
            caret += scaled.h_advance(id);
            prev = Some(id);
        }
    }
    glyphs
}

impl RenderSurface for RasterSurface {
    fn width(&self) -> u32 {
        u32::from(self.pixmap.width())
    }

    fn height(&self) -> u32 {
        u32::from(self.pixmap.height())
    }

    fn fill(&mut self, color: Color32) {
        let size = Vec2::new(self.width() as f32, self.height() as f32);
        self.ctx.set_transform(kurbo::Affine::IDENTITY);
        self.ctx.set_paint(solid(color));
        self.ctx.fill_rect(&local_rect(size));
        self.pending = true;
    }

    fn draw_rect(&mut self, placement: &Placement, size: Vec2, corner_radius: f32, color: Color32) {
        let r = corner_radius.clamp(0.0, size.x.min(size.y) / 2.0);
        let rect = kurbo::RoundedRect::from_rect(local_rect(size), f64::from(r));
        self.ctx.set_paint(solid(color));
        self.fill_local(placement, size, &rect);
    }

    fn draw_ellipse(&mut self, placement: &Placement, size: Vec2, color: Color32) {
        let ellipse = kurbo::Ellipse::from_rect(local_rect(size));
        self.ctx.set_paint(solid(color));
        self.fill_local(placement, size, &ellipse);
    }

    fn draw_text(&mut self, placement: &Placement, text: &TextShape, color: Color32) {
        if placement.is_degenerate() {
            return;
        }
        let Some(font) = default_font() else {
            log::warn!("No font available, skipping text {:?}", text.content);
            return;
        };
        let glyphs = layout_glyphs(&font.metrics, text);
        self.ctx.set_transform(placement_affine(placement, text.approx_size()));
        self.ctx.set_paint_transform(kurbo::Affine::IDENTITY);
        self.ctx.set_paint(solid(color));
        self.ctx
            .glyph_run(&font.data)
            .font_size(text.font_size)
            .fill_glyphs(glyphs.into_iter());
        self.pending = true;
    }

    fn draw_bitmap(&mut self, placement: &Placement, image: &RasterImage) {
        let Some(paint) = image_paint(image) else {
            log::warn!("Bitmap {}x{} is too large to draw", image.width(), image.height());
            return;
        };
        let size = Vec2::new(image.width() as f32, image.height() as f32);
        self.ctx.set_paint(paint);
        self.fill_local(placement, size, &local_rect(size));
    }

    fn flush(&mut self) {
        if !self.pending {
            return;
        }
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        self.pending = false;
    }

    fn pixel_buffer(&self) -> RasterImage {
        let pixels = self
            .pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .flat_map(|px| Color32::from_rgba_premultiplied(px[0], px[1], px[2], px[3]).to_srgba_unmultiplied())
            .collect();
        RasterImage::from_rgba(self.width(), self.height(), pixels)
            .unwrap_or_else(|| RasterImage::filled(self.width(), self.height(), Color32::TRANSPARENT))
    }

    fn encode(&self, format: ExportFormat, quality: f32) -> Result<Vec<u8>, ExportError> {
        let mut bytes = Vec::new();
        match format {
            ExportFormat::Png => {
                let buffer = self.pixel_buffer();
                image::codecs::png::PngEncoder::new(&mut bytes).write_image(
                    buffer.pixels(),
                    self.width(),
                    self.height(),
                    image::ExtendedColorType::Rgba8,
                )?;
            }
            ExportFormat::Jpeg => {
                let rgb = flatten_on_white(self.pixmap.data_as_u8_slice());
                let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
                    &rgb,
                    self.width(),
                    self.height(),
                    image::ExtendedColorType::Rgb8,
                )?;
            }
        }
        Ok(bytes)
    }
}

/// Composite premultiplied RGBA over opaque white and drop alpha
fn flatten_on_white(premultiplied: &[u8]) -> Vec<u8> {
    premultiplied
        .chunks_exact(4)
        .flat_map(|px| {
            let under = 255 - px[3];
            [
                px[0].saturating_add(under),
                px[1].saturating_add(under),
                px[2].saturating_add(under),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    fn assert_close(actual: Option<Color32>, expected: Color32) {
        let actual = actual.unwrap();
        let near = actual
            .to_array()
            .iter()
            .zip(expected.to_array())
            .all(|(a, e)| a.abs_diff(e) <= 2);
        assert!(near, "{actual:?} is not close to {expected:?}");
    }

    #[test]
    fn test_acquire_rejects_bad_sizes() {
        assert!(matches!(
            RasterSurface::acquire(0, 10, 100),
            Err(ExportError::RenderSurfaceUnavailable(_))
        ));
        assert!(matches!(
            RasterSurface::acquire(101, 10, 100),
            Err(ExportError::RenderSurfaceUnavailable(_))
        ));
        assert!(matches!(
            RasterSurface::acquire(70_000, 10, 100_000),
            Err(ExportError::RenderSurfaceUnavailable(_))
        ));
        assert!(RasterSurface::acquire(100, 100, 100).is_ok());
    }

    #[test]
    fn test_rect_covers_its_box() {
        let mut surface = RasterSurface::acquire(20, 20, 100).unwrap();
        surface.fill(Color32::WHITE);
        surface.draw_rect(&Placement::at(pos2(5.0, 5.0)), vec2(10.0, 4.0), 0.0, Color32::RED);
        surface.flush();
        assert_close(surface.pixel(5, 5), Color32::RED);
        assert_close(surface.pixel(14, 8), Color32::RED);
        assert_close(surface.pixel(15, 8), Color32::WHITE);
        assert_close(surface.pixel(4, 5), Color32::WHITE);
    }

    #[test]
    fn test_drawing_is_invisible_until_flushed() {
        let mut surface = RasterSurface::acquire(4, 4, 100).unwrap();
        surface.fill(Color32::BLACK);
        assert_eq!(surface.pixel(1, 1), Some(Color32::TRANSPARENT));
        surface.flush();
        assert_close(surface.pixel(1, 1), Color32::BLACK);
    }

    #[test]
    fn test_ellipse_leaves_corners() {
        let mut surface = RasterSurface::acquire(20, 20, 100).unwrap();
        surface.draw_ellipse(&Placement::at(pos2(0.0, 0.0)), vec2(20.0, 20.0), Color32::BLUE);
        surface.flush();
        assert_close(surface.pixel(10, 10), Color32::BLUE);
        assert_eq!(surface.pixel(0, 0), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn test_rotation_turns_about_centre() {
        let mut surface = RasterSurface::acquire(40, 40, 100).unwrap();
        let placement = Placement {
            position: pos2(10.0, 18.0),
            scale: vec2(1.0, 1.0),
            angle: 90.0,
        };
        // A 20x4 bar turned upright around (20, 20)
        surface.draw_rect(&placement, vec2(20.0, 4.0), 0.0, Color32::RED);
        surface.flush();
        assert_close(surface.pixel(19, 12), Color32::RED);
        assert_eq!(surface.pixel(12, 19), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn test_half_transparent_blend() {
        let mut surface = RasterSurface::acquire(1, 1, 10).unwrap();
        surface.fill(Color32::WHITE);
        surface.draw_rect(
            &Placement::at(pos2(0.0, 0.0)),
            vec2(1.0, 1.0),
            0.0,
            Color32::from_rgba_unmultiplied(0, 0, 0, 128),
        );
        surface.flush();
        let px = surface.pixel(0, 0).unwrap();
        assert_eq!(px.a(), 255);
        assert!((124..=130).contains(&px.r()));
    }

    #[test]
    fn test_bitmap_scaled() {
        let image = RasterImage::filled(2, 2, Color32::GREEN);
        let mut surface = RasterSurface::acquire(10, 10, 100).unwrap();
        surface.draw_bitmap(&Placement::at(pos2(1.0, 1.0)).with_scale(2.0), &image);
        surface.flush();
        assert_close(surface.pixel(1, 1), Color32::GREEN);
        assert_close(surface.pixel(4, 4), Color32::GREEN);
        assert_eq!(surface.pixel(6, 6), Some(Color32::TRANSPARENT));
    }

    #[test]
    fn test_text_leaves_ink() {
        let mut surface = RasterSurface::acquire(120, 40, 200).unwrap();
        surface.fill(Color32::WHITE);
        let text = TextShape {
            content: "HHHH".to_owned(),
            ..TextShape::default()
        };
        surface.draw_text(&Placement::at(pos2(0.0, 0.0)), &text, Color32::BLACK);
        surface.flush();
        let buffer = surface.pixel_buffer();
        let dark = buffer.pixels().chunks_exact(4).filter(|px| px[0] < 128).count();
        assert!(dark > 20);
    }

    #[test]
    fn test_png_encodes() {
        let mut surface = RasterSurface::acquire(4, 3, 100).unwrap();
        surface.fill(Color32::WHITE);
        surface.flush();
        let bytes = surface.encode(ExportFormat::Png, 1.0).unwrap();
        let decoded = RasterImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        assert_eq!(decoded.pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_jpeg_flattens_translucency_onto_white() {
        assert_eq!(flatten_on_white(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(flatten_on_white(&[64, 0, 0, 128]), vec![191, 127, 127]);
        assert_eq!(flatten_on_white(&[10, 20, 30, 255]), vec![10, 20, 30]);

        let mut surface = RasterSurface::acquire(8, 8, 100).unwrap();
        surface.fill(Color32::from_rgba_unmultiplied(0, 0, 0, 0));
        surface.flush();
        let bytes = surface.encode(ExportFormat::Jpeg, 0.9).unwrap();
        let decoded = RasterImage::decode(&bytes).unwrap();
        let [r, g, b, _] = decoded.pixel(4, 4).unwrap();
        assert!(r > 240 && g > 240 && b > 240);
    }
}
