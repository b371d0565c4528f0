use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};

use super::RenderError;
use super::layout::{Color, Element, GLYPH, Layout};

/// Tallest band drawn in one piece, in surface pixels.
pub const BAND_HEIGHT: u32 = 4096;

/// An off-screen RGB surface holding one horizontal band of a rendered
/// statement.
///
/// Drawing uses sheet coordinates: `top` is the sheet row of the band's
/// first pixel row, and anything outside the band is clipped.
pub struct Surface {
    image: RgbImage,
    top: u32,
}

impl Surface {
    /// Allocate a white surface, refusing sizes beyond `limit` on either
    /// axis or that the allocator can't provide.
    pub fn allocate(width: u32, height: u32, limit: u32) -> Result<Self, RenderError> {
        let unavailable = || RenderError::SurfaceUnavailable {
            width,
            height,
            limit,
        };

        if width == 0 || height == 0 || width > limit || height > limit {
            return Err(unavailable());
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(unavailable)?;
        let mut buffer: Vec<u8> = Vec::new();
        buffer.try_reserve_exact(len).map_err(|_| unavailable())?;
        buffer.resize(len, 0xff);

        let image = RgbImage::from_raw(width, height, buffer).ok_or_else(unavailable)?;
        Ok(Self { image, top: 0 })
    }

    /// Pixel size of the whole sheet at `scale` surface pixels per layout unit.
    ///
    /// Only the width is held to `limit`, since the height is split into bands.
    pub fn sheet_size(
        layout: &Layout,
        scale: u32,
        limit: u32,
    ) -> Result<(u32, u32), RenderError> {
        let scale = scale.max(1);
        let too_large = || RenderError::SurfaceUnavailable {
            width: layout.width.saturating_mul(scale),
            height: layout.height.saturating_mul(scale),
            limit,
        };
        let width = layout.width.checked_mul(scale).ok_or_else(too_large)?;
        let height = layout.height.checked_mul(scale).ok_or_else(too_large)?;
        if width == 0 || height == 0 || width > limit {
            return Err(too_large());
        }
        Ok((width, height))
    }

    /// Draw sheet rows `top..top + height` of a layout rendered at `scale`.
    /// The band is cut short at the bottom of the sheet.
    pub fn render_band(
        layout: &Layout,
        scale: u32,
        top: u32,
        height: u32,
        limit: u32,
    ) -> Result<Self, RenderError> {
        let scale = scale.max(1);
        let (width, sheet_height) = Self::sheet_size(layout, scale, limit)?;
        let height = height.min(sheet_height.saturating_sub(top));

        let mut surface = Self::allocate(width, height, limit)?;
        surface.top = top;

        for element in &layout.elements {
            match element {
                Element::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => surface.fill_rect(
                    x * scale,
                    y * scale,
                    width * scale,
                    height * scale,
                    *color,
                ),
                Element::Text {
                    x,
                    y,
                    size,
                    color,
                    text,
                } => surface.draw_text(x * scale, y * scale, size * scale, *color, text),
            }
        }

        Ok(surface)
    }

    /// Sheet row of the first pixel row.
    pub fn top(&self) -> u32 {
        self.top
    }

    /// Sheet row just below the last pixel row.
    pub fn bottom(&self) -> u32 {
        self.top + self.height()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The pixel at sheet coordinates `(x, y)`, if it lies in this band.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let row = y.checked_sub(self.top)?;
        self.image.get_pixel_checked(x, row).map(|p| p.0)
    }

    /// Fill a rectangle given in sheet coordinates, clipped to the band.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let x_end = x.saturating_add(width).min(self.width());
        let y_start = y.max(self.top);
        let y_end = y.saturating_add(height).min(self.bottom());

        for py in y_start..y_end {
            for px in x.min(x_end)..x_end {
                self.image.put_pixel(px, py - self.top, Rgb(color));
            }
        }
    }

    /// Draw a line of text with each font pixel `pixel` surface pixels wide.
    /// Characters without a glyph are drawn as `?`.
    pub fn draw_text(&mut self, x: u32, y: u32, pixel: u32, color: Color, text: &str) {
        let advance = GLYPH * pixel;
        if y >= self.bottom() || y.saturating_add(advance) <= self.top {
            return;
        }

        for (i, c) in text.chars().enumerate() {
            let origin = x.saturating_add((i as u32).saturating_mul(advance));
            if origin >= self.width() {
                break;
            }
            let Some(glyph) = glyph_for(c) else {
                continue;
            };

            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..8u32 {
                    // Bit 0 is the leftmost pixel
                    if bits & (1 << col) != 0 {
                        self.fill_rect(
                            origin.saturating_add(col * pixel),
                            y.saturating_add(row as u32 * pixel),
                            pixel,
                            pixel,
                            color,
                        );
                    }
                }
            }
        }
    }
}

fn glyph_for(c: char) -> Option<[u8; 8]> {
    if c == ' ' {
        return None;
    }
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
}
