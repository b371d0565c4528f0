use serde::{Deserialize, Serialize};

use super::RenderError;

/// Remaining content shorter than this (in mm) does not start a new page.
const EPSILON_MM: f64 = 0.01;

/// Physical page size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 210.0,
        height: 297.0,
    };

    pub fn validate(&self) -> Result<(), RenderError> {
        let valid = self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0;
        if !valid {
            return Err(RenderError::InvalidPageSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Where the full statement image sits on one page.
///
/// Every page shows the same image at full page width; `offset` is the
/// distance in mm from the top of the page to the top of the image, so
/// later pages use negative offsets to bring lower content into view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub index: usize,
    pub offset: f64,
    pub image_height: f64,
}

/// Height in mm of a `raster_width` x `raster_height` image drawn at `page_width` mm wide.
pub fn scaled_height(raster_width: u32, raster_height: u32, page_width: f64) -> f64 {
    if raster_width == 0 {
        return 0.0;
    }
    f64::from(raster_height) * page_width / f64::from(raster_width)
}

/// Slice a tall raster into page-sized windows.
///
/// The first page shows the top of the image. Each further page moves the
/// image up by one page height, until less than [`EPSILON_MM`] is left.
/// Content no taller than a page yields exactly one slice.
pub fn paginate(raster_width: u32, raster_height: u32, page: PageSize) -> Vec<PageSlice> {
    let image_height = scaled_height(raster_width, raster_height, page.width);
    let mut slices = vec![PageSlice {
        index: 0,
        offset: 0.0,
        image_height,
    }];

    if page.height.is_nan() || page.height <= 0.0 {
        return slices;
    }

    let mut height_left = image_height - page.height;
    while height_left > EPSILON_MM {
        slices.push(PageSlice {
            index: slices.len(),
            offset: height_left - image_height,
            image_height,
        });
        height_left -= page.height;
    }

    slices
}
