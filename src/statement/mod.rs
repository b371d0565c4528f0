//! Printable account statements.
//!
//! A statement goes through four stages: the [`Statement`] document model,
//! a [`Layout`] of positioned text and boxes, a raster drawn one [`Surface`]
//! band at a time, and a PDF showing that raster across as many pages as it
//! needs.

mod document;
mod error;
mod layout;
mod paginate;
mod pdf;
mod raster;

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{Customer, Transaction};

pub use document::*;
pub use error::RenderError;
pub use layout::{Element, Layout, layout_statement, wrap_text};
pub use paginate::{PageSize, PageSlice, paginate, scaled_height};
pub use raster::{BAND_HEIGHT, Surface};

/// Common browser canvas limit, used as the default surface cap.
pub const DEFAULT_MAX_SURFACE_DIMENSION: u32 = 32_767;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub page: PageSize,
    /// Surface pixels per layout unit
    pub raster_scale: u32,
    /// Largest width or height of any one surface band, in pixels
    pub max_surface_dimension: u32,
    pub currency_symbol: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page: PageSize::A4,
            raster_scale: 2,
            max_surface_dimension: DEFAULT_MAX_SURFACE_DIMENSION,
            currency_symbol: "Rs. ".to_string(),
        }
    }
}

/// A finished statement PDF.
#[derive(Debug, Clone)]
pub struct RenderedStatement {
    pub bytes: Vec<u8>,
    pub pages: usize,
    /// Number of raster bands embedded as images
    pub bands: usize,
    pub raster_width: u32,
    pub raster_height: u32,
}

/// Render a statement to PDF bytes.
pub fn render_pdf(
    statement: &Statement,
    options: &RenderOptions,
) -> Result<RenderedStatement, RenderError> {
    options.page.validate()?;

    let layout = layout_statement(statement);
    let scale = options.raster_scale;
    let limit = options.max_surface_dimension;
    let (width, height) = Surface::sheet_size(&layout, scale, limit)?;

    // Each band is compressed and dropped before the next is drawn
    let band_height = BAND_HEIGHT.min(limit);
    let mut bands = Vec::new();
    let mut top = 0;
    while top < height {
        let surface = Surface::render_band(&layout, scale, top, band_height, limit)?;
        top = surface.bottom();
        bands.push(pdf::encode_band(&surface));
    }

    let slices = paginate(width, height, options.page);
    debug!(
        width,
        height,
        bands = bands.len(),
        pages = slices.len(),
        "Rendered statement raster"
    );

    let bytes = pdf::assemble(&bands, width, &slices, options.page, &statement.title);
    Ok(RenderedStatement {
        bytes,
        pages: slices.len(),
        bands: bands.len(),
        raster_width: width,
        raster_height: height,
    })
}

/// File name for a customer's statement exported on `date`.
///
/// Runs of whitespace become a single `_`, as do characters that are not
/// allowed in file names on common platforms.
pub fn export_filename(customer_name: &str, date: NaiveDate) -> String {
    let mut stem = String::with_capacity(customer_name.len());
    let mut in_whitespace = false;

    for c in customer_name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                stem.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        let unsafe_char = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        stem.push(if unsafe_char || c.is_control() { '_' } else { c });
    }

    if stem.is_empty() {
        stem.push_str("customer");
    }
    format!("{}_transactions_{}.pdf", stem, date.format("%Y-%m-%d"))
}

/// Build, render and write one customer's statement into `dir`.
///
/// The file only appears once it is complete; an existing file with the
/// same name is replaced.
pub fn export_statement(
    customer: &Customer,
    transactions: &[&Transaction],
    dir: &Path,
    options: &RenderOptions,
    generated_at: NaiveDateTime,
) -> Result<PathBuf, RenderError> {
    let statement = build_statement(customer, transactions, options, generated_at);
    let rendered = render_pdf(&statement, options)?;

    let path = dir.join(export_filename(&customer.name, generated_at.date()));
    write_atomically(dir, &path, &rendered.bytes)?;
    debug!(path = %path.display(), pages = rendered.pages, "Wrote statement");
    Ok(path)
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}
