use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};

use super::paginate::{PageSize, PageSlice};
use super::raster::Surface;

const MM_TO_PT: f64 = 72.0 / 25.4;
const COMPRESSION_LEVEL: u8 = 6;

/// One band of the statement raster, compressed and ready to embed.
pub struct EncodedBand {
    /// Sheet row of the band's first pixel row
    pub top: u32,
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

/// Compress a rendered band so its surface can be dropped.
pub fn encode_band(surface: &Surface) -> EncodedBand {
    EncodedBand {
        top: surface.top(),
        width: surface.width(),
        height: surface.height(),
        data: compress_to_vec_zlib(surface.image().as_raw(), COMPRESSION_LEVEL),
    }
}

/// Assemble a PDF that shows the banded raster once per slice.
///
/// Each band is embedded a single time as a compressed image. Every page
/// places the bands it overlaps at full page width, shifted by the slice
/// offset, so together they show the slice of the whole sheet. The page's
/// media box clips whatever falls outside it.
pub fn assemble(
    bands: &[EncodedBand],
    raster_width: u32,
    slices: &[PageSlice],
    page: PageSize,
    title: &str,
) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let info_id = Ref::new(3);
    let image_ids: Vec<Ref> = (0..bands.len()).map(|i| Ref::new(4 + i as i32)).collect();
    let first_page = 4 + bands.len() as i32;
    // Each page takes two ids: the page object and its content stream
    let page_ids: Vec<Ref> = (0..slices.len())
        .map(|i| Ref::new(first_page + 2 * i as i32))
        .collect();
    let names: Vec<String> = (1..=bands.len()).map(|i| format!("Im{}", i)).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(slices.len() as i32);

    for (band, image_id) in bands.iter().zip(&image_ids) {
        let mut image = pdf.image_xobject(*image_id, &band.data);
        image.filter(Filter::FlateDecode);
        image.width(band.width as i32);
        image.height(band.height as i32);
        image.color_space().device_rgb();
        image.bits_per_component(8);
        image.finish();
    }

    let mm_per_pixel = if raster_width == 0 {
        0.0
    } else {
        page.width / f64::from(raster_width)
    };
    let page_width = (page.width * MM_TO_PT) as f32;
    let page_height = (page.height * MM_TO_PT) as f32;

    for (slice, page_id) in slices.iter().zip(&page_ids) {
        let content_id = Ref::new(page_id.get() + 1);

        // Top edge and height in mm of every band this page overlaps
        let visible: Vec<(usize, f64, f64)> = bands
            .iter()
            .enumerate()
            .map(|(i, band)| {
                let top = slice.offset + f64::from(band.top) * mm_per_pixel;
                (i, top, f64::from(band.height) * mm_per_pixel)
            })
            .filter(|&(_, top, height)| top < page.height && top + height > 0.0)
            .collect();

        let mut pdf_page = pdf.page(*page_id);
        pdf_page.media_box(Rect::new(0.0, 0.0, page_width, page_height));
        pdf_page.parent(page_tree_id);
        pdf_page.contents(content_id);
        {
            let mut resources = pdf_page.resources();
            let mut x_objects = resources.x_objects();
            for &(i, _, _) in &visible {
                x_objects.pair(Name(names[i].as_bytes()), image_ids[i]);
            }
        }
        pdf_page.finish();

        let mut content = Content::new();
        for &(i, top, height) in &visible {
            // PDF space grows upwards from the bottom left corner
            let height = (height * MM_TO_PT) as f32;
            let bottom = page_height - (top * MM_TO_PT) as f32 - height;

            content.save_state();
            content.transform([page_width, 0.0, 0.0, height, 0.0, bottom]);
            content.x_object(Name(names[i].as_bytes()));
            content.restore_state();
        }
        pdf.stream(content_id, &content.finish());
    }

    pdf.document_info(info_id)
        .title(TextStr(title))
        .producer(TextStr(concat!("khata ", env!("CARGO_PKG_VERSION"))));

    pdf.finish()
}
