//! Paginated document export: rasterise the laid-out report and cut it into A4 pages.
//!
//! Page breaks are hard cuts through the raster, not a reflow of the content.

use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use once_cell::sync::Lazy;
use resvg::{tiny_skia, usvg};
use tracing::debug;

use super::ExportError;
use crate::render::{layout_report, ReportCanvas, ReportView};

pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;
const PT_PER_MM: f64 = 72.0 / 25.4;

static FONT_DB: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// Placement of the full-width image on one page. `offset_mm` is the image's top edge
/// relative to the page top, so every page after the first has a negative offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTile {
    pub index: usize,
    pub offset_mm: f64,
}

/// Tile an image of `image_height_mm` (already scaled to page width) onto pages.
///
/// After the first page, each further page is added while height remains, with the
/// image offset set to the remaining height minus the full image height.
pub fn paginate(image_height_mm: f64, page_height_mm: f64) -> Vec<PageTile> {
    let mut tiles = vec![PageTile {
        index: 0,
        offset_mm: 0.0,
    }];
    if !(page_height_mm > 0.0) || !image_height_mm.is_finite() {
        return tiles;
    }
    let mut height_left = image_height_mm - page_height_mm;
    while height_left > 0.0 {
        tiles.push(PageTile {
            index: tiles.len(),
            offset_mm: height_left - image_height_mm,
        });
        height_left -= page_height_mm;
    }
    tiles
}

struct Raster {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl Raster {
    fn rows(&self, top: u32, bottom: u32) -> &[u8] {
        let stride = self.width as usize * 3;
        &self.rgb[top as usize * stride..bottom as usize * stride]
    }
}

fn rasterize(canvas: &ReportCanvas, scale: f32) -> Result<Raster, ExportError> {
    let mut options = usvg::Options::default();
    options.fontdb = Arc::clone(&FONT_DB);
    let tree = usvg::Tree::from_str(&canvas.svg, &options).map_err(|err| ExportError::Svg {
        message: err.to_string(),
    })?;

    let width = (canvas.width * f64::from(scale)).ceil().max(0.0) as u32;
    let height = (canvas.height * f64::from(scale)).ceil().max(0.0) as u32;
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(ExportError::Raster { width, height })?;
    pixmap.fill(tiny_skia::Color::from_rgba8(0xf8, 0xfa, 0xfc, 0xff));
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // Background is opaque, so premultiplied RGBA is plain RGB plus alpha.
    let rgb = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    Ok(Raster { width, height, rgb })
}

/// Render the view to a PDF. Identical views yield identical bytes.
pub fn render_pdf(view: &ReportView, scale: f32) -> Result<Vec<u8>, ExportError> {
    let canvas = layout_report(view)?;
    let raster = rasterize(&canvas, scale)?;
    let image_height_mm = A4_WIDTH_MM * f64::from(raster.height) / f64::from(raster.width);
    let tiles = paginate(image_height_mm, A4_HEIGHT_MM);
    debug!(
        width = raster.width,
        height = raster.height,
        pages = tiles.len(),
        "rasterised report"
    );
    assemble_pdf(&raster, image_height_mm, &tiles)
}

fn slice_top(tile: &PageTile, image_height_mm: f64, raster_height: u32) -> u32 {
    let fraction = (-tile.offset_mm / image_height_mm).clamp(0.0, 1.0);
    ((fraction * f64::from(raster_height)).round() as u32).min(raster_height)
}

fn assemble_pdf(
    raster: &Raster,
    image_height_mm: f64,
    tiles: &[PageTile],
) -> Result<Vec<u8>, ExportError> {
    let page_width = (A4_WIDTH_MM * PT_PER_MM) as f32;
    let page_height = (A4_HEIGHT_MM * PT_PER_MM) as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(tiles.len());

    for (idx, tile) in tiles.iter().enumerate() {
        let top = slice_top(tile, image_height_mm, raster.height);
        let bottom = tiles
            .get(idx + 1)
            .map(|next| slice_top(next, image_height_mm, raster.height))
            .unwrap_or(raster.height)
            .max(top);
        let page_id = add_page(&mut doc, pages_id, raster, top, bottom, page_width, page_height)?;
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|err| ExportError::Write {
        message: err.to_string(),
    })?;
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    raster: &Raster,
    top: u32,
    bottom: u32,
    page_width: f32,
    page_height: f32,
) -> Result<ObjectId, ExportError> {
    let rows = bottom - top;
    let mut operations = Vec::new();
    let mut resources = dictionary! {};

    if rows > 0 {
        let mut image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(raster.width),
                "Height" => i64::from(rows),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            raster.rows(top, bottom).to_vec(),
        );
        image.compress()?;
        let image_id = doc.add_object(image);
        resources.set("XObject", dictionary! { "Im0" => image_id });

        let drawn_height = page_width * rows as f32 / raster.width as f32;
        operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(drawn_height),
                    Object::Integer(0),
                    Object::Real(page_height - drawn_height),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ];
    }

    let content = Content { operations }.encode()?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_width),
            Object::Real(page_height),
        ],
        "Contents" => content_id,
        "Resources" => resources,
    }))
}
