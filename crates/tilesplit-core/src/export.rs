//! PDF export
//!
//! Builds a multi-page document with one tile per page. Each tile is scaled to
//! the largest rectangle that fits the printable area without distortion and
//! centered on the page.
//!
//! Layout is computed in millimetres with a top-left origin and converted to
//! PDF points (bottom-left origin) only when the content stream is written.

use crate::config::ExportConfig;
use crate::error::TileSplitError;
use crate::render::Surface;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::io::{Cursor, Write};

/// PDF points per millimetre
pub const MM_TO_PT: f64 = 72.0 / 25.4;

/// Resource name of the tile image on every page
const IMAGE_NAME: &str = "Im0";

/// Where an image lands on a page, in page units from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fit an image into the printable area of a page, preserving aspect ratio, centered
pub fn fit_to_page(
    page_width: f64,
    page_height: f64,
    margin: f64,
    image_width: f64,
    image_height: f64,
) -> Placement {
    let printable_width = page_width - 2.0 * margin;
    let printable_height = page_height - 2.0 * margin;
    let image_ratio = image_width / image_height;

    let (width, height) = if printable_width / printable_height > image_ratio {
        // Height binds
        (printable_height * image_ratio, printable_height)
    } else {
        (printable_width, printable_width / image_ratio)
    };

    Placement {
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}

/// A finished PDF ready for download
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub page_count: u32,
}

/// Export rendered surfaces, in order, one per page
pub fn export_document(
    surfaces: &[&Surface],
    config: &ExportConfig,
) -> Result<ExportedDocument, TileSplitError> {
    let pages = surfaces
        .iter()
        .map(|surface| surface.to_png())
        .collect::<Result<Vec<_>, _>>()?;

    export_png_pages(&pages, config)
}

/// Export PNG images, in order, one per page
pub fn export_png_pages(
    pages: &[Vec<u8>],
    config: &ExportConfig,
) -> Result<ExportedDocument, TileSplitError> {
    if pages.is_empty() {
        return Err(TileSplitError::EmptyExport);
    }
    config.validate()?;

    let (page_width, page_height) = config.page_dimensions();
    let media_box = Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real((page_width * MM_TO_PT) as f32),
        Object::Real((page_height * MM_TO_PT) as f32),
    ]);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_ids = Vec::with_capacity(pages.len());

    for (index, png_bytes) in pages.iter().enumerate() {
        let raster = RasterImage::from_png(png_bytes)
            .map_err(|e| TileSplitError::Encode(format!("page {}: {}", index + 1, e)))?;

        let placement = fit_to_page(
            page_width,
            page_height,
            config.margin_mm,
            raster.width as f64,
            raster.height as f64,
        );

        let image_id = add_image(&mut doc, &raster)?;
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            page_content(&placement, page_height)?,
        ));

        let xobjects = Dictionary::from_iter(vec![(IMAGE_NAME, Object::Reference(image_id))]);
        let resources = Dictionary::from_iter(vec![("XObject", Object::Dictionary(xobjects))]);

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", media_box.clone()),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let page_tree = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let info = Dictionary::from_iter(vec![(
        "Producer",
        Object::String(b"tilesplit".to_vec(), lopdf::StringFormat::Literal),
    )]);
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| TileSplitError::Encode(format!("Save failed: {}", e)))?;

    tracing::info!(
        "Exported {} pages to {} ({} bytes)",
        page_ids.len(),
        config.filename,
        bytes.len()
    );

    Ok(ExportedDocument {
        bytes,
        filename: config.filename.clone(),
        page_count: page_ids.len() as u32,
    })
}

/// Content stream drawing the page image at `placement`
fn page_content(placement: &Placement, page_height: f64) -> Result<Vec<u8>, TileSplitError> {
    let width = placement.width * MM_TO_PT;
    let height = placement.height * MM_TO_PT;
    let x = placement.x * MM_TO_PT;
    // Flip to PDF's bottom-left origin
    let y = (page_height - placement.y - placement.height) * MM_TO_PT;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width as f32),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(height as f32),
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };

    content
        .encode()
        .map_err(|e| TileSplitError::Encode(format!("Content stream: {}", e)))
}

/// Add an RGB image XObject, with a soft mask when the raster has transparency
fn add_image(doc: &mut Document, raster: &RasterImage) -> Result<ObjectId, TileSplitError> {
    let mut dict = image_dict(raster.width, raster.height, b"DeviceRGB");

    if let Some(alpha) = &raster.alpha {
        let mask = Stream::new(
            image_dict(raster.width, raster.height, b"DeviceGray"),
            deflate(alpha)?,
        )
        .with_compression(false);
        let mask_id = doc.add_object(mask);
        dict.set("SMask", Object::Reference(mask_id));
    }

    let stream = Stream::new(dict, deflate(&raster.rgb)?).with_compression(false);
    Ok(doc.add_object(stream))
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(b"FlateDecode".to_vec())),
    ])
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, TileSplitError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| TileSplitError::Encode(format!("Deflate: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| TileSplitError::Encode(format!("Deflate: {}", e)))
}

/// 8-bit pixels split into color and alpha planes
#[derive(Debug)]
struct RasterImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    /// Present only when some pixel is not fully opaque
    alpha: Option<Vec<u8>>,
}

impl RasterImage {
    fn from_png(bytes: &[u8]) -> Result<Self, String> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::normalize_to_color8());

        let mut reader = decoder.read_info().map_err(|e| e.to_string())?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf).map_err(|e| e.to_string())?;
        let data = &buf[..frame.buffer_size()];

        if frame.width == 0 || frame.height == 0 {
            return Err("image has no pixels".into());
        }

        let pixel_count = frame.width as usize * frame.height as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);

        match frame.color_type {
            png::ColorType::Rgba => {
                for px in data.chunks_exact(4) {
                    rgb.extend_from_slice(&px[..3]);
                    alpha.push(px[3]);
                }
            }
            png::ColorType::Rgb => rgb.extend_from_slice(data),
            png::ColorType::GrayscaleAlpha => {
                for px in data.chunks_exact(2) {
                    rgb.extend_from_slice(&[px[0], px[0], px[0]]);
                    alpha.push(px[1]);
                }
            }
            png::ColorType::Grayscale => {
                for &v in data {
                    rgb.extend_from_slice(&[v, v, v]);
                }
            }
            other => return Err(format!("unsupported PNG color type {:?}", other)),
        }

        let alpha = if alpha.iter().any(|&a| a != u8::MAX) {
            Some(alpha)
        } else {
            None
        };

        Ok(Self {
            width: frame.width,
            height: frame.height,
            rgb,
            alpha,
        })
    }
}
