//! Single-page PDF output.
//!
//! The page is sized so the image prints at the requested DPI: each pixel
//! covers `72 / dpi` points. The raster is embedded as an image XObject and
//! drawn to fill the page.

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Page size in points for an image of `pixels` at `dpi`.
pub fn page_extent(pixels: u32, dpi: u32) -> f32 {
    pixels as f32 * POINTS_PER_INCH / dpi as f32
}

/// Write an 8-bit gray or RGB image as a one-page PDF.
pub fn write_pdf(image: &DynamicImage, dpi: u32) -> Result<Vec<u8>, String> {
    let (color_space, samples) = match image {
        DynamicImage::ImageLuma8(buf) => ("DeviceGray", buf.as_raw().clone()),
        DynamicImage::ImageRgb8(buf) => ("DeviceRGB", buf.as_raw().clone()),
        other => return Err(format!("unsupported PDF pixel layout {:?}", other.color())),
    };

    let (width, height) = (image.width(), image.height());
    let page_width = page_extent(width, dpi);
    let page_height = page_extent(height, dpi);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        },
        samples,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    page_width.into(),
                    0.into(),
                    0.into(),
                    page_height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| e.to_string())?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), page_width.into(), page_height.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| e.to_string())?;
    Ok(out)
}
