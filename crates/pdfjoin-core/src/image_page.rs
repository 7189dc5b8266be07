//! Image to single-page PDF conversion
//!
//! The page is exactly the size of the (possibly downscaled) image in points
//! and the image covers it from the origin. Opaque images are embedded as
//! JPEG (`DCTDecode`); images with alpha are embedded losslessly as PNG
//! scanlines (`FlateDecode` with PNG predictors) plus a soft mask.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView};
use lopdf::{Dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PdfJoinError;

/// Name of the image XObject in the page resources
const IMAGE_NAME: &str = "Im0";

/// Size and compression settings for image pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Longest side, in pixels, an image may keep
    pub max_dimension: u32,
    /// JPEG quality (1-100) for opaque images
    pub jpeg_quality: u8,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            jpeg_quality: 80,
        }
    }
}

/// Encoded image ready to become an XObject
struct EncodedImage {
    stream: Stream,
    soft_mask: Option<Stream>,
}

/// Convert an encoded image (PNG, JPEG, ...) into a one-page PDF
pub fn image_to_page(bytes: &[u8], options: &AssemblyOptions) -> Result<Vec<u8>, PdfJoinError> {
    let img =
        image::load_from_memory(bytes).map_err(|e| PdfJoinError::ImageDecode(e.to_string()))?;

    let (src_width, src_height) = img.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(PdfJoinError::ImageDecode(format!(
            "image has no pixels ({}x{})",
            src_width, src_height
        )));
    }

    let img = fit_within(img, options.max_dimension);
    let (width, height) = img.dimensions();

    let encoded = if img.color().has_alpha() {
        encode_lossless(&img)?
    } else {
        encode_lossy(&img, options.jpeg_quality)?
    };

    debug!(
        "Image {}x{} -> page {}x{} ({}, {} bytes)",
        src_width,
        src_height,
        width,
        height,
        if encoded.soft_mask.is_some() { "flate+smask" } else { "jpeg" },
        encoded.stream.content.len()
    );

    build_single_page(encoded, width, height)
}

/// Downscale so the longer side is at most `max_dimension`; never upscale
fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if max_dimension == 0 || width.max(height) <= max_dimension {
        return img;
    }
    let (new_width, new_height) = scaled_dimensions(width, height, max_dimension);
    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Dimensions with the longer side equal to `max_dimension`, aspect kept
pub(crate) fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let scale = |side: u32, longest: u32| {
        ((side as f64 * max_dimension as f64 / longest as f64).round() as u32).max(1)
    };
    if width >= height {
        (max_dimension, scale(height, width))
    } else {
        (scale(width, height), max_dimension)
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

fn encode_lossy(img: &DynamicImage, quality: u8) -> Result<EncodedImage, PdfJoinError> {
    let (width, height) = img.dimensions();
    let quality = quality.clamp(1, 100);

    let (raw, color_type, color_space) = if img.color().has_color() {
        (img.to_rgb8().into_raw(), ExtendedColorType::Rgb8, "DeviceRGB")
    } else {
        (img.to_luma8().into_raw(), ExtendedColorType::L8, "DeviceGray")
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(&raw, width, height, color_type)
        .map_err(|e| PdfJoinError::ImageEncode(e.to_string()))?;

    let mut dict = image_dict(width, height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    Ok(EncodedImage {
        stream: Stream::new(dict, jpeg).with_compression(false),
        soft_mask: None,
    })
}

fn encode_lossless(img: &DynamicImage) -> Result<EncodedImage, PdfJoinError> {
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    let has_color = img.color().has_color();

    let pixels = (width as usize) * (height as usize);
    let mut color = Vec::with_capacity(pixels * if has_color { 3 } else { 1 });
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        if has_color {
            color.extend_from_slice(&[r, g, b]);
        } else {
            color.push(r);
        }
        alpha.push(a);
    }

    let (png_color, channels, color_space) = if has_color {
        (png::ColorType::Rgb, 3, "DeviceRGB")
    } else {
        (png::ColorType::Grayscale, 1, "DeviceGray")
    };

    let color_data = png_scanlines(&color, width, height, png_color)?;
    let mut dict = image_dict(width, height, color_space);
    set_flate_predictor(&mut dict, channels, width);

    let alpha_data = png_scanlines(&alpha, width, height, png::ColorType::Grayscale)?;
    let mut mask_dict = image_dict(width, height, "DeviceGray");
    set_flate_predictor(&mut mask_dict, 1, width);

    Ok(EncodedImage {
        stream: Stream::new(dict, color_data).with_compression(false),
        soft_mask: Some(Stream::new(mask_dict, alpha_data).with_compression(false)),
    })
}

fn set_flate_predictor(dict: &mut Dictionary, colors: i64, width: u32) {
    let mut parms = Dictionary::new();
    parms.set("Predictor", Object::Integer(15));
    parms.set("Colors", Object::Integer(colors));
    parms.set("BitsPerComponent", Object::Integer(8));
    parms.set("Columns", Object::Integer(width as i64));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    dict.set("DecodeParms", Object::Dictionary(parms));
}

/// PNG-encode at best compression with adaptive filtering and return the
/// zlib stream of its IDAT chunks, which PDF reads as Flate + PNG predictors
fn png_scanlines(
    data: &[u8],
    width: u32,
    height: u32,
    color: png::ColorType,
) -> Result<Vec<u8>, PdfJoinError> {
    let encode_err = |e: png::EncodingError| PdfJoinError::ImageEncode(e.to_string());

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(data).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
    }

    idat_payload(&out)
}

/// Concatenate the data of every IDAT chunk of a PNG file
fn idat_payload(png_bytes: &[u8]) -> Result<Vec<u8>, PdfJoinError> {
    const SIGNATURE_LEN: usize = 8;
    let truncated = || PdfJoinError::ImageEncode("truncated PNG chunk".to_string());

    let mut payload = Vec::new();
    let mut pos = SIGNATURE_LEN;
    while pos + 8 <= png_bytes.len() {
        let len_bytes: [u8; 4] = png_bytes[pos..pos + 4]
            .try_into()
            .map_err(|_| truncated())?;
        let len = u32::from_be_bytes(len_bytes) as usize;
        let kind = &png_bytes[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = data_start + len;
        if data_end + 4 > png_bytes.len() {
            return Err(truncated());
        }
        if kind == b"IDAT" {
            payload.extend_from_slice(&png_bytes[data_start..data_end]);
        }
        if kind == b"IEND" {
            break;
        }
        pos = data_end + 4;
    }

    if payload.is_empty() {
        return Err(PdfJoinError::ImageEncode("PNG has no image data".to_string()));
    }
    Ok(payload)
}

fn build_single_page(
    encoded: EncodedImage,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, PdfJoinError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let EncodedImage {
        mut stream,
        soft_mask,
    } = encoded;
    if let Some(mask) = soft_mask {
        let mask_id = doc.add_object(mask);
        stream.dict.set("SMask", Object::Reference(mask_id));
    }
    let image_id = doc.add_object(stream);

    // Scale the unit image square to the full page
    let content = format!(
        "q\n{} 0 0 {} 0 0 cm\n/{} Do\nQ\n",
        width, height, IMAGE_NAME
    );
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_NAME, Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width as i64),
            Object::Integer(height as i64),
        ]),
    );
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(page);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Count", Object::Integer(1));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfJoinError::OperationError(format!("Failed to save image page: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
pub(crate) mod testing {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    pub fn png_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    pub fn png_rgba(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            Rgba([200, 10, 10, if x % 2 == 0 { 255 } else { 64 }])
        });
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    pub fn jpeg_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([90, 120, 200]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
    }

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use flate2::read::ZlibDecoder;
    use lopdf::ObjectId;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn only_page(doc: &Document) -> ObjectId {
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        *pages.values().next().unwrap()
    }

    fn media_box(doc: &Document) -> Vec<i64> {
        let page = doc.get_dictionary(only_page(doc)).unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect()
    }

    fn image_stream(doc: &Document) -> &Stream {
        let page = doc.get_dictionary(only_page(doc)).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        doc.get_object(id).unwrap().as_stream().unwrap()
    }

    fn filter(stream: &Stream) -> Vec<u8> {
        stream.dict.get(b"Filter").unwrap().as_name().unwrap().to_vec()
    }

    #[test]
    fn test_large_opaque_image_is_downscaled_and_lossy() {
        let pdf = image_to_page(&jpeg_rgb(4000, 3000), &AssemblyOptions::default()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();

        assert_eq!(media_box(&doc), vec![0, 0, 2000, 1500]);
        let image = image_stream(&doc);
        assert_eq!(filter(image), b"DCTDecode".to_vec());
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 2000);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 1500);
        assert!(image.dict.get(b"SMask").is_err());
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let pdf = image_to_page(&png_rgb(300, 100), &AssemblyOptions::default()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(media_box(&doc), vec![0, 0, 300, 100]);
        // Opaque PNG input still goes lossy
        assert_eq!(filter(image_stream(&doc)), b"DCTDecode".to_vec());
    }

    #[test]
    fn test_image_fills_page() {
        let pdf = image_to_page(&png_rgb(640, 480), &AssemblyOptions::default()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let content = doc.get_page_content(only_page(&doc)).unwrap();
        let content = String::from_utf8_lossy(&content);
        assert!(content.contains("640 0 0 480 0 0 cm"), "content: {}", content);
        assert!(content.contains("/Im0 Do"));
    }

    #[test]
    fn test_alpha_image_is_lossless_with_soft_mask() {
        let pdf = image_to_page(&png_rgba(50, 20), &AssemblyOptions::default()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let image = image_stream(&doc);

        assert_eq!(filter(image), b"FlateDecode".to_vec());
        let parms = image.dict.get(b"DecodeParms").unwrap().as_dict().unwrap();
        assert_eq!(parms.get(b"Predictor").unwrap().as_i64().unwrap(), 15);
        assert_eq!(parms.get(b"Colors").unwrap().as_i64().unwrap(), 3);

        // One filter byte per scanline plus 3 samples per pixel
        let mut inflated = Vec::new();
        ZlibDecoder::new(image.content.as_slice())
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated.len(), 20 * (1 + 50 * 3));

        let mask_id = image.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        let mut alpha = Vec::new();
        ZlibDecoder::new(mask.content.as_slice())
            .read_to_end(&mut alpha)
            .unwrap();
        assert_eq!(alpha.len(), 20 * (1 + 50));
    }

    #[test]
    fn test_portrait_downscale_keeps_aspect() {
        assert_eq!(scaled_dimensions(1000, 3000, 2000), (667, 2000));
        assert_eq!(scaled_dimensions(4000, 3000, 2000), (2000, 1500));
        assert_eq!(scaled_dimensions(10_000, 1, 2000), (2000, 1));
    }

    #[test]
    fn test_undecodable_bytes_are_rejected() {
        let err = image_to_page(b"definitely not pixels", &AssemblyOptions::default()).unwrap_err();
        assert!(matches!(err, PdfJoinError::ImageDecode(_)));
        assert!(matches!(
            err.for_file("id.png"),
            PdfJoinError::InvalidImage { ref filename, .. } if filename == "id.png"
        ));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: AssemblyOptions = serde_json::from_str(r#"{"jpeg_quality": 60}"#).unwrap();
        assert_eq!(options.jpeg_quality, 60);
        assert_eq!(options.max_dimension, 2000);
    }
}
