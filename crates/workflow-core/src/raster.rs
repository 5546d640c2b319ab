//! Embedding page rasters as PDF image XObjects
//!
//! PNG data is decoded to 8-bit samples and re-encoded with Flate, with any
//! alpha channel split out into an `/SMask`. JPEG data is passed through
//! unchanged as `DCTDecode`.

use std::io::{Cursor, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::WorkflowError;
use crate::model::{RasterFormat, RasterImage};

/// Decoded samples ready for a Flate image stream
struct DecodedImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    color: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// Pixel dimensions read from the image header, without decoding samples
pub fn image_dimensions(format: RasterFormat, data: &[u8]) -> Result<(u32, u32), WorkflowError> {
    match format {
        RasterFormat::Png => {
            let decoder = png::Decoder::new(Cursor::new(data));
            let reader = decoder
                .read_info()
                .map_err(|e| WorkflowError::Raster(format!("Invalid PNG: {}", e)))?;
            let info = reader.info();
            Ok((info.width, info.height))
        }
        RasterFormat::Jpeg => {
            let header = jpeg_header(data)?;
            Ok((header.width, header.height))
        }
    }
}

/// Add `image` (and its soft mask, if any) to `doc` and return the image id
pub(crate) fn embed_image(doc: &mut Document, image: &RasterImage) -> Result<ObjectId, WorkflowError> {
    match image.format {
        RasterFormat::Png => embed_png(doc, &image.data),
        RasterFormat::Jpeg => embed_jpeg(doc, &image.data),
    }
}

fn embed_png(doc: &mut Document, data: &[u8]) -> Result<ObjectId, WorkflowError> {
    let decoded = decode_png(data)?;

    let mut dict = image_dict(decoded.width, decoded.height, decoded.color_space);
    dict.set("Filter", "FlateDecode");

    if let Some(alpha) = decoded.alpha {
        let mut mask = image_dict(decoded.width, decoded.height, "DeviceGray");
        mask.set("Filter", "FlateDecode");
        let mask_stream = Stream::new(mask, deflate(&alpha)?).with_compression(false);
        let mask_id = doc.add_object(mask_stream);
        dict.set("SMask", Object::Reference(mask_id));
    }

    let stream = Stream::new(dict, deflate(&decoded.color)?).with_compression(false);
    Ok(doc.add_object(stream))
}

fn embed_jpeg(doc: &mut Document, data: &[u8]) -> Result<ObjectId, WorkflowError> {
    let header = jpeg_header(data)?;
    let color_space = match header.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        n => {
            return Err(WorkflowError::Raster(format!(
                "Unsupported JPEG component count: {}",
                n
            )))
        }
    };

    let mut dict = image_dict(header.width, header.height, color_space);
    dict.set("Filter", "DCTDecode");
    if header.components == 4 {
        // Adobe CMYK JPEGs are stored inverted
        let decode: Vec<Object> = [1, 0, 1, 0, 1, 0, 1, 0]
            .into_iter()
            .map(Object::Integer)
            .collect();
        dict.set("Decode", decode);
    }

    let stream = Stream::new(dict, data.to_vec()).with_compression(false);
    Ok(doc.add_object(stream))
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", "XObject");
    dict.set("Subtype", "Image");
    dict.set("Width", width as i64);
    dict.set("Height", height as i64);
    dict.set("ColorSpace", color_space);
    dict.set("BitsPerComponent", 8);
    dict
}

fn decode_png(data: &[u8]) -> Result<DecodedImage, WorkflowError> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| WorkflowError::Raster(format!("Invalid PNG: {}", e)))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| WorkflowError::Raster(format!("Failed to decode PNG: {}", e)))?;
    let samples = &buf[..frame.buffer_size()];

    let (color_space, channels, has_alpha) = match frame.color_type {
        png::ColorType::Grayscale => ("DeviceGray", 1, false),
        png::ColorType::GrayscaleAlpha => ("DeviceGray", 2, true),
        png::ColorType::Rgb => ("DeviceRGB", 3, false),
        png::ColorType::Rgba => ("DeviceRGB", 4, true),
        png::ColorType::Indexed => {
            return Err(WorkflowError::Raster(
                "Indexed PNG was not expanded".into(),
            ))
        }
    };

    let (color, alpha) = if has_alpha {
        let color_channels = channels - 1;
        let pixels = samples.len() / channels;
        let mut color = Vec::with_capacity(pixels * color_channels);
        let mut alpha = Vec::with_capacity(pixels);
        for px in samples.chunks_exact(channels) {
            color.extend_from_slice(&px[..color_channels]);
            alpha.push(px[color_channels]);
        }
        // Fully opaque images don't need a mask
        let alpha = if alpha.iter().all(|&a| a == u8::MAX) {
            None
        } else {
            Some(alpha)
        };
        (color, alpha)
    } else {
        (samples.to_vec(), None)
    };

    Ok(DecodedImage {
        width: frame.width,
        height: frame.height,
        color_space,
        color,
        alpha,
    })
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, WorkflowError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
}

/// Walk JPEG markers up to the first start-of-frame segment
fn jpeg_header(data: &[u8]) -> Result<JpegHeader, WorkflowError> {
    let invalid = || WorkflowError::Raster("Invalid JPEG data".into());

    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(invalid());
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return Err(invalid());
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let segment = data.get(pos + 4..pos + 2 + length).ok_or_else(invalid)?;
            if segment.len() < 6 {
                return Err(invalid());
            }
            return Ok(JpegHeader {
                height: u16::from_be_bytes([segment[1], segment[2]]) as u32,
                width: u16::from_be_bytes([segment[3], segment[4]]) as u32,
                components: segment[5],
            });
        }
        pos += 2 + length;
    }

    Err(invalid())
}
