use std::io::Write;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, Limits, Rgb, RgbImage};
use tempfile::NamedTempFile;

use crate::error::SuggestError;

const JPEG_QUALITY: u8 = 90;

/// Largest width or height the decoder will accept from an upload.
pub const MAX_DECODE_DIMENSION: u32 = 8192;
const MAX_DECODE_ALLOC_BYTES: u64 = 256 * 1024 * 1024;

pub const SUPPORTED_IMAGE_MIME_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/gif", "image/webp"];

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_mime_type(mime_type: &str) -> String {
    let lowered = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => lowered,
    }
}

pub fn is_supported_image_mime(mime_type: &str) -> bool {
    SUPPORTED_IMAGE_MIME_TYPES.contains(&normalize_mime_type(mime_type).as_str())
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".jpg",
    }
}

/// Checks the declared content type and the sniffed magic bytes, and returns
/// the MIME type the bytes actually carry.
pub fn validate_image_upload(
    bytes: &[u8],
    declared_mime_type: Option<&str>,
) -> Result<String, SuggestError> {
    if bytes.is_empty() {
        return Err(SuggestError::InvalidInput("image file is empty".to_string()));
    }

    if let Some(declared) = declared_mime_type.filter(|value| !value.trim().is_empty()) {
        if !is_supported_image_mime(declared) {
            return Err(SuggestError::InvalidInput(format!(
                "Unsupported file type: {}. Supported types: {}",
                declared,
                SUPPORTED_IMAGE_MIME_TYPES.join(", ")
            )));
        }
    }

    match detect_mime_type(bytes) {
        Some(detected) if is_supported_image_mime(&detected) => Ok(normalize_mime_type(&detected)),
        Some(detected) => Err(SuggestError::InvalidInput(format!(
            "Unsupported file type: {}. Supported types: {}",
            detected,
            SUPPORTED_IMAGE_MIME_TYPES.join(", ")
        ))),
        None => match declared_mime_type {
            Some(declared) if is_supported_image_mime(declared) => {
                Ok(normalize_mime_type(declared))
            }
            _ => Err(SuggestError::InvalidInput(
                "Could not determine the image type".to_string(),
            )),
        },
    }
}

/// An upload written to a temporary file for the lifetime of one request.
/// The file is removed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct StagedImage {
    file: NamedTempFile,
    mime_type: String,
}

impl StagedImage {
    pub fn stage(bytes: &[u8], mime_type: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("palette-upload-")
            .suffix(extension_for_mime(mime_type))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(StagedImage {
            file,
            mime_type: mime_type.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Image bytes ready to send to a vision model.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DECODE_DIMENSION);
    limits.max_image_height = Some(MAX_DECODE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC_BYTES);
    limits
}

/// Decodes the file, shrinks it to fit `max_dimension`, flattens
/// transparency onto white and re-encodes it as JPEG.
pub fn prepare_image_file(path: &Path, max_dimension: u32) -> Result<PreparedImage, SuggestError> {
    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    reader.limits(decode_limits());
    let image = reader
        .decode()
        .map_err(|err| SuggestError::UnreadableImage(err.to_string()))?;
    encode_for_upload(image, max_dimension)
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8 };
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}

fn encode_for_upload(image: DynamicImage, max_dimension: u32) -> Result<PreparedImage, SuggestError> {
    let image = if image.width() > max_dimension || image.height() > max_dimension {
        image.thumbnail(max_dimension, max_dimension)
    } else {
        image
    };
    let rgb = flatten_onto_white(&image);

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|err| SuggestError::UnreadableImage(err.to_string()))?;

    Ok(PreparedImage {
        bytes,
        mime_type: "image/jpeg".to_string(),
        width: rgb.width(),
        height: rgb.height(),
    })
}
