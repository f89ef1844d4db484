//! Preview encoding: painted surface → base64 PNG data URI.
//!
//! Page previews travel to the frontend as self-contained
//! `data:image/png;base64,…` URLs, so no file storage round-trip is needed
//! between generation and display. PNG is chosen over JPEG because the
//! rendered pages are mostly flat colour and text, where PNG both
//! compresses better and keeps letterforms crisp.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a painted page as a PNG data URI.
pub fn encode_preview(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("encoded preview → {} bytes base64", b64.len());

    Ok(format!("data:image/png;base64,{b64}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_surface() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let uri = encode_preview(&img).expect("encode should succeed");
        assert!(uri.starts_with("data:image/png;base64,"));
        // The payload decodes back to a PNG header.
        let b64 = uri.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(b64).expect("valid base64");
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
