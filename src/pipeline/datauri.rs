//! SVG data-URI parsing for the raster-conversion collaborator.
//!
//! The avatar builder submits its artwork as a `data:image/svg+xml` URI in
//! one of three encodings: `;base64,`, `;charset=utf-8,` (raw, possibly
//! percent-escaped), or bare percent-encoding. This module normalises all
//! three into SVG text and rejects anything else with a typed error before
//! the payload can reach the converter or any storage — a malformed input
//! is never persisted.
//!
//! The PNG-producing conversion itself lives behind [`RasterConverter`];
//! this crate only owns the input contract.

use crate::error::ConteurError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

/// Decode a `data:image/svg+xml` URI into SVG text.
pub fn decode_svg_data_uri(uri: &str) -> Result<String, ConteurError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| invalid("missing 'data:' scheme"))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' separator between header and payload"))?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or("");
    if media_type != "image/svg+xml" {
        return Err(invalid(&format!(
            "unsupported media type '{media_type}' (expected image/svg+xml)"
        )));
    }

    let mut is_base64 = false;
    for param in params {
        match param {
            "base64" => is_base64 = true,
            "charset=utf-8" | "charset=UTF-8" => {}
            other => return Err(invalid(&format!("unsupported parameter '{other}'"))),
        }
    }

    let svg = if is_base64 {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| invalid(&format!("bad base64 payload: {e}")))?;
        String::from_utf8(bytes).map_err(|_| invalid("base64 payload is not valid UTF-8"))?
    } else {
        urlencoding::decode(payload)
            .map_err(|_| invalid("percent-encoded payload is not valid UTF-8"))?
            .into_owned()
    };

    // Cheap sanity check: the payload must actually be an SVG document.
    let doc_start = svg.trim_start();
    if !(doc_start.starts_with("<svg") || doc_start.starts_with("<?xml")) {
        return Err(invalid("payload does not look like an SVG document"));
    }

    Ok(svg)
}

fn invalid(reason: &str) -> ConteurError {
    ConteurError::InvalidDataUri {
        reason: reason.to_string(),
    }
}

/// The raster-conversion collaborator: turns SVG text into a fixed-size PNG
/// on disk. Implementations live outside this crate; the seam exists so the
/// avatar pipeline and its tests can inject one.
pub trait RasterConverter: Send + Sync {
    /// Rasterise `svg` to a PNG at `output`, `width` x `height` pixels.
    fn svg_to_png(
        &self,
        svg: &str,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), ConteurError>;
}

/// Decode + convert in one step, so call sites cannot forget validation.
pub fn convert_data_uri(
    converter: &dyn RasterConverter,
    uri: &str,
    output: &Path,
    width: u32,
    height: u32,
) -> Result<(), ConteurError> {
    let svg = decode_svg_data_uri(uri)?;
    converter.svg_to_png(&svg, output, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><circle r="5"/></svg>"#;

    #[test]
    fn base64_payload_decodes() {
        let uri = format!("data:image/svg+xml;base64,{}", STANDARD.encode(SVG));
        assert_eq!(decode_svg_data_uri(&uri).unwrap(), SVG);
    }

    #[test]
    fn utf8_charset_payload_decodes() {
        let uri = format!("data:image/svg+xml;charset=utf-8,{SVG}");
        assert_eq!(decode_svg_data_uri(&uri).unwrap(), SVG);
    }

    #[test]
    fn percent_encoded_payload_decodes() {
        let uri = format!("data:image/svg+xml,{}", urlencoding::encode(SVG));
        assert_eq!(decode_svg_data_uri(&uri).unwrap(), SVG);
    }

    #[test]
    fn non_svg_media_type_rejected() {
        let uri = "data:image/png;base64,aGVsbG8=";
        let err = decode_svg_data_uri(uri).unwrap_err();
        assert!(err.to_string().contains("image/png"), "got: {err}");
    }

    #[test]
    fn missing_scheme_rejected() {
        assert!(decode_svg_data_uri("image/svg+xml;base64,xxx").is_err());
    }

    #[test]
    fn missing_comma_rejected() {
        assert!(decode_svg_data_uri("data:image/svg+xml;base64").is_err());
    }

    #[test]
    fn malformed_base64_rejected() {
        let err = decode_svg_data_uri("data:image/svg+xml;base64,!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, ConteurError::InvalidDataUri { .. }));
    }

    #[test]
    fn payload_that_is_not_svg_rejected() {
        let uri = format!("data:image/svg+xml;base64,{}", STANDARD.encode("hello"));
        let err = decode_svg_data_uri(&uri).unwrap_err();
        assert!(err.to_string().contains("SVG"), "got: {err}");
    }

    #[test]
    fn xml_prolog_accepted() {
        let doc = format!("<?xml version=\"1.0\"?>{SVG}");
        let uri = format!("data:image/svg+xml;charset=utf-8,{doc}");
        assert_eq!(decode_svg_data_uri(&uri).unwrap(), doc);
    }
}
