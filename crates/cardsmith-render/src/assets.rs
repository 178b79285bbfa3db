//! Decoding encoded image files into pixel sources.

use crate::renderer::RenderResult;
use cardsmith_core::PixelSource;

/// Decode a PNG, JPEG or WebP file into a pixel source.
pub fn decode_pixel_source(bytes: &[u8]) -> RenderResult<PixelSource> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("decoded image {width}x{height}");
    Ok(PixelSource::from_rgba8(width, height, rgba.as_raw())?)
}

/// Like [`decode_pixel_source`], but an undecodable file yields `None` so the
/// image element can still be placed and render as an empty box.
pub fn decode_or_empty(bytes: &[u8]) -> Option<PixelSource> {
    match decode_pixel_source(bytes) {
        Ok(source) => Some(source),
        Err(err) => {
            log::warn!("image could not be decoded, leaving it empty: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::encode_png;
    use crate::renderer::Frame;

    #[test]
    fn test_decode_png() {
        let frame = Frame {
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        let png = encode_png(&frame).unwrap();
        let source = decode_pixel_source(&png).unwrap();
        assert_eq!((source.width(), source.height()), (2, 1));
        assert_eq!(&source.premul_bytes()[4..], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(decode_pixel_source(b"not an image").is_err());
        assert!(decode_or_empty(b"not an image").is_none());
    }
}
