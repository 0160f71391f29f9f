//! Cover thumbnail rendering.

use image::codecs::jpeg::JpegEncoder;

use cs_core::config::ThumbnailConfig;

/// Bounding box and JPEG quality for rendered thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        ThumbnailConfig::default().into()
    }
}

impl From<ThumbnailConfig> for ThumbnailOptions {
    fn from(cfg: ThumbnailConfig) -> Self {
        Self {
            max_width: cfg.max_width.max(1),
            max_height: cfg.max_height.max(1),
            quality: cfg.quality.clamp(1, 100),
        }
    }
}

/// Downscale `cover` to fit the options' bounding box and re-encode as JPEG.
///
/// Anything the decoder cannot handle is returned unchanged so the caller
/// still has something to show.
pub fn render(cover: Vec<u8>, opts: &ThumbnailOptions) -> Vec<u8> {
    let img = match image::load_from_memory(&cover) {
        Ok(img) => img,
        Err(e) => {
            tracing::debug!(error = %e, "Cover is not decodable; returning raw bytes");
            return cover;
        }
    };

    let img = if img.width() > opts.max_width || img.height() > opts.max_height {
        img.thumbnail(opts.max_width, opts.max_height)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    let encoded = JpegEncoder::new_with_quality(&mut buffer, opts.quality).encode_image(&rgb);
    match encoded {
        Ok(()) => buffer,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode thumbnail; returning raw cover");
            cover
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn large_cover_is_downscaled_to_jpeg() {
        let opts = ThumbnailOptions {
            max_width: 30,
            max_height: 45,
            quality: 70,
        };
        let thumb = render(png(300, 450), &opts);
        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert!(decoded.width() <= 30);
        assert!(decoded.height() <= 45);
    }

    #[test]
    fn small_cover_keeps_its_size() {
        let thumb = render(png(10, 12), &ThumbnailOptions::default());
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 12));
    }

    #[test]
    fn undecodable_cover_is_returned_raw() {
        let raw = b"definitely not an image".to_vec();
        assert_eq!(render(raw.clone(), &ThumbnailOptions::default()), raw);
    }

    #[test]
    fn options_clamp_config() {
        let opts = ThumbnailOptions::from(ThumbnailConfig {
            max_width: 0,
            max_height: 10,
            quality: 0,
        });
        assert_eq!(opts.max_width, 1);
        assert_eq!(opts.quality, 1);
    }
}
