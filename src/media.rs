//! Image decoding and GIF normalization.
//!
//! Every stored image ends up as a `.gif` on disk. Animated GIFs are kept as
//! uploaded; everything else is re-encoded into a single-frame GIF after OCR.

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::codecs::gif::{GifDecoder, GifEncoder};
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat, RgbaImage};

/// Decode raw image bytes into RGBA frames in playback order.
///
/// A GIF yields one frame per animation frame; any other supported format
/// yields exactly one. The result is never empty.
pub fn decode_frames(bytes: &[u8]) -> Result<Vec<RgbaImage>> {
    let format = image::guess_format(bytes).context("unrecognized image format")?;

    if format == ImageFormat::Gif {
        let decoder = GifDecoder::new(Cursor::new(bytes)).context("failed to open GIF stream")?;
        let frames = decoder
            .into_frames()
            .collect_frames()
            .context("failed to decode GIF frames")?;
        if frames.is_empty() {
            bail!("GIF contains no frames");
        }
        return Ok(frames.into_iter().map(|frame| frame.into_buffer()).collect());
    }

    let img = image::load_from_memory_with_format(bytes, format)
        .context("failed to decode image")?;
    Ok(vec![img.to_rgba8()])
}

/// Encode one frame as PNG, the format both OCR backends consume.
pub fn encode_png(frame: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("failed to encode frame as PNG")?;
    Ok(bytes)
}

/// Re-encode a decoded image as a single-frame GIF container.
pub fn encode_gif(bytes: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("failed to decode image for GIF conversion")?;
    encode_gif_frame(img)
}

fn encode_gif_frame(img: DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder
            .encode_frame(Frame::new(img.to_rgba8()))
            .context("failed to encode GIF frame")?;
    }
    Ok(out)
}

pub fn is_gif(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".gif")
}

/// Same stem, `.gif` extension, directory part untouched.
/// `2025-08-29/photo.jpeg` -> `2025-08-29/photo.gif`.
pub fn gif_sibling(filename: &str) -> String {
    let (dir, name) = match filename.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, filename),
    };
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    match dir {
        Some(dir) => format!("{dir}/{stem}.gif"),
        None => format!("{stem}.gif"),
    }
}

/// Reduce a client-supplied filename to a safe flat name: path components are
/// stripped and anything outside `[A-Za-z0-9._-]` becomes `_`. Falls back to
/// `"upload"` when nothing usable remains.
pub fn secure_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches(['.', '_']).to_string();
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_gif_round_trips() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        let png = encode_png(&img).unwrap();
        let gif = encode_gif(&png).unwrap();
        let frames = decode_frames(&gif).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].dimensions(), (4, 4));
    }

    #[test]
    fn png_bytes_decode_as_one_frame() {
        let img = RgbaImage::from_pixel(2, 3, image::Rgba([0, 0, 0, 255]));
        let png = encode_png(&img).unwrap();
        let frames = decode_frames(&png).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(decode_frames(b"not an image").is_err());
    }

    #[test]
    fn gif_extension_detection_is_case_insensitive() {
        assert!(is_gif("a.GIF"));
        assert!(is_gif("2025-08-29/cat.gif"));
        assert!(!is_gif("cat.png"));
    }

    #[test]
    fn gif_sibling_swaps_extension() {
        assert_eq!(gif_sibling("photo.jpeg"), "photo.gif");
        assert_eq!(gif_sibling("archive.tar.png"), "archive.tar.gif");
        assert_eq!(gif_sibling("noext"), "noext.gif");
        assert_eq!(gif_sibling("2025-08-29/photo.jpeg"), "2025-08-29/photo.gif");
    }

    #[test]
    fn secure_filename_strips_paths_and_odd_chars() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(secure_filename("..\\evil.gif"), "evil.gif");
        assert_eq!(secure_filename("???"), "upload");
    }
}
