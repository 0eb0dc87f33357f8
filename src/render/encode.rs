//! Render tree encoding into WebP / GIF bytes.
//!
//! GIF output carries the full animation, truncated by the duration cap.
//! WebP output is a lossless still of the first frame; animated previews
//! are served as GIF.

use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::webp::WebPEncoder;
use image::{Delay, ExtendedColorType, Frame as GifFrame, RgbaImage};

use super::{EncodeError, EncodedImage, Frame, ImageFormat, RenderTree};

/// Encode a render tree into its wire format.
///
/// `max_duration_ms` caps the cumulative animation length; 0 means
/// unbounded.
pub fn encode(
    tree: &RenderTree,
    format: ImageFormat,
    max_duration_ms: u32,
) -> Result<EncodedImage, EncodeError> {
    if tree.frames.is_empty() {
        return Err(EncodeError::EmptyTree);
    }

    let data = match format {
        ImageFormat::Gif => encode_gif(tree, max_duration_ms)?,
        ImageFormat::Webp => encode_webp(tree)?,
    };

    Ok(EncodedImage { data, format })
}

/// Frames to include under the duration cap. Always keeps at least one.
fn capped_frames(tree: &RenderTree, max_duration_ms: u32) -> Vec<&Frame> {
    let mut frames = Vec::with_capacity(tree.frames.len());
    let mut total: u32 = 0;

    for frame in &tree.frames {
        if max_duration_ms > 0 && !frames.is_empty() && total >= max_duration_ms {
            break;
        }
        frames.push(frame);
        total = total.saturating_add(frame.delay_ms);
    }

    frames
}

fn encode_gif(tree: &RenderTree, max_duration_ms: u32) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite)?;

        for frame in capped_frames(tree, max_duration_ms) {
            let delay = Delay::from_numer_denom_ms(frame.delay_ms.max(1), 1);
            encoder.encode_frame(GifFrame::from_parts(rgba(frame)?, 0, 0, delay))?;
        }
    }
    Ok(buf)
}

fn encode_webp(tree: &RenderTree) -> Result<Vec<u8>, EncodeError> {
    let frame = &tree.frames[0];
    rgba(frame)?;

    let mut buf = Vec::new();
    WebPEncoder::new_lossless(&mut buf).encode(
        &frame.pixels,
        frame.width,
        frame.height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

fn rgba(frame: &Frame) -> Result<RgbaImage, EncodeError> {
    RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or(EncodeError::BadFrame)
}
