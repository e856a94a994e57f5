use anyhow::{anyhow, bail, Result as AnyhowResult};
use leptos::prelude::*;
use retinoscan::{image::RgbaImage, resize_nearest, SourceKind, IH, IW};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement, HtmlMediaElement, HtmlVideoElement};

type CanvasRef = NodeRef<leptos::html::Canvas>;
type VideoRef = NodeRef<leptos::html::Video>;
type ImageRef = NodeRef<leptos::html::Img>;

#[derive(Debug, Clone, Copy)]
pub struct RenderState {
    pub video: VideoRef,
    pub image: ImageRef,
    pub temporary_canvas: CanvasRef,
}

/// RGBA pixels of one frame, as sent to the model worker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageBuf {
    width: u32,
    height: u32,
    pixels_base64: String,
}

impl ImageBuf {
    pub fn new(width: u32, height: u32, pixels: impl AsRef<[u8]>) -> Self {
        use base64::prelude::*;
        let pixels_base64 = BASE64_STANDARD.encode(pixels);
        Self {
            width,
            height,
            pixels_base64,
        }
    }
    pub fn to_rgba_image(&self) -> AnyhowResult<RgbaImage> {
        use base64::prelude::*;
        let buf = BASE64_STANDARD.decode(&self.pixels_base64)?;
        RgbaImage::from_vec(self.width, self.height, buf).ok_or_else(|| anyhow!("invalid ImageBuf"))
    }
}

enum Frame {
    Image(HtmlImageElement),
    Video(HtmlVideoElement),
}

impl Frame {
    fn from_state(state: RenderState, kind: SourceKind) -> AnyhowResult<Self> {
        let frame = match kind {
            SourceKind::Image => Frame::Image(
                state
                    .image
                    .get_untracked()
                    .ok_or_else(|| anyhow!("ref has no image"))?,
            ),
            SourceKind::Camera => Frame::Video(
                state
                    .video
                    .get_untracked()
                    .ok_or_else(|| anyhow!("ref has no video"))?,
            ),
        };
        Ok(frame)
    }

    /// Pixel size of the current frame, `None` while nothing is decoded.
    fn size(&self) -> Option<(u32, u32)> {
        let (width, height) = match self {
            Frame::Image(img) if img.complete() => (img.natural_width(), img.natural_height()),
            Frame::Video(video) if video.ready_state() >= HtmlMediaElement::HAVE_CURRENT_DATA => {
                (video.video_width(), video.video_height())
            }
            _ => return None,
        };
        (width > 0 && height > 0).then_some((width, height))
    }

    fn draw(&self, ctx: &CanvasRenderingContext2d, width: f64, height: f64) -> AnyhowResult<()> {
        let drawn = match self {
            Frame::Image(img) => {
                ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0., 0., width, height)
            }
            Frame::Video(video) => {
                ctx.draw_image_with_html_video_element_and_dw_and_dh(video, 0., 0., width, height)
            }
        };
        drawn.map_err(|e| anyhow!("draw image: {:?}", e))
    }
}

pub fn has_frame(state: RenderState, kind: SourceKind) -> bool {
    Frame::from_state(state, kind)
        .ok()
        .and_then(|frame| frame.size())
        .is_some()
}

/// Copies the current frame of `kind` through the hidden canvas, sampled
/// down to the model input size.
pub fn read_frame(state: RenderState, kind: SourceKind) -> AnyhowResult<ImageBuf> {
    let frame = Frame::from_state(state, kind)?;
    let Some((width, height)) = frame.size() else {
        bail!("no frame available yet")
    };
    let ctx = get_canvas_ctx(state.temporary_canvas, width, height)
        .map_err(|e| anyhow!("failed to get canvas ctx for read: {:?}", e))?;

    frame.draw(&ctx, width as f64, height as f64)?;
    let image_data = ctx
        .get_image_data(0., 0., width as f64, height as f64)
        .map_err(|e| anyhow!("get_image_data: {:?}", e))?;

    let full = RgbaImage::from_raw(image_data.width(), image_data.height(), image_data.data().0)
        .ok_or_else(|| anyhow!("image data does not match {}x{}", width, height))?;
    // canvas scaling smooths, so the nearest sampling happens here
    let sampled = resize_nearest(&full, IW as u32, IH as u32)?;
    Ok(ImageBuf::new(sampled.width(), sampled.height(), sampled.as_raw()))
}

fn get_canvas_ctx(
    canvas: CanvasRef,
    width: u32,
    height: u32,
) -> AnyhowResult<CanvasRenderingContext2d> {
    let canvas = canvas
        .get_untracked()
        .ok_or_else(|| anyhow!("ref has no canvas"))?;

    canvas.set_width(width);
    canvas.set_height(height);

    let ctx = canvas
        .get_context("2d")
        .map_err(|e| anyhow!("failed to get canvas ctx: {:?}", e))?
        .ok_or_else(|| anyhow!("no canvas ctx"))?
        .dyn_into::<web_sys::CanvasRenderingContext2d>()
        .map_err(|e| anyhow!("canvas ctx dyn cast failed: {:?}", e))?;

    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_buf_carries_pixels_to_the_worker() {
        let pixels: Vec<u8> = (0..2 * 3 * 4).map(|i| i as u8).collect();
        let buf = ImageBuf::new(2, 3, &pixels);
        let img = buf.to_rgba_image().unwrap();
        assert_eq!(img.dimensions(), (2, 3));
        assert_eq!(img.into_raw(), pixels);
    }

    #[test]
    fn image_buf_with_wrong_size_is_rejected() {
        let buf = ImageBuf::new(4, 4, [0u8; 12]);
        assert!(buf.to_rgba_image().is_err());
    }
}
