use crate::Layout;
use image::{DynamicImage, ImageBuffer, Pixel, RgbImage};
use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_data::internal::bail;

pub const IH: usize = 224;
pub const IW: usize = 224;
pub const CH: usize = 3;

/// Nearest-neighbor resize to `IW×IH`, scale to `[0, 1]` and add the batch axis.
pub fn preprocess(img: &RgbImage, layout: Layout) -> TractResult<tract_ndarray::Array4<f32>> {
    if img.width() == 0 || img.height() == 0 {
        bail!("image is empty")
    }
    Ok(blob_from_image(img, layout))
}

/// Same as [`preprocess`], converting any color type to RGB first.
pub fn preprocess_dynamic(
    img: &DynamicImage,
    layout: Layout,
) -> TractResult<tract_ndarray::Array4<f32>> {
    preprocess(&img.to_rgb8(), layout)
}

/// Source coordinate sampled for output coordinate `dst` when an axis of
/// `src_len` pixels is resized to `dst_len`: `floor(dst * src_len / dst_len)`,
/// corners not aligned, no half-pixel offset.
pub fn nearest_source(dst: u32, src_len: u32, dst_len: u32) -> u32 {
    let src = u64::from(dst) * u64::from(src_len) / u64::from(dst_len.max(1));
    (src as u32).min(src_len.saturating_sub(1))
}

/// Nearest-neighbor resize with the same sampling as [`preprocess`].
///
/// Resizing to `IW×IH` first and preprocessing the result gives the same
/// tensor as preprocessing the original.
pub fn resize_nearest<P>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
) -> TractResult<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + 'static,
{
    let (src_w, src_h) = img.dimensions();
    if src_w == 0 || src_h == 0 {
        bail!("image is empty")
    }
    Ok(ImageBuffer::from_fn(width, height, |x, y| {
        *img.get_pixel(
            nearest_source(x, src_w, width),
            nearest_source(y, src_h, height),
        )
    }))
}

fn blob_from_image(img: &RgbImage, layout: Layout) -> tract_ndarray::Array4<f32> {
    let (src_w, src_h) = img.dimensions();
    let xs: Vec<u32> = (0..IW as u32).map(|x| nearest_source(x, src_w, IW as u32)).collect();
    let ys: Vec<u32> = (0..IH as u32).map(|y| nearest_source(y, src_h, IH as u32)).collect();
    let pixel = |c: usize, y: usize, x: usize| img[(xs[x], ys[y])][c] as f32 / 255.0;
    match layout {
        Layout::Nhwc => {
            tract_ndarray::Array4::from_shape_fn((1, IH, IW, CH), |(_, y, x, c)| pixel(c, y, x))
        }
        Layout::Nchw => {
            tract_ndarray::Array4::from_shape_fn((1, CH, IH, IW), |(_, c, y, x)| pixel(c, y, x))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbaImage};

    #[test]
    fn output_shape_does_not_depend_on_source_size() {
        let large = RgbImage::new(1000, 1000);
        let small = RgbImage::new(50, 50);
        let wide = RgbImage::new(640, 17);
        let expected = Layout::Nhwc.shape(IH, IW, CH);
        for img in [&large, &small, &wide] {
            let blob = preprocess(img, Layout::Nhwc).unwrap();
            assert_eq!(blob.shape(), expected);
        }
    }

    #[test]
    fn nchw_layout_moves_channels_forward() {
        let blob = preprocess(&RgbImage::new(30, 40), Layout::Nchw).unwrap();
        assert_eq!(blob.shape(), [1, CH, IH, IW]);
    }

    #[test]
    fn values_are_scaled_to_unit_range() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 51]));
        let blob = preprocess(&img, Layout::Nhwc).unwrap();
        assert_eq!(blob[[0, 0, 0, 0]], 1.0);
        assert_eq!(blob[[0, 100, 100, 1]], 0.0);
        assert!((blob[[0, 223, 223, 2]] - 0.2).abs() < 1e-6);
        assert!(blob.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn nearest_neighbor_keeps_hard_edges() {
        // left half black, right half white
        let img = RgbImage::from_fn(2, 2, |x, _| if x == 0 { Rgb([0; 3]) } else { Rgb([255; 3]) });
        let blob = preprocess(&img, Layout::Nhwc).unwrap();
        assert!(blob.iter().all(|&v| v == 0.0 || v == 1.0));
        assert_eq!(blob[[0, 0, 0, 0]], 0.0);
        assert_eq!(blob[[0, 0, IW - 1, 0]], 1.0);
    }

    #[test]
    fn downscale_samples_without_half_pixel_offset() {
        // red encodes the source column, green the source row
        let img = RgbImage::from_fn(448, 448, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        let blob = preprocess(&img, Layout::Nhwc).unwrap();
        let first: Vec<f32> = (0..4).map(|x| (blob[[0, 0, x, 0]] * 255.0).round()).collect();
        assert_eq!(first, [0.0, 2.0, 4.0, 6.0]);
        for d in 0..IW {
            let expected = ((d * 448 / IW) % 256) as f32 / 255.0;
            assert_eq!(blob[[0, 0, d, 0]], expected, "column {d}");
            assert_eq!(blob[[0, d, 0, 1]], expected, "row {d}");
        }
    }

    #[test]
    fn upscale_repeats_source_pixels_by_floor_mapping() {
        let img = RgbImage::from_fn(100, 60, |x, y| Rgb([x as u8, y as u8, 0]));
        let blob = preprocess(&img, Layout::Nchw).unwrap();
        for d in 0..IW {
            assert_eq!((blob[[0, 0, 0, d]] * 255.0).round(), (d * 100 / IW) as f32, "column {d}");
        }
        for d in 0..IH {
            assert_eq!((blob[[0, 1, d, 0]] * 255.0).round(), (d * 60 / IH) as f32, "row {d}");
        }
    }

    #[test]
    fn source_index_stays_inside_the_axis() {
        assert_eq!(nearest_source(0, 448, 224), 0);
        assert_eq!(nearest_source(223, 448, 224), 446);
        assert_eq!(nearest_source(223, 100, 224), 99);
        assert_eq!(nearest_source(5, 224, 224), 5);
        assert_eq!(nearest_source(3, 1, 224), 0);
    }

    #[test]
    fn resizing_first_gives_the_same_tensor() {
        let img = RgbImage::from_fn(1000, 750, |x, y| {
            Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 7) as u8])
        });
        let direct = preprocess(&img, Layout::Nhwc).unwrap();
        let small = resize_nearest(&img, IW as u32, IH as u32).unwrap();
        assert_eq!(small.dimensions(), (IW as u32, IH as u32));
        assert_eq!(preprocess(&small, Layout::Nhwc).unwrap(), direct);
        assert!(resize_nearest(&RgbImage::new(0, 3), 8, 8).is_err());
    }

    #[test]
    fn other_color_types_are_converted_to_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255])));
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        assert_eq!(
            preprocess_dynamic(&gray, Layout::Nhwc).unwrap().shape(),
            [1, IH, IW, CH]
        );
        assert_eq!(
            preprocess_dynamic(&rgba, Layout::Nhwc).unwrap().shape(),
            [1, IH, IW, CH]
        );
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(preprocess(&RgbImage::new(0, 12), Layout::Nhwc).is_err());
    }
}
