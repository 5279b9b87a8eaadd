//! Sample array to image conversion for the tag-reader tier.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{ArrayD, Axis, IxDyn};

use crate::format::tiff::SampleArray;
use crate::imaging::ColorMode;

/// Rescale samples to 8 bits.
///
/// 8-bit unsigned data passes through untouched. Anything else is mapped
/// linearly so the smallest sample becomes 0 and the largest 255, truncating
/// toward zero. A flat image (or one without any finite range) becomes all
/// zeros.
pub fn normalize_to_u8(samples: SampleArray) -> ArrayD<u8> {
    match samples {
        SampleArray::U8(array) => array,
        SampleArray::Wide(array) => {
            let min = array.iter().copied().fold(f64::INFINITY, f64::min);
            let max = array.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if max > min {
                let scale = 255.0 / (max - min);
                array.mapv(|v| ((v - min) * scale).clamp(0.0, 255.0) as u8)
            } else {
                ArrayD::zeros(array.raw_dim())
            }
        }
    }
}

/// Pick a colour mode for an array and bring it into `(H, W)` or `(H, W, C)`.
///
/// - `(H, W)` is gray
/// - `(H, W, 3|4)` is RGB or RGBA
/// - `(3|4, H, W)` is planar RGB or RGBA, moved to channels-last
/// - anything else has its singleton axes dropped while more than two
///   dimensions remain, then keeps the first entry of the last axis, then
///   the first entry of leading axes until two dimensions are left, and is
///   treated as gray
pub fn arrange_channels(array: ArrayD<u8>) -> Result<(ArrayD<u8>, ColorMode), String> {
    let shape = array.shape().to_vec();
    match shape.as_slice() {
        [_, _] => Ok((array, ColorMode::Gray)),
        [_, _, channels @ (3 | 4)] => Ok((array, channel_mode(*channels))),
        [channels @ (3 | 4), _, _] => Ok((
            array.permuted_axes(IxDyn(&[1, 2, 0])),
            channel_mode(*channels),
        )),
        _ if shape.len() < 2 => Err(format!("cannot build an image from shape {:?}", shape)),
        _ => {
            let mut array = array;
            while array.ndim() > 2 {
                match array.shape().iter().position(|&len| len == 1) {
                    Some(axis) => array = array.index_axis_move(Axis(axis), 0),
                    None => break,
                }
            }
            if array.ndim() > 2 {
                let last = array.ndim() - 1;
                array = array.index_axis_move(Axis(last), 0);
            }
            while array.ndim() > 2 {
                array = array.index_axis_move(Axis(0), 0);
            }
            Ok((array, ColorMode::Gray))
        }
    }
}

fn channel_mode(channels: usize) -> ColorMode {
    if channels == 3 {
        ColorMode::Rgb
    } else {
        ColorMode::Rgba
    }
}

/// Build an image from an arranged array.
pub fn array_to_image(array: ArrayD<u8>, mode: ColorMode) -> Result<DynamicImage, String> {
    let shape = array.shape().to_vec();
    let (height, width) = match shape.as_slice() {
        [h, w] | [h, w, _] => (
            u32::try_from(*h).map_err(|e| e.to_string())?,
            u32::try_from(*w).map_err(|e| e.to_string())?,
        ),
        _ => return Err(format!("unexpected array shape {:?}", shape)),
    };
    let raw: Vec<u8> = array.iter().copied().collect();
    let mismatch = || format!("sample count does not match shape {:?}", shape);

    let image = match mode {
        ColorMode::Gray => {
            DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, raw).ok_or_else(mismatch)?)
        }
        ColorMode::Rgb => {
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, raw).ok_or_else(mismatch)?)
        }
        ColorMode::Rgba => {
            DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, raw).ok_or_else(mismatch)?)
        }
        ColorMode::GrayAlpha => return Err("gray+alpha arrays are not produced".to_string()),
    };
    Ok(image)
}
