//! Size arithmetic for the two image policies.
//!
//! Nothing here touches pixels; the codec feeds these plans to the resampler.

use ic_core::ThumbnailBounds;

/// Resize-then-crop plan produced by [`cover_crop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverCrop {
    /// Size the source is resampled to before cropping.
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Top-left corner of the crop box inside the scaled image.
    pub x: u32,
    pub y: u32,
    /// Crop box size, always equal to the requested target.
    pub width: u32,
    pub height: u32,
}

/// Plan a scale-to-cover followed by a centered crop.
///
/// The source is scaled by `k = max(tw / w, th / h)` so that it covers the
/// target box, dimensions truncated toward zero, then the box is centered on
/// the scaled image. Returns `None` if any dimension is zero.
pub fn cover_crop(
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
) -> Option<CoverCrop> {
    if width == 0 || height == 0 || target_width == 0 || target_height == 0 {
        return None;
    }

    let (w, h) = (f64::from(width), f64::from(height));
    let (tw, th) = (f64::from(target_width), f64::from(target_height));
    let k = (tw / w).max(th / h);
    let (sw, sh) = (w * k, h * k);

    // Truncation can land one pixel short of the target on the covering axis.
    let scaled_width = (sw as u32).max(target_width);
    let scaled_height = (sh as u32).max(target_height);

    let x = (((sw - tw) / 2.0).max(0.0) as u32).min(scaled_width - target_width);
    let y = (((sh - th) / 2.0).max(0.0) as u32).min(scaled_height - target_height);

    Some(CoverCrop {
        scaled_width,
        scaled_height,
        x,
        y,
        width: target_width,
        height: target_height,
    })
}

/// Whether an image of `width` x `height` breaks any set bound.
pub fn exceeds_bounds(width: u32, height: u32, bounds: &ThumbnailBounds) -> bool {
    bounds.max_width().is_some_and(|max| width > max)
        || bounds.max_height().is_some_and(|max| height > max)
}

/// Fit `width` x `height` inside a `box_width` x `box_height` box, keeping
/// the aspect ratio and never enlarging. Each axis is clamped in turn with
/// integer floor division and a one pixel minimum.
pub fn bounded_fit(width: u32, height: u32, box_width: u32, box_height: u32) -> (u32, u32) {
    let (mut x, mut y) = (u64::from(width), u64::from(height));
    let (bw, bh) = (u64::from(box_width), u64::from(box_height));

    if x > bw {
        y = (y * bw / x).max(1);
        x = bw;
    }
    if y > bh {
        x = (x * bh / y).max(1);
        y = bh;
    }

    // Both values are bounded by the u32 inputs.
    (x as u32, y as u32)
}

/// The shrunken size for an image under `bounds`, or `None` when it already
/// fits. Unset bounds fall back to the current dimension.
pub fn shrink_target(width: u32, height: u32, bounds: &ThumbnailBounds) -> Option<(u32, u32)> {
    if !exceeds_bounds(width, height, bounds) {
        return None;
    }
    Some(bounded_fit(
        width,
        height,
        bounds.max_width().unwrap_or(width),
        bounds.max_height().unwrap_or(height),
    ))
}
