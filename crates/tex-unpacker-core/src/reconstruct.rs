use image::{RgbaImage, imageops};

use crate::config::PaddingMode;
use crate::error::{Result, TexUnpackerError};
use crate::model::{Rect, TexelFrame};

/// Largest padded canvas, in pixels, that [`reconstruct_frame`] will allocate
/// (8192 x 8192, 256 MiB of RGBA).
pub const MAX_CANVAS_PIXELS: u64 = 8192 * 8192;

/// Validates that `texel` can be cut out of a `atlas_w x atlas_h` image and
/// returns its atlas rectangle.
pub fn frame_rect(texel: &TexelFrame, atlas_w: u32, atlas_h: u32) -> Result<Rect> {
    let size = texel.atlas_size();
    if size.is_empty() {
        return Err(TexUnpackerError::EmptyFrame {
            name: texel.name.clone(),
        });
    }
    let bounds = Rect::new(0, 0, atlas_w, atlas_h);
    match texel.atlas_rect() {
        Some(r) if bounds.contains(&r) => Ok(r),
        _ => {
            let pos = texel.atlas_pos();
            Err(TexUnpackerError::FrameBounds {
                name: texel.name.clone(),
                x: pos.x,
                y: pos.y,
                width: size.w,
                height: size.h,
                atlas_width: atlas_w,
                atlas_height: atlas_h,
            })
        }
    }
}

/// Cuts `texel` out of the atlas, undoes the packer's rotation and, in
/// [`PaddingMode::Full`], pads it back onto a transparent canvas of its
/// original size.
pub fn reconstruct_frame(
    atlas: &RgbaImage,
    texel: &TexelFrame,
    mode: PaddingMode,
) -> Result<RgbaImage> {
    let r = frame_rect(texel, atlas.width(), atlas.height())?;
    let crop = imageops::crop_imm(atlas, r.x, r.y, r.w, r.h).to_image();
    let content = if texel.rotated() {
        derotate(&crop)
    } else {
        crop
    };

    let original = texel.original_size();
    // A missing sourceSize leaves nothing to pad onto.
    if !texel.is_trimmed() || original.is_empty() || mode == PaddingMode::Compact {
        return Ok(content);
    }
    if u64::from(original.w) * u64::from(original.h) > MAX_CANVAS_PIXELS {
        return Err(TexUnpackerError::CanvasTooLarge {
            name: texel.name.clone(),
            width: original.w,
            height: original.h,
            max: MAX_CANVAS_PIXELS,
        });
    }
    let mut canvas = RgbaImage::new(original.w, original.h);
    let paste = texel.paste_pos();
    imageops::replace(&mut canvas, &content, paste.x as i64, paste.y as i64);
    Ok(canvas)
}

/// Inverse of the packer's clockwise blit: output `(i, j)` takes crop pixel
/// `(crop_w - 1 - j, i)`, i.e. a 90° counter-clockwise turn.
pub fn derotate(crop: &RgbaImage) -> RgbaImage {
    imageops::rotate270(crop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Point, Size};
    use image::Rgba;

    fn numbered(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, (x * 7 + y) as u8, 255]))
    }

    #[test]
    fn derotate_index_mapping() {
        let crop = numbered(3, 5);
        let out = derotate(&crop);
        assert_eq!(out.dimensions(), (5, 3));
        for j in 0..3 {
            for i in 0..5 {
                assert_eq!(out.get_pixel(i, j), crop.get_pixel(3 - 1 - j, i));
            }
        }
    }

    #[test]
    fn empty_frame_is_reported() {
        let t = TexelFrame::new("e");
        let err = reconstruct_frame(&numbered(4, 4), &t, PaddingMode::Full).unwrap_err();
        assert!(matches!(err, TexUnpackerError::EmptyFrame { .. }));
    }

    #[test]
    fn negative_position_is_out_of_bounds() {
        let t = TexelFrame::new("n").with_placement(Point::new(-1, 0), Size::new(2, 2), false);
        assert!(matches!(
            frame_rect(&t, 8, 8),
            Err(TexUnpackerError::FrameBounds { x: -1, .. })
        ));
    }

    #[test]
    fn rect_touching_edge_is_inside() {
        let t = TexelFrame::new("edge").with_placement(Point::new(6, 6), Size::new(2, 2), false);
        assert_eq!(frame_rect(&t, 8, 8).unwrap(), Rect::new(6, 6, 2, 2));
    }

    #[test]
    fn missing_source_size_keeps_content() {
        let t = TexelFrame::new("m").with_placement(Point::new(1, 1), Size::new(2, 3), false);
        let out = reconstruct_frame(&numbered(4, 4), &t, PaddingMode::Full).unwrap();
        assert_eq!(out.dimensions(), (2, 3));
    }

    #[test]
    fn oversized_source_canvas_is_rejected() {
        let t = TexelFrame::new("huge")
            .with_placement(Point::new(0, 0), Size::new(2, 2), false)
            .with_trim(Size::new(100_000, 100_000), Point::new(0, 0));
        let err = reconstruct_frame(&numbered(4, 4), &t, PaddingMode::Full).unwrap_err();
        assert!(matches!(err, TexUnpackerError::CanvasTooLarge { width: 100_000, .. }));
        assert!(err.is_per_frame());

        // compact output never allocates the canvas
        let out = reconstruct_frame(&numbered(4, 4), &t, PaddingMode::Compact).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
    }

    #[test]
    fn paste_outside_canvas_is_clipped() {
        // content larger than the declared original size
        let t = TexelFrame::new("big")
            .with_placement(Point::new(0, 0), Size::new(4, 4), false)
            .with_trim(Size::new(2, 2), Point::new(0, 0));
        let atlas = numbered(4, 4);
        let out = reconstruct_frame(&atlas, &t, PaddingMode::Full).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        // paste at (-1,-1): canvas (0,0) shows atlas (1,1)
        assert_eq!(out.get_pixel(0, 0), atlas.get_pixel(1, 1));
    }
}
