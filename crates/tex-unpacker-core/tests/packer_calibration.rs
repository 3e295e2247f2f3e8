//! Packs sprites the way the packer does (trim, rotate 90° clockwise, blit),
//! writes the matching descriptor, and checks the unpacker restores the
//! original sprites exactly.

use image::{Rgba, RgbaImage};
use tex_unpacker_core::prelude::*;

/// Clockwise blit of `src[sx.., sy..]` (size sw x sh) into `canvas` at (dx, dy).
fn blit(
    src: &RgbaImage,
    canvas: &mut RgbaImage,
    dx: u32,
    dy: u32,
    sx: u32,
    sy: u32,
    sw: u32,
    sh: u32,
    rotated: bool,
) {
    let (rw, rh) = if rotated { (sh, sw) } else { (sw, sh) };
    for yy in 0..rh {
        for xx in 0..rw {
            let (ix, iy) = if rotated {
                (sx + yy, sy + (sh - 1 - xx))
            } else {
                (sx + xx, sy + yy)
            };
            canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(ix, iy));
        }
    }
}

/// 12x10 sprite whose opaque content occupies (2,1) size 6x6.
fn bordered_sprite(tint: u8) -> RgbaImage {
    RgbaImage::from_fn(12, 10, |x, y| {
        if (2..8).contains(&x) && (1..7).contains(&y) {
            Rgba([x as u8 * 20, y as u8 * 30, tint, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// 5x3 sprite with no transparent border.
fn solid_sprite() -> RgbaImage {
    RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 40, y as u8 * 80, 7, 255]))
}

fn descriptor() -> String {
    // frame sizes are unrotated; offsets are center-relative with y up
    r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
  <key>frames</key>
  <dict>
    <key>hero/trimmed.png</key>
    <dict>
      <key>frame</key><string>{{0,0},{6,6}}</string>
      <key>offset</key><string>{-1,1}</string>
      <key>rotated</key><true/>
      <key>sourceSize</key><string>{12,10}</string>
    </dict>
    <key>hero/solid.png</key>
    <dict>
      <key>frame</key><string>{{8,0},{5,3}}</string>
      <key>offset</key><string>{0,0}</string>
      <key>rotated</key><true/>
      <key>sourceSize</key><string>{5,3}</string>
    </dict>
    <key>flat.png</key>
    <dict>
      <key>frame</key><string>{{0,8},{5,3}}</string>
      <key>offset</key><string>{0,0}</string>
      <key>rotated</key><false/>
      <key>sourceSize</key><string>{5,3}</string>
    </dict>
  </dict>
  <key>metadata</key>
  <dict>
    <key>textureFileName</key><string>atlas.png</string>
    <key>size</key><string>{16,16}</string>
  </dict>
</dict>
</plist>
"#
    .to_string()
}

fn packed_atlas(trimmed: &RgbaImage, solid: &RgbaImage) -> RgbaImage {
    let mut atlas = RgbaImage::new(16, 16);
    blit(trimmed, &mut atlas, 0, 0, 2, 1, 6, 6, true);
    blit(solid, &mut atlas, 8, 0, 0, 0, 5, 3, true);
    blit(solid, &mut atlas, 0, 8, 0, 0, 5, 3, false);
    atlas
}

#[test]
fn rotated_trimmed_sprite_round_trips() {
    let sprite = bordered_sprite(99);
    let solid = solid_sprite();
    let atlas = packed_atlas(&sprite, &solid);
    let desc = AtlasDescriptor::parse("atlas", &descriptor()).expect("parse");

    let t = &desc.texels[0];
    assert_eq!(t.paste_pos(), Point::new(2, 1));
    let out = reconstruct_frame(&atlas, t, PaddingMode::Full).expect("reconstruct");
    assert_eq!(out.dimensions(), sprite.dimensions());
    assert_eq!(out.as_raw(), sprite.as_raw());

    let compact = reconstruct_frame(&atlas, t, PaddingMode::Compact).expect("compact");
    let expected = image::imageops::crop_imm(&sprite, 2, 1, 6, 6).to_image();
    assert_eq!(compact.as_raw(), expected.as_raw());
}

#[test]
fn rotated_and_plain_copies_agree() {
    let solid = solid_sprite();
    let atlas = packed_atlas(&bordered_sprite(1), &solid);
    let desc = AtlasDescriptor::parse("atlas", &descriptor()).expect("parse");

    let rotated = reconstruct_frame(&atlas, &desc.texels[1], PaddingMode::Full).expect("rotated");
    let plain = reconstruct_frame(&atlas, &desc.texels[2], PaddingMode::Full).expect("plain");
    assert_eq!(rotated.as_raw(), solid.as_raw());
    assert_eq!(plain.as_raw(), solid.as_raw());
}
