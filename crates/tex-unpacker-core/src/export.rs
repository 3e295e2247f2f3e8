use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::AtlasDescriptor;

/// One frame entry of a sequence in `spr_<name>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActFrame {
    /// Qualified frame name (also the output file path).
    pub file: String,
    /// Paste position inside the original canvas.
    pub offset: [i32; 2],
    /// Unrotated frame size.
    pub size: [u32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Act {
    pub name: String,
    pub frames: Vec<ActFrame>,
}

/// Machine-readable sprite description consumed by game runtimes.
/// Field names and nesting are a compatibility contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpriteSheet {
    pub name: String,
    /// Representative (first texel's) original width.
    pub width: u32,
    pub height: u32,
    pub acts: Vec<Act>,
}

/// Builds the `{ name, width, height, acts: [{ name, frames: [{ file, offset, size }] }] }` document.
pub fn to_sprite_sheet(desc: &AtlasDescriptor) -> SpriteSheet {
    let acts = desc
        .sequences
        .iter()
        .map(|seq| Act {
            name: seq.name.clone(),
            frames: desc
                .sequence_frames(seq)
                .map(|t| {
                    let paste = t.paste_pos();
                    let size = t.unrotated_size();
                    ActFrame {
                        file: t.name.clone(),
                        offset: [paste.x, paste.y],
                        size: [size.w, size.h],
                    }
                })
                .collect(),
        })
        .collect();
    SpriteSheet {
        name: desc.name.clone(),
        width: desc.texel_width,
        height: desc.texel_height,
        acts,
    }
}

/// Serialized sprite sheet; compact like the files downstream tools already read.
pub fn to_sprite_json(desc: &AtlasDescriptor) -> serde_json::Result<String> {
    serde_json::to_string(&to_sprite_sheet(desc))
}

/// Per-texel view handed to the texture template.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTexel {
    pub name: String,
    pub short_name: String,
    pub long_name: String,
    pub x: i32,
    pub y: i32,
    /// Unrotated size, as written in the descriptor.
    pub width: u32,
    pub height: u32,
    pub rotated: bool,
    pub offset: [i32; 2],
    pub source_size: [u32; 2],
    pub paste_pos: [i32; 2],
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSequence {
    pub name: String,
    pub frames: Vec<String>,
}

/// Everything a `tex_<name>.xml` template can reference.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateContext {
    pub name: String,
    pub file: String,
    pub uuid: String,
    pub generated_at: String,
    pub width: u32,
    pub height: u32,
    pub texel_width: u32,
    pub texel_height: u32,
    pub texels: Vec<TemplateTexel>,
    pub sequences: Vec<TemplateSequence>,
}

/// Builds the template context. A descriptor without a `generated_at`
/// stamp gets the current export time.
pub fn to_template_context(desc: &AtlasDescriptor) -> TemplateContext {
    let texels = desc
        .texels
        .iter()
        .map(|t| {
            let pos = t.atlas_pos();
            let size = t.unrotated_size();
            let offset = t.trim_offset();
            let original = t.original_size();
            let paste = t.paste_pos();
            TemplateTexel {
                name: t.name.clone(),
                short_name: t.short_name().to_string(),
                long_name: desc.long_name(t),
                x: pos.x,
                y: pos.y,
                width: size.w,
                height: size.h,
                rotated: t.rotated(),
                offset: [offset.x, offset.y],
                source_size: [original.w, original.h],
                paste_pos: [paste.x, paste.y],
            }
        })
        .collect();
    let sequences = desc
        .sequences
        .iter()
        .map(|seq| TemplateSequence {
            name: seq.name.clone(),
            frames: desc.sequence_frames(seq).map(|t| t.name.clone()).collect(),
        })
        .collect();
    TemplateContext {
        name: desc.name.clone(),
        file: desc.source_image_file.clone(),
        uuid: desc.uuid.clone().unwrap_or_default(),
        generated_at: desc
            .generated_at
            .clone()
            .unwrap_or_else(export_timestamp),
        width: desc.atlas_width,
        height: desc.atlas_height,
        texel_width: desc.texel_width,
        texel_height: desc.texel_height,
        texels,
        sequences,
    }
}

/// `YYYY-MM-DDTHH:MM:SS` (UTC) for the current time, or for
/// `SOURCE_DATE_EPOCH` when set, so repeated exports can be byte-identical.
pub fn export_timestamp() -> String {
    let secs = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        });
    format_timestamp(secs)
}

/// Formats Unix seconds as `YYYY-MM-DDTHH:MM:SS` (UTC).
pub fn format_timestamp(unix_secs: i64) -> String {
    let days = unix_secs.div_euclid(86_400);
    let rem = unix_secs.rem_euclid(86_400);
    let (y, m, d) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        y,
        m,
        d,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

// Days since 1970-01-01 to proleptic Gregorian (year, month, day).
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{Point, Size, TexelFrame};

    #[test]
    fn template_context_exposes_derived_names() {
        let mut desc = AtlasDescriptor {
            name: "hero".into(),
            source_image_file: "hero.png".into(),
            atlas_width: 64,
            atlas_height: 32,
            texel_width: 12,
            texel_height: 10,
            texels: vec![
                TexelFrame::new("walk/01.png")
                    .with_placement(Point::new(3, 4), Size::new(6, 4), true)
                    .with_trim(Size::new(12, 10), Point::new(1, 1)),
            ],
            ..Default::default()
        }
        .with_generated_at("2024-01-02T03:04:05");
        desc.sequences = crate::sequence::group_sequences(&desc.texels);

        let ctx = to_template_context(&desc);
        assert_eq!(ctx.uuid, "");
        assert_eq!(ctx.generated_at, "2024-01-02T03:04:05");
        let t = &ctx.texels[0];
        assert_eq!(t.short_name, "01.png");
        assert_eq!(t.long_name, "hero/walk/01.png");
        assert_eq!((t.width, t.height), (4, 6));
        // 1 + (12-4)/2, -1 + (10-6)/2
        assert_eq!(t.paste_pos, [5, 1]);
        assert_eq!(ctx.sequences[0].frames, vec!["walk/01.png"]);

        let v = serde_json::to_value(&ctx).unwrap();
        assert!(v.get("texelWidth").is_some());
        assert!(v["texels"][0].get("pastePos").is_some());
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00");
        assert_eq!(format_timestamp(951_782_400), "2000-02-29T00:00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14T22:13:20");
        assert_eq!(format_timestamp(-1), "1969-12-31T23:59:59");
    }
}
