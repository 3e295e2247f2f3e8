use std::fs;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::{Result, TexUnpackerError};
use crate::model::{AtlasDescriptor, Point, Size, TexelFrame};
use crate::plist::{self, Dict, Value};
use crate::scalar::{parse_pair, parse_rect};
use crate::sequence::group_sequences;

/// Marker preceding the 32 hex digits of the packer's smartupdate token.
pub const SMART_UPDATE_MARKER: &str = "SmartUpdate:";

/// Atlas-level fields read from the `metadata` scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtlasMetadata {
    pub texture_file_name: Option<String>,
    pub size: Size,
    pub uuid: Option<String>,
}

impl AtlasDescriptor {
    /// Reads and decodes a descriptor file; the atlas name is the file stem.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = fs::read(path)?;
        let src = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            TexUnpackerError::parse(
                "descriptor is not valid UTF-8",
                &String::from_utf8_lossy(valid),
            )
        })?;
        Self::parse(name, &src)
    }

    /// Decodes descriptor markup into a frame table, sequences and metadata.
    pub fn parse(name: impl Into<String>, src: &str) -> Result<Self> {
        let root = plist::parse_dict(src)?;

        let texels = match root.get("frames") {
            Some(Value::Dict(frames)) => build_frame_table(frames)?,
            Some(other) => {
                return Err(TexUnpackerError::parse(
                    format!("`frames` is {}, expected dict", other.kind()),
                    src,
                ));
            }
            None => Vec::new(),
        };
        let meta = match root.get("metadata") {
            Some(Value::Dict(meta)) => read_metadata(meta),
            Some(other) => {
                return Err(TexUnpackerError::parse(
                    format!("`metadata` is {}, expected dict", other.kind()),
                    src,
                ));
            }
            None => AtlasMetadata::default(),
        };

        let sequences = group_sequences(&texels);
        let representative = texels
            .first()
            .map(TexelFrame::original_size)
            .unwrap_or_default();
        let desc = AtlasDescriptor {
            name: name.into(),
            source_image_file: meta.texture_file_name.unwrap_or_default(),
            uuid: meta.uuid,
            generated_at: None,
            atlas_width: meta.size.w,
            atlas_height: meta.size.h,
            texel_width: representative.w,
            texel_height: representative.h,
            texels,
            sequences,
        };
        debug!(
            name = %desc.name,
            frames = desc.texels.len(),
            sequences = desc.sequences.len(),
            "descriptor decoded"
        );
        Ok(desc)
    }
}

/// Builds one [`TexelFrame`] per entry of the `frames` scope, in document order.
pub fn build_frame_table(frames: &Dict) -> Result<Vec<TexelFrame>> {
    let mut out = Vec::with_capacity(frames.len());
    for (name, value) in frames.iter() {
        let Some(entry) = value.as_dict() else {
            return Err(TexUnpackerError::parse(
                format!("frame `{name}` is {}, expected dict", value.kind()),
                name,
            ));
        };
        out.push(build_texel(name, entry));
    }
    Ok(out)
}

/// Decodes one per-texel dictionary. Unknown keys are ignored; missing or
/// malformed geometry leaves zeros.
pub fn build_texel(name: &str, entry: &Dict) -> TexelFrame {
    let rotated = matches!(entry.get("rotated"), Some(Value::Bool(true)));

    let (mut pos, mut frame_size) = (Point::default(), Size::default());
    if let Some(raw) = entry.get_str("frame") {
        match parse_rect(raw) {
            Some((x, y, w, h)) => {
                pos = Point::new(to_i32(x), to_i32(y));
                frame_size = Size::new(to_u32(name, "frame", w), to_u32(name, "frame", h));
            }
            None => warn!(frame = name, value = raw, "unparsable `frame`; left at zero"),
        }
    }

    let mut offset = Point::default();
    if let Some(raw) = entry.get_str("offset") {
        match parse_pair(raw) {
            Some((dx, dy)) => offset = Point::new(to_i32(dx), to_i32(dy)),
            None => warn!(frame = name, value = raw, "unparsable `offset`; left at zero"),
        }
    }

    let mut original = Size::default();
    if let Some(raw) = entry.get_str("sourceSize") {
        match parse_pair(raw) {
            Some((w, h)) => {
                original = Size::new(to_u32(name, "sourceSize", w), to_u32(name, "sourceSize", h))
            }
            None => warn!(frame = name, value = raw, "unparsable `sourceSize`; left at zero"),
        }
    }

    // `frame` records the unrotated size; the packed footprint is swapped.
    let atlas_size = if rotated {
        frame_size.swapped()
    } else {
        frame_size
    };
    TexelFrame::new(name)
        .with_placement(pos, atlas_size, rotated)
        .with_trim(original, offset)
}

/// Reads `textureFileName`, `size` and `smartupdate` from the metadata scope.
pub fn read_metadata(meta: &Dict) -> AtlasMetadata {
    let size = meta
        .get_str("size")
        .and_then(parse_pair)
        .map(|(w, h)| Size::new(to_u32("metadata", "size", w), to_u32("metadata", "size", h)))
        .unwrap_or_default();
    AtlasMetadata {
        texture_file_name: meta.get_str("textureFileName").map(str::to_string),
        size,
        uuid: meta.get_str("smartupdate").and_then(extract_uuid),
    }
}

/// Recovers a hyphenated `8-4-4-4-12` identifier from a smartupdate token.
///
/// Returns `None` when the marker or the 32 hex digits after it are missing.
pub fn extract_uuid(token: &str) -> Option<String> {
    let start = token.find(SMART_UPDATE_MARKER)? + SMART_UPDATE_MARKER.len();
    let hex = token.get(start..start + 32)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

fn to_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn to_u32(frame: &str, key: &str, v: i64) -> u32 {
    match u32::try_from(v) {
        Ok(v) => v,
        Err(_) => {
            warn!(frame, key, value = v, "dimension out of range; left at zero");
            0
        }
    }
}
