use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use image::{ImageFormat, ImageReader, RgbaImage};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::UnpackConfig;
use crate::error::{Result, TexUnpackerError};
use crate::model::{AtlasDescriptor, TexelFrame};
use crate::reconstruct::reconstruct_frame;
use crate::sequence::SEQUENCE_SEPARATOR;

/// Receives progress events from the unpacking pipeline.
///
/// Implementations must be shareable across worker threads.
pub trait Reporter: Send + Sync {
    fn descriptor_loaded(&self, _desc: &AtlasDescriptor) {}
    fn frame_written(&self, _name: &str, _path: &Path) {}
    fn frame_skipped(&self, _name: &str, _error: &TexUnpackerError) {}
}

/// Reporter that forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn descriptor_loaded(&self, desc: &AtlasDescriptor) {
        info!(name = %desc.name, summary = %desc.stats().summary(), "descriptor loaded");
    }
    fn frame_written(&self, name: &str, path: &Path) {
        debug!(frame = name, ?path, "frame written");
    }
    fn frame_skipped(&self, name: &str, error: &TexUnpackerError) {
        warn!(frame = name, error = %error, "frame skipped");
    }
}

/// A frame that could not be reconstructed; its siblings were still written.
#[derive(Debug)]
pub struct SkippedFrame {
    pub name: String,
    pub error: TexUnpackerError,
}

/// Outcome of unpacking one descriptor.
#[derive(Debug, Default)]
pub struct UnpackReport {
    /// Directory the frames were written into.
    pub out_dir: PathBuf,
    /// Written frame files, in texel order.
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedFrame>,
}

impl UnpackReport {
    pub fn summary(&self) -> String {
        format!(
            "Written: {}, Skipped: {}",
            self.written.len(),
            self.skipped.len()
        )
    }
}

/// A fully processed descriptor: its decoded table plus the write report.
#[derive(Debug)]
pub struct UnpackOutput {
    pub descriptor: AtlasDescriptor,
    pub report: UnpackReport,
}

enum FrameOutcome {
    Written(PathBuf),
    Skipped(SkippedFrame),
    Ignored,
}

/// Decodes `descriptor_path`, loads its atlas image and writes one PNG per
/// texel under `out_root`.
///
/// Notes:
/// - Descriptor, image and write failures abort this descriptor.
/// - Per-frame geometry failures are reported and skipped.
/// - Frames are written in parallel when `cfg.parallel` is set and the
///   `parallel` feature is enabled.
#[instrument(skip_all, fields(descriptor = %descriptor_path.display()))]
pub fn unpack_descriptor(
    descriptor_path: &Path,
    out_root: &Path,
    cfg: &UnpackConfig,
    reporter: &dyn Reporter,
) -> Result<UnpackOutput> {
    cfg.validate()?;
    let descriptor = AtlasDescriptor::load(descriptor_path)?;
    reporter.descriptor_loaded(&descriptor);

    if descriptor.source_image_file.is_empty() {
        return Err(TexUnpackerError::DescriptorParse {
            message: "metadata has no textureFileName".into(),
            fragment: descriptor_path.display().to_string(),
        });
    }
    let image_path = descriptor_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(&descriptor.source_image_file);
    let atlas = load_atlas_image(&image_path)?;

    let out_dir = output_dir_for(descriptor_path, &descriptor, out_root);
    fs::create_dir_all(&out_dir)?;
    let report = unpack_frames(&atlas, &descriptor, &out_dir, cfg, reporter)?;
    info!(?out_dir, summary = %report.summary(), "descriptor unpacked");
    Ok(UnpackOutput { descriptor, report })
}

/// Decodes an atlas image (format sniffed from content) to RGBA8.
pub fn load_atlas_image(path: &Path) -> Result<RgbaImage> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgba8())
}

/// Directory receiving the frames of one descriptor: `<out_root>/<name>`,
/// unless the descriptor's name already equals the input file name.
pub fn output_dir_for(descriptor_path: &Path, desc: &AtlasDescriptor, out_root: &Path) -> PathBuf {
    let file_name = descriptor_path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    if desc.name == file_name {
        out_root.to_path_buf()
    } else {
        out_root.join(&desc.name)
    }
}

/// Maps a qualified frame name to a path below `out_dir`; each separator
/// becomes a directory level. Names that are empty or would escape
/// `out_dir` are rejected.
pub fn frame_output_path(out_dir: &Path, name: &str) -> Result<PathBuf> {
    let invalid = || TexUnpackerError::InvalidFrameName {
        name: name.to_string(),
    };
    let mut path = out_dir.to_path_buf();
    let mut depth = 0usize;
    for seg in name.split(SEQUENCE_SEPARATOR) {
        match seg {
            "" | "." => continue,
            ".." => return Err(invalid()),
            s => {
                let normal = Path::new(s)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
                if !normal {
                    return Err(invalid());
                }
                path.push(s);
                depth += 1;
            }
        }
    }
    if depth == 0 {
        return Err(invalid());
    }
    Ok(path)
}

/// Writes every texel of `desc` as a PNG below `out_dir`.
pub fn unpack_frames(
    atlas: &RgbaImage,
    desc: &AtlasDescriptor,
    out_dir: &Path,
    cfg: &UnpackConfig,
    reporter: &dyn Reporter,
) -> Result<UnpackReport> {
    let claims: Vec<(&TexelFrame, Result<PathBuf>)> = desc
        .texels
        .iter()
        .zip(claim_output_paths(out_dir, &desc.texels))
        .collect();
    let outcomes: Vec<Result<FrameOutcome>> = {
        #[cfg(feature = "parallel")]
        {
            if cfg.parallel {
                claims
                    .into_par_iter()
                    .map(|(t, path)| unpack_one(atlas, t, path, cfg, reporter))
                    .collect()
            } else {
                claims
                    .into_iter()
                    .map(|(t, path)| unpack_one(atlas, t, path, cfg, reporter))
                    .collect()
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            claims
                .into_iter()
                .map(|(t, path)| unpack_one(atlas, t, path, cfg, reporter))
                .collect()
        }
    };

    let mut report = UnpackReport {
        out_dir: out_dir.to_path_buf(),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome? {
            FrameOutcome::Written(p) => report.written.push(p),
            FrameOutcome::Skipped(s) => report.skipped.push(s),
            FrameOutcome::Ignored => {}
        }
    }
    Ok(report)
}

/// Output path of each texel, in texel order. Names that resolve to a path
/// already taken by an earlier texel (`a.png`, `/a.png`, `./a.png`) are
/// rejected, so no two frames ever write the same file.
pub fn claim_output_paths(out_dir: &Path, texels: &[TexelFrame]) -> Vec<Result<PathBuf>> {
    let mut taken = HashSet::with_capacity(texels.len());
    texels
        .iter()
        .map(|t| {
            let path = frame_output_path(out_dir, &t.name)?;
            if taken.insert(path.clone()) {
                Ok(path)
            } else {
                Err(TexUnpackerError::InvalidFrameName {
                    name: t.name.clone(),
                })
            }
        })
        .collect()
}

fn unpack_one(
    atlas: &RgbaImage,
    texel: &TexelFrame,
    path: Result<PathBuf>,
    cfg: &UnpackConfig,
    reporter: &dyn Reporter,
) -> Result<FrameOutcome> {
    let prepared =
        path.and_then(|path| Ok((path, reconstruct_frame(atlas, texel, cfg.padding)?)));
    let (path, img) = match prepared {
        Ok(v) => v,
        Err(TexUnpackerError::EmptyFrame { .. }) if cfg.skip_empty_frames => {
            return Ok(FrameOutcome::Ignored);
        }
        Err(e) if e.is_per_frame() => {
            reporter.frame_skipped(&texel.name, &e);
            return Ok(FrameOutcome::Skipped(SkippedFrame {
                name: texel.name.clone(),
                error: e,
            }));
        }
        Err(e) => return Err(e),
    };
    if let Some(parent) = path.parent() {
        // idempotent; concurrent creators of the same directory all succeed
        fs::create_dir_all(parent)?;
    }
    img.save_with_format(&path, ImageFormat::Png)?;
    reporter.frame_written(&texel.name, &path);
    Ok(FrameOutcome::Written(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_names_become_directories() {
        let p = frame_output_path(Path::new("out"), "walk/left/01.png").unwrap();
        assert_eq!(p, Path::new("out").join("walk").join("left").join("01.png"));
    }

    #[test]
    fn escaping_names_are_rejected() {
        for bad in ["../evil.png", "a/../../b.png", "", "/", "./"] {
            assert!(
                matches!(
                    frame_output_path(Path::new("out"), bad),
                    Err(TexUnpackerError::InvalidFrameName { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn aliased_names_claim_one_path() {
        let texels: Vec<TexelFrame> = ["a.png", "/a.png", "./a.png", "b/c.png", "b//c.png"]
            .into_iter()
            .map(TexelFrame::new)
            .collect();
        let claims = claim_output_paths(Path::new("out"), &texels);
        let ok: Vec<bool> = claims.iter().map(|c| c.is_ok()).collect();
        assert_eq!(ok, vec![true, false, false, true, false]);
        assert!(matches!(
            &claims[1],
            Err(TexUnpackerError::InvalidFrameName { name }) if name == "/a.png"
        ));
    }

    #[test]
    fn leading_separator_stays_inside_out_dir() {
        let p = frame_output_path(Path::new("out"), "/abs.png").unwrap();
        assert_eq!(p, Path::new("out").join("abs.png"));
    }
}
