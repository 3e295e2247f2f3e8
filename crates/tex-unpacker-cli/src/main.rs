use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use handlebars::Handlebars;
use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tex_unpacker_core::{
    AtlasDescriptor, PaddingMode, Reporter, TexUnpackerError, TracingReporter, UnpackConfig,
    load_atlas_image, split_grid, to_sprite_json, to_template_context, unpack_descriptor,
};
use tracing::{error, info};
use walkdir::WalkDir;

const TEXTURE_TEMPLATE: &str = include_str!("templates/texture.xml.hbs");

#[derive(Parser, Debug)]
#[command(
    name = "tex-unpacker",
    about = "Split texture atlases back into individual frames",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Unpack a plist descriptor (or every descriptor in a directory) into frames
    Unpack(UnpackArgs),
    /// Cut an image into rows x cols equal tiles
    Grid(GridArgs),
}

#[derive(Parser, Debug, Clone)]
struct UnpackArgs {
    // Input/Output
    /// Descriptor file, or a directory scanned (non-recursively) for descriptors
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = ".", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Descriptor extension picked up when scanning a directory
    #[arg(long, default_value = "plist", help_heading = "Input/Output")]
    extension: String,
    /// YAML config file path (overrides command-line options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only descriptors matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Descriptors matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Frames
    /// Keep trimmed frames at their trimmed size instead of re-padding them
    #[arg(short, long, default_value_t = false, help_heading = "Frames")]
    compact: bool,
    /// Drop frames with an empty atlas rectangle without reporting them
    #[arg(long, default_value_t = false, help_heading = "Frames")]
    skip_empty_frames: bool,
    /// Reconstruct frames in parallel (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Frames")]
    parallel: bool,

    // Export
    /// Also write tex_<name>.xml and spr_<name>.json next to the frames
    #[arg(short, long, default_value_t = false, help_heading = "Export")]
    export: bool,
    /// External handlebars template for tex_<name>.xml
    #[arg(long, help_heading = "Export")]
    template: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
}

#[derive(Parser, Debug, Clone)]
struct GridArgs {
    /// Image to split
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    /// Number of tile rows
    #[arg(long, default_value_t = 1)]
    rows: u32,
    /// Number of tile columns
    #[arg(long, default_value_t = 10)]
    cols: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Unpack(args) => run_unpack(args, cli.progress && !cli.quiet)?,
        Commands::Grid(args) => run_grid(args)?,
    }
    info!("The splitting is successful!");
    Ok(())
}

fn run_unpack(cli: &UnpackArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = UnpackConfig::builder()
        .compact(cli.compact)
        .parallel(cli.parallel)
        .export_metadata(cli.export)
        .descriptor_extension(cli.extension.clone())
        .skip_empty_frames(cli.skip_empty_frames)
        .build();
    if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg = y.into_unpack_config(cfg);
    }
    cfg.validate()?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => print!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let registry = if cfg.export_metadata {
        let tpl = match &cli.template {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("read template {}", path.display()))?,
            None => TEXTURE_TEMPLATE.to_string(),
        };
        Some(texture_registry(&tpl)?)
    } else {
        None
    };

    let descriptors = gather_descriptors(&cli.input, cfg.extension(), &cli.include, &cli.exclude)?;
    if descriptors.is_empty() {
        anyhow::bail!(
            "no .{} descriptors found in {}",
            cfg.extension(),
            cli.input.display()
        );
    }
    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;

    let reporter = ProgressReporter::new(show_progress)?;
    let mut failed = 0usize;
    for path in &descriptors {
        let result = unpack_descriptor(path, &cli.out_dir, &cfg, &reporter)
            .with_context(|| format!("unpack {}", path.display()))
            .and_then(|out| {
                if let Some(reg) = &registry {
                    export_metadata(reg, &out.descriptor, &out.report.out_dir)?;
                }
                Ok(out)
            });
        reporter.finish();
        match result {
            Ok(out) => info!(
                descriptor = %out.descriptor.name,
                out_dir = ?out.report.out_dir,
                summary = %out.report.summary(),
                "unpacked"
            ),
            Err(e) => {
                failed += 1;
                error!(?path, error = %format!("{e:#}"), "descriptor failed");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} descriptors failed", failed, descriptors.len());
    }
    Ok(())
}

fn run_grid(args: &GridArgs) -> anyhow::Result<()> {
    let img = load_atlas_image(&args.input)
        .with_context(|| format!("load image {}", args.input.display()))?;
    let tiles = split_grid(&img, args.rows, args.cols)?;
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;
    let base = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(
        input = ?args.input,
        tile_width = img.width() / args.cols,
        tile_height = img.height() / args.rows,
        "splitting grid"
    );
    for (i, tile) in tiles.iter().enumerate() {
        let path = args.out_dir.join(format!("{base}_{i}.png"));
        tile.save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("write {}", path.display()))?;
    }
    info!(tiles = tiles.len(), out_dir = ?args.out_dir, "grid written");
    Ok(())
}

fn texture_registry(tpl: &str) -> anyhow::Result<Handlebars<'static>> {
    let mut reg = Handlebars::new();
    reg.set_strict_mode(true);
    reg.register_template_string("texture", tpl)?;
    Ok(reg)
}

/// Writes `tex_<name>.xml` (rendered template) and `spr_<name>.json` into `out_dir`.
fn export_metadata(reg: &Handlebars, desc: &AtlasDescriptor, out_dir: &Path) -> anyhow::Result<()> {
    let ctx = to_template_context(desc);
    let xml = reg.render("texture", &ctx)?;
    let xml_path = out_dir.join(format!("tex_{}.xml", desc.name));
    fs::write(&xml_path, xml).with_context(|| format!("write {}", xml_path.display()))?;

    let json_path = out_dir.join(format!("spr_{}.json", desc.name));
    fs::write(&json_path, to_sprite_json(desc)?)
        .with_context(|| format!("write {}", json_path.display()))?;
    info!(?xml_path, ?json_path, "metadata exported");
    Ok(())
}

fn gather_descriptors(
    path: &Path,
    extension: &str,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        // an explicitly named file is taken as a descriptor whatever its extension
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) {
            list.push(path.to_path_buf());
        }
    } else {
        let walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file()
                && has_extension(p, extension)
                && !should_skip(p, inc_set.as_ref(), exc_set.as_ref())
            {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("bad glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn has_extension(p: &Path, extension: &str) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Progress bar over the frames of the descriptor being unpacked; events
/// are also forwarded to [`TracingReporter`].
struct ProgressReporter {
    bar: Option<ProgressBar>,
    inner: TracingReporter,
}

impl ProgressReporter {
    fn new(show: bool) -> anyhow::Result<Self> {
        let bar = if show {
            let b = ProgressBar::new(0);
            b.set_style(ProgressStyle::with_template(
                "{spinner:.green} {prefix} {pos}/{len} [{elapsed_precise}] {wide_msg}",
            )?);
            Some(b)
        } else {
            None
        };
        Ok(Self {
            bar,
            inner: TracingReporter,
        })
    }

    fn finish(&self) {
        if let Some(b) = &self.bar {
            b.finish_and_clear();
        }
    }

    fn with_bar_hidden(&self, f: impl FnOnce()) {
        match &self.bar {
            Some(b) => b.suspend(f),
            None => f(),
        }
    }
}

impl Reporter for ProgressReporter {
    fn descriptor_loaded(&self, desc: &AtlasDescriptor) {
        self.with_bar_hidden(|| self.inner.descriptor_loaded(desc));
        if let Some(b) = &self.bar {
            b.reset();
            b.set_length(desc.texels.len() as u64);
            b.set_prefix(desc.name.clone());
        }
    }

    fn frame_written(&self, name: &str, path: &Path) {
        self.inner.frame_written(name, path);
        if let Some(b) = &self.bar {
            b.set_message(name.to_string());
            b.inc(1);
        }
    }

    fn frame_skipped(&self, name: &str, error: &TexUnpackerError) {
        self.with_bar_hidden(|| self.inner.frame_skipped(name, error));
        if let Some(b) = &self.bar {
            b.inc(1);
        }
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

/// Optional overrides read from `--config <yaml>`.
#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    padding: Option<String>,
    compact: Option<bool>,
    parallel: Option<bool>,
    export_metadata: Option<bool>,
    descriptor_extension: Option<String>,
    skip_empty_frames: Option<bool>,
}

impl YamlConfig {
    fn into_unpack_config(self, mut cfg: UnpackConfig) -> UnpackConfig {
        if let Some(v) = self.padding {
            cfg.padding = v.parse().unwrap_or(cfg.padding);
        }
        if let Some(v) = self.compact {
            cfg.padding = if v {
                PaddingMode::Compact
            } else {
                PaddingMode::Full
            };
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        if let Some(v) = self.export_metadata {
            cfg.export_metadata = v;
        }
        if let Some(v) = self.descriptor_extension {
            cfg.descriptor_extension = v;
        }
        if let Some(v) = self.skip_empty_frames {
            cfg.skip_empty_frames = v;
        }
        cfg
    }
}
