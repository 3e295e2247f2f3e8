use thiserror::Error;

#[derive(Debug, Error)]
pub enum TexUnpackerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Descriptor parse error: {message} near `{fragment}`")]
    DescriptorParse { message: String, fragment: String },
    #[error(
        "Frame `{name}` at ({x},{y}) size {width}x{height} lies outside the {atlas_width}x{atlas_height} atlas image"
    )]
    FrameBounds {
        name: String,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },
    #[error("Frame `{name}` has an empty atlas rectangle")]
    EmptyFrame { name: String },
    #[error("Frame name `{name}` cannot be used as an output path")]
    InvalidFrameName { name: String },
    #[error("Frame `{name}` declares a {width}x{height} source canvas, above the {max} pixel limit")]
    CanvasTooLarge {
        name: String,
        width: u32,
        height: u32,
        max: u64,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Encoding error: {0}")]
    Encode(String),
}

impl TexUnpackerError {
    /// Errors that only disqualify one frame; siblings keep going.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::FrameBounds { .. }
                | Self::EmptyFrame { .. }
                | Self::InvalidFrameName { .. }
                | Self::CanvasTooLarge { .. }
        )
    }

    pub(crate) fn parse(message: impl Into<String>, fragment: &str) -> Self {
        Self::DescriptorParse {
            message: message.into(),
            fragment: excerpt(fragment),
        }
    }
}

const EXCERPT_LEN: usize = 48;

fn excerpt(s: &str) -> String {
    let trimmed = s.trim_start();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, TexUnpackerError>;
