use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`), widened so it cannot overflow.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.w as u64
    }
    /// Exclusive bottom edge (`y + h`), widened so it cannot overflow.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.h as u64
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
}

/// Signed pixel coordinate or displacement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
    pub fn swapped(self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// One sub-image packed into the atlas, with its placement and trim record.
///
/// The geometry fields are private so that the derived paste position is
/// always in sync with them; use [`TexelFrame::set_placement`] and
/// [`TexelFrame::set_trim`] to change them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TexelFrame {
    /// Qualified name, unique within the atlas (e.g. `walk/0001.png`).
    pub name: String,
    atlas_pos: Point,
    atlas_size: Size,
    rotated: bool,
    original_size: Size,
    trim_offset: Point,
    paste_pos: Point,
}

impl TexelFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            atlas_pos: Point::default(),
            atlas_size: Size::default(),
            rotated: false,
            original_size: Size::default(),
            trim_offset: Point::default(),
            paste_pos: Point::default(),
        }
    }

    /// Sets where the frame sits in the atlas. `atlas_size` is the packed
    /// footprint, i.e. already swapped when `rotated`.
    pub fn set_placement(&mut self, atlas_pos: Point, atlas_size: Size, rotated: bool) {
        self.atlas_pos = atlas_pos;
        self.atlas_size = atlas_size;
        self.rotated = rotated;
        self.recompute_paste_pos();
    }

    /// Sets the untrimmed canvas size and the packer's center offset.
    pub fn set_trim(&mut self, original_size: Size, trim_offset: Point) {
        self.original_size = original_size;
        self.trim_offset = trim_offset;
        self.recompute_paste_pos();
    }

    pub fn with_placement(mut self, atlas_pos: Point, atlas_size: Size, rotated: bool) -> Self {
        self.set_placement(atlas_pos, atlas_size, rotated);
        self
    }

    pub fn with_trim(mut self, original_size: Size, trim_offset: Point) -> Self {
        self.set_trim(original_size, trim_offset);
        self
    }

    pub fn atlas_pos(&self) -> Point {
        self.atlas_pos
    }
    pub fn atlas_size(&self) -> Size {
        self.atlas_size
    }
    pub fn rotated(&self) -> bool {
        self.rotated
    }
    pub fn original_size(&self) -> Size {
        self.original_size
    }
    pub fn trim_offset(&self) -> Point {
        self.trim_offset
    }
    /// Top-left position of the unrotated content inside an `original_size` canvas.
    pub fn paste_pos(&self) -> Point {
        self.paste_pos
    }

    /// Frame size in its natural orientation.
    pub fn unrotated_size(&self) -> Size {
        if self.rotated {
            self.atlas_size.swapped()
        } else {
            self.atlas_size
        }
    }

    /// True when the packer removed transparent margins from this frame.
    pub fn is_trimmed(&self) -> bool {
        self.unrotated_size() != self.original_size
    }

    /// Atlas rectangle, or `None` when the recorded position is negative.
    pub fn atlas_rect(&self) -> Option<Rect> {
        let x = u32::try_from(self.atlas_pos.x).ok()?;
        let y = u32::try_from(self.atlas_pos.y).ok()?;
        Some(Rect::new(x, y, self.atlas_size.w, self.atlas_size.h))
    }

    /// Final path component of the qualified name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    // Packer offsets are center-relative with y pointing up; integer division
    // truncates toward zero like the packer does.
    fn recompute_paste_pos(&mut self) {
        let unrotated = self.unrotated_size();
        let dw = self.original_size.w as i64 - unrotated.w as i64;
        let dh = self.original_size.h as i64 - unrotated.h as i64;
        let x = self.trim_offset.x as i64 + dw / 2;
        let y = -(self.trim_offset.y as i64) + dh / 2;
        self.paste_pos = Point::new(clamp_i32(x), clamp_i32(y));
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// A named animation sequence: indices into [`AtlasDescriptor::texels`], in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    pub frames: Vec<usize>,
}

/// Everything decoded from one descriptor file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasDescriptor {
    /// Descriptor file base name without extension.
    pub name: String,
    /// Atlas image file name, relative to the descriptor's directory.
    pub source_image_file: String,
    /// `8-4-4-4-12` identifier recovered from the packer's smartupdate token.
    pub uuid: Option<String>,
    /// Export timestamp, stamped by the caller.
    pub generated_at: Option<String>,
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Original size of the first texel, used as the representative frame
    /// size. Atlases with mixed frame sizes are not detected.
    pub texel_width: u32,
    pub texel_height: u32,
    pub texels: Vec<TexelFrame>,
    pub sequences: Vec<Sequence>,
}

impl AtlasDescriptor {
    /// Texels of `seq`, in sequence order.
    pub fn sequence_frames<'a>(
        &'a self,
        seq: &'a Sequence,
    ) -> impl Iterator<Item = &'a TexelFrame> + 'a {
        seq.frames.iter().filter_map(|&i| self.texels.get(i))
    }

    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.name == name)
    }

    /// `<atlas name>/<qualified name>` of a texel.
    pub fn long_name(&self, texel: &TexelFrame) -> String {
        format!("{}/{}", self.name, texel.name)
    }

    pub fn with_generated_at(mut self, ts: impl Into<String>) -> Self {
        self.generated_at = Some(ts.into());
        self
    }

    /// Number of frames that were rotated or trimmed by the packer.
    pub fn stats(&self) -> DescriptorStats {
        DescriptorStats {
            num_frames: self.texels.len(),
            num_sequences: self.sequences.len(),
            num_rotated: self.texels.iter().filter(|t| t.rotated()).count(),
            num_trimmed: self.texels.iter().filter(|t| t.is_trimmed()).count(),
        }
    }
}

/// Counts summarising a descriptor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorStats {
    pub num_frames: usize,
    pub num_sequences: usize,
    pub num_rotated: usize,
    pub num_trimmed: usize,
}

impl DescriptorStats {
    pub fn summary(&self) -> String {
        format!(
            "Frames: {}, Sequences: {}, Rotated: {}, Trimmed: {}",
            self.num_frames, self.num_sequences, self.num_rotated, self.num_trimmed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paste_pos_centers_trimmed_content() {
        // 20x10 content trimmed out of a 32x32 canvas, nudged 2 right and 3 up
        let t = TexelFrame::new("a")
            .with_placement(Point::new(0, 0), Size::new(20, 10), false)
            .with_trim(Size::new(32, 32), Point::new(2, 3));
        assert_eq!(t.paste_pos(), Point::new(2 + 6, -3 + 11));
        assert!(t.is_trimmed());
    }

    #[test]
    fn paste_pos_uses_unrotated_size() {
        let t = TexelFrame::new("r")
            .with_placement(Point::new(4, 4), Size::new(10, 20), true)
            .with_trim(Size::new(20, 10), Point::new(0, 0));
        assert_eq!(t.unrotated_size(), Size::new(20, 10));
        assert_eq!(t.paste_pos(), Point::new(0, 0));
        assert!(!t.is_trimmed());
    }

    #[test]
    fn paste_pos_truncates_toward_zero() {
        // original smaller than content: (4 - 7) / 2 == -1, not -2
        let t = TexelFrame::new("n")
            .with_placement(Point::new(0, 0), Size::new(7, 7), false)
            .with_trim(Size::new(4, 4), Point::new(0, 0));
        assert_eq!(t.paste_pos(), Point::new(-1, -1));
    }

    #[test]
    fn paste_pos_follows_later_placement_change() {
        let mut t = TexelFrame::new("late").with_trim(Size::new(16, 16), Point::new(1, -1));
        t.set_placement(Point::new(0, 0), Size::new(8, 8), false);
        assert_eq!(t.paste_pos(), Point::new(5, 5));
    }

    #[test]
    fn negative_position_has_no_rect() {
        let t = TexelFrame::new("neg").with_placement(Point::new(-1, 0), Size::new(2, 2), false);
        assert!(t.atlas_rect().is_none());
    }

    #[test]
    fn short_name_is_last_component() {
        assert_eq!(TexelFrame::new("walk/left/01.png").short_name(), "01.png");
        assert_eq!(TexelFrame::new("loose.png").short_name(), "loose.png");
    }
}
