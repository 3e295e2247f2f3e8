use std::collections::HashMap;

use crate::model::{Sequence, TexelFrame};

/// Separator between the sequence name and the rest of a qualified name.
pub const SEQUENCE_SEPARATOR: char = '/';

/// Sequence a qualified name belongs to: the text before the first
/// separator, or `""` when there is none (or it is the first character).
pub fn sequence_name(qualified: &str) -> &str {
    match qualified.find(SEQUENCE_SEPARATOR) {
        Some(idx) if idx > 0 => &qualified[..idx],
        _ => "",
    }
}

/// Groups texels into sequences in a single pass.
///
/// Sequences appear in first-seen order; frames keep texel order.
pub fn group_sequences(texels: &[TexelFrame]) -> Vec<Sequence> {
    let mut sequences: Vec<Sequence> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, texel) in texels.iter().enumerate() {
        let name = sequence_name(&texel.name);
        let slot = *index.entry(name).or_insert_with(|| {
            sequences.push(Sequence {
                name: name.to_string(),
                frames: Vec::new(),
            });
            sequences.len() - 1
        });
        sequences[slot].frames.push(i);
    }
    sequences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texels(names: &[&str]) -> Vec<TexelFrame> {
        names.iter().map(|n| TexelFrame::new(*n)).collect()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let t = texels(&["walk/1", "walk/2", "idle/1", "loose"]);
        let seqs = group_sequences(&t);
        let got: Vec<(&str, Vec<&str>)> = seqs
            .iter()
            .map(|s| {
                (
                    s.name.as_str(),
                    s.frames.iter().map(|&i| t[i].name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            got,
            vec![
                ("walk", vec!["walk/1", "walk/2"]),
                ("idle", vec!["idle/1"]),
                ("", vec!["loose"]),
            ]
        );
    }

    #[test]
    fn interleaved_names_append_to_existing_sequence() {
        let t = texels(&["a/1", "b/1", "a/2", "c", "b/2", "d"]);
        let seqs = group_sequences(&t);
        assert_eq!(seqs.len(), 3);
        assert_eq!(seqs[0].frames, vec![0, 2]);
        assert_eq!(seqs[1].frames, vec![1, 4]);
        assert_eq!(seqs[2].name, "");
        assert_eq!(seqs[2].frames, vec![3, 5]);
    }

    #[test]
    fn splits_on_first_separator_only() {
        assert_eq!(sequence_name("hero/run/01.png"), "hero");
        assert_eq!(sequence_name("/abs.png"), "");
        assert_eq!(sequence_name("plain.png"), "");
    }

    #[test]
    fn empty_input_has_no_sequences() {
        assert!(group_sequences(&[]).is_empty());
    }
}
