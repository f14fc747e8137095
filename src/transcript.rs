//! Folds ordered per-frame OCR results into one transcript.
//!
//! Animated images tend to produce long runs of identical or slowly growing
//! recognized text (a held frame, or a progressive reveal that each frame
//! extends). The builder collapses those runs so the stored transcript reads
//! like the text actually shown, not one copy per frame.

/// Build a single transcript from per-frame recognized text, in frame order.
///
/// Rules, applied frame by frame:
/// - text identical to the previous frame's text contributes nothing;
/// - text that starts with the previous frame's non-empty text replaces the
///   last segment (the new read is a continuation of the old one);
/// - anything else starts a new segment.
///
/// Segments are joined with newlines. The result is deterministic and never
/// has more segments than input frames.
pub fn build_transcript(frame_texts: &[String]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut previous: Option<&str> = None;

    for text in frame_texts {
        if previous == Some(text.as_str()) {
            continue;
        }
        match previous {
            Some(prev) if !prev.is_empty() && text.starts_with(prev) => {
                // Continuation of the prior read; refine rather than repeat.
                if let Some(last) = segments.last_mut() {
                    *last = text;
                }
            }
            _ => segments.push(text),
        }
        previous = Some(text);
    }

    segments.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        assert_eq!(build_transcript(&texts(&["A", "A", "A"])), "A");
    }

    #[test]
    fn prefix_continuation_replaces_last_segment() {
        assert_eq!(
            build_transcript(&texts(&["Hel", "Hello", "Hello world"])),
            "Hello world"
        );
    }

    #[test]
    fn distinct_texts_become_separate_segments() {
        assert_eq!(build_transcript(&texts(&["Hello", "Goodbye"])), "Hello\nGoodbye");
    }

    #[test]
    fn single_frame_passes_through() {
        assert_eq!(build_transcript(&texts(&["only text"])), "only text");
    }

    #[test]
    fn all_empty_frames_yield_empty_transcript() {
        assert_eq!(build_transcript(&texts(&["", "", ""])), "");
    }

    #[test]
    fn empty_after_text_is_a_new_segment() {
        // "" differs from "A" and is not prefixed by it, so it stands alone;
        // the later "A" is likewise a fresh segment, not a merge across the gap.
        assert_eq!(build_transcript(&texts(&["A", "", "A", "B"])), "A\n\nA\nB");
    }

    #[test]
    fn empty_read_does_not_count_as_a_prefix() {
        // An empty previous read is "no text seen", not a stub to refine;
        // the following text starts its own segment.
        assert_eq!(build_transcript(&texts(&["", "A"])), "\nA");
    }

    #[test]
    fn segment_count_never_exceeds_frame_count() {
        let input = texts(&["a", "ab", "x", "x", "", "y", "ya", "b"]);
        let output = build_transcript(&input);
        assert!(output.split('\n').count() <= input.len());
    }

    #[test]
    fn deterministic_across_calls() {
        let input = texts(&["one", "one two", "three", "", "three"]);
        assert_eq!(build_transcript(&input), build_transcript(&input));
    }
}
