//! Content splitting for length-limited downstream platforms.
//!
//! A post longer than the platform limit is emitted as an ordered run of
//! segments. Authors can force a cut with an explicit separator marker;
//! otherwise we cut at the largest prefix whose weighted length fits.

/// Weighted length limit per outgoing post.
pub const MAX_WEIGHTED_LEN: usize = 280;

/// Author-controlled break marker. Consumed, never emitted.
pub const SEGMENT_SEPARATOR: &str = "====";

/// Split `content` into segments using the default platform weigher.
pub fn segment(content: &str, max_weighted_len: usize, separator: &str) -> Vec<String> {
    segment_with(content, max_weighted_len, separator, default_weighted_len)
}

/// Split `content` into bounded segments.
///
/// Walks the content left-to-right with a read cursor:
/// 1. A separator starting within the first `max_weighted_len` characters of
///    the remaining content cuts there. The part before it becomes one
///    segment as-is (an explicit break is trusted even past the weight
///    limit) and the separator is dropped.
/// 2. Otherwise the candidate is up to `max_weighted_len` characters,
///    shortened one character at a time until `weigh` accepts it. A single
///    character always fits, so this terminates.
/// 3. A separator sitting exactly on the candidate's end boundary is
///    consumed so it cannot open the next segment.
///
/// Empty content yields no segments, and the separator itself is never
/// emitted standalone: a cut with nothing before it emits nothing.
pub fn segment_with<W>(
    content: &str,
    max_weighted_len: usize,
    separator: &str,
    weigh: W,
) -> Vec<String>
where
    W: Fn(&str) -> usize,
{
    let chars: Vec<char> = content.chars().collect();
    let sep: Vec<char> = separator.chars().collect();
    // A zero limit would stall the cursor; one character per segment is the floor.
    let max_chars = max_weighted_len.max(1);

    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        // Explicit break within the search window.
        if let Some(off) = find_marker(&chars[pos..], &sep) {
            if off < max_chars {
                if off > 0 {
                    segments.push(chars[pos..pos + off].iter().collect());
                }
                pos += off + sep.len();
                continue;
            }
        }

        // Largest prefix the weigher accepts.
        let mut end = (pos + max_chars).min(chars.len());
        let mut candidate: String = chars[pos..end].iter().collect();
        while weigh(&candidate) > max_weighted_len && end - pos > 1 {
            candidate.pop();
            end -= 1;
        }

        pos = end;
        if !sep.is_empty() && chars[pos..].starts_with(sep.as_slice()) {
            pos += sep.len();
        }
        segments.push(candidate);
    }

    segments
}

fn find_marker(haystack: &[char], marker: &[char]) -> Option<usize> {
    if marker.is_empty() || haystack.len() < marker.len() {
        return None;
    }
    haystack
        .windows(marker.len())
        .position(|w| w == marker)
}

/// Default platform weighting: East Asian wide and fullwidth characters
/// count two units, everything else one.
pub fn default_weighted_len(s: &str) -> usize {
    s.chars().map(char_weight).sum()
}

fn char_weight(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F // Hangul Jamo
        | 0x2E80..=0xA4CF // CJK radicals through Yi
        | 0xAC00..=0xD7A3 // Hangul syllables
        | 0xF900..=0xFAFF // CJK compatibility ideographs
        | 0xFE30..=0xFE4F // CJK compatibility forms
        | 0xFF00..=0xFF60 // Fullwidth forms
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD => 2,
        _ => 1,
    }
}
