use log::debug;

use crate::dto::Segment;

/// Duration assigned to cues in the line-per-cue format, which carries no
/// end timestamps.
const LINE_CUE_SECS: f64 = 5.0;

/// Character budget for the single-segment fallback when a blob has no
/// recognizable cues.
const FALLBACK_MAX_CHARS: usize = 2000;

/// Parse a raw caption blob into ordered segments (translations left empty).
///
/// Two cue formats are recognized: timed-cue blocks
/// (`HH:MM:SS.mmm --> HH:MM:SS.mmm` followed by text lines, as written by
/// WebVTT/SRT exporters) and the simpler one-cue-per-line `MM:SS text`
/// format. A blob with no recognizable cues becomes a single segment
/// holding the (truncated) text itself.
pub fn parse_captions(raw: &str) -> Vec<Segment> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return vec![Segment::untranslated(
            0.0,
            LINE_CUE_SECS,
            "No subtitle text provided.",
        )];
    }

    let segments = if trimmed.contains("-->") {
        parse_cue_blocks(trimmed)
    } else if trimmed.lines().any(|l| split_leading_stamp(l).is_some()) {
        parse_timestamped_lines(trimmed)
    } else {
        Vec::new()
    };

    if segments.is_empty() {
        debug!("no structured cues found, falling back to a single segment");
        let text: String = trimmed.chars().take(FALLBACK_MAX_CHARS).collect();
        return vec![Segment::untranslated(0.0, LINE_CUE_SECS, text)];
    }

    segments
}

/// Timed-cue blocks: a `-->` line opens a segment, following non-blank
/// lines accumulate as its text, a blank line closes it. Header lines
/// (`WEBVTT`, `Kind: ...`) and SRT index lines never follow an open cue,
/// so they are skipped naturally.
fn parse_cue_blocks(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<Segment> = None;

    for line in raw.lines() {
        let line = line.trim();

        if line.is_empty() {
            if let Some(seg) = current.take() {
                segments.push(seg);
            }
            continue;
        }

        if line.contains("-->") {
            if let Some(seg) = current.take() {
                segments.push(seg);
            }
            let (start, end) = parse_cue_times(line);
            current = Some(Segment::untranslated(start, end, ""));
        } else if let Some(seg) = current.as_mut() {
            let text = strip_markup(line);
            let text = text.trim();
            if !text.is_empty() {
                if !seg.text.is_empty() {
                    seg.text.push(' ');
                }
                seg.text.push_str(text);
            }
        }
    }

    if let Some(seg) = current.take() {
        segments.push(seg);
    }

    segments.retain(|s| !s.text.is_empty());
    segments
}

/// One cue per line: a leading `MM:SS` stamp starts a fixed-length cue;
/// lines without a stamp are assigned sequential slots continuing from the
/// previous cue's end.
fn parse_timestamped_lines(raw: &str) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut cursor = 0.0;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match split_leading_stamp(line) {
            Some((start, text)) => {
                if text.is_empty() {
                    continue;
                }
                segments.push(Segment::untranslated(start, start + LINE_CUE_SECS, text));
                cursor = start + LINE_CUE_SECS;
            }
            None => {
                segments.push(Segment::untranslated(cursor, cursor + LINE_CUE_SECS, line));
                cursor += LINE_CUE_SECS;
            }
        }
    }

    segments
}

/// Split a `MM:SS rest-of-line` line into its stamp (as seconds) and text.
/// Returns None when the line does not begin with a colon-separated stamp.
fn split_leading_stamp(line: &str) -> Option<(f64, &str)> {
    let line = line.trim();
    let (stamp, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    if !stamp.contains(':')
        || !stamp
            .chars()
            .all(|c| c.is_ascii_digit() || c == ':' || c == '.' || c == ',')
    {
        return None;
    }

    Some((parse_clock(stamp), rest.trim()))
}

/// Parse both timestamps of a `start --> end` cue line. Trailing cue
/// settings (`align:start position:0%`) after the end stamp are ignored.
fn parse_cue_times(line: &str) -> (f64, f64) {
    let mut parts = line.split("-->");
    let start = parts.next().unwrap_or("").trim();
    let end = parts
        .next()
        .unwrap_or("")
        .trim()
        .split_whitespace()
        .next()
        .unwrap_or("");

    (parse_clock(start), parse_clock(end))
}

/// Convert `HH:MM:SS.mmm`, `MM:SS.mmm`, or `MM:SS` (comma millis accepted)
/// to seconds. Malformed pieces parse as zero.
fn parse_clock(stamp: &str) -> f64 {
    let parts: Vec<&str> = stamp.trim().split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return 0.0,
    };

    let hours: f64 = hours.parse().unwrap_or(0.0);
    let minutes: f64 = minutes.parse().unwrap_or(0.0);
    let seconds: f64 = seconds.replace(',', ".").parse().unwrap_or(0.0);

    hours * 3600.0 + minutes * 60.0 + seconds
}

/// Drop `<...>` markup spans (VTT voice/karaoke tags, basic HTML).
fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_format_fixed_duration() {
        let segments = parse_captions("0:00 Hello\n0:05 World");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 5.0);
        assert_eq!(segments[0].text, "Hello");
        assert_eq!(segments[1].start, 5.0);
        assert_eq!(segments[1].end, 10.0);
        assert_eq!(segments[1].text, "World");
    }

    #[test]
    fn test_unstamped_lines_get_sequential_slots() {
        let segments = parse_captions("0:10 First\nsecond line\nthird line");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].start, 15.0);
        assert_eq!(segments[1].end, 20.0);
        assert_eq!(segments[2].start, 20.0);
        assert_eq!(segments[2].text, "third line");
    }

    #[test]
    fn test_vtt_cue_blocks() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n\
                   00:00:01.000 --> 00:00:04.500\n<v Speaker>Hello there\n\n\
                   00:00:04.500 --> 00:00:06.000 align:start position:0%\nSecond cue\ncontinues here\n";
        let segments = parse_captions(vtt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 1.0);
        assert_eq!(segments[0].end, 4.5);
        assert_eq!(segments[0].text, "Hello there");
        assert_eq!(segments[1].text, "Second cue continues here");
    }

    #[test]
    fn test_srt_comma_millis_and_index_lines() {
        let srt = "1\n00:00:00,500 --> 00:00:02,000\nFirst\n\n2\n00:00:02,000 --> 00:00:03,250\nSecond\n";
        let segments = parse_captions(srt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 0.5);
        assert_eq!(segments[0].end, 2.0);
        assert_eq!(segments[1].end, 3.25);
        assert_eq!(segments[1].text, "Second");
    }

    #[test]
    fn test_cues_preserve_order_and_timing() {
        let vtt = "00:00:00.000 --> 00:00:02.000\nA\n\n\
                   00:00:02.000 --> 00:00:05.000\nB\n\n\
                   00:01:00.000 --> 00:01:30.000\nC\n";
        let segments = parse_captions(vtt);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["A", "B", "C"]);
        for seg in &segments {
            assert!(seg.start <= seg.end);
        }
    }

    #[test]
    fn test_blob_without_cues_collapses_to_one_segment() {
        let segments = parse_captions("just a plain paragraph of text without any timing");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(
            segments[0].text,
            "just a plain paragraph of text without any timing"
        );
    }

    #[test]
    fn test_fallback_truncates_to_budget() {
        let blob = "x".repeat(FALLBACK_MAX_CHARS + 500);
        let segments = parse_captions(&blob);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text.chars().count(), FALLBACK_MAX_CHARS);
    }

    #[test]
    fn test_empty_input_yields_placeholder() {
        let segments = parse_captions("   \n  ");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "No subtitle text provided.");
    }

    #[test]
    fn test_malformed_timestamp_defaults_to_zero() {
        let segments = parse_captions("xx:yy Hello\n0:05 World");
        // "xx:yy" is not a stamp, so the line keeps its full text and gets a
        // sequential slot starting at zero.
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].text, "xx:yy Hello");

        let cues = parse_captions("00:bad:01.000 --> 00:00:oops\nStill parsed\n");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 1.0);
        assert_eq!(cues[0].end, 0.0);
    }

    #[test]
    fn test_hour_stamps() {
        assert_eq!(parse_clock("01:02:03.500"), 3723.5);
        assert_eq!(parse_clock("2:30"), 150.0);
        assert_eq!(parse_clock("garbage"), 0.0);
    }
}
