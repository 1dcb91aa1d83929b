use super::SyncPoint;
use crate::error::{Result, VideoError};
use once_cell::sync::Lazy;
use regex::Regex;

static SYNC_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[SYNC:\s*(\d+)\]").expect("valid sync marker pattern"));

/// Split a narration script into sync points.
///
/// Each `[SYNC: <n>]` marker owns the text up to the next marker or the end
/// of the script. Points keep their order of appearance; duplicate or
/// decreasing timestamps are kept as written. Text before the first marker
/// is discarded.
pub fn extract_sync_points(script: &str) -> Result<Vec<SyncPoint>> {
    let markers: Vec<_> = SYNC_MARKER.captures_iter(script).collect();
    if markers.is_empty() {
        return Err(VideoError::NoSyncMarkers);
    }

    let mut points = Vec::with_capacity(markers.len());
    for (i, caps) in markers.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(script.len(), |m| m.start());

        let timestamp = caps[1].parse::<u32>().map_err(|e| {
            VideoError::InvalidSyncMarker(format!("timestamp '{}': {}", &caps[1], e))
        })?;

        points.push(SyncPoint {
            timestamp,
            raw_text: script[whole.end()..end].trim().to_string(),
        });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_points_in_order() {
        let script = "[SYNC: 0] Intro text here. [SYNC: 10] Middle point. [SYNC: 25] Conclusion.";
        let points = extract_sync_points(script).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].timestamp, 0);
        assert_eq!(points[0].raw_text, "Intro text here.");
        assert_eq!(points[1].timestamp, 10);
        assert_eq!(points[1].raw_text, "Middle point.");
        assert_eq!(points[2].timestamp, 25);
        assert_eq!(points[2].raw_text, "Conclusion.");
    }

    #[test]
    fn test_payload_spans_lines() {
        let script = "[SYNC:3]\nFirst line\nsecond line\n\n[SYNC: 9]\nlast";
        let points = extract_sync_points(script).unwrap();
        assert_eq!(points[0].raw_text, "First line\nsecond line");
        assert_eq!(points[1].raw_text, "last");
    }

    #[test]
    fn test_keeps_out_of_order_and_duplicate_timestamps() {
        let script = "[SYNC: 20] b [SYNC: 5] a [SYNC: 5] c";
        let stamps: Vec<u32> = extract_sync_points(script)
            .unwrap()
            .iter()
            .map(|p| p.timestamp)
            .collect();
        assert_eq!(stamps, vec![20, 5, 5]);
    }

    #[test]
    fn test_no_markers_is_parse_failure() {
        let result = extract_sync_points("Just a plain narration with no markers.");
        assert!(matches!(result, Err(VideoError::NoSyncMarkers)));
    }

    #[test]
    fn test_empty_payload_is_kept() {
        let points = extract_sync_points("[SYNC: 1][SYNC: 2] tail").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].raw_text, "");
    }
}
