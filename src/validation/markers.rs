/*!
 * Boundary markers for merged calls.
 *
 * Short adjacent units are sent to the transform service as one text with
 * <<UNIT_X>> markers between them and a closing <<END>>. This module builds
 * that text and splits the response back into per-unit drafts, rejecting
 * responses whose markers went missing, were duplicated, or moved.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Regex for matching unit markers
static UNIT_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<UNIT_(\d+)>>").expect("Invalid unit marker regex"));

/// End marker constant
pub const END_MARKER: &str = "<<END>>";

/// Why a merged response could not be split
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    /// Fewer or more markers than units, or out of order
    #[error("expected markers 0..{expected}, found {found:?}")]
    Mismatch { expected: usize, found: Vec<usize> },

    /// The closing marker is absent (likely truncated output)
    #[error("missing <<END>> marker")]
    MissingEnd,

    /// A marker is present but nothing follows it
    #[error("unit {index} came back empty")]
    EmptyText { index: usize },
}

/// Marker codec for merged calls
pub struct MarkerValidator;

impl MarkerValidator {
    /// Marker text for the unit at `index` within the merge
    pub fn marker(index: usize) -> String {
        format!("<<UNIT_{}>>", index)
    }

    /// Join texts into one marked payload
    pub fn join<S: AsRef<str>>(texts: &[S]) -> String {
        let mut payload = String::new();
        for (i, text) in texts.iter().enumerate() {
            payload.push_str(&Self::marker(i));
            payload.push('\n');
            payload.push_str(text.as_ref());
            payload.push('\n');
        }
        payload.push_str(END_MARKER);
        payload
    }

    /// Split a marked response into exactly `expected` trimmed, non-empty texts
    pub fn split(response: &str, expected: usize) -> Result<Vec<String>, MarkerError> {
        let end = response.rfind(END_MARKER).ok_or(MarkerError::MissingEnd)?;
        let body = &response[..end];

        let markers: Vec<(usize, usize, usize)> = UNIT_MARKER_REGEX
            .captures_iter(body)
            .filter_map(|cap| {
                let whole = cap.get(0)?;
                let index = cap.get(1)?.as_str().parse().ok()?;
                Some((index, whole.start(), whole.end()))
            })
            .collect();

        let found: Vec<usize> = markers.iter().map(|(i, _, _)| *i).collect();
        if found != (0..expected).collect::<Vec<_>>() {
            debug!("Marker mismatch: expected {}, found {:?}", expected, found);
            return Err(MarkerError::Mismatch { expected, found });
        }

        let mut texts = Vec::with_capacity(expected);
        for (pos, (index, _, content_start)) in markers.iter().enumerate() {
            let content_end = markers
                .get(pos + 1)
                .map(|(_, next_start, _)| *next_start)
                .unwrap_or(body.len());
            let text = body[*content_start..content_end].trim();
            if text.is_empty() {
                debug!("Merged response has no text for unit {}", index);
                return Err(MarkerError::EmptyText { index: *index });
            }
            texts.push(text.to_string());
        }

        Ok(texts)
    }
}
