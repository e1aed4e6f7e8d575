/*!
 * Splitting of oversized units and merging of undersized ones.
 *
 * An oversized unit is cut into chunks of at most `max_chars` characters,
 * preferring (in order) the last paragraph break, the last sentence end and
 * finally a hard cut. Each chunk keeps the whitespace that followed it so
 * that joining the chunks reproduces the source exactly.
 *
 * Runs of adjacent short units are planned into one merged call, separated
 * by boundary markers, and split apart again afterwards.
 */

use log::debug;

use crate::app_config::SegmenterConfig;
use crate::document::Unit;

/// Sentence terminals across the scripts we handle
const SENTENCE_TERMINALS: &[char] = &['.', '!', '?', '\u{3002}', '\u{0964}', '\u{0965}', '\u{0DF4}', '\u{FF01}', '\u{FF1F}'];

/// One piece of an oversized unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Text sent for transformation
    pub body: String,
    /// Whitespace that followed the body in the source, re-attached verbatim
    pub trailing: String,
}

impl Chunk {
    fn from_slice(slice: &str) -> Self {
        let body = slice.trim_end();
        Self {
            body: body.to_string(),
            trailing: slice[body.len()..].to_string(),
        }
    }

    fn whole(text: &str) -> Self {
        Self {
            body: text.to_string(),
            trailing: String::new(),
        }
    }
}

/// A unit of work for the engine: one unit, or a run of short units sent together
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem<'a> {
    Single(&'a Unit),
    Merged(Vec<&'a Unit>),
}

impl<'a> WorkItem<'a> {
    pub fn units(&self) -> Vec<&'a Unit> {
        match self {
            Self::Single(unit) => vec![*unit],
            Self::Merged(units) => units.clone(),
        }
    }

    pub fn first_ordinal(&self) -> usize {
        match self {
            Self::Single(unit) => unit.ordinal(),
            Self::Merged(units) => units.first().map(|u| u.ordinal()).unwrap_or_default(),
        }
    }
}

/// Splits and merges units around the size constraints
#[derive(Debug, Clone)]
pub struct Segmenter {
    merge_short_units: bool,
    max_units_per_merge: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::from_config(&SegmenterConfig::default())
    }
}

impl Segmenter {
    pub fn new(merge_short_units: bool, max_units_per_merge: usize) -> Self {
        Self {
            merge_short_units,
            max_units_per_merge: max_units_per_merge.max(1),
        }
    }

    pub fn from_config(config: &SegmenterConfig) -> Self {
        Self::new(config.merge_short_units, config.max_units_per_merge)
    }

    /// Split `text` into chunks of at most `max_chars` characters each.
    ///
    /// Text that already fits comes back as a single chunk, unchanged.
    pub fn segment(text: &str, max_chars: usize) -> Vec<Chunk> {
        let max_chars = max_chars.max(1);
        if text.chars().count() <= max_chars {
            return vec![Chunk::whole(text)];
        }

        let mut chunks = Vec::new();
        let mut rest = text;
        while rest.chars().count() > max_chars {
            let cut = Self::find_cut(rest, max_chars);
            chunks.push(Chunk::from_slice(&rest[..cut]));
            rest = &rest[cut..];
        }
        if !rest.is_empty() {
            chunks.push(Chunk::from_slice(rest));
        }

        debug!("Segmented {} chars into {} chunk(s)", text.chars().count(), chunks.len());
        chunks
    }

    /// Split a unit according to its own size constraint
    pub fn segment_unit(unit: &Unit) -> Vec<Chunk> {
        Self::segment(unit.source_text(), unit.size_constraint().max_chars)
    }

    /// Join transformed chunk bodies back into one text.
    ///
    /// `outputs[i]` replaces `chunks[i].body`; the original trailing
    /// whitespace is kept, so passing the bodies themselves reproduces the
    /// source byte for byte.
    pub fn reassemble<S: AsRef<str>>(chunks: &[Chunk], outputs: &[S]) -> String {
        let mut text = String::new();
        for (chunk, output) in chunks.iter().zip(outputs) {
            text.push_str(output.as_ref());
            text.push_str(&chunk.trailing);
        }
        text
    }

    /// Byte index to cut `text` at, given that it exceeds `max_chars`
    fn find_cut(text: &str, max_chars: usize) -> usize {
        // Byte offset of the first char past the window
        let limit = text
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let window = &text[..limit];

        if let Some(pos) = window.rfind("\n\n").filter(|&pos| pos > 0) {
            return Self::skip_whitespace(text, pos);
        }

        let sentence_end = window
            .char_indices()
            .filter(|&(_, c)| SENTENCE_TERMINALS.contains(&c))
            .map(|(i, c)| i + c.len_utf8())
            .filter(|&end| text[end..].chars().next().is_none_or(char::is_whitespace))
            .last();
        if let Some(end) = sentence_end {
            return Self::skip_whitespace(text, end);
        }

        limit
    }

    /// Advance `from` past a whitespace run, never consuming the whole text
    fn skip_whitespace(text: &str, from: usize) -> usize {
        let run: usize = text[from..]
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(char::len_utf8)
            .sum();
        if from + run >= text.len() { from } else { from + run }
    }

    fn is_mergeable(unit: &Unit) -> bool {
        let text = unit.source_text();
        !text.trim().is_empty() && unit.char_len() < unit.size_constraint().min_chars
    }

    fn joins(group: &[&Unit], next: &Unit, max_units: usize) -> bool {
        let Some(first) = group.first() else {
            return true;
        };
        if group.len() >= max_units
            || first.target_language() != next.target_language()
            || first.kind() != next.kind()
        {
            return false;
        }
        let total: usize = group.iter().map(|u| u.char_len()).sum::<usize>() + next.char_len();
        total <= first.size_constraint().max_chars
    }

    /// Plan the calls for a run of consecutive units of one job.
    ///
    /// Adjacent short units with the same language and kind are grouped, up
    /// to `max_units_per_merge` per group and within the size limit.
    pub fn plan<'a>(&self, units: &'a [Unit]) -> Vec<WorkItem<'a>> {
        let mut items = Vec::new();
        let mut group: Vec<&'a Unit> = Vec::new();

        let flush = |group: &mut Vec<&'a Unit>, items: &mut Vec<WorkItem<'a>>| match group.len() {
            0 => {}
            1 => items.push(WorkItem::Single(group[0])),
            _ => items.push(WorkItem::Merged(std::mem::take(group))),
        };

        for unit in units {
            if !self.merge_short_units || !Self::is_mergeable(unit) {
                flush(&mut group, &mut items);
                group.clear();
                items.push(WorkItem::Single(unit));
                continue;
            }
            if !Self::joins(&group, unit, self.max_units_per_merge) {
                flush(&mut group, &mut items);
                group.clear();
            }
            group.push(unit);
        }
        flush(&mut group, &mut items);

        items
    }
}
