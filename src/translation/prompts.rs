/*!
 * Instruction templates for transform, merged and corrective calls.
 *
 * Wording is deliberately plain; the pipeline only relies on the merged
 * template asking for the boundary markers to be echoed back.
 */

use std::fmt::Display;

use crate::document::UnitKind;
use crate::language_utils;
use crate::validation::MarkerValidator;

/// Instructions for one transform call
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub const TRANSFORM: &'static str = r#"You translate document text into {target_language}.

## Rules
- Translate the complete text; do not omit or add sentences
- Write only in {target_language} script, except for numbers and proper symbols
- Keep paragraph breaks where the source has them
- {kind_rule}

## Output
Return only the translated text, without commentary or quotation marks."#;

    pub const MERGED: &'static str = r#"You translate several short document fragments into {target_language}.

## Rules
- Each fragment starts with a marker line such as {first_marker}
- Repeat every marker line exactly, in the same order, followed by its translation
- End the output with the line {end_marker}
- Translate each fragment completely; never move text between fragments
- {kind_rule}

## Output
Return only the markers and translations."#;

    pub const CORRECTION: &'static str = r#"You review a {target_language} translation against its source.

The input contains the SOURCE and the DRAFT translation. An automatic check found these problems in the draft:
{issues}

## Rules
- Fix every listed problem
- Keep everything in the draft that is already correct
- Write only in {target_language} script

## Output
Return only the corrected translation, without commentary."#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn render(&self, target_language: &str, kind: UnitKind) -> String {
        self.template
            .replace("{target_language}", &language_utils::display_name(target_language))
            .replace("{kind_rule}", kind_rule(kind))
            .replace("{first_marker}", &MarkerValidator::marker(0))
            .replace("{end_marker}", crate::validation::markers::END_MARKER)
    }
}

fn kind_rule(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Title => "This is a heading: keep it short and do not add punctuation",
        UnitKind::Body => "Keep the register and tone of the source",
        UnitKind::Footer => "This is a footer or note: keep references, numbers and URLs verbatim",
    }
}

/// Instructions for translating a single unit or chunk
pub fn transform_instructions(target_language: &str, kind: UnitKind) -> String {
    PromptTemplate::new(PromptTemplate::TRANSFORM).render(target_language, kind)
}

/// Instructions for a merged call over several short units
pub fn merged_instructions(target_language: &str, kind: UnitKind) -> String {
    PromptTemplate::new(PromptTemplate::MERGED).render(target_language, kind)
}

/// Instructions for the single corrective call, listing every issue
pub fn correction_instructions<I: Display>(target_language: &str, kind: UnitKind, issues: &[I]) -> String {
    let list = issues
        .iter()
        .map(|issue| format!("- {}", issue))
        .collect::<Vec<_>>()
        .join("\n");
    PromptTemplate::new(PromptTemplate::CORRECTION)
        .render(target_language, kind)
        .replace("{issues}", &list)
}

/// Text submitted with a corrective call
pub fn correction_input(source: &str, draft: &str) -> String {
    format!("SOURCE:\n{}\n\nDRAFT:\n{}", source, draft)
}
