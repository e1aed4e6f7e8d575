/*!
 * Script contract validation for transformed text.
 *
 * This module checks, without any external call, that a draft is written in
 * the target script:
 * - Code points from denied scripts (e.g. untranslated Latin) are foreign
 * - Code points outside every allowed range are disallowed
 * - Cluster adjacencies that need a joiner (e.g. Sinhala yansaya) must carry it
 *
 * The validator knows nothing about any particular language; everything comes
 * from the `ScriptSpec` it is given.
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::language_utils::normalize_to_part2t;

/// Zero width joiner
pub const ZWJ: char = '\u{200D}';

/// Inclusive range of code points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodepointRange {
    pub low: u32,
    pub high: u32,
}

impl CodepointRange {
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Single code point range
    pub const fn single(cp: u32) -> Self {
        Self { low: cp, high: cp }
    }

    pub fn contains(&self, c: char) -> bool {
        let cp = c as u32;
        cp >= self.low && cp <= self.high
    }
}

fn any_contains(ranges: &[CodepointRange], c: char) -> bool {
    ranges.iter().any(|r| r.contains(c))
}

/// A "before" code point directly followed by an "after" code point needs the joiner between them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinerPattern {
    pub before: Vec<CodepointRange>,
    pub after: Vec<CodepointRange>,
}

impl JoinerPattern {
    fn matches(&self, first: char, second: char) -> bool {
        any_contains(&self.before, first) && any_contains(&self.after, second)
    }
}

/// A named script whose presence in the output is an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeniedScript {
    pub name: String,
    pub ranges: Vec<CodepointRange>,
}

impl DeniedScript {
    pub fn new(name: &str, ranges: &[CodepointRange]) -> Self {
        Self {
            name: name.to_string(),
            ranges: ranges.to_vec(),
        }
    }
}

/// Script contract for one target language family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSpec {
    /// Script name, e.g. "Sinhala"
    pub name: String,

    /// Language codes this contract applies to
    #[serde(default)]
    pub languages: Vec<String>,

    /// Code points the output may use besides whitespace and ASCII punctuation
    pub allowed_ranges: Vec<CodepointRange>,

    /// Joiner required by `joiner_patterns`
    #[serde(default)]
    pub required_joiner: Option<char>,

    /// Adjacencies that must be separated by the joiner
    #[serde(default)]
    pub joiner_patterns: Vec<JoinerPattern>,

    /// Scripts that must not appear at all
    #[serde(default)]
    pub denied_scripts: Vec<DeniedScript>,
}

const DIGITS: CodepointRange = CodepointRange::new(0x0030, 0x0039);
const GENERAL_PUNCTUATION: CodepointRange = CodepointRange::new(0x2010, 0x2027);
const GENERAL_PUNCTUATION_TAIL: CodepointRange = CodepointRange::new(0x2030, 0x205E);
const JOINERS: CodepointRange = CodepointRange::new(0x200C, 0x200D);

const SINHALA: CodepointRange = CodepointRange::new(0x0D80, 0x0DFF);
const TAMIL: CodepointRange = CodepointRange::new(0x0B80, 0x0BFF);
const DEVANAGARI: CodepointRange = CodepointRange::new(0x0900, 0x097F);
const DEVANAGARI_EXTENDED: CodepointRange = CodepointRange::new(0xA8E0, 0xA8FF);

/// Denied scripts shared by the built-in contracts, minus `own`
fn common_denied(own: &str) -> Vec<DeniedScript> {
    let all = [
        DeniedScript::new(
            "Latin",
            &[
                CodepointRange::new(0x0041, 0x005A),
                CodepointRange::new(0x0061, 0x007A),
                CodepointRange::new(0x00C0, 0x024F),
            ],
        ),
        DeniedScript::new("Greek", &[CodepointRange::new(0x0370, 0x03FF)]),
        DeniedScript::new("Cyrillic", &[CodepointRange::new(0x0400, 0x04FF)]),
        DeniedScript::new("Arabic", &[CodepointRange::new(0x0600, 0x06FF)]),
        DeniedScript::new("Devanagari", &[DEVANAGARI, DEVANAGARI_EXTENDED]),
        DeniedScript::new("Tamil", &[TAMIL]),
        DeniedScript::new("Sinhala", &[SINHALA]),
        DeniedScript::new(
            "CJK",
            &[
                CodepointRange::new(0x3040, 0x30FF),
                CodepointRange::new(0x4E00, 0x9FFF),
                CodepointRange::new(0xAC00, 0xD7AF),
            ],
        ),
    ];

    all.into_iter().filter(|d| d.name != own).collect()
}

impl ScriptSpec {
    /// Sinhala: yansaya and rakaransaya need ZWJ between al-lakuna and YA/RA
    pub fn sinhala() -> Self {
        Self {
            name: "Sinhala".to_string(),
            languages: vec!["si".to_string()],
            allowed_ranges: vec![
                SINHALA,
                DIGITS,
                GENERAL_PUNCTUATION,
                GENERAL_PUNCTUATION_TAIL,
                JOINERS,
            ],
            required_joiner: Some(ZWJ),
            joiner_patterns: vec![JoinerPattern {
                // al-lakuna
                before: vec![CodepointRange::single(0x0DCA)],
                // YAYANNA, RAYANNA
                after: vec![CodepointRange::single(0x0DBA), CodepointRange::single(0x0DBB)],
            }],
            denied_scripts: common_denied("Sinhala"),
        }
    }

    pub fn tamil() -> Self {
        Self {
            name: "Tamil".to_string(),
            languages: vec!["ta".to_string()],
            allowed_ranges: vec![TAMIL, DIGITS, GENERAL_PUNCTUATION, GENERAL_PUNCTUATION_TAIL],
            required_joiner: None,
            joiner_patterns: Vec::new(),
            denied_scripts: common_denied("Tamil"),
        }
    }

    pub fn devanagari() -> Self {
        Self {
            name: "Devanagari".to_string(),
            languages: vec!["hi".to_string(), "mr".to_string(), "ne".to_string(), "sa".to_string()],
            allowed_ranges: vec![
                DEVANAGARI,
                DEVANAGARI_EXTENDED,
                DIGITS,
                GENERAL_PUNCTUATION,
                GENERAL_PUNCTUATION_TAIL,
                JOINERS,
            ],
            required_joiner: None,
            joiner_patterns: Vec::new(),
            denied_scripts: common_denied("Devanagari"),
        }
    }

    fn allows(&self, c: char) -> bool {
        any_contains(&self.allowed_ranges, c)
    }

    fn denied_by(&self, c: char) -> Option<&DeniedScript> {
        self.denied_scripts.iter().find(|d| any_contains(&d.ranges, c))
    }
}

/// Kind of script contract violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Code point from a denied script
    ForeignScript,
    /// Joiner absent where a pattern requires it
    MissingJoiner,
    /// Code point outside every allowed range
    DisallowedCodepoint,
}

/// A single script contract violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Character index into the validated text. For a missing joiner, the
    /// index where the joiner should be inserted.
    pub position: usize,
    pub codepoint: char,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_name: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cp = self.codepoint as u32;
        match self.kind {
            IssueKind::ForeignScript => write!(
                f,
                "foreign {} character '{}' (U+{:04X}) at position {}",
                self.script_name.as_deref().unwrap_or("script"),
                self.codepoint,
                cp,
                self.position
            ),
            IssueKind::MissingJoiner => write!(
                f,
                "missing joiner before '{}' (U+{:04X}) at position {}",
                self.codepoint, cp, self.position
            ),
            IssueKind::DisallowedCodepoint => write!(
                f,
                "disallowed character '{}' (U+{:04X}) at position {}",
                self.codepoint, cp, self.position
            ),
        }
    }
}

/// Validator for script contracts
pub struct ScriptValidator;

impl ScriptValidator {
    /// Validate `text` against `spec`, returning issues ordered by position
    pub fn validate(text: &str, spec: &ScriptSpec) -> Vec<ValidationIssue> {
        let chars: Vec<char> = text.chars().collect();
        let mut issues = Vec::new();

        for (position, &c) in chars.iter().enumerate() {
            if spec.required_joiner == Some(c) {
                continue;
            }

            if let Some(denied) = spec.denied_by(c) {
                issues.push(ValidationIssue {
                    kind: IssueKind::ForeignScript,
                    position,
                    codepoint: c,
                    script_name: Some(denied.name.clone()),
                });
                continue;
            }

            if c.is_whitespace() || c.is_ascii_punctuation() || spec.allows(c) {
                continue;
            }

            issues.push(ValidationIssue {
                kind: IssueKind::DisallowedCodepoint,
                position,
                codepoint: c,
                script_name: None,
            });
        }

        if spec.required_joiner.is_some() {
            for (position, pair) in chars.windows(2).enumerate() {
                if spec.joiner_patterns.iter().any(|p| p.matches(pair[0], pair[1])) {
                    issues.push(ValidationIssue {
                        kind: IssueKind::MissingJoiner,
                        position: position + 1,
                        codepoint: pair[1],
                        script_name: Some(spec.name.clone()),
                    });
                }
            }
        }

        issues.sort_by_key(|issue| issue.position);

        if !issues.is_empty() {
            debug!("{} script check found {} issue(s)", spec.name, issues.len());
        }

        issues
    }
}

/// Script contracts keyed by normalized language code
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    specs: HashMap<String, ScriptSpec>,
}

fn registry_key(code: &str) -> String {
    normalize_to_part2t(code).unwrap_or_else(|_| code.trim().to_lowercase())
}

impl ScriptRegistry {
    /// Empty registry: no language is script-checked
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Sinhala, Tamil and Devanagari contracts
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ScriptSpec::sinhala());
        registry.register(ScriptSpec::tamil());
        registry.register(ScriptSpec::devanagari());
        registry
    }

    /// Register a spec for each of its languages, replacing earlier entries
    pub fn register(&mut self, spec: ScriptSpec) {
        for language in &spec.languages {
            self.specs.insert(registry_key(language), spec.clone());
        }
    }

    /// Contract for a target language, if one is registered
    pub fn get(&self, language: &str) -> Option<&ScriptSpec> {
        self.specs.get(&registry_key(language))
    }
}
