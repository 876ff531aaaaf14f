//! Inline prompt modifiers.
//!
//! Prompts may carry `--flag value` tokens that steer generation:
//!
//! | Flag     | Value            | Meaning               |
//! |----------|------------------|-----------------------|
//! | `--ar`   | `W:H`            | aspect ratio          |
//! | `--s`    | integer          | stylization weight    |
//! | `--sref` | word or id       | style reference       |
//!
//! [`parse`] splits a prompt into its base text and the recognized
//! modifiers; [`serialize`] rebuilds a prompt from base text and a
//! [`PromptTags`] set. Flags with a missing or malformed value are not
//! modifiers and stay in the base text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Aspect ratios offered as one-click presets.
pub const ASPECT_RATIO_PRESETS: [&str; 3] = ["1:1", "16:9", "9:16"];

/// Style reference value asking the service to pick a random style.
pub const RANDOM_STYLE_REFERENCE: &str = "random";

/// Upper bound of the stylization weight accepted by the service.
pub const MAX_STYLIZATION: u32 = 1_000;

static ASPECT_RATIO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d+)$").expect("valid regex"));

static STYLE_REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The recognized modifier flags, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Ar,
    S,
    Sref,
}

impl CommandKind {
    /// Canonical order: aspect ratio, stylization, style reference.
    pub const ALL: [CommandKind; 3] = [CommandKind::Ar, CommandKind::S, CommandKind::Sref];

    pub fn flag(self) -> &'static str {
        match self {
            CommandKind::Ar => "--ar",
            CommandKind::S => "--s",
            CommandKind::Sref => "--sref",
        }
    }

    fn from_flag(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.flag() == token)
    }

    fn index(self) -> usize {
        match self {
            CommandKind::Ar => 0,
            CommandKind::S => 1,
            CommandKind::Sref => 2,
        }
    }

    /// Whether `value` is well-formed for this flag.
    fn accepts(self, value: &str) -> bool {
        match self {
            CommandKind::Ar => ASPECT_RATIO_RE.is_match(value),
            CommandKind::S => value.bytes().all(|b| b.is_ascii_digit()) && value.parse::<u32>().is_ok(),
            CommandKind::Sref => STYLE_REFERENCE_RE.is_match(value),
        }
    }
}

/// One modifier extracted from a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTag {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub value: String,
}

/// Result of [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedPrompt {
    /// Prompt with recognized modifiers removed and whitespace collapsed.
    pub base_prompt: String,
    /// At most one tag per kind, in [`CommandKind::ALL`] order.
    pub commands: Vec<CommandTag>,
}

impl ParsedPrompt {
    pub fn command(&self, kind: CommandKind) -> Option<&str> {
        self.commands
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value.as_str())
    }

    /// Structured view of the commands, with unset sentinels for absent tags.
    pub fn tags(&self) -> PromptTags {
        PromptTags {
            aspect_ratio: self.command(CommandKind::Ar).unwrap_or_default().to_string(),
            stylization: self
                .command(CommandKind::S)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            style_reference: self
                .command(CommandKind::Sref)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Modifier values to append to a base prompt.
///
/// Empty strings and a zero stylization mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTags {
    pub aspect_ratio: String,
    pub stylization: u32,
    pub style_reference: String,
}

impl PromptTags {
    /// Check the values against what the service accepts.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.aspect_ratio.is_empty() {
            let valid = ASPECT_RATIO_RE
                .captures(&self.aspect_ratio)
                .map(|caps| {
                    caps.iter()
                        .skip(1)
                        .flatten()
                        .all(|m| m.as_str().parse::<u32>().is_ok_and(|n| n > 0))
                })
                .unwrap_or(false);
            if !valid {
                return Err(CoreError::Validation(format!(
                    "Aspect ratio must look like W:H with nonzero sides (got {:?})",
                    self.aspect_ratio
                )));
            }
        }
        if self.stylization > MAX_STYLIZATION {
            return Err(CoreError::Validation(format!(
                "Stylization must be at most {MAX_STYLIZATION} (got {})",
                self.stylization
            )));
        }
        if !self.style_reference.is_empty() && !STYLE_REFERENCE_RE.is_match(&self.style_reference) {
            return Err(CoreError::Validation(format!(
                "Style reference must be a single word or id (got {:?})",
                self.style_reference
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parse / serialize
// ---------------------------------------------------------------------------

/// Split `prompt` into base text and recognized modifiers.
///
/// When a flag appears more than once, the first well-formed occurrence
/// wins and every well-formed occurrence is removed from the base text.
pub fn parse(prompt: &str) -> ParsedPrompt {
    let tokens: Vec<&str> = prompt.split_whitespace().collect();
    let mut base: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut found: [Option<&str>; 3] = [None; 3];

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if let Some(kind) = CommandKind::from_flag(token) {
            if let Some(value) = tokens.get(i + 1).copied().filter(|v| kind.accepts(v)) {
                found[kind.index()].get_or_insert(value);
                i += 2;
                continue;
            }
        }
        base.push(token);
        i += 1;
    }

    let commands = CommandKind::ALL
        .into_iter()
        .filter_map(|kind| {
            found[kind.index()].map(|value| CommandTag {
                kind,
                value: value.to_string(),
            })
        })
        .collect();

    ParsedPrompt {
        base_prompt: base.join(" "),
        commands,
    }
}

/// Append the set values of `tags` to `base_prompt` in canonical order.
pub fn serialize(base_prompt: &str, tags: &PromptTags) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    let base = base_prompt.trim();
    if !base.is_empty() {
        parts.push(base.to_string());
    }
    if !tags.aspect_ratio.is_empty() {
        parts.push(format!("{} {}", CommandKind::Ar.flag(), tags.aspect_ratio));
    }
    if tags.stylization > 0 {
        parts.push(format!("{} {}", CommandKind::S.flag(), tags.stylization));
    }
    if !tags.style_reference.is_empty() {
        parts.push(format!("{} {}", CommandKind::Sref.flag(), tags.style_reference));
    }

    parts.join(" ")
}

/// Replace whatever modifiers `prompt` carries with `tags`.
pub fn apply_tags(prompt: &str, tags: &PromptTags) -> String {
    serialize(&parse(prompt).base_prompt, tags)
}
