// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning figment errors into miette diagnostics.
//!
//! Unknown keys get a "did you mean" suggestion picked by Jaro-Winkler
//! similarity and, when the offending file can be read, a labelled span.

#![allow(unused_assignments)] // emitted by the miette derive

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity needed before a key is suggested.
const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {section}")]
    #[diagnostic(
        code(tether::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), expected))
    )]
    UnknownKey {
        key: String,
        section: String,
        suggestion: Option<String>,
        expected: String,
        #[label("not a known key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(tether::config::invalid_type))]
    InvalidType { key: String, detail: String },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(tether::config::missing_key),
        help("every [[plugins]] entry needs a `name`")
    )]
    MissingKey { key: String },

    #[error("{message}")]
    #[diagnostic(code(tether::config::invalid))]
    Validation { message: String },

    #[error("{0}")]
    #[diagnostic(code(tether::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, expected: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? expected one of: {expected}"),
        None => format!("expected one of: {expected}"),
    }
}

/// Closest key to `unknown` among `candidates`, if any is close enough.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), *c))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Convert every error in a figment failure.
///
/// `sources` pairs file paths with their contents, used to place spans.
pub fn from_figment(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let expected: Vec<&str> = expected.to_vec();
                    let (span, src) = locate(&error, field, sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        section: section_name(&path),
                        suggestion: suggest_key(field, &expected),
                        expected: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&path, field),
                },
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: path.join("."),
                    detail: format!("found {actual}, expected {expected}"),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn section_name(path: &[String]) -> String {
    match path.first().map(String::as_str) {
        None => "the top level".into(),
        Some("plugins") => "[[plugins]]".into(),
        Some(section) => format!("[{section}]"),
    }
}

fn dotted(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

fn locate(
    error: &figment::Error,
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let Some((name, content)) = file
        .as_deref()
        .and_then(|f| sources.iter().find(|(p, _)| p == f))
        .or_else(|| (sources.len() == 1).then(|| &sources[0]))
    else {
        return (None, None);
    };

    match key_offset(content, error.path.first().map(String::as_str), field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside `section` (or anywhere when `None`).
pub fn key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let start = match section {
        Some(section) => {
            let table = format!("[{section}]");
            let array = format!("[[{section}]]");
            content
                .find(&array)
                .map(|p| p + array.len())
                .or_else(|| content.find(&table).map(|p| p + table.len()))?
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(field) {
            if rest.trim_start().starts_with('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Print diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_typos_get_suggestions() {
        let keys = ["name", "type", "path", "checksum", "config_file"];
        assert_eq!(suggest_key("chekcsum", &keys).as_deref(), Some("checksum"));
        assert_eq!(suggest_key("config_fiel", &keys).as_deref(), Some("config_file"));
        assert_eq!(suggest_key("xyzzy", &keys), None);
    }

    #[test]
    fn key_offset_finds_key_inside_plugin_array() {
        let content = "[log]\nlevel = \"info\"\n\n[[plugins]]\nname = \"a\"\n  pth = \"/x\"\n";
        let offset = key_offset(content, Some("plugins"), "pth").unwrap();
        assert_eq!(&content[offset..offset + 3], "pth");
        assert!(key_offset(content, Some("timeouts"), "pth").is_none());
    }

    #[test]
    fn key_prefix_does_not_match_longer_key() {
        let content = "[log]\nlevels = 1\nlevel = 2\n";
        let offset = key_offset(content, Some("log"), "level").unwrap();
        assert_eq!(&content[offset..offset + 9], "level = 2");
    }
}
