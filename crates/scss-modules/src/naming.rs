//! Scoped-name generation and exported-key conventions.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

use crate::config::{LocalsConvention, ScopedNameStrategy};
use crate::resolve::STYLESHEET_FILTER;

static PATTERN_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(name|local|folder|hash)(?::(hex|base64))?(?::(\d+))?\]").unwrap()
});

static MODULE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(STYLESHEET_FILTER).unwrap());

const DEFAULT_PATTERN_HASH_LEN: usize = 8;

/// Per-stylesheet inputs shared by every name generated for it.
pub(crate) struct NamingContext<'a> {
    pub source: &'a Path,
    pub css: &'a str,
    css_hash: String,
}

impl<'a> NamingContext<'a> {
    pub fn new(source: &'a Path, css: &'a str) -> Self {
        let digest = Sha256::digest(css.as_bytes());
        let mut css_hash = format!("{:x}", digest);
        css_hash.truncate(5);
        Self {
            source,
            css,
            css_hash,
        }
    }

    /// Generate the scoped name of `local` with the given strategy.
    ///
    /// The name is returned unescaped, as it appears in a `class` attribute;
    /// selectors must go through [`escape_ident`]. An empty custom or pattern
    /// result falls back to the default shape.
    pub fn scoped_name(&self, strategy: &ScopedNameStrategy, local: &str) -> String {
        let name = match strategy {
            ScopedNameStrategy::Default => String::new(),
            ScopedNameStrategy::Pattern(pattern) => self.interpolate(pattern, local),
            ScopedNameStrategy::Custom(generate) => generate(local, self.source, self.css),
        };
        if !name.is_empty() {
            return name;
        }
        let line = first_occurrence_line(self.css, local);
        format!("_{}_{}_{}", local, self.css_hash, line)
    }

    fn interpolate(&self, pattern: &str, local: &str) -> String {
        PATTERN_TOKEN
            .replace_all(pattern, |caps: &Captures<'_>| {
                match &caps[1] {
                    "name" => module_name(self.source),
                    "local" => local.to_string(),
                    "folder" => self
                        .source
                        .parent()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    _ => {
                        let len = caps
                            .get(3)
                            .and_then(|m| m.as_str().parse::<usize>().ok())
                            .unwrap_or(DEFAULT_PATTERN_HASH_LEN);
                        let base64 = caps.get(2).is_some_and(|m| m.as_str() == "base64");
                        self.local_hash(local, base64, len)
                    }
                }
            })
            .into_owned()
    }

    fn local_hash(&self, local: &str, base64: bool, len: usize) -> String {
        let input = format!("{}+{}", self.source.display(), local);
        let digest = Sha256::digest(input.as_bytes());
        let mut encoded = if base64 {
            URL_SAFE_NO_PAD.encode(digest)
        } else {
            format!("{:x}", digest)
        };
        encoded.truncate(len);
        encoded
    }
}

/// 1-based line of the first `.{local}` class selector in `css`, or 1 when
/// absent. `.a` does not match the start of `.ab`.
fn first_occurrence_line(css: &str, local: &str) -> usize {
    let needle = format!(".{}", escape_ident(local));
    let found = css.match_indices(&needle).find(|(index, _)| {
        let next = css[index + needle.len()..].chars().next();
        !next.is_some_and(|c| is_name_char(c) || c == '\\')
    });
    match found {
        Some((index, _)) => css[..index].matches('\n').count() + 1,
        None => 1,
    }
}

/// File name of a stylesheet without its `.module(s).scss` suffix.
fn module_name(source: &Path) -> String {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stripped = MODULE_SUFFIX.replace(&file_name, "");
    if stripped.len() != file_name.len() {
        return stripped.into_owned();
    }
    source
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

/// Serialize `name` as a CSS identifier, escaping what cannot appear bare.
///
/// Distinct names always serialize to distinct identifiers, so `md:flex`
/// becomes `md\:flex` rather than colliding with `md_flex`.
pub(crate) fn escape_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().enumerate().peekable();
    let first = name.chars().next();
    while let Some((i, c)) = chars.next() {
        let hex_escape = matches!(c, '\u{1}'..='\u{1f}' | '\u{7f}')
            || (i == 0 && c.is_ascii_digit())
            || (i == 1 && c.is_ascii_digit() && first == Some('-'));
        if c == '\0' {
            out.push('\u{FFFD}');
        } else if hex_escape {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if i == 0 && c == '-' && chars.peek().is_none() {
            out.push_str("\\-");
        } else if is_name_char(c) {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// Split an identifier into words on separators and case boundaries.
fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    for chunk in name.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = chunk.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && c.is_uppercase() {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let boundary = !prev.is_uppercase() || next_is_lower;
                if boundary && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

/// `btn-primary_large` -> `btnPrimaryLarge`.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, word) in words(name).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// Camelize only dash-separated parts: `btn-primary_large` -> `btnPrimary_large`.
pub fn dashes_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            while chars.peek() == Some(&'-') {
                chars.next();
            }
            match chars.peek() {
                Some(&next) if next.is_alphanumeric() || next == '_' => {
                    chars.next();
                    out.extend(next.to_uppercase());
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Exported keys for a local class name under `convention`, in export order.
pub fn export_keys(convention: LocalsConvention, local: &str) -> Vec<String> {
    let with_original = |converted: String| {
        if converted == local {
            vec![converted]
        } else {
            vec![local.to_string(), converted]
        }
    };
    match convention {
        LocalsConvention::AsIs => vec![local.to_string()],
        LocalsConvention::CamelCase => with_original(camel_case(local)),
        LocalsConvention::CamelCaseOnly => vec![camel_case(local)],
        LocalsConvention::Dashes => with_original(dashes_camel_case(local)),
        LocalsConvention::DashesOnly => vec![dashes_camel_case(local)],
    }
}
