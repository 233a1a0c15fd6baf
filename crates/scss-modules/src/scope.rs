//! CSS Modules scoping transform.
//!
//! Rewrites the class and id selectors of compiled CSS into scoped names and
//! returns the mapping from authored name to emitted name.
//!
//! Supported CSS Modules syntax:
//! - every `.class` / `#id` in a selector is local by default
//! - `:global(.a)` leaves its argument untouched, `:local(.a)` forces scoping
//! - bare `:global` / `:local` switch the mode for the rest of the
//!   comma-separated selector
//! - `composes: a b;` and `composes: a from global;` add names to the exported
//!   value of the rule's local classes
//!
//! - `@keyframes name` is local too: the name is scoped, exported, and
//!   rewritten in `animation` / `animation-name` values of the same file;
//!   `@keyframes :global(name)` keeps it as written
//!
//! Blocks of grouping at-rules (`@media`, `@supports`, ...) are scoped
//! recursively. Other at-rule blocks (`@font-face`, keyframe selectors, ...)
//! are copied verbatim. Comments, strings and attribute selectors are never
//! rewritten.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

use crate::config::{LocalsConvention, ScopedNameStrategy};
use crate::naming::{NamingContext, escape_ident, export_keys, is_name_char, is_name_start};

/// Mapping from exported class-name key to the emitted class list.
pub type ClassNameMapping = IndexMap<String, String>;

/// At-rules whose blocks contain rules that must be scoped.
const GROUPING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "layer",
    "container",
    "document",
    "scope",
    "starting-style",
];

/// Errors raised while scoping a stylesheet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("unexpected end of input inside a block")]
    UnclosedBlock,

    #[error("unbalanced parentheses in selector `{0}`")]
    UnbalancedSelector(String),

    #[error("`composes` is only allowed in rules with local class selectors")]
    ComposesWithoutLocalClass,

    #[error("`composes: {names} from {origin}` is not supported; only local and global composition are")]
    UnsupportedComposes { names: String, origin: String },
}

/// Result of scoping a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedCss {
    /// CSS with local names replaced by scoped names
    pub css: String,
    /// Exported key -> space-separated scoped class list
    pub classes: ClassNameMapping,
}

/// The CSS Modules scoping transform.
#[derive(Debug, Clone, Copy)]
pub struct CssModules<'a> {
    convention: LocalsConvention,
    strategy: &'a ScopedNameStrategy,
}

impl<'a> CssModules<'a> {
    pub fn new(convention: LocalsConvention, strategy: &'a ScopedNameStrategy) -> Self {
        Self {
            convention,
            strategy,
        }
    }

    /// Scope `css`, compiled from the stylesheet at `source`.
    pub fn transform(&self, css: &str, source: &Path) -> Result<ScopedCss, ScopeError> {
        let mut scoper = Scoper {
            input: css,
            pos: 0,
            out: String::with_capacity(css.len() + css.len() / 4),
            naming: NamingContext::new(source, css),
            strategy: self.strategy,
            scoped: IndexMap::new(),
            composes: HashMap::new(),
            keyframes: local_keyframes(css),
        };

        scoper.block(BlockKind::TopLevel)?;

        let classes = scoper.export(self.convention);
        Ok(ScopedCss {
            css: scoper.out,
            classes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Composed {
    Local(String),
    Global(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    TopLevel,
    Group,
    Rule,
}

struct Scoper<'a> {
    input: &'a str,
    pos: usize,
    out: String,
    naming: NamingContext<'a>,
    strategy: &'a ScopedNameStrategy,
    /// local name -> scoped name, in order of first appearance
    scoped: IndexMap<String, String>,
    composes: HashMap<String, Vec<Composed>>,
    /// keyframes names declared locally anywhere in the stylesheet
    keyframes: HashSet<String>,
}

impl<'a> Scoper<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Copy whitespace and comments to the output.
    fn copy_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            let ws = rest.len() - trimmed.len();
            if ws > 0 {
                self.out.push_str(&rest[..ws]);
                self.pos += ws;
                continue;
            }
            if trimmed.starts_with("/*") {
                let end = comment_end(trimmed);
                self.out.push_str(&trimmed[..end]);
                self.pos += end;
                continue;
            }
            return;
        }
    }

    /// Scan a prelude or declaration up to `{`, `;` or `}` at nesting depth 0.
    ///
    /// Leaves `pos` on the terminator (or at end of input) and returns it.
    fn scan_item(&mut self) -> Option<char> {
        let input = self.input;
        let bytes = input.as_bytes();
        let mut depth = 0usize;
        let mut i = self.pos;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' => i = string_end(input, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => i += comment_end(&input[i..]),
                b'\\' => i = (i + 2).min(bytes.len()),
                b'(' | b'[' => {
                    depth += 1;
                    i += 1;
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    i += 1;
                }
                b @ (b'{' | b';' | b'}') if depth == 0 => {
                    self.pos = i;
                    return Some(b as char);
                }
                _ => i += 1,
            }
        }
        self.pos = bytes.len();
        None
    }

    /// Copy a block body verbatim up to (not including) its closing brace.
    fn copy_raw_block(&mut self) -> Result<(), ScopeError> {
        let input = self.input;
        let bytes = input.as_bytes();
        let start = self.pos;
        let mut depth = 0usize;
        let mut i = self.pos;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' => i = string_end(input, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => i += comment_end(&input[i..]),
                b'\\' => i = (i + 2).min(bytes.len()),
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                b'}' if depth == 0 => {
                    self.out.push_str(&input[start..i]);
                    self.pos = i;
                    return Ok(());
                }
                b'}' => {
                    depth -= 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        Err(ScopeError::UnclosedBlock)
    }

    /// Process items until the end of the current block.
    ///
    /// For nested blocks, returns with `pos` on the closing brace.
    fn block(&mut self, kind: BlockKind) -> Result<(), ScopeError> {
        self.block_with_locals(kind, &[])
    }

    fn block_with_locals(&mut self, kind: BlockKind, locals: &[String]) -> Result<(), ScopeError> {
        loop {
            let before_trivia = self.out.len();
            self.copy_trivia();
            // Output length without the whitespace just before this item
            let item_start = before_trivia + self.out[before_trivia..].trim_end().len();
            match self.peek() {
                None if kind == BlockKind::TopLevel => return Ok(()),
                None => return Err(ScopeError::UnclosedBlock),
                Some('}') if kind != BlockKind::TopLevel => return Ok(()),
                Some('}') => {
                    // Stray closing brace at top level; keep it.
                    self.out.push('}');
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            let input = self.input;
            let start = self.pos;
            let terminator = self.scan_item();
            let item = &input[start..self.pos];

            match terminator {
                Some('{') => {
                    self.pos += 1;
                    if let Some(keyframes) = keyframes_name(item) {
                        self.rewrite_keyframes_prelude(item, &keyframes);
                        self.out.push('{');
                        self.copy_raw_block()?;
                    } else if item.starts_with('@') {
                        self.out.push_str(item);
                        self.out.push('{');
                        if GROUPING_AT_RULES.contains(&at_rule_name(item).as_str()) {
                            self.block_with_locals(BlockKind::Group, locals)?;
                        } else {
                            self.copy_raw_block()?;
                        }
                    } else {
                        let rule_locals = self.rewrite_selector(item)?;
                        self.out.push('{');
                        self.block_with_locals(BlockKind::Rule, &rule_locals)?;
                    }
                    // pos is on the closing brace
                    self.out.push('}');
                    self.pos += 1;
                }
                Some(';') => {
                    self.pos += 1;
                    if kind == BlockKind::Rule && self.composes_declaration(item, locals)? {
                        self.out.truncate(item_start);
                        continue;
                    }
                    self.push_declaration(item);
                    self.out.push(';');
                }
                _ => {
                    // Last declaration without a semicolon, or trailing text.
                    if kind == BlockKind::Rule && self.composes_declaration(item, locals)? {
                        self.out.truncate(item_start);
                        continue;
                    }
                    self.push_declaration(item);
                }
            }
        }
    }

    /// Handle a `composes` declaration. Returns false for any other declaration.
    fn composes_declaration(&mut self, decl: &str, locals: &[String]) -> Result<bool, ScopeError> {
        let Some((property, value)) = decl.split_once(':') else {
            return Ok(false);
        };
        if !property.trim().eq_ignore_ascii_case("composes") {
            return Ok(false);
        }
        if locals.is_empty() {
            return Err(ScopeError::ComposesWithoutLocalClass);
        }

        let value = value.trim();
        let tokens: Vec<&str> = value.split_whitespace().collect();
        let (names, origin) = match tokens.iter().position(|t| *t == "from") {
            Some(index) => (&tokens[..index], Some(tokens[index + 1..].join(" "))),
            None => (&tokens[..], None),
        };

        let composed: Vec<Composed> = match origin.as_deref() {
            None => names.iter().map(|n| Composed::Local(n.to_string())).collect(),
            Some("global") => names.iter().map(|n| Composed::Global(n.to_string())).collect(),
            Some(other) => {
                return Err(ScopeError::UnsupportedComposes {
                    names: names.join(" "),
                    origin: other.to_string(),
                });
            }
        };

        for name in &composed {
            if let Composed::Local(local) = name {
                self.scope_name(local);
            }
        }
        for local in locals {
            self.composes
                .entry(local.clone())
                .or_default()
                .extend(composed.iter().cloned());
        }
        Ok(true)
    }

    /// Copy a `@keyframes` prelude with its name scoped, or unwrapped when global.
    fn rewrite_keyframes_prelude(&mut self, prelude: &str, keyframes: &KeyframesName) {
        let name = if keyframes.global {
            keyframes.name.clone()
        } else {
            self.scope_name(&keyframes.name)
        };
        self.out.push_str(&prelude[..keyframes.span.start]);
        self.out.push_str(&escape_ident(&name));
        self.out.push_str(&prelude[keyframes.span.end..]);
    }

    /// Copy a declaration, scoping local keyframes names in animation values.
    fn push_declaration(&mut self, decl: &str) {
        match self.rewrite_animation(decl) {
            Some(rewritten) => self.out.push_str(&rewritten),
            None => self.out.push_str(decl),
        }
    }

    /// Rewrite an `animation` / `animation-name` declaration. Returns None for
    /// any other declaration.
    fn rewrite_animation(&mut self, decl: &str) -> Option<String> {
        if self.keyframes.is_empty() {
            return None;
        }
        let (property, value) = decl.split_once(':')?;
        if !is_animation_property(property.trim()) {
            return None;
        }

        let mut out = String::with_capacity(decl.len() + 16);
        out.push_str(property);
        out.push(':');

        let bytes = value.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let rest = &value[i..];
            if bytes[i] == b'"' || bytes[i] == b'\'' {
                let end = string_end(value, i);
                out.push_str(&value[i..end]);
                i = end;
            } else if rest.starts_with("/*") {
                let end = i + comment_end(rest);
                out.push_str(&value[i..end]);
                i = end;
            } else if starts_number(rest) {
                // Durations, counts and delays, with their units
                let len = 1 + rest[1..]
                    .find(|c: char| !(is_name_char(c) || c == '.' || c == '%'))
                    .unwrap_or(rest.len() - 1);
                out.push_str(&rest[..len]);
                i += len;
            } else if ident_starts_at(rest) {
                let (len, name) = read_ident(rest);
                let after = i + len;
                if bytes.get(after) == Some(&b'(') {
                    // Function arguments never name keyframes
                    let end = matching_paren(value, after).map_or(bytes.len(), |close| close + 1);
                    out.push_str(&value[i..end]);
                    i = end;
                } else {
                    if self.keyframes.contains(&name) {
                        let scoped = self.scope_name(&name);
                        out.push_str(&escape_ident(&scoped));
                    } else {
                        out.push_str(&value[i..after]);
                    }
                    i = after;
                }
            } else {
                let end = next_char_boundary(value, i + 1);
                out.push_str(&value[i..end]);
                i = end;
            }
        }
        Some(out)
    }

    /// Scoped name for `local`, generated on first use.
    fn scope_name(&mut self, local: &str) -> String {
        if let Some(scoped) = self.scoped.get(local) {
            return scoped.clone();
        }
        let scoped = self.naming.scoped_name(self.strategy, local);
        self.scoped.insert(local.to_string(), scoped.clone());
        scoped
    }

    /// Rewrite a selector list into the output. Returns the local names it contains.
    fn rewrite_selector(&mut self, selector: &'a str) -> Result<Vec<String>, ScopeError> {
        let mut out = String::with_capacity(selector.len());
        let mut locals = Vec::new();
        self.rewrite_selector_into(selector, false, &mut out, &mut locals)?;
        self.out.push_str(&out);
        Ok(locals)
    }

    fn rewrite_selector_into(
        &mut self,
        selector: &'a str,
        force_global: bool,
        out: &mut String,
        locals: &mut Vec<String>,
    ) -> Result<(), ScopeError> {
        let bytes = selector.as_bytes();
        let mut global = force_global;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' => {
                    let end = string_end(selector, i);
                    out.push_str(&selector[i..end]);
                    i = end;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let end = i + comment_end(&selector[i..]);
                    out.push_str(&selector[i..end]);
                    i = end;
                }
                b'[' => {
                    let end = attribute_end(selector, i);
                    out.push_str(&selector[i..end]);
                    i = end;
                }
                b'\\' => {
                    let end = (i + 2).min(bytes.len());
                    let end = next_char_boundary(selector, end);
                    out.push_str(&selector[i..end]);
                    i = end;
                }
                b',' => {
                    global = force_global;
                    out.push(',');
                    i += 1;
                }
                b':' if bytes.get(i + 1) == Some(&b':') => {
                    out.push_str("::");
                    i += 2;
                }
                b':' => {
                    let rest = &selector[i..];
                    if let Some(kind) = mode_pseudo(rest) {
                        let name_len = kind.len() + 1;
                        if rest.as_bytes().get(name_len) == Some(&b'(') {
                            let open = i + name_len;
                            let close = matching_paren(selector, open).ok_or_else(|| {
                                ScopeError::UnbalancedSelector(selector.trim().to_string())
                            })?;
                            let inner = &selector[open + 1..close];
                            self.rewrite_selector_into(inner, kind == "global", out, locals)?;
                            i = close + 1;
                        } else {
                            global = kind == "global";
                            i += name_len;
                            // `:global .a` -> `.a`
                            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                                i += 1;
                            }
                        }
                    } else {
                        out.push(':');
                        i += 1;
                    }
                }
                prefix @ (b'.' | b'#') if ident_starts_at(&selector[i + 1..]) => {
                    let (raw_len, name) = read_ident(&selector[i + 1..]);
                    out.push(prefix as char);
                    if global {
                        out.push_str(&selector[i + 1..i + 1 + raw_len]);
                    } else {
                        out.push_str(&escape_ident(&self.scope_name(&name)));
                        if !locals.contains(&name) {
                            locals.push(name);
                        }
                    }
                    i += 1 + raw_len;
                }
                _ => {
                    let end = next_char_boundary(selector, i + 1);
                    out.push_str(&selector[i..end]);
                    i = end;
                }
            }
        }
        Ok(())
    }

    /// Build the exported mapping, resolving composition transitively.
    fn export(&self, convention: LocalsConvention) -> ClassNameMapping {
        let mut mapping = ClassNameMapping::new();
        for local in self.scoped.keys() {
            let mut names = Vec::new();
            let mut visited = HashSet::new();
            self.expand(local, &mut names, &mut visited);
            let value = names.join(" ");
            for key in export_keys(convention, local) {
                mapping.insert(key, value.clone());
            }
        }
        mapping
    }

    fn expand(&self, local: &str, names: &mut Vec<String>, visited: &mut HashSet<String>) {
        if !visited.insert(local.to_string()) {
            return;
        }
        if let Some(scoped) = self.scoped.get(local) {
            if !names.contains(scoped) {
                names.push(scoped.clone());
            }
        }
        if let Some(composed) = self.composes.get(local) {
            for item in composed {
                match item {
                    Composed::Local(name) => self.expand(name, names, visited),
                    Composed::Global(name) => {
                        if !names.contains(name) {
                            names.push(name.clone());
                        }
                    }
                }
            }
        }
    }
}

/// `:global` / `:local` at the start of `rest` (which begins with `:`).
fn mode_pseudo(rest: &str) -> Option<&'static str> {
    for kind in ["global", "local"] {
        let len = kind.len() + 1;
        let Some(candidate) = rest.get(1..len) else {
            continue;
        };
        if !candidate.eq_ignore_ascii_case(kind) {
            continue;
        }
        let next = rest[len..].chars().next();
        let continues_ident =
            next.is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '\\');
        if !continues_ident {
            return Some(kind);
        }
    }
    None
}

/// The name declared by a `@keyframes` prelude.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyframesName {
    /// Byte range of the name in the prelude, including a `:global()` or
    /// `:local()` wrapper
    span: Range<usize>,
    name: String,
    global: bool,
}

fn is_keyframes_rule(name: &str) -> bool {
    name == "keyframes" || (name.starts_with('-') && name.ends_with("-keyframes"))
}

/// Parse a `@keyframes` (or vendor-prefixed) prelude. Returns None for other
/// at-rules and for string names.
fn keyframes_name(prelude: &str) -> Option<KeyframesName> {
    if !prelude.starts_with('@') {
        return None;
    }
    let at_name = at_rule_name(prelude);
    if !is_keyframes_rule(&at_name) {
        return None;
    }
    let after = 1 + at_name.len();
    let start = after + (prelude[after..].len() - prelude[after..].trim_start().len());
    let rest = &prelude[start..];

    if let Some(kind) = rest.strip_prefix(':').and_then(|_| mode_pseudo(rest)) {
        let open = start + kind.len() + 1;
        if prelude.as_bytes().get(open) != Some(&b'(') {
            return None;
        }
        let close = matching_paren(prelude, open)?;
        let inner = prelude[open + 1..close].trim();
        if !ident_starts_at(inner) {
            return None;
        }
        let (_, name) = read_ident(inner);
        return Some(KeyframesName {
            span: start..close + 1,
            name,
            global: kind == "global",
        });
    }

    if !ident_starts_at(rest) {
        return None;
    }
    let (len, name) = read_ident(rest);
    Some(KeyframesName {
        span: start..start + len,
        name,
        global: false,
    })
}

/// Every keyframes name declared without `:global()` in `css`.
fn local_keyframes(css: &str) -> HashSet<String> {
    let bytes = css.as_bytes();
    let mut names = HashSet::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(css, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i += comment_end(&css[i..]),
            b'\\' => i = (i + 2).min(bytes.len()),
            b'@' => {
                let end = css[i..].find(['{', ';']).map_or(bytes.len(), |n| i + n);
                if let Some(keyframes) = keyframes_name(&css[i..end]) {
                    if !keyframes.global {
                        names.insert(keyframes.name);
                    }
                }
                i = end.max(i + 1);
            }
            _ => i += 1,
        }
    }
    names
}

/// `animation` or `animation-name`, with or without a vendor prefix.
fn is_animation_property(property: &str) -> bool {
    let property = property.to_ascii_lowercase();
    let unprefixed = match property.strip_prefix('-') {
        Some(rest) => rest.split_once('-').map_or(rest, |(_, name)| name),
        None => property.as_str(),
    };
    unprefixed == "animation" || unprefixed == "animation-name"
}

/// Whether a number (with optional sign) starts at the beginning of `s`.
fn starts_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
    match bytes.first() {
        Some(b'0'..=b'9') => true,
        Some(b'.') => digit_at(1),
        Some(b'+' | b'-') => digit_at(1) || (bytes.get(1) == Some(&b'.') && digit_at(2)),
        _ => false,
    }
}

fn at_rule_name(prelude: &str) -> String {
    prelude[1..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Byte length of the comment at the start of `s` (which begins with `/*`).
fn comment_end(s: &str) -> usize {
    match s[2..].find("*/") {
        Some(index) => index + 4,
        None => s.len(),
    }
}

/// Index just past the string literal starting at `start`.
fn string_end(s: &str, start: usize) -> usize {
    let bytes = s.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index just past the attribute selector starting at `start` (on `[`).
fn attribute_end(s: &str, start: usize) -> usize {
    let bytes = s.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(s, i),
            b'\\' => i += 2,
            b']' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = string_end(s, i);
                continue;
            }
            b'\\' => {
                i += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn next_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index.min(s.len())
}

/// Whether an identifier starts at the beginning of `s`.
fn ident_starts_at(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some('-') => matches!(chars.next(), Some(c) if is_name_start(c) || c == '-' || c == '\\'),
        Some('\\') => chars.next().is_some_and(|c| c != '\n'),
        Some(c) => is_name_start(c),
        None => false,
    }
}

/// Read an identifier at the start of `s`: returns its byte length in `s`
/// and its unescaped value.
fn read_ident(s: &str) -> (usize, String) {
    let mut value = String::new();
    let mut chars = s.char_indices().peekable();
    let mut end = 0;
    while let Some(&(i, c)) = chars.peek() {
        if c == '\\' {
            chars.next();
            let Some(&(j, escaped)) = chars.peek() else {
                end = i + 1;
                break;
            };
            if escaped.is_ascii_hexdigit() {
                let mut hex = String::new();
                let mut last = j;
                while let Some(&(k, h)) = chars.peek() {
                    if hex.len() < 6 && h.is_ascii_hexdigit() {
                        hex.push(h);
                        last = k + h.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(&(k, ws)) = chars.peek() {
                    if ws == ' ' || ws == '\t' || ws == '\n' {
                        last = k + 1;
                        chars.next();
                    }
                }
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or('\u{FFFD}');
                value.push(decoded);
                end = last;
            } else {
                chars.next();
                value.push(escaped);
                end = j + escaped.len_utf8();
            }
        } else if is_name_char(c) {
            chars.next();
            value.push(c);
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    (end, value)
}
