//! OSGi header clause parsing.
//!
//! A header value is a comma-separated list of clauses, each of the form
//! `name; attr=value; directive:=value`. Quoted values may contain commas
//! and semicolons; a backslash escapes the next character inside quotes.

use indexmap::IndexMap;
use provision_types::{bail, Result};

/// One clause of a manifest header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderClause {
    /// Leading path or symbolic name
    pub name: String,
    /// `key=value` pairs, in declaration order
    pub attributes: IndexMap<String, String>,
    /// `key:=value` pairs, in declaration order
    pub directives: IndexMap<String, String>,
}

impl HeaderClause {
    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        lookup(&self.attributes, key)
    }

    /// Case-insensitive directive lookup.
    pub fn directive(&self, key: &str) -> Option<&str> {
        lookup(&self.directives, key)
    }

    /// Look a key up as a directive first, then as an attribute.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.directive(key).or_else(|| self.attribute(key))
    }
}

fn lookup<'a>(map: &'a IndexMap<String, String>, key: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Parse a full header value into clauses.
///
/// # Errors
///
/// Returns `ProvisionError::Manifest` for unterminated quotes, empty
/// clause names, or parameters missing a key.
///
/// # Example
///
/// ```
/// use provision_catalog::header::parse_header;
///
/// let clauses = parse_header(r#"com.acme.web; type="osgi.bundle"; start-level=10, com.acme.api"#).unwrap();
/// assert_eq!(clauses.len(), 2);
/// assert_eq!(clauses[0].attribute("type"), Some("osgi.bundle"));
/// assert_eq!(clauses[1].name, "com.acme.api");
/// ```
pub fn parse_header(value: &str) -> Result<Vec<HeaderClause>> {
    let mut clauses = Vec::new();
    for raw in split_unquoted(value, ',')? {
        if raw.trim().is_empty() {
            continue;
        }
        clauses.push(parse_clause(raw)?);
    }
    Ok(clauses)
}

/// Split a comma-separated list, honouring quotes, and unquote each item.
///
/// Used for directive values such as `ibm.tolerates:="4.0,5.0"`.
pub fn parse_list(value: &str) -> Result<Vec<String>> {
    Ok(split_unquoted(value, ',')?
        .into_iter()
        .map(|item| unquote(item.trim()))
        .filter(|item| !item.is_empty())
        .collect())
}

fn parse_clause(raw: &str) -> Result<HeaderClause> {
    let mut segments = split_unquoted(raw, ';')?.into_iter();
    let name = segments.next().map(str::trim).unwrap_or_default();
    if name.is_empty() || name.contains('=') {
        bail!(Manifest, "Header clause has no name: '{}'", raw.trim());
    }

    let mut clause = HeaderClause {
        name: unquote(name),
        ..Default::default()
    };

    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some(eq) = segment.find('=') else {
            bail!(Manifest, "Parameter '{}' in clause '{}' has no value", segment, clause.name);
        };
        let (key, value) = (&segment[..eq], unquote(segment[eq + 1..].trim()));
        if let Some(directive) = key.strip_suffix(':') {
            let directive = directive.trim();
            if directive.is_empty() {
                bail!(Manifest, "Directive without a name in clause '{}'", clause.name);
            }
            clause.directives.insert(directive.to_string(), value);
        } else {
            // Typed attributes (`version:Version=1.0`) keep only the name.
            let key = key.split(':').next().unwrap_or_default().trim();
            if key.is_empty() {
                bail!(Manifest, "Attribute without a name in clause '{}'", clause.name);
            }
            clause.attributes.insert(key.to_string(), value);
        }
    }

    Ok(clause)
}

fn split_unquoted(input: &str, separator: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if in_quotes {
        bail!(Manifest, "Unterminated quote in header value: {}", input);
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn unquote(value: &str) -> String {
    let inner = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner,
        None => return value.to_string(),
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
