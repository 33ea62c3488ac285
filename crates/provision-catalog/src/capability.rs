//! Auto-feature trigger conditions.
//!
//! `IBM-Provision-Capability` is a list of `osgi.identity` clauses, each
//! carrying an LDAP-style filter:
//!
//! ```text
//! osgi.identity; filter:="(&(type=osgi.subsystem.feature)(osgi.identity=com.acme.jdbc-4.*))"
//! ```
//!
//! The capability is satisfied when every clause matches at least one
//! supplying feature. Attribute names and values compare
//! case-insensitively; `*` in a value is a wildcard.

use crate::header::parse_header;
use provision_types::{bail, CapabilityProvider, ProvisionError, Result};
use std::fmt;

const IDENTITY_NAMESPACE: &str = "osgi.identity";

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(&F...)`
    And(Vec<Filter>),
    /// `(|F...)`
    Or(Vec<Filter>),
    /// `(!F)`
    Not(Box<Filter>),
    /// `(attr=value)`, value possibly containing `*`
    Equals {
        /// Lower-cased attribute name
        attribute: String,
        /// Lower-cased pattern
        pattern: String,
    },
    /// `(attr=*)`
    Present {
        /// Lower-cased attribute name
        attribute: String,
    },
}

impl Filter {
    /// Parse a filter string.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Manifest` on any syntax error, including
    /// trailing input after the outermost expression.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = FilterParser {
            chars: input.trim().chars().collect(),
            pos: 0,
        };
        let filter = parser.parse_filter()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() {
            bail!(Manifest, "Unexpected trailing input in filter '{}'", input);
        }
        Ok(filter)
    }

    /// Evaluate against one provider.
    pub fn matches<P: CapabilityProvider + ?Sized>(&self, provider: &P) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(provider)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(provider)),
            Filter::Not(filter) => !filter.matches(provider),
            Filter::Present { attribute } => !provider.attribute_values(attribute).is_empty(),
            Filter::Equals { attribute, pattern } => provider
                .attribute_values(attribute)
                .iter()
                .any(|value| wildcard_match(pattern, &value.to_ascii_lowercase())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) | Filter::Or(filters) => {
                let op = if matches!(self, Filter::And(_)) { '&' } else { '|' };
                write!(f, "({}", op)?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            Filter::Not(filter) => write!(f, "(!{})", filter),
            Filter::Equals { attribute, pattern } => write!(f, "({}={})", attribute, pattern),
            Filter::Present { attribute } => write!(f, "({}=*)", attribute),
        }
    }
}

struct FilterParser {
    chars: Vec<char>,
    pos: usize,
}

impl FilterParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => bail!(Manifest, "Expected '{}' at offset {} but found '{}'", expected, self.pos, c),
            None => bail!(Manifest, "Expected '{}' but the filter ended", expected),
        }
    }

    fn parse_filter(&mut self) -> Result<Filter> {
        self.expect('(')?;
        self.skip_whitespace();
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_item()?,
            None => bail!(Manifest, "Filter ended after '('"),
        };
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            filters.push(self.parse_filter()?);
        }
        if filters.is_empty() {
            bail!(Manifest, "Composite filter at offset {} has no operands", self.pos);
        }
        Ok(filters)
    }

    fn parse_item(&mut self) -> Result<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attribute: String = self.chars[start..self.pos].iter().collect();
        let attribute = attribute.trim().to_ascii_lowercase();
        if attribute.is_empty() {
            bail!(Manifest, "Missing attribute name at offset {}", start);
        }

        match self.peek() {
            // Comparisons are already case-insensitive, so approximate
            // match behaves like equality.
            Some('~') => {
                self.pos += 1;
                self.expect('=')?;
            }
            Some('=') => self.pos += 1,
            Some(c @ ('<' | '>')) => bail!(Manifest, "Unsupported operator '{}=' for attribute '{}'", c, attribute),
            _ => bail!(Manifest, "Expected '=' after attribute '{}'", attribute),
        }

        let mut value = String::new();
        while let Some(c) = self.peek() {
            match c {
                ')' => break,
                '(' => bail!(Manifest, "Unescaped '(' in value of '{}'", attribute),
                '\\' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(escaped) => value.push(escaped),
                        None => bail!(Manifest, "Dangling escape in value of '{}'", attribute),
                    }
                }
                c => value.push(c),
            }
            self.pos += 1;
        }

        if value == "*" {
            Ok(Filter::Present { attribute })
        } else {
            Ok(Filter::Equals {
                attribute,
                pattern: value.to_ascii_lowercase(),
            })
        }
    }
}

fn wildcard_match(pattern: &str, value: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == value;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !value.starts_with(first) || value.len() < first.len() + last.len() || !value.ends_with(last) {
        return false;
    }

    let mut rest = &value[first.len()..value.len() - last.len()];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(idx) => rest = &rest[idx + middle.len()..],
            None => return false,
        }
    }
    true
}

/// The trigger condition of an auto-feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionCapability {
    /// One filter per `osgi.identity` clause.
    Filters(Vec<Filter>),
    /// The header could not be parsed; the feature can never activate.
    Invalid {
        /// Raw header value
        header: String,
        /// Parse failure
        reason: String,
    },
}

impl ProvisionCapability {
    /// Parse an `IBM-Provision-Capability` header.
    ///
    /// Never fails: a malformed header yields [`ProvisionCapability::Invalid`].
    pub fn parse(header: &str) -> Self {
        match Self::try_parse(header) {
            Ok(filters) => ProvisionCapability::Filters(filters),
            Err(e) => ProvisionCapability::Invalid {
                header: header.to_string(),
                reason: e.to_string(),
            },
        }
    }

    fn try_parse(header: &str) -> Result<Vec<Filter>> {
        let clauses = parse_header(header)?;
        if clauses.is_empty() {
            bail!(Manifest, "Capability header has no clauses");
        }
        clauses
            .iter()
            .map(|clause| {
                if !clause.name.eq_ignore_ascii_case(IDENTITY_NAMESPACE) {
                    bail!(Manifest, "Unsupported capability namespace '{}'", clause.name);
                }
                let filter = clause.directive("filter").ok_or_else(|| {
                    ProvisionError::Manifest(format!("Capability clause '{}' has no filter directive", clause.name))
                })?;
                Filter::parse(filter)
            })
            .collect()
    }

    /// Whether the header parsed.
    pub fn is_valid(&self) -> bool {
        matches!(self, ProvisionCapability::Filters(_))
    }

    /// Indices of the supplying providers that matched, or `None` when
    /// some clause matched nothing.
    pub fn satisfying<P: CapabilityProvider + ?Sized>(&self, supplying: &[&P]) -> Option<Vec<usize>> {
        let ProvisionCapability::Filters(filters) = self else {
            return None;
        };

        let mut matched = Vec::new();
        for filter in filters {
            let hits: Vec<usize> = supplying
                .iter()
                .enumerate()
                .filter(|(_, provider)| filter.matches(**provider))
                .map(|(i, _)| i)
                .collect();
            if hits.is_empty() {
                return None;
            }
            matched.extend(hits);
        }
        matched.sort_unstable();
        matched.dedup();
        Some(matched)
    }

    /// Whether every clause matches at least one supplying provider.
    pub fn is_satisfied_by<P: CapabilityProvider + ?Sized>(&self, supplying: &[&P]) -> bool {
        self.satisfying(supplying).is_some()
    }
}
