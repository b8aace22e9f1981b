//! # Property filters for `find` and dependency declarations.
//!
//! [`Filter`] is a small LDAP-style predicate language over a capability's
//! [`Properties`](crate::Properties):
//!
//! ```text
//! (key=value)          equality (numeric for Int, boolean for Bool)
//! (key>=value)         greater-or-equal
//! (key<=value)         less-or-equal
//! (key=*)              presence
//! (&(a=1)(b=2))        conjunction
//! (|(a=1)(a=2))        disjunction
//! (!(a=1))             negation
//! ```
//!
//! A malformed expression is rejected at parse time with
//! [`RegistryError::DependencyUnsatisfiable`]; it never fails lazily during
//! matching.
//!
//! # Example
//! ```
//! use capvisor::{Filter, Properties, PropertyValue};
//!
//! let filter = Filter::parse("(&(kind=cache)(ranking>=5))").unwrap();
//!
//! let mut props = Properties::new();
//! props.insert("kind".into(), PropertyValue::from("cache"));
//! props.insert("ranking".into(), PropertyValue::from(7));
//! assert!(filter.matches(&props));
//!
//! props.insert("ranking".into(), PropertyValue::from(1));
//! assert!(!filter.matches(&props));
//! ```

use crate::error::RegistryError;
use crate::registry::properties::{Properties, PropertyValue};

/// A parsed property predicate.
#[derive(Clone, Debug)]
pub enum Filter {
    /// All sub-filters must match.
    And(Vec<Filter>),
    /// At least one sub-filter must match.
    Or(Vec<Filter>),
    /// The sub-filter must not match.
    Not(Box<Filter>),
    /// The key must be present with any value.
    Present(String),
    /// The key's value must equal the operand.
    Eq(String, String),
    /// The key's value must be greater than or equal to the operand.
    Ge(String, String),
    /// The key's value must be less than or equal to the operand.
    Le(String, String),
}

impl Filter {
    /// Parses a filter expression.
    ///
    /// # Errors
    /// Returns [`RegistryError::DependencyUnsatisfiable`] with the offending
    /// text and a reason when the expression is malformed.
    pub fn parse(text: &str) -> Result<Filter, RegistryError> {
        let mut parser = Parser {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        };
        let filter = parser.parse_filter()?;
        parser.skip_ws();
        if parser.pos != parser.bytes.len() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(filter)
    }

    /// Evaluates the filter against a property map.
    pub fn matches(&self, props: &Properties) -> bool {
        match self {
            Filter::And(subs) => subs.iter().all(|f| f.matches(props)),
            Filter::Or(subs) => subs.iter().any(|f| f.matches(props)),
            Filter::Not(sub) => !sub.matches(props),
            Filter::Present(key) => props.contains_key(key),
            Filter::Eq(key, operand) => {
                props.get(key).is_some_and(|v| compare(v, operand) == Some(std::cmp::Ordering::Equal))
            }
            Filter::Ge(key, operand) => props
                .get(key)
                .and_then(|v| compare(v, operand))
                .is_some_and(|ord| ord != std::cmp::Ordering::Less),
            Filter::Le(key, operand) => props
                .get(key)
                .and_then(|v| compare(v, operand))
                .is_some_and(|ord| ord != std::cmp::Ordering::Greater),
        }
    }
}

/// Compares a property value against a textual operand.
///
/// Int values compare numerically (unparseable operand = no match), Bool
/// values compare against `true`/`false`, Str values compare lexically.
fn compare(value: &PropertyValue, operand: &str) -> Option<std::cmp::Ordering> {
    match value {
        PropertyValue::Str(s) => Some(s.as_str().cmp(operand)),
        PropertyValue::Int(n) => operand.trim().parse::<i64>().ok().map(|rhs| n.cmp(&rhs)),
        PropertyValue::Bool(b) => operand.trim().parse::<bool>().ok().map(|rhs| b.cmp(&rhs)),
    }
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &str) -> RegistryError {
        RegistryError::DependencyUnsatisfiable {
            filter: self.text.to_string(),
            reason: format!("{reason} (at offset {})", self.pos),
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), RegistryError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", byte as char)))
        }
    }

    fn parse_filter(&mut self) -> Result<Filter, RegistryError> {
        self.skip_ws();
        self.expect(b'(')?;
        self.skip_ws();
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_comparison()?,
            None => return Err(self.error("unbalanced parenthesis")),
        };
        self.skip_ws();
        self.expect(b')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>, RegistryError> {
        let mut subs = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'(') => subs.push(self.parse_filter()?),
                _ => break,
            }
        }
        if subs.is_empty() {
            return Err(self.error("composite filter needs at least one operand"));
        }
        Ok(subs)
    }

    fn parse_comparison(&mut self) -> Result<Filter, RegistryError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'=' | b'<' | b'>' | b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        let key = self.text[start..self.pos].trim();
        if key.is_empty() {
            return Err(self.error("empty key"));
        }

        let op = match self.peek() {
            Some(b'=') => {
                self.pos += 1;
                b'='
            }
            Some(b'>') => {
                self.pos += 1;
                self.expect(b'=')?;
                b'>'
            }
            Some(b'<') => {
                self.pos += 1;
                self.expect(b'=')?;
                b'<'
            }
            _ => return Err(self.error("expected comparison operator")),
        };

        let vstart = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        let value = &self.text[vstart..self.pos];

        Ok(match op {
            b'=' if value == "*" => Filter::Present(key.to_string()),
            b'=' => Filter::Eq(key.to_string(), value.to_string()),
            b'>' => Filter::Ge(key.to_string(), value.to_string()),
            _ => Filter::Le(key.to_string(), value.to_string()),
        })
    }
}
