// SPDX-License-Identifier: MIT OR Apache-2.0
//! Textual mini-DSL for linear operation chains.
//!
//! ```text
//! graph-string := operation (operation)*
//! operation    := identifier (key "=" value)*
//! ```
//!
//! Tokens are separated by whitespace. Values may be double-quoted, with
//! `\"` and `\\` as escapes, when they contain whitespace or reserved
//! characters. Nested `aux=[ ... ]` sub-graphs are not part of the grammar.

use crate::operation::{Operation, OperationKind};
use crate::value::{PropertyError, PropertyValue, ValueError};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// A linear chain of operations, spliced into a graph as a sub-chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    operations: Vec<Operation>,
}

impl Fragment {
    /// Parse a graph string
    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        let mut operations: Vec<Operation> = Vec::new();

        for token in tokenize(text)? {
            match token {
                Token::Word { text, offset } => {
                    let kind = OperationKind::from_identifier(&text).ok_or_else(|| {
                        SyntaxError::UnknownOperation {
                            identifier: text.clone(),
                            offset,
                        }
                    })?;
                    operations.push(kind.default_operation());
                }
                Token::Assign { key, value, raw, offset } => {
                    let operation = operations
                        .last_mut()
                        .ok_or(SyntaxError::OrphanProperty { token: raw, offset })?;
                    apply(operation, &key, &value, offset)?;
                }
            }
        }

        if operations.is_empty() {
            return Err(SyntaxError::Empty);
        }
        Ok(Self { operations })
    }

    /// Build a fragment from operations already constructed in code
    pub fn from_operations(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Operations in chain order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the fragment has no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

fn apply(operation: &mut Operation, key: &str, text: &str, offset: usize) -> Result<(), SyntaxError> {
    let kind = operation.kind();
    let unknown = || SyntaxError::UnknownProperty {
        operation: kind,
        property: key.to_string(),
        offset,
    };
    let invalid = |reason: ValueError| SyntaxError::InvalidValue {
        property: key.to_string(),
        offset,
        reason,
    };

    let property_kind = kind.property_kind(key).ok_or_else(unknown)?;
    let value = PropertyValue::parse(property_kind, text).map_err(invalid)?;
    operation.set(key, &value).map_err(|err| match err {
        PropertyError::UnknownProperty { .. } => unknown(),
        PropertyError::InvalidValue { reason, .. } => invalid(reason),
    })
}

impl FromStr for Fragment {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serializes back to a graph string; only non-default properties are written
impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, operation) in self.operations.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(operation.kind().identifier())?;
            for (name, value) in operation.changed_properties() {
                write!(f, " {name}={}", quote(&value.to_string()))?;
            }
        }
        Ok(())
    }
}

fn needs_quotes(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '\\' | '=' | '[' | ']')
}

fn quote(text: &str) -> Cow<'_, str> {
    if !text.is_empty() && !text.chars().any(needs_quotes) {
        return Cow::Borrowed(text);
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

#[derive(Debug)]
enum Token {
    Word {
        text: String,
        offset: usize,
    },
    Assign {
        key: String,
        value: String,
        raw: String,
        offset: usize,
    },
}

fn tokenize(text: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut current = String::new();
        let mut key: Option<String> = None;
        let mut quoted = false;
        let mut malformed = false;

        while let Some(&(pos, c)) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            match c {
                '"' => {
                    quoted = true;
                    let mut closed = false;
                    while let Some((_, c)) = chars.next() {
                        match c {
                            '"' => {
                                closed = true;
                                break;
                            }
                            '\\' => match chars.next() {
                                Some((_, escaped)) => current.push(escaped),
                                None => break,
                            },
                            other => current.push(other),
                        }
                    }
                    if !closed {
                        return Err(SyntaxError::UnterminatedQuote { offset: pos });
                    }
                }
                '[' | ']' => return Err(SyntaxError::NestedGraph { offset: pos }),
                '=' if key.is_none() && !quoted => key = Some(std::mem::take(&mut current)),
                '=' => malformed = true,
                other => current.push(other),
            }
        }

        let end = chars.peek().map_or(text.len(), |&(i, _)| i);
        let raw = text[offset..end].to_string();

        match key {
            Some(key) => {
                if key.is_empty() || malformed || (current.is_empty() && !quoted) {
                    return Err(SyntaxError::MalformedProperty { token: raw, offset });
                }
                tokens.push(Token::Assign {
                    key,
                    value: current,
                    raw,
                    offset,
                });
            }
            None if malformed => {
                return Err(SyntaxError::MalformedProperty { token: raw, offset });
            }
            None => tokens.push(Token::Word {
                text: current,
                offset,
            }),
        }
    }

    Ok(tokens)
}

/// Error when parsing a graph string
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    /// Nothing to parse
    #[error("Empty graph string")]
    Empty,

    /// Identifier not in the catalog
    #[error("Unknown operation `{identifier}` at offset {offset}")]
    UnknownOperation {
        /// Identifier as written
        identifier: String,
        /// Byte offset of the token
        offset: usize,
    },

    /// `key=value` appearing before any operation
    #[error("Property `{token}` at offset {offset} does not follow an operation")]
    OrphanProperty {
        /// Token as written
        token: String,
        /// Byte offset of the token
        offset: usize,
    },

    /// Token is not a well-formed `key=value` pair
    #[error("Malformed property `{token}` at offset {offset}")]
    MalformedProperty {
        /// Token as written
        token: String,
        /// Byte offset of the token
        offset: usize,
    },

    /// Operation has no such property
    #[error("`{operation}` has no property `{property}` (offset {offset})")]
    UnknownProperty {
        /// Operation the property was applied to
        operation: OperationKind,
        /// Property name as written
        property: String,
        /// Byte offset of the token
        offset: usize,
    },

    /// Value cannot be used for the property
    #[error("Invalid value for `{property}` at offset {offset}: {reason}")]
    InvalidValue {
        /// Property name as written
        property: String,
        /// Byte offset of the token
        offset: usize,
        /// Why it was rejected
        reason: ValueError,
    },

    /// Missing closing quote
    #[error("Unterminated quote at offset {offset}")]
    UnterminatedQuote {
        /// Byte offset of the opening quote
        offset: usize,
    },

    /// `[ ... ]` sub-graphs are not supported
    #[error("Nested sub-graphs are not supported (offset {offset})")]
    NestedGraph {
        /// Byte offset of the bracket
        offset: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::BlendMode;
    use crate::value::Color;

    #[test]
    fn test_two_operation_chain() {
        let fragment = Fragment::parse("blur radius=2 overlay color=#ffffff").unwrap();
        let ops = fragment.operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].kind(), OperationKind::GaussianBlur);
        assert_eq!(ops[0].get("radius"), Some(PropertyValue::Double(2.0)));
        assert_eq!(ops[1].kind(), OperationKind::ColorOverlay);
        assert_eq!(ops[1].get("color"), Some(PropertyValue::Color(Color::WHITE)));
    }

    #[test]
    fn test_round_trip() {
        let sources = [
            " rgb-clip  color-to-alpha color=#ff7aff   color-overlay value=#ffffff ",
            "gegl:median-blur radius=0 abyss-policy=none gegl:crop",
            "layer-mode layer-mode=41 blend-space=1 opacity=0.03",
            "layer src=\"my overlay.png\" opacity=0.5",
            "cell-noise shape=1 scale=0.5 seed=42 iterations=3",
            "dropshadow radius=2 color=#74e3ff80",
        ];
        for source in sources {
            let fragment = Fragment::parse(source).unwrap();
            let serialized = fragment.to_string();
            let reparsed = Fragment::parse(&serialized).unwrap();
            assert_eq!(fragment, reparsed, "{source} -> {serialized}");
        }
    }

    #[test]
    fn test_serialization_is_normalized() {
        let fragment = Fragment::parse("gegl:layer-mode layer-mode=41 opacity=1").unwrap();
        assert_eq!(fragment.to_string(), "layer-mode layer-mode=divide");
        assert_eq!(fragment.operations()[0].get("layer-mode"), Some(BlendMode::Divide.into()));
    }

    #[test]
    fn test_quoted_values() {
        let fragment = Fragment::parse(r#"layer src="a \"b\" c.png""#).unwrap();
        assert_eq!(
            fragment.operations()[0].get("src"),
            Some(PropertyValue::FilePath("a \"b\" c.png".to_string()))
        );
        assert_eq!(fragment.to_string(), r#"layer src="a \"b\" c.png""#);
    }

    #[test]
    fn test_unknown_operation() {
        assert_eq!(
            Fragment::parse("rgb-clip sparkle"),
            Err(SyntaxError::UnknownOperation {
                identifier: "sparkle".to_string(),
                offset: 9,
            })
        );
    }

    #[test]
    fn test_malformed_properties() {
        for source in ["blur radius=", "blur =2", "blur radius==2", "blur \"radius\"=2"] {
            assert!(
                matches!(Fragment::parse(source), Err(SyntaxError::MalformedProperty { .. })),
                "{source}"
            );
        }
        assert!(matches!(
            Fragment::parse("radius=2 blur"),
            Err(SyntaxError::OrphanProperty { .. })
        ));
    }

    #[test]
    fn test_property_errors() {
        assert!(matches!(
            Fragment::parse("blur sigma=2"),
            Err(SyntaxError::UnknownProperty { operation: OperationKind::GaussianBlur, .. })
        ));
        assert!(matches!(
            Fragment::parse("blur radius=wide"),
            Err(SyntaxError::InvalidValue { .. })
        ));
        assert!(matches!(
            Fragment::parse("color-overlay value=#ff7af"),
            Err(SyntaxError::InvalidValue { .. })
        ));
        assert!(matches!(
            Fragment::parse("layer-mode layer-mode=sparkle"),
            Err(SyntaxError::InvalidValue { reason: ValueError::OutOfDomain { .. }, .. })
        ));
        for text in ["blur radius=NaN", "blur radius=inf", "dropshadow opacity=-inf"] {
            assert!(
                matches!(Fragment::parse(text), Err(SyntaxError::InvalidValue { reason: ValueError::Unparsable { .. }, .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(Fragment::parse("   "), Err(SyntaxError::Empty));
        assert!(matches!(
            Fragment::parse("layer src=\"open"),
            Err(SyntaxError::UnterminatedQuote { .. })
        ));
        assert!(matches!(
            Fragment::parse("src aux=[ color value=#ff7aff ]"),
            Err(SyntaxError::NestedGraph { .. })
        ));
    }
}
