//! Absolute traversals: dotted-path token sequences such as `aws.foo` or
//! `var.regions["east"]`.
//!
//! Traversals normally arrive pre-parsed from the body collaborator, with
//! accurate spans. [`parse_traversal_abs`] re-parses raw text for the few
//! places that only have a string; spans it produces point into that string
//! under the given file name.

use std::fmt;

use logos::Logos;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::foundation::{Pos, Span};
use crate::value::Value;

/// One segment of a traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraverseStep {
    /// First segment: a bare name
    Root { name: String, span: Span },
    /// `.name`
    Attr { name: String, span: Span },
    /// `[key]`
    Index { key: Value, span: Span },
}

impl TraverseStep {
    pub fn span(&self) -> &Span {
        match self {
            TraverseStep::Root { span, .. }
            | TraverseStep::Attr { span, .. }
            | TraverseStep::Index { span, .. } => span,
        }
    }

    /// Name of a root or attribute step.
    pub fn name(&self) -> Option<&str> {
        match self {
            TraverseStep::Root { name, .. } | TraverseStep::Attr { name, .. } => Some(name),
            TraverseStep::Index { .. } => None,
        }
    }
}

/// An absolute traversal. Always starts with a root step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTraversal")]
pub struct Traversal {
    steps: Vec<TraverseStep>,
}

/// Unchecked wire form of a [`Traversal`].
#[derive(Deserialize)]
struct RawTraversal {
    steps: Vec<TraverseStep>,
}

impl TryFrom<RawTraversal> for Traversal {
    type Error = String;

    fn try_from(raw: RawTraversal) -> Result<Self, Self::Error> {
        match raw.steps.first() {
            Some(TraverseStep::Root { .. }) => Ok(Self { steps: raw.steps }),
            Some(_) => Err("traversal must start with a root step".to_string()),
            None => Err("traversal must have at least one step".to_string()),
        }
    }
}

impl Traversal {
    /// Build a traversal from steps.
    ///
    /// # Panics
    /// Panics if `steps` is empty or does not start with a root step.
    pub fn new(steps: Vec<TraverseStep>) -> Self {
        assert!(
            matches!(steps.first(), Some(TraverseStep::Root { .. })),
            "traversal must start with a root step"
        );
        Self { steps }
    }

    /// Build a traversal of root + attribute names, all sharing one span.
    pub fn from_names(names: &[&str], span: Span) -> Self {
        let steps = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if i == 0 {
                    TraverseStep::Root {
                        name: name.to_string(),
                        span: span.clone(),
                    }
                } else {
                    TraverseStep::Attr {
                        name: name.to_string(),
                        span: span.clone(),
                    }
                }
            })
            .collect();
        Self::new(steps)
    }

    pub fn root_name(&self) -> &str {
        match &self.steps[0] {
            TraverseStep::Root { name, .. } => name,
            _ => unreachable!("traversal always starts with a root step"),
        }
    }

    pub fn steps(&self) -> &[TraverseStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Span covering every step.
    pub fn span(&self) -> Span {
        self.span_from(0)
    }

    /// Span covering the steps from `index` to the end.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn span_from(&self, index: usize) -> Span {
        let first = self.steps[index].span();
        let last = self.steps[self.steps.len() - 1].span();
        if first.file == last.file {
            first.merge(last)
        } else {
            first.clone()
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                TraverseStep::Root { name, .. } => write!(f, "{name}")?,
                TraverseStep::Attr { name, .. } => write!(f, ".{name}")?,
                TraverseStep::Index { key, .. } => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
enum Token {
    #[token(".")]
    Dot,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\")
    })]
    String(String),
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Parse `source` as an absolute traversal.
///
/// Positions are computed assuming `source` is a single line starting at
/// line 1, column 1 of `file`.
///
/// # Errors
///
/// Returns [`DiagnosticKind::InvalidAddress`] diagnostics for unknown
/// characters or a token sequence that is not a traversal.
pub fn parse_traversal_abs(source: &str, file: &str) -> Result<Traversal, Diagnostics> {
    let span_of = |range: std::ops::Range<usize>| {
        let start = range.start as u32;
        let end = range.end as u32;
        Span::new(file, Pos::new(1, start + 1, start), Pos::new(1, end + 1, end))
    };
    let syntax_error = |span: Span, detail: String| {
        Diagnostics::from(
            Diagnostic::error(DiagnosticKind::InvalidAddress, "Invalid reference", detail)
                .with_subject(span),
        )
    };

    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, span_of(lexer.span()))),
            Err(()) => {
                return Err(syntax_error(
                    span_of(lexer.span()),
                    format!("Unexpected character {:?}.", lexer.slice()),
                ));
            }
        }
    }

    let mut iter = tokens.into_iter().peekable();
    let mut steps = match iter.next() {
        Some((Token::Ident(name), span)) => vec![TraverseStep::Root { name, span }],
        Some((_, span)) => {
            return Err(syntax_error(
                span,
                "A reference must begin with a name.".to_string(),
            ));
        }
        None => {
            return Err(syntax_error(
                span_of(0..0),
                "A reference must not be empty.".to_string(),
            ));
        }
    };

    while let Some((token, span)) = iter.next() {
        match token {
            Token::Dot => match iter.next() {
                Some((Token::Ident(name), name_span)) => steps.push(TraverseStep::Attr {
                    name,
                    span: span.merge(&name_span),
                }),
                other => {
                    let at = other.map(|(_, s)| s).unwrap_or(span);
                    return Err(syntax_error(
                        at,
                        "Dot must be followed by an attribute name.".to_string(),
                    ));
                }
            },
            Token::LBracket => {
                let key = match iter.next() {
                    Some((Token::String(s), _)) => Value::String(s),
                    Some((Token::Integer(n), _)) => Value::from(n),
                    other => {
                        let at = other.map(|(_, s)| s).unwrap_or(span);
                        return Err(syntax_error(
                            at,
                            "Index brackets must contain a string or number literal.".to_string(),
                        ));
                    }
                };
                match iter.next() {
                    Some((Token::RBracket, close)) => steps.push(TraverseStep::Index {
                        key,
                        span: span.merge(&close),
                    }),
                    other => {
                        let at = other.map(|(_, s)| s).unwrap_or(span);
                        return Err(syntax_error(at, "Missing closing bracket.".to_string()));
                    }
                }
            }
            _ => {
                return Err(syntax_error(
                    span,
                    "Only attribute access and index steps may follow a name.".to_string(),
                ));
            }
        }
    }

    Ok(Traversal::new(steps))
}
