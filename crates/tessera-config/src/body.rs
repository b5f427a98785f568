//! Configuration body collaborator.
//!
//! A body is decoded against a declarative [`BodySchema`]: matching content
//! is returned, together with a residual body holding everything the schema
//! did not name. Decoders peel off the parts they understand and pass the
//! residual on, so nothing here depends on the document grammar.
//!
//! # Provided implementations
//!
//! - [`MemoryBody`] - attributes and blocks held in memory
//! - [`MergedBody`] - several bodies viewed as one, earlier bodies first

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::expr::Expr;
use crate::foundation::Span;

/// A single `name = expr` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expr,
    /// Range of the argument name
    pub name_range: Span,
    /// Range of the whole argument
    pub range: Span,
}

impl Attribute {
    /// Attribute whose ranges are all taken from its expression.
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        let range = expr.span.clone();
        Self {
            name: name.into(),
            expr,
            name_range: range.clone(),
            range,
        }
    }
}

/// A nested block such as `_ { ... }` or `lifecycle { ... }`.
#[derive(Debug, Clone)]
pub struct Block {
    pub type_name: String,
    pub labels: Vec<String>,
    pub body: Arc<dyn Body>,
    /// Range of the block header
    pub def_range: Span,
    /// Range of the block type keyword
    pub type_range: Span,
    /// Range of each label, parallel to `labels`
    pub label_ranges: Vec<Span>,
}

impl Block {
    pub fn new(type_name: impl Into<String>, body: Arc<dyn Body>, def_range: Span) -> Self {
        Self {
            type_name: type_name.into(),
            labels: Vec::new(),
            body,
            type_range: def_range.clone(),
            label_ranges: Vec::new(),
            def_range,
        }
    }

    /// Set the labels. Each label's range defaults to the header range.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.label_ranges = vec![self.def_range.clone(); labels.len()];
        self.labels = labels;
        self
    }

    pub fn with_label_ranges(mut self, ranges: Vec<Span>) -> Self {
        self.label_ranges = ranges;
        self
    }
}

/// Expected attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSchema {
    pub name: &'static str,
    pub required: bool,
}

/// Expected block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeaderSchema {
    pub type_name: &'static str,
}

/// Declarative description of the content a decoder understands.
#[derive(Debug, Clone, Copy)]
pub struct BodySchema {
    pub attributes: &'static [AttributeSchema],
    pub blocks: &'static [BlockHeaderSchema],
}

impl BodySchema {
    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    fn has_block(&self, type_name: &str) -> bool {
        self.blocks.iter().any(|b| b.type_name == type_name)
    }
}

/// Content matched by a schema.
#[derive(Debug, Clone, Default)]
pub struct BodyContent {
    pub attributes: IndexMap<String, Attribute>,
    /// Matched blocks in source order
    pub blocks: Vec<Block>,
    /// Where to point diagnostics about absent content
    pub missing_item_range: Span,
}

/// Residual, schema-driven access to configuration content.
pub trait Body: fmt::Debug + Send + Sync {
    /// Extract the content named by `schema`.
    ///
    /// Returns the matched content, a body holding everything else, and any
    /// diagnostics (e.g. missing required arguments).
    fn partial_content(&self, schema: &BodySchema) -> (BodyContent, Arc<dyn Body>, Diagnostics);

    /// Every attribute of the body, ignoring nested blocks.
    fn just_attributes(&self) -> IndexMap<String, Attribute>;

    /// Range to report when expected content is absent.
    fn missing_item_range(&self) -> Span;
}

/// Body held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBody {
    attributes: IndexMap<String, Attribute>,
    blocks: Vec<Block>,
    range: Span,
}

impl MemoryBody {
    pub fn new(range: Span) -> Self {
        Self {
            attributes: IndexMap::new(),
            blocks: Vec::new(),
            range,
        }
    }

    /// Empty body with a synthetic range.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, expr: Expr) -> Self {
        let attr = Attribute::new(name, expr);
        self.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn with_attr(mut self, attr: Attribute) -> Self {
        self.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn into_arc(self) -> Arc<dyn Body> {
        Arc::new(self)
    }
}

fn missing_argument(name: &str, range: &Span) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::MissingArgument,
        "Missing required argument",
        format!("The argument {name:?} is required, but no definition was found."),
    )
    .with_subject(range.clone())
}

impl Body for MemoryBody {
    fn partial_content(&self, schema: &BodySchema) -> (BodyContent, Arc<dyn Body>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut content = BodyContent {
            missing_item_range: self.range.clone(),
            ..BodyContent::default()
        };
        let mut remain = MemoryBody::new(self.range.clone());

        for (name, attr) in &self.attributes {
            if schema.has_attribute(name) {
                content.attributes.insert(name.clone(), attr.clone());
            } else {
                remain.attributes.insert(name.clone(), attr.clone());
            }
        }
        for attr_schema in schema.attributes {
            if attr_schema.required && !content.attributes.contains_key(attr_schema.name) {
                diags.push(missing_argument(attr_schema.name, &self.range));
            }
        }

        for block in &self.blocks {
            if schema.has_block(&block.type_name) {
                content.blocks.push(block.clone());
            } else {
                remain.blocks.push(block.clone());
            }
        }

        (content, Arc::new(remain), diags)
    }

    fn just_attributes(&self) -> IndexMap<String, Attribute> {
        self.attributes.clone()
    }

    fn missing_item_range(&self) -> Span {
        self.range.clone()
    }
}

/// Several bodies viewed as one.
///
/// Attribute lookup checks each body in order, so the first body that
/// defines a name wins. Blocks from all bodies are returned in body order.
#[derive(Debug, Clone)]
pub struct MergedBody {
    bodies: Vec<Arc<dyn Body>>,
}

impl MergedBody {
    pub fn new(bodies: Vec<Arc<dyn Body>>) -> Self {
        Self { bodies }
    }
}

/// Merge bodies into one, earlier bodies taking precedence.
pub fn merge_bodies(bodies: Vec<Arc<dyn Body>>) -> Arc<dyn Body> {
    Arc::new(MergedBody::new(bodies))
}

impl Body for MergedBody {
    fn partial_content(&self, schema: &BodySchema) -> (BodyContent, Arc<dyn Body>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let mut content = BodyContent {
            missing_item_range: self.missing_item_range(),
            ..BodyContent::default()
        };
        let mut remains = Vec::with_capacity(self.bodies.len());

        for body in &self.bodies {
            let (part, remain, part_diags) = body.partial_content(schema);
            // Required arguments are checked against the merged result below.
            diags.extend(
                part_diags
                    .into_iter()
                    .filter(|d| d.kind != DiagnosticKind::MissingArgument),
            );
            for (name, attr) in part.attributes {
                content.attributes.entry(name).or_insert(attr);
            }
            content.blocks.extend(part.blocks);
            remains.push(remain);
        }

        for attr_schema in schema.attributes {
            if attr_schema.required && !content.attributes.contains_key(attr_schema.name) {
                diags.push(missing_argument(attr_schema.name, &content.missing_item_range));
            }
        }

        (content, merge_bodies(remains), diags)
    }

    fn just_attributes(&self) -> IndexMap<String, Attribute> {
        let mut merged = IndexMap::new();
        for body in &self.bodies {
            for (name, attr) in body.just_attributes() {
                merged.entry(name).or_insert(attr);
            }
        }
        merged
    }

    fn missing_item_range(&self) -> Span {
        self.bodies
            .first()
            .map(|b| b.missing_item_range())
            .unwrap_or_default()
    }
}
