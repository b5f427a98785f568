//! Address model for providers, modules and resources.
//!
//! Every address has a canonical textual form that doubles as the vertex
//! name in graph renderings:
//!
//! - `aws`, `aws.east` - [`ProviderAddress`] (compact, module-relative)
//! - `module.net.module.vpc` - [`ModulePath`]
//! - `module.net.aws_instance.web`, `data.aws_ami.base` - [`ResourceAddress`]
//! - `module.net.provider["aws"].east` - [`AbsProviderAddress`]
//!
//! # Examples
//!
//! ```
//! # use tessera_config::addrs::*;
//! let (addr, diags) = parse_provider_config_compact_str("aws.east");
//! assert!(!diags.has_errors());
//! assert_eq!(addr, ProviderAddress::aliased("aws", "east"));
//!
//! let abs = AbsProviderAddress::new(ModulePath::root().child("net"), addr);
//! assert_eq!(abs.to_string(), r#"module.net.provider["aws"].east"#);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::foundation::{Span, is_provider_part_normalized, parse_provider_part};
use crate::traversal::{TraverseStep, Traversal, parse_traversal_abs};

/// Module-relative provider configuration address in compact form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderAddress {
    /// Provider local name (normalized)
    pub local_name: String,
    /// Alias, empty for the default configuration
    #[serde(default)]
    pub alias: String,
}

impl ProviderAddress {
    /// The default (unaliased) configuration of a provider.
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            alias: String::new(),
        }
    }

    pub fn aliased(local_name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            alias: alias.into(),
        }
    }

    pub fn is_aliased(&self) -> bool {
        !self.alias.is_empty()
    }

    /// The same provider without its alias.
    pub fn unaliased(&self) -> Self {
        Self::new(self.local_name.clone())
    }
}

impl fmt::Display for ProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alias.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{}.{}", self.local_name, self.alias)
        }
    }
}

/// Path of a module instance from the root, as a list of call names.
///
/// The root module has an empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModulePath {
    segments: Vec<String>,
}

impl ModulePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Nesting depth (0 for the root).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Path of a child module call.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Path of the calling module, None for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(Self::new(self.segments[..self.segments.len() - 1].to_vec()))
        }
    }

    /// Name of the call that created this module, None for the root.
    pub fn call_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Prefix used when rendering addresses inside this module.
    fn prefix(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("module.{s}."))
            .collect()
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.prefix();
        write!(f, "{}", prefix.strip_suffix('.').unwrap_or(&prefix))
    }
}

/// Managed resource or data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    Managed,
    Data,
}

/// Absolute address of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceAddress {
    pub module: ModulePath,
    pub mode: ResourceMode,
    pub type_name: String,
    pub name: String,
}

impl ResourceAddress {
    pub fn new(
        module: ModulePath,
        mode: ResourceMode,
        type_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            module,
            mode,
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    /// The provider local name implied by the resource type.
    ///
    /// This is the type name up to the first underscore, or the whole type
    /// name when it has none.
    pub fn implied_provider(&self) -> &str {
        implied_provider(&self.type_name)
    }
}

/// Provider local name implied by a resource type name.
pub fn implied_provider(type_name: &str) -> &str {
    type_name.split_once('_').map_or(type_name, |(prefix, _)| prefix)
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module.prefix())?;
        if self.mode == ResourceMode::Data {
            write!(f, "data.")?;
        }
        write!(f, "{}.{}", self.type_name, self.name)
    }
}

/// Provider configuration address qualified by its module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbsProviderAddress {
    pub module: ModulePath,
    pub addr: ProviderAddress,
}

impl AbsProviderAddress {
    pub fn new(module: ModulePath, addr: ProviderAddress) -> Self {
        Self { module, addr }
    }
}

impl fmt::Display for AbsProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}provider[{:?}]",
            self.module.prefix(),
            self.addr.local_name
        )?;
        if self.addr.is_aliased() {
            write!(f, ".{}", self.addr.alias)?;
        }
        Ok(())
    }
}

/// Parse a traversal as a compact provider configuration address.
///
/// Accepted shapes are `type` and `type.alias`. If the returned diagnostics
/// contain errors the address is invalid and must not be used.
pub fn parse_provider_config_compact(traversal: &Traversal) -> (ProviderAddress, Diagnostics) {
    const MAX_STEPS: usize = 2;

    let mut diags = Diagnostics::new();
    let mut addr = ProviderAddress::new(traversal.root_name());

    if traversal.len() < MAX_STEPS {
        return (addr, diags);
    }

    let alias_step = &traversal.steps()[1];
    match alias_step {
        TraverseStep::Attr { name, .. } => addr.alias = name.clone(),
        _ => diags.push(
            Diagnostic::error(
                DiagnosticKind::InvalidAddress,
                "Invalid provider configuration address",
                "The provider type name must either stand alone or be followed by an alias name separated with a dot.",
            )
            .with_subject(alias_step.span().clone()),
        ),
    }

    if traversal.len() > MAX_STEPS {
        diags.push(
            Diagnostic::error(
                DiagnosticKind::InvalidAddress,
                "Invalid provider configuration address",
                "Extraneous trailing segments after provider configuration address.",
            )
            .with_subject(traversal.span_from(MAX_STEPS)),
        );
    }

    (addr, diags)
}

/// Parse raw text as a compact provider address.
///
/// The text is re-lexed first, so resulting spans do not point into any real
/// file. Callers with a traversal from the body collaborator should use
/// [`parse_provider_config_compact`] instead.
pub fn parse_provider_config_compact_str(s: &str) -> (ProviderAddress, Diagnostics) {
    match parse_traversal_abs(s, "") {
        Ok(traversal) => parse_provider_config_compact(&traversal),
        Err(diags) => (ProviderAddress::default(), diags),
    }
}

/// Verify that a provider local name is already normalized.
pub fn check_provider_name_normalized(name: &str, decl_range: &Span) -> Diagnostics {
    let mut diags = Diagnostics::new();
    match is_provider_part_normalized(name) {
        Err(reason) => diags.push(
            Diagnostic::error(
                DiagnosticKind::InvalidLocalName,
                "Invalid provider local name",
                format!("{name} is an invalid provider local name: {reason}"),
            )
            .with_subject(decl_range.clone()),
        ),
        Ok(false) => {
            let normalized = parse_provider_part(name).unwrap_or_else(|_| name.to_lowercase());
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::InvalidLocalName,
                    "Invalid provider local name",
                    format!("Provider names must be normalized. Replace {name:?} with {normalized:?} to fix this error."),
                )
                .with_subject(decl_range.clone()),
            );
        }
        Ok(true) => {}
    }
    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Pos;
    use crate::value::Value;

    fn span(col: u32) -> Span {
        Span::new("main.tf", Pos::new(1, col, col - 1), Pos::new(1, col + 3, col + 2))
    }

    fn traversal(names: &[&str]) -> Traversal {
        let steps = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let s = span(1 + 4 * i as u32);
                if i == 0 {
                    TraverseStep::Root { name: n.to_string(), span: s }
                } else {
                    TraverseStep::Attr { name: n.to_string(), span: s }
                }
            })
            .collect();
        Traversal::new(steps)
    }

    #[test]
    fn test_compact_type_only() {
        let (addr, diags) = parse_provider_config_compact(&traversal(&["aws"]));
        assert!(diags.is_empty());
        assert_eq!(addr, ProviderAddress::new("aws"));
    }

    #[test]
    fn test_compact_with_alias() {
        let (addr, diags) = parse_provider_config_compact(&traversal(&["aws", "foo"]));
        assert!(diags.is_empty());
        assert_eq!(addr, ProviderAddress::aliased("aws", "foo"));
    }

    #[test]
    fn test_compact_extraneous_segments() {
        let (_, diags) = parse_provider_config_compact(&traversal(&["aws", "foo", "bar"]));
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert!(diag.detail.contains("Extraneous"));
        assert_eq!(diag.subject.as_ref().map(|s| s.start.column), Some(9));
    }

    #[test]
    fn test_compact_index_step_and_trailing_reported_together() {
        let t = Traversal::new(vec![
            TraverseStep::Root { name: "aws".into(), span: span(1) },
            TraverseStep::Index { key: Value::from("foo"), span: span(4) },
            TraverseStep::Attr { name: "bar".into(), span: span(11) },
        ]);
        let (_, diags) = parse_provider_config_compact(&t);
        assert_eq!(diags.count_kind(DiagnosticKind::InvalidAddress), 2);
        assert!(diags.iter().any(|d| d.detail.contains("stand alone")));
        assert!(diags.iter().any(|d| d.detail.contains("Extraneous")));
    }

    #[test]
    fn test_compact_str() {
        let (addr, diags) = parse_provider_config_compact_str("google.west");
        assert!(diags.is_empty());
        assert_eq!(addr.to_string(), "google.west");

        let (_, diags) = parse_provider_config_compact_str("google..west");
        assert!(diags.contains_kind(DiagnosticKind::InvalidAddress));
    }

    #[test]
    fn test_name_normalized() {
        assert!(check_provider_name_normalized("aws", &Span::synthetic()).is_empty());

        let diags = check_provider_name_normalized("AWS", &Span::synthetic());
        assert!(diags.contains_kind(DiagnosticKind::InvalidLocalName));
        assert!(diags.iter().next().unwrap().detail.contains(r#"Replace "AWS" with "aws""#));

        let diags = check_provider_name_normalized("aws_x", &Span::synthetic());
        assert!(diags.iter().next().unwrap().detail.contains("invalid provider local name"));
    }

    #[test]
    fn test_address_rendering() {
        let sub = ModulePath::root().child("sub").child("subsub");
        assert_eq!(sub.to_string(), "module.sub.module.subsub");
        assert_eq!(ModulePath::root().to_string(), "");
        assert_eq!(sub.parent().unwrap().to_string(), "module.sub");

        let res = ResourceAddress::new(sub.clone(), ResourceMode::Data, "foo_thing", "one");
        assert_eq!(res.to_string(), "module.sub.module.subsub.data.foo_thing.one");
        assert_eq!(res.implied_provider(), "foo");

        let abs = AbsProviderAddress::new(ModulePath::root(), ProviderAddress::new("aws"));
        assert_eq!(abs.to_string(), r#"provider["aws"]"#);
    }

    #[test]
    fn test_implied_provider_without_underscore() {
        assert_eq!(implied_provider("terraform"), "terraform");
        assert_eq!(implied_provider("aws_instance"), "aws");
    }
}
