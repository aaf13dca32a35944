//! Analyzer registry: domain code -> analyzer bindings.
//!
//! Bindings are registered once at startup from an explicit list
//! ([`domains::register_builtin`]) and the registry is shared read-only
//! afterwards. A domain that is not registered falls through to the
//! generic reasoner in the orchestrator.

pub mod domains;

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{AnalyzerError, RegistryError};

/// Structured analyzer input and output.
pub type Payload = Map<String, Value>;

/// A domain-specific analyzer.
///
/// `analyze` is synchronous, returns a mapping for well-formed input and
/// fails only with input validation errors.
pub trait Analyzer: Send + Sync {
    fn code(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError>;
}

type HandlerFn = dyn Fn(&Payload) -> Result<Payload, AnalyzerError> + Send + Sync;

/// Analyzer built from a plain function or closure.
pub struct FnAnalyzer {
    code: String,
    name: String,
    description: String,
    handler: Box<HandlerFn>,
}

impl FnAnalyzer {
    pub fn new<F>(code: &str, name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> Result<Payload, AnalyzerError> + Send + Sync + 'static,
    {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            handler: Box::new(handler),
        }
    }
}

impl Analyzer for FnAnalyzer {
    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn analyze(&self, payload: &Payload) -> Result<Payload, AnalyzerError> {
        (self.handler)(payload)
    }
}

/// Public description of a domain, as listed by `GET /domains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainDescriptor {
    pub code: String,
    pub name: String,
    pub description: String,
}

impl DomainDescriptor {
    fn of(analyzer: &dyn Analyzer) -> Self {
        Self {
            code: analyzer.code().to_string(),
            name: analyzer.name().to_string(),
            description: analyzer.description().to_string(),
        }
    }
}

/// Display-only descriptors listed when nothing is registered.
const FALLBACK_DOMAINS: &[(&str, &str, &str)] = &[
    ("general", "General assistant", "Free-form questions answered by the generic reasoner"),
    ("medical", "Medical", "Medical questions and documents"),
    ("engineering", "Engineering", "Engineering questions and documents"),
    ("contracts", "Contracting", "Construction contracts and bids"),
    ("cars", "Automotive", "Vehicles and diagnostics"),
];

/// Registry of domain analyzers
pub struct AnalyzerRegistry {
    /// Registration order
    bindings: Vec<Arc<dyn Analyzer>>,
    /// code -> position in `bindings`
    index: HashMap<String, usize>,
    fallback_descriptors: bool,
}

impl AnalyzerRegistry {
    /// Empty registry that lists fallback descriptors while empty
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            index: HashMap::new(),
            fallback_descriptors: true,
        }
    }

    /// Registry holding every built-in analyzer
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        domains::register_builtin(&mut registry);
        registry
    }

    /// Whether `list()` shows fallback descriptors when empty
    pub fn with_fallback_descriptors(mut self, enabled: bool) -> Self {
        self.fallback_descriptors = enabled;
        self
    }

    /// Bind an analyzer to its domain code.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), RegistryError> {
        let code = analyzer.code().trim().to_string();
        if code.is_empty() {
            return Err(RegistryError::MissingCode);
        }
        if self.index.contains_key(&code) {
            return Err(RegistryError::Duplicate(code));
        }

        self.index.insert(code, self.bindings.len());
        self.bindings.push(analyzer);
        Ok(())
    }

    /// Register each candidate, skipping the ones that cannot be bound.
    ///
    /// Returns the number of analyzers actually registered.
    pub fn register_all<I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Analyzer>>,
    {
        let mut registered = 0;
        for analyzer in candidates {
            match self.register(analyzer) {
                Ok(()) => registered += 1,
                Err(e) => tracing::warn!("skipping analyzer: {}", e),
            }
        }
        registered
    }

    /// Analyzer bound to `code`, if any
    pub fn resolve(&self, code: &str) -> Option<Arc<dyn Analyzer>> {
        self.index.get(code).map(|&i| Arc::clone(&self.bindings[i]))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Registered domains in registration order.
    ///
    /// When nothing is registered and fallback descriptors are enabled, a
    /// fixed display-only set is returned instead. Those codes do not
    /// resolve.
    pub fn list(&self) -> Vec<DomainDescriptor> {
        if self.bindings.is_empty() && self.fallback_descriptors {
            return FALLBACK_DOMAINS
                .iter()
                .map(|(code, name, description)| DomainDescriptor {
                    code: code.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect();
        }

        self.bindings
            .iter()
            .map(|a| DomainDescriptor::of(a.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("domains", &self.index.keys().collect::<Vec<_>>())
            .field("fallback_descriptors", &self.fallback_descriptors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(code: &str) -> Arc<dyn Analyzer> {
        Arc::new(FnAnalyzer::new(code, code, "echo", |p| Ok(p.clone())))
    }

    #[test]
    fn test_resolve_returns_registered_handler() {
        let mut registry = AnalyzerRegistry::new();
        let a = echo("a");
        let b = echo("b");
        registry.register(Arc::clone(&a)).unwrap();
        registry.register(Arc::clone(&b)).unwrap();

        assert!(Arc::ptr_eq(&registry.resolve("a").unwrap(), &a));
        assert!(Arc::ptr_eq(&registry.resolve("b").unwrap(), &b));
        assert!(registry.resolve("c").is_none());
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(echo("a")).unwrap();

        assert_eq!(
            registry.register(echo("a")),
            Err(RegistryError::Duplicate("a".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_code_ineligible() {
        let mut registry = AnalyzerRegistry::new();
        assert_eq!(registry.register(echo("  ")), Err(RegistryError::MissingCode));
    }

    #[test]
    fn test_register_all_skips_bad_candidates() {
        let mut registry = AnalyzerRegistry::new();
        let count = registry.register_all(vec![echo("x"), echo(""), echo("x"), echo("y")]);

        assert_eq!(count, 2);
        let codes: Vec<_> = registry.list().into_iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["x", "y"]);
    }

    #[test]
    fn test_list_each_code_once_in_registration_order() {
        let registry = AnalyzerRegistry::builtin();
        let listed = registry.list();

        assert_eq!(listed.len(), registry.len());
        for descriptor in &listed {
            assert_eq!(listed.iter().filter(|d| d.code == descriptor.code).count(), 1);
            assert!(registry.resolve(&descriptor.code).is_some());
        }
    }

    #[test]
    fn test_fallback_descriptors_when_empty() {
        let registry = AnalyzerRegistry::new();
        let listed = registry.list();

        assert_eq!(listed.len(), FALLBACK_DOMAINS.len());
        assert_eq!(listed[0].code, "general");
        // display only
        assert!(registry.resolve("general").is_none());

        let strict = AnalyzerRegistry::new().with_fallback_descriptors(false);
        assert!(strict.list().is_empty());
    }

    #[test]
    fn test_fn_analyzer_calls_handler() {
        let analyzer = FnAnalyzer::new("double", "Double", "", |p| {
            let n = p.get("n").and_then(|v| v.as_i64()).ok_or_else(|| AnalyzerError::MissingField("n".into()))?;
            let mut out = Payload::new();
            out.insert("n".into(), json!(n * 2));
            Ok(out)
        });

        let mut input = Payload::new();
        input.insert("n".into(), json!(21));
        assert_eq!(analyzer.analyze(&input).unwrap()["n"], 42);
        assert!(analyzer.analyze(&Payload::new()).is_err());
    }
}
