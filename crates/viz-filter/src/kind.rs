//! Filter kinds and their place in the module registry

use std::fmt;

use async_trait::async_trait;
use viz_core::module::{ModuleKind, ModuleLoader};
use viz_core::{ModuleRegistry, Result, TypeSpec, VizError};

/// Namespace of the filter type ids
pub const FILTER_NAMESPACE: &str = "viz/data/filter";

/// Tag of every filter variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    True,
    False,
    And,
    Or,
    Not,
    IsEqual,
    IsGreater,
    IsGreaterOrEqual,
    IsLess,
    IsLessOrEqual,
    IsIn,
    IsLike,
}

impl FilterKind {
    pub const ALL: [FilterKind; 12] = [
        FilterKind::True,
        FilterKind::False,
        FilterKind::And,
        FilterKind::Or,
        FilterKind::Not,
        FilterKind::IsEqual,
        FilterKind::IsGreater,
        FilterKind::IsGreaterOrEqual,
        FilterKind::IsLess,
        FilterKind::IsLessOrEqual,
        FilterKind::IsIn,
        FilterKind::IsLike,
    ];

    /// Last segment of the type id
    pub fn type_name(self) -> &'static str {
        match self {
            FilterKind::True => "True",
            FilterKind::False => "False",
            FilterKind::And => "And",
            FilterKind::Or => "Or",
            FilterKind::Not => "Not",
            FilterKind::IsEqual => "IsEqual",
            FilterKind::IsGreater => "IsGreater",
            FilterKind::IsGreaterOrEqual => "IsGreaterOrEqual",
            FilterKind::IsLess => "IsLess",
            FilterKind::IsLessOrEqual => "IsLessOrEqual",
            FilterKind::IsIn => "IsIn",
            FilterKind::IsLike => "IsLike",
        }
    }

    /// Absolute module id, e.g. `viz/data/filter/IsIn`
    pub fn type_id(self) -> String {
        format!("{}/{}", FILTER_NAMESPACE, self.type_name())
    }

    /// Short name used by the alias spec form
    pub fn alias(self) -> &'static str {
        match self {
            FilterKind::True => "true",
            FilterKind::False => "false",
            FilterKind::And => "and",
            FilterKind::Or => "or",
            FilterKind::Not => "not",
            FilterKind::IsEqual => "isEqual",
            FilterKind::IsGreater => "isGreater",
            FilterKind::IsGreaterOrEqual => "isGreaterOrEqual",
            FilterKind::IsLess => "isLess",
            FilterKind::IsLessOrEqual => "isLessOrEqual",
            FilterKind::IsIn => "isIn",
            FilterKind::IsLike => "isLike",
        }
    }

    /// `$` operator of the operator spec form
    pub fn operator(self) -> Option<&'static str> {
        match self {
            FilterKind::True | FilterKind::False => None,
            FilterKind::And => Some("$and"),
            FilterKind::Or => Some("$or"),
            FilterKind::Not => Some("$not"),
            FilterKind::IsEqual => Some("$eq"),
            FilterKind::IsGreater => Some("$gt"),
            FilterKind::IsGreaterOrEqual => Some("$gte"),
            FilterKind::IsLess => Some("$lt"),
            FilterKind::IsLessOrEqual => Some("$lte"),
            FilterKind::IsIn => Some("$in"),
            FilterKind::IsLike => Some("$like"),
        }
    }

    /// Head symbol of the content key
    pub fn key_symbol(self) -> &'static str {
        match self {
            FilterKind::True => "true",
            FilterKind::False => "false",
            FilterKind::And => "and",
            FilterKind::Or => "or",
            FilterKind::Not => "not",
            FilterKind::IsEqual => "=",
            FilterKind::IsGreater => ">",
            FilterKind::IsGreaterOrEqual => ">=",
            FilterKind::IsLess => "<",
            FilterKind::IsLessOrEqual => "<=",
            FilterKind::IsIn => "in",
            FilterKind::IsLike => "like",
        }
    }

    /// Accepts a type id, a type name or an alias
    pub fn from_name(name: &str) -> Option<FilterKind> {
        let name = name
            .strip_prefix(FILTER_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name() == name || kind.alias() == name)
    }

    /// Exact type id match only
    pub fn from_type_id(id: &str) -> Option<FilterKind> {
        Self::ALL.into_iter().find(|kind| kind.type_id() == id)
    }

    pub fn from_operator(operator: &str) -> Option<FilterKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.operator() == Some(operator))
    }

    /// The kind whose result is the complement of this kind's result.
    ///
    /// Range comparisons invert to the strict or inclusive opposite
    /// (`¬(x ≥ v) ≡ x < v`). Equality, membership and affix matching have no
    /// direct inverse.
    pub fn inverse(self) -> Option<FilterKind> {
        match self {
            FilterKind::True => Some(FilterKind::False),
            FilterKind::False => Some(FilterKind::True),
            FilterKind::And => Some(FilterKind::Or),
            FilterKind::Or => Some(FilterKind::And),
            FilterKind::IsGreater => Some(FilterKind::IsLessOrEqual),
            FilterKind::IsGreaterOrEqual => Some(FilterKind::IsLess),
            FilterKind::IsLess => Some(FilterKind::IsGreaterOrEqual),
            FilterKind::IsLessOrEqual => Some(FilterKind::IsGreater),
            FilterKind::Not | FilterKind::IsEqual | FilterKind::IsIn | FilterKind::IsLike => None,
        }
    }

    /// Like [`FilterKind::inverse`], failing for kinds without one
    pub fn invert(self) -> Result<FilterKind> {
        self.inverse().ok_or_else(|| {
            VizError::OperationInvalid(format!("{} has no direct inverse", self.type_name()))
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FilterKind::True | FilterKind::False)
    }

    pub fn is_composite(self) -> bool {
        matches!(self, FilterKind::And | FilterKind::Or | FilterKind::Not)
    }

    pub fn is_property(self) -> bool {
        !self.is_terminal() && !self.is_composite()
    }

    /// Kinds holding a single reference value
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            FilterKind::IsEqual
                | FilterKind::IsGreater
                | FilterKind::IsGreaterOrEqual
                | FilterKind::IsLess
                | FilterKind::IsLessOrEqual
        )
    }

    /// Abstract base type this kind derives from
    fn base_name(self) -> &'static str {
        match self {
            FilterKind::And | FilterKind::Or => "Tree",
            FilterKind::True | FilterKind::False | FilterKind::Not => "Abstract",
            _ => "Property",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Declare the filter type hierarchy and its aliases in `registry`.
///
/// `Abstract` is the root; `Tree` (and/or) and `Property` are abstract
/// intermediate types.
pub fn declare_filter_types(registry: &mut ModuleRegistry) -> Result<()> {
    let base = |name: &str| format!("{}/{}", FILTER_NAMESPACE, name);

    registry.declare_type(&base("Abstract"), &TypeSpec::default().abstract_type())?;
    registry.declare_type(&base("Tree"), &TypeSpec::derived(base("Abstract")).abstract_type())?;
    registry.declare_type(&base("Property"), &TypeSpec::derived(base("Abstract")).abstract_type())?;

    for kind in FilterKind::ALL {
        registry.declare_type(&kind.type_id(), &TypeSpec::derived(base(kind.base_name())))?;
        registry.register_alias(kind.alias(), &kind.type_id())?;
    }
    Ok(())
}

/// Loader for the built-in filter types, which need no external code
pub struct BuiltinFilterLoader;

#[async_trait]
impl ModuleLoader for BuiltinFilterLoader {
    async fn load(&self, id: &str, kind: ModuleKind) -> Result<()> {
        match (kind, FilterKind::from_type_id(id)) {
            (ModuleKind::Type, Some(_)) => Ok(()),
            _ => Err(VizError::NotFound(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viz_core::module::{load_module, shared};

    #[test]
    fn test_names_round_trip() {
        for kind in FilterKind::ALL {
            assert_eq!(FilterKind::from_name(&kind.type_id()), Some(kind));
            assert_eq!(FilterKind::from_name(kind.alias()), Some(kind));
            assert_eq!(FilterKind::from_name(kind.type_name()), Some(kind));
            if let Some(op) = kind.operator() {
                assert_eq!(FilterKind::from_operator(op), Some(kind));
            }
        }
        assert_eq!(FilterKind::from_name("isNear"), None);
    }

    #[test]
    fn test_inverse_is_involution() {
        for kind in FilterKind::ALL {
            if let Some(inverse) = kind.inverse() {
                assert_eq!(inverse.inverse(), Some(kind));
            }
        }
        assert_eq!(FilterKind::IsLessOrEqual.invert().unwrap(), FilterKind::IsGreater);
        assert!(matches!(FilterKind::IsIn.invert(), Err(VizError::OperationInvalid(_))));
    }

    #[test]
    fn test_declare_filter_types() {
        let mut registry = ModuleRegistry::new();
        declare_filter_types(&mut registry).unwrap();

        assert_eq!(registry.resolve_id("isIn", None).unwrap(), "viz/data/filter/IsIn");
        assert!(registry
            .is_subtype_of("viz/data/filter/IsLike", "viz/data/filter/Property")
            .unwrap());
        let tree: Vec<&str> = registry
            .subtypes_of("viz/data/filter/Tree", false)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tree, vec!["viz/data/filter/And", "viz/data/filter/Or"]);
    }

    #[tokio::test]
    async fn test_builtin_loader() {
        let mut registry = ModuleRegistry::new();
        declare_filter_types(&mut registry).unwrap();
        let registry = shared(registry);

        load_module(&registry, "isLike", &BuiltinFilterLoader).await.unwrap();
        assert!(registry.read().get("viz/data/filter/IsLike").unwrap().is_loaded());
    }
}
