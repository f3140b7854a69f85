//! JSON filter specifications
//!
//! Two forms are read:
//!
//! * the operator form: `{"$and": [..]}`, `{"$or": [..]}`, `{"$not": f}`,
//!   `true`, `false` and property objects such as
//!   `{"sales": {"$gte": 1000}}`, `{"country": {"$in": ["PT", "IE"]}}` or the
//!   shorthand `{"country": "PT"}`;
//! * the alias form: `{"_": "isIn", "p": "country", "v": ["PT", "IE"]}`,
//!   with `"o"` holding the operands of composites.
//!
//! [`Filter::to_spec`] writes the operator form and
//! [`Filter::to_alias_spec`] the alias form.

use serde_json::{json, Map, Value as Json};
use viz_core::{ModuleRegistry, Result, VizError};
use viz_data::Value;

use crate::filter::{Filter, LikeOptions};
use crate::kind::FilterKind;

const TYPE_KEY: &str = "_";
const PROPERTY_KEY: &str = "p";
const VALUE_KEY: &str = "v";
const OPERANDS_KEY: &str = "o";

const LIKE_VALUE: &str = "value";
const ANCHOR_START: &str = "anchorStart";
const ANCHOR_END: &str = "anchorEnd";
const CASE_INSENSITIVE: &str = "caseInsensitive";

fn invalid(reason: impl Into<String>) -> VizError {
    VizError::invalid("spec", reason)
}

/// Resolves the `_` entry of an alias spec to a filter kind
trait KindResolver {
    fn resolve_kind(&self, name: &str) -> Result<FilterKind>;
}

struct BuiltinKinds;

impl KindResolver for BuiltinKinds {
    fn resolve_kind(&self, name: &str) -> Result<FilterKind> {
        FilterKind::from_name(name).ok_or_else(|| invalid(format!("unknown filter type '{}'", name)))
    }
}

/// Walks the ancestry of a registered type up to the first built-in kind
impl KindResolver for ModuleRegistry {
    fn resolve_kind(&self, name: &str) -> Result<FilterKind> {
        let id = self.resolve_id(name, None)?;
        if let Some(kind) = FilterKind::from_type_id(&id) {
            return Ok(kind);
        }
        self.ancestors_of(&id)?
            .into_iter()
            .find_map(FilterKind::from_type_id)
            .ok_or_else(|| invalid(format!("'{}' is not a filter type", id)))
    }
}

impl Filter {
    /// Build a filter from either spec form
    pub fn from_spec(spec: &Json) -> Result<Filter> {
        parse(spec, &BuiltinKinds)
    }

    /// Like [`Filter::from_spec`], resolving alias-form type names through
    /// `registry` so that aliases and subtypes declared there are accepted
    pub fn from_spec_in(spec: &Json, registry: &ModuleRegistry) -> Result<Filter> {
        parse(spec, registry)
    }

    /// Parse a spec from JSON text
    pub fn from_spec_str(text: &str) -> Result<Filter> {
        let spec: Json = serde_json::from_str(text)?;
        Self::from_spec(&spec)
    }

    /// Operator-form spec of this filter
    pub fn to_spec(&self) -> Json {
        match self {
            Filter::True => Json::Bool(true),
            Filter::False => Json::Bool(false),
            Filter::And(operands) => json!({ "$and": operands.iter().map(Filter::to_spec).collect::<Vec<_>>() }),
            Filter::Or(operands) => json!({ "$or": operands.iter().map(Filter::to_spec).collect::<Vec<_>>() }),
            Filter::Not(inner) => json!({ "$not": inner.to_spec() }),
            _ => {
                let Some(property) = self.property() else {
                    return self.to_alias_spec();
                };
                // Such names would read back as operators or alias specs
                if property.starts_with('$') || property == TYPE_KEY {
                    return self.to_alias_spec();
                }
                let Some(operator) = self.kind().operator() else {
                    return self.to_alias_spec();
                };
                let mut condition = Map::new();
                condition.insert(operator.to_string(), self.spec_argument());
                let mut object = Map::new();
                object.insert(property.to_string(), Json::Object(condition));
                Json::Object(object)
            }
        }
    }

    /// Alias-form spec of this filter
    pub fn to_alias_spec(&self) -> Json {
        let mut object = Map::new();
        object.insert(TYPE_KEY.to_string(), Json::from(self.kind().alias()));
        match self {
            Filter::True | Filter::False => {}
            Filter::And(_) | Filter::Or(_) | Filter::Not(_) => {
                let operands = self.operands().iter().map(Filter::to_alias_spec).collect();
                object.insert(OPERANDS_KEY.to_string(), Json::Array(operands));
            }
            Filter::IsLike(like) => {
                object.insert(PROPERTY_KEY.to_string(), Json::from(like.property()));
                object.insert(VALUE_KEY.to_string(), like.text().map(Json::from).unwrap_or(Json::Null));
                insert_like_flags(&mut object, like.options());
            }
            _ => {
                if let Some(property) = self.property() {
                    object.insert(PROPERTY_KEY.to_string(), Json::from(property));
                }
                object.insert(VALUE_KEY.to_string(), self.spec_argument());
            }
        }
        Json::Object(object)
    }

    /// The operand of a property operator: the value, the value list, or the
    /// like text with its flags
    fn spec_argument(&self) -> Json {
        match self {
            Filter::IsIn(is_in) => Json::Array(is_in.values().iter().map(Value::to_json).collect()),
            Filter::IsLike(like) => {
                let text = like.text().map(Json::from).unwrap_or(Json::Null);
                let options = like.options();
                if options == LikeOptions::default() {
                    return text;
                }
                let mut object = Map::new();
                object.insert(LIKE_VALUE.to_string(), text);
                insert_like_flags(&mut object, options);
                Json::Object(object)
            }
            _ => self.value().map(Value::to_json).unwrap_or(Json::Null),
        }
    }
}

fn insert_like_flags(object: &mut Map<String, Json>, options: LikeOptions) {
    for (key, set) in [
        (ANCHOR_START, options.anchor_start),
        (ANCHOR_END, options.anchor_end),
        (CASE_INSENSITIVE, options.case_insensitive),
    ] {
        if set {
            object.insert(key.to_string(), Json::Bool(true));
        }
    }
}

fn parse(spec: &Json, kinds: &dyn KindResolver) -> Result<Filter> {
    match spec {
        Json::Bool(true) => Ok(Filter::True),
        Json::Bool(false) => Ok(Filter::False),
        Json::Object(object) if object.contains_key(TYPE_KEY) => parse_alias(object, kinds),
        Json::Object(object) => {
            let mut terms = Vec::with_capacity(object.len());
            for (key, value) in object {
                if key.starts_with('$') {
                    terms.push(parse_composite(key, value, kinds)?);
                } else {
                    terms.push(parse_property(key, value)?);
                }
            }
            if terms.len() == 1 {
                Ok(terms.remove(0))
            } else {
                Ok(Filter::and_all(terms))
            }
        }
        other => Err(invalid(format!("expected an object or a boolean, found {}", other))),
    }
}

fn parse_operands(spec: &Json, kinds: &dyn KindResolver) -> Result<Vec<Filter>> {
    match spec {
        Json::Array(items) => items.iter().map(|item| parse(item, kinds)).collect(),
        other => Err(invalid(format!("expected an operand list, found {}", other))),
    }
}

fn parse_composite(operator: &str, spec: &Json, kinds: &dyn KindResolver) -> Result<Filter> {
    match FilterKind::from_operator(operator) {
        Some(FilterKind::And) => Ok(Filter::and_all(parse_operands(spec, kinds)?)),
        Some(FilterKind::Or) => Ok(Filter::or_all(parse_operands(spec, kinds)?)),
        Some(FilterKind::Not) => Ok(Filter::not(parse(spec, kinds)?)),
        _ => Err(invalid(format!("'{}' is not a composite operator", operator))),
    }
}

/// `{"prop": condition}`, where the condition is an operator object, a value
/// list (membership) or a scalar (equality)
fn parse_property(property: &str, condition: &Json) -> Result<Filter> {
    match condition {
        Json::Object(operators) => {
            let mut terms = Vec::with_capacity(operators.len());
            for (operator, argument) in operators {
                let kind = FilterKind::from_operator(operator)
                    .filter(|kind| kind.is_property())
                    .ok_or_else(|| invalid(format!("'{}' is not a property operator", operator)))?;
                terms.push(property_filter(kind, property, argument)?);
            }
            match terms.len() {
                0 => Err(invalid(format!("no operator given for '{}'", property))),
                1 => Ok(terms.remove(0)),
                _ => Ok(Filter::and_all(terms)),
            }
        }
        Json::Array(_) => property_filter(FilterKind::IsIn, property, condition),
        scalar => property_filter(FilterKind::IsEqual, property, scalar),
    }
}

fn property_filter(kind: FilterKind, property: &str, argument: &Json) -> Result<Filter> {
    match kind {
        FilterKind::IsIn => {
            let items = argument
                .as_array()
                .ok_or_else(|| invalid(format!("'{}' expects a value list", property)))?;
            let values = items.iter().map(scalar).collect::<Result<Vec<_>>>()?;
            Filter::is_in(property, values)
        }
        FilterKind::IsLike => {
            let (text, options) = match argument {
                Json::Object(object) => (
                    object.get(LIKE_VALUE).map(scalar).transpose()?.unwrap_or_default(),
                    like_options(object)?,
                ),
                other => (scalar(other)?, LikeOptions::default()),
            };
            Filter::is_like(property, text, options)
        }
        kind => Filter::comparison(kind, property, scalar(argument)?),
    }
}

fn like_options(object: &Map<String, Json>) -> Result<LikeOptions> {
    let flag = |key: &str| -> Result<bool> {
        match object.get(key) {
            None | Some(Json::Null) => Ok(false),
            Some(Json::Bool(b)) => Ok(*b),
            Some(other) => Err(invalid(format!("'{}' must be a boolean, found {}", key, other))),
        }
    };
    Ok(LikeOptions {
        anchor_start: flag(ANCHOR_START)?,
        anchor_end: flag(ANCHOR_END)?,
        case_insensitive: flag(CASE_INSENSITIVE)?,
    })
}

fn scalar(json: &Json) -> Result<Value> {
    Value::from_json(json).ok_or_else(|| invalid(format!("expected a scalar value, found {}", json)))
}

fn parse_alias(object: &Map<String, Json>, kinds: &dyn KindResolver) -> Result<Filter> {
    let name = object
        .get(TYPE_KEY)
        .and_then(Json::as_str)
        .ok_or_else(|| invalid("'_' must name a filter type"))?;
    let kind = kinds.resolve_kind(name)?;

    let operands = || -> Result<Vec<Filter>> {
        match object.get(OPERANDS_KEY) {
            None => Ok(Vec::new()),
            Some(Json::Array(items)) => items.iter().map(|item| parse(item, kinds)).collect(),
            Some(single) => Ok(vec![parse(single, kinds)?]),
        }
    };

    match kind {
        FilterKind::True => Ok(Filter::True),
        FilterKind::False => Ok(Filter::False),
        FilterKind::And => Ok(Filter::and_all(operands()?)),
        FilterKind::Or => Ok(Filter::or_all(operands()?)),
        FilterKind::Not => {
            let mut operands = operands()?;
            if operands.len() != 1 {
                return Err(invalid(format!("'not' takes one operand, found {}", operands.len())));
            }
            Ok(Filter::not(operands.remove(0)))
        }
        kind => {
            let property = object.get(PROPERTY_KEY).and_then(Json::as_str).unwrap_or_default();
            let argument = object.get(VALUE_KEY).cloned().unwrap_or(Json::Null);
            if kind == FilterKind::IsLike {
                let text = scalar(&argument)?;
                return Filter::is_like(property, text, like_options(object)?);
            }
            property_filter(kind, property, &argument)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::declare_filter_types;
    use viz_core::TypeSpec;

    #[test]
    fn test_operator_form() {
        let filter = Filter::from_spec(&json!({
            "$and": [
                {"sales": {"$gte": 1000}},
                {"$not": {"country": {"$in": ["PT", "IE"]}}}
            ]
        }))
        .unwrap();

        assert_eq!(
            filter,
            Filter::and_all([
                Filter::is_greater_or_equal("sales", 1000).unwrap(),
                Filter::not(Filter::is_in("country", ["PT", "IE"]).unwrap()),
            ])
        );
    }

    #[test]
    fn test_shorthands() {
        assert_eq!(
            Filter::from_spec(&json!({"country": "PT"})).unwrap(),
            Filter::is_equal("country", "PT").unwrap()
        );
        assert_eq!(
            Filter::from_spec(&json!({"country": ["PT"]})).unwrap(),
            Filter::is_in("country", ["PT"]).unwrap()
        );
        assert_eq!(
            Filter::from_spec(&json!({"a": 1, "b": {"$lt": 2}})).unwrap(),
            Filter::and_all([Filter::is_equal("a", 1).unwrap(), Filter::is_less("b", 2).unwrap()])
        );
        assert_eq!(Filter::from_spec(&json!({})).unwrap(), Filter::and_all([]));
        assert_eq!(Filter::from_spec(&json!(false)).unwrap(), Filter::False);
    }

    #[test]
    fn test_like_forms() {
        let plain = Filter::from_spec(&json!({"name": {"$like": "oo"}})).unwrap();
        assert_eq!(plain, Filter::is_like("name", "oo", LikeOptions::default()).unwrap());

        let anchored = Filter::from_spec(&json!({
            "name": {"$like": {"value": "Fo", "anchorStart": true}}
        }))
        .unwrap();
        assert_eq!(anchored, Filter::is_like("name", "Fo", LikeOptions::prefix()).unwrap());
        assert_eq!(anchored.to_spec(), json!({"name": {"$like": {"value": "Fo", "anchorStart": true}}}));
    }

    #[test]
    fn test_alias_form() {
        let filter = Filter::from_spec(&json!({
            "_": "or",
            "o": [
                {"_": "viz/data/filter/IsIn", "p": "country", "v": ["PT"]},
                {"_": "isLike", "p": "name", "v": "oo", "anchorEnd": true},
                {"_": "not", "o": {"_": "true"}}
            ]
        }))
        .unwrap();

        assert_eq!(
            filter,
            Filter::or_all([
                Filter::is_in("country", ["PT"]).unwrap(),
                Filter::is_like("name", "oo", LikeOptions::suffix()).unwrap(),
                Filter::Not(Filter::True.into()),
            ])
        );
        assert_eq!(Filter::from_spec(&filter.to_alias_spec()).unwrap(), filter);
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let filter = Filter::or_all([
            Filter::not(Filter::is_equal("a", "x").unwrap()),
            Filter::and_all([]),
            Filter::is_equal("$weird", 1).unwrap(),
            Filter::is_less_or_equal("_", Value::Null).unwrap(),
        ]);
        assert_eq!(Filter::from_spec(&filter.to_spec()).unwrap(), filter);
    }

    #[test]
    fn test_nested_negations_collapse() {
        let inner = Filter::is_equal("a", "x").unwrap();
        let operator = Filter::from_spec(&json!({"$not": {"$not": {"a": "x"}}})).unwrap();
        assert_eq!(operator, inner);

        let alias = Filter::from_spec(&json!({
            "_": "not",
            "o": [{"_": "not", "o": [{"_": "isEqual", "p": "a", "v": "x"}]}]
        }))
        .unwrap();
        assert_eq!(alias, inner);
        assert_eq!(alias.content_key(), inner.content_key());

        let triple = Filter::from_spec(&json!({"$not": {"$not": {"$not": {"a": "x"}}}})).unwrap();
        assert_eq!(triple, Filter::not(inner));
    }

    #[test]
    fn test_invalid_specs() {
        assert!(matches!(
            Filter::from_spec(&json!({"$xor": []})),
            Err(VizError::ArgumentInvalid { .. })
        ));
        assert!(Filter::from_spec(&json!({"a": {"$and": []}})).is_err());
        assert!(Filter::from_spec(&json!({"a": {"$in": 3}})).is_err());
        assert!(Filter::from_spec(&json!({"a": {"$eq": [1]}})).is_err());
        assert!(Filter::from_spec(&json!({"_": "isNear"})).is_err());
        assert!(matches!(
            Filter::from_spec(&json!({"_": "isEqual", "v": 1})),
            Err(VizError::ArgumentRequired(_))
        ));
        assert!(Filter::from_spec(&json!(3)).is_err());
        assert!(Filter::from_spec_str("{").is_err());
    }

    #[test]
    fn test_registry_resolution() {
        let mut registry = ModuleRegistry::new();
        declare_filter_types(&mut registry).unwrap();
        registry
            .declare_type("acme/filter/InCountry", &TypeSpec::derived("viz/data/filter/IsIn"))
            .unwrap();
        registry.register_alias("inCountry", "acme/filter/InCountry").unwrap();

        let spec = json!({"_": "inCountry", "p": "country", "v": ["PT"]});
        let filter = Filter::from_spec_in(&spec, &registry).unwrap();
        assert_eq!(filter, Filter::is_in("country", ["PT"]).unwrap());
        assert!(Filter::from_spec(&spec).is_err());

        registry.declare_type("acme/Other", &TypeSpec::default()).unwrap();
        assert!(Filter::from_spec_in(&json!({"_": "acme/Other"}), &registry).is_err());
    }
}
