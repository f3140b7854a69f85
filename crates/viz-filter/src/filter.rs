//! The filter tree

use std::cmp::Ordering;
use std::sync::Arc;

use viz_core::{Result, VizError};
use viz_data::{Element, Value};

use crate::kind::FilterKind;

/// Operands of `And` / `Or`
pub type Operands = Arc<[Filter]>;

/// An immutable boolean predicate over elements.
///
/// Children are shared through `Arc`, so cloning is cheap and composing
/// never touches existing trees.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    False,
    And(Operands),
    Or(Operands),
    Not(Arc<Filter>),
    IsEqual(Comparison),
    IsGreater(Comparison),
    IsGreaterOrEqual(Comparison),
    IsLess(Comparison),
    IsLessOrEqual(Comparison),
    IsIn(IsIn),
    IsLike(IsLike),
}

/// Property compared against one reference value
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    property: Arc<str>,
    value: Value,
}

/// Property tested for membership in a list of values
#[derive(Debug, Clone, PartialEq)]
pub struct IsIn {
    property: Arc<str>,
    values: Arc<[Value]>,
}

/// Anchoring and case options of [`IsLike`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeOptions {
    pub anchor_start: bool,
    pub anchor_end: bool,
    pub case_insensitive: bool,
}

impl LikeOptions {
    pub fn prefix() -> Self {
        Self {
            anchor_start: true,
            ..Self::default()
        }
    }

    pub fn suffix() -> Self {
        Self {
            anchor_end: true,
            ..Self::default()
        }
    }

    pub fn exact() -> Self {
        Self {
            anchor_start: true,
            anchor_end: true,
            ..Self::default()
        }
    }

    pub fn ignoring_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

/// Property whose formatted text contains a reference text
#[derive(Debug, Clone, PartialEq)]
pub struct IsLike {
    property: Arc<str>,
    text: Option<Arc<str>>,
    options: LikeOptions,
}

fn property_name(property: &str) -> Result<Arc<str>> {
    if property.is_empty() {
        return Err(VizError::ArgumentRequired("property".to_string()));
    }
    Ok(Arc::from(property))
}

/// Reference values must survive JSON serialization: no NaN or infinities
fn reference_value(name: &str, value: Value) -> Result<Value> {
    match value {
        Value::Number(n) if !n.is_finite() => Err(VizError::invalid(name, format!("{} is not a finite number", n))),
        value => Ok(value),
    }
}

impl Comparison {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluate `test(element value, reference value)`; an absent property
    /// or a null reference fails
    fn test<E: Element + ?Sized>(&self, elem: &E, test: impl Fn(&Value, &Value) -> bool) -> bool {
        if self.value.is_null() {
            return false;
        }
        match elem.property(&self.property) {
            Some(cell) => test(cell.value, &self.value),
            None => false,
        }
    }
}

impl IsIn {
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Reference values in declaration order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The equivalent `IsEqual` of a single-value list
    pub(crate) fn as_equality(&self) -> Option<Filter> {
        match &*self.values {
            [value] => Some(Filter::IsEqual(Comparison {
                property: self.property.clone(),
                value: value.clone(),
            })),
            _ => None,
        }
    }

    fn contains<E: Element + ?Sized>(&self, elem: &E) -> bool {
        if self.values.is_empty() {
            return false;
        }
        match elem.property(&self.property) {
            Some(cell) => self.values.iter().any(|v| cell.value.equals(v)),
            None => false,
        }
    }
}

impl IsLike {
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Reference text; `None` when absent
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn options(&self) -> LikeOptions {
        self.options
    }

    fn contains<E: Element + ?Sized>(&self, elem: &E) -> bool {
        let Some(text) = self.text.as_deref() else {
            return false;
        };
        let Some(formatted) = elem.property(&self.property).and_then(|cell| cell.formatted()) else {
            return false;
        };

        let (haystack, needle) = if self.options.case_insensitive {
            (formatted.to_lowercase(), text.to_lowercase())
        } else {
            (formatted.into_owned(), text.to_string())
        };

        match (self.options.anchor_start, self.options.anchor_end) {
            (true, true) => haystack == needle,
            (true, false) => haystack.starts_with(&needle),
            (false, true) => haystack.ends_with(&needle),
            (false, false) => haystack.contains(&needle),
        }
    }
}

impl Filter {
    /// Comparison of `kind` on `property`; `kind` must be a comparison kind
    pub fn comparison(kind: FilterKind, property: &str, value: impl Into<Value>) -> Result<Filter> {
        let comparison = Comparison {
            property: property_name(property)?,
            value: reference_value("value", value.into())?,
        };
        Ok(match kind {
            FilterKind::IsEqual => Filter::IsEqual(comparison),
            FilterKind::IsGreater => Filter::IsGreater(comparison),
            FilterKind::IsGreaterOrEqual => Filter::IsGreaterOrEqual(comparison),
            FilterKind::IsLess => Filter::IsLess(comparison),
            FilterKind::IsLessOrEqual => Filter::IsLessOrEqual(comparison),
            other => {
                return Err(VizError::invalid(
                    "kind",
                    format!("{} is not a comparison", other),
                ))
            }
        })
    }

    pub fn is_equal(property: &str, value: impl Into<Value>) -> Result<Filter> {
        Self::comparison(FilterKind::IsEqual, property, value)
    }

    pub fn is_greater(property: &str, value: impl Into<Value>) -> Result<Filter> {
        Self::comparison(FilterKind::IsGreater, property, value)
    }

    pub fn is_greater_or_equal(property: &str, value: impl Into<Value>) -> Result<Filter> {
        Self::comparison(FilterKind::IsGreaterOrEqual, property, value)
    }

    pub fn is_less(property: &str, value: impl Into<Value>) -> Result<Filter> {
        Self::comparison(FilterKind::IsLess, property, value)
    }

    pub fn is_less_or_equal(property: &str, value: impl Into<Value>) -> Result<Filter> {
        Self::comparison(FilterKind::IsLessOrEqual, property, value)
    }

    pub fn is_in<I, V>(property: &str, values: I) -> Result<Filter>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ok(Filter::IsIn(IsIn {
            property: property_name(property)?,
            values: values
                .into_iter()
                .map(|value| reference_value("values", value.into()))
                .collect::<Result<_>>()?,
        }))
    }

    /// Affix match; a null `value` yields a filter that matches nothing
    pub fn is_like(property: &str, value: impl Into<Value>, options: LikeOptions) -> Result<Filter> {
        let text = match reference_value("value", value.into())? {
            Value::Null => None,
            Value::String(s) => Some(Arc::from(s.as_str())),
            other => Some(Arc::from(other.to_string().as_str())),
        };
        Ok(Filter::IsLike(IsLike {
            property: property_name(property)?,
            text,
            options,
        }))
    }

    /// Conjunction of `operands`, in order
    pub fn and_all(operands: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::And(operands.into_iter().collect())
    }

    /// Disjunction of `operands`, in order
    pub fn or_all(operands: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::Or(operands.into_iter().collect())
    }

    /// Negation of `operand`; `not(Not(f))` is `f` itself, not a double wrap
    pub fn not(operand: Filter) -> Filter {
        match operand {
            Filter::Not(inner) => (*inner).clone(),
            other => Filter::Not(Arc::new(other)),
        }
    }

    /// `self AND other` as a new filter
    pub fn and(&self, other: &Filter) -> Filter {
        Filter::and_all([self.clone(), other.clone()])
    }

    /// `self OR other` as a new filter
    pub fn or(&self, other: &Filter) -> Filter {
        Filter::or_all([self.clone(), other.clone()])
    }

    /// The complement of this filter, pushed inward where an inverse exists.
    ///
    /// Terminals swap, range comparisons switch to their inverse kind,
    /// `And`/`Or` flip with negated operands, `Not(f)` unwraps to `f`, and
    /// everything else is wrapped in `Not`.
    pub fn negate(&self) -> Filter {
        match self {
            Filter::True => Filter::False,
            Filter::False => Filter::True,
            Filter::And(operands) => Filter::Or(operands.iter().map(Filter::negate).collect()),
            Filter::Or(operands) => Filter::And(operands.iter().map(Filter::negate).collect()),
            Filter::Not(inner) => (**inner).clone(),
            Filter::IsGreater(c) => Filter::IsLessOrEqual(c.clone()),
            Filter::IsGreaterOrEqual(c) => Filter::IsLess(c.clone()),
            Filter::IsLess(c) => Filter::IsGreaterOrEqual(c.clone()),
            Filter::IsLessOrEqual(c) => Filter::IsGreater(c.clone()),
            Filter::IsEqual(_) | Filter::IsIn(_) | Filter::IsLike(_) => Filter::Not(Arc::new(self.clone())),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::True => FilterKind::True,
            Filter::False => FilterKind::False,
            Filter::And(_) => FilterKind::And,
            Filter::Or(_) => FilterKind::Or,
            Filter::Not(_) => FilterKind::Not,
            Filter::IsEqual(_) => FilterKind::IsEqual,
            Filter::IsGreater(_) => FilterKind::IsGreater,
            Filter::IsGreaterOrEqual(_) => FilterKind::IsGreaterOrEqual,
            Filter::IsLess(_) => FilterKind::IsLess,
            Filter::IsLessOrEqual(_) => FilterKind::IsLessOrEqual,
            Filter::IsIn(_) => FilterKind::IsIn,
            Filter::IsLike(_) => FilterKind::IsLike,
        }
    }

    /// Property name of property filters
    pub fn property(&self) -> Option<&str> {
        match self {
            Filter::IsEqual(c)
            | Filter::IsGreater(c)
            | Filter::IsGreaterOrEqual(c)
            | Filter::IsLess(c)
            | Filter::IsLessOrEqual(c) => Some(c.property()),
            Filter::IsIn(f) => Some(f.property()),
            Filter::IsLike(f) => Some(f.property()),
            _ => None,
        }
    }

    /// Reference value of comparison filters
    pub fn value(&self) -> Option<&Value> {
        match self {
            Filter::IsEqual(c)
            | Filter::IsGreater(c)
            | Filter::IsGreaterOrEqual(c)
            | Filter::IsLess(c)
            | Filter::IsLessOrEqual(c) => Some(c.value()),
            _ => None,
        }
    }

    /// Child filters: the operands of `And`/`Or`, the operand of `Not`
    pub fn operands(&self) -> &[Filter] {
        match self {
            Filter::And(operands) | Filter::Or(operands) => operands,
            Filter::Not(inner) => std::slice::from_ref(&**inner),
            _ => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Whether `elem` satisfies this filter
    pub fn contains<E: Element + ?Sized>(&self, elem: &E) -> bool {
        match self {
            Filter::True => true,
            Filter::False => false,
            Filter::And(operands) => operands.iter().all(|f| f.contains(elem)),
            Filter::Or(operands) => operands.iter().any(|f| f.contains(elem)),
            Filter::Not(inner) => !inner.contains(elem),
            Filter::IsEqual(c) => c.test(elem, |v, r| v.equals(r)),
            Filter::IsGreater(c) => c.test(elem, |v, r| v.compare(r) == Some(Ordering::Greater)),
            Filter::IsGreaterOrEqual(c) => c.test(elem, |v, r| {
                matches!(v.compare(r), Some(Ordering::Greater | Ordering::Equal))
            }),
            Filter::IsLess(c) => c.test(elem, |v, r| v.compare(r) == Some(Ordering::Less)),
            Filter::IsLessOrEqual(c) => c.test(elem, |v, r| {
                matches!(v.compare(r), Some(Ordering::Less | Ordering::Equal))
            }),
            Filter::IsIn(f) => f.contains(elem),
            Filter::IsLike(f) => f.contains(elem),
        }
    }

    /// Pre-order traversal of every node
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Filter)) {
        visitor(self);
        for operand in self.operands() {
            operand.visit(visitor);
        }
    }

    /// Property names referenced anywhere in the tree, in first-use order
    pub fn properties(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        self.visit(&mut |f| {
            if let Some(name) = f.property() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        });
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viz_data::Record;

    fn row(sales: f64) -> Record {
        Record::new().with("sales", sales).with("name", "Foo")
    }

    #[test]
    fn test_comparisons() {
        let greater = Filter::is_greater("sales", 13000).unwrap();
        assert!(!greater.contains(&row(12000.0)));
        assert!(greater.contains(&row(14000.0)));
        assert!(!greater.contains(&row(13000.0)));

        let at_least = Filter::is_greater_or_equal("sales", 13000).unwrap();
        assert!(at_least.contains(&row(13000.0)));

        let at_most = Filter::is_less_or_equal("sales", 13000).unwrap();
        assert!(at_most.contains(&row(13000.0)));
        assert!(!Filter::is_less("sales", 13000).unwrap().contains(&row(13000.0)));

        assert!(Filter::is_equal("name", "Foo").unwrap().contains(&row(1.0)));
        assert!(!Filter::is_equal("name", "foo").unwrap().contains(&row(1.0)));
    }

    #[test]
    fn test_property_required() {
        assert!(matches!(Filter::is_equal("", 1), Err(VizError::ArgumentRequired(_))));
        assert!(matches!(
            Filter::comparison(FilterKind::IsIn, "a", 1),
            Err(VizError::ArgumentInvalid { .. })
        ));
    }

    #[test]
    fn test_non_finite_references_rejected() {
        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(matches!(Filter::is_less("x", bad), Err(VizError::ArgumentInvalid { .. })));
            assert!(matches!(Filter::is_equal("x", bad), Err(VizError::ArgumentInvalid { .. })));
            assert!(matches!(
                Filter::is_in("x", [Value::from(1), Value::from(bad)]),
                Err(VizError::ArgumentInvalid { .. })
            ));
            assert!(matches!(
                Filter::is_like("x", bad, LikeOptions::default()),
                Err(VizError::ArgumentInvalid { .. })
            ));
        }

        let finite = Filter::is_less("x", f64::MAX).unwrap();
        assert_eq!(Filter::from_spec(&finite.to_spec()).unwrap(), finite);
    }

    #[test]
    fn test_absent_property_and_null_reference() {
        let missing = Record::new().with("other", 1);
        assert!(!Filter::is_less("sales", 10).unwrap().contains(&missing));
        assert!(!Filter::is_equal("sales", Value::Null).unwrap().contains(&row(1.0)));

        let null_row = Record::new().with("sales", Value::Null);
        assert!(!Filter::is_equal("sales", Value::Null).unwrap().contains(&null_row));
        assert!(!Filter::is_greater("sales", 0).unwrap().contains(&null_row));
    }

    #[test]
    fn test_is_in() {
        let filter = Filter::is_in("name", ["Bar", "Foo"]).unwrap();
        assert!(filter.contains(&row(1.0)));
        let empty = Filter::is_in("name", Vec::<Value>::new()).unwrap();
        assert!(!empty.contains(&row(1.0)));
    }

    #[test]
    fn test_is_like_anchors() {
        let r = row(1.0);
        assert!(Filter::is_like("name", "oo", LikeOptions::default()).unwrap().contains(&r));
        assert!(!Filter::is_like("name", "oo", LikeOptions::prefix()).unwrap().contains(&r));
        assert!(Filter::is_like("name", "Fo", LikeOptions::prefix()).unwrap().contains(&r));
        assert!(Filter::is_like("name", "oo", LikeOptions::suffix()).unwrap().contains(&r));
        assert!(!Filter::is_like("name", "oo", LikeOptions::exact()).unwrap().contains(&r));
        assert!(Filter::is_like("name", "Foo", LikeOptions::exact()).unwrap().contains(&r));
        assert!(Filter::is_like("name", "foo", LikeOptions::exact().ignoring_case())
            .unwrap()
            .contains(&r));
        assert!(!Filter::is_like("name", Value::Null, LikeOptions::default()).unwrap().contains(&r));
    }

    #[test]
    fn test_is_like_prefers_label() {
        let mut record = Record::new();
        record.insert("sales", viz_data::Cell::labeled(1500, "1.5k"));
        assert!(Filter::is_like("sales", "k", LikeOptions::suffix()).unwrap().contains(&record));
        assert!(!Filter::is_like("sales", "1500", LikeOptions::default()).unwrap().contains(&record));
        assert!(Filter::is_like("sales", "15", LikeOptions::prefix()).unwrap().contains(&row(1500.0)));
    }

    #[test]
    fn test_composites() {
        let r = row(100.0);
        assert!(Filter::and_all([]).contains(&r));
        assert!(!Filter::or_all([]).contains(&r));

        let big = Filter::is_greater("sales", 50).unwrap();
        let foo = Filter::is_equal("name", "Foo").unwrap();
        assert!(big.and(&foo).contains(&r));
        assert!(!big.and(&Filter::False).contains(&r));
        assert!(Filter::False.or(&foo).contains(&r));
        assert!(!Filter::not(foo.clone()).contains(&r));
    }

    #[test]
    fn test_not_collapses() {
        let foo = Filter::is_equal("name", "Foo").unwrap();
        let twice = Filter::not(Filter::not(foo.clone()));
        assert_eq!(twice, foo);
    }

    #[test]
    fn test_negate() {
        let le = Filter::is_less_or_equal("x", 5).unwrap();
        assert_eq!(le.negate(), Filter::is_greater("x", 5).unwrap());
        assert_eq!(
            Filter::is_greater_or_equal("x", 5).unwrap().negate(),
            Filter::is_less("x", 5).unwrap()
        );

        let eq = Filter::is_equal("x", 5).unwrap();
        assert_eq!(eq.negate(), Filter::Not(Arc::new(eq.clone())));
        assert_eq!(eq.negate().negate(), eq);

        let tree = Filter::and_all([le.clone(), eq.clone()]);
        let negated = tree.negate();
        assert_eq!(negated.kind(), FilterKind::Or);
        assert_eq!(negated.operands()[0], Filter::is_greater("x", 5).unwrap());
        assert_eq!(negated.negate(), tree);

        assert_eq!(Filter::True.negate(), Filter::False);
        assert_eq!(Filter::and_all([]).negate(), Filter::or_all([]));
    }

    #[test]
    fn test_composing_leaves_operands_untouched() {
        let a = Filter::is_equal("a", 1).unwrap();
        let b = Filter::is_equal("b", 2).unwrap();
        let combined = a.or(&b);
        assert_eq!(a, Filter::is_equal("a", 1).unwrap());
        assert_eq!(combined.operands(), &[a, b]);
    }

    #[test]
    fn test_properties() {
        let filter = Filter::and_all([
            Filter::is_equal("a", 1).unwrap(),
            Filter::not(Filter::is_in("b", [1, 2]).unwrap()),
            Filter::is_less("a", 3).unwrap(),
        ]);
        assert_eq!(filter.properties(), vec!["a", "b"]);
    }
}
