//! Filter engine.
//!
//! A query's filters are parsed once into a [`Filters`] value: an ordered list
//! of `(field, FieldFilter)` pairs. Each [`FieldFilter`] is either a literal
//! equality test or a conjunction of [`Operator`]s, so documents are matched
//! without re-inspecting the shape of the query.
//!
//! ## JSON Filter DSL
//!
//! ```text
//! {"name": "a"}                          equality
//! {"age": {"__gte": 3, "__lt": 10}}      every operator must pass
//! {"name": {"__re": "^a"}}               unanchored regex over the value's text
//! {"age": {"__cf": "is_even"}}           named custom predicate
//! ```
//!
//! Operator keys are `__ne`, `__gt`, `__lt`, `__lte`, `__gte`, `__re` and
//! `__cf`. Any other key in an operator mapping is rejected when the filter is
//! parsed.
//!
//! Relational operators only relate values of the same kind; comparing a
//! string with a number is a non-match, not an error.

use crate::document::{display_value, partial_compare, values_equal, Document};
use crate::error::{CoreError, CoreResult};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error type a custom predicate may return.
pub type PredicateError = Box<dyn std::error::Error + Send + Sync>;

/// A caller-supplied test applied to a field's value.
pub type Predicate = Arc<dyn Fn(&Value) -> Result<bool, PredicateError> + Send + Sync>;

/// Named predicates available to `__cf` in the JSON DSL.
pub type PredicateRegistry = HashMap<String, Predicate>;

/// A single comparison inside an operator mapping.
#[derive(Clone)]
pub enum Operator {
    /// `__ne`: value differs from the operand.
    Ne(Value),
    /// `__gt`: value is greater than the operand.
    Gt(Value),
    /// `__lt`: value is less than the operand.
    Lt(Value),
    /// `__lte`: value is less than or equal to the operand.
    Lte(Value),
    /// `__gte`: value is greater than or equal to the operand.
    Gte(Value),
    /// `__re`: the pattern matches somewhere in the value's text.
    ///
    /// Strings are matched as-is. Other values are matched against their
    /// compact JSON text, so `true`, `null` and `[1,2]`, not `True` or `None`.
    Regex(Regex),
    /// `__cf`: the predicate returns `true` for the value.
    Custom(Predicate),
}

impl Operator {
    /// Parses one `key: operand` entry of an operator mapping.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidFilter`] for an unknown key or an unregistered
    ///   predicate name.
    /// - [`CoreError::InvalidRegExp`] for a `__re` operand that is not a valid
    ///   pattern string.
    pub fn parse(
        field: &str,
        key: &str,
        operand: &Value,
        predicates: &PredicateRegistry,
    ) -> CoreResult<Self> {
        match key {
            "__ne" => Ok(Self::Ne(operand.clone())),
            "__gt" => Ok(Self::Gt(operand.clone())),
            "__lt" => Ok(Self::Lt(operand.clone())),
            "__lte" => Ok(Self::Lte(operand.clone())),
            "__gte" => Ok(Self::Gte(operand.clone())),
            "__re" => match operand {
                Value::String(pattern) => compile_regex(pattern).map(Self::Regex),
                other => Err(CoreError::invalid_regexp(
                    other.to_string(),
                    "pattern must be a string",
                )),
            },
            "__cf" => {
                let name = operand.as_str().ok_or_else(|| {
                    CoreError::invalid_filter(field, "`__cf` operand must name a predicate")
                })?;
                predicates
                    .get(name)
                    .cloned()
                    .map(Self::Custom)
                    .ok_or_else(|| {
                        CoreError::invalid_filter(field, format!("unknown predicate `{name}`"))
                    })
            }
            other => Err(CoreError::invalid_filter(
                field,
                format!("unknown operator `{other}`"),
            )),
        }
    }

    /// The DSL key for this operator.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ne(_) => "__ne",
            Self::Gt(_) => "__gt",
            Self::Lt(_) => "__lt",
            Self::Lte(_) => "__lte",
            Self::Gte(_) => "__gte",
            Self::Regex(_) => "__re",
            Self::Custom(_) => "__cf",
        }
    }

    /// Tests `value` against this operator.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFilter`] if a custom predicate fails.
    pub fn evaluate(&self, field: &str, value: &Value) -> CoreResult<bool> {
        let relation = |operand: &Value, accept: fn(Ordering) -> bool| {
            partial_compare(value, operand).is_some_and(accept)
        };

        Ok(match self {
            Self::Ne(operand) => !values_equal(value, operand),
            Self::Gt(operand) => relation(operand, Ordering::is_gt),
            Self::Lt(operand) => relation(operand, Ordering::is_lt),
            Self::Lte(operand) => relation(operand, Ordering::is_le),
            Self::Gte(operand) => relation(operand, Ordering::is_ge),
            Self::Regex(re) => re.is_match(&display_value(value)),
            Self::Custom(predicate) => predicate(value).map_err(|e| {
                CoreError::invalid_filter(field, format!("custom predicate failed: {e}"))
            })?,
        })
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ne(v) | Self::Gt(v) | Self::Lt(v) | Self::Lte(v) | Self::Gte(v) => {
                write!(f, "{} {v}", self.key())
            }
            Self::Regex(re) => write!(f, "__re {:?}", re.as_str()),
            Self::Custom(_) => f.write_str("__cf <predicate>"),
        }
    }
}

fn compile_regex(pattern: &str) -> CoreResult<Regex> {
    Regex::new(pattern).map_err(|e| CoreError::invalid_regexp(pattern, e.to_string()))
}

/// Criteria for a single field.
#[derive(Debug, Clone)]
pub enum FieldFilter {
    /// The field must equal this literal.
    Equals(Value),
    /// Every operator must pass. An empty list only requires the field to exist.
    Operators(Vec<Operator>),
}

impl FieldFilter {
    /// Tests a field's value against this filter.
    ///
    /// # Errors
    ///
    /// Propagates custom predicate failures as [`CoreError::InvalidFilter`].
    pub fn matches(&self, field: &str, value: &Value) -> CoreResult<bool> {
        match self {
            Self::Equals(expected) => Ok(values_equal(value, expected)),
            Self::Operators(operators) => {
                for operator in operators {
                    if !operator.evaluate(field, value)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

/// Result of testing a document against a set of filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Every filtered field is present and matches.
    Match,
    /// A filtered field is present but does not match.
    NoMatch,
    /// A filtered field is absent from the document.
    FieldAbsent,
}

impl MatchOutcome {
    /// Whether the document satisfied the filters.
    #[must_use]
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

/// A parsed query: per-field criteria, all of which must hold.
///
/// An empty `Filters` matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    fields: Vec<(String, FieldFilter)>,
}

impl Filters {
    /// Creates an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON filter DSL. `__cf` is unavailable without a registry.
    ///
    /// # Errors
    ///
    /// See [`Operator::parse`]. A non-object input is an
    /// [`CoreError::InvalidFilter`].
    pub fn from_json(value: &Value) -> CoreResult<Self> {
        Self::from_json_with_predicates(value, &PredicateRegistry::new())
    }

    /// Parses the JSON filter DSL, resolving `__cf` names in `predicates`.
    pub fn from_json_with_predicates(
        value: &Value,
        predicates: &PredicateRegistry,
    ) -> CoreResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| CoreError::invalid_filter("", "filters must be a JSON object"))?;

        let mut fields = Vec::with_capacity(object.len());
        for (field, condition) in object {
            let filter = match condition {
                Value::Object(mapping) => FieldFilter::Operators(
                    mapping
                        .iter()
                        .map(|(key, operand)| Operator::parse(field, key, operand, predicates))
                        .collect::<CoreResult<_>>()?,
                ),
                literal => FieldFilter::Equals(literal.clone()),
            };
            fields.push((field.clone(), filter));
        }

        Ok(Self { fields })
    }

    /// Requires `field` to equal `value`, replacing earlier criteria on it.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let filter = FieldFilter::Equals(value.into());
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = filter,
            None => self.fields.push((field, filter)),
        }
        self
    }

    /// Adds an operator on `field`. Operators on the same field are ANDed; an
    /// earlier equality on the field is replaced.
    #[must_use]
    pub fn operator(mut self, field: impl Into<String>, operator: Operator) -> Self {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, FieldFilter::Operators(operators))) => operators.push(operator),
            Some(slot) => slot.1 = FieldFilter::Operators(vec![operator]),
            None => self
                .fields
                .push((field, FieldFilter::Operators(vec![operator]))),
        }
        self
    }

    /// Adds `field != value`.
    #[must_use]
    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, Operator::Ne(value.into()))
    }

    /// Adds `field > value`.
    #[must_use]
    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, Operator::Gt(value.into()))
    }

    /// Adds `field < value`.
    #[must_use]
    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, Operator::Lt(value.into()))
    }

    /// Adds `field <= value`.
    #[must_use]
    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, Operator::Lte(value.into()))
    }

    /// Adds `field >= value`.
    #[must_use]
    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(field, Operator::Gte(value.into()))
    }

    /// Adds a regex test on `field`. Non-string values are matched as JSON
    /// text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegExp`] if `pattern` does not compile.
    pub fn regex(self, field: impl Into<String>, pattern: &str) -> CoreResult<Self> {
        Ok(self.operator(field, Operator::Regex(compile_regex(pattern)?)))
    }

    /// Adds a custom predicate on `field`.
    #[must_use]
    pub fn custom<F>(self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        self.operator(field, Operator::Custom(Arc::new(predicate)))
    }

    /// Number of filtered fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is filtered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates the `(field, filter)` pairs in query order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldFilter)> {
        self.fields.iter().map(|(field, filter)| (field.as_str(), filter))
    }

    /// The `(field, value)` pair when this query is exactly one literal
    /// equality, which tables can answer by binary search.
    #[must_use]
    pub fn single_equality(&self) -> Option<(&str, &Value)> {
        match self.fields.as_slice() {
            [(field, FieldFilter::Equals(value))] => Some((field.as_str(), value)),
            _ => None,
        }
    }

    /// Tests a document, reporting absent fields separately.
    ///
    /// Fields are checked in query order and evaluation stops at the first
    /// field that is absent or fails.
    ///
    /// # Errors
    ///
    /// Propagates custom predicate failures; the caller aborts its whole pass.
    pub fn evaluate(&self, document: &Document) -> CoreResult<MatchOutcome> {
        for (field, filter) in &self.fields {
            let Some(value) = document.get(field) else {
                return Ok(MatchOutcome::FieldAbsent);
            };
            if !filter.matches(field, value)? {
                return Ok(MatchOutcome::NoMatch);
            }
        }
        Ok(MatchOutcome::Match)
    }

    /// Whether `document` satisfies every filter.
    pub fn matches(&self, document: &Document) -> CoreResult<bool> {
        self.evaluate(document).map(MatchOutcome::is_match)
    }
}

/// Tests a single value against a single field filter.
///
/// Shorthand for [`FieldFilter::matches`] when no field name is at hand.
pub fn matches(value: &Value, filter: &FieldFilter) -> CoreResult<bool> {
    filter.matches("", value)
}
