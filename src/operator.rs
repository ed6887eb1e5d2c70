//! Comparison operators used by filter leaves.
//!
//! Every operator has a fixed null policy. With `a` the item's attribute
//! value and `v` the filter literal:
//!
//! | operator             | `a`, `v = null` | `a = null`, `v` | `null`, `null` |
//! |----------------------|-----------------|-----------------|----------------|
//! | `Equal`              | false           | false           | true           |
//! | `NotEqual`           | true            | true            | false          |
//! | `Less`               | false           | true            | false          |
//! | `LessOrEqual`        | false           | true            | false          |
//! | `Greater`            | true            | false           | true           |
//! | `GreaterOrEqual`     | true            | false           | true           |
//! | `Contains` & co.     | true            | false           | true           |
//! | `Matches`            | false           | false           | true           |
//! | `IsNull`/`IsNotNull` | literal ignored | literal ignored | literal ignored|
//! | `InSet`              | false           | by membership   | false          |
//! | `NotInSet`           | true            | by membership   | true           |
//!
//! A null literal on the ordering operators reads as "absent bound": anything
//! is greater than it, nothing is less than it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueType};

/// How string operators compare text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TextMatch {
    pub ignore_case: bool,
    pub ignore_whitespace: bool,
}

impl TextMatch {
    pub const EXACT: TextMatch = TextMatch {
        ignore_case: false,
        ignore_whitespace: false,
    };

    pub const LOOSE: TextMatch = TextMatch {
        ignore_case: true,
        ignore_whitespace: true,
    };

    pub fn ignoring_case() -> Self {
        TextMatch {
            ignore_case: true,
            ignore_whitespace: false,
        }
    }

    fn normalize(self, text: &str) -> String {
        let mut out: String = if self.ignore_whitespace {
            text.chars().filter(|c| !c.is_whitespace()).collect()
        } else {
            text.to_string()
        };
        if self.ignore_case {
            out = out.to_lowercase();
        }
        out
    }

    /// Compares the two normalized operands.
    pub fn equal(self, left: &str, right: &str) -> bool {
        if self == TextMatch::EXACT {
            return left == right;
        }
        self.normalize(left) == self.normalize(right)
    }

    pub fn contains(self, haystack: &str, needle: &str) -> bool {
        self.normalize(haystack).contains(&self.normalize(needle))
    }

    pub fn starts_with(self, haystack: &str, prefix: &str) -> bool {
        self.normalize(haystack).starts_with(&self.normalize(prefix))
    }

    pub fn ends_with(self, haystack: &str, suffix: &str) -> bool {
        self.normalize(haystack).ends_with(&self.normalize(suffix))
    }
}

/// A named predicate over `(attribute value, filter literal)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// Substring for text; element membership for lists.
    Contains(TextMatch),
    StartsWith(TextMatch),
    EndsWith(TextMatch),
    /// Text equality under a [`TextMatch`] normalization.
    Matches(TextMatch),
    IsNull,
    IsNotNull,
    /// Attribute is one of the literal's list elements.
    InSet,
    NotInSet,
}

impl ComparisonOperator {
    pub fn name(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "equal",
            ComparisonOperator::NotEqual => "not_equal",
            ComparisonOperator::Less => "less",
            ComparisonOperator::LessOrEqual => "less_or_equal",
            ComparisonOperator::Greater => "greater",
            ComparisonOperator::GreaterOrEqual => "greater_or_equal",
            ComparisonOperator::Contains(_) => "contains",
            ComparisonOperator::StartsWith(_) => "starts_with",
            ComparisonOperator::EndsWith(_) => "ends_with",
            ComparisonOperator::Matches(_) => "matches",
            ComparisonOperator::IsNull => "is_null",
            ComparisonOperator::IsNotNull => "is_not_null",
            ComparisonOperator::InSet => "in_set",
            ComparisonOperator::NotInSet => "not_in_set",
        }
    }

    /// Whether this operator makes sense for attributes of `value_type`.
    pub fn accepts(&self, value_type: ValueType) -> bool {
        match self {
            ComparisonOperator::Equal
            | ComparisonOperator::NotEqual
            | ComparisonOperator::IsNull
            | ComparisonOperator::IsNotNull
            | ComparisonOperator::InSet
            | ComparisonOperator::NotInSet => true,
            ComparisonOperator::Less
            | ComparisonOperator::LessOrEqual
            | ComparisonOperator::Greater
            | ComparisonOperator::GreaterOrEqual => {
                ValueType::Comparable.is_assignable_from(value_type)
            }
            ComparisonOperator::Contains(_) => {
                matches!(value_type, ValueType::Text | ValueType::List)
            }
            ComparisonOperator::StartsWith(_)
            | ComparisonOperator::EndsWith(_)
            | ComparisonOperator::Matches(_) => value_type.is_text(),
        }
    }

    /// Whether `literal` constrains anything at all.
    ///
    /// Filter UIs produce leaves for every field, filled or not; a leaf whose
    /// literal is not effective is dropped instead of evaluated.
    pub fn is_effective_filter_value(&self, literal: &Value) -> bool {
        match self {
            ComparisonOperator::IsNull | ComparisonOperator::IsNotNull => true,
            ComparisonOperator::InSet | ComparisonOperator::NotInSet => match literal {
                Value::List(values) => !values.is_empty(),
                other => !other.is_null(),
            },
            _ => !literal.is_blank(),
        }
    }

    /// Evaluate the operator. Never panics, whatever the operands.
    pub fn evaluate(&self, attribute: &Value, literal: &Value) -> bool {
        match self {
            ComparisonOperator::Equal => attribute.same_as(literal),
            ComparisonOperator::NotEqual => !attribute.same_as(literal),
            ComparisonOperator::Less => {
                !literal.is_null() && attribute.compare(literal) == Ordering::Less
            }
            ComparisonOperator::LessOrEqual => {
                !literal.is_null() && attribute.compare(literal) != Ordering::Greater
            }
            ComparisonOperator::Greater => {
                literal.is_null() || attribute.compare(literal) == Ordering::Greater
            }
            ComparisonOperator::GreaterOrEqual => {
                literal.is_null() || attribute.compare(literal) != Ordering::Less
            }
            ComparisonOperator::Contains(mode) => {
                if literal.is_null() {
                    return true;
                }
                match (attribute, literal) {
                    (Value::Text(text), Value::Text(needle)) => mode.contains(text, needle),
                    (Value::List(values), needle) => {
                        values.iter().any(|value| text_or_value_eq(*mode, value, needle))
                    }
                    _ => false,
                }
            }
            ComparisonOperator::StartsWith(mode) => match (attribute, literal) {
                (_, Value::Null) => true,
                (Value::Text(text), Value::Text(prefix)) => mode.starts_with(text, prefix),
                _ => false,
            },
            ComparisonOperator::EndsWith(mode) => match (attribute, literal) {
                (_, Value::Null) => true,
                (Value::Text(text), Value::Text(suffix)) => mode.ends_with(text, suffix),
                _ => false,
            },
            ComparisonOperator::Matches(mode) => text_or_value_eq(*mode, attribute, literal),
            ComparisonOperator::IsNull => attribute.is_null(),
            ComparisonOperator::IsNotNull => !attribute.is_null(),
            ComparisonOperator::InSet => in_set(attribute, literal),
            ComparisonOperator::NotInSet => !in_set(attribute, literal),
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn text_or_value_eq(mode: TextMatch, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => mode.equal(a, b),
        _ => left.same_as(right),
    }
}

fn in_set(attribute: &Value, literal: &Value) -> bool {
    match literal {
        Value::Null => false,
        Value::List(values) => values.iter().any(|value| attribute.same_as(value)),
        single => attribute.same_as(single),
    }
}

#[cfg(test)]
mod tests {
    use super::ComparisonOperator::*;
    use super::*;

    const ALL: [ComparisonOperator; 14] = [
        Equal,
        NotEqual,
        Less,
        LessOrEqual,
        Greater,
        GreaterOrEqual,
        Contains(TextMatch::EXACT),
        StartsWith(TextMatch::EXACT),
        EndsWith(TextMatch::EXACT),
        Matches(TextMatch::LOOSE),
        IsNull,
        IsNotNull,
        InSet,
        NotInSet,
    ];

    #[test]
    fn null_policy_table() {
        let three = Value::Int(3);
        let null = Value::Null;

        assert!(Greater.evaluate(&three, &null));
        assert!(GreaterOrEqual.evaluate(&three, &null));
        assert!(!LessOrEqual.evaluate(&three, &null));
        assert!(!Less.evaluate(&three, &null));
        assert!(Equal.evaluate(&null, &null));
        assert!(!NotEqual.evaluate(&null, &null));
        assert!(!Equal.evaluate(&three, &null));

        assert!(Less.evaluate(&null, &three));
        assert!(LessOrEqual.evaluate(&null, &three));
        assert!(!Greater.evaluate(&null, &three));
        assert!(!GreaterOrEqual.evaluate(&null, &three));
    }

    #[test]
    fn evaluate_never_panics_on_nulls() {
        let operands = [
            Value::Null,
            Value::Int(1),
            Value::from("x"),
            Value::from(vec!["x"]),
            Value::Bool(true),
        ];
        for op in ALL {
            for left in &operands {
                for right in &operands {
                    let _ = op.evaluate(left, right);
                    let _ = op.is_effective_filter_value(right);
                }
            }
        }
    }

    #[test]
    fn ordering_operators() {
        assert!(Less.evaluate(&Value::Int(1), &Value::Int(2)));
        assert!(!Less.evaluate(&Value::Int(2), &Value::Int(2)));
        assert!(LessOrEqual.evaluate(&Value::Int(2), &Value::Float(2.0)));
        assert!(Greater.evaluate(&Value::from("b"), &Value::from("a")));
        assert!(GreaterOrEqual.evaluate(&Value::from("a"), &Value::from("a")));
    }

    #[test]
    fn string_operators_are_case_sensitive_by_default() {
        let text = Value::from("Hello World");
        assert!(Contains(TextMatch::EXACT).evaluate(&text, &Value::from("World")));
        assert!(!Contains(TextMatch::EXACT).evaluate(&text, &Value::from("world")));
        assert!(Contains(TextMatch::ignoring_case()).evaluate(&text, &Value::from("world")));
        assert!(StartsWith(TextMatch::EXACT).evaluate(&text, &Value::from("Hello")));
        assert!(!StartsWith(TextMatch::EXACT).evaluate(&text, &Value::from("hello")));
        assert!(EndsWith(TextMatch::LOOSE).evaluate(&text, &Value::from("o r l d")));
    }

    #[test]
    fn matches_compares_both_operands() {
        let op = Matches(TextMatch::LOOSE);
        assert!(op.evaluate(&Value::from("New York"), &Value::from("newyork")));
        assert!(!op.evaluate(&Value::from("New York"), &Value::from("new jersey")));
        assert!(!op.evaluate(&Value::from("a"), &Value::Null));
    }

    #[test]
    fn contains_on_lists() {
        let tags = Value::from(vec!["rust", "work"]);
        assert!(Contains(TextMatch::EXACT).evaluate(&tags, &Value::from("rust")));
        assert!(!Contains(TextMatch::EXACT).evaluate(&tags, &Value::from("RUST")));
        assert!(Contains(TextMatch::ignoring_case()).evaluate(&tags, &Value::from("RUST")));
    }

    #[test]
    fn set_membership() {
        let set = Value::from(vec![1, 2, 3]);
        assert!(InSet.evaluate(&Value::Int(2), &set));
        assert!(!InSet.evaluate(&Value::Int(5), &set));
        assert!(NotInSet.evaluate(&Value::Int(5), &set));
        assert!(!InSet.evaluate(&Value::Int(5), &Value::Null));
    }

    #[test]
    fn effective_filter_values() {
        assert!(!Equal.is_effective_filter_value(&Value::from("")));
        assert!(!Equal.is_effective_filter_value(&Value::Null));
        assert!(Equal.is_effective_filter_value(&Value::Int(0)));
        assert!(IsNull.is_effective_filter_value(&Value::Null));
        assert!(!InSet.is_effective_filter_value(&Value::List(vec![])));
        assert!(InSet.is_effective_filter_value(&Value::Int(1)));
    }

    #[test]
    fn operator_value_type_compatibility() {
        assert!(Contains(TextMatch::EXACT).accepts(ValueType::Text));
        assert!(!Contains(TextMatch::EXACT).accepts(ValueType::Int));
        assert!(Less.accepts(ValueType::Int));
        assert!(!Less.accepts(ValueType::Bool));
        assert!(Equal.accepts(ValueType::Bool));
    }
}
