//! Attribute values and their types.
//!
//! Filters and sort keys never look at items directly; they work on the
//! [`Value`] an [`AttributeAccessor`](crate::AttributeAccessor) reads out of an
//! item. `Value` carries a total order so that filter operators and sort keys
//! agree on what "less than" means:
//!
//! | left          | right         | order                        |
//! |---------------|---------------|------------------------------|
//! | `Null`        | anything else | `Null` is lowest             |
//! | `Int`/`Float` | `Int`/`Float` | numeric                      |
//! | `Text`        | `Text`        | lexicographic (byte order)   |
//! | `List`        | `List`        | element-wise, then length    |
//! | other kinds   | other kinds   | by kind: bool < number < text < list |

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    /// `Null`, empty text, whitespace-only text or an empty list.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.trim().is_empty(),
            Value::List(values) => values.is_empty(),
            _ => false,
        }
    }

    /// The most specific [`ValueType`] describing this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Any,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::List(_) => ValueType::List,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::List(_) => 4,
        }
    }

    /// Total order over values; see the module docs for the rules.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => int_float_cmp(*a, *b),
            (Value::Float(a), Value::Int(b)) => int_float_cmp(*b, *a).reverse(),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let ord = left.compare(right);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    /// Equality under [`Value::compare`], so `Int(1)` equals `Float(1.0)`.
    pub fn same_as(&self, other: &Value) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

/// Exact comparison of an integer with a float, without rounding the integer
/// to the nearest representable float. NaNs sort as `f64::total_cmp` does.
fn int_float_cmp(int: i64, float: f64) -> Ordering {
    const BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= BOUND {
        return Ordering::Less;
    }
    if float < -BOUND {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal if float > whole => Ordering::Less,
        Ordering::Equal if float < whole => Ordering::Greater,
        ordering => ordering,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Text(value) => write!(f, "{:?}", value),
            Value::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(i64::from(value))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Value::Int)
            .unwrap_or(Value::Float(value as f64))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value)
            .map(Value::Int)
            .unwrap_or(Value::Float(value as f64))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// The declared type of an attribute.
///
/// `Any`, `Comparable` and `Number` are abstract: no value has them as its
/// own type, but operators can be registered against them and then apply to
/// every concrete type that lists them as a supertype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Any,
    Comparable,
    Number,
    Bool,
    Int,
    Float,
    Text,
    List,
}

impl ValueType {
    /// Supertypes from the nearest to the most general.
    pub fn supertypes(self) -> &'static [ValueType] {
        match self {
            ValueType::Any => &[],
            ValueType::Comparable => &[ValueType::Any],
            ValueType::Number => &[ValueType::Comparable, ValueType::Any],
            ValueType::Int | ValueType::Float => {
                &[ValueType::Number, ValueType::Comparable, ValueType::Any]
            }
            ValueType::Text => &[ValueType::Comparable, ValueType::Any],
            ValueType::Bool | ValueType::List => &[ValueType::Any],
        }
    }

    /// True if a value of type `other` can be used where `self` is expected.
    pub fn is_assignable_from(self, other: ValueType) -> bool {
        self == other || other.supertypes().contains(&self)
    }

    pub fn is_text(self) -> bool {
        self == ValueType::Text
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Comparable => "comparable",
            ValueType::Number => "number",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Text => "text",
            ValueType::List => "list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_below_everything() {
        for value in [
            Value::Bool(false),
            Value::Int(i64::MIN),
            Value::Float(f64::NEG_INFINITY),
            Value::from(""),
            Value::List(vec![]),
        ] {
            assert_eq!(Value::Null.compare(&value), Ordering::Less);
            assert_eq!(value.compare(&Value::Null), Ordering::Greater);
        }
    }

    #[test]
    fn ints_and_floats_compare_numerically() {
        assert!(Value::Int(2).same_as(&Value::Float(2.0)));
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Float(3.5).compare(&Value::Int(3)), Ordering::Greater);
    }

    #[test]
    fn large_integers_compare_exactly_with_floats() {
        let two_53 = 9_007_199_254_740_992i64;
        assert!(!Value::Int(two_53 + 1).same_as(&Value::Float(two_53 as f64)));
        assert_eq!(
            Value::Int(two_53 + 1).compare(&Value::Float(two_53 as f64)),
            Ordering::Greater
        );
        assert!(Value::Int(two_53).same_as(&Value::Float(two_53 as f64)));
        assert_eq!(Value::Int(-3).compare(&Value::Float(-2.5)), Ordering::Less);
        assert_eq!(Value::Float(-2.5).compare(&Value::Int(-2)), Ordering::Less);
        assert_eq!(Value::Int(i64::MAX).compare(&Value::Float(f64::INFINITY)), Ordering::Less);
        assert_eq!(Value::Int(i64::MIN).compare(&Value::Float(-1e19)), Ordering::Greater);
        assert_eq!(Value::Int(i64::MAX).compare(&Value::Float(9.3e18)), Ordering::Less);
    }

    #[test]
    fn lists_compare_element_wise() {
        let short = Value::from(vec![1, 2]);
        let long = Value::from(vec![1, 2, 0]);
        let bigger = Value::from(vec![1, 3]);
        assert_eq!(short.compare(&long), Ordering::Less);
        assert_eq!(bigger.compare(&long), Ordering::Greater);
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(u64::MAX), Value::Float(u64::MAX as f64));
        assert_eq!(Value::from(7u8), Value::Int(7));
    }

    #[test]
    fn blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("   ").is_blank());
        assert!(Value::List(vec![]).is_blank());
        assert!(!Value::Int(0).is_blank());
        assert!(!Value::from("a").is_blank());
    }

    #[test]
    fn supertype_chain() {
        assert!(ValueType::Comparable.is_assignable_from(ValueType::Int));
        assert!(ValueType::Number.is_assignable_from(ValueType::Float));
        assert!(ValueType::Any.is_assignable_from(ValueType::List));
        assert!(!ValueType::Comparable.is_assignable_from(ValueType::Bool));
        assert!(!ValueType::Number.is_assignable_from(ValueType::Text));
    }

    #[test]
    fn untagged_json_round_trip() {
        let value: Value = serde_json::from_str(r#"["a", 1, 2.5, null, true]"#).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::from("a"),
                Value::Int(1),
                Value::Float(2.5),
                Value::Null,
                Value::Bool(true),
            ])
        );
    }
}
