//! Which comparison operators apply to which value types.
//!
//! Lookup order for a value type: its own registration, then the first
//! registered supertype (nearest first), then the declared default set. A type
//! that resolves to nothing is a configuration error. Resolutions are cached
//! per registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{CollectionError, Result};
use crate::filter::FilterNode;
use crate::operator::{ComparisonOperator, TextMatch};
use crate::value::ValueType;

pub struct OperatorRegistry {
    by_type: HashMap<ValueType, Vec<ComparisonOperator>>,
    defaults: Vec<ComparisonOperator>,
    resolved: RwLock<HashMap<ValueType, Arc<[ComparisonOperator]>>>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl OperatorRegistry {
    /// A registry with nothing registered and no defaults.
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
            defaults: Vec::new(),
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// The built-in operator table.
    pub fn standard() -> Self {
        use ComparisonOperator::*;

        let ordering = [
            Equal,
            NotEqual,
            Less,
            LessOrEqual,
            Greater,
            GreaterOrEqual,
            InSet,
            NotInSet,
            IsNull,
            IsNotNull,
        ];
        let mut text = ordering.to_vec();
        text.extend([
            Contains(TextMatch::EXACT),
            StartsWith(TextMatch::EXACT),
            EndsWith(TextMatch::EXACT),
            Matches(TextMatch::EXACT),
        ]);

        let mut registry = Self::empty();
        registry.register(ValueType::Comparable, ordering);
        registry.register(ValueType::Text, text);
        registry.register(ValueType::Bool, [Equal, NotEqual, IsNull, IsNotNull]);
        registry.register(
            ValueType::List,
            [Contains(TextMatch::EXACT), IsNull, IsNotNull],
        );
        registry.set_defaults([Equal, NotEqual, IsNull, IsNotNull]);
        registry
    }

    pub fn register(
        &mut self,
        value_type: ValueType,
        operators: impl IntoIterator<Item = ComparisonOperator>,
    ) {
        self.by_type
            .entry(value_type)
            .or_default()
            .extend(operators);
        self.invalidate();
    }

    pub fn set_defaults(&mut self, operators: impl IntoIterator<Item = ComparisonOperator>) {
        self.defaults = operators.into_iter().collect();
        self.invalidate();
    }

    fn invalidate(&mut self) {
        match self.resolved.get_mut() {
            Ok(resolved) => resolved.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Operators applicable to `value_type`.
    pub fn operators_for(&self, value_type: ValueType) -> Result<Arc<[ComparisonOperator]>> {
        {
            let resolved = self
                .resolved
                .read()
                .map_err(|_| CollectionError::LockPoisoned("operator registry read"))?;
            if let Some(ops) = resolved.get(&value_type) {
                return Ok(Arc::clone(ops));
            }
        }

        let found = std::iter::once(value_type)
            .chain(value_type.supertypes().iter().copied())
            .find_map(|candidate| self.by_type.get(&candidate))
            .or(Some(&self.defaults).filter(|defaults| !defaults.is_empty()))
            .ok_or(CollectionError::NoOperators { value_type })?;

        let ops: Arc<[ComparisonOperator]> = found
            .iter()
            .copied()
            .filter(|op| op.accepts(value_type))
            .collect();
        if ops.is_empty() {
            return Err(CollectionError::NoOperators { value_type });
        }

        let mut resolved = self
            .resolved
            .write()
            .map_err(|_| CollectionError::LockPoisoned("operator registry write"))?;
        resolved.insert(value_type, Arc::clone(&ops));
        Ok(ops)
    }

    /// Operators are matched by name, so a `Contains` registered with one text
    /// mode also admits `Contains` with any other.
    pub fn is_applicable(
        &self,
        operator: &ComparisonOperator,
        value_type: ValueType,
    ) -> Result<bool> {
        Ok(self
            .operators_for(value_type)?
            .iter()
            .any(|op| op.name() == operator.name()))
    }

    /// Check every comparison in `filter` against its attribute's type.
    pub fn validate(&self, filter: &FilterNode) -> Result<()> {
        for comparison in filter.comparisons() {
            let value_type = comparison.attribute().value_type();
            if !self.is_applicable(comparison.operator(), value_type)? {
                return Err(CollectionError::OperatorNotApplicable {
                    operator: comparison.operator().name(),
                    value_type,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::QueryAttribute;
    use crate::value::Value;
    use ComparisonOperator::*;

    #[test]
    fn exact_registration_wins() {
        let registry = OperatorRegistry::standard();
        let text = registry.operators_for(ValueType::Text).unwrap();
        assert!(text.contains(&StartsWith(TextMatch::EXACT)));
    }

    #[test]
    fn falls_back_to_supertype() {
        let registry = OperatorRegistry::standard();
        let ints = registry.operators_for(ValueType::Int).unwrap();
        assert!(ints.contains(&Less));
        assert!(!ints.contains(&StartsWith(TextMatch::EXACT)));

        let floats = registry.operators_for(ValueType::Float).unwrap();
        assert_eq!(ints, floats);
    }

    #[test]
    fn falls_back_to_defaults() {
        let mut registry = OperatorRegistry::empty();
        registry.set_defaults([Equal, IsNull]);
        let ops = registry.operators_for(ValueType::Bool).unwrap();
        assert_eq!(&*ops, &[Equal, IsNull]);
    }

    #[test]
    fn unresolvable_type_is_a_configuration_error() {
        let registry = OperatorRegistry::empty();
        let err = registry.operators_for(ValueType::Int).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::NoOperators {
                value_type: ValueType::Int
            }
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn registering_invalidates_cached_resolution() {
        let mut registry = OperatorRegistry::empty();
        registry.set_defaults([Equal]);
        assert_eq!(registry.operators_for(ValueType::Int).unwrap().len(), 1);

        registry.register(ValueType::Number, [Equal, Less]);
        assert_eq!(registry.operators_for(ValueType::Int).unwrap().len(), 2);
    }

    #[test]
    fn validate_reports_inapplicable_operator() {
        let registry = OperatorRegistry::standard();
        let age = QueryAttribute::new("age", ValueType::Int);
        let name = QueryAttribute::new("name", ValueType::Text);

        let ok = FilterNode::and([
            FilterNode::compare(&age, Greater, Value::Int(3)),
            FilterNode::compare(&name, StartsWith(TextMatch::LOOSE), Value::from("a")),
        ]);
        assert!(registry.validate(&ok).is_ok());

        let bad = FilterNode::not(FilterNode::compare(
            &age,
            Contains(TextMatch::EXACT),
            Value::from("1"),
        ));
        assert!(matches!(
            registry.validate(&bad),
            Err(CollectionError::OperatorNotApplicable {
                operator: "contains",
                value_type: ValueType::Int
            })
        ));
    }
}
