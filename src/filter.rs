//! Filter expression trees.
//!
//! A [`FilterNode`] is immutable; editing a filter means building a new tree.
//! Empty `And` is vacuously true, empty `Or` is false.

use std::fmt;
use std::sync::Arc;

use crate::attribute::{AttributeAccessor, QueryAttribute};
use crate::operator::ComparisonOperator;
use crate::value::Value;

/// A leaf: `attribute operator literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    attribute: Arc<QueryAttribute>,
    operator: ComparisonOperator,
    value: Value,
}

impl Comparison {
    pub fn attribute(&self) -> &Arc<QueryAttribute> {
        &self.attribute
    }

    pub fn operator(&self) -> &ComparisonOperator {
        &self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_effective(&self) -> bool {
        self.operator.is_effective_filter_value(&self.value)
    }

    fn matches<T: ?Sized>(&self, item: &T, accessor: &dyn AttributeAccessor<T>) -> bool {
        let actual = accessor.value(item, self.attribute.name());
        self.operator.evaluate(&actual, &self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    Compare(Comparison),
}

impl FilterNode {
    pub fn and(children: impl IntoIterator<Item = FilterNode>) -> Self {
        FilterNode::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = FilterNode>) -> Self {
        FilterNode::Or(children.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: FilterNode) -> Self {
        FilterNode::Not(Box::new(child))
    }

    pub fn compare(
        attribute: &Arc<QueryAttribute>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        FilterNode::Compare(Comparison {
            attribute: Arc::clone(attribute),
            operator,
            value: value.into(),
        })
    }

    /// Evaluate against one item. `And` stops at the first `false`, `Or` at
    /// the first `true`.
    pub fn matches<T: ?Sized>(&self, item: &T, accessor: &dyn AttributeAccessor<T>) -> bool {
        match self {
            FilterNode::And(children) => children.iter().all(|child| child.matches(item, accessor)),
            FilterNode::Or(children) => children.iter().any(|child| child.matches(item, accessor)),
            FilterNode::Not(child) => !child.matches(item, accessor),
            FilterNode::Compare(comparison) => comparison.matches(item, accessor),
        }
    }

    /// Drop comparisons whose literal is not effective.
    ///
    /// Returns `None` when nothing constraining is left. Groups that lose all
    /// of their children disappear; groups that were empty to begin with are
    /// kept, so an explicit empty `Or` still rejects everything.
    pub fn prune(&self) -> Option<FilterNode> {
        match self {
            FilterNode::Compare(comparison) => {
                comparison.is_effective().then(|| self.clone())
            }
            FilterNode::Not(child) => child.prune().map(FilterNode::not),
            FilterNode::And(children) if children.is_empty() => None,
            FilterNode::Or(children) if children.is_empty() => Some(self.clone()),
            FilterNode::And(children) => Self::prune_group(children, FilterNode::And),
            FilterNode::Or(children) => Self::prune_group(children, FilterNode::Or),
        }
    }

    fn prune_group(
        children: &[FilterNode],
        rebuild: fn(Vec<FilterNode>) -> FilterNode,
    ) -> Option<FilterNode> {
        let mut kept: Vec<FilterNode> = children.iter().filter_map(FilterNode::prune).collect();
        match kept.len() {
            0 => None,
            1 => kept.pop(),
            _ => Some(rebuild(kept)),
        }
    }

    /// All comparison leaves, depth first.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                for child in children {
                    child.collect_comparisons(out);
                }
            }
            FilterNode::Not(child) => child.collect_comparisons(out),
            FilterNode::Compare(comparison) => out.push(comparison),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn group(f: &mut fmt::Formatter<'_>, join: &str, children: &[FilterNode]) -> fmt::Result {
            write!(f, "(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", join)?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")
        }

        match self {
            FilterNode::And(children) if children.is_empty() => write!(f, "true"),
            FilterNode::Or(children) if children.is_empty() => write!(f, "false"),
            FilterNode::And(children) => group(f, "and", children),
            FilterNode::Or(children) => group(f, "or", children),
            FilterNode::Not(child) => write!(f, "not {}", child),
            FilterNode::Compare(c) => write!(f, "{} {} {}", c.attribute, c.operator, c.value),
        }
    }
}
