//! Bounded variables and the ordered sets that hold them.
//!
//! A [`Variable`] is valid iff both bounds are present and `min < max`.
//! Invalid entries are never rejected on edit: an operator typing a new
//! value passes through invalid states, so validity is a query, not a
//! constraint. Name uniqueness, on the other hand, is enforced when a
//! [`VariableSet`] is constructed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BoundField;

/// Errors raised by [`VariableSet`] construction and editing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariableSetError {
    /// Two variables in the same set share a name.
    #[error("duplicate variable name: {name}")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// An edit addressed a position past the end of the set.
    #[error("variable index {index} out of range (set has {len} entries)")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of entries in the set.
        len: usize,
    },
}

/// A named parameter bounded by a `[min, max]` interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Variable {
    /// Variable name, unique within its set.
    pub name: String,
    /// Lower bound, absent while the operator has cleared the field.
    pub min: Option<f64>,
    /// Upper bound, absent while the operator has cleared the field.
    pub max: Option<f64>,
}

impl Variable {
    /// Create a variable with the given (possibly absent) bounds.
    pub fn new(name: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    /// Create a variable with both bounds present.
    pub fn bounded(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, Some(min), Some(max))
    }

    /// Whether both bounds are present and `min < max`.
    ///
    /// A NaN bound compares false and therefore makes the variable invalid.
    pub fn is_valid(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min < max)
    }

    /// Read one bound.
    pub const fn bound(&self, field: BoundField) -> Option<f64> {
        match field {
            BoundField::Min => self.min,
            BoundField::Max => self.max,
        }
    }

    fn set_bound(&mut self, field: BoundField, value: Option<f64>) {
        match field {
            BoundField::Min => self.min = value,
            BoundField::Max => self.max = value,
        }
    }
}

/// An ordered sequence of uniquely named [`Variable`]s.
///
/// Insertion order is display and edit order. Membership is fixed once a
/// set is built; only bound values change afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VariableSet(Vec<Variable>);

impl VariableSet {
    /// An empty set. Vacuously valid.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a set, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`VariableSetError::DuplicateName`] for the first name that
    /// appears more than once.
    pub fn new(variables: Vec<Variable>) -> Result<Self, VariableSetError> {
        let mut seen = BTreeSet::new();
        for variable in &variables {
            if !seen.insert(variable.name.as_str()) {
                return Err(VariableSetError::DuplicateName {
                    name: variable.name.clone(),
                });
            }
        }
        Ok(Self(variables))
    }

    /// Number of variables in the set.
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no variables.
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The variables in order.
    pub fn as_slice(&self) -> &[Variable] {
        &self.0
    }

    /// Iterate over the variables in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.0.iter()
    }

    /// The variable at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Variable> {
        self.0.get(index)
    }

    /// Position of the variable called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|v| v.name == name)
    }

    /// Replace one bound of one entry in place.
    ///
    /// No normalisation happens: `min > max` is accepted and simply marks
    /// the entry invalid.
    ///
    /// # Errors
    ///
    /// Returns [`VariableSetError::IndexOutOfRange`] if `index` does not
    /// address an entry; the set is left unchanged.
    pub fn set_bound(
        &mut self,
        index: usize,
        field: BoundField,
        value: Option<f64>,
    ) -> Result<(), VariableSetError> {
        let len = self.0.len();
        let variable = self
            .0
            .get_mut(index)
            .ok_or(VariableSetError::IndexOutOfRange { index, len })?;
        variable.set_bound(field, value);
        Ok(())
    }

    /// Return a copy of this set with one bound of one entry replaced.
    ///
    /// # Errors
    ///
    /// Returns [`VariableSetError::IndexOutOfRange`] if `index` does not
    /// address an entry.
    pub fn with_bound(
        &self,
        index: usize,
        field: BoundField,
        value: Option<f64>,
    ) -> Result<Self, VariableSetError> {
        let mut next = self.clone();
        next.set_bound(index, field, value)?;
        Ok(next)
    }

    /// Whether every variable in the set is valid.
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(Variable::is_valid)
    }

    /// Names of the invalid variables, in set order.
    pub fn invalid_names(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|v| !v.is_valid())
            .map(|v| v.name.clone())
            .collect()
    }

    /// Combined readiness of a design/test pair: both must be valid.
    pub fn jointly_valid(design: &Self, test: &Self) -> bool {
        design.is_valid() && test.is_valid()
    }
}

impl<'a> IntoIterator for &'a VariableSet {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
