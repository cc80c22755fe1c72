//! Form-layer adapter for indirect relations.
//!
//! Users pick among *live* entities; snapshot ids never appear in choices.
//! The widget maps a stored pointer back to the logical key it pins, so an
//! edit form pre-selects the right entity.

mod field;
mod widget;

#[cfg(test)]
mod tests;

use crate::value::Value;
use derive_more::{Deref, From, IntoIterator};

pub use field::IndirectChoiceField;
pub(crate) use field::validate_choice;
pub use widget::IndirectSelect;

///
/// Choice
///
/// One selectable entity: its key projection and display label.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Choice {
    pub value: Value,
    pub label: String,
}

///
/// ChoiceSet
///

#[derive(Clone, Debug, Default, Deref, Eq, From, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct ChoiceSet(Vec<Choice>);

impl ChoiceSet {
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.0.iter().map(|choice| choice.value.clone()).collect()
    }
}
