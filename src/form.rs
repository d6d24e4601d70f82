// quote-desk: form state held between keystrokes and submission

use crate::contact::{ContactField, ContactForm, ContactValidator, ErrorMap};
use crate::error::AppError;
use crate::pricing::{self, standard_categories, Category, OptionItem, SummaryTable};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything the user has entered so far.
///
/// Updates return a new value; validation is recomputed from scratch by
/// [`FormState::validated`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub contact: ContactForm,
    pub categories: Vec<Category>,
    pub errors: ErrorMap,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new(standard_categories())
    }
}

impl FormState {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            contact: ContactForm::default(),
            categories,
            errors: ErrorMap::new(),
        }
    }

    /// Replaces one contact field and clears its pending error.
    pub fn update_field(&self, field: ContactField, value: impl Into<String>) -> Self {
        let mut errors = self.errors.clone();
        errors.remove(&field);
        Self {
            contact: self.contact.with_field(field, value),
            categories: self.categories.clone(),
            errors,
        }
    }

    /// Replaces the selected options of the named category.
    pub fn select(&self, category: &str, items: Vec<OptionItem>) -> Result<Self, AppError> {
        let mut next = self.clone();
        let slot = next
            .categories
            .iter_mut()
            .find(|c| c.name == category)
            .ok_or_else(|| AppError::SelectionError(format!("unknown category: {}", category)))?;
        slot.items = items;
        Ok(next)
    }

    pub fn validated(&self, validator: &ContactValidator) -> Self {
        Self {
            contact: self.contact.clone(),
            categories: self.categories.clone(),
            errors: validator.validate(&self.contact),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> SummaryTable {
        SummaryTable::from_categories(&self.categories)
    }

    pub fn grand_total(&self) -> f64 {
        pricing::grand_total(&self.categories)
    }
}

/// Loads a selection file: a JSON object of category name to selected
/// options. Categories missing from the file stay empty.
pub fn load_selection(path: &Path) -> Result<Vec<Category>, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::SelectionError(format!("{}: {}", path.display(), e)))?;
    parse_selection(&content)
}

pub fn parse_selection(content: &str) -> Result<Vec<Category>, AppError> {
    let entries: BTreeMap<String, Vec<OptionItem>> = serde_json::from_str(content)
        .map_err(|e| AppError::SelectionError(format!("Invalid JSON: {}", e)))?;

    let mut state = FormState::default();
    for (category, items) in entries {
        state = state.select(&category, items)?;
    }
    Ok(state.categories)
}
