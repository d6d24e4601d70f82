// quote-desk: price aggregation and the summary table shown to the user

use serde::{Deserialize, Serialize};

/// Display names of the standard catalogue, in table order.
pub const STANDARD_CATEGORIES: [&str; 11] = [
    "Platform",
    "Size",
    "User Interface",
    "Social Login",
    "User Content",
    "Locations",
    "Engagement",
    "Billing",
    "Feedback",
    "External API",
    "Security",
];

/// Text shown for a category with nothing selected.
pub const NONE_SELECTED: &str = "None selected";

// ============================================================================
// Data Structures
// ============================================================================

/// A single selectable feature with a fixed price.
///
/// Input may omit the price; it then counts as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl OptionItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price: Some(price),
        }
    }

    pub fn price(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }
}

/// A named group of options; `items` holds what the user selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub items: Vec<OptionItem>,
}

impl Category {
    pub fn new(id: u32, name: impl Into<String>, items: Vec<OptionItem>) -> Self {
        Self {
            id,
            name: name.into(),
            items,
        }
    }
}

/// Eleven empty categories in display order, ids starting at 1.
pub fn standard_categories() -> Vec<Category> {
    STANDARD_CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, name)| Category::new(i as u32 + 1, *name, Vec::new()))
        .collect()
}

// ============================================================================
// Totals
// ============================================================================

pub fn category_total(category: &Category) -> f64 {
    category.items.iter().map(OptionItem::price).sum()
}

pub fn grand_total(categories: &[Category]) -> f64 {
    categories.iter().map(category_total).sum()
}

/// Formats an amount the way the form shows it: whole numbers without a
/// fractional part, everything else in its shortest exact form.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}

// ============================================================================
// Summary Table
// ============================================================================

/// One rendered row of the requirements summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub category: String,
    pub selected: String,
    pub total: f64,
}

/// The summary shown to the user and captured into the quotation document.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
    pub grand_total: f64,
}

impl SummaryTable {
    pub fn from_categories(categories: &[Category]) -> Self {
        let rows = categories
            .iter()
            .map(|category| {
                let selected = if category.items.is_empty() {
                    NONE_SELECTED.to_string()
                } else {
                    category
                        .items
                        .iter()
                        .map(|item| item.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                SummaryRow {
                    category: category.name.clone(),
                    selected,
                    total: category_total(category),
                }
            })
            .collect();

        Self {
            rows,
            grand_total: grand_total(categories),
        }
    }

    pub fn row(&self, category: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.category == category)
    }
}

/// Per-category entry of the `tableDetails` JSON sent with a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetail {
    pub name: String,
    pub selected: Vec<OptionItem>,
    pub total_price: f64,
}

pub fn table_details(categories: &[Category]) -> Vec<TableDetail> {
    categories
        .iter()
        .map(|category| TableDetail {
            name: category.name.clone(),
            selected: category.items.clone(),
            total_price: category_total(category),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn platform_and_size() -> Vec<Category> {
        vec![
            Category::new(1, "Platform", vec![OptionItem::new("Web", 500.0)]),
            Category::new(2, "Size", vec![]),
        ]
    }

    #[test]
    fn empty_selection_totals_zero() {
        let category = Category::new(1, "Platform", vec![]);
        assert_eq!(category_total(&category), 0.0);
    }

    #[test]
    fn missing_price_counts_as_zero() {
        let category = Category::new(
            1,
            "Billing",
            vec![
                OptionItem::new("Subscriptions", 300.0),
                OptionItem {
                    name: "Free tier".to_string(),
                    price: None,
                },
            ],
        );
        assert_eq!(category_total(&category), 300.0);
    }

    #[test]
    fn missing_price_deserializes() {
        let item: OptionItem = serde_json::from_str(r#"{"name":"Chat"}"#).unwrap();
        assert_eq!(item.price(), 0.0);
    }

    #[test]
    fn grand_total_of_platform_and_empty_size() {
        let categories = platform_and_size();
        assert_eq!(grand_total(&categories), 500.0);

        let table = SummaryTable::from_categories(&categories);
        let size = table.row("Size").unwrap();
        assert_eq!(size.selected, NONE_SELECTED);
        assert_eq!(size.total, 0.0);
        assert_eq!(table.grand_total, 500.0);
    }

    #[test]
    fn selected_names_are_comma_joined() {
        let categories = vec![Category::new(
            3,
            "User Interface",
            vec![OptionItem::new("Basic", 100.0), OptionItem::new("Custom", 400.0)],
        )];
        let table = SummaryTable::from_categories(&categories);
        assert_eq!(table.rows[0].selected, "Basic, Custom");
        assert_eq!(table.rows[0].total, 500.0);
    }

    #[test]
    fn standard_catalogue_has_eleven_ordered_categories() {
        let categories = standard_categories();
        assert_eq!(categories.len(), 11);
        assert_eq!(categories[0].name, "Platform");
        assert_eq!(categories[0].id, 1);
        assert_eq!(categories[10].name, "Security");
        assert_eq!(categories[10].id, 11);
        assert_eq!(grand_total(&categories), 0.0);
    }

    #[test]
    fn table_details_serialize_with_camel_case_total() {
        let details = table_details(&platform_and_size());
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json[0]["name"], "Platform");
        assert_eq!(json[0]["selected"][0]["name"], "Web");
        assert_eq!(json[0]["selected"][0]["price"], 500.0);
        assert_eq!(json[0]["totalPrice"], 500.0);
        assert_eq!(json[1]["selected"].as_array().unwrap().len(), 0);
        assert_eq!(json[1]["totalPrice"], 0.0);
    }

    #[test]
    fn amounts_format_without_trailing_zero() {
        assert_eq!(format_amount(500.0), "500");
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(12.5), "12.5");
        assert_eq!(format_amount(0.1 + 0.2), "0.30000000000000004");
    }

    proptest! {
        #[test]
        fn category_total_is_the_sum_of_prices(prices in prop::collection::vec(0u32..100_000, 0..20)) {
            let items = prices.iter().enumerate()
                .map(|(i, p)| OptionItem::new(format!("item-{i}"), f64::from(*p)))
                .collect();
            let category = Category::new(1, "Platform", items);
            let expected: u64 = prices.iter().map(|p| u64::from(*p)).sum();
            prop_assert_eq!(category_total(&category), expected as f64);
        }

        #[test]
        fn totals_ignore_ordering(prices in prop::collection::vec(0u32..100_000, 0..40)) {
            let mut categories = standard_categories();
            for (i, p) in prices.iter().enumerate() {
                let slot = i % categories.len();
                categories[slot].items.push(OptionItem::new(format!("item-{i}"), f64::from(*p)));
            }
            let forward = grand_total(&categories);

            let mut reversed = categories.clone();
            reversed.reverse();
            for category in &mut reversed {
                category.items.reverse();
            }
            prop_assert_eq!(forward, grand_total(&reversed));

            let per_category: f64 = categories.iter().map(category_total).sum();
            prop_assert_eq!(forward, per_category);
        }
    }
}
