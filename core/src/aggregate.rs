//! Shopping-list aggregation: flatten the selected meals' ingredient usages,
//! deduplicate by ingredient id with full quantity summation, and sort the
//! result by category for grouped display.

use std::collections::{HashMap, HashSet};

use crate::models::{AggregatedItem, IngredientUsage, Meal};

/// Effective quantity of a usage: absent or zero quantities count as 1.
fn effective_quantity(quantity: i64) -> i64 {
    if quantity < 1 { 1 } else { quantity }
}

/// Aggregate the ingredient usages of the given meals into a deduplicated
/// shopping list.
///
/// Usages are flattened in meal order, then within-meal order. The first
/// occurrence of an ingredient id becomes the output entry (name, category,
/// and notes are taken from it); every later occurrence only adds its
/// quantity to that entry. The output is sorted by category ascending,
/// stable within equal categories.
///
/// A usage whose catalog entry no longer exists is not an error: its
/// denormalized name and category are carried through as last known.
#[must_use]
pub fn aggregate_meals(meals: &[Meal]) -> Vec<AggregatedItem> {
    let usages: Vec<&IngredientUsage> = meals.iter().flat_map(|m| &m.ingredients).collect();
    aggregate_usages(&usages)
}

#[must_use]
pub fn aggregate_usages(usages: &[&IngredientUsage]) -> Vec<AggregatedItem> {
    let mut seen: HashSet<i64> = HashSet::new();
    // Extra quantity accumulated by occurrences beyond the first, keyed by
    // ingredient id. Must add every repeat, not just the second occurrence.
    let mut extra: HashMap<i64, i64> = HashMap::new();
    let mut items: Vec<AggregatedItem> = Vec::new();

    for usage in usages {
        if seen.insert(usage.ingredient_id) {
            items.push(AggregatedItem {
                ingredient_id: usage.ingredient_id,
                name: usage.name.clone(),
                category: usage.category.clone(),
                quantity: effective_quantity(usage.quantity),
                notes: usage.notes.clone(),
            });
        } else {
            *extra.entry(usage.ingredient_id).or_insert(0) +=
                effective_quantity(usage.quantity);
        }
    }

    for item in &mut items {
        if let Some(more) = extra.get(&item.ingredient_id) {
            item.quantity += more;
        }
    }

    items.sort_by(|a, b| a.category.cmp(&b.category));
    items
}

/// For each item in a category-sorted list, whether the category header
/// should be printed: true exactly on the first element of each maximal run
/// of equal categories.
#[must_use]
pub fn header_flags(items: &[AggregatedItem]) -> Vec<bool> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| i == 0 || items[i - 1].category != item.category)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(id: i64, name: &str, category: &str, quantity: i64) -> IngredientUsage {
        IngredientUsage {
            ingredient_id: id,
            name: name.to_string(),
            category: category.to_string(),
            quantity,
            notes: None,
        }
    }

    fn meal(title: &str, ingredients: Vec<IngredientUsage>) -> Meal {
        Meal {
            id: 0,
            uuid: String::new(),
            title: title.to_string(),
            ingredients,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_two_meals_sum_quantities() {
        // Scenario A: Milk x1 + Milk x2 across two meals → one entry, quantity 3
        let meals = vec![
            meal("Cereal", vec![usage(1, "Milk", "Dairy", 1)]),
            meal("Pancakes", vec![usage(1, "Milk", "Dairy", 2)]),
        ];
        let items = aggregate_meals(&meals);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ingredient_id, 1);
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[0].category, "Dairy");
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn test_three_occurrences_all_counted() {
        // Scenario B: the same ingredient in three meals must sum all three,
        // not just the second occurrence.
        let meals = vec![
            meal("A", vec![usage(2, "Eggs", "Dairy", 1)]),
            meal("B", vec![usage(2, "Eggs", "Dairy", 1)]),
            meal("C", vec![usage(2, "Eggs", "Dairy", 1)]),
        ];
        let items = aggregate_meals(&meals);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn test_many_occurrences_varied_quantities() {
        let meals = vec![
            meal("A", vec![usage(7, "Onion", "Produce", 2)]),
            meal("B", vec![usage(7, "Onion", "Produce", 3)]),
            meal("C", vec![usage(7, "Onion", "Produce", 1)]),
            meal("D", vec![usage(7, "Onion", "Produce", 4)]),
        ];
        let items = aggregate_meals(&meals);
        assert_eq!(items[0].quantity, 10);
    }

    #[test]
    fn test_no_duplicate_ids() {
        let meals = vec![
            meal(
                "A",
                vec![
                    usage(1, "Milk", "Dairy", 1),
                    usage(2, "Bread", "Bakery", 1),
                    usage(1, "Milk", "Dairy", 1),
                ],
            ),
            meal("B", vec![usage(2, "Bread", "Bakery", 2)]),
        ];
        let items = aggregate_meals(&meals);
        let mut ids: Vec<i64> = items.iter().map(|i| i.ingredient_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), items.len());
    }

    #[test]
    fn test_missing_quantity_defaults_to_one() {
        // Scenario D: a zero (or missing, which deserializes to the same
        // default) quantity counts as 1 in the sum.
        let meals = vec![
            meal("A", vec![usage(3, "Butter", "Dairy", 0)]),
            meal("B", vec![usage(3, "Butter", "Dairy", 2)]),
        ];
        let items = aggregate_meals(&meals);
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn test_sorted_by_category_stable() {
        // Scenario C: ["Produce", "Dairy", "Produce"] sorts to
        // ["Dairy", "Produce", "Produce"] keeping encounter order within runs.
        let meals = vec![meal(
            "A",
            vec![
                usage(1, "Apples", "Produce", 1),
                usage(2, "Milk", "Dairy", 1),
                usage(3, "Bananas", "Produce", 1),
            ],
        )];
        let items = aggregate_meals(&meals);
        let categories: Vec<&str> = items.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(categories, ["Dairy", "Produce", "Produce"]);
        assert_eq!(items[1].name, "Apples");
        assert_eq!(items[2].name, "Bananas");
    }

    #[test]
    fn test_sort_is_deterministic() {
        let meals = vec![meal(
            "A",
            vec![
                usage(1, "Apples", "Produce", 1),
                usage(2, "Milk", "Dairy", 1),
                usage(3, "Bananas", "Produce", 1),
                usage(4, "Bread", "Bakery", 1),
            ],
        )];
        let first = aggregate_meals(&meals);
        let second = aggregate_meals(&meals);
        assert_eq!(first, second);
    }

    #[test]
    fn test_notes_carried_from_first_occurrence() {
        let mut first = usage(5, "Chicken", "Meat", 1);
        first.notes = Some("thighs".to_string());
        let mut second = usage(5, "Chicken", "Meat", 2);
        second.notes = Some("breast".to_string());

        let meals = vec![meal("A", vec![first]), meal("B", vec![second])];
        let items = aggregate_meals(&meals);
        assert_eq!(items[0].notes.as_deref(), Some("thighs"));
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn test_stale_catalog_reference_tolerated() {
        // Ingredient id 99 no longer exists in any catalog; the denormalized
        // fields still flow through.
        let meals = vec![meal("A", vec![usage(99, "Ghost Pepper", "Spices", 1)])];
        let items = aggregate_meals(&meals);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Ghost Pepper");
        assert_eq!(items[0].category, "Spices");
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_meals(&[]).is_empty());
        assert!(header_flags(&[]).is_empty());
    }

    #[test]
    fn test_header_flags_mark_run_starts() {
        let meals = vec![meal(
            "A",
            vec![
                usage(1, "Milk", "Dairy", 1),
                usage(2, "Cheese", "Dairy", 1),
                usage(3, "Apples", "Produce", 1),
                usage(4, "Bananas", "Produce", 1),
                usage(5, "Cumin", "Spices", 1),
            ],
        )];
        let items = aggregate_meals(&meals);
        assert_eq!(header_flags(&items), [true, false, true, false, true]);
    }

    #[test]
    fn test_header_flags_single_category() {
        let meals = vec![meal(
            "A",
            vec![usage(1, "Milk", "Dairy", 1), usage(2, "Cheese", "Dairy", 1)],
        )];
        let items = aggregate_meals(&meals);
        assert_eq!(header_flags(&items), [true, false]);
    }
}
