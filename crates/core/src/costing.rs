//! Cost-of-goods calculation for concrete: recipe quantities multiplied by
//! current material prices, plus every overhead cost per cubic meter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::money::Money;

/// Material keys as they appear in the plant's price list.
pub const CEMENT: &str = "цемент";
pub const SAND: &str = "песок";
pub const CRUSHED_STONE: &str = "щебень";
pub const SCREENING: &str = "отсев";
pub const WATER: &str = "вода";
pub const ADDITIVES: &str = "добавки";

pub const MATERIAL_KEYS: [&str; 6] = [CEMENT, SAND, CRUSHED_STONE, SCREENING, WATER, ADDITIVES];

/// Bill of materials for one cubic meter of a concrete mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteRecipe {
    pub mark: String,
    pub cement_kg: f64,
    pub sand_t: f64,
    pub crushed_stone_t: f64,
    pub screening_t: f64,
    pub water_l: f64,
    pub additives_l: f64,
}

impl ConcreteRecipe {
    fn components(&self) -> [(&'static str, f64); 6] {
        [
            (CEMENT, self.cement_kg),
            (SAND, self.sand_t),
            (CRUSHED_STONE, self.crushed_stone_t),
            (SCREENING, self.screening_t),
            (WATER, self.water_l),
            (ADDITIVES, self.additives_l),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCost {
    pub mark: String,
    pub total: Money,
    /// Materials the recipe needs but the price list does not cover.
    pub missing: Vec<String>,
}

impl RecipeCost {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Costs one cubic meter of the given mark. Components with zero quantity
/// are ignored; priced components accumulate even when others are missing,
/// so the caller can report both the partial total and the gaps.
pub fn recipe_cost(
    recipe: &ConcreteRecipe,
    material_prices: &HashMap<String, Money>,
    overheads_per_m3: &[Money],
) -> RecipeCost {
    let mut total = Money::zero();
    let mut missing = Vec::new();

    for (key, qty) in recipe.components() {
        if qty <= 0.0 {
            continue;
        }
        match material_prices.get(key) {
            Some(price) => total += price.scale(qty),
            None => missing.push(key.to_string()),
        }
    }

    for overhead in overheads_per_m3 {
        total += *overhead;
    }

    RecipeCost {
        mark: recipe.mark.clone(),
        total,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> ConcreteRecipe {
        ConcreteRecipe {
            mark: "M300".to_string(),
            cement_kg: 320.0,
            sand_t: 0.6,
            crushed_stone_t: 1.1,
            screening_t: 0.0,
            water_l: 180.0,
            additives_l: 0.0,
        }
    }

    fn prices(pairs: &[(&str, i64)]) -> HashMap<String, Money> {
        pairs
            .iter()
            .map(|(k, cents)| (k.to_string(), Money::from_cents(*cents)))
            .collect()
    }

    #[test]
    fn fully_priced_recipe_sums_materials_and_overheads() {
        let prices = prices(&[
            (CEMENT, 10_50),   // per kg
            (SAND, 800_00),    // per tonne
            (CRUSHED_STONE, 1200_00),
            (WATER, 0_05),     // per litre
        ]);
        let overheads = vec![Money::from_cents(150_00), Money::from_cents(80_00)];

        let cost = recipe_cost(&recipe(), &prices, &overheads);
        assert!(cost.is_complete());
        // 320*10.50 + 0.6*800 + 1.1*1200 + 180*0.05 + 150 + 80
        assert_eq!(cost.total.to_cents(), 3360_00 + 480_00 + 1320_00 + 9_00 + 230_00);
    }

    #[test]
    fn missing_price_is_reported_not_silently_zeroed() {
        let prices = prices(&[(CEMENT, 10_00)]);
        let cost = recipe_cost(&recipe(), &prices, &[]);
        assert_eq!(cost.missing, vec![SAND, CRUSHED_STONE, WATER]);
        // Cement still counted.
        assert_eq!(cost.total.to_cents(), 3200_00);
    }

    #[test]
    fn zero_quantity_components_need_no_price() {
        let prices = prices(&[
            (CEMENT, 10_00),
            (SAND, 800_00),
            (CRUSHED_STONE, 1200_00),
            (WATER, 0_05),
        ]);
        // screening_t and additives_l are zero; no "отсев"/"добавки" price required.
        let cost = recipe_cost(&recipe(), &prices, &[]);
        assert!(cost.is_complete());
    }
}
