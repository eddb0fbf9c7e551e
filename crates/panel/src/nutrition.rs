use crate::error::PanelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_FOOD: &str = "banana";

/// Panel indicator colour for one nutrient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Green,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicators {
    pub saturated_fat: Indicator,
    pub trans_fat: Indicator,
    pub sodium: Indicator,
}

impl Indicators {
    const fn new(saturated_fat: Indicator, trans_fat: Indicator, sodium: Indicator) -> Self {
        Self {
            saturated_fat,
            trans_fat,
            sodium,
        }
    }
}

/// Per-serving facts for one food label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f32,
    pub saturated_fat_g: f32,
    pub trans_fat_g: f32,
    pub sodium_mg: f32,
    pub protein_g: f32,
    pub indicators: Indicators,
}

impl NutritionFacts {
    /// `[calories, saturated fat, trans fat, sodium, protein]`
    pub fn values(&self) -> [f32; 5] {
        [
            self.calories,
            self.saturated_fat_g,
            self.trans_fat_g,
            self.sodium_mg,
            self.protein_g,
        ]
    }
}

/// Label to nutrition facts, with a fallback entry for labels it does not
/// know.
#[derive(Debug, Clone)]
pub struct NutritionTable {
    entries: BTreeMap<String, NutritionFacts>,
    default_key: String,
}

impl NutritionTable {
    /// The three reference foods, falling back to banana.
    pub fn builtin() -> Self {
        use Indicator::{Green, Red};

        let entries = [
            (
                "banana",
                [89.0, 0.2, 0.0, 1.0, 1.1],
                Indicators::new(Green, Green, Green),
            ),
            (
                "pizza",
                [266.0, 10.0, 0.2, 598.0, 11.0],
                Indicators::new(Red, Red, Red),
            ),
            (
                "donut",
                [452.0, 15.0, 9.0, 326.0, 4.9],
                Indicators::new(Red, Red, Green),
            ),
        ]
        .into_iter()
        .map(|(label, [cal, sat, trans, sodium, protein], indicators)| {
            (
                label.to_string(),
                NutritionFacts {
                    calories: cal,
                    saturated_fat_g: sat,
                    trans_fat_g: trans,
                    sodium_mg: sodium,
                    protein_g: protein,
                    indicators,
                },
            )
        })
        .collect();

        Self {
            entries,
            default_key: DEFAULT_FOOD.to_string(),
        }
    }

    pub fn from_entries(
        entries: BTreeMap<String, NutritionFacts>,
        default_key: &str,
    ) -> Result<Self, PanelError> {
        if !entries.contains_key(default_key) {
            return Err(PanelError::MissingDefault(default_key.to_string()));
        }
        Ok(Self {
            entries,
            default_key: default_key.to_string(),
        })
    }

    /// JSON object keyed by label, each value a [`NutritionFacts`].
    pub fn from_json(json: &str, default_key: &str) -> Result<Self, PanelError> {
        Self::from_entries(serde_json::from_str(json)?, default_key)
    }

    pub fn load(path: &Path, default_key: &str) -> Result<Self, PanelError> {
        let table = Self::from_json(&std::fs::read_to_string(path)?, default_key)?;
        tracing::info!(
            path = %path.display(),
            foods = table.entries.len(),
            default = default_key,
            "Loaded nutrition table"
        );
        Ok(table)
    }

    pub fn with_default(self, default_key: &str) -> Result<Self, PanelError> {
        Self::from_entries(self.entries, default_key)
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn get(&self, label: &str) -> Option<&NutritionFacts> {
        self.entries.get(label)
    }

    /// Facts for `label`, or for the default key when the label is unknown.
    /// Returns the key whose facts were used.
    pub fn resolve<'a>(&'a self, label: &'a str) -> (&'a str, &'a NutritionFacts) {
        if let Some(facts) = self.entries.get(label) {
            return (label, facts);
        }

        tracing::debug!(label, default = %self.default_key, "No nutrition entry, using default");
        let facts = &self.entries[&self.default_key];
        (self.default_key.as_str(), facts)
    }
}

impl Default for NutritionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banana_facts() {
        let table = NutritionTable::builtin();
        let (key, facts) = table.resolve("banana");

        assert_eq!(key, "banana");
        assert_eq!(facts.values(), [89.0, 0.2, 0.0, 1.0, 1.1]);
        assert_eq!(facts.indicators.sodium, Indicator::Green);
    }

    #[test]
    fn test_reference_indicators() {
        let table = NutritionTable::builtin();

        let pizza = table.get("pizza").unwrap();
        assert_eq!(pizza.values(), [266.0, 10.0, 0.2, 598.0, 11.0]);
        assert_eq!(
            pizza.indicators,
            Indicators::new(Indicator::Red, Indicator::Red, Indicator::Red)
        );

        let donut = table.get("donut").unwrap();
        assert_eq!(donut.values(), [452.0, 15.0, 9.0, 326.0, 4.9]);
        assert_eq!(donut.indicators.trans_fat, Indicator::Red);
        assert_eq!(donut.indicators.sodium, Indicator::Green);
    }

    #[test]
    fn test_unknown_label_falls_back_to_default() {
        let table = NutritionTable::builtin();
        let (key, facts) = table.resolve("kiwi");

        assert_eq!(key, "banana");
        assert_eq!(facts, table.get("banana").unwrap());
    }

    #[test]
    fn test_default_is_configurable() {
        let table = NutritionTable::builtin().with_default("pizza").unwrap();
        assert_eq!(table.resolve("kiwi").0, "pizza");
        assert_eq!(table.resolve("donut").0, "donut", "Known labels are unaffected");
    }

    #[test]
    fn test_default_must_exist() {
        assert!(matches!(
            NutritionTable::builtin().with_default("kiwi"),
            Err(PanelError::MissingDefault(key)) if key == "kiwi"
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "apple": {
                "calories": 52, "saturated_fat_g": 0, "trans_fat_g": 0,
                "sodium_mg": 1, "protein_g": 0.3,
                "indicators": {"saturated_fat": "green", "trans_fat": "green", "sodium": "green"}
            }
        }"#;

        let table = NutritionTable::from_json(json, "apple").unwrap();
        assert_eq!(table.resolve("pear").1.calories, 52.0);
        assert!(matches!(
            NutritionTable::from_json("{", "apple"),
            Err(PanelError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nutrition.json");
        let banana = *NutritionTable::builtin().get("banana").unwrap();
        let entries = BTreeMap::from([("banana".to_string(), banana)]);
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let table = NutritionTable::load(&path, "banana").unwrap();
        assert!(table.contains("banana"));
        assert!(!table.contains("pizza"));
    }
}
