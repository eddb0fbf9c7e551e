use crate::nutrition::{Indicators, NutritionFacts, NutritionTable};
use inference::DetectionSnapshot;

/// Everything the renderer needs to draw the nutrition panel.
///
/// Owned by the frame loop and handed to the renderer by reference; nothing
/// here is global.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationState {
    pub shown: bool,
    /// `"<food> : (<score>%)"`
    pub title: String,
    /// One line per nutrient.
    pub facts_text: String,
    pub indicators: Option<Indicators>,
    /// Label the model produced for the primary detection.
    pub detected_label: Option<String>,
    /// Table entry actually displayed; differs from the detected label when
    /// the default entry was used.
    pub nutrition_key: Option<String>,
    pub score_percent: u32,
    sequence: u64,
}

impl PresentationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from a published snapshot. Returns true when the panel changed.
    ///
    /// Snapshots already applied and snapshots without detections leave the
    /// panel as it is.
    pub fn apply(&mut self, snapshot: &DetectionSnapshot, table: &NutritionTable) -> bool {
        if snapshot.sequence <= self.sequence && self.shown {
            return false;
        }
        self.sequence = snapshot.sequence;

        let Some(primary) = snapshot.primary() else {
            tracing::debug!(sequence = snapshot.sequence, "No detections, panel unchanged");
            return false;
        };

        let (key, facts) = table.resolve(&primary.label);
        // Truncated, never rounded up
        let score_percent = (primary.score * 100.0) as u32;

        self.shown = true;
        self.title = format!("{key} : ({score_percent}%)");
        self.facts_text = facts_text(facts);
        self.indicators = Some(facts.indicators);
        self.detected_label = Some(primary.label.clone());
        self.nutrition_key = Some(key.to_string());
        self.score_percent = score_percent;

        tracing::debug!(
            sequence = snapshot.sequence,
            label = %primary.label,
            nutrition_key = key,
            score_percent,
            "Panel updated"
        );
        true
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

pub fn facts_text(facts: &NutritionFacts) -> String {
    format!(
        "Calories     {}\nSaturated Fat   {}g\nTrans Fat   {}g\nSodium      {}mg\nProtein  {}g\n",
        facts.calories, facts.saturated_fat_g, facts.trans_fat_g, facts.sodium_mg, facts.protein_g
    )
}
