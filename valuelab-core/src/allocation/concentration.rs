use serde::{Deserialize, Serialize};

use super::AllocationMap;

/// How concentrated an allocation is, measured on budget weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    /// Herfindahl-Hirschman index: sum of squared weights (1/n … 1).
    pub herfindahl_index: f64,
    pub max_weight: f64,
    pub top3_weight: f64,
}

impl Concentration {
    pub fn of(map: &AllocationMap) -> Self {
        let total = map.total();
        if map.is_empty() || total <= 0.0 {
            return Self::default();
        }
        let mut weights: Vec<f64> = map.iter().map(|(_, a)| a / total).collect();
        weights.sort_by(|a, b| b.total_cmp(a));
        Self {
            herfindahl_index: weights.iter().map(|w| w * w).sum(),
            max_weight: weights[0],
            top3_weight: weights.iter().take(3).sum(),
        }
    }
}
