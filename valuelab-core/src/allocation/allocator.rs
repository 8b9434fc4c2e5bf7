//! Proportional allocation with a per-instrument floor.
//!
//! Each eligible instrument receives `score / sum(scores) * budget`. Anything
//! under `budget * min_pct` is raised to the floor and the shortfall is taken
//! proportionally from the instruments still above it, repeating until no
//! unfloored instrument falls below the floor. The total always equals the
//! budget unless the floors alone exceed it (`BudgetShortfall`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Instrument;

/// Relative tolerance used when comparing allocated totals to the budget.
pub const BUDGET_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    #[error("budget must be finite and > 0, got {0}")]
    NonPositiveBudget(f64),

    #[error("minimum allocation fraction must be within [0, 1], got {0}")]
    InvalidFloor(f64),

    #[error("{instrument}: score {score} is not a finite non-negative number")]
    InvalidScore { instrument: Instrument, score: f64 },

    #[error("{0} appears more than once in the score set")]
    DuplicateInstrument(Instrument),
}

/// Budget and floor for one period's allocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub monthly_budget: f64,
    /// Fraction of the budget (0.05 = 5%) every eligible instrument receives at least.
    pub minimum_allocation_pct: f64,
}

impl AllocationConfig {
    pub fn validate(&self) -> Result<(), AllocationError> {
        if !self.monthly_budget.is_finite() || self.monthly_budget <= 0.0 {
            return Err(AllocationError::NonPositiveBudget(self.monthly_budget));
        }
        if !(0.0..=1.0).contains(&self.minimum_allocation_pct) {
            return Err(AllocationError::InvalidFloor(self.minimum_allocation_pct));
        }
        Ok(())
    }

    pub fn floor_amount(&self) -> f64 {
        self.monthly_budget * self.minimum_allocation_pct
    }
}

/// Instrument → currency amount for one period. Iteration order is by
/// instrument and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationMap {
    amounts: BTreeMap<Instrument, f64>,
}

impl AllocationMap {
    pub fn get(&self, instrument: &Instrument) -> Option<f64> {
        self.amounts.get(instrument).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Instrument, f64)> {
        self.amounts.iter().map(|(i, a)| (i, *a))
    }

    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

/// Floors alone exceeded the budget; only the top-scored instruments were funded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetShortfall {
    pub budget: f64,
    pub floor_amount: f64,
    pub eligible: usize,
    pub funded: usize,
    /// Unfunded instruments, highest score first.
    pub excluded: Vec<Instrument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub map: AllocationMap,
    pub shortfall: Option<BudgetShortfall>,
}

impl Allocation {
    pub fn is_budget_insufficient(&self) -> bool {
        self.shortfall.is_some()
    }
}

/// Allocate `budget` across `scores` with a floor of `budget * min_pct` each.
///
/// - all scores zero ⇒ equal weights
/// - `n * floor > budget` ⇒ floor to the top `budget / floor` instruments by
///   score (ties keep input order), the rest excluded and reported
/// - every returned amount is non-negative
pub fn allocate(
    scores: &[(Instrument, f64)],
    budget: f64,
    min_pct: f64,
) -> Result<Allocation, AllocationError> {
    AllocationConfig { monthly_budget: budget, minimum_allocation_pct: min_pct }.validate()?;

    let mut seen = std::collections::HashSet::with_capacity(scores.len());
    for (instrument, score) in scores {
        if !score.is_finite() || *score < 0.0 {
            return Err(AllocationError::InvalidScore {
                instrument: instrument.clone(),
                score: *score,
            });
        }
        if !seen.insert(instrument) {
            return Err(AllocationError::DuplicateInstrument(instrument.clone()));
        }
    }

    let n = scores.len();
    if n == 0 {
        return Ok(Allocation::default());
    }

    let floor = budget * min_pct;
    if floor * n as f64 > budget * (1.0 + BUDGET_TOLERANCE) {
        return Ok(fund_top_by_score(scores, budget, floor));
    }

    let mut amounts = vec![0.0_f64; n];
    let mut floored = vec![false; n];
    loop {
        let free: Vec<usize> = (0..n).filter(|&i| !floored[i]).collect();
        if free.is_empty() {
            break;
        }
        let free_budget = budget - floor * (n - free.len()) as f64;
        let free_sum: f64 = free.iter().map(|&i| scores[i].1).sum();

        if free_sum <= 0.0 {
            // No score information left: split what remains evenly.
            let each = free_budget / free.len() as f64;
            for &i in &free {
                amounts[i] = each;
            }
            break;
        }

        let mut raised = false;
        for &i in &free {
            let raw = scores[i].1 / free_sum * free_budget;
            if raw < floor {
                floored[i] = true;
                raised = true;
            } else {
                amounts[i] = raw;
            }
        }
        if !raised {
            break;
        }
    }
    for (i, is_floored) in floored.iter().enumerate() {
        if *is_floored {
            amounts[i] = floor;
        }
    }

    let amounts = scores
        .iter()
        .zip(amounts)
        .map(|((instrument, _), amount)| (instrument.clone(), amount.max(0.0)))
        .collect();
    Ok(Allocation { map: AllocationMap { amounts }, shortfall: None })
}

fn fund_top_by_score(scores: &[(Instrument, f64)], budget: f64, floor: f64) -> Allocation {
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    // stable: equal scores keep input order
    ranked.sort_by(|&a, &b| scores[b].1.total_cmp(&scores[a].1));

    let fundable = ((budget / floor) * (1.0 + BUDGET_TOLERANCE)).floor() as usize;
    let funded = fundable.min(scores.len());

    let amounts = ranked[..funded]
        .iter()
        .map(|&i| (scores[i].0.clone(), floor))
        .collect();
    let excluded: Vec<Instrument> = ranked[funded..].iter().map(|&i| scores[i].0.clone()).collect();

    tracing::warn!(
        budget,
        floor,
        eligible = scores.len(),
        funded,
        excluded = excluded.len(),
        "budget insufficient for allocation floors"
    );

    Allocation {
        map: AllocationMap { amounts },
        shortfall: Some(BudgetShortfall {
            budget,
            floor_amount: floor,
            eligible: scores.len(),
            funded,
            excluded,
        }),
    }
}
