//! Avoidance statistics per wind category, mergeable across cycles.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::FlightClassification;
use crate::decision::ComplianceLabel;
use crate::wind::WindCategory;

/// Counts for one wind category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub total: u32,
    pub avoiding: u32,
    pub in_weather: u32,
}

impl CategoryStats {
    pub fn avoiding_pct(&self) -> f64 {
        pct(self.avoiding, self.total)
    }

    pub fn in_weather_pct(&self) -> f64 {
        pct(self.in_weather, self.total)
    }

    fn merge(&mut self, other: &CategoryStats) {
        self.total += other.total;
        self.avoiding += other.avoiding;
        self.in_weather += other.in_weather;
    }
}

fn pct(n: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 / total as f64 * 100.0
    }
}

/// One row of the per-category summary, with percentages filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindCategoryRow {
    pub category: WindCategory,
    pub total: u32,
    pub avoiding: u32,
    pub in_weather: u32,
    pub avoiding_pct: f64,
    pub in_weather_pct: f64,
}

/// Aggregated counts over one or more cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvoidanceStats {
    pub cycles: u32,
    pub flights: u32,
    pub by_wind: BTreeMap<WindCategory, CategoryStats>,
    pub by_compliance: BTreeMap<ComplianceLabel, u32>,
}

impl AvoidanceStats {
    /// Stats for a single cycle.
    pub fn from_cycle(classifications: &[FlightClassification]) -> Self {
        let mut stats = AvoidanceStats {
            cycles: 1,
            ..Default::default()
        };
        for c in classifications {
            stats.record(c);
        }
        stats
    }

    pub fn record(&mut self, c: &FlightClassification) {
        self.flights += 1;
        let entry = self.by_wind.entry(c.wind_category).or_default();
        entry.total += 1;
        if c.is_avoiding() {
            entry.avoiding += 1;
        }
        if c.weather.in_weather {
            entry.in_weather += 1;
        }
        *self.by_compliance.entry(c.compliance).or_default() += 1;
    }

    /// Fold another report into this one (cumulative report).
    pub fn merge(&mut self, other: &AvoidanceStats) {
        self.cycles += other.cycles;
        self.flights += other.flights;
        for (cat, s) in &other.by_wind {
            self.by_wind.entry(*cat).or_default().merge(s);
        }
        for (label, n) in &other.by_compliance {
            *self.by_compliance.entry(*label).or_default() += n;
        }
    }

    pub fn category(&self, cat: WindCategory) -> CategoryStats {
        self.by_wind.get(&cat).copied().unwrap_or_default()
    }

    pub fn compliance_count(&self, label: ComplianceLabel) -> u32 {
        self.by_compliance.get(&label).copied().unwrap_or(0)
    }

    /// One row per wind category, including empty ones.
    pub fn rows(&self) -> Vec<WindCategoryRow> {
        WindCategory::ALL
            .iter()
            .map(|cat| {
                let s = self.category(*cat);
                WindCategoryRow {
                    category: *cat,
                    total: s.total,
                    avoiding: s.avoiding,
                    in_weather: s.in_weather,
                    avoiding_pct: s.avoiding_pct(),
                    in_weather_pct: s.in_weather_pct(),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
