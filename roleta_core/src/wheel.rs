use serde::{Deserialize, Serialize};

/// One slice of the wheel: a prize name and its relative weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrizeEntry {
    pub name: String,
    pub weight: f64,
}

/// Prize table problems. Checked once at startup; a wheel that fails
/// validation must never serve draws.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("prize wheel has no entries")]
    Empty,
    #[error("prize {name:?} has non-positive weight {weight}")]
    NonPositiveWeight { name: String, weight: f64 },
}

/// Ordered prize table. Order fixes slice placement on the rendered wheel;
/// selection probability depends only on the weights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrizeWheel(pub Vec<PrizeEntry>);

impl PrizeWheel {
    pub fn simple_default() -> Self {
        let entries = [
            ("Pick any menu item", 5.0),
            ("30 off your order", 10.0),
            ("10% off", 15.0),
            ("5% off", 15.0),
            ("3% off", 15.0),
            ("Free whipped cream", 10.0),
            ("Free boba pearls", 10.0),
            ("Free green tea", 10.0),
            ("Free Thai tea", 5.0),
            ("Free lemon tea", 5.0),
        ];
        Self(
            entries
                .into_iter()
                .map(|(name, weight)| PrizeEntry {
                    name: name.to_string(),
                    weight,
                })
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::Empty);
        }
        for entry in &self.0 {
            if !entry.weight.is_finite() || entry.weight <= 0.0 {
                return Err(ConfigError::NonPositiveWeight {
                    name: entry.name.clone(),
                    weight: entry.weight,
                });
            }
        }
        Ok(())
    }

    pub fn total_weight(&self) -> f64 {
        self.0.iter().map(|e| e.weight).sum()
    }

    /// Map a uniform draw in `[0, total_weight)` to a prize name.
    ///
    /// Each entry owns the half-open interval `[cumulative, cumulative +
    /// weight)`: the first entry whose cumulative weight exceeds the draw
    /// wins, so a draw landing exactly on a slice boundary selects the slice
    /// after it. If float accumulation leaves no match, the last entry is the
    /// defined fallback.
    pub fn pick(&self, draw: f64) -> &str {
        let mut cumulative = 0.0;
        for entry in &self.0 {
            cumulative += entry.weight;
            if draw < cumulative {
                return &entry.name;
            }
        }
        &self.0.last().expect("validated wheel has entries").name
    }
}
