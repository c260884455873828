use serde::{Deserialize, Serialize};

use crate::error::{LinkRankError, Result};

pub const DEFAULT_DAMPING: f64 = 0.85;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 1e-9;
pub const DEFAULT_LAMBDA: f64 = 0.5;
pub const DEFAULT_PAGERANK_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    /// Probability of following an out-link instead of teleporting.
    pub damping: f64,
    pub max_iterations: usize,
    /// Stop once the L1 distance between successive vectors drops below this.
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self { damping: DEFAULT_DAMPING, max_iterations: DEFAULT_MAX_ITERATIONS, tolerance: DEFAULT_TOLERANCE }
    }
}

impl PageRankConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(LinkRankError::config(format!("damping must be in (0,1), got {}", self.damping)));
        }
        if self.max_iterations == 0 {
            return Err(LinkRankError::config("max_iterations must be positive"));
        }
        if !(self.tolerance > 0.0) {
            return Err(LinkRankError::config(format!("tolerance must be positive, got {}", self.tolerance)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Jelinek-Mercer weight on the document model; the rest goes to the corpus model.
    pub lambda: f64,
    /// Weight of ln(pagerank) in the comprehensive ranker.
    pub pagerank_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { lambda: DEFAULT_LAMBDA, pagerank_weight: DEFAULT_PAGERANK_WEIGHT }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.lambda > 0.0 && self.lambda < 1.0) {
            return Err(LinkRankError::config(format!("lambda must be in (0,1), got {}", self.lambda)));
        }
        if !self.pagerank_weight.is_finite() {
            return Err(LinkRankError::config("pagerank_weight must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PageRankConfig::default().validate().is_ok());
        assert!(RankingConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let pr = PageRankConfig { damping: 1.0, ..Default::default() };
        assert!(matches!(pr.validate(), Err(LinkRankError::Config(_))));
        let pr = PageRankConfig { max_iterations: 0, ..Default::default() };
        assert!(pr.validate().is_err());
        let pr = PageRankConfig { tolerance: 0.0, ..Default::default() };
        assert!(pr.validate().is_err());
        let rc = RankingConfig { lambda: 0.0, ..Default::default() };
        assert!(rc.validate().is_err());
    }
}
