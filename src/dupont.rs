use serde::{Deserialize, Serialize};

use crate::ratios::{Ratio, RatioSet};

/// ROE = profit margin × asset turnover × equity multiplier.
///
/// `calculated_roe` is only present when all three factors are; it can differ
/// from the reported `roe` when the inputs came from independently extracted
/// figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DupontAnalysis {
    pub roe: Option<f64>,
    pub profit_margin: Option<f64>,
    pub asset_turnover: Option<f64>,
    pub equity_multiplier: Option<f64>,
    pub calculated_roe: Option<f64>,
}

impl DupontAnalysis {
    pub fn from_ratios(ratios: &RatioSet) -> Self {
        let profit_margin = ratios.get(Ratio::ProfitMargin);
        let asset_turnover = ratios.get(Ratio::AssetTurnover);
        let equity_multiplier = ratios.get(Ratio::EquityMultiplier);

        let calculated_roe = match (profit_margin, asset_turnover, equity_multiplier) {
            (Some(pm), Some(at), Some(em)) => Some((pm / 100.0) * at * em * 100.0),
            _ => None,
        };

        Self {
            roe: ratios.get(Ratio::Roe),
            profit_margin,
            asset_turnover,
            equity_multiplier,
            calculated_roe,
        }
    }

    /// Difference between the decomposed and the reported ROE.
    pub fn discrepancy(&self) -> Option<f64> {
        Some(self.calculated_roe? - self.roe?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratios::calculate_ratios;
    use crate::schema::FinancialMetrics;

    #[test]
    fn test_decomposition_matches_roe() {
        let metrics = FinancialMetrics {
            revenue: Some(500_000.0),
            net_income: Some(50_000.0),
            total_assets: Some(1_000_000.0),
            equity: Some(400_000.0),
            ..Default::default()
        };
        let ratios = calculate_ratios(&metrics);
        let dupont = DupontAnalysis::from_ratios(&ratios);

        assert_eq!(dupont.profit_margin, Some(10.0));
        assert_eq!(dupont.asset_turnover, Some(0.5));
        assert_eq!(dupont.equity_multiplier, Some(2.5));
        let roe = dupont.roe.unwrap();
        let calculated = dupont.calculated_roe.unwrap();
        assert!((roe - 12.5).abs() < 1e-9);
        assert!((calculated - roe).abs() < 1e-9);
        assert!(dupont.discrepancy().unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_missing_factor_skips_recalculation() {
        let ratios: RatioSet = vec![(Ratio::Roe, 12.0), (Ratio::ProfitMargin, 8.0)]
            .into_iter()
            .collect();
        let dupont = DupontAnalysis::from_ratios(&ratios);

        assert_eq!(dupont.roe, Some(12.0));
        assert_eq!(dupont.profit_margin, Some(8.0));
        assert_eq!(dupont.asset_turnover, None);
        assert_eq!(dupont.calculated_roe, None);
        assert_eq!(dupont.discrepancy(), None);
    }
}
