use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::FinancialMetrics;

/// Share of revenue assumed to be cost of goods sold when estimating
/// inventory turnover. Statements rarely expose COGS in the fields we
/// extract, so `inventory_turnover` is an estimate, not an accounting identity.
pub const ESTIMATED_COGS_SHARE_OF_REVENUE: f64 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ratio {
    ProfitMargin,
    GrossMargin,
    OperatingMargin,
    Roa,
    Roe,
    CurrentRatio,
    QuickRatio,
    CashRatio,
    DebtToAssetRatio,
    DebtToEquityRatio,
    EquityMultiplier,
    InterestCoverage,
    AssetTurnover,
    InventoryTurnover,
    CashFlowToRevenue,
    FreeCashFlowMargin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioCategory {
    Profitability,
    Liquidity,
    Leverage,
    Efficiency,
    CashFlow,
}

impl RatioCategory {
    pub const ALL: [RatioCategory; 5] = [
        RatioCategory::Profitability,
        RatioCategory::Liquidity,
        RatioCategory::Leverage,
        RatioCategory::Efficiency,
        RatioCategory::CashFlow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RatioCategory::Profitability => "Profitability",
            RatioCategory::Liquidity => "Liquidity",
            RatioCategory::Leverage => "Leverage",
            RatioCategory::Efficiency => "Efficiency",
            RatioCategory::CashFlow => "Cash Flow",
        }
    }
}

impl Ratio {
    pub const ALL: [Ratio; 16] = [
        Ratio::ProfitMargin,
        Ratio::GrossMargin,
        Ratio::OperatingMargin,
        Ratio::Roa,
        Ratio::Roe,
        Ratio::CurrentRatio,
        Ratio::QuickRatio,
        Ratio::CashRatio,
        Ratio::DebtToAssetRatio,
        Ratio::DebtToEquityRatio,
        Ratio::EquityMultiplier,
        Ratio::InterestCoverage,
        Ratio::AssetTurnover,
        Ratio::InventoryTurnover,
        Ratio::CashFlowToRevenue,
        Ratio::FreeCashFlowMargin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ratio::ProfitMargin => "profit_margin",
            Ratio::GrossMargin => "gross_margin",
            Ratio::OperatingMargin => "operating_margin",
            Ratio::Roa => "roa",
            Ratio::Roe => "roe",
            Ratio::CurrentRatio => "current_ratio",
            Ratio::QuickRatio => "quick_ratio",
            Ratio::CashRatio => "cash_ratio",
            Ratio::DebtToAssetRatio => "debt_to_asset_ratio",
            Ratio::DebtToEquityRatio => "debt_to_equity_ratio",
            Ratio::EquityMultiplier => "equity_multiplier",
            Ratio::InterestCoverage => "interest_coverage",
            Ratio::AssetTurnover => "asset_turnover",
            Ratio::InventoryTurnover => "inventory_turnover",
            Ratio::CashFlowToRevenue => "cash_flow_to_revenue",
            Ratio::FreeCashFlowMargin => "free_cash_flow_margin",
        }
    }

    /// Display label used in reports and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Ratio::ProfitMargin => "Profit Margin (%)",
            Ratio::GrossMargin => "Gross Margin (%)",
            Ratio::OperatingMargin => "Operating Margin (%)",
            Ratio::Roa => "Return on Assets (%)",
            Ratio::Roe => "Return on Equity (%)",
            Ratio::CurrentRatio => "Current Ratio",
            Ratio::QuickRatio => "Quick Ratio",
            Ratio::CashRatio => "Cash Ratio",
            Ratio::DebtToAssetRatio => "Debt to Assets (%)",
            Ratio::DebtToEquityRatio => "Debt to Equity (%)",
            Ratio::EquityMultiplier => "Equity Multiplier",
            Ratio::InterestCoverage => "Interest Coverage",
            Ratio::AssetTurnover => "Asset Turnover",
            Ratio::InventoryTurnover => "Inventory Turnover (estimated)",
            Ratio::CashFlowToRevenue => "Operating Cash Flow to Revenue (%)",
            Ratio::FreeCashFlowMargin => "Free Cash Flow",
        }
    }

    pub fn category(&self) -> RatioCategory {
        match self {
            Ratio::ProfitMargin
            | Ratio::GrossMargin
            | Ratio::OperatingMargin
            | Ratio::Roa
            | Ratio::Roe => RatioCategory::Profitability,
            Ratio::CurrentRatio | Ratio::QuickRatio | Ratio::CashRatio => {
                RatioCategory::Liquidity
            }
            Ratio::DebtToAssetRatio
            | Ratio::DebtToEquityRatio
            | Ratio::EquityMultiplier
            | Ratio::InterestCoverage => RatioCategory::Leverage,
            Ratio::AssetTurnover | Ratio::InventoryTurnover => RatioCategory::Efficiency,
            Ratio::CashFlowToRevenue | Ratio::FreeCashFlowMargin => RatioCategory::CashFlow,
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ratios whose preconditions held. A missing key means "not computable",
/// never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatioSet(BTreeMap<Ratio, f64>);

impl RatioSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ratio: Ratio) -> Option<f64> {
        self.0.get(&ratio).copied()
    }

    pub fn contains(&self, ratio: Ratio) -> bool {
        self.0.contains_key(&ratio)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ratio, f64)> + '_ {
        self.0.iter().map(|(ratio, value)| (*ratio, *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, ratio: Ratio, value: f64) {
        if value.is_finite() {
            self.0.insert(ratio, value);
        }
    }
}

impl FromIterator<(Ratio, f64)> for RatioSet {
    fn from_iter<T: IntoIterator<Item = (Ratio, f64)>>(iter: T) -> Self {
        let mut set = RatioSet::new();
        for (ratio, value) in iter {
            set.insert(ratio, value);
        }
        set
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Computes every ratio whose inputs are known and whose denominator is
/// strictly positive.
pub fn calculate_ratios(metrics: &FinancialMetrics) -> RatioSet {
    let mut ratios = RatioSet::new();

    let revenue = positive(metrics.revenue);
    let total_assets = positive(metrics.total_assets);
    let equity = positive(metrics.equity);
    let current_liabilities = positive(metrics.current_liabilities);

    // Profitability
    if let Some(revenue) = revenue {
        if let Some(net_income) = metrics.net_income {
            ratios.insert(Ratio::ProfitMargin, net_income / revenue * 100.0);
        }
        if let Some(gross_profit) = metrics.gross_profit {
            ratios.insert(Ratio::GrossMargin, gross_profit / revenue * 100.0);
        }
        if let Some(operating_income) = metrics.operating_income {
            ratios.insert(Ratio::OperatingMargin, operating_income / revenue * 100.0);
        }
        if let Some(operating_cash_flow) = metrics.operating_cash_flow {
            ratios.insert(
                Ratio::CashFlowToRevenue,
                operating_cash_flow / revenue * 100.0,
            );
        }
    }

    if let (Some(net_income), Some(total_assets)) = (metrics.net_income, total_assets) {
        ratios.insert(Ratio::Roa, net_income / total_assets * 100.0);
    }
    if let (Some(net_income), Some(equity)) = (metrics.net_income, equity) {
        ratios.insert(Ratio::Roe, net_income / equity * 100.0);
    }

    // Liquidity
    if let Some(current_liabilities) = current_liabilities {
        if let Some(current_assets) = metrics.current_assets {
            ratios.insert(Ratio::CurrentRatio, current_assets / current_liabilities);

            let illiquid = metrics
                .inventory
                .or(metrics.accounts_receivable)
                .unwrap_or(0.0);
            ratios.insert(
                Ratio::QuickRatio,
                (current_assets - illiquid) / current_liabilities,
            );
        }
        if let Some(cash) = metrics.cash {
            ratios.insert(Ratio::CashRatio, cash / current_liabilities);
        }
    }

    // Leverage
    if let Some(total_liabilities) = metrics.total_liabilities {
        if let Some(total_assets) = total_assets {
            ratios.insert(
                Ratio::DebtToAssetRatio,
                total_liabilities / total_assets * 100.0,
            );
        }
        if let Some(equity) = equity {
            ratios.insert(
                Ratio::DebtToEquityRatio,
                total_liabilities / equity * 100.0,
            );
        }
    }
    if let (Some(total_assets), Some(equity)) = (metrics.total_assets, equity) {
        ratios.insert(Ratio::EquityMultiplier, total_assets / equity);
    }

    if let Some(interest_expense) = positive(metrics.interest_expense) {
        // Without operating income, net income + interest approximates EBIT
        // (taxes are ignored).
        let earnings = metrics
            .operating_income
            .or_else(|| metrics.net_income.map(|ni| ni + interest_expense));
        if let Some(earnings) = earnings {
            ratios.insert(Ratio::InterestCoverage, earnings / interest_expense);
        }
    }

    // Efficiency
    if let (Some(revenue), Some(total_assets)) = (metrics.revenue, total_assets) {
        ratios.insert(Ratio::AssetTurnover, revenue / total_assets);
    }
    if let (Some(revenue), Some(inventory)) = (metrics.revenue, positive(metrics.inventory)) {
        let estimated_cogs = revenue * ESTIMATED_COGS_SHARE_OF_REVENUE;
        ratios.insert(Ratio::InventoryTurnover, estimated_cogs / inventory);
    }

    if let Some(free_cash_flow) = metrics.free_cash_flow {
        ratios.insert(Ratio::FreeCashFlowMargin, free_cash_flow);
    }

    ratios
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample() -> FinancialMetrics {
        FinancialMetrics {
            revenue: Some(1_000_000.0),
            gross_profit: Some(400_000.0),
            operating_income: Some(150_000.0),
            net_income: Some(100_000.0),
            total_assets: Some(2_000_000.0),
            current_assets: Some(600_000.0),
            total_liabilities: Some(1_200_000.0),
            current_liabilities: Some(300_000.0),
            equity: Some(800_000.0),
            cash: Some(150_000.0),
            inventory: Some(100_000.0),
            accounts_receivable: Some(80_000.0),
            operating_cash_flow: Some(180_000.0),
            investing_cash_flow: Some(-60_000.0),
            free_cash_flow: Some(120_000.0),
            interest_expense: Some(25_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_ratio_set() {
        let ratios = calculate_ratios(&sample());

        assert_eq!(ratios.len(), Ratio::ALL.len());
        assert!(approx(ratios.get(Ratio::ProfitMargin).unwrap(), 10.0));
        assert!(approx(ratios.get(Ratio::GrossMargin).unwrap(), 40.0));
        assert!(approx(ratios.get(Ratio::OperatingMargin).unwrap(), 15.0));
        assert!(approx(ratios.get(Ratio::Roa).unwrap(), 5.0));
        assert!(approx(ratios.get(Ratio::Roe).unwrap(), 12.5));
        assert!(approx(ratios.get(Ratio::CurrentRatio).unwrap(), 2.0));
        assert!(approx(ratios.get(Ratio::QuickRatio).unwrap(), 500_000.0 / 300_000.0));
        assert!(approx(ratios.get(Ratio::CashRatio).unwrap(), 0.5));
        assert!(approx(ratios.get(Ratio::DebtToAssetRatio).unwrap(), 60.0));
        assert!(approx(ratios.get(Ratio::DebtToEquityRatio).unwrap(), 150.0));
        assert!(approx(ratios.get(Ratio::EquityMultiplier).unwrap(), 2.5));
        assert!(approx(ratios.get(Ratio::InterestCoverage).unwrap(), 6.0));
        assert!(approx(ratios.get(Ratio::AssetTurnover).unwrap(), 0.5));
        assert!(approx(ratios.get(Ratio::InventoryTurnover).unwrap(), 6.5));
        assert!(approx(ratios.get(Ratio::CashFlowToRevenue).unwrap(), 18.0));
        assert!(approx(ratios.get(Ratio::FreeCashFlowMargin).unwrap(), 120_000.0));
    }

    #[test]
    fn test_zero_total_assets_omits_asset_ratios() {
        let metrics = FinancialMetrics {
            total_assets: Some(0.0),
            revenue: Some(100.0),
            net_income: Some(10.0),
            total_liabilities: Some(50.0),
            ..Default::default()
        };
        let ratios = calculate_ratios(&metrics);

        assert!(!ratios.contains(Ratio::Roa));
        assert!(!ratios.contains(Ratio::AssetTurnover));
        assert!(!ratios.contains(Ratio::DebtToAssetRatio));
        assert!(ratios.contains(Ratio::ProfitMargin));
    }

    #[test]
    fn test_negative_equity_omits_equity_ratios() {
        let metrics = FinancialMetrics {
            net_income: Some(10.0),
            total_assets: Some(100.0),
            total_liabilities: Some(120.0),
            equity: Some(-20.0),
            ..Default::default()
        };
        let ratios = calculate_ratios(&metrics);

        assert!(!ratios.contains(Ratio::Roe));
        assert!(!ratios.contains(Ratio::DebtToEquityRatio));
        assert!(!ratios.contains(Ratio::EquityMultiplier));
    }

    #[test]
    fn test_quick_ratio_fallbacks() {
        let mut metrics = FinancialMetrics {
            current_assets: Some(500.0),
            current_liabilities: Some(250.0),
            accounts_receivable: Some(100.0),
            ..Default::default()
        };
        assert!(approx(
            calculate_ratios(&metrics).get(Ratio::QuickRatio).unwrap(),
            1.6
        ));

        metrics.accounts_receivable = None;
        assert!(approx(
            calculate_ratios(&metrics).get(Ratio::QuickRatio).unwrap(),
            2.0
        ));
    }

    #[test]
    fn test_interest_coverage_fallback() {
        let metrics = FinancialMetrics {
            net_income: Some(30.0),
            interest_expense: Some(10.0),
            ..Default::default()
        };
        assert!(approx(
            calculate_ratios(&metrics)
                .get(Ratio::InterestCoverage)
                .unwrap(),
            4.0
        ));

        let no_interest = FinancialMetrics {
            operating_income: Some(30.0),
            interest_expense: Some(0.0),
            ..Default::default()
        };
        assert!(!calculate_ratios(&no_interest).contains(Ratio::InterestCoverage));
    }

    #[test]
    fn test_empty_metrics_produce_no_ratios() {
        assert!(calculate_ratios(&FinancialMetrics::empty()).is_empty());
    }

    #[test]
    fn test_ratio_set_serializes_as_map() {
        let ratios: RatioSet = vec![(Ratio::Roe, 12.0), (Ratio::ProfitMargin, 8.0)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&ratios).unwrap();
        assert_eq!(json, r#"{"profit_margin":8.0,"roe":12.0}"#);

        let back: RatioSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ratios);
    }
}
