//! Threshold rules over the ratio set and raw metrics.
//!
//! Rule groups are independent; inside a group tiers are checked from most to
//! least severe and only the first matching tier fires.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ratios::{Ratio, RatioSet};
use crate::schema::FinancialMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => f.write_str("High"),
            Severity::Medium => f.write_str("Medium"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskType {
    #[serde(rename = "Loss Risk")]
    Loss,
    #[serde(rename = "Profitability Risk")]
    Profitability,
    #[serde(rename = "Asset Efficiency Risk")]
    AssetEfficiency,
    #[serde(rename = "Shareholder Value Risk")]
    ShareholderValue,
    #[serde(rename = "Liquidity Risk")]
    Liquidity,
    #[serde(rename = "Leverage Risk")]
    Leverage,
    #[serde(rename = "Solvency Risk")]
    Solvency,
    #[serde(rename = "Cash Flow Risk")]
    CashFlow,
}

impl RiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskType::Loss => "Loss Risk",
            RiskType::Profitability => "Profitability Risk",
            RiskType::AssetEfficiency => "Asset Efficiency Risk",
            RiskType::ShareholderValue => "Shareholder Value Risk",
            RiskType::Liquidity => "Liquidity Risk",
            RiskType::Leverage => "Leverage Risk",
            RiskType::Solvency => "Solvency Risk",
            RiskType::CashFlow => "Cash Flow Risk",
        }
    }
}

impl fmt::Display for RiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub severity: Severity,
    pub description: String,
}

impl Risk {
    fn new(risk_type: RiskType, severity: Severity, description: String) -> Self {
        Self {
            risk_type,
            severity,
            description,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Breach {
    Below(f64),
    Above(f64),
}

impl Breach {
    fn holds(self, value: f64) -> bool {
        match self {
            Breach::Below(limit) => value < limit,
            Breach::Above(limit) => value > limit,
        }
    }
}

struct Tier {
    breach: Breach,
    severity: Severity,
    risk_type: RiskType,
    describe: fn(f64) -> String,
}

struct RatioRule {
    ratio: Ratio,
    tiers: &'static [Tier],
}

static RATIO_RULES: &[RatioRule] = &[
    RatioRule {
        ratio: Ratio::ProfitMargin,
        tiers: &[
            Tier {
                breach: Breach::Below(0.0),
                severity: Severity::High,
                risk_type: RiskType::Loss,
                describe: |v| format!("Profit margin is negative at {:.2}%, the company is operating at a loss", v),
            },
            Tier {
                breach: Breach::Below(3.0),
                severity: Severity::High,
                risk_type: RiskType::Profitability,
                describe: |v| format!("Profit margin of {:.2}% is below 3%, indicating very thin profitability", v),
            },
            Tier {
                breach: Breach::Below(5.0),
                severity: Severity::Medium,
                risk_type: RiskType::Profitability,
                describe: |v| format!("Profit margin of {:.2}% is below 5%, indicating low profitability", v),
            },
        ],
    },
    RatioRule {
        ratio: Ratio::Roa,
        tiers: &[
            Tier {
                breach: Breach::Below(0.0),
                severity: Severity::High,
                risk_type: RiskType::AssetEfficiency,
                describe: |v| format!("Return on assets is negative at {:.2}%, assets are destroying value", v),
            },
            Tier {
                breach: Breach::Below(2.0),
                severity: Severity::Medium,
                risk_type: RiskType::AssetEfficiency,
                describe: |v| format!("Return on assets of {:.2}% is below 2%, indicating poor asset utilization", v),
            },
        ],
    },
    RatioRule {
        ratio: Ratio::Roe,
        tiers: &[
            Tier {
                breach: Breach::Below(0.0),
                severity: Severity::High,
                risk_type: RiskType::ShareholderValue,
                describe: |v| format!("Return on equity is negative at {:.2}%, shareholder value is eroding", v),
            },
            Tier {
                breach: Breach::Below(5.0),
                severity: Severity::Medium,
                risk_type: RiskType::ShareholderValue,
                describe: |v| format!("Return on equity of {:.2}% is below 5%, indicating weak returns to shareholders", v),
            },
        ],
    },
    RatioRule {
        ratio: Ratio::CurrentRatio,
        tiers: &[
            Tier {
                breach: Breach::Below(1.0),
                severity: Severity::High,
                risk_type: RiskType::Liquidity,
                describe: |v| format!("Current ratio of {:.2} is below 1.0, current liabilities exceed current assets", v),
            },
            Tier {
                breach: Breach::Below(1.5),
                severity: Severity::Medium,
                risk_type: RiskType::Liquidity,
                describe: |v| format!("Current ratio of {:.2} is below 1.5, leaving a thin short-term buffer", v),
            },
        ],
    },
    RatioRule {
        ratio: Ratio::QuickRatio,
        tiers: &[
            Tier {
                breach: Breach::Below(0.5),
                severity: Severity::High,
                risk_type: RiskType::Liquidity,
                describe: |v| format!("Quick ratio of {:.2} is below 0.5, liquid assets cannot cover short-term obligations", v),
            },
            Tier {
                breach: Breach::Below(1.0),
                severity: Severity::Medium,
                risk_type: RiskType::Liquidity,
                describe: |v| format!("Quick ratio of {:.2} is below 1.0, relying on inventory or receivables to meet obligations", v),
            },
        ],
    },
    RatioRule {
        ratio: Ratio::DebtToAssetRatio,
        tiers: &[
            Tier {
                breach: Breach::Above(70.0),
                severity: Severity::High,
                risk_type: RiskType::Leverage,
                describe: |v| format!("Debt-to-asset ratio of {:.2}% exceeds 70%, indicating very high leverage", v),
            },
            Tier {
                breach: Breach::Above(60.0),
                severity: Severity::Medium,
                risk_type: RiskType::Leverage,
                describe: |v| format!("Debt-to-asset ratio of {:.2}% exceeds 60%, indicating high leverage", v),
            },
        ],
    },
    RatioRule {
        ratio: Ratio::DebtToEquityRatio,
        tiers: &[
            Tier {
                breach: Breach::Above(200.0),
                severity: Severity::High,
                risk_type: RiskType::Leverage,
                describe: |v| format!("Debt-to-equity ratio of {:.2}% exceeds 200%, liabilities are more than twice equity", v),
            },
            Tier {
                breach: Breach::Above(100.0),
                severity: Severity::Medium,
                risk_type: RiskType::Leverage,
                describe: |v| format!("Debt-to-equity ratio of {:.2}% exceeds 100%, liabilities exceed equity", v),
            },
        ],
    },
    RatioRule {
        ratio: Ratio::InterestCoverage,
        tiers: &[
            Tier {
                breach: Breach::Below(1.0),
                severity: Severity::High,
                risk_type: RiskType::Solvency,
                describe: |v| format!("Interest coverage of {:.2}x is below 1.0, earnings do not cover interest payments", v),
            },
            Tier {
                breach: Breach::Below(2.0),
                severity: Severity::Medium,
                risk_type: RiskType::Solvency,
                describe: |v| format!("Interest coverage of {:.2}x is below 2.0, leaving little room to service debt", v),
            },
        ],
    },
];

// Rule groups that run after the net-income loss check.
const AFTER_LOSS_CHECK: usize = 1;

fn apply_rule(rule: &RatioRule, ratios: &RatioSet, risks: &mut Vec<Risk>) {
    let Some(value) = ratios.get(rule.ratio) else {
        return;
    };
    if let Some(tier) = rule.tiers.iter().find(|tier| tier.breach.holds(value)) {
        risks.push(Risk::new(tier.risk_type, tier.severity, (tier.describe)(value)));
    }
}

/// Evaluates every rule group and returns the risks in rule order.
pub fn assess_risks(metrics: &FinancialMetrics, ratios: &RatioSet) -> Vec<Risk> {
    let mut risks = Vec::new();
    let (profitability, rest) = RATIO_RULES.split_at(AFTER_LOSS_CHECK);

    for rule in profitability {
        apply_rule(rule, ratios, &mut risks);
    }

    if let Some(net_income) = metrics.net_income.filter(|ni| *ni < 0.0) {
        let already_flagged = risks
            .iter()
            .any(|risk| risk.risk_type == RiskType::Loss);
        if !already_flagged {
            risks.push(Risk::new(
                RiskType::Loss,
                Severity::High,
                format!("Company is reporting a net loss of {:.2}", net_income),
            ));
        }
    }

    for rule in rest {
        apply_rule(rule, ratios, &mut risks);
    }

    if let Some(operating) = metrics.operating_cash_flow.filter(|v| *v < 0.0) {
        risks.push(Risk::new(
            RiskType::CashFlow,
            Severity::High,
            format!(
                "Operating cash flow is negative at {:.2}, core operations are consuming cash",
                operating
            ),
        ));
    }
    if let Some(free) = metrics.free_cash_flow.filter(|v| *v < 0.0) {
        risks.push(Risk::new(
            RiskType::CashFlow,
            Severity::Medium,
            format!(
                "Free cash flow is negative at {:.2}, investment spending exceeds operating cash generation",
                free
            ),
        ));
    }

    risks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratios(pairs: &[(Ratio, f64)]) -> RatioSet {
        pairs.iter().copied().collect()
    }

    fn of_type(risks: &[Risk], risk_type: RiskType) -> Vec<&Risk> {
        risks.iter().filter(|r| r.risk_type == risk_type).collect()
    }

    #[test]
    fn test_leverage_boundary_is_strict() {
        let metrics = FinancialMetrics {
            net_income: Some(100_000.0),
            ..Default::default()
        };

        let at_limit = assess_risks(&metrics, &ratios(&[(Ratio::DebtToAssetRatio, 70.0)]));
        let leverage = of_type(&at_limit, RiskType::Leverage);
        assert_eq!(leverage.len(), 1);
        assert_eq!(leverage[0].severity, Severity::Medium);

        let above = assess_risks(&metrics, &ratios(&[(Ratio::DebtToAssetRatio, 70.5)]));
        let leverage = of_type(&above, RiskType::Leverage);
        assert_eq!(leverage.len(), 1);
        assert_eq!(leverage[0].severity, Severity::High);
        assert!(leverage[0].description.contains("70.50"));

        assert!(assess_risks(&metrics, &ratios(&[(Ratio::DebtToAssetRatio, 60.0)])).is_empty());
    }

    #[test]
    fn test_profit_margin_tiers() {
        let metrics = FinancialMetrics::empty();
        let cases = [
            (-1.0, RiskType::Loss, Severity::High),
            (2.0, RiskType::Profitability, Severity::High),
            (4.0, RiskType::Profitability, Severity::Medium),
        ];
        for (margin, risk_type, severity) in cases {
            let risks = assess_risks(&metrics, &ratios(&[(Ratio::ProfitMargin, margin)]));
            assert_eq!(risks.len(), 1, "margin {}", margin);
            assert_eq!(risks[0].risk_type, risk_type);
            assert_eq!(risks[0].severity, severity);
        }
        assert!(assess_risks(&metrics, &ratios(&[(Ratio::ProfitMargin, 5.0)])).is_empty());
    }

    #[test]
    fn test_net_loss_not_duplicated() {
        let metrics = FinancialMetrics {
            net_income: Some(-500.0),
            ..Default::default()
        };

        let with_margin = assess_risks(&metrics, &ratios(&[(Ratio::ProfitMargin, -5.0)]));
        assert_eq!(of_type(&with_margin, RiskType::Loss).len(), 1);

        let without_margin = assess_risks(&metrics, &RatioSet::new());
        let loss = of_type(&without_margin, RiskType::Loss);
        assert_eq!(loss.len(), 1);
        assert!(loss[0].description.contains("-500.00"));
    }

    #[test]
    fn test_cash_flow_risks_co_occur() {
        let metrics = FinancialMetrics {
            operating_cash_flow: Some(-10.0),
            free_cash_flow: Some(-40.0),
            ..Default::default()
        };
        let risks = assess_risks(&metrics, &RatioSet::new());
        let cash = of_type(&risks, RiskType::CashFlow);

        assert_eq!(cash.len(), 2);
        assert_eq!(cash[0].severity, Severity::High);
        assert_eq!(cash[1].severity, Severity::Medium);
    }

    #[test]
    fn test_solvency_only_when_coverage_present() {
        let metrics = FinancialMetrics::empty();
        assert!(assess_risks(&metrics, &RatioSet::new()).is_empty());

        let risks = assess_risks(&metrics, &ratios(&[(Ratio::InterestCoverage, 1.5)]));
        assert_eq!(risks[0].risk_type, RiskType::Solvency);
        assert_eq!(risks[0].severity, Severity::Medium);
    }

    #[test]
    fn test_groups_are_independent() {
        let risks = assess_risks(
            &FinancialMetrics::empty(),
            &ratios(&[
                (Ratio::CurrentRatio, 0.8),
                (Ratio::QuickRatio, 0.4),
                (Ratio::DebtToEquityRatio, 250.0),
                (Ratio::Roe, 3.0),
            ]),
        );
        let types: Vec<_> = risks.iter().map(|r| (r.risk_type, r.severity)).collect();
        assert_eq!(
            types,
            vec![
                (RiskType::ShareholderValue, Severity::Medium),
                (RiskType::Liquidity, Severity::High),
                (RiskType::Liquidity, Severity::High),
                (RiskType::Leverage, Severity::High),
            ]
        );
    }

    #[test]
    fn test_risk_serialization() {
        let risk = Risk::new(RiskType::CashFlow, Severity::High, "x".into());
        let json = serde_json::to_value(&risk).unwrap();
        assert_eq!(json["type"], "Cash Flow Risk");
        assert_eq!(json["severity"], "High");
    }
}
