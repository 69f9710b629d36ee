use log::debug;
use serde::{Deserialize, Serialize};

use crate::schema::FinancialMetrics;
use crate::utils::round2;

/// One period's metrics, oldest first when passed in a sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub label: Option<String>,
    pub metrics: FinancialMetrics,
}

impl PeriodMetrics {
    pub fn new(label: impl Into<String>, metrics: FinancialMetrics) -> Self {
        Self {
            label: Some(label.into()),
            metrics,
        }
    }

    pub fn unlabeled(metrics: FinancialMetrics) -> Self {
        Self {
            label: None,
            metrics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cagr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub periods_analyzed: usize,
    pub period_labels: Vec<String>,
    pub revenue: Trend,
    pub profit: Trend,
    pub assets: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendAnalysis {
    InsufficientData { periods: usize, message: String },
    Trends(TrendResult),
}

impl TrendAnalysis {
    pub fn result(&self) -> Option<&TrendResult> {
        match self {
            TrendAnalysis::Trends(result) => Some(result),
            TrendAnalysis::InsufficientData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    /// Growth only when the base is strictly positive.
    Positive,
    /// Growth against `|base|` whenever the base is non-zero.
    NonZero,
}

/// Percentage change from `first` to `last`, or `None` when the base does not
/// allow a meaningful percentage.
fn growth(first: f64, last: f64, base: Base) -> Option<f64> {
    match base {
        Base::Positive if first > 0.0 => Some((last - first) / first * 100.0),
        Base::NonZero if first != 0.0 => Some((last - first) / first.abs() * 100.0),
        _ => None,
    }
}

fn direction(first: f64, last: f64, growth_rate: Option<f64>) -> TrendDirection {
    let delta = growth_rate.unwrap_or(last - first);
    if delta > 0.0 {
        TrendDirection::Increasing
    } else if growth_rate.is_some() || delta < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Unknown
    }
}

fn cagr(first: f64, last: f64, periods: usize) -> Option<f64> {
    if periods < 3 || first <= 0.0 || last < 0.0 {
        return None;
    }
    let years = (periods - 1) as f64;
    let rate = ((last / first).powf(1.0 / years) - 1.0) * 100.0;
    rate.is_finite().then_some(round2(rate))
}

fn series_trend(series: &[f64], base: Base, with_yoy: bool) -> Trend {
    let n = series.len();
    let first = series[0];
    let last = series[n - 1];
    let growth_rate = growth(first, last, base);

    let yoy = if with_yoy {
        growth(series[n - 2], last, base).map(round2)
    } else {
        None
    };

    Trend {
        direction: direction(first, last, growth_rate),
        growth_rate: growth_rate.map(round2),
        cagr: cagr(first, last, n),
        yoy,
    }
}

/// Trend analysis over periods ordered oldest to newest. Unknown values count
/// as zero. Fewer than two periods yields `InsufficientData`.
pub fn analyze_trends(periods: &[PeriodMetrics]) -> TrendAnalysis {
    if periods.len() < 2 {
        return TrendAnalysis::InsufficientData {
            periods: periods.len(),
            message: "At least two periods are required for trend analysis".to_string(),
        };
    }

    let revenue: Vec<f64> = periods
        .iter()
        .map(|p| p.metrics.top_line().unwrap_or(0.0))
        .collect();
    let profit: Vec<f64> = periods
        .iter()
        .map(|p| p.metrics.net_income.unwrap_or(0.0))
        .collect();
    let assets: Vec<f64> = periods
        .iter()
        .map(|p| p.metrics.total_assets.unwrap_or(0.0))
        .collect();

    let period_labels = periods
        .iter()
        .enumerate()
        .map(|(i, p)| {
            p.label
                .clone()
                .unwrap_or_else(|| format!("Period {}", i + 1))
        })
        .collect();

    debug!("Analyzing trends across {} periods", periods.len());

    TrendAnalysis::Trends(TrendResult {
        periods_analyzed: periods.len(),
        period_labels,
        revenue: series_trend(&revenue, Base::Positive, true),
        profit: series_trend(&profit, Base::NonZero, true),
        assets: series_trend(&assets, Base::Positive, false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(revenue: Option<f64>, net_income: Option<f64>) -> PeriodMetrics {
        PeriodMetrics::unlabeled(FinancialMetrics {
            revenue,
            net_income,
            ..Default::default()
        })
    }

    #[test]
    fn test_two_periods_growth_without_cagr() {
        let analysis = analyze_trends(&[
            period(Some(1_000_000.0), None),
            period(Some(1_200_000.0), None),
        ]);
        let result = analysis.result().unwrap();

        assert_eq!(result.revenue.direction, TrendDirection::Increasing);
        assert_eq!(result.revenue.growth_rate, Some(20.0));
        assert_eq!(result.revenue.cagr, None);
        assert_eq!(result.revenue.yoy, Some(20.0));
        assert_eq!(result.period_labels, vec!["Period 1", "Period 2"]);
    }

    #[test]
    fn test_single_period_is_insufficient() {
        let analysis = analyze_trends(&[period(Some(10.0), Some(1.0))]);
        assert!(analysis.result().is_none());
        match analysis {
            TrendAnalysis::InsufficientData { periods, .. } => assert_eq!(periods, 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(analyze_trends(&[]).result().is_none());
    }

    #[test]
    fn test_cagr_with_three_periods() {
        let analysis = analyze_trends(&[
            period(Some(100.0), Some(10.0)),
            period(Some(110.0), Some(12.0)),
            period(Some(121.0), Some(9.0)),
        ]);
        let result = analysis.result().unwrap();

        assert_eq!(result.revenue.cagr, Some(10.0));
        assert_eq!(result.revenue.growth_rate, Some(21.0));
        assert_eq!(result.revenue.yoy, Some(10.0));
        assert_eq!(result.profit.direction, TrendDirection::Decreasing);
        assert_eq!(result.profit.yoy, Some(-25.0));
    }

    #[test]
    fn test_profit_growth_uses_absolute_base() {
        let analysis = analyze_trends(&[period(None, Some(-100.0)), period(None, Some(50.0))]);
        let result = analysis.result().unwrap();

        assert_eq!(result.profit.growth_rate, Some(150.0));
        assert_eq!(result.profit.direction, TrendDirection::Increasing);
    }

    #[test]
    fn test_zero_base_uses_sign_comparison() {
        let analysis = analyze_trends(&[period(None, None), period(Some(500.0), Some(-20.0))]);
        let result = analysis.result().unwrap();

        assert_eq!(result.revenue.growth_rate, None);
        assert_eq!(result.revenue.direction, TrendDirection::Increasing);
        assert_eq!(result.profit.growth_rate, None);
        assert_eq!(result.profit.direction, TrendDirection::Decreasing);
        assert_eq!(result.assets.direction, TrendDirection::Unknown);
        assert_eq!(result.assets.yoy, None);
    }

    #[test]
    fn test_sales_stand_in_for_revenue() {
        let first = PeriodMetrics::new(
            "FY2022",
            FinancialMetrics {
                sales: Some(200.0),
                ..Default::default()
            },
        );
        let second = PeriodMetrics::new(
            "FY2023",
            FinancialMetrics {
                sales: Some(150.0),
                ..Default::default()
            },
        );
        let analysis = analyze_trends(&[first, second]);
        let result = analysis.result().unwrap();

        assert_eq!(result.revenue.growth_rate, Some(-25.0));
        assert_eq!(result.revenue.direction, TrendDirection::Decreasing);
        assert_eq!(result.period_labels, vec!["FY2022", "FY2023"]);
    }
}
