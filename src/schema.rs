use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::benchmark::BenchmarkComparison;
use crate::dupont::DupontAnalysis;
use crate::ratios::RatioSet;
use crate::risk::Risk;
use crate::trends::TrendAnalysis;

/// The canonical metric record every extraction adapter converges on.
///
/// Every recognized field is always present when serialized (`null` when
/// unknown). Unrecognized keys in incoming payloads are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FinancialMetrics {
    #[schemars(description = "Total revenue / turnover for the period, in reporting currency units")]
    pub revenue: Option<f64>,

    #[schemars(description = "Net sales if reported separately from revenue")]
    pub sales: Option<f64>,

    #[schemars(description = "Revenue minus cost of goods sold")]
    pub gross_profit: Option<f64>,

    #[schemars(description = "Operating income (EBIT / operating profit)")]
    pub operating_income: Option<f64>,

    #[schemars(description = "Net income / profit after tax. Negative for a net loss.")]
    pub net_income: Option<f64>,

    #[schemars(description = "Total assets at the balance sheet date")]
    pub total_assets: Option<f64>,

    #[schemars(description = "Total current assets")]
    pub current_assets: Option<f64>,

    #[schemars(description = "Total liabilities")]
    pub total_liabilities: Option<f64>,

    #[schemars(description = "Total current liabilities")]
    pub current_liabilities: Option<f64>,

    #[schemars(description = "Total shareholders' / stockholders' equity")]
    pub equity: Option<f64>,

    #[schemars(description = "Cash (or cash and cash equivalents when reported as one line)")]
    pub cash: Option<f64>,

    #[schemars(description = "Cash equivalents when reported separately from cash")]
    pub cash_equivalents: Option<f64>,

    #[schemars(description = "Inventories")]
    pub inventory: Option<f64>,

    #[schemars(description = "Accounts / trade receivables")]
    pub accounts_receivable: Option<f64>,

    #[schemars(description = "Net cash from operating activities")]
    pub operating_cash_flow: Option<f64>,

    #[schemars(description = "Net cash from investing activities (usually negative)")]
    pub investing_cash_flow: Option<f64>,

    #[schemars(description = "Net cash from financing activities")]
    pub financing_cash_flow: Option<f64>,

    #[schemars(description = "Free cash flow (operating cash flow plus investing cash flow)")]
    pub free_cash_flow: Option<f64>,

    #[schemars(description = "Total borrowings / debt")]
    pub total_debt: Option<f64>,

    #[schemars(description = "Interest expense / finance costs for the period")]
    pub interest_expense: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    Revenue,
    Sales,
    GrossProfit,
    OperatingIncome,
    NetIncome,
    TotalAssets,
    CurrentAssets,
    TotalLiabilities,
    CurrentLiabilities,
    Equity,
    Cash,
    CashEquivalents,
    Inventory,
    AccountsReceivable,
    OperatingCashFlow,
    InvestingCashFlow,
    FinancingCashFlow,
    FreeCashFlow,
    TotalDebt,
    InterestExpense,
}

impl MetricField {
    pub const ALL: [MetricField; 20] = [
        MetricField::Revenue,
        MetricField::Sales,
        MetricField::GrossProfit,
        MetricField::OperatingIncome,
        MetricField::NetIncome,
        MetricField::TotalAssets,
        MetricField::CurrentAssets,
        MetricField::TotalLiabilities,
        MetricField::CurrentLiabilities,
        MetricField::Equity,
        MetricField::Cash,
        MetricField::CashEquivalents,
        MetricField::Inventory,
        MetricField::AccountsReceivable,
        MetricField::OperatingCashFlow,
        MetricField::InvestingCashFlow,
        MetricField::FinancingCashFlow,
        MetricField::FreeCashFlow,
        MetricField::TotalDebt,
        MetricField::InterestExpense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricField::Revenue => "revenue",
            MetricField::Sales => "sales",
            MetricField::GrossProfit => "gross_profit",
            MetricField::OperatingIncome => "operating_income",
            MetricField::NetIncome => "net_income",
            MetricField::TotalAssets => "total_assets",
            MetricField::CurrentAssets => "current_assets",
            MetricField::TotalLiabilities => "total_liabilities",
            MetricField::CurrentLiabilities => "current_liabilities",
            MetricField::Equity => "equity",
            MetricField::Cash => "cash",
            MetricField::CashEquivalents => "cash_equivalents",
            MetricField::Inventory => "inventory",
            MetricField::AccountsReceivable => "accounts_receivable",
            MetricField::OperatingCashFlow => "operating_cash_flow",
            MetricField::InvestingCashFlow => "investing_cash_flow",
            MetricField::FinancingCashFlow => "financing_cash_flow",
            MetricField::FreeCashFlow => "free_cash_flow",
            MetricField::TotalDebt => "total_debt",
            MetricField::InterestExpense => "interest_expense",
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FinancialMetrics {
    /// An all-unknown record.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, field: MetricField) -> Option<f64> {
        *self.slot(field)
    }

    /// Overwrites the field unconditionally. Non-finite values are stored as unknown.
    pub fn set(&mut self, field: MetricField, value: Option<f64>) {
        *self.slot_mut(field) = value.filter(|v| v.is_finite());
    }

    /// Writes the field only if it is currently unknown. Returns whether a write happened.
    pub fn set_if_unknown(&mut self, field: MetricField, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let slot = self.slot_mut(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    pub fn is_known(&self, field: MetricField) -> bool {
        self.slot(field).is_some()
    }

    /// Fills every unknown field from `patch`, keeping values already present.
    pub fn fill_unknown_from(&mut self, patch: &FinancialMetrics) {
        for field in MetricField::ALL {
            if let Some(value) = patch.get(field) {
                self.set_if_unknown(field, value);
            }
        }
    }

    /// Known fields in canonical order.
    pub fn known(&self) -> impl Iterator<Item = (MetricField, f64)> + '_ {
        MetricField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|value| (field, value)))
    }

    pub fn known_count(&self) -> usize {
        self.known().count()
    }

    pub fn is_empty(&self) -> bool {
        self.known_count() == 0
    }

    /// Revenue, falling back to sales when revenue was never reported.
    pub fn top_line(&self) -> Option<f64> {
        self.revenue.or(self.sales)
    }

    fn slot(&self, field: MetricField) -> &Option<f64> {
        match field {
            MetricField::Revenue => &self.revenue,
            MetricField::Sales => &self.sales,
            MetricField::GrossProfit => &self.gross_profit,
            MetricField::OperatingIncome => &self.operating_income,
            MetricField::NetIncome => &self.net_income,
            MetricField::TotalAssets => &self.total_assets,
            MetricField::CurrentAssets => &self.current_assets,
            MetricField::TotalLiabilities => &self.total_liabilities,
            MetricField::CurrentLiabilities => &self.current_liabilities,
            MetricField::Equity => &self.equity,
            MetricField::Cash => &self.cash,
            MetricField::CashEquivalents => &self.cash_equivalents,
            MetricField::Inventory => &self.inventory,
            MetricField::AccountsReceivable => &self.accounts_receivable,
            MetricField::OperatingCashFlow => &self.operating_cash_flow,
            MetricField::InvestingCashFlow => &self.investing_cash_flow,
            MetricField::FinancingCashFlow => &self.financing_cash_flow,
            MetricField::FreeCashFlow => &self.free_cash_flow,
            MetricField::TotalDebt => &self.total_debt,
            MetricField::InterestExpense => &self.interest_expense,
        }
    }

    fn slot_mut(&mut self, field: MetricField) -> &mut Option<f64> {
        match field {
            MetricField::Revenue => &mut self.revenue,
            MetricField::Sales => &mut self.sales,
            MetricField::GrossProfit => &mut self.gross_profit,
            MetricField::OperatingIncome => &mut self.operating_income,
            MetricField::NetIncome => &mut self.net_income,
            MetricField::TotalAssets => &mut self.total_assets,
            MetricField::CurrentAssets => &mut self.current_assets,
            MetricField::TotalLiabilities => &mut self.total_liabilities,
            MetricField::CurrentLiabilities => &mut self.current_liabilities,
            MetricField::Equity => &mut self.equity,
            MetricField::Cash => &mut self.cash,
            MetricField::CashEquivalents => &mut self.cash_equivalents,
            MetricField::Inventory => &mut self.inventory,
            MetricField::AccountsReceivable => &mut self.accounts_receivable,
            MetricField::OperatingCashFlow => &mut self.operating_cash_flow,
            MetricField::InvestingCashFlow => &mut self.investing_cash_flow,
            MetricField::FinancingCashFlow => &mut self.financing_cash_flow,
            MetricField::FreeCashFlow => &mut self.free_cash_flow,
            MetricField::TotalDebt => &mut self.total_debt,
            MetricField::InterestExpense => &mut self.interest_expense,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// One spreadsheet/CSV row: column name -> cell, in column order.
pub type TabularRow = serde_json::Map<String, serde_json::Value>;

/// The intermediate representation produced by the document readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentInput {
    /// PDF or plain-text pages.
    Text { pages: Vec<PageText> },

    /// Spreadsheet or CSV rows, already flattened across sheets. Rows that
    /// are not objects are dropped when reading.
    Tabular {
        #[serde(default, deserialize_with = "deserialize_rows")]
        rows: Vec<TabularRow>,
    },

    /// XBRL/XML tag -> text value pairs.
    Tagged {
        tags: std::collections::BTreeMap<String, String>,
    },

    /// Raw text returned by a vision model for an image of a statement.
    VisionExtraction { raw_text: String },

    /// Anything the readers could not classify.
    #[serde(other)]
    Unsupported,
}

fn deserialize_rows<'de, D>(deserializer: D) -> std::result::Result<Vec<TabularRow>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let rows = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::Object(row) => Some(row),
                other => {
                    log::debug!("Skipping tabular row that is not an object: {}", other);
                    None
                }
            })
            .collect(),
        other => {
            log::debug!("Tabular rows are not a list: {}", other);
            Vec::new()
        }
    };
    Ok(rows)
}

impl DocumentInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        DocumentInput::Text {
            pages: vec![PageText {
                page_number: 1,
                text: text.into(),
            }],
        }
    }

    /// Flattens workbook sheets into a single row sequence, sheet order first.
    pub fn from_sheets<I>(sheets: I) -> Self
    where
        I: IntoIterator<Item = Vec<TabularRow>>,
    {
        DocumentInput::Tabular {
            rows: sheets.into_iter().flatten().collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DocumentInput::Text { .. } => "text",
            DocumentInput::Tabular { .. } => "tabular",
            DocumentInput::Tagged { .. } => "tagged",
            DocumentInput::VisionExtraction { .. } => "vision_extraction",
            DocumentInput::Unsupported => "unsupported",
        }
    }

    /// The free text carried by the document, if it has any.
    pub fn text_content(&self) -> Option<String> {
        match self {
            DocumentInput::Text { pages } => Some(
                pages
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            DocumentInput::VisionExtraction { raw_text } => Some(raw_text.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSummary {
    pub operating: Option<f64>,
    pub investing: Option<f64>,
    pub financing: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

impl CashFlowSummary {
    pub fn from_metrics(metrics: &FinancialMetrics) -> Self {
        Self {
            operating: metrics.operating_cash_flow,
            investing: metrics.investing_cash_flow,
            financing: metrics.financing_cash_flow,
            free_cash_flow: metrics.free_cash_flow,
        }
    }
}

/// Everything the pipeline derives for one document or period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub financial_data: FinancialMetrics,
    pub ratios: RatioSet,
    pub risks: Vec<Risk>,
    pub dupont: DupontAnalysis,
    pub benchmark: Option<BenchmarkComparison>,
    pub cash_flow_summary: CashFlowSummary,
    pub trends: Option<TrendAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_audit: Option<crate::composer::MergeAudit>,
}

impl AnalysisReport {
    /// True when nothing could be extracted from the source document.
    pub fn is_insufficient(&self) -> bool {
        self.financial_data.is_empty()
    }
}
