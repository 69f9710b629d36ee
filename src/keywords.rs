//! Ordered keyword table shared by the text, tabular and tag adapters.
//!
//! Order matters twice: entries are tried top to bottom when a free-form label
//! has to be mapped to a single field, and keywords inside an entry are tried
//! most specific first.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::MetricField;

#[derive(Debug, Clone, Copy)]
pub struct MetricKeywords {
    pub field: MetricField,
    pub keywords: &'static [&'static str],
    /// A label containing any of these is never attributed to `field`.
    pub exclude: &'static [&'static str],
}

pub static METRIC_KEYWORDS: &[MetricKeywords] = &[
    MetricKeywords {
        field: MetricField::GrossProfit,
        keywords: &["gross profit", "gross income", "gross margin"],
        exclude: &["%", "percent", "ratio"],
    },
    MetricKeywords {
        field: MetricField::OperatingIncome,
        keywords: &[
            "operating income",
            "operating profit",
            "income from operations",
            "profit from operations",
            "ebit",
        ],
        exclude: &["margin", "non-operating", "nonoperating"],
    },
    MetricKeywords {
        field: MetricField::NetIncome,
        keywords: &[
            "net income",
            "net profit",
            "net earnings",
            "profit after tax",
            "profit for the year",
            "profit for the period",
        ],
        exclude: &["per share", "margin", "comprehensive"],
    },
    MetricKeywords {
        field: MetricField::Revenue,
        keywords: &[
            "total revenues",
            "total revenue",
            "net revenues",
            "net revenue",
            "revenues",
            "revenue",
        ],
        exclude: &[
            "cost of",
            "deferred",
            "unearned",
            "growth",
            "per share",
            "per employee",
            "turnover",
            "ratio",
        ],
    },
    MetricKeywords {
        field: MetricField::Sales,
        keywords: &["net sales", "total sales", "sales"],
        exclude: &["cost of", "marketing", "selling", "expense", "growth"],
    },
    MetricKeywords {
        field: MetricField::CurrentAssets,
        keywords: &["total current assets", "current assets"],
        exclude: &["non-current", "noncurrent", "non current", "other current"],
    },
    MetricKeywords {
        field: MetricField::TotalAssets,
        keywords: &["total assets", "assets total"],
        exclude: &["return on"],
    },
    MetricKeywords {
        field: MetricField::CurrentLiabilities,
        keywords: &["total current liabilities", "current liabilities"],
        exclude: &["non-current", "noncurrent", "non current", "other current"],
    },
    MetricKeywords {
        field: MetricField::TotalLiabilities,
        keywords: &["total liabilities", "liabilities total"],
        exclude: &["and equity", "and shareholders", "and stockholders", "and net assets"],
    },
    MetricKeywords {
        field: MetricField::Equity,
        keywords: &[
            "total shareholders' equity",
            "total stockholders' equity",
            "total shareholders equity",
            "total stockholders equity",
            "total equity",
            "shareholders' equity",
            "stockholders' equity",
            "shareholders equity",
            "stockholders equity",
        ],
        exclude: &["liabilities and", "return on", "to equity"],
    },
    MetricKeywords {
        field: MetricField::FreeCashFlow,
        keywords: &["free cash flow"],
        exclude: &["margin", "yield", "per share"],
    },
    MetricKeywords {
        field: MetricField::OperatingCashFlow,
        keywords: &[
            "net cash provided by operating activities",
            "net cash from operating activities",
            "cash from operations",
            "cash generated from operations",
            "operating cash flow",
            "operating activities",
        ],
        exclude: &["free cash"],
    },
    MetricKeywords {
        field: MetricField::InvestingCashFlow,
        keywords: &[
            "net cash used in investing activities",
            "cash from investing",
            "investing activities",
        ],
        exclude: &[],
    },
    MetricKeywords {
        field: MetricField::FinancingCashFlow,
        keywords: &[
            "net cash used in financing activities",
            "cash from financing",
            "financing activities",
        ],
        exclude: &[],
    },
    MetricKeywords {
        field: MetricField::CashEquivalents,
        keywords: &["cash equivalents"],
        exclude: &["cash and cash equivalents", "cash and equivalents"],
    },
    MetricKeywords {
        field: MetricField::Cash,
        keywords: &[
            "cash and cash equivalents",
            "cash and equivalents",
            "cash at bank",
            "cash",
        ],
        exclude: &[
            "cash flow",
            "operating activities",
            "investing activities",
            "financing activities",
            "cash from",
            "cash used",
            "cash provided",
            "cash generated",
            "free cash",
            "cash ratio",
            "increase",
            "decrease",
        ],
    },
    MetricKeywords {
        field: MetricField::Inventory,
        keywords: &["inventories", "inventory"],
        exclude: &["turnover", "change in", "days"],
    },
    MetricKeywords {
        field: MetricField::AccountsReceivable,
        keywords: &["accounts receivable", "trade receivables", "receivables"],
        exclude: &["turnover", "change in", "days"],
    },
    MetricKeywords {
        field: MetricField::TotalDebt,
        keywords: &[
            "total debt",
            "total borrowings",
            "long-term debt",
            "long term debt",
            "short-term debt",
            "short term debt",
            "borrowings",
        ],
        exclude: &["to equity", "to asset", "ratio"],
    },
    MetricKeywords {
        field: MetricField::InterestExpense,
        keywords: &["interest expense", "interest paid", "finance costs"],
        exclude: &["coverage"],
    },
];

/// Word-bounded regexes built from `METRIC_KEYWORDS`, same order.
pub(crate) struct CompiledKeywords {
    pub entry: &'static MetricKeywords,
    pub patterns: Vec<Regex>,
}

impl CompiledKeywords {
    pub fn is_excluded(&self, lowered: &str) -> bool {
        self.entry.exclude.iter().any(|ex| lowered.contains(ex))
    }

    /// True when some keyword matches and no exclusion applies. `lowered`
    /// must already be lowercase.
    pub fn matches(&self, lowered: &str) -> bool {
        !self.is_excluded(lowered) && self.patterns.iter().any(|p| p.is_match(lowered))
    }
}

pub(crate) static COMPILED_KEYWORDS: Lazy<Vec<CompiledKeywords>> = Lazy::new(|| {
    METRIC_KEYWORDS
        .iter()
        .map(|entry| CompiledKeywords {
            entry,
            patterns: entry
                .keywords
                .iter()
                .map(|kw| {
                    Regex::new(&format!(r"\b{}\b", regex::escape(kw)))
                        .expect("escaped keyword is a valid pattern")
                })
                .collect(),
        })
        .collect()
});

/// Maps a free-form label ("Total Revenue", "Cash from operations") to the
/// first field whose keywords match it.
pub fn match_label(label: &str) -> Option<MetricField> {
    let lowered = label.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    COMPILED_KEYWORDS
        .iter()
        .find(|compiled| compiled.matches(&lowered))
        .map(|compiled| compiled.entry.field)
}

/// Lowercases and removes all whitespace, the form tag names are compared in.
pub fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_has_keywords() {
        for field in MetricField::ALL {
            let entries = METRIC_KEYWORDS.iter().filter(|e| e.field == field).count();
            assert_eq!(entries, 1, "{} should appear exactly once", field);
        }
    }

    #[test]
    fn test_match_label_prefers_specific_fields() {
        assert_eq!(match_label("Total Revenue"), Some(MetricField::Revenue));
        assert_eq!(match_label("Net Sales"), Some(MetricField::Sales));
        assert_eq!(match_label("Cost of Sales"), None);
        assert_eq!(match_label("Gross Profit"), Some(MetricField::GrossProfit));
        assert_eq!(
            match_label("Cash from operations"),
            Some(MetricField::OperatingCashFlow)
        );
        assert_eq!(
            match_label("Cash and cash equivalents"),
            Some(MetricField::Cash)
        );
        assert_eq!(
            match_label("Total current assets"),
            Some(MetricField::CurrentAssets)
        );
        assert_eq!(match_label("Non-current assets"), None);
        assert_eq!(
            match_label("Total liabilities and shareholders' equity"),
            None
        );
        assert_eq!(match_label("EBITDA"), None);
        assert_eq!(match_label("Asset turnover"), None);
        assert_eq!(match_label("Inventory Turnover"), None);
        assert_eq!(match_label("Receivables turnover"), None);
        assert_eq!(match_label(""), None);
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact("Us-Gaap: Net Income Loss"), "us-gaap:netincomeloss");
    }
}
