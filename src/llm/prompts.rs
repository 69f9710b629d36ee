// Prompts shared by every provider. Providers only differ in transport.

use crate::llm::utils::{format_benchmark, format_metrics, format_ratios, format_risks, format_trends};
use crate::schema::AnalysisReport;

pub const SYSTEM_PROMPT_ANALYST: &str = "You are an expert financial analyst with deep knowledge of financial statements, ratios, and risk assessment.";

pub const SYSTEM_PROMPT_EXTRACTION: &str = r#"
You are a Financial Statement Extraction Agent.

## YOUR MISSION
Read the supplied statement text and report the canonical metrics it states explicitly.

## RULES
- Only report values that are written in the document. Never calculate or estimate.
- Use null for anything that is not stated.
- Report plain numbers in the statement's currency units: no symbols, no thousands separators.
- Amounts shown in parentheses are negative. Cash outflows (investing, financing) are negative.
- When several periods are shown, report the MOST RECENT period.
- If the statement is presented "in thousands" or "in millions", scale the values and say so in `notes`.

## FIELD GUIDE
- revenue: total revenue / turnover. sales: net sales when reported separately.
- operating_income: operating profit / EBIT. net_income: profit after tax.
- equity: total shareholders' equity. total_debt: borrowings, short and long term.
- operating_cash_flow / investing_cash_flow / financing_cash_flow: net cash from each activity.
- free_cash_flow: only if the document states it.

## OUTPUT FORMAT
Return ONLY valid JSON of the form {"metrics": {...}, "notes": "..."} matching the schema.
"#;

pub const SYSTEM_PROMPT_VISION: &str = "You read images of financial statements accurately and report exactly what they show.";

pub const VISION_PROMPT: &str = r#"Analyze this financial statement image and extract:
1. Key financial metrics (revenue, net income, total assets, total liabilities, equity, cash flows)
2. Important line items and their values, one per line as "<label> <value>"
3. Any notable observations or irregularities

If you can, finish with a single JSON object using these keys (null when absent):
revenue, sales, gross_profit, operating_income, net_income, total_assets, current_assets,
total_liabilities, current_liabilities, equity, cash, cash_equivalents, inventory,
accounts_receivable, operating_cash_flow, investing_cash_flow, financing_cash_flow,
free_cash_flow, total_debt, interest_expense."#;

/// Longest document excerpt sent for structured extraction.
pub const MAX_EXTRACTION_CHARS: usize = 12_000;

pub fn analysis_context(report: &AnalysisReport) -> String {
    format!(
        "Financial Metrics:\n{}\n\nFinancial Ratios:\n{}\n\nIdentified Risks:\n{}\n\nTrends:\n{}\n\nPeer Benchmark:\n{}",
        format_metrics(&report.financial_data),
        format_ratios(&report.ratios),
        format_risks(&report.risks),
        format_trends(report.trends.as_ref()),
        format_benchmark(report.benchmark.as_ref()),
    )
}

pub fn insights_prompt(report: &AnalysisReport) -> String {
    format!(
        "As a financial analyst, provide comprehensive insights based on this financial data:\n\n\
        {}\n\n\
        Please provide:\n\
        1. Overall financial health assessment\n\
        2. Key strengths and weaknesses\n\
        3. Trends and patterns\n\
        4. Recommendations for stakeholders\n\
        5. Areas requiring attention\n\n\
        Be specific, actionable, and professional. Some ratios are estimates \
        (inventory turnover assumes cost of goods sold is 65% of revenue); say so if you rely on them.",
        analysis_context(report)
    )
}

pub fn qa_system_prompt(report: &AnalysisReport) -> String {
    format!(
        "You are a helpful financial analyst assistant. Use this context to answer questions. \
        If the context does not contain the answer, say so instead of guessing.\n\n{}",
        analysis_context(report)
    )
}

pub fn extraction_prompt(document_text: &str, schema: &str) -> String {
    let excerpt = truncate_chars(document_text, MAX_EXTRACTION_CHARS);
    format!(
        "Extract the financial metrics from this document.\n\n\
        JSON SCHEMA:\n{}\n\n\
        DOCUMENT:\n{}",
        schema, excerpt
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
