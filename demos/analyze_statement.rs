use financial_statement_analyzer::*;
use serde_json::Value;
use std::error::Error;

const SAMPLE_STATEMENT: &str = "\
Total revenue 12,400,000 13,950,000
Cost of revenue 7,100,000 8,020,000
Gross profit 5,300,000 5,930,000
Operating income 1,150,000 1,240,000
Interest expense 210,000 260,000
Net income 720,000 690,000
Cash and cash equivalents 640,000 410,000
Inventories 1,900,000 2,350,000
Total current assets 4,100,000 4,380,000
Total assets 11,800,000 12,900,000
Total current liabilities 3,050,000 3,600,000
Total liabilities 7,400,000 8,650,000
Total shareholders' equity 4,400,000 4,250,000
Net cash provided by operating activities 980,000 (120,000)
Net cash used in investing activities (640,000) (700,000)
";

const PRIOR_YEAR_CSV: &str = "\
Item,FY2022
Total revenue,\"11,200,000\"
Net income,\"810,000\"
Total assets,\"10,900,000\"
";

fn load_rows(data: &str) -> std::result::Result<Vec<TabularRow>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: TabularRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let text = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_STATEMENT.to_string(),
    };

    let analyzer = FinancialAnalyzer::new(AnalyzerConfig::from_env()?);
    println!("📄 Analyzing statement...\n");

    let report = analyzer.analyze(&DocumentInput::from_text(text.clone()));

    if report.is_insufficient() {
        println!("⚠️  No financial metrics could be extracted.");
        return Ok(());
    }

    println!("📊 Extracted metrics:");
    for (field, value) in report.financial_data.known() {
        println!("  {:<24} {:>16.2}", field.as_str(), value);
    }

    println!("\n📐 Ratios:");
    for (ratio, value) in report.ratios.iter() {
        println!("  {:<28} {:>10.2}", ratio.label(), value);
    }

    println!("\n🚩 Risks:");
    if report.risks.is_empty() {
        println!("  none");
    }
    for risk in &report.risks {
        println!("  [{}] {}: {}", risk.severity, risk.risk_type, risk.description);
    }

    if let Some(roe) = report.dupont.calculated_roe {
        println!("\n🔎 DuPont ROE: {:.2}%", roe);
    }

    if let Some(result) = report.benchmark.as_ref().and_then(|b| b.result()) {
        println!("\n🏭 {} peers: {}", result.industry, result.summary);
        for alert in &result.alerts {
            println!("  ⚠️  {}", alert);
        }
    }

    let prior = DocumentInput::Tabular {
        rows: load_rows(PRIOR_YEAR_CSV)?,
    };
    let history = analyzer.analyze_periods(&[
        ("FY2022", prior),
        ("FY2023", DocumentInput::from_text(text)),
    ]);
    if let Some(trends) = history.trends.as_ref().and_then(|t| t.result()) {
        println!(
            "\n📈 Revenue {:?} ({:?}%), profit {:?} ({:?}%)",
            trends.revenue.direction,
            trends.revenue.growth_rate,
            trends.profit.direction,
            trends.profit.growth_rate
        );
    }

    println!("\n✅ Full report:\n{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
