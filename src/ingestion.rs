use log::debug;

use crate::composer::{derive_missing_fields, merge_llm_structured_data, parse_structured_metrics};
use crate::extraction::{extract_from_rows, extract_from_tags, extract_from_text};
use crate::schema::{DocumentInput, FinancialMetrics};

/// Routes a document to its adapter and runs the derived-field step.
///
/// Unsupported documents yield an all-unknown record so every later stage
/// degrades to empty results instead of failing.
pub fn extract_metrics(document: &DocumentInput) -> FinancialMetrics {
    let mut metrics = match document {
        DocumentInput::Text { pages } => {
            let text = pages
                .iter()
                .map(|page| page.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            extract_from_text(&text)
        }
        DocumentInput::Tabular { rows } => extract_from_rows(rows),
        DocumentInput::Tagged { tags } => extract_from_tags(tags),
        DocumentInput::VisionExtraction { raw_text } => extract_from_vision(raw_text),
        DocumentInput::Unsupported => {
            debug!("Unsupported document type, returning empty metrics");
            FinancialMetrics::empty()
        }
    };

    derive_missing_fields(&mut metrics);
    metrics
}

// Vision models answer either in prose or with a JSON object; a JSON payload
// is trusted over what the text adapter can pull from the same answer.
fn extract_from_vision(raw_text: &str) -> FinancialMetrics {
    let from_text = extract_from_text(raw_text);
    match parse_structured_metrics(raw_text) {
        Some(structured) => {
            let (merged, audit) = merge_llm_structured_data(&from_text, &structured.metrics);
            debug!(
                "Vision output carried JSON metrics ({} fields applied)",
                audit.changes.len()
            );
            merged
        }
        None => from_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PageText, TabularRow};
    use std::collections::BTreeMap;

    #[test]
    fn test_text_pages_are_joined() {
        let document = DocumentInput::Text {
            pages: vec![
                PageText {
                    page_number: 1,
                    text: "Revenue 1,000".to_string(),
                },
                PageText {
                    page_number: 2,
                    text: "Operating activities 300\nInvesting activities (120)".to_string(),
                },
            ],
        };
        let metrics = extract_metrics(&document);

        assert_eq!(metrics.revenue, Some(1000.0));
        assert_eq!(metrics.operating_cash_flow, Some(300.0));
        assert_eq!(metrics.investing_cash_flow, Some(-120.0));
        assert_eq!(metrics.free_cash_flow, Some(180.0));
    }

    #[test]
    fn test_unsupported_is_empty() {
        assert!(extract_metrics(&DocumentInput::Unsupported).is_empty());
        assert!(extract_metrics(&DocumentInput::Tabular { rows: Vec::new() }).is_empty());
    }

    #[test]
    fn test_tagged_and_tabular_routes() {
        let mut tags = BTreeMap::new();
        tags.insert("us-gaap:Revenues".to_string(), "2,000".to_string());
        let metrics = extract_metrics(&DocumentInput::Tagged { tags });
        assert_eq!(metrics.revenue, Some(2000.0));

        let mut row = TabularRow::new();
        row.insert("Item".into(), "Net income".into());
        row.insert("Amount".into(), "(75)".into());
        let metrics = extract_metrics(&DocumentInput::Tabular { rows: vec![row] });
        assert_eq!(metrics.net_income, Some(-75.0));
    }

    #[test]
    fn test_vision_json_overrides_text() {
        let raw_text = "Revenue 900\nNet income 50\n{\"revenue\": 1000, \"total_assets\": 4000}";
        let metrics = extract_metrics(&DocumentInput::VisionExtraction {
            raw_text: raw_text.to_string(),
        });

        assert_eq!(metrics.revenue, Some(1000.0));
        assert_eq!(metrics.net_income, Some(50.0));
        assert_eq!(metrics.total_assets, Some(4000.0));
    }

    #[test]
    fn test_vision_prose_uses_text_adapter() {
        let metrics = extract_metrics(&DocumentInput::VisionExtraction {
            raw_text: "The statement shows Total assets of 7,500".to_string(),
        });
        assert_eq!(metrics.total_assets, Some(7500.0));
    }
}
