use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::{FinancialMetrics, MetricField};

/// Metrics and free-text notes produced by an external (AI) extractor.
/// Its JSON schema is what structured-output models are constrained to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StructuredExtraction {
    #[schemars(
        description = "Financial metrics found in the document. Use null for anything not explicitly stated. Values are plain numbers in reporting currency units; losses and outflows are negative."
    )]
    pub metrics: FinancialMetrics,

    #[schemars(
        description = "Optional short notes about the extraction (units, period, caveats)."
    )]
    pub notes: Option<String>,
}

impl StructuredExtraction {
    /// Inlined schema without `$schema`/`definitions`, the shape structured
    /// output endpoints accept.
    pub fn response_schema() -> serde_json::Result<serde_json::Value> {
        let settings = schemars::gen::SchemaSettings::openapi3().with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        });
        let root = settings
            .into_generator()
            .into_root_schema_for::<StructuredExtraction>();
        let mut value = serde_json::to_value(root)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("$schema");
            object.remove("definitions");
            object.remove("components");
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: MetricField,
    pub previous: Option<f64>,
    pub updated: f64,
}

impl FieldChange {
    pub fn kind(&self) -> ChangeKind {
        if self.previous.is_some() {
            ChangeKind::Changed
        } else {
            ChangeKind::Added
        }
    }
}

/// Which fields an external merge added or overwrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeAudit {
    pub changes: Vec<FieldChange>,
}

impl MergeAudit {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn added(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes
            .iter()
            .filter(|c| c.kind() == ChangeKind::Added)
    }

    pub fn changed(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes
            .iter()
            .filter(|c| c.kind() == ChangeKind::Changed)
    }
}

/// Fills computed fields that were not reported directly.
pub fn derive_missing_fields(metrics: &mut FinancialMetrics) {
    if metrics.free_cash_flow.is_none() {
        if let (Some(operating), Some(investing)) =
            (metrics.operating_cash_flow, metrics.investing_cash_flow)
        {
            metrics.free_cash_flow = Some(operating + investing);
            debug!("Derived free cash flow from operating and investing cash flow");
        }
    }
}

/// Merges externally extracted metrics into locally extracted ones.
///
/// Known external values win; an unknown external value never erases a local
/// one. The base record is left untouched and the merged copy is returned
/// together with the list of added/changed fields.
pub fn merge_llm_structured_data(
    base: &FinancialMetrics,
    external: &FinancialMetrics,
) -> (FinancialMetrics, MergeAudit) {
    let mut merged = base.clone();
    let mut audit = MergeAudit::default();

    for field in MetricField::ALL {
        let Some(updated) = external.get(field).filter(|v| v.is_finite()) else {
            continue;
        };
        let previous = base.get(field);
        if previous == Some(updated) {
            continue;
        }
        merged.set(field, Some(updated));
        audit.changes.push(FieldChange {
            field,
            previous,
            updated,
        });
    }

    debug!(
        "External merge added {} and changed {} fields",
        audit.added().count(),
        audit.changed().count()
    );
    (merged, audit)
}

/// Merges external metrics and refreshes derived fields. A free cash flow
/// that was derived locally is recomputed when the merge changed one of its
/// inputs, unless the external record states free cash flow itself.
pub fn merge_and_derive(
    base: &FinancialMetrics,
    external: &FinancialMetrics,
) -> (FinancialMetrics, MergeAudit) {
    let (mut merged, audit) = merge_llm_structured_data(base, external);

    let inputs_changed = audit.changes.iter().any(|change| {
        matches!(
            change.field,
            MetricField::OperatingCashFlow | MetricField::InvestingCashFlow
        )
    });
    let fcf_stated = audit
        .changes
        .iter()
        .any(|change| change.field == MetricField::FreeCashFlow);
    if inputs_changed && !fcf_stated && has_derived_free_cash_flow(base) {
        merged.free_cash_flow = None;
    }

    derive_missing_fields(&mut merged);
    (merged, audit)
}

fn has_derived_free_cash_flow(metrics: &FinancialMetrics) -> bool {
    match (
        metrics.free_cash_flow,
        metrics.operating_cash_flow,
        metrics.investing_cash_flow,
    ) {
        (Some(fcf), Some(operating), Some(investing)) => fcf == operating + investing,
        _ => false,
    }
}

/// Reads model output that should hold a metrics object, either bare or
/// wrapped in `{"metrics": ...}`. Returns `None` when nothing usable is found.
pub fn parse_structured_metrics(raw: &str) -> Option<StructuredExtraction> {
    let cleaned = crate::utils::clean_json_output(raw);
    let value: serde_json::Value = serde_json::from_str(&cleaned).ok()?;
    let object = value.as_object()?;

    let extraction = match object.get("metrics") {
        Some(serde_json::Value::Object(metrics)) => StructuredExtraction {
            metrics: metrics_from_loose_json(metrics),
            notes: object
                .get("notes")
                .and_then(|notes| notes.as_str())
                .map(str::to_string),
        },
        Some(_) => return None,
        None => StructuredExtraction {
            metrics: metrics_from_loose_json(object),
            notes: None,
        },
    };

    if extraction.metrics.is_empty() {
        None
    } else {
        Some(extraction)
    }
}

// Models return amounts as strings ("1,200", "(50)") often enough that strict
// deserialization would drop them.
fn metrics_from_loose_json(object: &serde_json::Map<String, serde_json::Value>) -> FinancialMetrics {
    let mut metrics = FinancialMetrics::empty();
    for field in MetricField::ALL {
        if let Some(value) = object.get(field.as_str()).and_then(crate::normalize::normalize) {
            metrics.set(field, Some(value));
        }
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_free_cash_flow() {
        let mut metrics = FinancialMetrics {
            operating_cash_flow: Some(500.0),
            investing_cash_flow: Some(-200.0),
            ..Default::default()
        };
        derive_missing_fields(&mut metrics);
        assert_eq!(metrics.free_cash_flow, Some(300.0));
    }

    #[test]
    fn test_derive_keeps_reported_free_cash_flow() {
        let mut metrics = FinancialMetrics {
            operating_cash_flow: Some(500.0),
            investing_cash_flow: Some(-200.0),
            free_cash_flow: Some(250.0),
            ..Default::default()
        };
        derive_missing_fields(&mut metrics);
        assert_eq!(metrics.free_cash_flow, Some(250.0));

        let mut partial = FinancialMetrics {
            operating_cash_flow: Some(500.0),
            ..Default::default()
        };
        derive_missing_fields(&mut partial);
        assert_eq!(partial.free_cash_flow, None);
    }

    #[test]
    fn test_merge_preserves_local_values() {
        let base = FinancialMetrics {
            revenue: Some(1000.0),
            net_income: Some(100.0),
            ..Default::default()
        };
        let external = FinancialMetrics {
            revenue: Some(1100.0),
            equity: Some(400.0),
            ..Default::default()
        };

        let (merged, audit) = merge_llm_structured_data(&base, &external);

        assert_eq!(merged.revenue, Some(1100.0));
        assert_eq!(merged.net_income, Some(100.0));
        assert_eq!(merged.equity, Some(400.0));
        assert_eq!(base.revenue, Some(1000.0));

        assert_eq!(audit.changes.len(), 2);
        let changed: Vec<_> = audit.changed().collect();
        assert_eq!(changed[0].field, MetricField::Revenue);
        assert_eq!(changed[0].previous, Some(1000.0));
        let added: Vec<_> = audit.added().collect();
        assert_eq!(added[0].field, MetricField::Equity);
    }

    #[test]
    fn test_merge_same_value_is_not_reported() {
        let base = FinancialMetrics {
            cash: Some(10.0),
            ..Default::default()
        };
        let (merged, audit) = merge_llm_structured_data(&base, &base);
        assert_eq!(merged, base);
        assert!(audit.is_empty());
    }

    #[test]
    fn test_merge_recomputes_derived_free_cash_flow() {
        let mut local = FinancialMetrics {
            operating_cash_flow: Some(100.0),
            investing_cash_flow: Some(-50.0),
            ..Default::default()
        };
        derive_missing_fields(&mut local);
        assert_eq!(local.free_cash_flow, Some(50.0));

        let external = FinancialMetrics {
            operating_cash_flow: Some(300.0),
            ..Default::default()
        };
        let (merged, audit) = merge_and_derive(&local, &external);
        assert_eq!(merged.free_cash_flow, Some(250.0));
        assert_eq!(audit.changes.len(), 1);

        let stated = FinancialMetrics {
            operating_cash_flow: Some(300.0),
            free_cash_flow: Some(180.0),
            ..Default::default()
        };
        let (merged, _) = merge_and_derive(&local, &stated);
        assert_eq!(merged.free_cash_flow, Some(180.0));
    }

    #[test]
    fn test_merge_keeps_reported_free_cash_flow() {
        let local = FinancialMetrics {
            operating_cash_flow: Some(100.0),
            investing_cash_flow: Some(-50.0),
            free_cash_flow: Some(40.0),
            ..Default::default()
        };
        let external = FinancialMetrics {
            investing_cash_flow: Some(-70.0),
            ..Default::default()
        };
        let (merged, _) = merge_and_derive(&local, &external);
        assert_eq!(merged.free_cash_flow, Some(40.0));
    }

    #[test]
    fn test_parse_structured_metrics() {
        let raw = "```json\n{\"metrics\": {\"revenue\": 5000, \"net_income\": null}, \"notes\": \"FY2023\"}\n```";
        let parsed = parse_structured_metrics(raw).unwrap();
        assert_eq!(parsed.metrics.revenue, Some(5000.0));
        assert_eq!(parsed.notes.as_deref(), Some("FY2023"));

        let loose = parse_structured_metrics(r#"{"total_assets": "2,000", "unknown": 5}"#).unwrap();
        assert_eq!(loose.metrics.total_assets, Some(2000.0));
        assert_eq!(loose.metrics.known_count(), 1);

        assert!(parse_structured_metrics("Revenue was strong this year").is_none());
        assert!(parse_structured_metrics(r#"{"comment": "nothing"}"#).is_none());
    }

    #[test]
    fn test_response_schema_is_inlined() {
        let schema = StructuredExtraction::response_schema().unwrap();
        let text = schema.to_string();
        assert!(text.contains("net_income"));
        assert!(!text.contains("$ref"));
        assert!(schema.get("$schema").is_none());
    }
}
