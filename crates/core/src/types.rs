//! Domain types for topics, generation context and generated content.

use serde::{Deserialize, Serialize};

/// Industry used when the caller supplies none.
pub const DEFAULT_INDUSTRY: &str = "Manufacturing";

/// Revenue used when the caller supplies none.
pub const DEFAULT_REVENUE: &str = "50B USD";

/// Number of text fields carried by every content row.
pub const FIELD_COUNT: usize = 3;

/// Value written into fields the model did not provide.
pub const SENTINEL: &str = "N/A";

/// One section of the composite report.
///
/// Topic specs are defined once when the registry is built and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSpec {
    /// Stable identifier, e.g. `page_1`.
    pub topic_id: String,

    /// Human readable title.
    pub title: String,

    /// Topic-specific part of the instruction sent to the completion service.
    pub instruction_template: String,

    /// Name of the renderer that draws this topic's slide.
    pub renderer_ref: String,

    /// Number of content rows the topic's table expects.
    pub expected_row_count: usize,

    /// Category used to key the deterministic fallback library.
    pub category: TopicCategory,
}

impl TopicSpec {
    /// Create a topic spec.
    pub fn new(
        topic_id: impl Into<String>,
        title: impl Into<String>,
        instruction_template: impl Into<String>,
        renderer_ref: impl Into<String>,
        category: TopicCategory,
    ) -> Self {
        Self {
            topic_id: topic_id.into(),
            title: title.into(),
            instruction_template: instruction_template.into(),
            renderer_ref: renderer_ref.into(),
            expected_row_count: 2,
            category,
        }
    }

    /// Override the expected row count.
    pub fn with_expected_rows(mut self, rows: usize) -> Self {
        self.expected_row_count = rows.max(1);
        self
    }
}

/// Broad kind of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicCategory {
    /// Policy, market and technology transition risks.
    Transition,
    /// Acute and chronic physical risks.
    Physical,
    /// Resource efficiency and energy source opportunities.
    ResourceOpportunity,
    /// Product, service and market opportunities.
    ProductOpportunity,
    /// Metrics and targets.
    Metrics,
    /// Systemic risk control.
    Systemic,
    /// Operational resilience.
    Resilience,
    /// Anything else.
    General,
}

/// Emission figures produced by the carbon calculator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionMetrics {
    /// Total emissions in tCO2e.
    pub total_tco2e: Option<f64>,
    /// Scope 1 emissions in tCO2e.
    pub scope1: Option<f64>,
    /// Scope 2 emissions in tCO2e.
    pub scope2: Option<f64>,
    /// Industry the figures were calculated for, if different from the report's.
    pub industry: Option<String>,
    /// Region of operation.
    pub region: Option<String>,
}

impl EmissionMetrics {
    /// Whether any figure is present.
    pub fn is_empty(&self) -> bool {
        self.total_tco2e.is_none()
            && self.scope1.is_none()
            && self.scope2.is_none()
            && self.industry.is_none()
            && self.region.is_none()
    }
}

/// Caller-supplied parameters for one run. Read-only while the run executes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Industry of the reporting company.
    pub industry: Option<String>,

    /// Revenue, free-form (e.g. `500K USD`).
    pub revenue: Option<String>,

    /// Optional emission figures.
    #[serde(default)]
    pub emissions: Option<EmissionMetrics>,
}

impl GenerationContext {
    /// Create a context for the given industry and revenue.
    pub fn new(industry: impl Into<String>, revenue: impl Into<String>) -> Self {
        Self {
            industry: Some(industry.into()),
            revenue: Some(revenue.into()),
            emissions: None,
        }
    }

    /// Attach emission figures.
    pub fn with_emissions(mut self, emissions: EmissionMetrics) -> Self {
        self.emissions = Some(emissions);
        self
    }

    /// Industry, or the default when unset or blank.
    pub fn industry(&self) -> &str {
        non_blank(self.industry.as_deref()).unwrap_or(DEFAULT_INDUSTRY)
    }

    /// Revenue, or the default when unset or blank.
    pub fn revenue(&self) -> &str {
        non_blank(self.revenue.as_deref()).unwrap_or(DEFAULT_REVENUE)
    }

    /// Total emissions, if known.
    pub fn total_emissions(&self) -> Option<f64> {
        self.emissions.as_ref().and_then(|e| e.total_tco2e)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// One line of generated content: description, impact and action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRow {
    fields: [String; FIELD_COUNT],
}

impl ContentRow {
    /// Create a row from exactly three fields.
    pub fn new(
        description: impl Into<String>,
        impact: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            fields: [description.into(), impact.into(), action.into()],
        }
    }

    /// Build a row from any number of fields.
    ///
    /// Missing fields become [`SENTINEL`]; surplus fields are folded into the
    /// last field joined by ` ; `.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = fields.into_iter().map(Into::into).collect();
        if collected.len() > FIELD_COUNT {
            let tail = collected.split_off(FIELD_COUNT - 1).join(" ; ");
            collected.push(tail);
        }
        let mut fields = collected.into_iter();
        let mut next = || fields.next().unwrap_or_else(|| SENTINEL.to_string());
        Self {
            fields: [next(), next(), next()],
        }
    }

    /// All fields in column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field by index.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// The first field with an optional `label;` prefix removed.
    pub fn description_body(&self) -> &str {
        match self.fields[0].split_once(';') {
            Some((_, body)) => body.trim(),
            None => self.fields[0].trim(),
        }
    }

    /// The optional `label;` prefix of the first field.
    pub fn description_label(&self) -> Option<&str> {
        self.fields[0].split_once(';').map(|(label, _)| label.trim())
    }

    /// Whether every field other than the first is the sentinel.
    pub fn is_degraded(&self) -> bool {
        self.fields[1..].iter().all(|f| f == SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = GenerationContext::default();
        assert_eq!(ctx.industry(), "Manufacturing");
        assert_eq!(ctx.revenue(), "50B USD");

        let ctx = GenerationContext::new("  ", "10M EUR");
        assert_eq!(ctx.industry(), "Manufacturing");
        assert_eq!(ctx.revenue(), "10M EUR");
    }

    #[test]
    fn test_context_from_json() {
        let ctx: GenerationContext = serde_json::from_str(
            r#"{"industry":"Retail","revenue":"5M USD","emissions":{"total_tco2e":42.5}}"#,
        )
        .unwrap();
        assert_eq!(ctx.industry(), "Retail");
        assert_eq!(ctx.total_emissions(), Some(42.5));
    }

    #[test]
    fn test_row_pads_missing_fields() {
        let row = ContentRow::from_fields(["only one"]);
        assert_eq!(row.fields(), &["only one", "N/A", "N/A"]);
        assert!(row.is_degraded());
    }

    #[test]
    fn test_row_folds_surplus_fields() {
        let row = ContentRow::from_fields(["a", "b", "c", "d"]);
        assert_eq!(row.fields(), &["a", "b", "c ; d"]);
    }

    #[test]
    fn test_description_label_split() {
        let row = ContentRow::new("Policy Risk;New carbon tax", "x", "y");
        assert_eq!(row.description_label(), Some("Policy Risk"));
        assert_eq!(row.description_body(), "New carbon tax");

        let row = ContentRow::new("No label here", "x", "y");
        assert_eq!(row.description_label(), None);
        assert_eq!(row.description_body(), "No label here");
    }
}
