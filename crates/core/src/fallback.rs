//! Deterministic content used when the completion service is unavailable.
//!
//! Rows are keyed by topic category and interpolate the industry and the
//! total emission figure, so identical contexts always produce identical rows.

use crate::types::{ContentRow, GenerationContext, TopicCategory, TopicSpec};

/// Emission total assumed when the caller supplies none.
const DEFAULT_TOTAL_TCO2E: f64 = 100.0;

/// Produce exactly `topic.expected_row_count` rows for a topic.
pub fn fallback_rows(topic: &TopicSpec, context: &GenerationContext) -> Vec<ContentRow> {
    let industry = context.industry();
    let mut rows = library_rows(topic.category, industry, context);

    if rows.len() > topic.expected_row_count {
        rows.truncate(topic.expected_row_count);
    }
    let mut extra = 0;
    while rows.len() < topic.expected_row_count {
        extra += 1;
        rows.push(generic_row(industry, rows.len() + 1, extra));
    }
    rows
}

fn library_rows(
    category: TopicCategory,
    industry: &str,
    context: &GenerationContext,
) -> Vec<ContentRow> {
    match category {
        TopicCategory::Transition => vec![
            ContentRow::new(
                format!("Policy & Regulation Risk;{industry} sector faces new carbon tax regulations"),
                "Financial Impact: $500K-1M annually",
                "Mitigation: Invest in carbon offset programs; Budget: $200K",
            ),
            ContentRow::new(
                format!("Market & Technology Risk;Shift to green technology may disrupt traditional {industry} markets"),
                "Financial Impact: $2M-5M revenue risk",
                "Mitigation: Develop green product lines; Budget: $1M",
            ),
        ],
        TopicCategory::Physical => vec![
            ContentRow::new(
                format!("Acute Risk (Short Term);Extreme weather events affecting {industry} operations"),
                "Financial Impact: $300K-800K per event",
                "Mitigation: Strengthen facility resilience; Budget: $500K",
            ),
            ContentRow::new(
                format!("Chronic Risk (Long Term);Rising temperatures impacting {industry} supply chain"),
                "Financial Impact: $1M-3M annually",
                "Mitigation: Diversify supply sources; Budget: $800K",
            ),
        ],
        TopicCategory::ResourceOpportunity => vec![
            ContentRow::new(
                format!("Resource Efficiency;Implement energy-efficient processes in {industry} operations"),
                "Financial Benefit: $400K-600K annual savings",
                "Investment: Upgrade equipment; Budget: $1.5M",
            ),
            ContentRow::new(
                format!("Energy Source;Transition to renewable energy for {industry} facilities"),
                "Financial Benefit: $200K-400K annual savings",
                "Investment: Solar panel installation; Budget: $2M",
            ),
        ],
        TopicCategory::ProductOpportunity => vec![
            ContentRow::new(
                format!("Products & Services;Develop sustainable {industry} products for green market"),
                "Financial Benefit: $5M-10M new revenue",
                "Investment: R&D and marketing; Budget: $3M",
            ),
            ContentRow::new(
                format!("New Markets & Resilience;Expand {industry} business to climate-resilient regions"),
                "Financial Benefit: $3M-7M new revenue",
                "Investment: Market entry and setup; Budget: $2M",
            ),
        ],
        TopicCategory::Metrics => {
            let total = context.total_emissions().unwrap_or(DEFAULT_TOTAL_TCO2E);
            vec![
                ContentRow::new(
                    format!("GHG Emissions Target;Reduce total emissions by 30% by 2030 (Current: {total:.1} tCO2e)"),
                    "Progress: 15% reduction achieved",
                    "Action Plan: Energy efficiency projects; Budget: $1M",
                ),
                ContentRow::new(
                    "Other Climate Target;Increase renewable energy usage to 50% by 2028",
                    "Progress: 25% renewable energy achieved",
                    "Action Plan: Solar and wind investments; Budget: $2M",
                ),
            ]
        }
        TopicCategory::Systemic => vec![
            ContentRow::new(
                "Industry Certification;Obtain ISO 14001 environmental management certification",
                "Driver: Customer requirements; Gap: Missing documentation",
                "Action: Complete certification process; Budget: $150K",
            ),
            ContentRow::new(
                format!("Supply Chain Visibility;Enhance visibility into {industry} supply chain emissions"),
                "Driver: Regulatory compliance; Gap: Limited supplier data",
                "Action: Implement supplier reporting system; Budget: $300K",
            ),
        ],
        TopicCategory::Resilience => vec![
            ContentRow::new(
                format!("Workforce Capability;Train {industry} workforce on climate adaptation strategies"),
                "Stressor: Climate-related disruptions; Impact: Operational delays",
                "Action: Comprehensive training program; Budget: $200K",
            ),
            ContentRow::new(
                format!("Supply Chain Security;Diversify {industry} supply sources to reduce climate risks"),
                "Stressor: Single-source dependency; Impact: Supply disruptions",
                "Action: Identify and onboard alternative suppliers; Budget: $500K",
            ),
        ],
        TopicCategory::General => vec![generic_row(industry, 1, 1), generic_row(industry, 2, 2)],
    }
}

fn generic_row(industry: &str, position: usize, scale: usize) -> ContentRow {
    let label = char::from(b'A' + ((position - 1) % 26) as u8);
    ContentRow::new(
        format!("{industry} Item {label};Detail {position}"),
        format!("Impact ${}K", scale * 100),
        format!("Action Plan {label};Budget ${}K", 50 + (scale - 1) * 30),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmissionMetrics;

    fn spec(category: TopicCategory, rows: usize) -> TopicSpec {
        TopicSpec::new("t", "T", "", "r", category).with_expected_rows(rows)
    }

    #[test]
    fn test_rows_interpolate_industry() {
        let ctx = GenerationContext::new("Textiles", "1M USD");
        let rows = fallback_rows(&spec(TopicCategory::Transition, 2), &ctx);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].field(0).unwrap().contains("Textiles sector"));
    }

    #[test]
    fn test_metrics_use_total_emissions() {
        let ctx = GenerationContext::default().with_emissions(EmissionMetrics {
            total_tco2e: Some(812.34),
            ..Default::default()
        });
        let rows = fallback_rows(&spec(TopicCategory::Metrics, 2), &ctx);
        assert!(rows[0].field(0).unwrap().contains("Current: 812.3 tCO2e"));

        let rows = fallback_rows(&spec(TopicCategory::Metrics, 2), &GenerationContext::default());
        assert!(rows[0].field(0).unwrap().contains("Current: 100.0 tCO2e"));
    }

    #[test]
    fn test_row_count_always_matches_expected() {
        let ctx = GenerationContext::default();
        for rows in 1..=6 {
            for category in [
                TopicCategory::Transition,
                TopicCategory::Physical,
                TopicCategory::ResourceOpportunity,
                TopicCategory::ProductOpportunity,
                TopicCategory::Metrics,
                TopicCategory::Systemic,
                TopicCategory::Resilience,
                TopicCategory::General,
            ] {
                assert_eq!(fallback_rows(&spec(category, rows), &ctx).len(), rows);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let ctx = GenerationContext::new("Steel", "9B USD");
        let topic = spec(TopicCategory::Resilience, 4);
        assert_eq!(fallback_rows(&topic, &ctx), fallback_rows(&topic, &ctx));
    }
}
