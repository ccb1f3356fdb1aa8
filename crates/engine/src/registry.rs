//! Topic registry.
//!
//! Maps topic ids to their [`TopicSpec`] and renderer. A registry is built
//! once and never mutated afterwards.

use std::collections::HashMap;
use tcfd_core::prompt::table_template;
use tcfd_core::{Error, Result, TopicCategory, TopicSpec};

use crate::fragment::Renderer;
use crate::tables::{self, TableLayout, ZebraTable};

/// Ordered, immutable set of topics with their renderers.
#[derive(Debug, Clone)]
pub struct Registry {
    topics: Vec<TopicSpec>,
    index: HashMap<String, usize>,
    renderers: HashMap<String, Renderer>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The seven TCFD tables in report order.
    ///
    /// Resource and metrics tables emit standalone decks; the others draw
    /// straight into the shared deck.
    pub fn standard() -> Result<Self> {
        let mut builder = Self::builder();
        for (topic, layout, standalone) in standard_topics() {
            let table = ZebraTable::new(layout);
            let renderer = if standalone {
                Renderer::standalone(table)
            } else {
                Renderer::direct(table)
            };
            builder = builder.renderer(topic.renderer_ref.clone(), renderer).topic(topic);
        }
        builder.build()
    }

    /// Look up a topic.
    pub fn get(&self, topic_id: &str) -> Result<&TopicSpec> {
        self.index
            .get(topic_id)
            .map(|&i| &self.topics[i])
            .ok_or_else(|| Error::Configuration(format!("unknown topic '{}'", topic_id)))
    }

    /// The renderer registered for a topic.
    pub fn renderer(&self, topic_id: &str) -> Result<&Renderer> {
        let topic = self.get(topic_id)?;
        self.renderers.get(&topic.renderer_ref).ok_or_else(|| {
            Error::Configuration(format!(
                "topic '{}' refers to missing renderer '{}'",
                topic_id, topic.renderer_ref
            ))
        })
    }

    /// Topic ids in registry order.
    pub fn all_topic_ids(&self) -> Vec<&str> {
        self.topics.iter().map(|t| t.topic_id.as_str()).collect()
    }

    /// Topics in registry order.
    pub fn topics(&self) -> &[TopicSpec] {
        &self.topics
    }

    /// Restrict to a subset of topics, returned in registry order.
    ///
    /// Duplicates collapse; unknown ids are a configuration error.
    pub fn select(&self, ids: &[impl AsRef<str>]) -> Result<Vec<&str>> {
        let mut wanted = vec![false; self.topics.len()];
        for id in ids {
            let id = id.as_ref();
            let position = self
                .index
                .get(id)
                .ok_or_else(|| Error::Configuration(format!("unknown topic '{}'", id)))?;
            wanted[*position] = true;
        }
        Ok(self
            .topics
            .iter()
            .zip(wanted)
            .filter(|(_, keep)| *keep)
            .map(|(t, _)| t.topic_id.as_str())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Collects topics and renderers, validated by [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    topics: Vec<TopicSpec>,
    renderers: Vec<(String, Renderer)>,
}

impl RegistryBuilder {
    /// Register a named renderer that topics refer to by `renderer_ref`.
    pub fn renderer(mut self, name: impl Into<String>, renderer: Renderer) -> Self {
        self.renderers.push((name.into(), renderer));
        self
    }

    /// Append a topic. Registration order is report order.
    pub fn topic(mut self, topic: TopicSpec) -> Self {
        self.topics.push(topic);
        self
    }

    /// Validate and freeze the registry.
    pub fn build(self) -> Result<Registry> {
        let mut renderers = HashMap::new();
        for (name, renderer) in self.renderers {
            if renderers.insert(name.clone(), renderer).is_some() {
                return Err(Error::Configuration(format!(
                    "renderer '{}' registered twice",
                    name
                )));
            }
        }

        let mut index = HashMap::new();
        for (i, topic) in self.topics.iter().enumerate() {
            if topic.topic_id.trim().is_empty() {
                return Err(Error::Configuration("topic id must not be empty".to_string()));
            }
            if index.insert(topic.topic_id.clone(), i).is_some() {
                return Err(Error::Configuration(format!(
                    "topic '{}' registered twice",
                    topic.topic_id
                )));
            }
            if !renderers.contains_key(&topic.renderer_ref) {
                return Err(Error::Configuration(format!(
                    "topic '{}' refers to missing renderer '{}'",
                    topic.topic_id, topic.renderer_ref
                )));
            }
        }

        log::debug!(
            "Registry built with {} topic(s) and {} renderer(s)",
            self.topics.len(),
            renderers.len()
        );
        Ok(Registry {
            topics: self.topics,
            index,
            renderers,
        })
    }
}

const COLUMNS_RISK: [&str; 3] = ["Risk Description", "Financial Impact", "Mitigation Action"];
const COLUMNS_OPPORTUNITY: [&str; 3] = ["Opportunity Description", "Financial Benefit", "Investment Plan"];

/// Topic specs paired with their table layout and whether they render standalone.
fn standard_topics() -> Vec<(TopicSpec, TableLayout, bool)> {
    vec![
        (
            TopicSpec::new(
                "page_1",
                "Transformation Risks",
                table_template(
                    1,
                    "Transformation Risks",
                    ["Policy & Regulation Risk", "Market & Technology Risk"],
                    COLUMNS_RISK,
                ),
                "table_1",
                TopicCategory::Transition,
            ),
            tables::TRANSFORMATION_RISKS,
            true,
        ),
        (
            TopicSpec::new(
                "page_2",
                "Physical Risks",
                table_template(
                    2,
                    "Physical Risks",
                    ["Acute Risk (Short Term)", "Chronic Risk (Long Term)"],
                    COLUMNS_RISK,
                ),
                "table_2",
                TopicCategory::Physical,
            ),
            tables::PHYSICAL_RISKS,
            false,
        ),
        (
            TopicSpec::new(
                "page_3",
                "Opportunities: Resource & Energy",
                table_template(
                    3,
                    "Opportunities - Resource Efficiency & Energy Source",
                    ["Resource Efficiency", "Energy Source"],
                    COLUMNS_OPPORTUNITY,
                ),
                "table_3",
                TopicCategory::ResourceOpportunity,
            ),
            tables::RESOURCE_OPPORTUNITIES,
            true,
        ),
        (
            TopicSpec::new(
                "page_4",
                "Opportunities: Products & Services",
                table_template(
                    4,
                    "Opportunities - Products & Services and Markets",
                    ["Products & Services", "New Markets & Resilience"],
                    COLUMNS_OPPORTUNITY,
                ),
                "table_4",
                TopicCategory::ProductOpportunity,
            ),
            tables::PRODUCT_OPPORTUNITIES,
            false,
        ),
        (
            TopicSpec::new(
                "page_5",
                "Metrics and Targets",
                table_template(
                    5,
                    "Metrics and Targets",
                    ["GHG Emissions Target", "Other Climate Target"],
                    ["Target Description", "Current Progress", "Action Plan"],
                ),
                "table_5",
                TopicCategory::Metrics,
            ),
            tables::METRICS_TARGETS,
            true,
        ),
        (
            TopicSpec::new(
                "page_6",
                "Systemic Risk Control",
                table_template(
                    6,
                    "Systemic Risk Control",
                    ["Data Integrity (Scope 3)", "Supply Chain Integrity"],
                    ["Mitigation Protocol", "Liability Avoidance / Cost Benefit", "Budget Allocation"],
                ),
                "table_6",
                TopicCategory::Systemic,
            ),
            tables::SYSTEMIC_CONTROL,
            false,
        ),
        (
            TopicSpec::new(
                "page_7",
                "Operational Resilience",
                table_template(
                    7,
                    "Operational Resilience",
                    ["Workforce Adaptation", "Value Chain Security"],
                    ["Adaptation Strategy", "Continuity Benefit (ROI)", "Budget Allocation"],
                ),
                "table_7",
                TopicCategory::Resilience,
            ),
            tables::OPERATIONAL_RESILIENCE,
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ZebraTable;

    fn table() -> Renderer {
        Renderer::direct(ZebraTable::new(tables::METRICS_TARGETS))
    }

    #[test]
    fn test_standard_order() {
        let registry = Registry::standard().unwrap();
        assert_eq!(
            registry.all_topic_ids(),
            vec!["page_1", "page_2", "page_3", "page_4", "page_5", "page_6", "page_7"]
        );
        assert_eq!(registry.get("page_5").unwrap().title, "Metrics and Targets");
        assert!(registry
            .topics()
            .iter()
            .all(|t| t.expected_row_count == 2));
    }

    #[test]
    fn test_standard_modes() {
        let registry = Registry::standard().unwrap();
        let modes: Vec<&str> = registry
            .all_topic_ids()
            .iter()
            .map(|id| registry.renderer(id).unwrap().mode())
            .collect();
        assert_eq!(
            modes,
            vec!["standalone", "direct", "standalone", "direct", "standalone", "direct", "direct"]
        );
    }

    #[test]
    fn test_unknown_topic() {
        let registry = Registry::standard().unwrap();
        assert!(matches!(registry.get("page_9"), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_duplicate_topic_rejected() {
        let result = Registry::builder()
            .renderer("r", table())
            .topic(TopicSpec::new("a", "A", "", "r", TopicCategory::General))
            .topic(TopicSpec::new("a", "A again", "", "r", TopicCategory::General))
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_renderer_rejected() {
        let result = Registry::builder()
            .topic(TopicSpec::new("a", "A", "", "ghost", TopicCategory::General))
            .build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_select_preserves_registry_order() {
        let registry = Registry::standard().unwrap();
        let selected = registry.select(&["page_6", "page_2", "page_6"]).unwrap();
        assert_eq!(selected, vec!["page_2", "page_6"]);
        assert!(registry.select(&["page_0"]).is_err());
    }
}
