//! Per-topic rendering.
//!
//! A topic is drawn by one of two renderer conventions, fixed when the topic
//! is registered:
//!
//! - [`DirectRenderer`] appends its slide straight into the shared deck.
//! - [`StandaloneRenderer`] builds a throwaway one-slide deck that the
//!   composer splices in afterwards.

use std::fmt;
use std::sync::Arc;
use tcfd_core::{ContentRow, Error, GenerationContext, Result};
use tcfd_pptx::Deck;

use crate::generator::ContentGenerator;
use crate::registry::Registry;

/// Draws a topic by appending exactly one slide to a shared deck.
pub trait DirectRenderer: Send + Sync {
    fn render_into(&self, rows: &[ContentRow], deck: &mut Deck) -> Result<()>;
}

/// Draws a topic into a fresh deck of its own.
pub trait StandaloneRenderer: Send + Sync {
    fn render_standalone(&self, rows: &[ContentRow]) -> Result<Deck>;
}

/// A registered renderer tagged with its integration mode.
#[derive(Clone)]
pub enum Renderer {
    Direct(Arc<dyn DirectRenderer>),
    Standalone(Arc<dyn StandaloneRenderer>),
}

impl Renderer {
    /// Register a renderer that appends into the shared deck.
    pub fn direct(renderer: impl DirectRenderer + 'static) -> Self {
        Renderer::Direct(Arc::new(renderer))
    }

    /// Register a renderer that emits its own deck.
    pub fn standalone(renderer: impl StandaloneRenderer + 'static) -> Self {
        Renderer::Standalone(Arc::new(renderer))
    }

    /// Short name of the integration mode, for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Renderer::Direct(_) => "direct",
            Renderer::Standalone(_) => "standalone",
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Renderer::{}", self.mode())
    }
}

/// What rendering one topic produced.
#[derive(Debug)]
pub enum RenderedFragment {
    /// The slide was appended to the shared deck in place.
    Appended,
    /// A one-slide deck waiting to be spliced into the shared deck.
    Standalone(Deck),
}

/// Generates content for a topic and draws it with the topic's renderer.
pub struct FragmentGenerator<'a> {
    registry: &'a Registry,
    generator: &'a ContentGenerator,
}

impl<'a> FragmentGenerator<'a> {
    pub fn new(registry: &'a Registry, generator: &'a ContentGenerator) -> Self {
        Self {
            registry,
            generator,
        }
    }

    /// Render one topic.
    ///
    /// Direct renderers mutate `shared` and must add exactly one slide.
    /// Standalone renderers leave `shared` untouched and return their deck.
    pub fn render(
        &self,
        topic_id: &str,
        context: &GenerationContext,
        shared: &mut Deck,
    ) -> Result<RenderedFragment> {
        let topic = self.registry.get(topic_id)?;
        let renderer = self.registry.renderer(topic_id)?;
        let rows = self.generator.generate(topic, context);
        log::debug!(
            "Rendering {} ({} row(s), {} mode)",
            topic_id,
            rows.len(),
            renderer.mode()
        );

        match renderer {
            Renderer::Direct(direct) => {
                let before = shared.slide_count();
                direct.render_into(&rows, shared)?;
                let added = shared.slide_count().saturating_sub(before);
                if added != 1 {
                    return Err(Error::Template(format!(
                        "direct renderer added {} slide(s), expected exactly one",
                        added
                    )));
                }
                Ok(RenderedFragment::Appended)
            }
            Renderer::Standalone(standalone) => {
                let deck = standalone.render_standalone(&rows)?;
                match deck.slide_count() {
                    0 => Err(Error::Template(
                        "standalone renderer produced an empty deck".to_string(),
                    )),
                    1 => Ok(RenderedFragment::Standalone(deck)),
                    n => {
                        log::warn!(
                            "Standalone deck for {} has {} slides; only the first is kept",
                            topic_id,
                            n
                        );
                        Ok(RenderedFragment::Standalone(deck))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratorConfig;
    use tcfd_core::{TopicCategory, TopicSpec};

    struct Greedy;

    impl DirectRenderer for Greedy {
        fn render_into(&self, _rows: &[ContentRow], deck: &mut Deck) -> Result<()> {
            deck.add_slide();
            deck.add_slide();
            Ok(())
        }
    }

    struct Empty;

    impl StandaloneRenderer for Empty {
        fn render_standalone(&self, _rows: &[ContentRow]) -> Result<Deck> {
            Ok(Deck::new())
        }
    }

    fn registry(renderer: Renderer) -> Registry {
        Registry::builder()
            .renderer("r", renderer)
            .topic(TopicSpec::new("t", "T", "", "r", TopicCategory::General))
            .build()
            .unwrap()
    }

    #[test]
    fn test_direct_must_add_one_slide() {
        let registry = registry(Renderer::direct(Greedy));
        let generator = ContentGenerator::new(GeneratorConfig::default().with_deterministic(true));
        let fragments = FragmentGenerator::new(&registry, &generator);

        let mut deck = Deck::new();
        let err = fragments
            .render("t", &GenerationContext::default(), &mut deck)
            .unwrap_err();
        assert!(err.to_string().contains("2 slide(s)"));
    }

    #[test]
    fn test_standalone_must_not_be_empty() {
        let registry = registry(Renderer::standalone(Empty));
        let generator = ContentGenerator::new(GeneratorConfig::default().with_deterministic(true));
        let fragments = FragmentGenerator::new(&registry, &generator);

        let mut deck = Deck::new();
        assert!(fragments
            .render("t", &GenerationContext::default(), &mut deck)
            .is_err());
        assert_eq!(deck.slide_count(), 0);
    }

    #[test]
    fn test_unknown_topic_is_configuration_error() {
        let registry = registry(Renderer::standalone(Empty));
        let generator = ContentGenerator::new(GeneratorConfig::default());
        let fragments = FragmentGenerator::new(&registry, &generator);

        let mut deck = Deck::new();
        let err = fragments
            .render("nope", &GenerationContext::default(), &mut deck)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
