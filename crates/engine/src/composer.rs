//! Deck composition.
//!
//! Runs every selected topic in registry order, splices standalone fragments
//! into the shared deck and guarantees one slide per topic. Any render
//! failure aborts the run with an error naming the topic; nothing is saved.

use std::path::PathBuf;
use tcfd_core::{Error, GenerationContext, Result};
use tcfd_pptx::{Deck, StyleSeed};

use crate::fragment::{FragmentGenerator, RenderedFragment};
use crate::generator::ContentGenerator;
use crate::persist::{self, SessionContext};
use crate::registry::Registry;

/// Assembles the report deck for one run.
pub struct DeckComposer<'a> {
    registry: &'a Registry,
    generator: &'a ContentGenerator,
    seed: Option<StyleSeed>,
    topics: Option<Vec<String>>,
}

impl<'a> DeckComposer<'a> {
    pub fn new(registry: &'a Registry, generator: &'a ContentGenerator) -> Self {
        Self {
            registry,
            generator,
            seed: None,
            topics: None,
        }
    }

    /// Style the deck with a seed template; its content slides are never used.
    pub fn with_seed(mut self, seed: StyleSeed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Only render these topics. They still run in registry order.
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = Some(topics.into_iter().map(Into::into).collect());
        self
    }

    /// Topic ids this composer will render, in order.
    pub fn planned_topics(&self) -> Result<Vec<&'a str>> {
        let ids = match &self.topics {
            Some(topics) => self.registry.select(topics.as_slice())?,
            None => self.registry.all_topic_ids(),
        };
        if ids.is_empty() {
            return Err(Error::Configuration("no topics selected".to_string()));
        }
        // Resolve every renderer before generating anything.
        for id in &ids {
            self.registry.renderer(id)?;
        }
        Ok(ids)
    }

    /// Build the deck in memory.
    ///
    /// Generator counters are reset first so the logged rates cover this run only.
    pub fn compose(&self, context: &GenerationContext) -> Result<Deck> {
        let topics = self.planned_topics()?;
        self.generator.reset_stats();
        let mut deck = match &self.seed {
            Some(seed) => Deck::from_seed(seed.clone()),
            None => Deck::new(),
        };
        let fragments = FragmentGenerator::new(self.registry, self.generator);

        log::info!("Composing {} topic(s)", topics.len());
        for topic_id in &topics {
            let fragment = fragments
                .render(topic_id, context, &mut deck)
                .map_err(|e| {
                    log::error!("Rendering {} failed: {}", topic_id, e);
                    Error::render(*topic_id, e)
                })?;

            if let RenderedFragment::Standalone(transient) = fragment {
                // Only the shapes move across; layout resources stay with the target.
                let slide = transient.slides().first().ok_or_else(|| {
                    Error::render(
                        *topic_id,
                        Error::Template("standalone deck has no slides".to_string()),
                    )
                })?;
                deck.append_copy_of(slide);
            }
        }

        if deck.slide_count() != topics.len() {
            return Err(Error::Template(format!(
                "composed {} slide(s) for {} topic(s)",
                deck.slide_count(),
                topics.len()
            )));
        }

        let stats = self.generator.stats();
        if stats.parsed() > 0 {
            log::info!(
                "Parse failure rate {:.0}% ({} of {} completion(s) degraded)",
                stats.failure_rate() * 100.0,
                stats.bulleted + stats.truncated,
                stats.parsed()
            );
        }
        if stats.fallback > 0 {
            log::info!("{} topic(s) used deterministic content", stats.fallback);
        }
        Ok(deck)
    }

    /// Build the deck and persist it into the session directory.
    ///
    /// Nothing is written unless every topic rendered.
    pub fn compose_and_save(
        &self,
        context: &GenerationContext,
        session: &SessionContext,
    ) -> Result<PathBuf> {
        let deck = self.compose(context)?;
        let descriptor = session.resolve_path()?;
        let path = persist::save(&deck, &descriptor)?;
        persist::touch_dir(&descriptor.directory);
        log::info!("Saved {} slide(s) to {}", deck.slide_count(), path.display());
        Ok(path)
    }
}
