use proptest::prelude::*;
use std::io::Cursor;
use tcfd_core::{ContentRow, Error, GenerationContext, Result, TopicCategory, TopicSpec};
use tcfd_engine::{
    CompletionError, CompletionRequest, CompletionService, ContentGenerator, DeckComposer,
    DirectRenderer, GeneratorConfig, Registry, Renderer, SessionContext, StandaloneRenderer,
};
use tcfd_pptx::{init_grid, Deck, PptxWriter, Slide, StyleSeed};

/// Draws a one-cell table holding its label.
struct Labelled(&'static str);

impl Labelled {
    fn draw(&self, slide: &mut Slide) -> Result<()> {
        init_grid(slide, 1, 1, &[4.0])?.set_text(0, 0, self.0)
    }
}

impl DirectRenderer for Labelled {
    fn render_into(&self, _rows: &[ContentRow], deck: &mut Deck) -> Result<()> {
        self.draw(deck.add_slide())
    }
}

impl StandaloneRenderer for Labelled {
    fn render_standalone(&self, _rows: &[ContentRow]) -> Result<Deck> {
        let mut deck = Deck::new();
        self.draw(deck.add_slide())?;
        Ok(deck)
    }
}

struct Exploding;

impl DirectRenderer for Exploding {
    fn render_into(&self, _rows: &[ContentRow], _deck: &mut Deck) -> Result<()> {
        Err(Error::Template("renderer blew up".to_string()))
    }
}

struct AlwaysDown;

impl CompletionService for AlwaysDown {
    fn complete(
        &self,
        _model: &str,
        _request: &CompletionRequest,
    ) -> std::result::Result<String, CompletionError> {
        Err(CompletionError::Transport("connection refused".to_string()))
    }
}

const LABELS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

fn labelled_registry(standalone: &[bool]) -> Registry {
    let mut builder = Registry::builder();
    for (&label, &mode) in LABELS.iter().zip(standalone) {
        let renderer = if mode {
            Renderer::standalone(Labelled(label))
        } else {
            Renderer::direct(Labelled(label))
        };
        builder = builder
            .renderer(label, renderer)
            .topic(TopicSpec::new(label, label, "Task", label, TopicCategory::General));
    }
    builder.build().unwrap()
}

fn slide_labels(deck: &Deck) -> Vec<String> {
    deck.slides()
        .iter()
        .map(|slide| {
            slide.tables().next().unwrap().cell(0, 0).unwrap().text().to_string()
        })
        .collect()
}

fn deterministic() -> ContentGenerator {
    ContentGenerator::from_api_key(GeneratorConfig::default(), None).unwrap()
}

#[test]
fn test_mixed_modes_keep_order() {
    let registry = labelled_registry(&[true, false, true]);
    let generator = deterministic();
    let deck = DeckComposer::new(&registry, &generator)
        .compose(&GenerationContext::default())
        .unwrap();
    assert_eq!(slide_labels(&deck), vec!["A", "B", "C"]);
}

#[test]
fn test_failing_topic_aborts_without_output() {
    let registry = Registry::builder()
        .renderer("ok", Renderer::standalone(Labelled("ok")))
        .renderer("boom", Renderer::direct(Exploding))
        .topic(TopicSpec::new("A", "A", "", "ok", TopicCategory::General))
        .topic(TopicSpec::new("B", "B", "", "boom", TopicCategory::General))
        .topic(TopicSpec::new("C", "C", "", "ok", TopicCategory::General))
        .build()
        .unwrap();
    let generator = deterministic();
    let root = tempfile::tempdir().unwrap();
    let session = SessionContext::new(root.path());

    let err = DeckComposer::new(&registry, &generator)
        .compose_and_save(&GenerationContext::default(), &session)
        .unwrap_err();
    assert_eq!(err.topic_id(), Some("B"));
    assert!(err.to_string().contains("'B'"));
    assert!(err.to_string().contains("renderer blew up"));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_deterministic_runs_are_byte_identical() {
    let registry = Registry::standard().unwrap();
    let context = GenerationContext::new("Cement", "12B USD");

    let first = deterministic();
    let second = deterministic();
    let a = DeckComposer::new(&registry, &first).compose(&context).unwrap();
    let b = DeckComposer::new(&registry, &second).compose(&context).unwrap();
    assert_eq!(first.stats().fallback, 7);

    let writer = PptxWriter::new();
    assert_eq!(writer.to_bytes(&a).unwrap(), writer.to_bytes(&b).unwrap());

    let root = tempfile::tempdir().unwrap();
    let p1 = DeckComposer::new(&registry, &first)
        .compose_and_save(&context, &SessionContext::new(root.path()))
        .unwrap();
    let p2 = DeckComposer::new(&registry, &second)
        .compose_and_save(&context, &SessionContext::new(root.path()))
        .unwrap();
    assert_ne!(p1, p2);
    assert_eq!(std::fs::read(p1).unwrap(), std::fs::read(p2).unwrap());
}

#[test]
fn test_fallback_guarantee_when_service_is_down() {
    let registry = Registry::standard().unwrap();
    let generator = ContentGenerator::new(GeneratorConfig::default()).with_service(AlwaysDown);
    let context = GenerationContext::default();
    for topic in registry.topics() {
        let rows = generator.generate(topic, &context);
        assert_eq!(rows.len(), topic.expected_row_count, "{}", topic.topic_id);
    }
    assert_eq!(generator.stats().fallback, registry.len());
}

#[test]
fn test_seed_slides_never_reach_output() {
    let mut baseline = Deck::new();
    for _ in 0..3 {
        Labelled("baseline").draw(baseline.add_slide()).unwrap();
    }
    let bytes = PptxWriter::new().to_bytes(&baseline).unwrap();
    let seed = StyleSeed::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(seed.discarded_slides(), 3);

    let registry = Registry::standard().unwrap();
    let generator = deterministic();
    let deck = DeckComposer::new(&registry, &generator)
        .with_seed(seed)
        .with_topics(["page_5", "page_6"])
        .compose(&GenerationContext::default())
        .unwrap();
    assert_eq!(deck.slide_count(), 2);
    assert!(slide_labels(&deck).iter().all(|label| label != "baseline"));
}

proptest! {
    #[test]
    fn prop_slide_order_ignores_modes(modes in prop::collection::vec(any::<bool>(), 1..=8)) {
        let registry = labelled_registry(&modes);
        let generator = deterministic();
        let deck = DeckComposer::new(&registry, &generator)
            .compose(&GenerationContext::default())
            .unwrap();

        prop_assert_eq!(deck.slide_count(), modes.len());
        let expected: Vec<String> = LABELS[..modes.len()].iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(slide_labels(&deck), expected);
    }
}
