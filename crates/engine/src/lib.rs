//! Report assembly for TCFD slide decks.
//!
//! The [`DeckComposer`] walks the topics of a [`Registry`] in order, asks the
//! [`ContentGenerator`] for rows, renders each topic through its registered
//! renderer and hands the finished deck to [`persist`].

pub mod client;
pub mod composer;
pub mod fragment;
pub mod generator;
pub mod persist;
pub mod registry;
pub mod tables;

pub use client::AnthropicClient;
pub use composer::DeckComposer;
pub use fragment::{
    DirectRenderer, FragmentGenerator, RenderedFragment, Renderer, StandaloneRenderer,
};
pub use generator::{
    CompletionError, CompletionRequest, CompletionService, ContentGenerator, GeneratorConfig,
    ParseStats,
};
pub use persist::{OutputDescriptor, SessionContext};
pub use registry::{Registry, RegistryBuilder};
