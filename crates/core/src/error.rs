//! Error types for report deck generation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating, rendering or saving a report deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown topic, missing renderer or an invalid registration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The completion service could not produce content.
    ///
    /// The content generator absorbs these and falls back to deterministic
    /// content, so callers of the composer never observe this variant.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Rendering a topic failed. Aborts the whole run.
    #[error("Failed to render topic '{topic_id}': {source}")]
    Render {
        /// Topic whose renderer failed.
        topic_id: String,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// Drawing into a grid or slide was asked to do something impossible.
    #[error("Template error: {0}")]
    Template(String),

    /// The deck could not be persisted after every fallback was tried.
    #[error("Persistence error: {message} (attempted: {})", display_paths(.attempted))]
    Persistence {
        /// Every path that was tried, in order.
        attempted: Vec<PathBuf>,
        /// Last failure reason.
        message: String,
    },

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),
}

impl Error {
    /// Tag an error with the topic that produced it.
    pub fn render(topic_id: impl Into<String>, source: Error) -> Self {
        Error::Render {
            topic_id: topic_id.into(),
            source: Box::new(source),
        }
    }

    /// The failing topic id, if this is a render failure.
    pub fn topic_id(&self) -> Option<&str> {
        match self {
            Error::Render { topic_id, .. } => Some(topic_id),
            _ => None,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_names_topic() {
        let err = Error::render("page_2", Error::Template("row 9 out of range".into()));
        assert_eq!(err.topic_id(), Some("page_2"));
        let msg = err.to_string();
        assert!(msg.contains("page_2"));
        assert!(msg.contains("row 9 out of range"));
    }

    #[test]
    fn test_persistence_error_lists_paths() {
        let err = Error::Persistence {
            attempted: vec![PathBuf::from("/a/TCFD_table.pptx"), PathBuf::from("/a/TCFD_table_1.pptx")],
            message: "locked".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/a/TCFD_table.pptx, /a/TCFD_table_1.pptx"));
    }
}
