//! Markup-to-HTML rendering.
//!
//! The parser hands a post body to a [`MarkupRenderer`] and gets back an HTML
//! fragment. Everything after that (link rewriting, code-block annotation,
//! text extraction) works on the fragment, so the renderer is a seam: tests
//! swap in a stub, and the production renderer can be replaced without
//! touching the post pipeline.
//!
//! | Renderer | Use |
//! |---|---|
//! | [`AsciiDocRenderer`] | Built-in AsciiDoc subset, asciidoctor-compatible HTML5 structure |
//!
//! Renderers must produce XHTML-well-formed output (void elements
//! self-closed, attribute values quoted) because the post-processor reads the
//! fragment with a streaming XML reader.

mod asciidoc;

pub use asciidoc::AsciiDocRenderer;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read include {}: {source}", path.display())]
    Include {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Converts a post body into an HTML fragment.
pub trait MarkupRenderer: Sync {
    /// Render `body`. Relative resources (includes) resolve against `base_dir`,
    /// the directory holding the source file.
    fn render(&self, body: &str, base_dir: &Path) -> Result<String, RenderError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Renderer that returns canned HTML and records the bodies it saw.
    pub struct StubRenderer {
        pub html: String,
        pub calls: Mutex<Vec<(String, PathBuf)>>,
    }

    impl StubRenderer {
        pub fn new(html: &str) -> Self {
            Self {
                html: html.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl MarkupRenderer for StubRenderer {
        fn render(&self, body: &str, base_dir: &Path) -> Result<String, RenderError> {
            self.calls
                .lock()
                .unwrap()
                .push((body.to_string(), base_dir.to_path_buf()));
            Ok(self.html.clone())
        }
    }

    #[test]
    fn stub_records_calls() {
        let stub = StubRenderer::new("<p>x</p>");
        let html = stub.render("body", Path::new("/content/blog")).unwrap();
        assert_eq!(html, "<p>x</p>");
        let calls = stub.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, PathBuf::from("/content/blog"));
    }
}
