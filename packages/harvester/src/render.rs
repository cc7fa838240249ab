//! Document rendering.
//!
//! The orchestrator hands each extracted chapter to a [`Renderer`].
//! [`HtmlRenderer`] writes a self-contained, print-ready HTML document per
//! municipality; turning that into a PDF is left to the user's tooling.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::sanitize_filename;
use crate::error::RenderError;
use crate::types::{BlockKind, ChapterMetadata, ContentBlock};
use crate::writer::write_atomic;

/// Turns an extracted chapter into an output document.
pub trait Renderer {
    /// Render the chapter and return the path written.
    fn render(
        &mut self,
        metadata: &ChapterMetadata,
        blocks: &[ContentBlock],
    ) -> std::result::Result<PathBuf, RenderError>;
}

/// Escape text for HTML element content and attribute values.
///
/// # Examples
/// ```
/// use ethics_harvester::render::escape_html;
///
/// assert_eq!(escape_html("A & B <c>"), "A &amp; B &lt;c&gt;");
/// ```
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Output file name for a municipality, e.g. `Provo_UT_Ethics_Code.html`.
#[must_use]
pub fn output_file_name(municipality: &str, state: &str) -> String {
    format!(
        "{}_{}_Ethics_Code.html",
        sanitize_filename(municipality),
        sanitize_filename(state)
    )
}

const STYLE: &str = "body { font-family: Georgia, serif; max-width: 48em; margin: 2em auto; line-height: 1.5; }
.metadata { border: 1px solid #999; background: #f5f5f5; padding: 0.75em 1em; margin-bottom: 2em; }
.metadata dt { font-weight: bold; }
.terms { color: #8a4b00; }
li { list-style: none; }
li::before { content: \"\\2022\\00a0\"; }";

/// Writes one HTML document per chapter into an output directory.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    output_dir: PathBuf,
}

impl HtmlRenderer {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build the HTML document.
    #[must_use]
    pub fn document(
        metadata: &ChapterMetadata,
        blocks: &[ContentBlock],
        retrieved: DateTime<Utc>,
    ) -> String {
        let title = format!(
            "{}, {}: {}",
            metadata.municipality, metadata.state, metadata.chapter.title
        );

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
        html.push_str(&format!("<style>\n{STYLE}\n</style>\n</head>\n<body>\n"));
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&title)));

        html.push_str("<dl class=\"metadata\">\n");
        html.push_str(&format!(
            "<dt>Source</dt><dd><a href=\"{0}\">{0}</a></dd>\n",
            escape_html(&metadata.source_url)
        ));
        html.push_str(&format!(
            "<dt>Platform</dt><dd>{}</dd>\n",
            escape_html(metadata.platform.display_name())
        ));
        html.push_str(&format!(
            "<dt>Retrieved</dt><dd>{}</dd>\n",
            retrieved.format("%Y-%m-%d")
        ));
        let terms = if metadata.detected_terms.is_empty() {
            "none".to_string()
        } else {
            metadata
                .detected_terms
                .iter()
                .map(|t| escape_html(t))
                .collect::<Vec<_>>()
                .join(", ")
        };
        html.push_str(&format!(
            "<dt>Discretionary language</dt><dd class=\"terms\">{terms}</dd>\n"
        ));
        html.push_str("</dl>\n");

        for block in blocks {
            html.push_str(&block_html(block));
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

/// One content block as an HTML line.
fn block_html(block: &ContentBlock) -> String {
    let text = escape_html(&block.text);
    let indent = u32::from(block.indent_level) * 2;
    match block.kind {
        BlockKind::Heading => {
            let level = block.indent_level.saturating_add(2).min(6);
            format!("<h{level}>{text}</h{level}>\n")
        }
        BlockKind::Paragraph if block.indent_level == 0 => format!("<p>{text}</p>\n"),
        BlockKind::Paragraph => format!("<p style=\"margin-left: {indent}em\">{text}</p>\n"),
        BlockKind::ListItem => {
            format!("<ul><li style=\"margin-left: {indent}em\">{text}</li></ul>\n")
        }
    }
}

impl Renderer for HtmlRenderer {
    fn render(
        &mut self,
        metadata: &ChapterMetadata,
        blocks: &[ContentBlock],
    ) -> std::result::Result<PathBuf, RenderError> {
        let path = self
            .output_dir
            .join(output_file_name(&metadata.municipality, &metadata.state));
        let content = Self::document(metadata, blocks, Utc::now());

        write_atomic(&path, content.as_bytes())
            .map_err(|e| RenderError::new(&metadata.chapter.title, e))?;

        tracing::debug!(path = %path.display(), blocks = blocks.len(), "Rendered chapter");
        Ok(path)
    }
}
