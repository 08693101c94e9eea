//! Rendered markup to Markdown.

use htmd::options::{CodeBlockStyle, HeadingStyle, LinkStyle, Options};
use htmd::HtmlToMarkdown;

use super::normalize;

/// Markdown for a plain-text answer.
///
/// Headings become ATX, code blocks become fenced with the language taken
/// from `language-*` classes. Empty markup, or markup the converter rejects,
/// falls back to `text`.
pub fn to_markdown(markup: &str, text: &str) -> String {
    if markup.trim().is_empty() {
        return normalize(text).trim().to_string();
    }

    let options = Options {
        heading_style: HeadingStyle::Atx,
        code_block_style: CodeBlockStyle::Fenced,
        link_style: LinkStyle::Inlined,
        ..Default::default()
    };
    let converter = HtmlToMarkdown::builder().options(options).build();

    match converter.convert(markup) {
        Ok(markdown) => normalize(&markdown).trim().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Markdown conversion failed, using plain text");
            normalize(text).trim().to_string()
        }
    }
}
