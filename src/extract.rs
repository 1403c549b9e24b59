//! Text extraction and normalization.
//!
//! Extraction works on a deep clone of `document.body` so the live page is
//! never mutated. Noise nodes are stripped, an explicit line-break text node
//! is injected after every block-level element (grid layouts would otherwise
//! concatenate adjacent cells), and the serialized text is split into
//! trimmed, non-trivial lines.

use chromiumoxide::Page;
use serde_json::Value;

use crate::error::{ScrapeError, ScrapeResult};

const EXTRACT_SCRIPT: &str = r#"(() => {
    const clone = document.body.cloneNode(true);

    clone.querySelectorAll('script, style, noscript, iframe, nav, footer, header, svg')
        .forEach(el => el.remove());

    // Force newlines after block elements so visually separated content
    // stays separated in the serialized text.
    const blocks = clone.querySelectorAll(
        'div, p, li, br, tr, td, h1, h2, h3, h4, h5, h6, article, section');
    blocks.forEach(el => el.after(document.createTextNode('\n')));

    // innerText is layout-dependent and may be empty on a detached clone;
    // the injected separators make textContent equivalent for our purposes.
    return clone.innerText || clone.textContent || '';
})()"#;

/// Extract the page body as cleaned lines, in document order.
pub async fn extract_lines(page: &Page) -> ScrapeResult<Vec<String>> {
    let value: Value = page
        .evaluate(EXTRACT_SCRIPT)
        .await?
        .into_value()
        .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;

    let raw = match value {
        Value::String(text) => text,
        _ => String::new(),
    };

    Ok(clean_lines(&raw))
}

/// Split serialized text into trimmed lines, dropping empty and
/// single-character noise.
pub fn clean_lines(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|line| line.chars().count() > 1)
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn drops_empty_and_single_char_lines() {
        let raw = "Acme Corp\n\n  \nA\n#\n  Beta Ltd  \n";
        assert_eq!(clean_lines(raw), vec!["Acme Corp", "Beta Ltd"]);
    }

    #[test]
    fn preserves_document_order() {
        let raw = "Zulu\nAlpha\nMike";
        assert_eq!(clean_lines(raw), vec!["Zulu", "Alpha", "Mike"]);
    }

    #[test]
    fn separator_injection_keeps_blocks_distinct() {
        // Two grid cells serialized with the injected separators: the line
        // count must be at least the number of text-bearing blocks.
        let raw = "Acme Corp\n\nBeta Ltd\n\nGamma Inc\n";
        let lines = clean_lines(raw);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(clean_lines("\t  Delta GmbH \u{a0}\n"), vec!["Delta GmbH"]);
    }

    #[test]
    fn multibyte_single_char_is_dropped() {
        // One char, even multi-byte, is below the noise threshold.
        assert_eq!(clean_lines("é\nÉcole\n"), vec!["École"]);
    }
}
