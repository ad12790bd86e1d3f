//! Sentinel-delimited document patching.
//!
//! Fields inside an HTML or CSS document are located by a known
//! prefix/suffix marker pair and rewritten in place; every byte outside
//! the patched span is left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{PlannerError, PlannerResult};

/// A named field bounded by a marker pair, plus its rendered value.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub name: String,
    pub prefix: String,
    pub suffix: String,
    pub value: String,
}

impl FieldBinding {
    pub fn text(
        name: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
            value: value.into(),
        }
    }

    /// Render a numeric value at a fixed decimal precision using the
    /// standard formatter. Dashboard fields use precision 0.
    pub fn numeric(
        name: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        value: f64,
        precision: usize,
    ) -> Self {
        Self::text(name, prefix, suffix, format!("{:.*}", precision, value))
    }
}

/// Result of one patch pass: the updated text and the names of bindings
/// whose marker pair was not found.
#[derive(Debug)]
pub struct PatchOutcome {
    pub text: String,
    pub skipped: Vec<String>,
}

/// Apply each binding in order against the current (possibly
/// already-modified) text. A binding whose prefix or suffix is absent is
/// skipped, never fatal.
pub fn apply(document: &str, bindings: &[FieldBinding]) -> PatchOutcome {
    let mut text = document.to_string();
    let mut skipped = Vec::new();

    for binding in bindings {
        match patch_one(&text, binding) {
            Some(next) => text = next,
            None => skipped.push(binding.name.clone()),
        }
    }

    PatchOutcome { text, skipped }
}

/// Replace the first `prefix ... suffix` span with `prefix value suffix`.
/// The suffix must occur after the located prefix.
fn patch_one(text: &str, binding: &FieldBinding) -> Option<String> {
    let start = text.find(&binding.prefix)?;
    let body = start + binding.prefix.len();
    let rel = text[body..].find(&binding.suffix)?;

    let mut out = String::with_capacity(text.len() + binding.value.len());
    out.push_str(&text[..body]);
    out.push_str(&binding.value);
    out.push_str(&text[body + rel..]);
    Some(out)
}

/// The text strictly between the first `prefix ... suffix` pair, or `None`
/// if either marker is absent. Shared with the dictionary adapter, which
/// pulls fields out of upstream payloads the same way documents are
/// patched.
pub fn extract<'a>(src: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let start = src.find(prefix)? + prefix.len();
    let rel = src[start..].find(suffix)?;
    Some(&src[start..start + rel])
}

/// Every non-overlapping `prefix ... suffix` span in order of appearance.
pub fn extract_all<'a>(src: &'a str, prefix: &str, suffix: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut rest = src;

    while let Some(start) = rest.find(prefix) {
        let body = &rest[start + prefix.len()..];
        match body.find(suffix) {
            Some(rel) => {
                found.push(&body[..rel]);
                rest = &body[rel + suffix.len()..];
            }
            None => break,
        }
    }

    found
}

/// A document on disk: loaded as a whole, patched in memory, persisted
/// back to the same path. Exactly one writer per refresh cycle.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    text: String,
}

impl Document {
    pub fn load<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let text = fs::read_to_string(&path).map_err(|source| PlannerError::Document {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { path, text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Patch the in-memory text; returns the names of skipped bindings so
    /// the caller can log one warning per missing marker pair.
    pub fn apply(&mut self, bindings: &[FieldBinding]) -> Vec<String> {
        let outcome = apply(&self.text, bindings);
        self.text = outcome.text;
        outcome.skipped
    }

    pub fn save(&self) -> PlannerResult<()> {
        fs::write(&self.path, &self.text).map_err(|source| PlannerError::Document {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_binding(value: &str) -> FieldBinding {
        FieldBinding::text(
            "currentTemp",
            "<span id=\"currentTemp\">",
            " &#8457",
            value,
        )
    }

    #[test]
    fn test_replaces_span_between_markers() {
        let doc = "<span id=\"currentTemp\">70 &#8457</span>";
        let outcome = apply(doc, &[temp_binding("48")]);

        assert_eq!(outcome.text, "<span id=\"currentTemp\">48 &#8457</span>");
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_patch_is_idempotent() {
        let doc = "<span id=\"currentTemp\">70 &#8457</span>";
        let bindings = [temp_binding("48")];

        let once = apply(doc, &bindings);
        let twice = apply(&once.text, &bindings);

        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn test_only_first_occurrence_is_patched() {
        let doc = "<p>A</p><p>B</p>";
        let bindings = [FieldBinding::text("p", "<p>", "</p>", "X")];

        let outcome = apply(doc, &bindings);
        assert_eq!(outcome.text, "<p>X</p><p>B</p>");
    }

    #[test]
    fn test_bytes_outside_marker_span_are_untouched() {
        let doc = concat!(
            "<head>untouched</head>",
            "<span id=\"currentTemp\">70 &#8457</span>",
            "<br> <span id=\"currentHumidity\">80 %</span>",
        );
        let outcome = apply(doc, &[temp_binding("48")]);

        assert!(outcome.text.starts_with("<head>untouched</head>"));
        assert!(outcome
            .text
            .ends_with("<br> <span id=\"currentHumidity\">80 %</span>"));
    }

    #[test]
    fn test_missing_prefix_leaves_document_unchanged() {
        let doc = "<span id=\"other\">70 &#8457</span>";
        let outcome = apply(doc, &[temp_binding("48")]);

        assert_eq!(outcome.text, doc);
        assert_eq!(outcome.skipped, vec!["currentTemp".to_string()]);
    }

    #[test]
    fn test_missing_suffix_leaves_document_unchanged() {
        let doc = "<span id=\"currentTemp\">70</span>";
        let outcome = apply(doc, &[temp_binding("48")]);

        assert_eq!(outcome.text, doc);
        assert_eq!(outcome.skipped, vec!["currentTemp".to_string()]);
    }

    #[test]
    fn test_suffix_before_prefix_does_not_match() {
        // The suffix occurs in the document, but only before the prefix.
        let doc = " &#8457 then <span id=\"currentTemp\">70";
        let outcome = apply(doc, &[temp_binding("48")]);

        assert_eq!(outcome.text, doc);
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_skipped_binding_does_not_stop_later_bindings() {
        let doc = "<b>1</b> <i>2</i>";
        let bindings = [
            FieldBinding::text("missing", "<u>", "</u>", "X"),
            FieldBinding::text("italic", "<i>", "</i>", "9"),
        ];

        let outcome = apply(doc, &bindings);
        assert_eq!(outcome.text, "<b>1</b> <i>9</i>");
        assert_eq!(outcome.skipped, vec!["missing".to_string()]);
    }

    #[test]
    fn test_bindings_apply_in_order_to_modified_text() {
        let doc = "<v>old</v>";
        let bindings = [
            FieldBinding::text("first", "<v>", "</v>", "mid"),
            FieldBinding::text("second", "<v>m", "d</v>", "i"),
        ];

        let outcome = apply(doc, &bindings);
        assert_eq!(outcome.text, "<v>mid</v>");
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_numeric_rendering_pins_exact_strings() {
        assert_eq!(
            FieldBinding::numeric("t", "<t>", "</t>", 48.71, 0).value,
            "49"
        );
        assert_eq!(
            FieldBinding::numeric("t", "<t>", "</t>", 70.2, 0).value,
            "70"
        );
        assert_eq!(
            FieldBinding::numeric("t", "<t>", "</t>", 3.14159, 2).value,
            "3.14"
        );
        assert_eq!(FieldBinding::numeric("t", "<t>", "</t>", 96.0, 0).value, "96");
    }

    #[test]
    fn test_extract_between_markers() {
        let rss = "<description><![CDATA[ephemeral]]></description>";
        assert_eq!(extract(rss, "<![CDATA[", "]]>"), Some("ephemeral"));
        assert_eq!(extract(rss, "<missing>", "]]>"), None);
        assert_eq!(extract(rss, "<![CDATA[", "<missing>"), None);
    }

    #[test]
    fn test_extract_all_finds_every_span() {
        let xml = "<dt>:first</dt><x/><dt>:second</dt>";
        assert_eq!(extract_all(xml, "<dt>", "</dt>"), vec![":first", ":second"]);
        assert!(extract_all(xml, "<q>", "</q>").is_empty());
    }

    #[test]
    fn test_document_roundtrip_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("planner.html");
        fs::write(&path, "<span id=\"currentTemp\">70 &#8457</span>").unwrap();

        let mut doc = Document::load(&path).unwrap();
        let skipped = doc.apply(&[temp_binding("48")]);
        assert!(skipped.is_empty());
        doc.save().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "<span id=\"currentTemp\">48 &#8457</span>"
        );
    }

    #[test]
    fn test_document_load_missing_file_reports_path() {
        let err = Document::load("/nonexistent/planner.html").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/planner.html"));
    }
}
