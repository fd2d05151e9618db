// SRC JSON parser. The SRC ships statutes as flat JSON: either a bare array
// of section objects or an object with a `sections` array. Field names drift
// between exports (`text` vs `body`), so the deserializer accepts both.

use serde::Deserialize;

use super::models::{StatuteError, StatuteSection};

#[derive(Debug, Deserialize)]
struct RawSection {
    citation: String,
    #[serde(default)]
    heading: Option<String>,
    #[serde(alias = "body")]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SrcDocument {
    Sections { sections: Vec<RawSection> },
    Flat(Vec<RawSection>),
}

/// Parse an SRC JSON export into normalized sections.
pub fn parse_src_json(json: &str) -> Result<Vec<StatuteSection>, StatuteError> {
    let document: SrcDocument =
        serde_json::from_str(json).map_err(|e| StatuteError::Json(e.to_string()))?;
    let raw = match document {
        SrcDocument::Sections { sections } => sections,
        SrcDocument::Flat(sections) => sections,
    };

    let mut sections = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;
    for section in raw {
        let citation = section.citation.trim().trim_start_matches('§').trim();
        if citation.is_empty() {
            skipped += 1;
            continue;
        }
        sections.push(StatuteSection {
            citation: citation.to_string(),
            heading: section.heading.unwrap_or_default().trim().to_string(),
            body: section.text.trim().to_string(),
        });
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped SRC sections with empty citations");
    }
    if sections.is_empty() {
        return Err(StatuteError::EmptyDocument);
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_array_shape() {
        let json = r#"[
            {"citation": "1", "heading": "Short title", "text": "This Act may be cited."},
            {"citation": "§ 2", "body": "Definitions go here."}
        ]"#;
        let sections = parse_src_json(json).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].citation, "1");
        assert_eq!(sections[0].heading, "Short title");
        assert_eq!(sections[1].citation, "2");
        assert_eq!(sections[1].heading, "");
        assert_eq!(sections[1].body, "Definitions go here.");
    }

    #[test]
    fn test_wrapped_object_shape() {
        let json = r#"{"sections": [{"citation": "10", "text": "Body."}]}"#;
        let sections = parse_src_json(json).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].citation, "10");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            parse_src_json("{not json").unwrap_err(),
            StatuteError::Json(_)
        ));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(matches!(
            parse_src_json("[]").unwrap_err(),
            StatuteError::EmptyDocument
        ));
        assert!(matches!(
            parse_src_json(r#"[{"citation": "  ", "text": "x"}]"#).unwrap_err(),
            StatuteError::EmptyDocument
        ));
    }
}
