// USLM-style XML parser for USC title payloads.
//
// We only care about `<section>` elements and, directly under each, the
// `<num>` and `<heading>`. Everything else inside the section flattens into
// the body text, one line per block element. Namespaces vary between release
// points, so elements match on local name only.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;

use super::models::{StatuteError, StatuteSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Num,
    Heading,
    Body,
}

#[derive(Debug, Default)]
struct SectionBuilder {
    num: Option<String>,
    heading: Option<String>,
    body: String,
    /// Open descendant elements inside the section.
    depth: usize,
    field: Option<Field>,
}

impl SectionBuilder {
    fn push_text(&mut self, text: &str) {
        // `field: None` discards text (e.g. a num whose value already came
        // from the attribute).
        let Some(field) = self.field else {
            return;
        };
        let target = match field {
            Field::Num => self.num.get_or_insert_with(String::new),
            Field::Heading => self.heading.get_or_insert_with(String::new),
            Field::Body => &mut self.body,
        };
        if !target.is_empty() && !target.ends_with('\n') && !target.ends_with(' ') {
            target.push(' ');
        }
        target.push_str(text);
    }

    fn finish(self) -> Option<StatuteSection> {
        let citation = clean_num(self.num.as_deref()?)?;
        Some(StatuteSection {
            citation,
            heading: self.heading.unwrap_or_default().trim().to_string(),
            body: self.body.trim().to_string(),
        })
    }
}

/// Parse a USC title document into normalized sections.
/// Sections without a usable `<num>` are skipped with a warning.
pub fn parse_usc_xml(xml: &str) -> Result<Vec<StatuteSection>, StatuteError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sections = Vec::new();
    let mut skipped = 0usize;
    let mut current: Option<SectionBuilder> = None;

    loop {
        match reader.read_event() {
            Err(e) => return Err(StatuteError::Xml(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => handle_start(&start, &mut current),
            Ok(Event::End(end)) => handle_end(&end, &mut current, &mut sections, &mut skipped),
            Ok(Event::Empty(_)) => {}
            Ok(Event::Text(text)) => {
                if let Some(section) = current.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| StatuteError::Xml(e.to_string()))?;
                    if !text.trim().is_empty() {
                        section.push_text(text.trim());
                    }
                }
            }
            Ok(_) => {}
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped sections without a usable num element");
    }
    if sections.is_empty() {
        return Err(StatuteError::EmptyDocument);
    }
    Ok(sections)
}

fn handle_start(start: &BytesStart<'_>, current: &mut Option<SectionBuilder>) {
    let name = local_name(start.name().as_ref());
    if name == "section" {
        // A section inside a section would be malformed USLM; starting over
        // keeps the parser from wedging on one.
        *current = Some(SectionBuilder::default());
        return;
    }

    if let Some(section) = current.as_mut() {
        if section.depth == 0 {
            section.field = match name.as_str() {
                "num" if section.num.is_none() => {
                    // USLM carries the clean number in the value attribute.
                    // When it is there, the element text is display-only.
                    let mut from_attr = false;
                    if let Ok(Some(attr)) = start.try_get_attribute("value") {
                        if let Ok(value) = attr.unescape_value() {
                            section.num = Some(value.into_owned());
                            from_attr = true;
                        }
                    }
                    if from_attr {
                        None
                    } else {
                        Some(Field::Num)
                    }
                }
                "heading" if section.heading.is_none() => Some(Field::Heading),
                _ => Some(Field::Body),
            };
        }
        section.depth += 1;
    }
}

fn handle_end(
    end: &BytesEnd<'_>,
    current: &mut Option<SectionBuilder>,
    sections: &mut Vec<StatuteSection>,
    skipped: &mut usize,
) {
    let name = local_name(end.name().as_ref());
    if name == "section" {
        if let Some(builder) = current.take() {
            match builder.finish() {
                Some(section) => sections.push(section),
                None => *skipped += 1,
            }
        }
        return;
    }

    if let Some(section) = current.as_mut() {
        section.depth = section.depth.saturating_sub(1);
        if section.depth == 0 {
            section.field = Some(Field::Body);
        }
        // Block boundary: keep paragraphs on their own lines.
        if is_block(&name) && !section.body.is_empty() && !section.body.ends_with('\n') {
            section.body.push('\n');
        }
    }
}

/// Elements whose close marks a line break in the flattened body. Inline
/// markup (`ref`, `i`, `date`...) flows into the surrounding text instead.
fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "paragraph"
            | "subsection"
            | "subparagraph"
            | "clause"
            | "subclause"
            | "item"
            | "chapeau"
            | "continuation"
            | "content"
            | "quotedcontent"
    )
}

fn local_name(qname: &[u8]) -> String {
    let local = qname
        .rsplit(|&b| b == b':')
        .next()
        .unwrap_or(qname);
    String::from_utf8_lossy(local).to_ascii_lowercase()
}

/// Normalize a section number: strip the section sign, whitespace, and a
/// trailing period. `"§ 101."` and `"101"` both come out as `"101"`.
fn clean_num(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_start_matches('§')
        .trim()
        .trim_end_matches('.')
        .trim()
        .to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<uscDoc xmlns="http://xml.house.gov/schemas/uslm/1.0">
  <title>
    <section identifier="/us/usc/t5/s101">
      <num value="101">&#167; 101.</num>
      <heading>Executive departments</heading>
      <content>
        <p>The Executive departments are:</p>
        <p>The Department of State.</p>
      </content>
    </section>
    <section identifier="/us/usc/t5/s102">
      <num>&#167; 102.</num>
      <heading>Military departments</heading>
      <content><p>The military departments are listed here.</p></content>
    </section>
    <section>
      <heading>Orphan without a num</heading>
      <content><p>Should be skipped.</p></content>
    </section>
  </title>
</uscDoc>"#;

    #[test]
    fn test_parses_sections_with_num_attribute_and_text() {
        let sections = parse_usc_xml(SAMPLE).unwrap();
        assert_eq!(sections.len(), 2);

        assert_eq!(sections[0].citation, "101");
        assert_eq!(sections[0].heading, "Executive departments");
        assert!(sections[0].body.contains("The Executive departments are:"));
        assert!(sections[0].body.contains("The Department of State."));

        // No value attribute: fall back to cleaning the element text.
        assert_eq!(sections[1].citation, "102");
    }

    #[test]
    fn test_paragraphs_become_separate_lines() {
        let sections = parse_usc_xml(SAMPLE).unwrap();
        let lines: Vec<&str> = sections[0].body.lines().collect();
        assert_eq!(
            lines,
            vec!["The Executive departments are:", "The Department of State."]
        );
    }

    #[test]
    fn test_sections_without_num_are_skipped() {
        let sections = parse_usc_xml(SAMPLE).unwrap();
        assert!(sections.iter().all(|s| !s.heading.contains("Orphan")));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = parse_usc_xml("<uscDoc><section><num>1</closed-wrong>").unwrap_err();
        assert!(matches!(err, StatuteError::Xml(_)));
    }

    #[test]
    fn test_document_with_no_sections_is_an_error() {
        let err = parse_usc_xml("<uscDoc><title/></uscDoc>").unwrap_err();
        assert!(matches!(err, StatuteError::EmptyDocument));
    }

    #[test]
    fn test_clean_num() {
        assert_eq!(clean_num("§ 101."), Some("101".to_string()));
        assert_eq!(clean_num("842a"), Some("842a".to_string()));
        assert_eq!(clean_num("  § . "), None);
    }
}
