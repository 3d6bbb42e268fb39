//! XML report flattening.
//!
//! Parses a report into a small owned element tree, then walks it to produce
//! ordered text fragments. HL7 CDA documents (root tag ending in
//! `ClinicalDocument`) are read section by section; any other XML is walked
//! generically in document order.
//!
//! Tag matching uses local names, so `<cda:section>` and a default
//! `xmlns="urn:hl7-org:v3"` both behave like a bare `<section>`.

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

use super::types::{ExtractedText, ReportExtractor};
use super::ExtractionError;

const CLINICAL_DOCUMENT_SUFFIX: &str = "ClinicalDocument";
const CDA_SECTION: &str = "section";
const CDA_TITLE: &str = "title";
const CDA_TEXT: &str = "text";

/// One parsed element: its tag, the text that precedes its first child
/// element, and its child elements in document order.
///
/// Text that follows a child element (mixed content) is not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Tag name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// First direct child with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    /// All elements below this one, depth-first in document order.
    pub fn descendants(&self) -> Vec<&XmlElement> {
        self.children
            .iter()
            .flat_map(|child| std::iter::once(child).chain(child.descendants()))
            .collect()
    }

    /// Own text, trimmed, if any is left after trimming.
    fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Convert an element into ordered, non-blank text fragments.
pub fn flatten_element(element: &XmlElement) -> Vec<String> {
    if element.local_name().ends_with(CLINICAL_DOCUMENT_SUFFIX) {
        return flatten_clinical_document(element);
    }

    element
        .children
        .iter()
        .flat_map(|child| {
            let own = child.trimmed_text().map(str::to_string);
            own.into_iter().chain(flatten_element(child))
        })
        .collect()
}

/// CDA path: title then body of every `section`, wherever it is nested.
fn flatten_clinical_document(root: &XmlElement) -> Vec<String> {
    root.descendants()
        .into_iter()
        .filter(|e| e.local_name() == CDA_SECTION)
        .flat_map(|section| {
            [section.child(CDA_TITLE), section.child(CDA_TEXT)]
                .into_iter()
                .flatten()
                .filter_map(|part| part.trimmed_text())
                .map(str::to_string)
        })
        .collect()
}

/// Parse XML bytes into an element tree rooted at the document element.
///
/// Fails on anything that is not a single well-formed element tree: syntax
/// errors, mismatched or unclosed tags, text outside the root, or a second
/// root element.
pub fn parse_xml(bytes: &[u8]) -> Result<XmlElement, ExtractionError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut open: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            ExtractionError::InvalidXml(format!(
                "{e} (at byte {})",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(start) => {
                ensure_single_root(&root)?;
                open.push(XmlElement::new(tag_name(start.name())));
            }
            Event::Empty(start) => {
                ensure_single_root(&root)?;
                close_element(XmlElement::new(tag_name(start.name())), &mut open, &mut root);
            }
            Event::End(end) => {
                let element = open.pop().ok_or_else(|| {
                    ExtractionError::InvalidXml(format!(
                        "unexpected closing tag </{}>",
                        tag_name(end.name())
                    ))
                })?;
                close_element(element, &mut open, &mut root);
            }
            Event::Text(text) => {
                let content = text
                    .unescape()
                    .map_err(|e| ExtractionError::InvalidXml(e.to_string()))?;
                append_text(&mut open, &content)?;
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                let content = std::str::from_utf8(&raw)
                    .map_err(|e| ExtractionError::InvalidXml(e.to_string()))?;
                append_text(&mut open, content)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
        buf.clear();
    }

    if let Some(unclosed) = open.last() {
        return Err(ExtractionError::InvalidXml(format!(
            "unexpected end of document: <{}> is not closed",
            unclosed.name
        )));
    }

    root.ok_or_else(|| ExtractionError::InvalidXml("no root element found".into()))
}

fn tag_name(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn ensure_single_root(root: &Option<XmlElement>) -> Result<(), ExtractionError> {
    match root {
        Some(existing) => Err(ExtractionError::InvalidXml(format!(
            "content after the document element <{}>",
            existing.name
        ))),
        None => Ok(()),
    }
}

/// Attach a finished element to its parent, or make it the root.
fn close_element(element: XmlElement, open: &mut [XmlElement], root: &mut Option<XmlElement>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Text only counts as an element's own text until its first child starts.
fn append_text(open: &mut [XmlElement], content: &str) -> Result<(), ExtractionError> {
    match open.last_mut() {
        Some(element) if element.children.is_empty() => {
            element
                .text
                .get_or_insert_with(String::new)
                .push_str(content);
            Ok(())
        }
        Some(_) => Ok(()),
        None if content.trim().is_empty() => Ok(()),
        None => Err(ExtractionError::InvalidXml(
            "text outside the document element".into(),
        )),
    }
}

/// Reads `.xml` reports by flattening the document element.
pub struct XmlTextExtractor;

impl ReportExtractor for XmlTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let root = parse_xml(bytes)?;
        let fragments = flatten_element(&root);
        tracing::debug!(
            root = %root.local_name(),
            fragments = fragments.len(),
            "XML report flattened"
        );
        Ok(ExtractedText::from_fragments(fragments))
    }
}
