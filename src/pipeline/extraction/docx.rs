use docx_rs::{DocumentChild, InsertChild, Paragraph, ParagraphChild, Run, RunChild};

use super::types::{ExtractedText, ReportExtractor};
use super::ExtractionError;
use crate::pipeline::import::DocumentFormat;

/// Reads `.docx` reports: one fragment per body paragraph, in document order.
/// Tables, headers and footers are not read.
pub struct DocxTextExtractor;

impl ReportExtractor for DocxTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Read {
            format: DocumentFormat::Docx,
            reason: e.to_string(),
        })?;

        let paragraphs = docx
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
                _ => None,
            });

        Ok(ExtractedText::from_fragments(paragraphs))
    }
}

/// Concatenate the text runs of one paragraph, including runs nested in
/// hyperlinks and tracked insertions. Runs are pieces of the same line, so no
/// separator goes between them; explicit line breaks become `\n`.
fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&para.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, text),
            ParagraphChild::Hyperlink(link) => push_children(&link.children, text),
            ParagraphChild::Insert(insert) => {
                for insert_child in &insert.children {
                    if let InsertChild::Run(run) = insert_child {
                        push_run(run, text);
                    }
                }
            }
            // Deleted and moved-away text is not part of the document.
            _ => {}
        }
    }
}

fn push_run(run: &Run, text: &mut String) {
    for run_child in &run.children {
        match run_child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) | RunChild::CarriageReturn(_) => text.push('\n'),
            _ => {}
        }
    }
}
