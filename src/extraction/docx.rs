// Structured document (.docx) paragraph extraction via docx-rs
use docx_rs::{read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild};

use crate::types::ExtractionError;

/// Paragraph text in document order, one line per paragraph.
///
/// Empty paragraphs are kept so blank lines in the source survive. Tables and
/// other non-paragraph blocks are skipped.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = read_docx(bytes).map_err(|e| ExtractionError::Docx(format!("{:?}", e)))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

// Runs within a paragraph are parts of the same sentence, so no separator.
fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&para.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => text.push_str(&t.text),
                        RunChild::Tab(_) => text.push('\t'),
                        RunChild::Break(_) => text.push('\n'),
                        _ => {}
                    }
                }
            }
            // Cross-references ("Schedule A") live inside hyperlinks.
            ParagraphChild::Hyperlink(link) => push_children(&link.children, text),
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use docx_rs::{BreakType, Docx, Hyperlink, HyperlinkType, Run};
    use std::io::Cursor;

    pub(crate) fn make_docx(paragraphs: &[&[&str]]) -> Vec<u8> {
        let mut docx = Docx::new();
        for runs in paragraphs {
            let mut para = Paragraph::new();
            for run in *runs {
                para = para.add_run(Run::new().add_text(*run));
            }
            docx = docx.add_paragraph(para);
        }
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_paragraphs_joined_by_newline() {
        let bytes = make_docx(&[&["WITNESSETH", "-that"], &[], &["Second clause."]]);
        assert_eq!(extract_docx_text(&bytes).unwrap(), "WITNESSETH-that\n\nSecond clause.");
    }

    #[test]
    fn test_hyperlink_text_and_line_breaks_kept() {
        let para = Paragraph::new()
            .add_run(Run::new().add_text("See ["))
            .add_hyperlink(
                Hyperlink::new("schedule_a", HyperlinkType::Anchor)
                    .add_run(Run::new().add_text("Schedule A")),
            )
            .add_run(
                Run::new()
                    .add_text("] hereto.")
                    .add_break(BreakType::TextWrapping)
                    .add_text("Next line"),
            );
        let mut cursor = Cursor::new(Vec::new());
        Docx::new().add_paragraph(para).build().pack(&mut cursor).unwrap();

        assert_eq!(
            extract_docx_text(&cursor.into_inner()).unwrap(),
            "See [Schedule A] hereto.\nNext line"
        );
    }

    #[test]
    fn test_not_a_zip() {
        let err = extract_docx_text(b"plain bytes").unwrap_err();
        assert!(matches!(err, ExtractionError::Docx(_)));
    }
}
