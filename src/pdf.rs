// Text extraction for page-oriented PDF fact sheets. Kept independent
// of the fetch layer; input is a byte slice, output is plain text.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("malformed PDF document: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("encrypted PDF documents are not supported")]
    Encrypted,
}

/// Text content of a parsed document: one newline-terminated segment
/// per page, pages in page order, items within a page joined by single
/// spaces. A zero-page document extracts to an empty string.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub page_count: usize,
}

/// Parses an in-memory PDF and extracts its text page by page.
pub fn extract_text(bytes: &[u8]) -> Result<ExtractedDocument, ExtractError> {
    let doc = Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        return Err(ExtractError::Encrypted);
    }

    let pages = doc.get_pages();
    let mut text = String::new();
    for page_id in pages.values() {
        let items = page_text_items(&doc, *page_id)?;
        text.push_str(&items.join(" "));
        text.push('\n');
    }

    Ok(ExtractedDocument {
        text,
        page_count: pages.len(),
    })
}

/// Collects the string operands of the text-showing operators (`Tj`,
/// `'`, `"`, `TJ`) from a page's decoded content streams, in stream
/// order.
fn page_text_items(doc: &Document, page_id: ObjectId) -> Result<Vec<String>, ExtractError> {
    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;

    let mut items = Vec::new();
    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tj" | "'" | "\"" => {
                for operand in &operation.operands {
                    if let Object::String(bytes, _) = operand {
                        items.push(decode_text_bytes(bytes));
                    }
                }
            }
            "TJ" => {
                for operand in &operation.operands {
                    if let Object::Array(elements) = operand {
                        for element in elements {
                            if let Object::String(bytes, _) = element {
                                items.push(decode_text_bytes(bytes));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(items)
}

// Fact sheets use standard-font literal strings; full CMap resolution
// is not needed here.
fn decode_text_bytes(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds an in-memory PDF with one page per entry; each entry's
    /// strings become separate text items on that page.
    pub fn fact_sheet_pdf(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 750.into()]),
            ];
            for line in *lines {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content stream"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize PDF");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::fact_sheet_pdf;
    use super::*;

    #[test]
    fn extracts_one_segment_per_page_in_order() {
        let bytes = fact_sheet_pdf(&[
            &["Plan summary", "Estimated Gas Cost: $120"],
            &["Terms apply"],
        ]);

        let doc = extract_text(&bytes).expect("valid document");
        assert_eq!(doc.page_count, 2);
        assert!(doc.text.ends_with('\n'));

        let segments: Vec<&str> = doc.text.split_terminator('\n').collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], "Plan summary Estimated Gas Cost: $120");
        assert_eq!(segments[1], "Terms apply");
    }

    #[test]
    fn page_items_are_joined_with_single_spaces() {
        let bytes = fact_sheet_pdf(&[&["Origin", "Gas", "Plan"]]);
        let doc = extract_text(&bytes).expect("valid document");
        assert_eq!(doc.text, "Origin Gas Plan\n");
    }

    #[test]
    fn zero_pages_extract_to_empty_text() {
        let bytes = fact_sheet_pdf(&[]);
        let doc = extract_text(&bytes).expect("valid document");
        assert_eq!(doc.page_count, 0);
        assert_eq!(doc.text, "");
    }

    #[test]
    fn page_without_text_items_still_gets_its_newline() {
        let bytes = fact_sheet_pdf(&[&[], &["Second page"]]);
        let doc = extract_text(&bytes).expect("valid document");
        assert_eq!(doc.page_count, 2);
        assert_eq!(doc.text, "\nSecond page\n");
    }

    #[test]
    fn malformed_bytes_are_a_parse_error() {
        assert!(matches!(
            extract_text(b"not-a-pdf"),
            Err(ExtractError::Parse(_))
        ));
    }

    #[test]
    fn truncated_document_is_a_parse_error() {
        let mut bytes = fact_sheet_pdf(&[&["Plan summary"]]);
        bytes.truncate(40);
        assert!(extract_text(&bytes).is_err());
    }
}
