//! Small generated documents for tests in this crate and its dependents

use lopdf::{content::Content, content::Operation, dictionary, Dictionary, Document, Object, Stream};

/// Create a PDF with one page per entry, each page showing that text
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = build(pages);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture PDF serialises");
    buffer
}

/// Create a PDF with `num_pages` pages labelled "Page N"
pub fn numbered_pdf(num_pages: u32) -> Vec<u8> {
    let labels: Vec<String> = (1..=num_pages).map(|i| format!("Page {}", i)).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    text_pdf(&refs)
}

/// A PDF whose trailer declares standard-handler encryption
pub fn encrypted_pdf() -> Vec<u8> {
    let mut doc = build(&["secret"]);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal(vec![1u8; 16]),
            Object::string_literal(vec![1u8; 16]),
        ]),
    );
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture PDF serialises");
    buffer
}

fn build(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("fixture content encodes"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Count" => page_ids.len() as i64,
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc
}
