mod common;

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{answers, field, form, group, signature};
use formsheet_pdf::{CompanySettings, FieldType, Form, RenderOptions, SignatureRecord};
use serde_json::json;

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 200, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).expect("encode png");
    out.into_inner()
}

fn record(id: &str, image_data: Option<Vec<u8>>) -> SignatureRecord {
    SignatureRecord {
        id: id.to_string(),
        name: "Ada Byron".to_string(),
        title_or_role: "Inspector".to_string(),
        image_data,
    }
}

/// Shown lines made only of the given words, with their word count.
fn word_count(pdf: &[u8], vocabulary: &[&str]) -> (usize, usize) {
    let lines = common::word_lines(pdf, vocabulary);
    let words = lines.iter().map(|l| l.split_whitespace().count()).sum();
    (lines.len(), words)
}

#[test]
fn empty_form_renders_one_page() {
    let form = form("Empty Checklist", Vec::new());
    let pdf = common::render(&form, &answers(json!({})), &[]);
    let pages = common::page_texts(&pdf);
    assert_eq!(pages.len(), 1);
    assert!(pages[0].iter().any(|t| t == "Empty Checklist"));
    assert!(pages[0].iter().any(|t| t == "Page 1 of 1"));
}

#[test]
fn no_company_means_no_branding() {
    let form = form("Plain", vec![field("Name", FieldType::ShortText)]);
    let pdf = common::render(&form, &answers(json!({"Name": "Lee"})), &[]);
    assert!(!common::contains_text(&pdf, "Tel:"));
    assert!(common::contains_text(&pdf, "Lee"));
}

#[test]
fn branding_lists_contact_details() {
    let form = form("Branded", Vec::new());
    let company = CompanySettings {
        name: "Acme Aviation".to_string(),
        phone: Some("+1 555 0100".to_string()),
        email: Some("ops@acme.example".to_string()),
        vat_id: Some("GB123".to_string()),
        approval_no: Some("UK.145.001".to_string()),
        ..Default::default()
    };
    let pdf = common::render_with_company(&form, &answers(json!({})), &[], &company);
    let text = common::all_text(&pdf);
    for expected in [
        "Acme Aviation",
        "Tel: +1 555 0100",
        "Email: ops@acme.example",
        "VAT: GB123",
        "Approval No.: UK.145.001",
    ] {
        assert!(text.iter().any(|t| t == expected), "missing {expected:?}");
    }
}

#[test]
fn group_numbers_count_all_siblings() {
    let form = form(
        "Numbering",
        vec![
            field("Intro", FieldType::ShortText),
            group(
                "Outer",
                vec![
                    field("A", FieldType::ShortText),
                    group("Inner", vec![group("Deep", vec![group("Deeper", Vec::new())])]),
                ],
            ),
        ],
    );
    let pdf = common::render(&form, &answers(json!({})), &[]);
    for label in ["2 Outer", "2.2. Inner", "2.2.1. Deep", "2.2.1.1. Deeper"] {
        assert!(common::contains_text(&pdf, label), "missing {label:?}");
    }
}

#[test]
fn unanswered_fields_use_placeholders() {
    let form = form(
        "Defaults",
        vec![group(
            "Section",
            vec![
                field("Done", FieldType::Checkbox),
                field("Choice", FieldType::Radio),
                field("Areas", FieldType::MultiChoice),
                field("When", FieldType::Date),
            ],
        )],
    );
    let pdf = common::render(&form, &answers(json!({})), &[]);
    let text = common::all_text(&pdf);
    for expected in ["No", "Not selected", "None selected", "Not specified"] {
        assert!(text.iter().any(|t| t == expected), "missing {expected:?}");
    }
}

#[test]
fn answers_are_matched_by_title() {
    let form = form("Keys", vec![field("Registration", FieldType::ShortText)]);
    let by_id = common::render(&form, &answers(json!({"registration": "N123"})), &[]);
    assert!(!common::contains_text(&by_id, "N123"));

    let by_title = common::render(&form, &answers(json!({"Registration": "N123"})), &[]);
    assert!(common::contains_text(&by_title, "N123"));
}

#[test]
fn long_text_wraps_without_losing_words() {
    let vocabulary = ["alpha", "beta", "gamma", "delta"];
    let text = "alpha beta gamma delta ".repeat(60);
    let form = form("Notes", vec![field("Remarks", FieldType::LongText)]);
    let pdf = common::render(&form, &answers(json!({ "Remarks": text })), &[]);

    let (lines, words) = word_count(&pdf, &vocabulary);
    assert!(lines >= 3, "expected wrapped text, got {lines} lines");
    assert_eq!(words, 240);
    assert_eq!(common::page_texts(&pdf).len(), 1);
}

#[test]
fn text_taller_than_a_page_continues_on_next_page() {
    let vocabulary = ["lorem", "ipsum", "dolor"];
    let text = "lorem ipsum dolor ".repeat(1200);
    let form = form("Overflow", vec![field("Log", FieldType::LongText)]);
    let pdf = common::render(&form, &answers(json!({ "Log": text })), &[]);

    let pages = common::page_texts(&pdf);
    assert!(pages.len() >= 2);
    let (_, words) = word_count(&pdf, &vocabulary);
    assert_eq!(words, 3600);
    for (i, texts) in pages.iter().enumerate() {
        assert!(texts.contains(&format!("Page {} of {}", i + 1, pages.len())));
    }
}

#[test]
fn many_fields_paginate() {
    let fields = (1..=120)
        .map(|i| field(&format!("Item {i}"), FieldType::ShortText))
        .collect();
    let form = form("Long Checklist", vec![group("Items", fields)]);
    let values: serde_json::Map<String, serde_json::Value> = (1..=120)
        .map(|i| (format!("Item {i}"), json!(format!("value {i}"))))
        .collect();
    let pdf = common::render(&form, &values.into_iter().collect(), &[]);

    let pages = common::page_texts(&pdf);
    assert!(pages.len() >= 3);
    assert!(common::contains_text(&pdf, "value 1"));
    assert!(common::contains_text(&pdf, "value 120"));
    assert_eq!(common::page_tree_count(&pdf), Some(pages.len()));
}

#[test]
fn missing_signature_is_not_signed() {
    let form = form("Sign", vec![signature("Approval")]);
    let pdf = common::render(&form, &answers(json!({"Approval": "sig-404"})), &[]);
    assert!(common::contains_text(&pdf, "Not signed"));
    assert!(!common::contains_text(&pdf, "Signatory:"));

    let pdf = common::render(&form, &answers(json!({})), &[]);
    assert!(common::contains_text(&pdf, "Not signed"));
}

#[test]
fn signature_without_image_shows_placeholder() {
    let form = form("Sign", vec![signature("Approval")]);
    let records = [record("sig-1", None)];
    let pdf = common::render(&form, &answers(json!({"Approval": "sig-1"})), &records);
    assert!(common::contains_text(&pdf, "Signatory: Ada Byron - Inspector"));
    assert!(common::contains_text(&pdf, "[Signature]"));
    assert!(common::contains_text(&pdf, "Date: 01/06/2024"));
}

#[test]
fn corrupt_signature_image_falls_back() {
    let form = form("Sign", vec![signature("Approval")]);
    let records = [record("sig-1", Some(vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]))];
    let pdf = common::render(&form, &answers(json!({"Approval": "sig-1"})), &records);
    assert!(common::contains_text(&pdf, "[Signature Image]"));
    assert!(common::contains_text(&pdf, "Signatory: Ada Byron - Inspector"));
}

#[test]
fn signature_image_is_embedded() {
    let form = form("Sign", vec![signature("Approval")]);
    let records = [record("7", Some(png_bytes(120, 40)))];
    let pdf = common::render(&form, &answers(json!({"Approval": 7})), &records);
    assert!(common::contains_text(&pdf, "Signatory: Ada Byron - Inspector"));
    assert!(!common::contains_text(&pdf, "[Signature Image]"));
    let content = &common::page_contents(&pdf)[0];
    assert!(content.contains("/Im1 Do"));
}

#[test]
fn signature_date_can_be_omitted() {
    let mut form = form("Sign", vec![signature("Approval")]);
    if let formsheet_pdf::Block::Signature(sig) = &mut form.blocks[0] {
        sig.requires_date = false;
    }
    let records = [record("sig-1", None)];
    let pdf = common::render(&form, &answers(json!({"Approval": "sig-1"})), &records);
    assert!(!common::contains_text(&pdf, "Date:"));
}

#[test]
fn date_format_option_applies_everywhere() {
    let form = form("Dates", vec![field("Due", FieldType::Date)]);
    let options = RenderOptions {
        date_format: "%Y-%m-%d".to_string(),
        ..common::pinned_options()
    };
    let pdf = formsheet_pdf::render_document_with(
        &form,
        &answers(json!({"Due": "2024-03-15T08:00:00Z"})),
        &[],
        None,
        &options,
    )
    .expect("render");
    assert!(common::contains_text(&pdf, "Generated: 2024-06-01"));
    assert!(common::contains_text(&pdf, "2024-03-15"));
}

#[test]
fn invalid_date_format_falls_back() {
    let form = form("Dates", Vec::new());
    let options = RenderOptions {
        date_format: "%Q".to_string(),
        ..common::pinned_options()
    };
    let pdf = formsheet_pdf::render_document_with(&form, &answers(json!({})), &[], None, &options)
        .expect("render");
    assert!(common::contains_text(&pdf, "Generated: 01/06/2024"));
}

#[test]
fn json_inputs_render() {
    let form: Form = serde_json::from_value(json!({
        "title": "Daily Check",
        "revisionLabel": "C",
        "blocks": [
            {
                "type": "group",
                "id": "g1",
                "title": "Walkaround",
                "children": [
                    {"type": "field", "id": "f1", "title": "Tyres OK", "fieldType": "checkbox"},
                    {
                        "type": "field",
                        "id": "f2",
                        "title": "Fuel",
                        "fieldType": "dropdown",
                        "options": ["Full", "Half"],
                        "validation": {"minLength": 1}
                    }
                ]
            },
            {"type": "signature", "id": "s1", "title": "Pilot"}
        ]
    }))
    .expect("form json");

    let signatures: Vec<SignatureRecord> = serde_json::from_value(json!([
        {
            "id": "p1",
            "name": "Sam Hill",
            "titleOrRole": "Captain",
            "imageData": format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(60, 20)))
        },
        {"id": "p2", "name": "Broken", "imageData": "not base64!"}
    ]))
    .expect("signature json");
    assert_eq!(signatures[1].image_data.as_deref(), Some(&[][..]));

    let answers = answers(json!({"Tyres OK": "yes", "Fuel": "Full", "Pilot": "p1"}));
    let pdf = common::render(&form, &answers, &signatures);
    let text = common::all_text(&pdf);
    let has = |s: &str| text.iter().any(|t| t == s);
    assert!(has("1 Walkaround"));
    assert!(has("Yes"));
    assert!(has("Full"));
    assert!(has("Signatory: Sam Hill - Captain"));
    assert!(has("Daily Check - Rev. C"));
    assert!(!has("[Signature Image]"));
}

#[test]
fn company_json_with_legal_text() {
    let company: CompanySettings = serde_json::from_value(json!({
        "name": "Skyline MRO",
        "vatId": "FR999",
        "legalFooterText": "Certified under Part-145."
    }))
    .expect("company json");
    let form = form("Legal", Vec::new());
    let pdf = common::render_with_company(&form, &answers(json!({})), &[], &company);
    assert!(common::contains_text(&pdf, "VAT: FR999"));
    assert!(common::contains_text(&pdf, "Certified under Part-145."));
}

#[test]
fn values_beside_long_labels_are_not_truncated() {
    let title = "Condition of the hydraulic actuator seals and mounting brackets";
    let value = "SERVICEABLE MINOR WEAR ON SEALS NOTED";
    let form = form("Seals", vec![field(title, FieldType::ShortText)]);
    let pdf = common::render(&form, &answers(json!({ title: value })), &[]);

    let vocabulary: Vec<&str> = value.split_whitespace().collect();
    assert_eq!(common::word_lines(&pdf, &vocabulary).join(" "), value);
    assert!(!common::contains_text(&pdf, "..."));
}

#[test]
fn short_values_stay_beside_their_label() {
    let form = form("Inline", vec![field("Tyre pressure", FieldType::ShortText)]);
    let pdf = common::render(&form, &answers(json!({"Tyre pressure": "42 PSI"})), &[]);
    let content = &common::page_contents(&pdf)[0];
    let placed = common::placed_strings(content);
    let (_, label_y, _) = placed.iter().find(|(_, _, t)| t == "Tyre pressure:").expect("label");
    let (_, value_y, _) = placed.iter().find(|(_, _, t)| t == "42 PSI").expect("value");
    assert_eq!(label_y, value_y);
}

#[test]
fn null_lists_deserialize_as_empty() {
    let form: Form = serde_json::from_value(json!({
        "title": "Nulls",
        "revisionLabel": "A",
        "blocks": [
            {"type": "group", "id": "g1", "title": "Empty Group", "children": null},
            {"type": "field", "id": "f1", "title": "Pick", "fieldType": "radio", "options": null}
        ]
    }))
    .expect("form with null lists");
    assert!(matches!(&form.blocks[0], formsheet_pdf::Block::Group(g) if g.children.is_empty()));
    assert!(matches!(&form.blocks[1], formsheet_pdf::Block::Field(f) if f.options.is_empty()));

    let pdf = common::render(&form, &answers(json!({})), &[]);
    assert!(common::contains_text(&pdf, "1 Empty Group"));
    assert!(common::contains_text(&pdf, "Not selected"));

    let bare: Form = serde_json::from_value(json!({
        "title": "No Blocks",
        "revisionLabel": "A",
        "blocks": null
    }))
    .expect("form with null blocks");
    assert!(bare.blocks.is_empty());
    let pdf = common::render(&bare, &answers(json!({})), &[]);
    assert_eq!(common::page_texts(&pdf).len(), 1);
}
