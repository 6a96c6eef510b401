//! Built-in aircraft-maintenance inspection form used for smoke tests and demos.

use image::{ImageEncoder, Rgba, RgbaImage};
use serde_json::{Value, json};

use crate::model::{
    AnswerMap, Block, CompanySettings, Field, FieldType, Form, Group, Signature, SignatureRecord,
};

fn group(id: &str, title: &str, description: Option<&str>, children: Vec<Block>) -> Block {
    Block::Group(Group {
        id: id.to_string(),
        title: title.to_string(),
        description: description.map(str::to_string),
        children,
    })
}

fn field(id: &str, title: &str, field_type: FieldType) -> Block {
    choice(id, title, field_type, &[])
}

fn choice(id: &str, title: &str, field_type: FieldType, options: &[&str]) -> Block {
    Block::Field(Field {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        field_type,
        required: true,
        options: options.iter().map(|o| o.to_string()).collect(),
        validation: None,
    })
}

fn signature(id: &str, title: &str) -> Block {
    Block::Signature(Signature {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        requires_date: true,
    })
}

pub fn sample_form() -> Form {
    use FieldType::*;

    Form {
        title: "Aircraft Maintenance Inspection Report".to_string(),
        description: Some(
            "Scheduled inspection record covering aircraft identification, inspection scope, \
             findings, parts and materials, return to service and certification. Complete all \
             sections before releasing the aircraft."
                .to_string(),
        ),
        revision_label: "B".to_string(),
        blocks: vec![
            group(
                "g-aircraft",
                "Aircraft Identification",
                Some("Details as recorded in the aircraft logbook."),
                vec![
                    field("f-registration", "Aircraft Registration", ShortText),
                    choice(
                        "f-type",
                        "Aircraft Type",
                        Dropdown,
                        &["Cessna 172S", "Piper PA-28-181", "Diamond DA40"],
                    ),
                    field("f-serial", "Serial Number", ShortText),
                    field("f-hours", "Total Airframe Hours", Number),
                    field("f-inspection-date", "Date of Inspection", Date),
                ],
            ),
            group(
                "g-scope",
                "Inspection Scope",
                None,
                vec![
                    group(
                        "g-scope-general",
                        "General",
                        None,
                        vec![
                            choice(
                                "f-inspection-type",
                                "Inspection Type",
                                Radio,
                                &["50-hour inspection", "100-hour inspection", "Annual inspection"],
                            ),
                            choice(
                                "f-areas",
                                "Areas Inspected",
                                MultiChoice,
                                &["Engine", "Airframe", "Avionics", "Landing Gear", "Propeller"],
                            ),
                            field("f-work-order", "Work Order Reference", ShortText),
                        ],
                    ),
                    group(
                        "g-scope-engine",
                        "Engine Compartment",
                        Some("Readings taken with the engine at operating temperature."),
                        vec![
                            group(
                                "g-compression",
                                "Cylinder Compression",
                                None,
                                vec![
                                    field("f-cyl1", "Cylinder 1", ShortText),
                                    field("f-cyl2", "Cylinder 2", ShortText),
                                    field("f-cyl3", "Cylinder 3", ShortText),
                                    field("f-cyl4", "Cylinder 4", ShortText),
                                ],
                            ),
                            field("f-oil-pressure", "Oil Pressure (psi)", Number),
                            field("f-mounts", "Engine Mounts Secure", Checkbox),
                            field("f-exhaust", "Exhaust Leak Detected", Checkbox),
                        ],
                    ),
                ],
            ),
            group(
                "g-findings",
                "Findings",
                Some("Record every discrepancy, including those deferred."),
                vec![
                    field("f-defects", "Defects Found", Checkbox),
                    field("f-defect-description", "Defect Description", LongText),
                    choice("f-severity", "Severity", Dropdown, &["Minor", "Major", "Critical"]),
                    field("f-corrective-action", "Corrective Action", LongText),
                ],
            ),
            group(
                "g-parts",
                "Parts and Materials",
                None,
                vec![
                    field("f-parts", "Parts Replaced", LongText),
                    choice(
                        "f-consumables",
                        "Consumables Used",
                        MultiChoice,
                        &["Engine oil", "Safety wire", "Sealant", "Lubricant"],
                    ),
                    field("f-labour", "Labour Hours", Number),
                    field("f-next-due", "Next Inspection Due", Date),
                ],
            ),
            group(
                "g-release",
                "Return to Service",
                None,
                vec![
                    field("f-airworthy", "Aircraft Airworthy", Checkbox),
                    field("f-ground-run", "Ground Run Performed", Checkbox),
                    field("f-test-flight", "Test Flight Date", Date),
                    choice(
                        "f-release-category",
                        "Release Category",
                        Radio,
                        &["Unrestricted", "Restricted", "Ferry only"],
                    ),
                    field("f-remarks", "Remarks", ShortText),
                ],
            ),
            group(
                "g-certification",
                "Certification",
                Some(
                    "The undersigned certify that the work above was carried out in accordance \
                     with the applicable maintenance data.",
                ),
                vec![
                    signature("s-technician", "Technician Signature"),
                    signature("s-inspector", "Inspector Signature"),
                    signature("s-customer", "Customer Acceptance"),
                ],
            ),
        ],
    }
}

pub fn sample_answers() -> AnswerMap {
    let answers = json!({
        "Aircraft Registration": "D-EFGH",
        "Aircraft Type": "Cessna 172S",
        "Serial Number": "172S11234",
        "Total Airframe Hours": 4582.3,
        "Date of Inspection": "2024-03-15",
        "Inspection Type": "100-hour inspection",
        "Areas Inspected": {
            "Engine": true,
            "Airframe": true,
            "Avionics": false,
            "Landing Gear": true,
            "Propeller": true
        },
        "Work Order Reference": "WO-2024-0315-07",
        "Cylinder 1": "74/80",
        "Cylinder 2": "76/80",
        "Cylinder 3": "73/80",
        "Cylinder 4": "75/80",
        "Oil Pressure (psi)": 62,
        "Engine Mounts Secure": true,
        "Exhaust Leak Detected": false,
        "Defects Found": true,
        "Defect Description": "Left main landing gear brake disc worn below minimum thickness. \
            Minor chafing of the fuel line near the firewall pass-through on the right side. \
            Landing light lens cracked; light still operational. Nose wheel tyre showing \
            uneven tread wear consistent with shimmy damper fatigue. Cabin door seal \
            deteriorated at the lower aft corner, allowing draughts in flight.",
        "Severity": "Minor",
        "Corrective Action": "Replaced left brake disc and linings, bled brake system and \
            verified pedal firmness. Re-routed and protected fuel line with new grommet and \
            spiral wrap. Landing light lens replaced. Shimmy damper serviced and nose tyre \
            rotated. Door seal replacement deferred to next scheduled inspection under \
            deferral reference DEF-118.",
        "Parts Replaced": "Brake disc P/N 164-01500 (x1); brake linings P/N 066-10500 (x2); \
            firewall grommet P/N MS35489-7 (x1); landing light lens P/N 0523517-1 (x1); \
            oil filter P/N CH48110-1 (x1)",
        "Consumables Used": {
            "Engine oil": true,
            "Safety wire": true,
            "Sealant": false,
            "Lubricant": true
        },
        "Labour Hours": 12.5,
        "Next Inspection Due": "2024-06-15",
        "Aircraft Airworthy": true,
        "Ground Run Performed": true,
        "Test Flight Date": "",
        "Release Category": "",
        "Remarks": "Door seal deferral noted in the technical log.",
        "Technician Signature": "sig-technician",
        "Inspector Signature": "sig-inspector",
        "Customer Acceptance": "sig-customer"
    });
    match answers {
        Value::Object(map) => map.into_iter().collect(),
        _ => AnswerMap::new(),
    }
}

/// Records for the sample answers. The customer signature is deliberately absent.
pub fn sample_signatures() -> Vec<SignatureRecord> {
    vec![
        SignatureRecord {
            id: "sig-technician".to_string(),
            name: "Jonas Weber".to_string(),
            title_or_role: "B1 Licensed Technician".to_string(),
            image_data: Some(sample_signature_png()),
        },
        SignatureRecord {
            id: "sig-inspector".to_string(),
            name: "Maria Lindqvist".to_string(),
            title_or_role: "Quality Inspector".to_string(),
            image_data: None,
        },
    ]
}

pub fn sample_company() -> CompanySettings {
    CompanySettings {
        name: "Northwind Aero Maintenance GmbH".to_string(),
        address: Some("Hangar 4, Flughafenstrasse 12, 70629 Stuttgart".to_string()),
        phone: Some("+49 711 555 0142".to_string()),
        email: Some("maintenance@northwind-aero.example".to_string()),
        vat_id: Some("DE123456789".to_string()),
        approval_no: Some("DE.145.0321".to_string()),
        logo_image: None,
        legal_footer_text: Some(
            "This report is issued under the organisation's maintenance approval. It may only \
             be reproduced in full. Certification is valid only with the signatures shown."
                .to_string(),
        ),
    }
}

/// A hand-drawn-looking stroke on a transparent background, encoded as PNG.
fn sample_signature_png() -> Vec<u8> {
    let (w, h) = (240u32, 80u32);
    let mut img = RgbaImage::new(w, h);
    let ink = Rgba([20, 40, 120, 255]);
    for x in 10..w - 10 {
        let t = x as f32 / w as f32;
        let y = h as f32 / 2.0 + (t * 18.0).sin() * 22.0 * (1.0 - t * 0.5);
        for dy in -1i32..=1 {
            let py = (y as i32 + dy).clamp(0, h as i32 - 1) as u32;
            img.put_pixel(x, py, ink);
        }
    }

    let mut out = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut out);
    match encoder.write_image(img.as_raw(), w, h, image::ExtendedColorType::Rgba8) {
        Ok(()) => out,
        Err(e) => {
            log::warn!("Cannot encode sample signature: {e}");
            Vec::new()
        }
    }
}
