#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use chrono::NaiveDate;
use formsheet_pdf::{
    AnswerMap, Block, CompanySettings, Field, FieldType, Form, Group, RenderOptions, Signature,
    SignatureRecord,
};
use serde_json::Value;

static INIT: Once = Once::new();

/// Route library logs through env_logger once per test binary (`RUST_LOG=debug`).
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn output_dir() -> PathBuf {
    let dir = PathBuf::from("tests/output");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Options with a pinned generation date so output is reproducible.
pub fn pinned_options() -> RenderOptions {
    RenderOptions {
        generated_at: NaiveDate::from_ymd_opt(2024, 6, 1),
        ..RenderOptions::default()
    }
}

pub fn form(title: &str, blocks: Vec<Block>) -> Form {
    Form {
        title: title.to_string(),
        description: None,
        revision_label: "A".to_string(),
        blocks,
    }
}

pub fn group(title: &str, children: Vec<Block>) -> Block {
    Block::Group(Group {
        id: title.to_lowercase().replace(' ', "-"),
        title: title.to_string(),
        description: None,
        children,
    })
}

pub fn field(title: &str, field_type: FieldType) -> Block {
    Block::Field(Field {
        id: title.to_lowercase().replace(' ', "-"),
        title: title.to_string(),
        description: None,
        field_type,
        required: false,
        options: Vec::new(),
        validation: None,
    })
}

pub fn signature(title: &str) -> Block {
    Block::Signature(Signature {
        id: title.to_lowercase().replace(' ', "-"),
        title: title.to_string(),
        description: None,
        requires_date: true,
    })
}

pub fn answers(value: Value) -> AnswerMap {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => panic!("answers must be a JSON object, got {other}"),
    }
}

pub fn render(form: &Form, answers: &AnswerMap, signatures: &[SignatureRecord]) -> Vec<u8> {
    init_logging();
    formsheet_pdf::render_document_with(form, answers, signatures, None, &pinned_options())
        .expect("render")
}

pub fn render_with_company(
    form: &Form,
    answers: &AnswerMap,
    signatures: &[SignatureRecord],
    company: &CompanySettings,
) -> Vec<u8> {
    init_logging();
    formsheet_pdf::render_document_with(form, answers, signatures, Some(company), &pinned_options())
        .expect("render")
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Inflated bodies of every Flate stream in file order.
pub fn streams(pdf: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(at) = find(pdf, b"stream\n", pos) {
        pos = at + b"stream\n".len();
        if at >= 3 && &pdf[at - 3..at] == b"end" {
            continue;
        }
        let Some(end) = find(pdf, b"\nendstream", pos) else {
            break;
        };
        if let Ok(data) = miniz_oxide::inflate::decompress_to_vec_zlib(&pdf[pos..end]) {
            out.push(data);
        }
        pos = end;
    }
    out
}

/// Decompressed page content streams, one per page in page order.
pub fn page_contents(pdf: &[u8]) -> Vec<String> {
    streams(pdf)
        .into_iter()
        .filter(|s| s.starts_with(b"q") && find(s, b"BT", 0).is_some())
        .map(|s| String::from_utf8_lossy(&s).into_owned())
        .collect()
}

/// Strings shown with `Tj`, in drawing order.
pub fn shown_strings(content: &str) -> Vec<String> {
    let bytes = content.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let (text, next) = match bytes[i] {
            b'(' => parse_literal(bytes, i + 1),
            b'<' if bytes.get(i + 1) != Some(&b'<') => parse_hex(bytes, i + 1),
            _ => {
                i += 1;
                continue;
            }
        };
        let rest = &bytes[next.min(bytes.len())..];
        let skip = rest.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if rest[skip..].starts_with(b"Tj") {
            out.push(text);
        }
        i = next;
    }
    out
}

fn parse_literal(bytes: &[u8], mut i: usize) -> (String, usize) {
    let mut text = String::new();
    let mut depth = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                let c = match bytes[i + 1] {
                    b'n' => '\n',
                    b'r' => '\r',
                    b't' => '\t',
                    other => other as char,
                };
                text.push(c);
                i += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' if depth == 0 => return (text, i + 1),
            b')' => depth -= 1,
            _ => {}
        }
        text.push(bytes[i] as char);
        i += 1;
    }
    (text, i)
}

fn parse_hex(bytes: &[u8], mut i: usize) -> (String, usize) {
    let mut digits = Vec::new();
    while i < bytes.len() && bytes[i] != b'>' {
        if bytes[i].is_ascii_hexdigit() {
            digits.push(bytes[i]);
        }
        i += 1;
    }
    let text = digits
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .filter_map(|hex| u8::from_str_radix(hex, 16).ok())
        .map(|b| b as char)
        .collect();
    (text, i + 1)
}

/// Shown strings with the `Td` position (in points) they were drawn at.
pub fn placed_strings(content: &str) -> Vec<(f32, f32, String)> {
    let mut at = (0.0, 0.0);
    let mut out = Vec::new();
    for line in content.lines().map(str::trim) {
        if let Some(args) = line.strip_suffix(" Td") {
            let nums: Vec<f32> = args.split_whitespace().filter_map(|n| n.parse().ok()).collect();
            if let [x, y] = nums[..] {
                at = (x, y);
            }
        } else if line.ends_with("Tj") {
            for text in shown_strings(line) {
                out.push((at.0, at.1, text));
            }
        }
    }
    out
}

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Shown lines made only of the given words, in drawing order.
pub fn word_lines(pdf: &[u8], vocabulary: &[&str]) -> Vec<String> {
    all_text(pdf)
        .into_iter()
        .filter(|t| !t.trim().is_empty() && t.split_whitespace().all(|w| vocabulary.contains(&w)))
        .collect()
}

/// Index of the first page showing `needle` as a whole string.
pub fn page_of(pages: &[Vec<String>], needle: &str) -> Option<usize> {
    pages.iter().position(|texts| texts.iter().any(|t| t == needle))
}

/// Shown text per page.
pub fn page_texts(pdf: &[u8]) -> Vec<Vec<String>> {
    page_contents(pdf).iter().map(|c| shown_strings(c)).collect()
}

pub fn all_text(pdf: &[u8]) -> Vec<String> {
    page_texts(pdf).into_iter().flatten().collect()
}

pub fn contains_text(pdf: &[u8], needle: &str) -> bool {
    all_text(pdf).iter().any(|s| s.contains(needle))
}

/// Value of `/Count` in the page tree.
pub fn page_tree_count(pdf: &[u8]) -> Option<usize> {
    let at = find(pdf, b"/Count ", 0)?;
    let start = at + b"/Count ".len();
    let digits: String = pdf[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .map(|&b| b as char)
        .collect();
    digits.parse().ok()
}
