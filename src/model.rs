use std::collections::HashMap;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Submitted answers keyed by block title.
pub type AnswerMap = HashMap<String, serde_json::Value>;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub revision_label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Group(Group),
    Field(Field),
    Signature(Signature),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Block>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<String>,
    #[serde(default)]
    pub validation: Option<FieldValidation>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub requires_date: bool,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    ShortText,
    LongText,
    Number,
    Date,
    Checkbox,
    Radio,
    MultiChoice,
    Dropdown,
}

/// Authoring-time constraints. Carried through for completeness, never evaluated here.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title_or_role: String,
    /// Encoded PNG or JPEG bytes.
    #[serde(default, deserialize_with = "deserialize_image")]
    pub image_data: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub vat_id: Option<String>,
    #[serde(default)]
    pub approval_no: Option<String>,
    #[serde(default, deserialize_with = "deserialize_image")]
    pub logo_image: Option<Vec<u8>>,
    #[serde(default)]
    pub legal_footer_text: Option<String>,
}

/// TrueType files used instead of the built-in Helvetica family.
#[derive(Clone, Debug, Deserialize)]
pub struct FontFiles {
    pub regular: PathBuf,
    #[serde(default)]
    pub bold: Option<PathBuf>,
    #[serde(default)]
    pub italic: Option<PathBuf>,
}

pub const DEFAULT_BRAND_COLOR: [u8; 3] = [0x1E, 0x3A, 0x8A];

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub brand_color: [u8; 3],
    /// chrono format string used for date answers and the generation date.
    pub date_format: String,
    pub font: Option<FontFiles>,
    /// Pins the generation date; today's local date when unset.
    pub generated_at: Option<NaiveDate>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            brand_color: DEFAULT_BRAND_COLOR,
            date_format: crate::format::DEFAULT_DATE_FORMAT.to_string(),
            font: None,
            generated_at: None,
        }
    }
}

/// Parse `RRGGBB` or `#RRGGBB`.
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Decode a base64 image payload, with or without a `data:<mime>;base64,` prefix.
pub fn decode_image_payload(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match s.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => s,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact)
}

// Undecodable payloads become empty bytes so the renderer shows its placeholder
// instead of rejecting the whole input.
fn deserialize_image<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    match decode_image_payload(&raw) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) => {
            log::warn!("Image payload is not valid base64 ({e}); keeping placeholder");
            Ok(Some(Vec::new()))
        }
    }
}
