//! Recursive rendering of groups, fields and signature blocks.

use serde_json::Value;

use crate::fonts::FontStyle;
use crate::format::format_answer_with;
use crate::model::{Block, Field, FieldType, Group, Signature, SignatureRecord};

use super::Session;
use super::cursor::{CONTENT_WIDTH_MM, MARGIN_MM};
use super::images::ImageInfo;
use super::layout::{PT_PER_MM, TextStyle};

const LINE_H: f32 = 5.0;
const FIELD_MIN_H: f32 = 15.0;
const INLINE_FIELD_ADVANCE: f32 = 6.0;
/// Answers longer than this wrap into the value column even for short field types.
const WRAP_THRESHOLD: usize = 40;
const VALUE_COLUMN_MIN: f32 = 45.0;
const VALUE_COLUMN_MAX: f32 = 90.0;
/// Wider labels move the field to the two-column layout.
const INLINE_LABEL_MAX: f32 = CONTENT_WIDTH_MM * 0.6;

const GROUP_TRAILING: f32 = 5.0;
const DESCRIPTION_LINE_H: f32 = 4.5;

const SIGNATURE_MIN_H: f32 = 30.0;
const SIGNATURE_TRAILING: f32 = 10.0;
const SIGNATURE_IMAGE_W: f32 = 60.0;
const SIGNATURE_IMAGE_MAX_H: f32 = 30.0;
const DEFAULT_SIGNATURE_RATIO: f32 = 0.4;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];
const LIGHT_GRAY: [u8; 3] = [229, 231, 235];
const NEAR_WHITE: [u8; 3] = [246, 247, 249];
const MUTED: [u8; 3] = [100, 100, 100];

const LABEL: TextStyle = TextStyle::new(FontStyle::Bold, 10.0);
const VALUE: TextStyle = TextStyle::new(FontStyle::Regular, 10.0);
const NOTE: TextStyle = TextStyle::new(FontStyle::Italic, 10.0).with_color(MUTED);
const DESCRIPTION: TextStyle = TextStyle::new(FontStyle::Italic, 9.0).with_color(MUTED);

/// Hierarchical number of the group at `index` among its parent's children:
/// `"1"`, `"2"` at the top level, then `"1.1."`, `"1.1.1."` below.
pub fn group_number(parent: Option<&str>, index: usize) -> String {
    match parent {
        None => (index + 1).to_string(),
        Some(parent) => format!("{}.{}.", parent.trim_end_matches('.'), index + 1),
    }
}

/// Title bar appearance; depth 2 and deeper share the last tier.
struct GroupTier {
    background: [u8; 3],
    title: TextStyle,
    bar_height: f32,
}

impl GroupTier {
    fn for_depth(depth: usize, brand: [u8; 3]) -> Self {
        match depth {
            0 => Self {
                background: brand,
                title: TextStyle::new(FontStyle::Bold, 12.0).with_color(WHITE),
                bar_height: 10.0,
            },
            1 => Self {
                background: LIGHT_GRAY,
                title: TextStyle::new(FontStyle::Bold, 11.0).with_color(brand),
                bar_height: 10.0,
            },
            _ => Self {
                background: NEAR_WHITE,
                title: TextStyle::new(FontStyle::Bold, 10.0).with_color(BLACK),
                bar_height: 8.0,
            },
        }
    }
}

/// Outcome of resolving a signature's image.
enum SignatureImage {
    Missing,
    Failed,
    Embedded(ImageInfo, f32, f32),
}

/// Pending work in the block walk. Groups are expanded onto an explicit
/// stack so nesting depth is bounded by memory, not the call stack.
enum Step<'b> {
    Group {
        group: &'b Group,
        number: String,
        depth: usize,
    },
    Field(&'b Field),
    Signature(&'b Signature),
    /// Trailing space once a group's children are exhausted.
    CloseGroup,
}

/// Push `blocks` so that they pop in document order.
fn push_children<'b>(stack: &mut Vec<Step<'b>>, blocks: &'b [Block], parent: Option<&str>, depth: usize) {
    for (index, block) in blocks.iter().enumerate().rev() {
        stack.push(match block {
            Block::Group(group) => Step::Group {
                group,
                number: group_number(parent, index),
                depth,
            },
            Block::Field(field) => Step::Field(field),
            Block::Signature(signature) => Step::Signature(signature),
        });
    }
}

impl Session<'_> {
    pub(super) fn ensure_space(&mut self, required_mm: f32) -> bool {
        self.cursor.ensure_space(required_mm, &mut self.canvas)
    }

    /// Draw pre-wrapped lines one by one, moving to a new page whenever the
    /// next line would reach into the footer reserve.
    pub(super) fn flow_lines(&mut self, style: TextStyle, x: f32, lines: &[String], line_h: f32, baseline: f32) {
        for line in lines {
            if self.cursor.remaining() < line_h {
                self.ensure_space(line_h);
            }
            let y = self.cursor.y();
            self.canvas.text(style, x, y + baseline, line);
            self.cursor.advance(line_h);
        }
    }

    pub(crate) fn render_blocks(&mut self, blocks: &[Block]) {
        let mut stack = Vec::new();
        push_children(&mut stack, blocks, None, 0);
        while let Some(step) = stack.pop() {
            match step {
                Step::Group {
                    group,
                    number,
                    depth,
                } => {
                    self.render_group_header(group, &number, depth);
                    stack.push(Step::CloseGroup);
                    push_children(&mut stack, &group.children, Some(&number), depth + 1);
                }
                Step::Field(field) => self.render_field(field),
                Step::Signature(signature) => self.render_signature(signature),
                Step::CloseGroup => self.cursor.advance(GROUP_TRAILING),
            }
        }
    }

    fn render_group_header(&mut self, group: &Group, number: &str, depth: usize) {
        let tier = GroupTier::for_depth(depth, self.canvas.ctx.options.brand_color);
        let description_lines = group
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| self.canvas.wrap(DESCRIPTION, d, CONTENT_WIDTH_MM - 4.0))
            .unwrap_or_default();
        let description_h = if description_lines.is_empty() {
            0.0
        } else {
            description_lines.len() as f32 * DESCRIPTION_LINE_H + 2.0
        };

        self.ensure_space(tier.bar_height + 2.0 + description_h);
        log::debug!(
            "Group {number} '{}' depth={depth} page={}",
            group.title,
            self.cursor.page_index() + 1,
        );

        let top = self.cursor.y();
        self.canvas
            .fill_rect(MARGIN_MM, top, CONTENT_WIDTH_MM, tier.bar_height, tier.background);
        let label = format!("{number} {}", group.title);
        let label = self.canvas.fit(tier.title, &label, CONTENT_WIDTH_MM - 6.0);
        let cap_height = tier.title.size * 0.72 / PT_PER_MM;
        let baseline = top + (tier.bar_height + cap_height) / 2.0;
        self.canvas.text(tier.title, MARGIN_MM + 3.0, baseline, &label);
        self.cursor.advance(tier.bar_height + 2.0);

        if !description_lines.is_empty() {
            self.flow_lines(DESCRIPTION, MARGIN_MM + 2.0, &description_lines, DESCRIPTION_LINE_H, 3.5);
            self.cursor.advance(2.0);
        }
    }

    fn render_field(&mut self, field: &Field) {
        let ctx = self.canvas.ctx;
        let value = format_answer_with(
            field.field_type,
            ctx.answers.get(&field.title),
            &ctx.options.date_format,
        );
        let label = format!("{}:", field.title);
        let label_w = self.canvas.width(LABEL, &label);
        let value_x = MARGIN_MM + label_w + 2.0;
        let inline = field.field_type != FieldType::LongText
            && value.chars().count() <= WRAP_THRESHOLD
            && label_w <= INLINE_LABEL_MAX
            && self.canvas.width(VALUE, &value) <= MARGIN_MM + CONTENT_WIDTH_MM - value_x;

        if inline {
            self.ensure_space(FIELD_MIN_H);
            let baseline = self.cursor.y() + 4.0;
            self.canvas.text(LABEL, MARGIN_MM, baseline, &label);
            self.canvas.text(VALUE, value_x, baseline, &value);
            self.cursor.advance(INLINE_FIELD_ADVANCE);
            return;
        }

        let column = (label_w + 3.0).clamp(VALUE_COLUMN_MIN, VALUE_COLUMN_MAX);
        let label_lines = self.canvas.wrap(LABEL, &label, column - 3.0);
        let value_lines = self.canvas.wrap(VALUE, &value, CONTENT_WIDTH_MM - column);
        let rows = label_lines.len().max(value_lines.len());
        self.ensure_space((rows as f32 * LINE_H + 2.0).max(FIELD_MIN_H));

        for row in 0..rows {
            // Only an answer taller than a whole page gets here with no room left.
            if self.cursor.remaining() < LINE_H {
                self.ensure_space(LINE_H);
            }
            let baseline = self.cursor.y() + 4.0;
            if let Some(line) = label_lines.get(row) {
                self.canvas.text(LABEL, MARGIN_MM, baseline, line);
            }
            if let Some(line) = value_lines.get(row) {
                self.canvas.text(VALUE, MARGIN_MM + column, baseline, line);
            }
            self.cursor.advance(LINE_H);
        }
        self.cursor.advance(2.0);
    }

    fn render_signature(&mut self, signature: &Signature) {
        let ctx = self.canvas.ctx;
        let record = ctx
            .answers
            .get(&signature.title)
            .and_then(signature_id)
            .and_then(|id| ctx.signatures.iter().find(|r| r.id == id));

        let image = match record {
            Some(record) => self.signature_image(record),
            None => SignatureImage::Missing,
        };
        let body_h = match (record, &image) {
            (None, _) => 6.0,
            (Some(_), SignatureImage::Embedded(_, _, h)) => 6.0 + h + 2.0 + 6.0,
            (Some(_), _) => 6.0 + 6.0 + 6.0,
        };
        self.ensure_space((6.0 + body_h).max(SIGNATURE_MIN_H));

        let y = self.cursor.y();
        let title = self.canvas.fit(LABEL, &signature.title, CONTENT_WIDTH_MM);
        self.canvas.text(LABEL, MARGIN_MM, y + 4.0, &title);
        self.cursor.advance(6.0);

        match record {
            Some(record) => {
                let signatory = if record.title_or_role.is_empty() {
                    format!("Signatory: {}", record.name)
                } else {
                    format!("Signatory: {} - {}", record.name, record.title_or_role)
                };
                let y = self.cursor.y();
                let signatory = self.canvas.fit(VALUE, &signatory, CONTENT_WIDTH_MM);
                self.canvas.text(VALUE, MARGIN_MM, y + 4.0, &signatory);
                self.cursor.advance(6.0);

                let y = self.cursor.y();
                match image {
                    SignatureImage::Embedded(info, w, h) => {
                        self.canvas.image(&info, MARGIN_MM, y, w, h);
                        self.cursor.advance(h + 2.0);
                    }
                    SignatureImage::Failed => {
                        self.canvas.text(NOTE, MARGIN_MM, y + 4.0, "[Signature Image]");
                        self.cursor.advance(6.0);
                    }
                    SignatureImage::Missing => {
                        self.canvas.text(NOTE, MARGIN_MM, y + 4.0, "[Signature]");
                        self.cursor.advance(6.0);
                    }
                }

                if signature.requires_date {
                    let y = self.cursor.y();
                    let date = format!("Date: {}", ctx.generated_on);
                    self.canvas.text(VALUE, MARGIN_MM, y + 4.0, &date);
                    self.cursor.advance(6.0);
                }
            }
            None => {
                let y = self.cursor.y();
                self.canvas.text(NOTE, MARGIN_MM, y + 4.0, "Not signed");
                self.cursor.advance(6.0);
            }
        }

        self.cursor.advance(SIGNATURE_TRAILING);
    }

    fn signature_image(&mut self, record: &SignatureRecord) -> SignatureImage {
        let Some(data) = record.image_data.as_deref() else {
            return SignatureImage::Missing;
        };
        let key = format!("signature-{}", record.id);
        let Some(info) = self.canvas.images.get_or_prepare(&key, data) else {
            return SignatureImage::Failed;
        };
        let ratio = info.aspect_ratio().unwrap_or(DEFAULT_SIGNATURE_RATIO);
        let (mut w, mut h) = (SIGNATURE_IMAGE_W, SIGNATURE_IMAGE_W * ratio);
        if h > SIGNATURE_IMAGE_MAX_H {
            h = SIGNATURE_IMAGE_MAX_H;
            w = h / ratio;
        }
        SignatureImage::Embedded(info, w, h)
    }
}

/// Signature answers hold the record id, usually as a string.
fn signature_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
