use pdf_writer::{Content, Name, Str};

use crate::fonts::{FontSet, FontStyle};

use super::cursor::PAGE_HEIGHT_MM;

pub(crate) const PT_PER_MM: f32 = 72.0 / 25.4;

pub(crate) fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

/// PDF y coordinate (points from the bottom) for a distance from the top edge in mm.
pub(crate) fn page_y(top_mm: f32) -> f32 {
    mm_to_pt(PAGE_HEIGHT_MM - top_mm)
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TextStyle {
    pub(crate) font: FontStyle,
    pub(crate) size: f32, // points
    pub(crate) color: [u8; 3],
}

impl TextStyle {
    pub(crate) const fn new(font: FontStyle, size: f32) -> Self {
        Self {
            font,
            size,
            color: [0, 0, 0],
        }
    }

    pub(crate) const fn with_color(self, color: [u8; 3]) -> Self {
        Self { color, ..self }
    }
}

/// Width of `text` in millimetres.
pub(crate) fn text_width_mm(fonts: &FontSet, style: TextStyle, text: &str) -> f32 {
    fonts.text_width(style.font, style.size, text) / PT_PER_MM
}

/// Greedy word wrap into lines no wider than `max_width` mm.
/// Explicit newlines are kept; words longer than a full line are broken by character.
/// Always returns at least one (possibly empty) line.
pub(crate) fn wrap_text(fonts: &FontSet, style: TextStyle, text: &str, max_width: f32) -> Vec<String> {
    let space_w = text_width_mm(fonts, style, " ");
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_w = 0.0f32;

        for word in paragraph.split_whitespace() {
            let word_w = text_width_mm(fonts, style, word);

            if word_w > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let (mut pieces, rest) = break_word(fonts, style, word, max_width);
                lines.append(&mut pieces);
                current_w = text_width_mm(fonts, style, &rest);
                current = rest;
                continue;
            }

            let proposed = if current.is_empty() {
                word_w
            } else {
                current_w + space_w + word_w
            };
            if !current.is_empty() && proposed > max_width {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_w = word_w;
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_w = proposed;
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Split an over-long word into full-width pieces plus the trailing remainder.
fn break_word(fonts: &FontSet, style: TextStyle, word: &str, max_width: f32) -> (Vec<String>, String) {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if current.chars().count() > 1 && text_width_mm(fonts, style, &current) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    (pieces, current)
}

const ELLIPSIS: &str = "...";

/// Truncate `text` with an ellipsis so it fits in `max_width` mm.
pub(crate) fn fit_text(fonts: &FontSet, style: TextStyle, text: &str, max_width: f32) -> String {
    if text_width_mm(fonts, style, text) <= max_width {
        return text.to_string();
    }
    let budget = max_width - text_width_mm(fonts, style, ELLIPSIS);
    if budget < 0.0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0.0f32;
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let w = text_width_mm(fonts, style, ch.encode_utf8(&mut buf));
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    format!("{}{ELLIPSIS}", out.trim_end())
}

fn set_fill(content: &mut Content, [r, g, b]: [u8; 3]) {
    content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

/// Show one line of text with its baseline `baseline_mm` from the top edge.
pub(crate) fn show_text(
    content: &mut Content,
    fonts: &mut FontSet,
    style: TextStyle,
    x_mm: f32,
    baseline_mm: f32,
    text: &str,
) {
    if text.is_empty() {
        return;
    }
    let bytes = fonts.encode(style.font, text);
    let pdf_name = fonts.entry(style.font).pdf_name.clone();

    content.save_state();
    set_fill(content, style.color);
    content.begin_text();
    content.set_font(Name(pdf_name.as_bytes()), style.size);
    content.next_line(mm_to_pt(x_mm), page_y(baseline_mm));
    content.show(Str(&bytes));
    content.end_text();
    content.restore_state();
}

pub(crate) fn fill_rect(content: &mut Content, x_mm: f32, top_mm: f32, w_mm: f32, h_mm: f32, color: [u8; 3]) {
    content.save_state();
    set_fill(content, color);
    content
        .rect(mm_to_pt(x_mm), page_y(top_mm + h_mm), mm_to_pt(w_mm), mm_to_pt(h_mm))
        .fill_nonzero();
    content.restore_state();
}

pub(crate) fn horizontal_rule(content: &mut Content, x1_mm: f32, x2_mm: f32, y_mm: f32, color: [u8; 3]) {
    let [r, g, b] = color;
    content.save_state();
    content.set_stroke_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    content.set_line_width(0.5);
    content.move_to(mm_to_pt(x1_mm), page_y(y_mm));
    content.line_to(mm_to_pt(x2_mm), page_y(y_mm));
    content.stroke();
    content.restore_state();
}

pub(crate) fn draw_image(content: &mut Content, name: &str, x_mm: f32, top_mm: f32, w_mm: f32, h_mm: f32) {
    content.save_state();
    content.transform([
        mm_to_pt(w_mm),
        0.0,
        0.0,
        mm_to_pt(h_mm),
        mm_to_pt(x_mm),
        page_y(top_mm + h_mm),
    ]);
    content.x_object(Name(name.as_bytes()));
    content.restore_state();
}
