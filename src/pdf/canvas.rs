use pdf_writer::Content;

use crate::fonts::FontSet;

use super::RenderContext;
use super::images::{ImageInfo, ImageStore};
use super::layout::{self, TextStyle};

/// Footer region whose text is only final once the page count is known.
pub(crate) struct PageNumberSlot {
    pub(crate) text: String,
    pub(crate) right_x: f32,
    pub(crate) baseline: f32,
    pub(crate) style: TextStyle,
}

pub(crate) struct PageRecord {
    pub(crate) content: Content,
    pub(crate) number_slot: Option<PageNumberSlot>,
}

impl PageRecord {
    fn new() -> Self {
        Self {
            content: Content::new(),
            number_slot: None,
        }
    }
}

/// Emitted pages plus the resources their content streams reference.
pub(crate) struct Canvas<'a> {
    pub(crate) ctx: &'a RenderContext<'a>,
    pub(crate) fonts: FontSet,
    pub(crate) images: ImageStore,
    pub(crate) pages: Vec<PageRecord>,
    /// Legal disclaimer, wrapped once up front; its height is reserved on every page.
    pub(crate) legal_lines: Vec<String>,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(ctx: &'a RenderContext<'a>, fonts: FontSet) -> Self {
        Self {
            ctx,
            fonts,
            images: ImageStore::default(),
            pages: Vec::new(),
            legal_lines: Vec::new(),
        }
    }

    pub(crate) fn push_page(&mut self) {
        self.pages.push(PageRecord::new());
    }

    fn content(&mut self) -> &mut Content {
        if self.pages.is_empty() {
            self.push_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last].content
    }

    pub(crate) fn set_number_slot(&mut self, slot: PageNumberSlot) {
        if let Some(page) = self.pages.last_mut() {
            page.number_slot = Some(slot);
        }
    }

    pub(crate) fn text(&mut self, style: TextStyle, x: f32, baseline: f32, text: &str) {
        if self.pages.is_empty() {
            self.push_page();
        }
        let last = self.pages.len() - 1;
        layout::show_text(&mut self.pages[last].content, &mut self.fonts, style, x, baseline, text);
    }

    pub(crate) fn text_right(&mut self, style: TextStyle, right_x: f32, baseline: f32, text: &str) {
        let w = self.width(style, text);
        self.text(style, right_x - w, baseline, text);
    }

    pub(crate) fn width(&self, style: TextStyle, text: &str) -> f32 {
        layout::text_width_mm(&self.fonts, style, text)
    }

    pub(crate) fn wrap(&self, style: TextStyle, text: &str, max_width: f32) -> Vec<String> {
        layout::wrap_text(&self.fonts, style, text, max_width)
    }

    pub(crate) fn fit(&self, style: TextStyle, text: &str, max_width: f32) -> String {
        layout::fit_text(&self.fonts, style, text, max_width)
    }

    pub(crate) fn fill_rect(&mut self, x: f32, top: f32, w: f32, h: f32, color: [u8; 3]) {
        layout::fill_rect(self.content(), x, top, w, h, color);
    }

    pub(crate) fn rule(&mut self, x1: f32, x2: f32, y: f32, color: [u8; 3]) {
        layout::horizontal_rule(self.content(), x1, x2, y, color);
    }

    pub(crate) fn image(&mut self, img: &ImageInfo, x: f32, top: f32, w: f32, h: f32) {
        layout::draw_image(self.content(), &img.name, x, top, w, h);
    }

    /// Draw every page's number slot. Runs after the slots hold their final text.
    pub(crate) fn stamp_page_numbers(&mut self) {
        for page in &mut self.pages {
            let Some(slot) = &page.number_slot else {
                continue;
            };
            let w = layout::text_width_mm(&self.fonts, slot.style, &slot.text);
            layout::show_text(
                &mut page.content,
                &mut self.fonts,
                slot.style,
                slot.right_x - w,
                slot.baseline,
                &slot.text,
            );
        }
    }
}
