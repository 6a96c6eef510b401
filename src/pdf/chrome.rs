//! Per-page header and footer.

use crate::fonts::FontStyle;

use super::Session;
use super::canvas::{Canvas, PageNumberSlot};
use super::cursor::{
    CONTENT_WIDTH_MM, FOOTER_BAND_MM, LayoutCursor, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    PageChrome,
};
use super::layout::TextStyle;

const LOGO_MAX_W: f32 = 30.0;
const LOGO_MAX_H: f32 = 15.0;
const LOGO_KEY: &str = "company-logo";

const DIVIDER: [u8; 3] = [200, 200, 200];
const MUTED: [u8; 3] = [100, 100, 100];

const COMPANY_NAME: TextStyle = TextStyle::new(FontStyle::Bold, 11.0);
const CONTACT: TextStyle = TextStyle::new(FontStyle::Regular, 8.0).with_color(MUTED);
const DOC_TITLE: TextStyle = TextStyle::new(FontStyle::Bold, 16.0);
const DOC_META: TextStyle = TextStyle::new(FontStyle::Regular, 9.0).with_color(MUTED);
const DOC_DESCRIPTION: TextStyle = TextStyle::new(FontStyle::Regular, 10.0);
const FOOTER: TextStyle = TextStyle::new(FontStyle::Regular, 8.0).with_color(MUTED);
const LEGAL: TextStyle = TextStyle::new(FontStyle::Regular, 7.0).with_color(MUTED);
const LEGAL_LINE_H: f32 = 3.2;

/// Baseline of the footer line, inside the reserved band.
const FOOTER_BASELINE: f32 = PAGE_HEIGHT_MM - 10.0;
const FOOTER_RULE_Y: f32 = FOOTER_BASELINE - 5.0;

pub(crate) const TOTAL_PLACEHOLDER: &str = "{total}";

pub(crate) fn page_label(page_num: usize, total: &str) -> String {
    format!("Page {page_num} of {total}")
}

impl Canvas<'_> {
    /// Wrap the legal disclaimer and return the bottom reserve a cursor needs.
    pub(crate) fn prepare_footer(&mut self) -> f32 {
        let legal = self
            .ctx
            .company
            .and_then(|c| c.legal_footer_text.as_deref())
            .filter(|t| !t.trim().is_empty());
        self.legal_lines = match legal {
            Some(text) => self.wrap(LEGAL, text, CONTENT_WIDTH_MM),
            None => Vec::new(),
        };
        FOOTER_BAND_MM + self.legal_height()
    }

    fn legal_height(&self) -> f32 {
        if self.legal_lines.is_empty() {
            0.0
        } else {
            self.legal_lines.len() as f32 * LEGAL_LINE_H + 2.0
        }
    }

    /// Branding block drawn on every page. Returns its height.
    fn draw_branding(&mut self) -> f32 {
        let Some(company) = self.ctx.company else {
            return 0.0;
        };
        let right = PAGE_WIDTH_MM - MARGIN_MM;
        let top = MARGIN_MM;

        let mut logo_h = 0.0f32;
        if let Some(data) = company.logo_image.as_deref() {
            if let Some(logo) = self.images.get_or_prepare(LOGO_KEY, data) {
                let ratio = logo.aspect_ratio().unwrap_or(0.5);
                let (mut w, mut h) = (LOGO_MAX_W, LOGO_MAX_W * ratio);
                if h > LOGO_MAX_H {
                    h = LOGO_MAX_H;
                    w = h / ratio;
                }
                self.image(&logo, MARGIN_MM, top, w, h);
                logo_h = h;
            }
        }

        let mut y = top + 4.0;
        if !company.name.is_empty() {
            self.text_right(COMPANY_NAME, right, y, &company.name);
            y += 4.5;
        }
        let contact_lines = [
            company.address.clone(),
            company.phone.as_ref().map(|p| format!("Tel: {p}")),
            company.email.as_ref().map(|e| format!("Email: {e}")),
            company.vat_id.as_ref().map(|v| format!("VAT: {v}")),
            company.approval_no.as_ref().map(|a| format!("Approval No.: {a}")),
        ];
        for line in contact_lines.into_iter().flatten() {
            for part in line.lines().filter(|l| !l.trim().is_empty()) {
                self.text_right(CONTACT, right, y, part.trim());
                y += 3.5;
            }
        }
        let text_h = y - top;

        let block_h = logo_h.max(text_h);
        let rule_y = top + block_h + 2.0;
        self.rule(MARGIN_MM, right, rule_y, DIVIDER);
        block_h + 5.0
    }

    /// Title, revision and generation date under the branding on the first
    /// page. Returns its height.
    fn draw_title_block(&mut self, top: f32) -> f32 {
        let form = self.ctx.form;
        let right = PAGE_WIDTH_MM - MARGIN_MM;
        let mut y = top;

        for line in self.wrap(DOC_TITLE, &form.title, CONTENT_WIDTH_MM) {
            self.text(DOC_TITLE, MARGIN_MM, y + 6.0, &line);
            y += 7.0;
        }
        y += 2.0;

        if !form.revision_label.is_empty() {
            let revision = format!("Revision: {}", form.revision_label);
            self.text(DOC_META, MARGIN_MM, y + 3.5, &revision);
        }
        let generated = format!("Generated: {}", self.ctx.generated_on);
        self.text_right(DOC_META, right, y + 3.5, &generated);
        y += 6.0;
        y - top
    }

    fn draw_footer(&mut self, page_num: usize) {
        let form = self.ctx.form;
        let right = PAGE_WIDTH_MM - MARGIN_MM;

        if !self.legal_lines.is_empty() {
            let top = PAGE_HEIGHT_MM - FOOTER_BAND_MM - self.legal_height();
            let lines = std::mem::take(&mut self.legal_lines);
            for (i, line) in lines.iter().enumerate() {
                self.text(LEGAL, MARGIN_MM, top + 2.5 + i as f32 * LEGAL_LINE_H, line);
            }
            self.legal_lines = lines;
        }

        self.rule(MARGIN_MM, right, FOOTER_RULE_Y, DIVIDER);

        let left = if form.revision_label.is_empty() {
            form.title.clone()
        } else {
            format!("{} - Rev. {}", form.title, form.revision_label)
        };
        let left = self.fit(FOOTER, &left, CONTENT_WIDTH_MM * 0.7);
        self.text(FOOTER, MARGIN_MM, FOOTER_BASELINE, &left);

        self.set_number_slot(PageNumberSlot {
            text: page_label(page_num, TOTAL_PLACEHOLDER),
            right_x: right,
            baseline: FOOTER_BASELINE,
            style: FOOTER,
        });
    }
}

impl Session<'_> {
    /// Form description and the divider closing the title block. Drawn as body
    /// text so a long description continues on the next page.
    pub(crate) fn render_form_description(&mut self) {
        let form = self.canvas.ctx.form;
        if let Some(description) = form.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let lines = self.canvas.wrap(DOC_DESCRIPTION, description, CONTENT_WIDTH_MM);
            self.flow_lines(DOC_DESCRIPTION, MARGIN_MM, &lines, 5.0, 4.0);
            self.cursor.advance(2.0);
        }
        self.ensure_space(7.0);
        let y = self.cursor.y();
        self.canvas
            .rule(MARGIN_MM, PAGE_WIDTH_MM - MARGIN_MM, y + 1.0, DIVIDER);
        self.cursor.advance(6.0);
    }
}

impl PageChrome for Canvas<'_> {
    fn close_page(&mut self, cursor: &LayoutCursor) {
        self.draw_footer(cursor.page_index() + 1);
    }

    fn open_page(&mut self, cursor: &LayoutCursor) -> f32 {
        self.push_page();
        let mut height = self.draw_branding();
        if cursor.page_index() == 0 {
            height += self.draw_title_block(MARGIN_MM + height);
        }
        height
    }
}
