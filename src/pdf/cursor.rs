//! Vertical layout state for one render session.
//!
//! All distances are millimetres measured from the top edge of an A4 portrait page.

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
/// Band at the bottom of every page kept free for the footer.
pub const FOOTER_BAND_MM: f32 = 20.0;

/// Page chrome hooks the cursor calls when it crosses a page boundary.
pub trait PageChrome {
    /// Finish the current page (footer).
    fn close_page(&mut self, cursor: &LayoutCursor);
    /// Start the page `cursor.page_index()` and draw its header.
    /// Returns the header height below the top margin.
    fn open_page(&mut self, cursor: &LayoutCursor) -> f32;
}

#[derive(Clone, Debug)]
pub struct LayoutCursor {
    y: f32,
    page_index: usize,
    pages: Vec<usize>,
    footer_reserve: f32,
    page_top: f32,
}

impl Default for LayoutCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCursor {
    pub fn new() -> Self {
        Self::with_footer_reserve(FOOTER_BAND_MM)
    }

    /// Cursor whose bottom reserve is larger than the standard footer band,
    /// e.g. to leave room for a legal disclaimer.
    pub fn with_footer_reserve(footer_reserve: f32) -> Self {
        Self {
            y: MARGIN_MM,
            page_index: 0,
            pages: vec![0],
            footer_reserve: footer_reserve.max(FOOTER_BAND_MM),
            page_top: MARGIN_MM,
        }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[usize] {
        &self.pages
    }

    pub fn footer_reserve(&self) -> f32 {
        self.footer_reserve
    }

    /// Lowest y content may reach on a page.
    pub fn content_bottom(&self) -> f32 {
        PAGE_HEIGHT_MM - self.footer_reserve
    }

    pub fn remaining(&self) -> f32 {
        self.content_bottom() - self.y
    }

    pub fn advance(&mut self, mm: f32) {
        self.y += mm;
    }

    /// Draw the first page's header and place the cursor below it.
    pub fn begin<C: PageChrome + ?Sized>(&mut self, chrome: &mut C) {
        let header_h = chrome.open_page(self);
        self.y = MARGIN_MM + header_h;
        self.page_top = self.y;
    }

    /// Close the last page.
    pub fn finish<C: PageChrome + ?Sized>(&mut self, chrome: &mut C) {
        chrome.close_page(self);
    }

    /// Break to a new page unless `required_mm` still fits above the footer band.
    /// Returns whether a page break occurred.
    ///
    /// A unit taller than an empty page is left on the fresh page it starts on;
    /// this never breaks twice for the same request.
    pub fn ensure_space<C: PageChrome + ?Sized>(&mut self, required_mm: f32, chrome: &mut C) -> bool {
        if self.remaining() >= required_mm {
            return false;
        }
        if self.y <= self.page_top + f32::EPSILON {
            log::debug!(
                "Unit of {required_mm:.1}mm exceeds an empty page ({:.1}mm) on page {}",
                self.remaining(),
                self.page_index + 1,
            );
            return false;
        }

        chrome.close_page(self);
        self.page_index += 1;
        self.pages.push(self.page_index);
        self.y = MARGIN_MM;
        let header_h = chrome.open_page(self);
        self.y = MARGIN_MM + header_h;
        self.page_top = self.y;

        log::debug!(
            "Page break before {required_mm:.1}mm unit, now on page {}",
            self.page_index + 1,
        );
        true
    }
}
