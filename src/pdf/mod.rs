mod blocks;
mod canvas;
mod chrome;
mod cursor;
mod images;
mod layout;

use chrono::NaiveDate;
use pdf_writer::{Date, Filter, Name, Pdf, Rect, Ref, TextStr};

use crate::error::Error;
use crate::fonts::FontSet;
use crate::format::{DEFAULT_DATE_FORMAT, format_date};
use crate::model::{AnswerMap, CompanySettings, Form, RenderOptions, SignatureRecord};

pub use blocks::group_number;
pub use cursor::{
    CONTENT_WIDTH_MM, FOOTER_BAND_MM, LayoutCursor, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    PageChrome,
};

use canvas::{Canvas, PageRecord};
use chrome::page_label;
use layout::mm_to_pt;

/// Read-only inputs shared by every stage of one render call.
pub(crate) struct RenderContext<'a> {
    pub(crate) form: &'a Form,
    pub(crate) answers: &'a AnswerMap,
    pub(crate) signatures: &'a [SignatureRecord],
    pub(crate) company: Option<&'a CompanySettings>,
    pub(crate) options: &'a RenderOptions,
    /// Generation date, already formatted.
    pub(crate) generated_on: String,
}

/// Mutable layout state of one render call.
pub(crate) struct Session<'a> {
    pub(crate) cursor: LayoutCursor,
    pub(crate) canvas: Canvas<'a>,
}

/// Rewrite every footer slot with its final `Page n of total` text.
/// Returns the total page count.
pub(crate) fn finalize_page_numbers(pages: &mut [PageRecord]) -> usize {
    let total = pages.len();
    let total_text = total.to_string();
    for (i, page) in pages.iter_mut().enumerate() {
        if let Some(slot) = page.number_slot.as_mut() {
            slot.text = page_label(i + 1, &total_text);
        }
    }
    total
}

pub fn render(
    form: &Form,
    answers: &AnswerMap,
    signatures: &[SignatureRecord],
    company: Option<&CompanySettings>,
    options: &RenderOptions,
) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();

    let generated_date = options
        .generated_at
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let generated_on = format_date(generated_date, &options.date_format).unwrap_or_else(|| {
        log::warn!("Invalid date format {:?}, using {DEFAULT_DATE_FORMAT}", options.date_format);
        generated_date.format(DEFAULT_DATE_FORMAT).to_string()
    });

    let ctx = RenderContext {
        form,
        answers,
        signatures,
        company,
        options,
        generated_on,
    };

    let fonts = FontSet::load(options.font.as_ref())?;
    let t_fonts = t0.elapsed();

    // Pass 1: layout with placeholder page numbers
    let mut canvas = Canvas::new(&ctx, fonts);
    let footer_reserve = canvas.prepare_footer();
    let mut session = Session {
        cursor: LayoutCursor::with_footer_reserve(footer_reserve),
        canvas,
    };
    session.cursor.begin(&mut session.canvas);
    if form.blocks.is_empty() {
        log::warn!("Form '{}' has no blocks; rendering an empty body", form.title);
    }
    session.render_form_description();
    session.render_blocks(&form.blocks);
    session.cursor.finish(&mut session.canvas);
    let t_layout = t0.elapsed();

    // Pass 2: page numbers
    let Session { cursor, mut canvas } = session;
    let total_pages = finalize_page_numbers(&mut canvas.pages);
    debug_assert_eq!(total_pages, cursor.page_count());
    canvas.stamp_page_numbers();
    let t_finalize = t0.elapsed();

    let bytes = write_pdf(canvas, form, generated_date)?;
    let t_assembly = t0.elapsed();

    log::info!(
        "Render phases: fonts={:.1}ms, layout={:.1}ms, finalize={:.1}ms, assembly={:.1}ms ({} pages)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_layout - t_fonts).as_secs_f64() * 1000.0,
        (t_finalize - t_layout).as_secs_f64() * 1000.0,
        (t_assembly - t_finalize).as_secs_f64() * 1000.0,
        total_pages,
    );

    Ok(bytes)
}

fn write_pdf(canvas: Canvas<'_>, form: &Form, generated: NaiveDate) -> Result<Vec<u8>, Error> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    let font_pairs = canvas.fonts.write(&mut pdf, &mut alloc)?;
    let image_pairs = canvas.images.write(&mut pdf, &mut alloc);

    let n = canvas.pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, page) in canvas.pages.into_iter().enumerate() {
        let raw = page.content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    let media_box = Rect::new(0.0, 0.0, mm_to_pt(PAGE_WIDTH_MM), mm_to_pt(PAGE_HEIGHT_MM));
    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(media_box)
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_pairs.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_pairs {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    {
        use chrono::Datelike;
        let mut info = pdf.document_info(info_id);
        info.title(TextStr(&form.title));
        info.creator(TextStr("formsheet-pdf"));
        info.producer(TextStr(concat!("formsheet-pdf ", env!("CARGO_PKG_VERSION"))));
        if let Ok(year) = u16::try_from(generated.year()) {
            info.creation_date(
                Date::new(year)
                    .month(generated.month() as u8)
                    .day(generated.day() as u8),
            );
        }
    }

    Ok(pdf.finish())
}
