mod error;
mod fonts;
mod format;
pub mod model;
mod pdf;
pub mod sample;

pub use error::Error;
pub use format::{
    DEFAULT_DATE_FORMAT, NONE_SELECTED, NOT_SELECTED, NOT_SPECIFIED, format_answer,
    format_answer_with,
};
pub use model::{
    AnswerMap, Block, CompanySettings, Field, FieldType, FieldValidation, FontFiles, Form, Group,
    RenderOptions, Signature, SignatureRecord,
};
pub use pdf::{
    CONTENT_WIDTH_MM, FOOTER_BAND_MM, LayoutCursor, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    PageChrome, group_number,
};

use std::path::Path;
use std::time::Instant;

use serde::de::DeserializeOwned;

/// Render a form and its answers to PDF bytes with default options.
pub fn render_document(
    form: &Form,
    answers: &AnswerMap,
    signatures: &[SignatureRecord],
    company: Option<&CompanySettings>,
) -> Result<Vec<u8>, Error> {
    render_document_with(form, answers, signatures, company, &RenderOptions::default())
}

pub fn render_document_with(
    form: &Form,
    answers: &AnswerMap,
    signatures: &[SignatureRecord],
    company: Option<&CompanySettings>,
    options: &RenderOptions,
) -> Result<Vec<u8>, Error> {
    pdf::render(form, answers, signatures, company, options)
}

/// Render the built-in six-section inspection form. Useful as an end-to-end smoke test.
pub fn render_sample_document() -> Result<Vec<u8>, Error> {
    render_sample_document_with(&RenderOptions::default())
}

pub fn render_sample_document_with(options: &RenderOptions) -> Result<Vec<u8>, Error> {
    let form = sample::sample_form();
    let answers = sample::sample_answers();
    let signatures = sample::sample_signatures();
    let company = sample::sample_company();
    render_document_with(&form, &answers, &signatures, Some(&company), options)
}

/// Read a JSON input file (form, answers, signatures or company settings).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let data = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    })?;
    Ok(serde_json::from_slice(&data)?)
}

/// Render JSON inputs from disk and write the PDF to `output`.
pub fn render_files(
    form: &Path,
    answers: &Path,
    signatures: Option<&Path>,
    company: Option<&Path>,
    options: &RenderOptions,
    output: &Path,
) -> Result<(), Error> {
    let t0 = Instant::now();

    let form: Form = read_json(form)?;
    let answers: AnswerMap = read_json(answers)?;
    let signatures: Vec<SignatureRecord> = match signatures {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let company: Option<CompanySettings> = company.map(read_json::<CompanySettings>).transpose()?;
    let t_read = t0.elapsed();

    let bytes = render_document_with(&form, &answers, &signatures, company.as_ref(), options)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: read={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_read.as_secs_f64() * 1000.0,
        (t_render - t_read).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
