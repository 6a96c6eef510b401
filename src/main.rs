use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use formsheet_pdf::model::parse_hex_color;
use formsheet_pdf::{FontFiles, RenderOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render filled-in forms to paginated A4 PDF")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a form definition and its answers
    Render {
        /// Form definition (JSON)
        #[arg(long)]
        form: PathBuf,
        /// Answers keyed by field title (JSON object)
        #[arg(long)]
        answers: PathBuf,
        /// Signature records (JSON array)
        #[arg(long)]
        signatures: Option<PathBuf>,
        /// Company branding (JSON object)
        #[arg(long)]
        company: Option<PathBuf>,
        #[command(flatten)]
        style: StyleArgs,
        /// Output PDF path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Render the built-in aircraft inspection sample
    Sample {
        #[command(flatten)]
        style: StyleArgs,
        #[arg(short, long, default_value = "sample.pdf")]
        output: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct StyleArgs {
    /// Brand colour as #RRGGBB
    #[arg(long)]
    brand_color: Option<String>,
    /// chrono format string for dates
    #[arg(long)]
    date_format: Option<String>,
    /// Generation date (YYYY-MM-DD) instead of today
    #[arg(long)]
    generated_at: Option<NaiveDate>,
    /// Regular TrueType font to embed instead of Helvetica
    #[arg(long)]
    font: Option<PathBuf>,
    #[arg(long, requires = "font")]
    bold_font: Option<PathBuf>,
    #[arg(long, requires = "font")]
    italic_font: Option<PathBuf>,
}

impl StyleArgs {
    fn into_options(self) -> Result<RenderOptions, String> {
        let mut options = RenderOptions::default();
        if let Some(color) = self.brand_color {
            options.brand_color =
                parse_hex_color(&color).ok_or_else(|| format!("invalid brand colour {color:?}"))?;
        }
        if let Some(format) = self.date_format {
            options.date_format = format;
        }
        options.generated_at = self.generated_at;
        options.font = self.font.map(|regular| FontFiles {
            regular,
            bold: self.bold_font,
            italic: self.italic_font,
        });
        Ok(options)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Render {
            form,
            answers,
            signatures,
            company,
            style,
            output,
        } => style.into_options().and_then(|options| {
            formsheet_pdf::render_files(
                &form,
                &answers,
                signatures.as_deref(),
                company.as_deref(),
                &options,
                &output,
            )
            .map_err(|e| e.to_string())
            .map(|()| output)
        }),
        Command::Sample { style, output } => style.into_options().and_then(|options| {
            formsheet_pdf::render_sample_document_with(&options)
                .map_err(|e| e.to_string())
                .and_then(|bytes| std::fs::write(&output, bytes).map_err(|e| e.to_string()))
                .map(|()| output)
        }),
    };

    match result {
        Ok(output) => {
            log::info!("Wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
