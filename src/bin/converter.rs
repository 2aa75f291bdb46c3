//! finmsg converter - CLI tool for converting between MT940 and camt.053.

use chrono::Utc;
use clap::Parser;
use finmsg::{
    conversion::{camt053_to_mt940, mt940_to_camt053},
    iso20022::{camt::AccountReportDocument, CamtType},
    mt::{Mt940Document, Mt940Generator, MtOptions, PurposeFormat},
    Format, Result,
};
use std::fs::File;
use std::io::{self, Read, Write};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "finmsg_convert")]
#[command(about = "Convert bank statements between MT940 and camt.053", long_about = None)]
struct Cli {
    /// Input file path (or stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Input format (mt940, camt053)
    #[arg(long = "input-format")]
    input_format: String,

    /// Output format (mt940, camt053)
    #[arg(long = "output-format")]
    output_format: String,

    /// `:86:` layout for MT940 output (swift, datev)
    #[arg(long = "purpose-format", default_value = "swift")]
    purpose_format: String,

    /// Message id of the generated camt.053 group header
    #[arg(long = "message-id", default_value = "FINMSG")]
    message_id: String,

    /// Output file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,
}

/// Statements read from the input, in either representation.
enum Statements {
    Mt940(Mt940Document),
    Camt053(AccountReportDocument),
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "finmsg=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let input_format = cli.input_format.parse::<Format>()?;
    let output_format = cli.output_format.parse::<Format>()?;
    let options = MtOptions {
        purpose_format: cli.purpose_format.parse::<PurposeFormat>()?,
        ..MtOptions::default()
    };

    let statements = if let Some(ref input_path) = cli.input {
        let mut file = File::open(input_path)?;
        parse_input(&mut file, input_format)?
    } else {
        let mut stdin = io::stdin();
        parse_input(&mut stdin, input_format)?
    };

    if let Some(ref output_path) = cli.output {
        let mut file = File::create(output_path)?;
        write_output(&mut file, statements, output_format, &cli.message_id, &options)?;
    } else {
        let mut stdout = io::stdout();
        write_output(&mut stdout, statements, output_format, &cli.message_id, &options)?;
    }

    Ok(())
}

fn parse_input<R: Read>(reader: &mut R, format: Format) -> Result<Statements> {
    match format {
        Format::Mt940 => Ok(Statements::Mt940(Mt940Document::from_read(reader)?)),
        Format::Camt053 => Ok(Statements::Camt053(AccountReportDocument::from_read(reader)?)),
    }
}

fn write_output<W: Write>(
    writer: &mut W,
    statements: Statements,
    format: Format,
    message_id: &str,
    options: &MtOptions,
) -> Result<()> {
    let version = CamtType::Camt053.default_version();
    match (statements, format) {
        (Statements::Mt940(doc), Format::Mt940) => doc.write_to(writer, options)?,
        (Statements::Camt053(doc), Format::Camt053) => doc.write_to(writer, version)?,
        (Statements::Mt940(doc), Format::Camt053) => {
            let camt = mt940_to_camt053(&doc, message_id, Utc::now().naive_utc())?;
            camt.write_to(writer, version)?;
        }
        (Statements::Camt053(doc), Format::Mt940) => {
            // one MT940 per camt.053 statement, assembled before writing
            let generator = Mt940Generator::new(options.clone());
            let messages = doc
                .reports
                .iter()
                .map(|report| generator.generate(&camt053_to_mt940(report)?))
                .collect::<Result<Vec<_>>>()?;
            info!(statements = messages.len(), "converted camt.053 to MT940");
            writer.write_all(messages.join("\r\n").as_bytes())?;
        }
    }
    Ok(())
}
