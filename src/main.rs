use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use confxp::render::{OutputFormat, render};
use confxp::translator::Translator;
use confxp::{Error, ParseConfig, UnknownLines};

#[derive(Parser)]
#[command(name = "confxp")]
#[command(about = "Translate a configuration language file into TOML", version)]
struct Cli {
    /// Path to the configuration file
    input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Toml)]
    format: Format,

    /// Reject duplicate keys, constant redefinitions and unterminated block comments
    #[arg(long)]
    strict: bool,

    /// Skip unrecognized top-level lines instead of failing
    #[arg(long)]
    ignore_unknown_lines: bool,

    /// Marker that starts a single-line comment
    #[arg(long, value_name = "MARKER")]
    line_comment: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn output_format(self) -> Result<OutputFormat, Error> {
        match self {
            Format::Toml => Ok(OutputFormat::Toml),
            #[cfg(feature = "json")]
            Format::Json => Ok(OutputFormat::Json),
            #[cfg(not(feature = "json"))]
            Format::Json => Err(Error::Render(
                "JSON output needs confxp built with the `json` feature".into(),
            )),
        }
    }
}

impl Cli {
    fn parse_config(&self) -> ParseConfig {
        let mut config = if self.strict {
            ParseConfig::strict()
        } else {
            ParseConfig::default()
        };
        if self.ignore_unknown_lines {
            config.unknown_lines = UnknownLines::Ignore;
        }
        if let Some(marker) = &self.line_comment {
            config.line_comment = marker.clone();
        }
        config
    }
}

fn run(cli: &Cli) -> Result<String, Error> {
    let format = cli.format.output_format()?;
    let mut translator = Translator::with_config(cli.parse_config());
    let document = translator.parse_file(&cli.input)?;
    log::debug!(
        "translated {} with {} constant(s)",
        cli.input.display(),
        translator.constants().len()
    );
    render(&document, format)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
