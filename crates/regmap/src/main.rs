use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use regmap_core::config::{CompileUnitFilter, ExtractOptions, DEFAULT_INDENT};
use regmap_core::output::write_document;
use regmap_core::{extract_firmware, RegisterMapDocument, Result as RegmapResult};
use regmap_utils::{debug, init_logging, init_logging_with_level, LogFormat, LogLevel};

/// Extract a JSON register map from firmware debug information.
///
/// Every top-level variable of the selected compile units is described with
/// its type, layout and the `// @regmap key: value` attributes written above
/// its declaration. The document is written to stdout; diagnostics go to
/// stderr.
#[derive(Parser, Debug)]
#[command(name = "regmap")]
#[command(version)]
#[command(about = "Extract a JSON register map from firmware debug information", long_about = None)]
struct Cli
{
    /// Firmware image with DWARF debug information (ELF, Mach-O, PE, ...)
    firmware: PathBuf,

    /// Compile units to visit, by file name. Defaults to the firmware's file
    /// name with a `.c` extension (`app.elf` visits `app.c`).
    compile_units: Vec<String>,

    /// Visit every compile unit
    #[arg(long, conflicts_with = "compile_units")]
    all_units: bool,

    /// Write the document to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Spaces per indentation level, 0 for compact output
    #[arg(long, default_value_t = DEFAULT_INDENT)]
    indent: usize,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<LogLevel>,
}

impl Cli
{
    fn options(&self) -> ExtractOptions
    {
        let compile_units = if self.all_units {
            CompileUnitFilter::all()
        } else if self.compile_units.is_empty() {
            CompileUnitFilter::for_firmware(&self.firmware)
        } else {
            CompileUnitFilter::from_names(&self.compile_units)
        };

        ExtractOptions {
            compile_units,
            indent: self.indent,
        }
    }
}

fn main()
{
    let cli = Cli::parse();

    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty),
        None => init_logging(),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> RegmapResult<()>
{
    let options = cli.options();
    debug!(
        firmware = %cli.firmware.display(),
        units = ?options.compile_units.names().collect::<Vec<_>>(),
        "extracting register map"
    );

    let document = extract_firmware(&cli.firmware, &options)?;

    match &cli.output {
        Some(path) => write_file(&document, path, options.indent),
        None => write_document(&document, io::stdout().lock(), options.indent),
    }
}

/// Only called once extraction succeeded, so a failed run never leaves a
/// partial file behind.
fn write_file(document: &RegisterMapDocument, path: &Path, indent: usize) -> RegmapResult<()>
{
    let file = File::create(path)?;
    write_document(document, BufWriter::new(file), indent)
}
