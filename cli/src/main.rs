mod check;
mod data_dir;
mod fs_driver;
mod report;

use std::path::PathBuf;
use std::process;

use clap::Parser;

use markcheck::Config;
use runner::StatusCounts;

use crate::report::Reporter;

#[derive(Parser)]
#[command(name = "markcheck", version, about = "Test the code examples in Markdown files")]
struct Cli {
    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Print every written file and every command
    #[arg(short, long)]
    verbose: bool,

    /// Use this directory instead of the nearest `markcheck-data/`
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Print the built-in configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Markdown files to check, processed in order
    #[arg(required_unless_present = "print_config")]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if cli.print_config {
        match serde_yaml::to_string(&Config::builtin().to_patch()) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => {
                eprintln!("error: cannot serialize the configuration: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let mut reporter = Reporter::new(cli.no_color);
    let mut total = StatusCounts::default();

    for file in &cli.files {
        reporter.document_header(&file.display().to_string());
        match check::check_file(file, cli.data_dir.as_deref(), cli.verbose) {
            Ok(checked) => {
                let file_id = reporter.add_file(checked.name, checked.source);
                reporter.report(file_id, &checked.report);
                total += checked.report.counts;
            }
            Err(error) => {
                eprintln!("error: {}", error);
                process::exit(1);
            }
        }
    }

    if cli.files.len() > 1 {
        reporter.counts("Total", &total);
    }
    if total.has_failures() {
        process::exit(1);
    }
}
