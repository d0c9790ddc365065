use clap::Parser;
use dicom_probe as probe;
use std::path::PathBuf;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "dicom-probe",
    about = "Print the identifying header of DICOM files as JSON"
)]
struct Cli {
    /// Files or directories to probe; directories are walked recursively
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Also report files that are not DICOM
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut summaries = Vec::new();

    for input in &cli.inputs {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            match probe::probe_file(entry.path()) {
                Ok(summary) => summaries.push(summary),
                Err(e) if cli.verbose => eprintln!("skipped: {}", e),
                Err(_) => {}
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
