use anyhow::{bail, Context, Result};
use clap::Parser;
use hcl2cdktf::{convert, ConvertOptions, Language, ProviderSchemaCatalog};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "hcl2cdktf")]
#[command(about = "Convert Terraform HCL into CDK for Terraform code", long_about = None)]
struct Cli {
    /// A .tf file or a Terraform configuration directory
    input: PathBuf,

    /// Target language
    #[arg(long, value_enum, default_value = "typescript")]
    language: Language,

    /// Provider schema JSON (output of `terraform providers schema -json`)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Base class of the emitted code container
    #[arg(long, default_value = "cdktf.TerraformStack")]
    container: String,

    /// Fail on lowering errors instead of returning best-effort output
    #[arg(long)]
    fail_on_lowering_error: bool,

    /// Print conversion statistics as JSON to stderr
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let catalog = match &cli.schema {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading schema file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing schema file {}", path.display()))?
        }
        None => ProviderSchemaCatalog::default(),
    };

    let hcl_text = read_input(&cli.input)?;
    let options = ConvertOptions {
        language: cli.language,
        provider_schema: &catalog,
        code_container: cli.container.clone(),
        throw_on_translation_error: cli.fail_on_lowering_error,
    };

    let result = convert(&hcl_text, &options)?;
    for diagnostic in &result.diagnostics {
        info!("{:?}: {}", diagnostic.severity, diagnostic.message);
    }
    print!("{}", result.all);
    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(&result.stats)?);
    }
    Ok(())
}

/// A single file is read as-is; a directory follows the Terraform
/// convention of concatenating its top-level .tf files in name order.
fn read_input(input: &Path) -> Result<String> {
    if input.is_file() {
        return fs::read_to_string(input)
            .with_context(|| format!("reading {}", input.display()));
    }
    if !input.is_dir() {
        bail!("input '{}' is neither a file nor a directory", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "tf"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no .tf files found in {}", input.display());
    }
    let mut out = String::new();
    for file in files {
        debug!("reading {}", file.display());
        let content =
            fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
        out.push_str(&content);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}
