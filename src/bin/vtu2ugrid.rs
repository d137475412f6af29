//! vtu2ugrid - merge hexahedral `.vtu` meshes into one `ugrid32` mesh
//!
//! Writes `<output>.ugrid32` and `<output>.scalar`. Logging is controlled through `RUST_LOG`
//! and defaults to `info`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ugrid::{convert, scalar_path, ugrid32_path, ConvertOptions};

#[derive(Parser, Debug)]
#[command(name = "vtu2ugrid")]
#[command(
    about = "Merge VTK unstructured hexahedral meshes into a single ugrid32 mesh",
    long_about = None
)]
struct Cli {
    /// Output base name, `.ugrid32` and `.scalar` are appended
    #[arg(short, long)]
    output: PathBuf,

    /// Only merge the first N input files
    #[arg(long, value_name = "N")]
    max_files: Option<usize>,

    /// Input `.vtu` files, merged in the order given
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

impl From<Cli> for ConvertOptions {
    fn from(cli: Cli) -> Self {
        Self {
            output: cli.output,
            inputs: cli.inputs,
            max_files: cli.max_files,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = ConvertOptions::from(Cli::parse());
    let summary = convert(&options).with_context(|| {
        format!(
            "failed to write {} and {}",
            ugrid32_path(&options.output).display(),
            scalar_path(&options.output).display()
        )
    })?;

    log::info!(
        "merged {} files into {} vertices and {} hexahedra",
        summary.files_read,
        summary.vertex_count,
        summary.hex_count
    );

    Ok(())
}
