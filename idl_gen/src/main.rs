use clap::{Parser, Subcommand};
use std::path::PathBuf;

use idl_gen::cmds;

#[derive(Parser)]
#[command(name = "idl-gen")]
#[command(about = "SDK code generation tool for the IDL wire format", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Generate SDK code (and optionally its test suite) from IR definitions */
    Codegen {
        /* Input IR files (YAML or JSON) */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Output directory for the generated SDK modules */
        #[arg(
            short = 'o',
            long = "output",
            value_name = "DIR",
            default_value = "generated"
        )]
        output_dir: PathBuf,

        /* Also generate the oracle test suite into this directory */
        #[arg(short = 't', long = "tests", value_name = "DIR")]
        tests_dir: Option<PathBuf>,

        /* Crate name the generated tests address the SDK modules by */
        #[arg(
            short = 'c',
            long = "crate-name",
            value_name = "NAME",
            default_value = "sdk"
        )]
        crate_name: String,

        /* Namespaces always compiled in rather than feature-gated */
        #[arg(long = "required-namespace", value_name = "NS")]
        required_namespaces: Vec<String>,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Codegen {
            files,
            output_dir,
            tests_dir,
            crate_name,
            required_namespaces,
            verbose,
        } => {
            cmds::codegen::run(
                files,
                output_dir,
                tests_dir,
                crate_name,
                required_namespaces,
                verbose,
            )?;
        }
    }

    Ok(())
}
