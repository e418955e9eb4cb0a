/* Codegen command - generate the SDK sources and optional test suite */

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use idl_types::{Api, TypeRegistry};

use crate::codegen::{GenOptions, GeneratedFile, Generator};
use crate::testgen::{TestGenOptions, TestGenerator};

/* Execute the codegen command. Everything is generated in memory first;
 * nothing is written unless the whole run succeeds, so a failing namespace
 * cannot leave a half-updated output tree behind. */
pub fn run(
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    tests_dir: Option<PathBuf>,
    crate_name: String,
    required_namespaces: Vec<String>,
    verbose: bool,
) -> anyhow::Result<()> {
    if verbose {
        println!("IDL Generator - Code Generation Tool");
        println!("====================================\n");
        println!("[~] Configuration:");
        println!("  Output directory: {}", output_dir.display());
        if let Some(dir) = &tests_dir {
            println!("  Tests directory: {}", dir.display());
        }
        println!("  Crate name: {}", crate_name);
        println!("  Input files: {}", files.len());
        for file in &files {
            println!("    - {}", file.display());
        }
        println!();
    }

    let api = load_api(&files, verbose)?;
    /* The crate is addressed by module path from the generated tests */
    let crate_name = crate_name.replace('-', "_");

    if verbose {
        println!("[*] Starting code generation...");
    }

    let generator = Generator::new(
        &api,
        GenOptions {
            crate_path: "crate".to_string(),
            required_namespaces: required_namespaces.clone(),
        },
    );
    let generated = generator.generate().context("code generation failed")?;

    let tests = match &tests_dir {
        Some(_) => {
            let registry = TypeRegistry::new(&api);
            let test_generator = TestGenerator::new(
                &api,
                &registry,
                TestGenOptions {
                    crate_name: crate_name.clone(),
                    required_namespaces,
                },
            );
            Some(test_generator.generate().context("test generation failed")?)
        }
        None => None,
    };

    write_files(&output_dir, &generated, verbose)?;
    if verbose {
        println!(
            "[✓] Generated {} file(s) in {}",
            generated.len(),
            output_dir.display()
        );
    }

    if let (Some(dir), Some(tests)) = (&tests_dir, &tests) {
        write_files(dir, tests, verbose)?;
        if verbose {
            println!("[✓] Generated {} test file(s) in {}", tests.len(), dir.display());
        }
    }

    println!("[✓] Code generation complete!");
    Ok(())
}

/* Load and merge the IR documents; the file extension selects the format */
fn load_api(files: &[PathBuf], verbose: bool) -> anyhow::Result<Api> {
    let mut api = Api {
        namespaces: Vec::new(),
    };
    for file in files {
        if verbose {
            println!("[~] Loading {}", file.display());
        }
        let text = fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let part: Api = match file.extension().and_then(OsStr::to_str) {
            Some("yaml") | Some("yml") => serde_yml::from_str(&text)
                .with_context(|| format!("failed to parse {}", file.display()))?,
            Some("json") => serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", file.display()))?,
            _ => bail!(
                "{}: unrecognized extension (expected .yaml, .yml or .json)",
                file.display()
            ),
        };
        api.namespaces.extend(part.namespaces);
    }
    if api.namespaces.is_empty() {
        bail!("no namespaces found in the input files");
    }
    Ok(api)
}

fn write_files(root: &Path, files: &[GeneratedFile], verbose: bool) -> anyhow::Result<()> {
    for file in files {
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, &file.contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if verbose {
            println!("    - {}", path.display());
        }
    }
    Ok(())
}
