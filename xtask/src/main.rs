use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use clap::{Parser, Subcommand};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "clickstream_transform_lambda";
const DIST_DIR: &str = "infra/clickstream_transform/dist";
const DEFAULT_TARGET: &str = "x86_64-unknown-linux-gnu";

/// A binary shipped as a custom-runtime Lambda zip.
struct LambdaArtifact {
    binary: &'static str,
    zip_name: &'static str,
}

const ARTIFACTS: &[LambdaArtifact] = &[LambdaArtifact {
    binary: "transform_lambda",
    zip_name: "transform.zip",
}];

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the clickstream transform workspace"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every workspace test
    Test,
    /// Formatting, clippy and tests, as run in CI
    Ci,
    /// Build the Lambda binaries and zip each one as `bootstrap`
    ServerlessPackage {
        /// Target triple of the Lambda runtime
        #[arg(long, env = "LAMBDA_TARGET", default_value = DEFAULT_TARGET)]
        target: String,
        /// Build without optimizations
        #[arg(long)]
        debug: bool,
    },
}

type TaskResult = Result<(), String>;

fn cargo(args: &[&str]) -> TaskResult {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .map_err(|error| format!("could not start cargo: {error}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("`cargo {}` exited with {status}", args.join(" ")))
    }
}

fn ci() -> TaskResult {
    cargo(&["fmt", "--all", "--", "--check"])?;
    cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ])?;
    cargo(&["test", "--workspace"])
}

/// Cross builds need the target's std under the active sysroot.
fn require_target_std(target: &str) -> TaskResult {
    let output = Command::new("rustc")
        .args(["--print", "sysroot"])
        .output()
        .map_err(|error| format!("could not start rustc: {error}"))?;
    let sysroot = String::from_utf8_lossy(&output.stdout);
    let target_lib = Path::new(sysroot.trim())
        .join("lib")
        .join("rustlib")
        .join(target);

    if target_lib.is_dir() {
        Ok(())
    } else {
        Err(format!(
            "std for `{target}` is not installed; run `rustup target add {target}`"
        ))
    }
}

fn binary_path(target: &str, debug: bool, binary: &str) -> PathBuf {
    let profile = if debug { "debug" } else { "release" };
    Path::new("target").join(target).join(profile).join(binary)
}

fn write_bootstrap_zip(binary: &Path, zip_path: &Path) -> TaskResult {
    let executable = fs::read(binary)
        .map_err(|error| format!("could not read {}: {error}", binary.display()))?;
    let file = fs::File::create(zip_path)
        .map_err(|error| format!("could not create {}: {error}", zip_path.display()))?;

    let mut archive = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    archive
        .start_file("bootstrap", options)
        .map_err(|error| error.to_string())?;
    archive
        .write_all(&executable)
        .map_err(|error| error.to_string())?;
    archive.finish().map_err(|error| error.to_string())?;
    Ok(())
}

fn serverless_package(target: &str, debug: bool) -> TaskResult {
    require_target_std(target)?;

    let mut build = vec!["build", "-p", LAMBDA_PACKAGE, "--target", target];
    for artifact in ARTIFACTS {
        build.extend(["--bin", artifact.binary]);
    }
    if !debug {
        build.push("--release");
    }
    cargo(&build)?;

    let dist = Path::new(DIST_DIR);
    fs::create_dir_all(dist)
        .map_err(|error| format!("could not create {}: {error}", dist.display()))?;

    for artifact in ARTIFACTS {
        let zip_path = dist.join(artifact.zip_name);
        write_bootstrap_zip(&binary_path(target, debug, artifact.binary), &zip_path)?;
        eprintln!("packaged {}", zip_path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let result = match Cli::parse().command {
        Commands::Test => cargo(&["test", "--workspace"]),
        Commands::Ci => ci(),
        Commands::ServerlessPackage { target, debug } => serverless_package(&target, debug),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("xtask failed: {message}");
            ExitCode::FAILURE
        }
    }
}
