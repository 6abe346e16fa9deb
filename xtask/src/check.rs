use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Bare-metal target the driver crates must build for.
pub(crate) const TARGET: &str = "thumbv7em-none-eabihf";

/// Crates that ship to the target.
pub(crate) const LIBRARIES: [&str; 3] = ["platform", "amux", "sampler"];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking acquisition crates...".cyan().bold());
    println!();

    let total_start = Instant::now();

    // Check 1: Host build, simulated hardware included
    required("host build (std)", &["check", "--workspace", "--all-targets"])?;

    // Check 2: Bare-metal build of the library crates
    let mut no_std = vec!["check", "--target", TARGET];
    no_std.extend(LIBRARIES.iter().flat_map(|name| ["-p", *name]));
    required("no_std build (thumbv7em)", &no_std)?;

    // Check 3: defmt logging on target
    let mut defmt = no_std.clone();
    defmt.extend(["--features", "amux/defmt,sampler/defmt"]);
    required("defmt build (thumbv7em)", &defmt)?;

    // Check 4: tracing logging on host
    required(
        "tracing build (host)",
        &["check", "-p", "amux", "-p", "sampler", "--features", "amux/tracing,sampler/tracing"],
    )?;

    // Check 5: Clippy lints
    advisory(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        "Clippy warnings found",
    )?;

    // Check 6: Format check
    advisory("formatting", &["fmt", "--all", "--check"], "Formatting issues found (run 'cargo fmt --all')")?;

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

/// Run `cargo args`; failure aborts the check.
fn required(label: &str, args: &[&str]) -> Result<()> {
    println!("{}", format!("  Checking {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {label}"))?;

    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{label} failed");
    }

    println!(
        "{}",
        format!("  ✓ {label} passed in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    println!();
    Ok(())
}

/// Run `cargo args`; failure is reported but does not abort.
fn advisory(label: &str, args: &[&str], warning: &str) -> Result<()> {
    println!("{}", format!("  Running {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {label}"))?;

    if output.status.success() {
        println!(
            "{}",
            format!("  ✓ {label} passed in {:.2}s", start.elapsed().as_secs_f64()).green()
        );
    } else {
        eprintln!("{}", format!("  ⚠ {warning}").yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
    }
    println!();
    Ok(())
}
