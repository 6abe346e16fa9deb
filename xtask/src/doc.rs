use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::check::{LIBRARIES, TARGET};

/// Document `platform`, `amux` and `sampler` without their dependencies.
///
/// Host docs include `platform::mocks`; `target` docs show the API as it
/// ships, with the `defmt` derives.
pub fn run(open: bool, target: bool) -> Result<()> {
    println!();
    let flavour = if target { "bare-metal" } else { "host" };
    println!(
        "{}",
        format!("📚 Documenting acquisition crates ({flavour})...").cyan().bold()
    );
    println!();

    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("doc").arg("--no-deps");
    for name in LIBRARIES {
        cmd.args(["-p", name]);
    }
    if target {
        cmd.args(["--target", TARGET])
            .args(["--features", "platform/defmt,amux/defmt,sampler/defmt"]);
    } else {
        cmd.args(["--features", "platform/std"]);
    }
    // Broken intra-doc links fail the build.
    cmd.env("RUSTDOCFLAGS", "-D warnings");
    if open {
        cmd.arg("--open");
    }

    let output = cmd.output().context("Failed to run cargo doc")?;

    if !output.status.success() {
        eprintln!("{}", "✗ Documentation build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Documentation build failed");
    }

    println!(
        "{}",
        format!("✓ Documented {} crates in {:.2}s", LIBRARIES.len(), start.elapsed().as_secs_f64())
            .green()
    );

    if !open {
        let root = if target {
            format!("target/{TARGET}/doc")
        } else {
            "target/doc".to_owned()
        };
        println!();
        for name in LIBRARIES {
            println!("   {}", format!("{root}/{name}/index.html").dimmed());
        }
    }

    println!();

    Ok(())
}
