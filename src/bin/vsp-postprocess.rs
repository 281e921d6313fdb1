//! Visual sketchpad post-processing CLI
//!
//! Command-line front-end for running a vision tool's image through the
//! configured post-processing backend.

#[cfg(feature = "cli")]
use vsp_postprocess::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
