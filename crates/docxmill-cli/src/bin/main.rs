//! docxmill binary entry point

use anyhow::Result;
use docxmill_cli::run_cli;

fn main() -> Result<()> {
    run_cli()
}
