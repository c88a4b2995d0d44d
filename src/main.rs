use pow_ledger::cli::commands::run_cli;

fn main() -> anyhow::Result<()> {
    // Logging is initialised inside run_cli once the debug flag is known
    run_cli()?;

    Ok(())
}
