use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use dts_guard::cli;

fn main() -> anyhow::Result<ExitCode> {
    // RUST_LOG=debug to see extraction details
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let command_line_interface = cli::CommandLineInterface::load();
    tracing::debug!(?command_line_interface, "parsed arguments");
    if command_line_interface.run()? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
