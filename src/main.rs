// SerialTalker - Serial terminal for embedded devices
use clap::Parser;
use serialtalker::cli::args::Args;
use serialtalker::cli::commands::execute_command;
use serialtalker::SerialTalkerError;

#[tokio::main]
async fn main() -> Result<(), SerialTalkerError> {
    let args = Args::parse();

    match execute_command(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
