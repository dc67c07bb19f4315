// Combridge - Transparent serial bridge
use clap::Parser;
use combridge::cli::{execute_command, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let code = match execute_command(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // The operator stdin reader may still be parked in a blocking read;
    // exiting here keeps runtime shutdown from waiting on it.
    std::process::exit(code);
}
