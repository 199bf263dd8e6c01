//! Interactive REPL: read a line, run one turn, print, repeat until EOF or `/quit`.
//!
//! Plain `quit`/`stop` are sent to the dialogue, where they cancel a pending
//! request; only the slash forms leave the REPL.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use askdb::{Orchestrator, TurnRequest};
use cli::{format_output, OutputFormat};

pub async fn run_repl_loop(
    orchestrator: &Orchestrator,
    base: &TurnRequest,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match reader.next_line().await? {
            None => break,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };

        let request = TurnRequest {
            utterance: line,
            ..base.clone()
        };
        match orchestrator.run_request(request).await {
            Ok(output) => println!("{}", format_output(&output, &base.subject, format)?),
            Err(e) => eprintln!("error: {}: {}", e.code(), e),
        }
    }

    println!("Bye.");
    Ok(())
}

fn is_quit_command(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    matches!(lower.as_str(), "/quit" | "/exit")
}
