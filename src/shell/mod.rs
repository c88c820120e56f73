//! Interactive terminal shell: read a line, process a turn, print the reply.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::error::Result;
use crate::session::ChatSession;

const BANNER: &str = "Community Assistant";
const PLACEHOLDER: &str = "Ask me about communities in Miami...";

/// Run the interactive loop until EOF or `/quit`.
///
/// `/reset` mirrors the original UI's "Reset Chat & Close Sessions"
/// control: cleanup failures are logged and swallowed, never shown.
pub async fn run(session: &mut ChatSession) -> Result<()> {
    println!("{BANNER}");
    println!("{PLACEHOLDER}");
    println!("Commands: /reset (reset chat & close sessions), /quit");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/reset" => {
                if let Err(error) = session.reset().await {
                    debug!(%error, "cleanup failed during reset");
                }
                println!("Chat reset; sessions closed.");
            }
            _ => match session.process_turn(input).await {
                Ok(reply) => println!("assistant: {reply}"),
                Err(error) => eprintln!("Sorry, something went wrong: {error}"),
            },
        }
    }

    // Best-effort close on the way out.
    if let Err(error) = session.reset().await {
        debug!(%error, "cleanup failed at exit");
    }
    Ok(())
}
