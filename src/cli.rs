//! Command-line arguments for the assistant shell.

use clap::Parser;

/// Community assistant chat shell.
#[derive(Parser, Debug)]
#[command(name = "casa", version, about = "casa — community assistant chat")]
pub struct Cli {
    /// Model to use for generation
    #[arg(short, long, default_value = "gpt-4o")]
    pub model: String,

    /// Sampling temperature
    #[arg(short, long, default_value_t = 0.0)]
    pub temperature: f64,

    /// Maximum model calls per turn during tool use
    #[arg(long, default_value_t = 20)]
    pub max_steps: usize,

    /// Conversation exchanges retained as model context
    #[arg(long, default_value_t = 3)]
    pub history_window: usize,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
