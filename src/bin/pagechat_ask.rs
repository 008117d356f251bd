use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use pagechat::{client::ChatClient, transport::WireEvent};

#[derive(Parser)]
#[command(
    name = "pagechat-ask",
    about = "Register documents and ask questions against a running pagechat server"
)]
struct Cli {
    /// Server base URL.
    #[arg(long, env = "PAGECHAT_URL", default_value = "http://127.0.0.1:4100")]
    url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a text file (with `[Page N]` markers) and print the new session id.
    Upload {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        pages: u32,
        /// Name to store; defaults to the file name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Ask a question and stream the answer to stdout.
    Ask {
        #[arg(long)]
        session: String,
        question: String,
    },
    /// Print the stored conversation of a session.
    History {
        #[arg(long)]
        session: String,
    },
    /// Delete the stored conversation of a session.
    Clear {
        #[arg(long)]
        session: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = ChatClient::new(&cli.url).context("failed to build HTTP client")?;
    match cli.command {
        Command::Upload { file, pages, name } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read document text at {}", file.display()))?;
            let name = name.unwrap_or_else(|| {
                file.file_name()
                    .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned())
            });
            let uploaded = client
                .register_document(&name, pages, &text)
                .await
                .context("failed to register document")?;
            println!("document: {}", uploaded.document.id);
            println!("session: {}", uploaded.session.id);
            Ok(())
        }
        Command::Ask { session, question } => ask(&client, &session, &question).await,
        Command::History { session } => {
            let messages = client
                .messages(&session)
                .await
                .context("failed to load messages")?;
            for message in messages {
                println!("[{}] {}", message.role.as_str(), message.content);
            }
            Ok(())
        }
        Command::Clear { session } => {
            client
                .clear(&session)
                .await
                .context("failed to clear messages")?;
            println!("cleared {session}");
            Ok(())
        }
    }
}

async fn ask(client: &ChatClient, session: &str, question: &str) -> Result<()> {
    let mut events = client
        .ask(session, question)
        .await
        .context("failed to start chat")?;
    let mut stdout = io::stdout().lock();

    while let Some(event) = events.next().await {
        match event.context("answer stream interrupted")? {
            WireEvent::Chunk { content } => {
                stdout.write_all(content.as_bytes())?;
                stdout.flush()?;
            }
            WireEvent::Complete { message } => {
                writeln!(stdout)?;
                let pages: Vec<String> = message
                    .citations
                    .unwrap_or_default()
                    .iter()
                    .map(|citation| citation.page.to_string())
                    .collect();
                if !pages.is_empty() {
                    writeln!(stdout, "\ncited pages: {}", pages.join(", "))?;
                }
                return Ok(());
            }
            WireEvent::Error { error } => {
                writeln!(stdout)?;
                bail!("answer failed: {error}");
            }
        }
    }

    bail!("stream ended without a final event")
}
