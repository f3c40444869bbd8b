//! Dialogue command handlers (one-shot and interactive).

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use petclaw::agent::Orchestrator;
use petclaw::PetError;

use super::common::{
    create_orchestrator, display_name, load_config, load_state_for_update, save_state,
};

/// Cancel `token` on Ctrl-C. The watcher exits once the token is cancelled.
fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    token.cancel();
                }
            }
            _ = token.cancelled() => {}
        }
    });
}

/// One read from the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Forward stdin lines from a plain thread. A blocking read on it never
/// holds up runtime shutdown.
fn spawn_stdin_lines() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Wait for the next prompt line, or for `interrupt` to fire first.
async fn next_input<F>(
    lines: &mut mpsc::UnboundedReceiver<io::Result<String>>,
    interrupt: F,
) -> io::Result<Input>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        line = lines.recv() => match line {
            Some(line) => line.map(Input::Line),
            None => Ok(Input::Eof),
        },
        res = interrupt => res.map(|_| Input::Interrupted),
    }
}

async fn reply(orchestrator: &Orchestrator, cancel: &CancellationToken, text: &str) -> Result<String> {
    match orchestrator.ask(cancel, text).await {
        Ok(reply) => Ok(reply),
        Err(PetError::Cancelled) => Ok("(interrupted)".to_string()),
        Err(PetError::ProviderTyped(e)) if e.is_retryable() => {
            error!("Dialogue failed: {}", e);
            Err(anyhow::anyhow!(e).context("The AI provider is busy right now, try again shortly"))
        }
        Err(e) => {
            error!("Dialogue failed: {}", e);
            Err(e.into())
        }
    }
}

/// Send one message and print the answer.
pub(crate) async fn cmd_ask(config_path: Option<&Path>, message: String) -> Result<()> {
    let config = load_config(config_path)?;
    let state = load_state_for_update(&config)?;
    let orchestrator = create_orchestrator(&config, state.clone())?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    let result = reply(&orchestrator, &cancel, &message).await;
    save_state(&config, &state)?;
    println!("{}", result?);
    Ok(())
}

/// Interactive conversation until EOF, `quit` or `exit`.
pub(crate) async fn cmd_chat(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let state = load_state_for_update(&config)?;
    let orchestrator = create_orchestrator(&config, state.clone())?;

    println!("Chatting with {} ({})", display_name(&state), orchestrator.provider_name());
    println!("Type your message and press Enter. Type 'quit' or 'exit' to stop.");
    println!();

    let mut lines = spawn_stdin_lines();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let input = match next_input(&mut lines, tokio::signal::ctrl_c()).await? {
            Input::Line(line) => line,
            Input::Eof => {
                println!();
                break;
            }
            Input::Interrupted => {
                println!("\nGoodbye!");
                break;
            }
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }

        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(&cancel);
        match reply(&orchestrator, &cancel, input).await {
            Ok(text) => println!("{}\n", text),
            Err(e) => eprintln!("Error: {}\n", e),
        }
        cancel.cancel();
    }

    save_state(&config, &state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_next_input_reads_lines_then_eof() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Ok("hello".to_string())).unwrap();
        drop(tx);

        let never = std::future::pending::<io::Result<()>>;
        assert_eq!(
            next_input(&mut rx, never()).await.unwrap(),
            Input::Line("hello".into())
        );
        assert_eq!(next_input(&mut rx, never()).await.unwrap(), Input::Eof);
    }

    #[tokio::test]
    async fn test_next_input_interrupted_at_prompt() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<io::Result<String>>();
        let input = next_input(&mut rx, async { Ok(()) }).await.unwrap();
        assert_eq!(input, Input::Interrupted);
    }

    #[tokio::test]
    async fn test_each_prompt_listens_again() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(
            next_input(&mut rx, async { Ok(()) }).await.unwrap(),
            Input::Interrupted
        );
        tx.send(Ok("still here".to_string())).unwrap();
        assert_eq!(
            next_input(&mut rx, std::future::pending()).await.unwrap(),
            Input::Line("still here".into())
        );
        assert_eq!(
            next_input(&mut rx, async { Ok(()) }).await.unwrap(),
            Input::Interrupted
        );
    }
}
