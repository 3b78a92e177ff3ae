//! `codewright chat` — Interactive or single-question mode.

use codewright_agent::{AgentSession, TurnOutcome};
use codewright_core::event::DomainEvent;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::runtime::Runtime;

/// One complete piece of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Question(String),
    Reset,
    Exit,
}

/// Collects lines into questions. `\code` starts a multi-line block that
/// `\end` closes; everything else is one line per question.
#[derive(Default)]
struct InputBuffer {
    block: Option<Vec<String>>,
}

impl InputBuffer {
    fn in_block(&self) -> bool {
        self.block.is_some()
    }

    fn push_line(&mut self, line: &str) -> Option<Input> {
        if let Some(block) = &mut self.block {
            if line.trim() == "\\end" {
                let text = block.join("\n");
                self.block = None;
                return (!text.trim().is_empty()).then(|| Input::Question(text));
            }
            block.push(line.to_string());
            return None;
        }

        match line.trim() {
            "" => None,
            "exit" | "quit" | "q" => Some(Input::Exit),
            "\\reset" => Some(Input::Reset),
            "\\code" => {
                self.block = Some(Vec::new());
                None
            }
            question => Some(Input::Question(question.to_string())),
        }
    }
}

/// Turn a script into REPL inputs, stopping at an exit command.
fn script_inputs(text: &str) -> Vec<Input> {
    let mut buffer = InputBuffer::default();
    let mut inputs = Vec::new();
    for line in text.lines() {
        match buffer.push_line(line) {
            None => {}
            Some(Input::Exit) => break,
            Some(input) => inputs.push(input),
        }
    }
    inputs
}

/// Run one turn; Ctrl-C cancels it instead of killing the process.
async fn ask(session: &mut AgentSession, question: &str) -> TurnOutcome {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    let outcome = session.submit_with_cancel(question, cancel).await;
    watcher.abort();
    outcome
}

fn print_answer(outcome: &TurnOutcome) {
    println!();
    for line in outcome.text().lines() {
        println!("  Assistant > {line}");
    }
    println!();
}

pub async fn run(
    repo: &Path,
    message: Option<String>,
    script: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::open(repo)?;
    let mut session = runtime.session()?;

    if runtime.index.is_empty().await {
        eprintln!("  Note: the retrieval index is empty. Run `codewright index build` for better answers.");
    }

    // Show which tools the agent reaches for.
    let mut events = runtime.events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DomainEvent::DecisionMade { tool_name: Some(tool), .. } = event.as_ref() {
                eprintln!("  [using {tool}]");
            }
        }
    });

    if let Some(question) = message {
        let outcome = session.submit(&question).await;
        println!("{}", outcome.text());
        return Ok(());
    }

    if let Some(path) = script {
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read script {}: {e}", path.display()))?;
        for input in script_inputs(&text) {
            match input {
                Input::Question(question) => {
                    for line in question.lines() {
                        println!("  You > {line}");
                    }
                    let outcome = ask(&mut session, &question).await;
                    print_answer(&outcome);
                }
                Input::Reset => {
                    session.reset();
                    println!("  (conversation cleared)");
                }
                Input::Exit => break,
            }
        }
        return Ok(());
    }

    println!();
    println!("  Codewright — Interactive Mode");
    println!();
    println!("  Repository: {}", runtime.index.repository_root().display());
    println!("  Provider:   {}", runtime.config.provider);
    println!("  Model:      {}", runtime.config.model);
    println!("  Tools:      {}", session.registry().names().join(", "));
    println!();
    println!("  Ask a question and press Enter. Use \\code ... \\end for multi-line input.");
    println!("  \\reset clears the conversation; 'exit' quits; Ctrl+C cancels a running answer.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = InputBuffer::default();

    loop {
        print!("{}", if buffer.in_block() { "  ... " } else { "  You > " });
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match buffer.push_line(&line) {
            None => continue,
            Some(Input::Exit) => break,
            Some(Input::Reset) => {
                session.reset();
                println!("  (conversation cleared)");
            }
            Some(Input::Question(question)) => {
                let outcome = ask(&mut session, &question).await;
                print_answer(&outcome);
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_questions() {
        let mut buf = InputBuffer::default();
        assert_eq!(buf.push_line("  "), None);
        assert_eq!(
            buf.push_line(" where is main? "),
            Some(Input::Question("where is main?".into()))
        );
        assert_eq!(buf.push_line("quit"), Some(Input::Exit));
        assert_eq!(buf.push_line("q"), Some(Input::Exit));
        assert_eq!(buf.push_line("\\reset"), Some(Input::Reset));
    }

    #[test]
    fn code_block_collects_lines() {
        let mut buf = InputBuffer::default();
        assert_eq!(buf.push_line("\\code"), None);
        assert!(buf.in_block());
        assert_eq!(buf.push_line("what does this do?"), None);
        assert_eq!(buf.push_line("    exit"), None);
        assert_eq!(
            buf.push_line("\\end"),
            Some(Input::Question("what does this do?\n    exit".into()))
        );
        assert!(!buf.in_block());
    }

    #[test]
    fn script_runs_until_exit() {
        let script = "where is main?\n\n\\code\nfn a() {}\n\\end\n\\reset\nexit\nnever asked\n";
        assert_eq!(
            script_inputs(script),
            vec![
                Input::Question("where is main?".into()),
                Input::Question("fn a() {}".into()),
                Input::Reset,
            ]
        );
    }

    #[test]
    fn empty_code_block_is_ignored() {
        let mut buf = InputBuffer::default();
        buf.push_line("\\code");
        assert_eq!(buf.push_line("\\end"), None);
    }
}
