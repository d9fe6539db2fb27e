mod colors;
mod config;

use colors::{CYAN, DIM, GREEN, RED, RESET, YELLOW};
use config::Config;
use nlsh_brew::Homebrew;
use nlsh_core::{Agent, TurnOutcome};
use nlsh_memory::Context;
use nlsh_providers::ClaudeProvider;
use nlsh_store::Store;
use nlsh_tools::Registry;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Non-interactive raw execution works without a key or store.
    if let Some(pos) = args.iter().position(|a| a == "-c") {
        let Some(command) = args.get(pos + 1) else {
            eprintln!("Error: -c requires a command");
            std::process::exit(1);
        };
        let (output, code) = nlsh_tools::run_shell(command).await;
        println!("{}", output);
        std::process::exit(if code == 0 { 0 } else { 1 });
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    if config.api_key.is_empty() {
        eprintln!("Error: No API key configured");
        eprintln!();
        eprintln!("Please create ~/.nlshrc with your Claude API key:");
        config::print_example();
        eprintln!();
        eprintln!("Raw commands are still available via: nlsh -c '<command>'");
        std::process::exit(1);
    }

    let store = match Store::open() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Error: Could not initialize store: {}", e);
            std::process::exit(1);
        }
    };

    if !Homebrew::available().await {
        println!(
            "{}Warning: Homebrew not found. CLI tool installation will not be available.{}",
            YELLOW, RESET
        );
        println!("Install Homebrew from https://brew.sh");
    }

    let brew = Arc::new(Homebrew::new(store.clone()));
    let mut registry = Registry::new(brew.clone());
    match registry.load_learned(&store) {
        Ok(count) if count > 0 => tracing::info!("Loaded {} learned tools", count),
        Ok(_) => {}
        Err(e) => tracing::warn!("Could not load learned tools: {}", e),
    }

    let context = Context::new(store.clone(), config.context_limit);

    let provider = match ClaudeProvider::new(config.api_key.clone(), config.model.clone()) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut agent = Agent::new(provider, context, registry, brew, store);

    run_repl(&mut agent).await;
    Ok(())
}

async fn run_repl(agent: &mut Agent) {
    println!("nlsh - conversational shell");
    println!("Type your request in natural language");
    println!("Type 'exit' or 'quit' to exit");
    println!("Type '!command' to run raw shell commands");
    println!("Type 'clear' to clear conversation history");
    println!();

    // One blocking reader thread feeds the async loop so Ctrl+C can be
    // observed while a request is outstanding.
    let (line_tx, mut line_rx) = mpsc::channel::<Option<String>>(1);
    std::thread::spawn(move || loop {
        let mut input = String::new();
        match std::io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => {
                let _ = line_tx.blocking_send(None);
                break;
            }
            Ok(_) => {
                if line_tx.blocking_send(Some(input)).is_err() {
                    break;
                }
            }
        }
    });

    // Ctrl+C interrupts the current request, never the process.
    let interrupt = Arc::new(Notify::new());
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    break;
                }
                interrupt.notify_waiters();
            }
        });
    }

    loop {
        print!("{}>{} ", CYAN, RESET);
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = line_rx.recv() => match line.flatten() {
                Some(line) => line,
                None => break,
            },
            _ = interrupt.notified() => {
                println!("\nUse 'exit' or 'quit' to exit nlsh");
                continue;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "clear" => {
                agent.clear_context();
                println!("Conversation history cleared");
                continue;
            }
            "help" => {
                print_help();
                continue;
            }
            _ => {}
        }

        if let Some(command) = input.strip_prefix('!') {
            let (output, _) = nlsh_tools::run_shell(command).await;
            println!("{}", output);
            continue;
        }

        // The token is owned here, per turn; the interrupt task only
        // nudges this loop, which decides whether a turn is in flight.
        let cancel = CancellationToken::new();
        let mut turn = std::pin::pin!(agent.process(input, &cancel));
        let outcome = loop {
            tokio::select! {
                outcome = &mut turn => break outcome,
                _ = interrupt.notified() => {
                    println!("\nInterrupting request...");
                    cancel.cancel();
                }
            }
        };

        match outcome {
            TurnOutcome::Reply {
                explanation,
                body,
                success,
            } => {
                if let Some(explanation) = explanation {
                    println!("\n{}{}{}", DIM, explanation, RESET);
                }
                let color = if success { GREEN } else { RED };
                println!("\n{}{}{}\n", color, body, RESET);
            }
            TurnOutcome::Cancelled => {
                println!("Request cancelled.\n");
            }
        }
    }
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  exit, quit   - Exit nlsh");
    println!("  clear        - Clear conversation history");
    println!("  !<command>   - Run a raw shell command");
    println!("  Ctrl+C       - Interrupt the current request");
    println!();
    println!("Anything else is interpreted as a natural-language request.");
    println!();
}
