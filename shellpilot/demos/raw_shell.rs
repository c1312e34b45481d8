//! Raw shell example: drive a shell exposed on a plain TCP port (a terminal
//! server line or a `socat` listener) and print output as it arrives.
//!
//! # Usage
//!
//! ```bash
//! socat TCP-LISTEN:2001,reuseaddr,fork EXEC:"bash -i",pty,stderr,setsid,sigint,sane &
//! cargo run --example raw_shell -- --host localhost --port 2001 -c "uname -a" -c "ls ${dir}" --var dir=/tmp
//! ```

use std::collections::HashMap;
use std::env;
use std::io::{self, Write};
use std::time::Duration;

use futures_util::StreamExt;
use shellpilot::{Executor, IoStream, SessionBuilder, SessionConfig, SessionEvent};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = SessionConfig {
        connect_timeout: Duration::from_secs(args.timeout),
        command_timeout: Duration::from_secs(args.timeout),
        debug: args.debug,
        ..Default::default()
    };

    println!("Connecting to {}:{}...", args.host, args.port);
    let socket = tokio::time::timeout(
        config.connect_timeout,
        TcpStream::connect((args.host.as_str(), args.port)),
    )
    .await??;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut session = SessionBuilder::new()
        .config(config)
        .cancel_token(cancel)
        .build(IoStream::new(socket))?;

    let prompt = session.initialize().await?;
    println!("Connected, prompt is {:?}\n", prompt);

    let mut events = session.events();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                SessionEvent::Output(chunk) => {
                    print!("{}", chunk);
                    let _ = io::stdout().flush();
                }
                SessionEvent::Debug { elapsed, message } => {
                    eprintln!("[{:>8.3}s] {}", elapsed.as_secs_f64(), message);
                }
            }
        }
    });

    let commands: Vec<&str> = if args.commands.is_empty() {
        vec!["uname -a"]
    } else {
        args.commands.iter().map(String::as_str).collect()
    };

    let batch = session.execute_batch(&commands, &args.vars).await?;

    drop(session);
    printer.await?;

    println!("\n{}", "-".repeat(50));
    for response in &batch.responses {
        println!(
            "{:<30} {:<16} {:>5} pages {:?}",
            response.command,
            response.completion.to_string(),
            response.pages,
            response.elapsed
        );
    }
    if batch.was_cancelled() {
        println!("Stopped early.");
    }

    Ok(())
}

struct Args {
    host: String,
    port: u16,
    timeout: u64,
    debug: bool,
    commands: Vec<String>,
    vars: HashMap<String, String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 23u16;
        let mut timeout = 30u64;
        let mut debug = false;
        let mut commands = Vec::new();
        let mut vars = HashMap::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(23);
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--command" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        commands.push(args[i].clone());
                    }
                }
                "--var" => {
                    i += 1;
                    if let Some((name, value)) = args.get(i).and_then(|a| a.split_once('=')) {
                        vars.insert(name.to_string(), value.to_string());
                    }
                }
                "--debug" | "-d" => debug = true,
                _ => {}
            }
            i += 1;
        }

        Self {
            host,
            port,
            timeout,
            debug,
            commands,
            vars,
        }
    }
}
