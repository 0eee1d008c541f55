use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use stormview_client::{HttpTransport, Transport};
use stormview_common::{CommandError, DEFAULT_API_URL, DEFAULT_TIMEOUT_MS};
use stormview_engine::{Dispatcher, EngineConfig, Mutation, PreviewSync, Snapshot};

#[derive(Parser, Debug)]
#[command(name = "stormview-cli", about = "StormView CLI client")]
struct Args {
    /// URL base do gateway HTTP do store.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api: String,
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

/// Entrada já interpretada de uma linha do usuário.
#[derive(Debug, PartialEq)]
enum Input {
    Mutation(Mutation),
    Keys,
    Refresh,
    Raw(String),
    Help,
}

const HELP: &str = "\
comandos:
  set <key> <value...>   get <key>     del <key>
  incr <key>             decr <key>    ttl <key>
  expire <key> [secs]    keys          refresh
  raw <linha...>         help          quit";

struct Session<T: Transport> {
    transport: Arc<T>,
    dispatcher: Dispatcher<T>,
}

impl<T: Transport> Session<T> {
    fn new(transport: Arc<T>) -> Self {
        let sync = Arc::new(PreviewSync::new(
            Arc::clone(&transport),
            &EngineConfig::default(),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&transport), sync);
        Self {
            transport,
            dispatcher,
        }
    }

    async fn refresh(&self) -> Option<String> {
        match self.dispatcher.sync().refresh().await {
            Ok(outcome) => {
                debug!("refresh: {outcome:?}");
                None
            }
            Err(e) => Some(format!("(error) {}", e.user_message())),
        }
    }

    async fn run(&self, input: Input) -> String {
        match input {
            Input::Mutation(mutation) => {
                let outcome = self.dispatcher.perform(mutation).await;
                match self.dispatcher.state().borrow().error.as_deref() {
                    Some(error) => format!("(error) {error}"),
                    None => outcome.to_string(),
                }
            }
            Input::Keys => format_snapshot(&self.dispatcher.sync().snapshot()),
            Input::Refresh => match self.refresh().await {
                Some(error) => error,
                None => format_snapshot(&self.dispatcher.sync().snapshot()),
            },
            Input::Raw(line) => {
                let mut reply = match self.transport.command(&line).await {
                    Ok(reply) => reply,
                    Err(e) => format!("(error) {}", e.user_message()),
                };
                // Comando cru pode ter mudado o store.
                if let Some(error) = self.refresh().await {
                    reply.push('\n');
                    reply.push_str(&error);
                }
                reply
            }
            Input::Help => HELP.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stormview=warn".into()),
        )
        .init();

    let args = Args::parse();
    let transport = Arc::new(HttpTransport::new(
        &args.api,
        Duration::from_millis(args.timeout_ms),
    )?);
    let session = Session::new(transport);

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        let input = parse_input(&args.command)?;
        println!("{}", session.run(input).await);
        return Ok(());
    }

    if let Some(error) = session.refresh().await {
        println!("{error}");
    }
    println!("Conectado a {}", args.api);

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();

    loop {
        print!("stormview> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input).await? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        match parse_input(&tokens) {
            Ok(parsed) => println!("{}", session.run(parsed).await),
            Err(e) => println!("(error) {e}"),
        }
    }

    Ok(())
}

/// Converte tokens em uma entrada do REPL.
fn parse_input(tokens: &[String]) -> Result<Input, CommandError> {
    let (name, args) = tokens
        .split_first()
        .ok_or_else(|| CommandError::InvalidArgument("linha vazia".into()))?;
    let name = name.to_lowercase();

    let one_key = |cmd: &str| -> Result<String, CommandError> {
        match args {
            [key] => Ok(key.clone()),
            _ => Err(CommandError::WrongArity(cmd.to_uppercase())),
        }
    };

    let input = match name.as_str() {
        "set" => match args {
            [key, value @ ..] if !value.is_empty() => Input::Mutation(Mutation::Set {
                key: key.clone(),
                value: value.join(" "),
            }),
            _ => return Err(CommandError::WrongArity("SET".into())),
        },
        "get" => Input::Mutation(Mutation::Get { key: one_key("get")? }),
        "del" => Input::Mutation(Mutation::Delete { key: one_key("del")? }),
        "incr" => Input::Mutation(Mutation::Increment {
            key: one_key("incr")?,
        }),
        "decr" => Input::Mutation(Mutation::Decrement {
            key: one_key("decr")?,
        }),
        "ttl" => Input::Mutation(Mutation::Ttl { key: one_key("ttl")? }),
        "expire" => match args {
            [key] => Input::Mutation(Mutation::expire(key.clone())),
            [key, secs] => {
                let seconds = secs.parse::<u64>().map_err(|_| {
                    CommandError::InvalidArgument(format!("'{secs}' não é um inteiro"))
                })?;
                Input::Mutation(Mutation::Expire {
                    key: key.clone(),
                    seconds,
                })
            }
            _ => return Err(CommandError::WrongArity("EXPIRE".into())),
        },
        "keys" if args.is_empty() => Input::Keys,
        "refresh" if args.is_empty() => Input::Refresh,
        "raw" if !args.is_empty() => Input::Raw(args.join(" ")),
        "help" => Input::Help,
        "keys" | "refresh" | "raw" => return Err(CommandError::WrongArity(name.to_uppercase())),
        _ => return Err(CommandError::Unknown(name.clone())),
    };
    Ok(input)
}

/// Formata o snapshot para exibição humana.
fn format_snapshot(snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return "(empty snapshot)".to_string();
    }
    snapshot
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let value = match &entry.value {
                Some(v) => format!("\"{v}\""),
                None => "(nil)".to_string(),
            };
            format!("{}) {} = {value} [{}]", i + 1, entry.key, entry.ttl)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tokeniza a linha de input com suporte a strings quoted.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut quote_char = '"';
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quote {
            if c == quote_char {
                in_quote = false;
            } else if c == '\\' {
                match chars.peek() {
                    Some(&next) if matches!(next, '"' | '\'' | '\\') => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push(c),
                }
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quote = true;
            quote_char = c;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
