use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use stormview_client::{CounterAction, Transport};
use stormview_common::{DEFAULT_EXPIRE_SECS, EngineError};
use stormview_protocol::{Command, parse_integer};

use crate::sync::PreviewSync;

/// Ações do usuário sobre o store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Increment { key: String },
    Decrement { key: String },
    Expire { key: String, seconds: u64 },
    Ttl { key: String },
}

impl Mutation {
    /// `EXPIRE` com o prazo padrão.
    pub fn expire(key: impl Into<String>) -> Self {
        Mutation::Expire {
            key: key.into(),
            seconds: DEFAULT_EXPIRE_SECS,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Mutation::Set { key, .. }
            | Mutation::Get { key }
            | Mutation::Delete { key }
            | Mutation::Increment { key }
            | Mutation::Decrement { key }
            | Mutation::Expire { key, .. }
            | Mutation::Ttl { key } => key,
        }
    }

    /// Comando textual equivalente.
    pub fn command(&self) -> Command {
        match self {
            Mutation::Set { key, value } => Command::Set {
                key: key.clone(),
                value: value.clone(),
            },
            Mutation::Get { key } => Command::Get(key.clone()),
            Mutation::Delete { key } => Command::Del(key.clone()),
            Mutation::Increment { key } => Command::Incr(key.clone()),
            Mutation::Decrement { key } => Command::Decr(key.clone()),
            Mutation::Expire { key, seconds } => Command::Expire {
                key: key.clone(),
                seconds: *seconds,
            },
            Mutation::Ttl { key } => Command::Ttl(key.clone()),
        }
    }
}

/// Resultado visível de uma mutação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored,
    Value(Option<String>),
    Deleted,
    NotFound,
    Counter(i64),
    ExpirySet { seconds: u64 },
    ExpiryNotSet,
    /// `None` quando a resposta não era inteira.
    Ttl(Option<i64>),
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Stored => f.write_str("OK"),
            Outcome::Value(Some(v)) => write!(f, "\"{v}\""),
            Outcome::Value(None) => f.write_str("(nil)"),
            Outcome::Deleted => f.write_str("(deleted)"),
            Outcome::NotFound => f.write_str("(not found)"),
            Outcome::Counter(n) => write!(f, "(integer) {n}"),
            Outcome::ExpirySet { seconds } => write!(f, "expire set to {seconds}s"),
            Outcome::ExpiryNotSet => f.write_str("expire not set"),
            Outcome::Ttl(Some(n)) => write!(f, "TTL: {n}"),
            Outcome::Ttl(None) => f.write_str("TTL: unknown"),
            Outcome::Failed => f.write_str("(error)"),
        }
    }
}

/// Estado observável do dispatcher, sempre trocado por inteiro.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchState {
    pub busy: bool,
    pub error: Option<String>,
    pub last: Option<Outcome>,
}

/// Executa mutações com contrato uniforme de busy/erro e dispara um refresh
/// completo ao final de cada uma.
///
/// Mutações sobrepostas não são serializadas aqui; cabe a quem chama.
pub struct Dispatcher<T> {
    transport: Arc<T>,
    sync: Arc<PreviewSync<T>>,
    state: watch::Sender<DispatchState>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: Arc<T>, sync: Arc<PreviewSync<T>>) -> Self {
        let (state, _) = watch::channel(DispatchState::default());
        Self {
            transport,
            sync,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<DispatchState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    pub fn sync(&self) -> &Arc<PreviewSync<T>> {
        &self.sync
    }

    pub async fn perform(&self, mutation: Mutation) -> Outcome {
        self.state.send_modify(|s| {
            s.busy = true;
            s.error = None;
        });

        let (outcome, error) = match self.execute(&mutation).await {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                warn!(key = mutation.key(), "mutação falhou: {e}");
                (Outcome::Failed, Some(e.user_message()))
            }
        };

        self.state.send_replace(DispatchState {
            busy: false,
            error,
            last: Some(outcome.clone()),
        });

        if let Err(e) = self.sync.refresh().await {
            warn!("refresh pós-mutação falhou: {e}");
        }

        outcome
    }

    async fn execute(&self, mutation: &Mutation) -> Result<Outcome, EngineError> {
        // Toda mutação passa pela forma textual: valida a chave mesmo quando o
        // envio é por endpoint direto.
        let line = mutation.command().to_line()?;
        debug!("executando {line}");

        let outcome = match mutation {
            Mutation::Set { key, value } => {
                self.transport.set(key, value).await?;
                Outcome::Stored
            }
            Mutation::Get { key } => Outcome::Value(self.transport.get(key).await?),
            Mutation::Delete { .. } => match parse_integer(&self.transport.command(&line).await?) {
                Some(1) => Outcome::Deleted,
                _ => Outcome::NotFound,
            },
            Mutation::Increment { key } => {
                Outcome::Counter(self.transport.counter(key, CounterAction::Incr).await?)
            }
            Mutation::Decrement { key } => {
                Outcome::Counter(self.transport.counter(key, CounterAction::Decr).await?)
            }
            Mutation::Expire { seconds, .. } => {
                match parse_integer(&self.transport.command(&line).await?) {
                    Some(1) => Outcome::ExpirySet { seconds: *seconds },
                    _ => Outcome::ExpiryNotSet,
                }
            }
            Mutation::Ttl { .. } => {
                Outcome::Ttl(parse_integer(&self.transport.command(&line).await?))
            }
        };
        Ok(outcome)
    }
}
