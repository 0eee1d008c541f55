//! Store em memória que fala o protocolo textual, para testes do engine.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::oneshot;

use stormview_client::{CounterAction, Transport};
use stormview_common::TransportError;

#[derive(Default)]
struct State {
    /// Ordem de inserção = ordem de enumeração.
    entries: Vec<(String, String, String)>,
    failing_gets: HashSet<String>,
    failing_commands: HashSet<String>,
    overrides: HashMap<String, String>,
    holds: HashMap<String, oneshot::Receiver<()>>,
    held_gets: HashMap<String, oneshot::Receiver<()>>,
    commands: Vec<String>,
}

impl State {
    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _, _)| k == key)
    }

    fn reply(&mut self, line: &str) -> String {
        if let Some(reply) = self.overrides.get(line) {
            return reply.clone();
        }
        let parts: Vec<&str> = line.split(' ').collect();
        match parts.as_slice() {
            ["KEYS"] => {
                let mut out = format!("*{}\r\n", self.entries.len());
                for (key, _, _) in &self.entries {
                    out.push_str(&format!("${}\r\n{key}\r\n", key.len()));
                }
                out.trim_end().to_string()
            }
            ["TTL", key] => match self.position(key) {
                Some(i) => self.entries[i].2.clone(),
                None => ":-2".into(),
            },
            ["DEL", key] => match self.position(key) {
                Some(i) => {
                    self.entries.remove(i);
                    ":1".into()
                }
                None => ":0".into(),
            },
            ["EXPIRE", key, secs] => match self.position(key) {
                Some(i) => {
                    self.entries[i].2 = format!(":{secs}");
                    ":1".into()
                }
                None => ":0".into(),
            },
            _ => "-ERR unknown command".into(),
        }
    }
}

pub(crate) struct FakeTransport {
    state: Mutex<State>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub(crate) fn insert(&self, key: &str, value: &str, ttl_reply: &str) {
        let mut state = self.state.lock().unwrap();
        match state.position(key) {
            Some(i) => state.entries[i] = (key.into(), value.into(), ttl_reply.into()),
            None => state
                .entries
                .push((key.into(), value.into(), ttl_reply.into())),
        }
    }

    pub(crate) fn fail_get(&self, key: &str) {
        self.state.lock().unwrap().failing_gets.insert(key.into());
    }

    pub(crate) fn fail_command(&self, line: &str) {
        self.state.lock().unwrap().failing_commands.insert(line.into());
    }

    pub(crate) fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_gets.clear();
        state.failing_commands.clear();
    }

    pub(crate) fn override_reply(&self, line: &str, reply: &str) {
        self.state
            .lock()
            .unwrap()
            .overrides
            .insert(line.into(), reply.into());
    }

    /// A próxima chamada de `line` calcula a resposta e espera o sinal.
    pub(crate) fn hold_next(&self, line: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().holds.insert(line.into(), rx);
        tx
    }

    /// A próxima leitura de `key` espera o sinal antes de responder.
    pub(crate) fn hold_get(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().held_gets.insert(key.into(), rx);
        tx
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }
}

fn refused() -> TransportError {
    TransportError::Network("connection refused".into())
}

impl Transport for FakeTransport {
    async fn command(&self, line: &str) -> Result<String, TransportError> {
        let (reply, hold) = {
            let mut state = self.state.lock().unwrap();
            state.commands.push(line.to_string());
            if state.failing_commands.contains(line) {
                return Err(refused());
            }
            let reply = state.reply(line);
            (reply, state.holds.remove(line))
        };
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        Ok(reply)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        let hold = self.state.lock().unwrap().held_gets.remove(key);
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        let state = self.state.lock().unwrap();
        if state.failing_gets.contains(key) {
            return Err(refused());
        }
        Ok(state
            .position(key)
            .map(|i| state.entries[i].1.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), TransportError> {
        self.insert(key, value, ":-1");
        Ok(())
    }

    async fn counter(&self, key: &str, action: CounterAction) -> Result<i64, TransportError> {
        let mut state = self.state.lock().unwrap();
        let current = match state.position(key) {
            Some(i) => state.entries[i].1.clone(),
            None => "0".into(),
        };
        let n: i64 = current.parse().map_err(|_| TransportError::Status {
            status: 400,
            detail: Some("Redis error: -ERR value is not an integer".into()),
        })?;
        let next = match action {
            CounterAction::Incr => n + 1,
            CounterAction::Decr => n - 1,
        };
        match state.position(key) {
            Some(i) => state.entries[i].1 = next.to_string(),
            None => state
                .entries
                .push((key.into(), next.to_string(), ":-1".into())),
        }
        Ok(next)
    }
}
