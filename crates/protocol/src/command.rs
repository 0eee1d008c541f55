use std::fmt;

use stormview_common::CommandError;

/// Comandos enviados pelo canal de texto do store.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Keys,
    Get(String),
    Set { key: String, value: String },
    Del(String),
    Expire { key: String, seconds: u64 },
    Ttl(String),
    Incr(String),
    Decr(String),
}

impl Command {
    /// Nome do comando como o store espera.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Keys => "KEYS",
            Command::Get(_) => "GET",
            Command::Set { .. } => "SET",
            Command::Del(_) => "DEL",
            Command::Expire { .. } => "EXPIRE",
            Command::Ttl(_) => "TTL",
            Command::Incr(_) => "INCR",
            Command::Decr(_) => "DECR",
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Keys => None,
            Command::Get(key)
            | Command::Del(key)
            | Command::Ttl(key)
            | Command::Incr(key)
            | Command::Decr(key) => Some(key),
            Command::Set { key, .. } | Command::Expire { key, .. } => Some(key),
        }
    }

    /// Encoda o comando como linha de texto, validando a chave.
    ///
    /// O protocolo separa argumentos por espaço, então chaves vazias ou com
    /// espaços não podem ser representadas.
    pub fn to_line(&self) -> Result<String, CommandError> {
        if let Some(key) = self.key() {
            validate_key(key)?;
        }
        Ok(self.to_string())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Keys => f.write_str("KEYS"),
            Command::Set { key, value } => write!(f, "SET {key} {value}"),
            Command::Expire { key, seconds } => write!(f, "EXPIRE {key} {seconds}"),
            Command::Get(key)
            | Command::Del(key)
            | Command::Ttl(key)
            | Command::Incr(key)
            | Command::Decr(key) => write!(f, "{} {key}", self.name()),
        }
    }
}

/// Chave precisa ser não vazia e sem whitespace.
pub fn validate_key(key: &str) -> Result<(), CommandError> {
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(CommandError::InvalidKey(key.to_string()));
    }
    Ok(())
}
