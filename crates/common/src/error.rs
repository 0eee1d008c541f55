use crate::GENERIC_NETWORK_ERROR;

/// Erros de decodificação de respostas do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("resposta não é um array")]
    NotAnArray,
    #[error("inteiro inválido: {0}")]
    InvalidInteger(String),
}

/// Erros de montagem/validação de comandos.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("comando desconhecido: {0}")]
    Unknown(String),
    #[error("número errado de argumentos para '{0}'")]
    WrongArity(String),
    #[error("chave inválida: '{0}'")]
    InvalidKey(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}

/// Erros do transporte HTTP até o gateway do store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("falha de rede: {0}")]
    Network(String),
    #[error("servidor respondeu {status}: {}", detail.as_deref().unwrap_or("sem detalhes"))]
    Status { status: u16, detail: Option<String> },
    #[error("corpo de resposta inválido: {0}")]
    Decode(String),
}

impl TransportError {
    /// Texto legível para o usuário: detalhe vindo do servidor, senão a
    /// mensagem genérica de rede.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Status {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            _ => GENERIC_NETWORK_ERROR.to_string(),
        }
    }
}

/// Erros do engine de sincronização.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A listagem de chaves falhou; o snapshot publicado fica vazio.
    #[error("falha ao enumerar chaves: {0}")]
    Enumeration(#[source] TransportError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl EngineError {
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Enumeration(e) | EngineError::Transport(e) => e.user_message(),
            EngineError::Command(e) => e.to_string(),
        }
    }
}
