use std::fmt;
use std::future::Future;

use stormview_common::TransportError;

/// Operação sobre contador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Incr,
    Decr,
}

impl CounterAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterAction::Incr => "incr",
            CounterAction::Decr => "decr",
        }
    }
}

impl fmt::Display for CounterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Superfície mínima do store remoto consumida pelo engine.
///
/// Implementações precisam ser `Send + Sync` para que o engine possa ser
/// compartilhado entre tasks (timer, resync periódico e dispatcher).
pub trait Transport: Send + Sync + 'static {
    /// Envia uma linha de comando pelo canal bulk e devolve a resposta crua.
    fn command(&self, line: &str) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Leitura direta de valor; `None` se a chave não existe.
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    fn set(&self, key: &str, value: &str)
    -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Incrementa ou decrementa, devolvendo o valor resultante.
    fn counter(
        &self,
        key: &str,
        action: CounterAction,
    ) -> impl Future<Output = Result<i64, TransportError>> + Send;
}
