use std::fmt;

/// TTL de uma chave como conhecido localmente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Sem expiração (ou TTL ilegível).
    Persistent,
    /// Sentinela negativo devolvido pelo servidor (-1, -2). Nunca decrementa.
    NotApplicable(i64),
    /// Segundos restantes. `0` = expirada mas ainda visível.
    Remaining(u64),
}

impl Ttl {
    /// Converte a resposta de `TTL <key>` já decodificada.
    pub fn from_reply(reply: Option<i64>) -> Self {
        match reply {
            None => Ttl::Persistent,
            Some(n) if n < 0 => Ttl::NotApplicable(n),
            Some(n) => Ttl::Remaining(n as u64),
        }
    }

    pub fn is_counting(&self) -> bool {
        matches!(self, Ttl::Remaining(n) if *n > 0)
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Ttl::Remaining(0))
    }

    fn decremented(self) -> Self {
        match self {
            Ttl::Remaining(n) => Ttl::Remaining(n.saturating_sub(1)),
            other => other,
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Persistent => f.write_str("persistent"),
            Ttl::NotApplicable(_) => f.write_str("n/a"),
            Ttl::Remaining(0) => f.write_str("expired"),
            Ttl::Remaining(n) => write!(f, "{n}s"),
        }
    }
}

/// Uma chave do store com seu último valor e TTL conhecidos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPreview {
    pub key: String,
    pub value: Option<String>,
    pub ttl: Ttl,
}

impl KeyPreview {
    pub fn new(key: impl Into<String>, value: Option<String>, ttl: Ttl) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
        }
    }

    /// Entrada para chave cuja hidratação falhou.
    pub fn unreadable(key: impl Into<String>) -> Self {
        Self::new(key, None, Ttl::Persistent)
    }
}

/// Conjunto de chaves na ordem da enumeração. Substituído por inteiro,
/// nunca editado campo a campo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<KeyPreview>,
}

impl Snapshot {
    pub fn new(entries: Vec<KeyPreview>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[KeyPreview] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPreview> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&KeyPreview> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Alguma entrada com TTL positivo?
    pub fn has_countdown(&self) -> bool {
        self.entries.iter().any(|e| e.ttl.is_counting())
    }

    /// Ainda há o que decrementar ou podar.
    pub fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.ttl, Ttl::Remaining(_)))
    }

    /// Um tick da contagem local.
    ///
    /// Entradas que já estavam em `0` saem; as positivas perdem 1 segundo.
    /// Assim uma chave que acabou de zerar fica visível como expirada até o
    /// tick seguinte.
    pub fn ticked(&self) -> Snapshot {
        let entries = self
            .entries
            .iter()
            .filter(|e| !e.ttl.is_expired())
            .map(|e| KeyPreview {
                ttl: e.ttl.decremented(),
                ..e.clone()
            })
            .collect();
        Snapshot { entries }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a KeyPreview;
    type IntoIter = std::slice::Iter<'a, KeyPreview>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
