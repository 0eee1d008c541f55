use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use stormview_client::Transport;
use stormview_common::EngineError;
use stormview_protocol::{Command, parse_integer, try_parse_array};

use crate::snapshot::{KeyPreview, Snapshot, Ttl};

/// Descobre as chaves do store e busca valor + TTL de cada uma.
pub struct Hydrator<T> {
    transport: Arc<T>,
}

impl<T: Transport> Hydrator<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Enumeração + hidratação completa.
    ///
    /// Falha apenas se a enumeração falhar; erros por chave viram entradas
    /// com valor e TTL vazios.
    pub async fn refresh(&self) -> Result<Snapshot, EngineError> {
        let keys = self.enumerate().await?;
        Ok(self.hydrate(keys).await)
    }

    /// Lista as chaves via `KEYS`, na ordem devolvida e sem duplicatas.
    pub async fn enumerate(&self) -> Result<Vec<String>, EngineError> {
        let line = Command::Keys.to_line()?;
        let reply = self
            .transport
            .command(&line)
            .await
            .map_err(EngineError::Enumeration)?;

        let keys = match try_parse_array(&reply) {
            Ok(keys) => keys,
            Err(e) => {
                debug!("resposta de KEYS ignorada ({e}): {reply:?}");
                Vec::new()
            }
        };

        let mut seen = HashSet::with_capacity(keys.len());
        Ok(keys.into_iter().filter(|k| seen.insert(k.clone())).collect())
    }

    /// Busca todas as chaves em paralelo e só devolve quando todas terminam.
    pub async fn hydrate(&self, keys: Vec<String>) -> Snapshot {
        let entries = join_all(keys.into_iter().map(|key| self.hydrate_key(key))).await;
        debug!("{} chaves hidratadas", entries.len());
        Snapshot::new(entries)
    }

    async fn hydrate_key(&self, key: String) -> KeyPreview {
        let ttl_line = match Command::Ttl(key.clone()).to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("chave não hidratável: {e}");
                return KeyPreview::unreadable(key);
            }
        };

        let (value, ttl) = tokio::join!(
            self.transport.get(&key),
            self.transport.command(&ttl_line)
        );

        match (value, ttl) {
            (Ok(value), Ok(reply)) => {
                let ttl = Ttl::from_reply(parse_integer(&reply));
                KeyPreview::new(key, value, ttl)
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(key = %key, "falha ao hidratar chave: {e}");
                KeyPreview::unreadable(key)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeTransport;

    fn hydrator(fake: &Arc<FakeTransport>) -> Hydrator<FakeTransport> {
        Hydrator::new(Arc::clone(fake))
    }

    #[tokio::test]
    async fn refresh_combines_value_and_ttl() {
        let fake = Arc::new(FakeTransport::new());
        fake.insert("foo", "bar", ":10");
        fake.insert("bar", "baz", "+OK");

        let snapshot = hydrator(&fake).refresh().await.unwrap();

        assert_eq!(
            snapshot.entries(),
            &[
                KeyPreview::new("foo", Some("bar".into()), Ttl::Remaining(10)),
                KeyPreview::new("bar", Some("baz".into()), Ttl::Persistent),
            ]
        );
    }

    #[tokio::test]
    async fn reads_are_issued_concurrently() {
        let fake = Arc::new(FakeTransport::new());
        fake.insert("a", "1", ":10");
        fake.insert("b", "2", ":-1");
        let release = fake.hold_get("a");

        let task = {
            let hydrator = hydrator(&fake);
            tokio::spawn(async move { hydrator.refresh().await })
        };

        // Com o valor de "a" preso, o TTL de "a" e as leituras de "b" já saíram.
        let issued = async {
            while !["TTL a", "TTL b"]
                .iter()
                .all(|line| fake.commands().iter().any(|c| c == line))
            {
                tokio::task::yield_now().await;
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(1), issued)
            .await
            .unwrap();
        assert!(!task.is_finished());

        release.send(()).unwrap();
        let snapshot = task.await.unwrap().unwrap();
        assert_eq!(
            snapshot.entries(),
            &[
                KeyPreview::new("a", Some("1".into()), Ttl::Remaining(10)),
                KeyPreview::new("b", Some("2".into()), Ttl::NotApplicable(-1)),
            ]
        );
    }

    #[tokio::test]
    async fn failed_value_read_keeps_other_keys() {
        let fake = Arc::new(FakeTransport::new());
        fake.insert("a", "1", ":5");
        fake.insert("broken", "2", ":5");
        fake.insert("c", "3", ":-1");
        fake.fail_get("broken");

        let snapshot = hydrator(&fake).refresh().await.unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get("broken").unwrap(), &KeyPreview::unreadable("broken"));
        assert_eq!(snapshot.get("a").unwrap().value.as_deref(), Some("1"));
        assert_eq!(snapshot.get("c").unwrap().ttl, Ttl::NotApplicable(-1));
    }

    #[tokio::test]
    async fn failed_ttl_read_nulls_entry() {
        let fake = Arc::new(FakeTransport::new());
        fake.insert("a", "1", ":5");
        fake.fail_command("TTL a");

        let snapshot = hydrator(&fake).refresh().await.unwrap();
        assert_eq!(snapshot.get("a").unwrap(), &KeyPreview::unreadable("a"));
    }

    #[tokio::test]
    async fn enumeration_failure_is_distinguishable() {
        let fake = Arc::new(FakeTransport::new());
        fake.insert("a", "1", ":5");
        fake.fail_command("KEYS");

        let err = hydrator(&fake).refresh().await.unwrap_err();
        assert!(matches!(err, EngineError::Enumeration(_)));
    }

    #[tokio::test]
    async fn malformed_keys_reply_is_empty() {
        let fake = Arc::new(FakeTransport::new());
        fake.override_reply("KEYS", "-ERR unknown command");

        let snapshot = hydrator(&fake).refresh().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn duplicate_keys_are_collapsed() {
        let fake = Arc::new(FakeTransport::new());
        fake.insert("a", "1", ":-1");
        fake.insert("b", "2", ":-1");
        fake.override_reply("KEYS", "*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\na");

        let keys = hydrator(&fake).enumerate().await.unwrap();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn missing_value_is_none() {
        let fake = Arc::new(FakeTransport::new());
        fake.override_reply("KEYS", "*1\r\n$5\r\nghost");

        let snapshot = hydrator(&fake).refresh().await.unwrap();
        assert_eq!(
            snapshot.get("ghost").unwrap(),
            &KeyPreview::new("ghost", None, Ttl::NotApplicable(-2))
        );
    }
}
