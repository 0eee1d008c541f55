//! Decodificação das respostas textuais devolvidas pelo canal de comandos.
//!
//! O gateway devolve a resposta do store como texto, linha a linha:
//!
//! ```text
//! *2\r\n$3\r\nfoo\r\n$3\r\nbar
//! ```
//!
//! Formato malformado nunca é fatal: quem chama recebe um vetor vazio ou
//! `None` ("desconhecido").

use stormview_common::ProtocolError;

/// Extrai os payloads de um array-reply, na ordem em que aparecem.
///
/// Retorna vetor vazio se a resposta não começar com `*`.
pub fn parse_array(reply: &str) -> Vec<String> {
    try_parse_array(reply).unwrap_or_default()
}

/// Como [`parse_array`], mas informa por que a resposta foi rejeitada.
pub fn try_parse_array(reply: &str) -> Result<Vec<String>, ProtocolError> {
    let mut lines = split_lines(reply);

    let header = lines.next().ok_or(ProtocolError::NotAnArray)?;
    let count = header.strip_prefix('*').ok_or(ProtocolError::NotAnArray)?;

    // Contagem anunciada é só um teto; a leitura para quando as linhas acabam.
    let declared = count.trim().parse::<i64>().ok();
    let limit = match declared {
        Some(n) if n < 0 => return Ok(Vec::new()),
        Some(n) => n as usize,
        None => usize::MAX,
    };

    let mut items = Vec::with_capacity(limit.min(1024));
    // Nulos também contam como elemento do array.
    let mut seen = 0;
    while seen < limit {
        let Some(len_line) = lines.next() else {
            break;
        };
        seen += 1;
        // Bulk nulo não tem linha de payload.
        if len_line.trim() == "$-1" {
            continue;
        }
        let Some(payload) = lines.next() else {
            break;
        };
        items.push(payload.to_string());
    }

    Ok(items)
}

/// Lê uma resposta inteira (`:<n>`). Qualquer outra coisa vira `None`.
pub fn parse_integer(reply: &str) -> Option<i64> {
    try_parse_integer(reply).ok()
}

pub fn try_parse_integer(reply: &str) -> Result<i64, ProtocolError> {
    let trimmed = reply.trim();
    let digits = trimmed
        .strip_prefix(':')
        .ok_or_else(|| ProtocolError::InvalidInteger(trimmed.to_string()))?;
    digits
        .trim()
        .parse::<i64>()
        .map_err(|e| ProtocolError::InvalidInteger(format!("{trimmed}: {e}")))
}

fn split_lines(reply: &str) -> impl Iterator<Item = &str> {
    let body = reply.strip_suffix("\r\n").unwrap_or(reply);
    body.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}
