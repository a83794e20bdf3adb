// Decoder for the brace-delimited event payload.
//
// The payload is not JSON: keys are bare, values are single-quoted and the
// whole region is split across whitespace tokens by the logger, e.g.
//
// ```text
// Parsed Data: { ts: '1717231140', id: 'N1', mt: 'ALM', st: '1' }
// ```
//
// Tokens between the first `{` and the first `}` are trimmed and joined with
// no separator, the result is split on `,` and every group on its first `:`.
// One layer of `'` quotes is removed from keys and values. Commas inside
// values are not supported, and whitespace inside a quoted value is lost.

use crate::classifier::{find_token, CLOSE_BRACE, OPEN_BRACE};
use crate::{PayloadError, RawEventPayload};
use tracing::debug;

pub fn decode_payload<S: AsRef<str>>(tokens: &[S]) -> Result<RawEventPayload, PayloadError> {
    let open = find_token(tokens, OPEN_BRACE).ok_or(PayloadError::MissingOpenBrace)?;
    let close = find_token(tokens, CLOSE_BRACE).ok_or(PayloadError::MissingCloseBrace)?;
    if close < open {
        return Err(PayloadError::MisorderedBraces);
    }

    let compact: String = tokens[open + 1..close]
        .iter()
        .map(|token| token.as_ref().trim())
        .collect();

    let mut payload = RawEventPayload::new();
    for group in compact.split(',') {
        let (key, value) = group
            .split_once(':')
            .ok_or_else(|| PayloadError::MalformedField(group.to_string()))?;
        let key = strip_quotes(key);
        if key.is_empty() {
            return Err(PayloadError::MalformedField(group.to_string()));
        }
        if let Some(previous) = payload.insert(key.to_string(), strip_quotes(value).to_string()) {
            debug!("Duplicate payload key '{}', replacing '{}'", key, previous);
        }
    }

    Ok(payload)
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix('\'').unwrap_or(s);
    s.strip_suffix('\'').unwrap_or(s)
}
