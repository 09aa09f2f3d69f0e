//! Minimal RLP decoding for legacy raw-transaction payloads.
//!
//! The gateway only ever needs the recipient out of a signed legacy
//! transaction — a flat RLP list `[nonce, gasPrice, gasLimit, to, value,
//! data, v, r, s]` — so this is a decoder for exactly that shape: one
//! outer list of byte-strings. Anything else (typed transaction
//! envelopes, nested lists, truncated headers) is a decode failure, which
//! the validator surfaces as [`GatewayError::Decode`].

use thiserror::Error;

use crate::errors::GatewayError;

/// Zero-based position of the recipient in the legacy field list.
const TO_FIELD_INDEX: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RlpError {
    #[error("payload is not an rlp list")]
    NotAList,
    #[error("truncated rlp payload")]
    Truncated,
    #[error("unexpected nested list in transaction fields")]
    UnexpectedList,
    #[error("transaction has no recipient field")]
    MissingField,
    #[error("recipient field is not an address")]
    BadAddress,
}

impl From<RlpError> for GatewayError {
    fn from(_: RlpError) -> Self {
        GatewayError::Decode
    }
}

/// Extracts the recipient address from a hex-encoded signed legacy
/// transaction, normalized to a `0x`-prefixed string.
///
/// The recipient field is accepted in either of the two encodings seen
/// in the wild: 20 raw bytes (rendered as lower-case hex), or an
/// embedded ASCII `0x…` string (taken as-is; the allow-list comparison
/// downstream is case-insensitive anyway).
pub fn recipient_from_raw_transaction(payload: &str) -> Result<String, GatewayError> {
    let stripped = payload.strip_prefix("0x").unwrap_or(payload);
    let raw = hex::decode(stripped).map_err(|_| GatewayError::Decode)?;

    let fields = decode_byte_string_list(&raw)?;
    let recipient = fields.get(TO_FIELD_INDEX).ok_or(RlpError::MissingField)?;
    render_address(recipient).map_err(GatewayError::from)
}

fn render_address(bytes: &[u8]) -> Result<String, RlpError> {
    if bytes.len() == 20 {
        return Ok(format!("0x{}", hex::encode(bytes)));
    }
    match std::str::from_utf8(bytes) {
        Ok(s) if s.starts_with("0x") => Ok(s.to_owned()),
        _ => Err(RlpError::BadAddress),
    }
}

/// Decodes one RLP list whose items are all byte-strings.
fn decode_byte_string_list(raw: &[u8]) -> Result<Vec<&[u8]>, RlpError> {
    let (&prefix, rest) = raw.split_first().ok_or(RlpError::Truncated)?;

    let payload = match prefix {
        0xc0..=0xf7 => {
            let len = (prefix - 0xc0) as usize;
            rest.get(..len).ok_or(RlpError::Truncated)?
        }
        0xf8..=0xff => {
            let len_of_len = (prefix - 0xf7) as usize;
            let len_bytes = rest.get(..len_of_len).ok_or(RlpError::Truncated)?;
            let len = decode_length(len_bytes)?;
            let end = len_of_len.checked_add(len).ok_or(RlpError::Truncated)?;
            rest.get(len_of_len..end).ok_or(RlpError::Truncated)?
        }
        _ => return Err(RlpError::NotAList),
    };

    let mut items = Vec::new();
    let mut cursor = payload;
    while let Some((&prefix, rest)) = cursor.split_first() {
        let (item, remainder) = match prefix {
            // Single byte in [0x00, 0x7f] is its own encoding.
            0x00..=0x7f => cursor.split_at(1),
            0x80..=0xb7 => {
                let len = (prefix - 0x80) as usize;
                if rest.len() < len {
                    return Err(RlpError::Truncated);
                }
                (&cursor[1..1 + len], &cursor[1 + len..])
            }
            0xb8..=0xbf => {
                let len_of_len = (prefix - 0xb7) as usize;
                let len_bytes = rest.get(..len_of_len).ok_or(RlpError::Truncated)?;
                let len = decode_length(len_bytes)?;
                let start = 1 + len_of_len;
                let end = start.checked_add(len).ok_or(RlpError::Truncated)?;
                if cursor.len() < end {
                    return Err(RlpError::Truncated);
                }
                (&cursor[start..end], &cursor[end..])
            }
            // Legacy transaction fields are flat byte-strings only.
            0xc0..=0xff => return Err(RlpError::UnexpectedList),
        };
        items.push(item);
        cursor = remainder;
    }

    Ok(items)
}

fn decode_length(bytes: &[u8]) -> Result<usize, RlpError> {
    if bytes.is_empty() || bytes.len() > std::mem::size_of::<usize>() {
        return Err(RlpError::Truncated);
    }
    let mut len = 0usize;
    for &b in bytes {
        len = (len << 8) | b as usize;
    }
    Ok(len)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // Test-side RLP encoders, so fixtures stay readable.
    pub(crate) fn rlp_bytes(b: &[u8]) -> Vec<u8> {
        if b.len() == 1 && b[0] < 0x80 {
            return b.to_vec();
        }
        if b.len() <= 55 {
            let mut out = vec![0x80 + b.len() as u8];
            out.extend_from_slice(b);
            return out;
        }
        let len_bytes = b.len().to_be_bytes();
        let significant: Vec<u8> = len_bytes.iter().copied().skip_while(|&x| x == 0).collect();
        let mut out = vec![0xb7 + significant.len() as u8];
        out.extend_from_slice(&significant);
        out.extend_from_slice(b);
        out
    }

    pub(crate) fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
        let payload: Vec<u8> = items.iter().flatten().copied().collect();
        if payload.len() <= 55 {
            let mut out = vec![0xc0 + payload.len() as u8];
            out.extend_from_slice(&payload);
            return out;
        }
        let len_bytes = payload.len().to_be_bytes();
        let significant: Vec<u8> = len_bytes.iter().copied().skip_while(|&x| x == 0).collect();
        let mut out = vec![0xf7 + significant.len() as u8];
        out.extend_from_slice(&significant);
        out.extend_from_slice(&payload);
        out
    }

    pub(crate) fn legacy_tx_hex(to_field: Vec<u8>) -> String {
        let fields = vec![
            rlp_bytes(&[0x01]),             // nonce
            rlp_bytes(&[0x04, 0xa8, 0x17]), // gasPrice
            rlp_bytes(&[0x52, 0x08]),       // gasLimit
            rlp_bytes(&to_field),           // to
            rlp_bytes(&[]),                 // value
            rlp_bytes(&vec![0xab; 80]),     // data, long enough for a 0xb8 header
            rlp_bytes(&[0x25]),             // v
            rlp_bytes(&[0x11; 32]),         // r
            rlp_bytes(&[0x22; 32]),         // s
        ];
        format!("0x{}", hex::encode(rlp_list(&fields)))
    }

    const ADDRESS: [u8; 20] = [
        0xde, 0xad, 0xbe, 0xef, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa,
        0xbb, 0xcc, 0xdd, 0xee, 0xff,
    ];

    #[test]
    fn recipient_from_raw_bytes() {
        let tx = legacy_tx_hex(ADDRESS.to_vec());
        let recipient = recipient_from_raw_transaction(&tx).unwrap();
        assert_eq!(recipient, format!("0x{}", hex::encode(ADDRESS)));
    }

    #[test]
    fn recipient_from_embedded_hex_string() {
        let address = format!("0x{}", hex::encode(ADDRESS));
        let tx = legacy_tx_hex(address.clone().into_bytes());
        assert_eq!(recipient_from_raw_transaction(&tx).unwrap(), address);
    }

    #[test]
    fn both_encodings_agree() {
        let raw = recipient_from_raw_transaction(&legacy_tx_hex(ADDRESS.to_vec())).unwrap();
        let embedded = recipient_from_raw_transaction(&legacy_tx_hex(
            format!("0x{}", hex::encode(ADDRESS)).into_bytes(),
        ))
        .unwrap();
        assert_eq!(raw.to_lowercase(), embedded.to_lowercase());
    }

    #[test]
    fn bad_hex_is_a_decode_error() {
        assert!(matches!(
            recipient_from_raw_transaction("0xzzzz"),
            Err(GatewayError::Decode)
        ));
    }

    #[test]
    fn non_list_payload_is_rejected() {
        let not_a_list = format!("0x{}", hex::encode(rlp_bytes(&[0xaa; 30])));
        assert!(matches!(
            recipient_from_raw_transaction(&not_a_list),
            Err(GatewayError::Decode)
        ));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let tx = legacy_tx_hex(ADDRESS.to_vec());
        let truncated = &tx[..tx.len() - 8];
        assert!(matches!(
            recipient_from_raw_transaction(truncated),
            Err(GatewayError::Decode)
        ));
    }

    #[test]
    fn short_field_list_is_missing_the_recipient() {
        let fields = vec![rlp_bytes(&[0x01]), rlp_bytes(&[0x02])];
        let tx = format!("0x{}", hex::encode(rlp_list(&fields)));
        assert!(matches!(
            recipient_from_raw_transaction(&tx),
            Err(GatewayError::Decode)
        ));
    }

    #[test]
    fn garbage_recipient_width_is_rejected() {
        let tx = legacy_tx_hex(vec![0x01, 0x02, 0x03]);
        assert!(matches!(
            recipient_from_raw_transaction(&tx),
            Err(GatewayError::Decode)
        ));
    }
}
