//! Token escaping and line framing.
//!
//! HandlerSocket messages are lines of tab separated tokens. Framing relies
//! entirely on the `\t` and `\n` bytes, so neither may appear literally inside
//! a token. Every byte in `0x00..=0x0f` is therefore written as `0x01` followed
//! by the byte shifted by `0x40`, and a lone `0x00` stands for NULL.
//!
//! # Example
//! ```rust
//! use hsclient::codec::{decode, encode};
//!
//! let raw = Some(b"a\tb".to_vec());
//! let wire = encode(raw.as_deref());
//! assert_eq!(wire, b"a\x01\x49b");
//! assert_eq!(decode(&wire), raw);
//! ```

/// A single protocol token. `None` is the protocol NULL.
pub type Token = Option<Vec<u8>>;

pub const TOKEN_SEPARATOR: u8 = b'\t';
pub const LINE_TERMINATOR: u8 = b'\n';

const NULL_BYTE: u8 = 0x00;
const ESCAPE_PREFIX: u8 = 0x01;
const ESCAPE_SHIFT: u8 = 0x40;
const ESCAPED_MAX: u8 = 0x0f;

/// Encodes one token into a fresh buffer.
pub fn encode(token: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(token, &mut out);
    out
}

/// Appends the encoded form of `token` to `out`.
pub fn encode_into(token: Option<&[u8]>, out: &mut Vec<u8>) {
    let Some(bytes) = token else {
        out.push(NULL_BYTE);
        return;
    };

    out.reserve(bytes.len());
    for &b in bytes {
        if b <= ESCAPED_MAX {
            out.push(ESCAPE_PREFIX);
            out.push(b + ESCAPE_SHIFT);
        } else {
            out.push(b);
        }
    }
}

/// Decodes one token as received from the wire.
pub fn decode(raw: &[u8]) -> Token {
    if raw == [NULL_BYTE] {
        return None;
    }

    let mut out = Vec::with_capacity(raw.len());
    let mut idx = 0;
    while idx < raw.len() {
        let b = raw[idx];
        match raw.get(idx + 1) {
            Some(&next)
                if b == ESCAPE_PREFIX
                    && (ESCAPE_SHIFT..=ESCAPE_SHIFT + ESCAPED_MAX).contains(&next) =>
            {
                out.push(next - ESCAPE_SHIFT);
                idx += 2;
            }
            _ => {
                out.push(b);
                idx += 1;
            }
        }
    }
    Some(out)
}

/// Serializes a full command line, terminator included, into `out`.
///
/// `out` is cleared first so callers can reuse one buffer per connection.
pub fn encode_command(tokens: &[Token], out: &mut Vec<u8>) {
    out.clear();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(TOKEN_SEPARATOR);
        }
        encode_into(token.as_deref(), out);
    }
    out.push(LINE_TERMINATOR);
}

/// Splits a response line (terminator already stripped) and decodes each token.
pub fn decode_response(line: &[u8]) -> Vec<Token> {
    line.split(|&b| b == TOKEN_SEPARATOR).map(decode).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn null_is_single_nul() {
        assert_eq!(encode(None), vec![0x00]);
        assert_eq!(decode(&[0x00]), None);
    }

    #[test]
    fn empty_string_is_not_null() {
        assert_eq!(encode(Some(b"")), Vec::<u8>::new());
        assert_eq!(decode(b""), Some(Vec::new()));
    }

    #[test]
    fn control_bytes_are_shifted() {
        assert_eq!(encode(Some(&[0x03])), vec![0x01, 0x43]);
        assert_eq!(encode(Some(&[0x00, b'x'])), vec![0x01, 0x40, b'x']);
        assert_eq!(encode(Some(&[0x0f, 0x10])), vec![0x01, 0x4f, 0x10]);
    }

    #[test]
    fn escape_prefix_outside_range_passes_through() {
        assert_eq!(decode(&[0x01, 0x50]), Some(vec![0x01, 0x50]));
        assert_eq!(decode(&[b'a', 0x01]), Some(vec![b'a', 0x01]));
    }

    proptest! {
        #[test]
        fn any_token_survives_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let wire = encode(Some(&bytes));
            prop_assert_eq!(decode(&wire), Some(bytes));
        }

        #[test]
        fn encoded_tokens_never_contain_framing_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let wire = encode(Some(&bytes));
            prop_assert!(!wire.contains(&TOKEN_SEPARATOR), "tab leaked: {:?}", wire);
            prop_assert!(!wire.contains(&LINE_TERMINATOR), "newline leaked: {:?}", wire);
        }

        #[test]
        fn any_command_line_splits_back_into_its_tokens(
            tokens in prop::collection::vec(
                prop::option::of(prop::collection::vec(any::<u8>(), 0..32)),
                1..8,
            ),
        ) {
            let mut buf = Vec::new();
            encode_command(&tokens, &mut buf);
            prop_assert_eq!(buf.pop(), Some(LINE_TERMINATOR));
            prop_assert_eq!(decode_response(&buf), tokens);
        }
    }

    #[test]
    fn command_line_is_tab_joined_and_terminated() {
        let mut buf = vec![b'x'];
        encode_command(
            &[Some(b"P".to_vec()), None, Some(b"a\tb".to_vec())],
            &mut buf,
        );
        assert_eq!(buf, b"P\t\x00\ta\x01\x49b\n");
    }

    #[test]
    fn response_line_is_split_and_decoded() {
        let tokens = decode_response(b"0\t2\tk\x01\x4a1\t\x00");
        assert_eq!(
            tokens,
            vec![
                Some(b"0".to_vec()),
                Some(b"2".to_vec()),
                Some(b"k\n1".to_vec()),
                None
            ]
        );
    }
}
