use crate::{codec::Token, error::CommunicationError};

/// One returned row, in the descriptor's field order.
pub type Tuple = Vec<Token>;

/// One returned row as `(field, value)` pairs, in the descriptor's field order.
pub type Record = Vec<(String, Token)>;

/// Rows returned by a find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rows {
    Tuples(Vec<Tuple>),
    Records(Vec<Record>),
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Tuples(rows) => rows.len(),
            Rows::Records(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inserted {
    Stored,
    /// Key generated by an auto-increment column.
    Generated(Token),
}

/// Response sent when a data command names an index that is not open.
pub(crate) const INDEX_NOT_OPEN: [&[u8]; 3] = [b"2", b"1", b"stmtnum"];
pub(crate) const OK: [&[u8]; 2] = [b"0", b"1"];
pub(crate) const DUPLICATE_KEY: [&[u8]; 2] = [b"1", b"1"];

fn token_is(token: &Token, expected: &[u8]) -> bool {
    matches!(token, Some(bytes) if bytes == expected)
}

pub(crate) fn starts_with(response: &[Token], expected: &[&[u8]]) -> bool {
    response.len() >= expected.len()
        && response.iter().zip(expected).all(|(t, e)| token_is(t, e))
}

pub(crate) fn is_exactly(response: &[Token], expected: &[&[u8]]) -> bool {
    response.len() == expected.len() && starts_with(response, expected)
}

pub(crate) fn status_ok(response: &[Token]) -> bool {
    response.first().is_some_and(|t| token_is(t, b"0"))
}

/// Error text the server appends after the status pair.
pub(crate) fn server_message(response: &[Token]) -> Option<String> {
    match response.get(2) {
        Some(Some(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Whether a modify response reports a non-zero row count.
pub(crate) fn affected(token: &Token) -> bool {
    matches!(token, Some(bytes) if !bytes.is_empty() && bytes.as_slice() != b"0")
}

/// Groups `0 <columns> <v..>` into tuples of `columns` tokens.
pub(crate) fn tuples(mut response: Vec<Token>) -> Result<Vec<Tuple>, CommunicationError> {
    let columns = response
        .get(1)
        .and_then(|t| t.as_deref())
        .and_then(|b| std::str::from_utf8(b).ok())
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| CommunicationError::Malformed("column count is not a number".into()))?;

    let values = response.split_off(2);
    if columns == 0 {
        return Ok(Vec::new());
    }
    if values.len() % columns != 0 {
        return Err(CommunicationError::Malformed(format!(
            "{} values do not split into rows of {columns}",
            values.len()
        )));
    }

    Ok(values.chunks(columns).map(<[Token]>::to_vec).collect())
}

pub(crate) fn records(rows: Vec<Tuple>, fields: &[String]) -> Result<Vec<Record>, CommunicationError> {
    rows.into_iter()
        .map(|row| {
            if row.len() != fields.len() {
                return Err(CommunicationError::Malformed(format!(
                    "row has {} columns, index has {} fields",
                    row.len(),
                    fields.len()
                )));
            }
            Ok(fields.iter().cloned().zip(row).collect::<Record>())
        })
        .collect()
}
