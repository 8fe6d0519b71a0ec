use std::fmt;

use crate::{
    codec::Token,
    error::{ClientError, ClientResult},
    index::IndexDescriptor,
};

/// Comparison applied by a find against the index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Operator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "=" | "==" => Ok(Operator::Equal),
            ">" => Ok(Operator::Greater),
            ">=" => Ok(Operator::GreaterOrEqual),
            "<" => Ok(Operator::Less),
            "<=" => Ok(Operator::LessOrEqual),
            s => Err(format!("unknown operator '{s}'")),
        }
    }
}

/// A caller supplied key or column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bytes(Vec<u8>),
    /// An IN-list. Not supported by the client; always rejected.
    List(Vec<Value>),
}

impl Value {
    pub fn list(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Bytes(value.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Bytes(value.into_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(value: &[u8; N]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Bytes(value.to_string().into_bytes())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Bytes(value.to_string().into_bytes())
    }
}

impl From<Token> for Value {
    fn from(value: Token) -> Self {
        value.map_or(Value::Null, Value::Bytes)
    }
}

/// Kind of a post-index filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Skip rows that do not match.
    Filter,
    /// Stop scanning at the first row that does not match.
    While,
}

/// A filter over one of the descriptor's filter fields. Not supported by the
/// client; a find carrying any filter is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub kind: FilterKind,
    pub op: Operator,
    pub column: usize,
    pub value: Token,
}

/// Paging and result shape of a find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: u32,
    pub offset: u32,
    pub filters: Vec<Filter>,
    /// Pair every tuple with the descriptor's field names.
    pub map: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            limit: 1,
            offset: 0,
            filters: Vec::new(),
            map: true,
        }
    }
}

pub(crate) fn text(s: &str) -> Token {
    Some(s.as_bytes().to_vec())
}

pub(crate) fn number(n: impl fmt::Display) -> Token {
    Some(n.to_string().into_bytes())
}

/// Flattens caller values into tokens, refusing IN-lists.
pub fn scalar_tokens(values: &[Value]) -> ClientResult<Vec<Token>> {
    values
        .iter()
        .map(|v| match v {
            Value::Null => Ok(None),
            Value::Bytes(bytes) => Ok(Some(bytes.clone())),
            Value::List(_) => Err(ClientError::Unsupported("IN")),
        })
        .collect()
}

/// `P <num> <db> <table> <index> <fields> [<filter fields>]`
pub fn open_index_command(index_num: u32, descriptor: &IndexDescriptor) -> Vec<Token> {
    let mut command = vec![
        text("P"),
        number(index_num),
        text(&descriptor.db_name),
        text(&descriptor.table_name),
        text(&descriptor.index_name),
        text(&descriptor.fields.join(",")),
    ];
    if let Some(filters) = &descriptor.filter_fields {
        command.push(text(&filters.join(",")));
    }
    command
}

pub fn find_command(
    index_num: u32,
    op: Operator,
    values: Vec<Token>,
    limit: u32,
    offset: u32,
) -> Vec<Token> {
    let mut command = Vec::with_capacity(values.len() + 5);
    command.push(number(index_num));
    command.push(text(op.as_str()));
    command.push(number(values.len()));
    command.extend(values);
    if limit != 1 || offset != 0 {
        command.push(number(limit));
        command.push(number(offset));
    }
    command
}

/// Insert with the key (`autoinc == false`) or with the values alone.
pub fn insert_command(index_num: u32, id: Vec<Token>, values: Vec<Token>, autoinc: bool) -> Vec<Token> {
    let columns = if autoinc { values } else { [id, values].concat() };

    let mut command = Vec::with_capacity(columns.len() + 3);
    command.push(number(index_num));
    command.push(text("+"));
    command.push(number(columns.len()));
    command.extend(columns);
    command
}

pub fn update_command(index_num: u32, id: Vec<Token>, values: Vec<Token>) -> Vec<Token> {
    let mut command = modify_prefix(index_num, id);
    command.push(text("U"));
    command.extend(values);
    command
}

pub fn delete_command(index_num: u32, id: Vec<Token>) -> Vec<Token> {
    let mut command = modify_prefix(index_num, id);
    command.push(text("D"));
    command
}

// `<num> = <keylen> <key..> 1 0`, a single-row find the modify verb applies to.
fn modify_prefix(index_num: u32, id: Vec<Token>) -> Vec<Token> {
    let mut command = Vec::with_capacity(id.len() + 6);
    command.push(number(index_num));
    command.push(text(Operator::Equal.as_str()));
    command.push(number(id.len()));
    command.extend(id);
    command.push(number(1));
    command.push(number(0));
    command
}
