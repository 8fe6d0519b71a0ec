//! HandlerSocket wire protocol.
//!
//! A client holds two sockets: reads go to the read port (9998 by default),
//! modifications to the write port (9999). Both carry the same line protocol:
//! every request is one line of escaped, tab separated tokens (see
//! [`codec`](crate::codec)) and is answered by exactly one response line. There
//! is no pipelining; a response always belongs to the request sent just before
//! it on the same socket.
//!
//! # Requests
//!
//! | command       | tokens                                                  |
//! |---------------|---------------------------------------------------------|
//! | open index    | `P <num> <db> <table> <index> <f1,f2..> [<ff1,ff2..>]`  |
//! | find          | `<num> <op> <n> <v1..vn> [<limit> <offset>]`            |
//! | insert        | `<num> + <n> <v1..vn>`                                  |
//! | update        | `<num> = <n> <k1..kn> 1 0 U <v1..>`                     |
//! | delete        | `<num> = <n> <k1..kn> 1 0 D`                            |
//!
//! # Responses
//!
//! Every response starts with a status token, `0` on success, followed by a
//! column count and the payload. Notable patterns:
//!
//! - `0 1` after an open index.
//! - `0 <columns> <v..>` after a find, values grouped in rows of `<columns>`.
//! - `0 1 <count>` after update/delete, `0 1 [<id>]` after insert.
//! - `1 1 ...` duplicate key on insert.
//! - `2 1 stmtnum` the index number is not open on this socket.
//!
//! # Key Components
//!
//! - [`Dialer`]/[`Socket`]: how sockets are opened and shut down; [`TcpDialer`]
//!   for production, in-memory sockets in tests.
//! - [`LineTransport`]: buffered line framing over a socket.
//! - [`Connection`]: one socket plus the index numbers opened on it.
mod connection;
mod request;
mod response;
mod transport;

pub use connection::Connection;
pub use request::{
    Filter, FilterKind, FindOptions, Operator, Value, delete_command, find_command,
    insert_command, open_index_command, scalar_tokens, update_command,
};
pub use response::{Inserted, Record, Rows, Tuple};
pub use transport::{Dialer, LineTransport, Socket, TcpDialer};

pub(crate) use response::{
    DUPLICATE_KEY, INDEX_NOT_OPEN, OK, affected, is_exactly, records, server_message,
    starts_with, status_ok, tuples,
};
