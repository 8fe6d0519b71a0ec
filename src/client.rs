//! Blocking HandlerSocket client.
//!
//! [`Client`] owns one read and one write [`Connection`], the
//! [`IndexRegistry`] and an [`IndexResolver`]. Every operation follows the same
//! path:
//!
//! 1. resolve the caller's index number to a wire number and descriptor,
//! 2. connect the mode's socket if needed,
//! 3. on a non-persistent connection, open the index before the request,
//! 4. send the request and read its response,
//! 5. on a persistent connection answered with `2 1 stmtnum`, open the index
//!    and send the request once more,
//! 6. interpret the response.
//!
//! Any I/O failure or unexpected status closes the affected socket before the
//! error is returned, so a half-read stream is never reused.
//!
//! # Example
//! ```rust,no_run
//! use hsclient::{Client, ClientConfig, IndexDescriptor, Mode};
//!
//! let mut config = ClientConfig::default();
//! let table = IndexDescriptor::new("test", "kv", "PRIMARY", ["key", "value"]);
//! config.registry.register(Mode::Read, 98, table.clone());
//! config.registry.register(Mode::Write, 99, table);
//!
//! let mut client = Client::new(config);
//! client.insert(&["k1".into()], &["v1".into()], 99, false)?;
//! let row = client.select(&["k1".into()], 98)?;
//! assert!(row.is_some());
//! # Ok::<(), hsclient::ClientError>(())
//! ```
use log::{debug, warn};

use crate::{
    codec::Token,
    config::ClientConfig,
    error::{ClientError, ClientResult, CommunicationError},
    index::{Direct, IndexRegistry, IndexResolver, Mode, ResolvedIndex},
    protocol::{
        Connection, DUPLICATE_KEY, Dialer, FindOptions, INDEX_NOT_OPEN, Inserted, OK, Operator,
        Rows, TcpDialer, Tuple, Value, affected, delete_command, find_command, insert_command,
        is_exactly, open_index_command, records, scalar_tokens, server_message, starts_with,
        status_ok, tuples, update_command,
    },
    shard::Sharded,
};

pub struct Client<R: IndexResolver = Direct, D: Dialer = TcpDialer> {
    registry: IndexRegistry,
    resolver: R,
    dialer: D,
    persistent: bool,
    connections: [Connection<D::Socket>; 2],
}

impl Client {
    /// Creates a client resolving index numbers through the registry only.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(config, Direct, TcpDialer)
    }
}

impl Client<Sharded> {
    /// Creates a client that also accepts shard numbers (see [`crate::shard`]).
    pub fn sharded(config: ClientConfig) -> Self {
        Self::with_parts(config, Sharded::default(), TcpDialer)
    }
}

impl<R: IndexResolver, D: Dialer> Client<R, D> {
    pub fn with_parts(config: ClientConfig, resolver: R, dialer: D) -> Self {
        if config.retries != 1 {
            debug!(
                "retries = {} requested, requests are retried once after reopening an index",
                config.retries
            );
        }

        let connection = |mode| {
            Connection::new(
                mode,
                config.address(mode),
                config.connect_timeout,
                config.io_timeout(mode),
            )
        };
        let connections = [connection(Mode::Read), connection(Mode::Write)];

        Self {
            registry: config.registry,
            resolver,
            dialer,
            persistent: config.persistent,
            connections,
        }
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Connects the socket of `mode` unless it is already connected.
    pub fn connect(&mut self, mode: Mode) -> ClientResult<()> {
        let persistent = self.persistent && self.resolver.allows_persistent();
        self.connections[mode.slot()].connect(&self.dialer, persistent)
    }

    /// Closes the socket of `mode`, or both when `None`.
    pub fn close(&mut self, mode: Option<Mode>) {
        match mode {
            Some(mode) => self.connections[mode.slot()].close(),
            None => self.connections.iter_mut().for_each(Connection::close),
        }
    }

    pub fn is_connected(&self, mode: Mode) -> bool {
        self.connections[mode.slot()].is_connected()
    }

    /// Whether `index_num` is recorded as open on the current socket of `mode`.
    pub fn is_index_open(&self, mode: Mode, index_num: u32) -> bool {
        self.connections[mode.slot()].is_open(index_num)
    }

    /// Binds an index number on the server. Does nothing when the number is
    /// already open on the current socket.
    pub fn open_index(&mut self, mode: Mode, index_num: u32) -> ClientResult<()> {
        let target = self.resolve(mode, index_num)?;
        self.connect(mode)?;
        self.open_resolved(mode, &target)
    }

    /// Looks up rows by index key.
    ///
    /// IN-lists ([`Value::List`]) and filters are rejected before any I/O.
    pub fn find(
        &mut self,
        index_num: u32,
        op: Operator,
        values: &[Value],
        options: &FindOptions,
    ) -> ClientResult<Rows> {
        let (rows, target) = self.fetch(index_num, op, values, options)?;
        if !options.map {
            return Ok(Rows::Tuples(rows));
        }

        match records(rows, &target.descriptor.fields) {
            Ok(mapped) => Ok(Rows::Records(mapped)),
            Err(e) => Err(self.connections[Mode::Read.slot()].fail(e)),
        }
    }

    /// Fetches the single row whose key equals `id`.
    ///
    /// `Ok(None)` means the lookup ran and matched nothing.
    pub fn select(&mut self, id: &[Value], index_num: u32) -> ClientResult<Option<Tuple>> {
        let options = FindOptions {
            map: false,
            ..FindOptions::default()
        };
        let (rows, _) = self.fetch(index_num, Operator::Equal, id, &options)?;
        Ok(rows.into_iter().next())
    }

    /// Inserts a row. With `autoinc` the key is left to the server and `id`
    /// is ignored.
    pub fn insert(
        &mut self,
        id: &[Value],
        values: &[Value],
        index_num: u32,
        autoinc: bool,
    ) -> ClientResult<Inserted> {
        let id = scalar_tokens(id)?;
        let values = scalar_tokens(values)?;
        let target = self.resolve(Mode::Write, index_num)?;

        let command = insert_command(target.number, id, values, autoinc);
        let response = self.execute(Mode::Write, &target, &command)?;

        if starts_with(&response, &DUPLICATE_KEY) {
            return Err(ClientError::KeyAlreadyExists(server_message(&response)));
        }
        if !starts_with(&response, &OK) {
            let err = CommunicationError::rejected(
                format!("Failed inserting values in DB ({})", describe(&response)),
                server_message(&response),
            );
            return Err(self.connections[Mode::Write.slot()].fail(err));
        }

        // Only `0 1 <id>` carries a generated key.
        Ok(match <[Token; 3]>::try_from(response) {
            Ok([_, _, id]) => Inserted::Generated(id),
            Err(_) => Inserted::Stored,
        })
    }

    /// Replaces the row whose key equals `id`. Returns whether a row changed.
    pub fn update(&mut self, id: &[Value], values: &[Value], index_num: u32) -> ClientResult<bool> {
        let id = scalar_tokens(id)?;
        let values = scalar_tokens(values)?;
        let target = self.resolve(Mode::Write, index_num)?;

        let command = update_command(target.number, id, values);
        let response = self.execute(Mode::Write, &target, &command)?;
        self.modified(response, "Failed updating values in DB")
    }

    /// Deletes the row whose key equals `id`. Returns whether a row was removed.
    pub fn delete(&mut self, id: &[Value], index_num: u32) -> ClientResult<bool> {
        let id = scalar_tokens(id)?;
        let target = self.resolve(Mode::Write, index_num)?;

        let command = delete_command(target.number, id);
        let response = self.execute(Mode::Write, &target, &command)?;
        self.modified(response, "Failed deleting values from DB")
    }

    fn fetch(
        &mut self,
        index_num: u32,
        op: Operator,
        values: &[Value],
        options: &FindOptions,
    ) -> ClientResult<(Vec<Tuple>, ResolvedIndex)> {
        let values = scalar_tokens(values)?;
        if !options.filters.is_empty() {
            return Err(ClientError::Unsupported("FILTER"));
        }
        let target = self.resolve(Mode::Read, index_num)?;

        let command = find_command(target.number, op, values, options.limit, options.offset);
        let response = self.execute(Mode::Read, &target, &command)?;

        let conn = &mut self.connections[Mode::Read.slot()];
        if !status_ok(&response) || response.len() < 2 {
            let err = CommunicationError::rejected(
                "Failed getting values from DB",
                server_message(&response),
            );
            return Err(conn.fail(err));
        }

        match tuples(response) {
            Ok(rows) => Ok((rows, target)),
            Err(e) => Err(conn.fail(e)),
        }
    }

    fn modified(&mut self, response: Vec<Token>, context: &str) -> ClientResult<bool> {
        if !status_ok(&response) || response.len() < 3 {
            let err = CommunicationError::rejected(context, server_message(&response));
            return Err(self.connections[Mode::Write.slot()].fail(err));
        }
        Ok(affected(&response[2]))
    }

    fn resolve(&mut self, mode: Mode, index_num: u32) -> ClientResult<ResolvedIndex> {
        let target = self.resolver.resolve(&self.registry, mode, index_num)?;
        if target.rebound {
            self.connections[mode.slot()].forget(target.number);
        }
        Ok(target)
    }

    fn open_resolved(&mut self, mode: Mode, target: &ResolvedIndex) -> ClientResult<()> {
        let conn = &mut self.connections[mode.slot()];
        if conn.is_open(target.number) {
            return Ok(());
        }

        let d = &target.descriptor;
        debug!(
            "opening index {} on {mode} socket: {}.{}.{} ({})",
            target.number,
            d.db_name,
            d.table_name,
            d.index_name,
            d.fields.join(",")
        );
        conn.send(&open_index_command(target.number, d))?;
        let response = conn.receive()?;
        if !is_exactly(&response, &OK) {
            let err = CommunicationError::rejected(
                format!("Failed opening index {}", target.number),
                server_message(&response),
            );
            return Err(conn.fail(err));
        }

        conn.mark_open(target.number);
        Ok(())
    }

    /// Sends `command` and returns the raw response, handling index opening.
    fn execute(&mut self, mode: Mode, target: &ResolvedIndex, command: &[Token]) -> ClientResult<Vec<Token>> {
        self.connect(mode)?;
        let persistent = self.connections[mode.slot()].persistent();
        if !persistent {
            self.open_resolved(mode, target)?;
        }

        let mut reopened = false;
        loop {
            let conn = &mut self.connections[mode.slot()];
            conn.send(command)?;
            let response = conn.receive()?;

            if !(persistent && is_exactly(&response, &INDEX_NOT_OPEN)) {
                return Ok(response);
            }
            if reopened {
                let err = CommunicationError::rejected(
                    format!("index {} still not open after reopening", target.number),
                    None,
                );
                return Err(conn.fail(err));
            }

            warn!("index {} not open on {mode} socket, reopening", target.number);
            conn.forget(target.number);
            self.open_resolved(mode, target)?;
            reopened = true;
        }
    }
}

fn describe(response: &[Token]) -> String {
    response
        .iter()
        .map(|t| match t {
            Some(bytes) => bytes.escape_ascii().to_string(),
            None => "NULL".to_string(),
        })
        .collect::<Vec<String>>()
        .join(" ")
}
