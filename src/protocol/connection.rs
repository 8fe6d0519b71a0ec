use std::{collections::HashSet, time::Duration};

use log::{debug, info, warn};

use crate::{
    codec::Token,
    error::{ClientError, ClientResult, CommunicationError},
    index::Mode,
};

use super::{Dialer, LineTransport, Socket};

/// One of the two sockets a client holds, plus the indexes opened on it.
pub struct Connection<S: Socket> {
    mode: Mode,
    address: String,
    connect_timeout: Duration,
    io_timeout: Duration,
    persistent: bool,
    transport: Option<LineTransport<S>>,
    open: HashSet<u32>,
}

impl<S: Socket> Connection<S> {
    pub fn new(mode: Mode, address: String, connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            mode,
            address,
            connect_timeout,
            io_timeout,
            persistent: false,
            transport: None,
            open: HashSet::new(),
        }
    }

    /// Dials the server unless a socket is already held.
    pub fn connect<D>(&mut self, dialer: &D, persistent: bool) -> ClientResult<()>
    where
        D: Dialer<Socket = S>,
    {
        if self.transport.is_some() {
            return Ok(());
        }

        let failed = |source| ClientError::ConnectionFailed {
            address: self.address.clone(),
            source,
        };
        let mut socket = dialer.dial(&self.address, self.connect_timeout).map_err(failed)?;
        if let Err(e) = socket.set_io_timeout(self.io_timeout) {
            socket.shutdown();
            return Err(failed(e));
        }

        info!("connected {} socket to {}", self.mode, self.address);
        self.persistent = persistent;
        self.transport = Some(LineTransport::new(socket));
        Ok(())
    }

    /// Releases the socket and forgets every index opened on it.
    pub fn close(&mut self) {
        self.open.clear();
        if let Some(mut transport) = self.transport.take() {
            transport.socket_mut().shutdown();
            info!("closed {} socket to {}", self.mode, self.address);
        }
    }

    pub fn send(&mut self, tokens: &[Token]) -> ClientResult<()> {
        let transport = self.transport.as_mut().ok_or(CommunicationError::Closed)?;
        if let Err(e) = transport.write_command(tokens) {
            return Err(self.fail(e));
        }
        Ok(())
    }

    pub fn receive(&mut self) -> ClientResult<Vec<Token>> {
        let transport = self.transport.as_mut().ok_or(CommunicationError::Closed)?;
        match transport.read_response() {
            Ok(response) => Ok(response),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Tears the connection down and hands the error back for surfacing.
    pub(crate) fn fail(&mut self, err: CommunicationError) -> ClientError {
        warn!("{} socket to {}: {err}, closing", self.mode, self.address);
        self.close();
        err.into()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_open(&self, index_num: u32) -> bool {
        self.open.contains(&index_num)
    }

    pub fn mark_open(&mut self, index_num: u32) {
        debug!("index {index_num} open on {} socket", self.mode);
        self.open.insert(index_num);
    }

    pub fn forget(&mut self, index_num: u32) {
        self.open.remove(&index_num);
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl<S: Socket> Drop for Connection<S> {
    fn drop(&mut self) {
        self.close();
    }
}
