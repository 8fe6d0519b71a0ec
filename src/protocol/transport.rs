use std::{
    io::{self, BufRead, BufReader, ErrorKind, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::trace;

use crate::{
    codec::{LINE_TERMINATOR, Token, decode_response, encode_command},
    error::CommunicationError,
};

/// A byte stream a [`LineTransport`] can run over.
pub trait Socket: Read + Write {
    /// Applies the steady-state read/write timeout.
    fn set_io_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Shuts the stream down. Errors are ignored.
    fn shutdown(&mut self);
}

/// Opens sockets for a connection.
pub trait Dialer {
    type Socket: Socket;

    fn dial(&self, address: &str, connect_timeout: Duration) -> io::Result<Self::Socket>;
}

impl Socket for TcpStream {
    fn set_io_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        // A zero duration is rejected by the OS; treat it as "no timeout".
        let timeout = Some(timeout).filter(|t| !t.is_zero());
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }

    fn shutdown(&mut self) {
        let _ = TcpStream::shutdown(self, Shutdown::Both);
    }
}

/// Dials plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Socket = TcpStream;

    fn dial(&self, address: &str, connect_timeout: Duration) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in address.to_socket_addrs()? {
            let attempt = if connect_timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, connect_timeout)
            };
            match attempt {
                Ok(stream) => {
                    // Requests are single small lines, do not let Nagle hold them back.
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, format!("'{address}' resolved to no address"))
        }))
    }
}

/// Line framing over a socket: one command line out, one response line in.
pub struct LineTransport<S: Socket> {
    reader: BufReader<S>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl<S: Socket> LineTransport<S> {
    pub fn new(socket: S) -> Self {
        Self {
            reader: BufReader::new(socket),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        }
    }

    /// Writes a whole command, looping over partial writes.
    pub fn write_command(&mut self, tokens: &[Token]) -> Result<(), CommunicationError> {
        encode_command(tokens, &mut self.write_buf);
        trace!("> {}", self.write_buf.escape_ascii());

        let socket = self.reader.get_mut();
        let mut sent = 0;
        while sent < self.write_buf.len() {
            match socket.write(&self.write_buf[sent..]) {
                Ok(0) => return Err(CommunicationError::Closed),
                Ok(n) => sent += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        socket.flush()?;
        Ok(())
    }

    /// Reads one response line and decodes its tokens.
    pub fn read_response(&mut self) -> Result<Vec<Token>, CommunicationError> {
        self.line_buf.clear();
        let read = self.reader.read_until(LINE_TERMINATOR, &mut self.line_buf)?;
        if read == 0 {
            return Err(CommunicationError::Closed);
        }
        trace!("< {}", self.line_buf.escape_ascii());

        if self.line_buf.last() != Some(&LINE_TERMINATOR) {
            return Err(CommunicationError::Malformed(
                self.line_buf.escape_ascii().to_string(),
            ));
        }
        self.line_buf.pop();

        Ok(decode_response(&self.line_buf))
    }

    pub fn socket_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }
}
