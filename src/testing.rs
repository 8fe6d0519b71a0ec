//! In-memory sockets for unit tests.
use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, ErrorKind, Read, Write},
    rc::Rc,
    time::Duration,
};

use crate::{
    codec::{Token, decode_response},
    protocol::{Dialer, Socket},
};

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    write_limit: Option<usize>,
    refuse: bool,
    dials: Vec<String>,
    io_timeouts: Vec<Duration>,
    shutdowns: usize,
}

/// Scripted server shared by every socket it hands out.
///
/// Each queued reply is returned by exactly one `read` call, so a reply
/// without a trailing newline behaves like a truncated read.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockServer(Rc<RefCell<Script>>);

impl MockServer {
    pub fn reply(&self, line: &str) {
        let mut raw = line.as_bytes().to_vec();
        raw.push(b'\n');
        self.reply_raw(&raw);
    }

    pub fn reply_raw(&self, raw: &[u8]) {
        self.0.borrow_mut().replies.push_back(raw.to_vec());
    }

    pub fn limit_writes(&self, limit: usize) {
        self.0.borrow_mut().write_limit = Some(limit);
    }

    pub fn refuse(&self) {
        self.0.borrow_mut().refuse = true;
    }

    pub fn socket(&self) -> MockSocket {
        MockSocket {
            server: self.clone(),
        }
    }

    pub fn dialer(&self) -> MockDialer {
        MockDialer(self.clone())
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    /// Every command line written so far, decoded.
    pub fn commands(&self) -> Vec<Vec<Token>> {
        let written = self.written();
        written
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
            .map(decode_response)
            .collect()
    }

    /// Commands rendered as strings, NULL as `\0`.
    pub fn command_strings(&self) -> Vec<Vec<String>> {
        self.commands()
            .into_iter()
            .map(|cmd| {
                cmd.into_iter()
                    .map(|t| match t {
                        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                        None => "\0".to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    pub fn dials(&self) -> Vec<String> {
        self.0.borrow().dials.clone()
    }

    pub fn io_timeouts(&self) -> Vec<Duration> {
        self.0.borrow().io_timeouts.clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.0.borrow().shutdowns
    }

    pub fn pending_replies(&self) -> usize {
        self.0.borrow().replies.len()
    }
}

pub(crate) struct MockSocket {
    server: MockServer,
}

impl Read for MockSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut script = self.server.0.borrow_mut();
        let Some(mut chunk) = script.replies.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            script.replies.push_front(chunk);
        }
        Ok(n)
    }
}

impl Write for MockSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut script = self.server.0.borrow_mut();
        let n = script.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        script.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Socket for MockSocket {
    fn set_io_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.server.0.borrow_mut().io_timeouts.push(timeout);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.server.0.borrow_mut().shutdowns += 1;
    }
}

pub(crate) struct MockDialer(MockServer);

impl Dialer for MockDialer {
    type Socket = MockSocket;

    fn dial(&self, address: &str, _connect_timeout: Duration) -> io::Result<MockSocket> {
        let mut script = self.0.0.borrow_mut();
        script.dials.push(address.to_string());
        if script.refuse {
            return Err(io::Error::new(ErrorKind::ConnectionRefused, "connection refused"));
        }
        drop(script);
        Ok(self.0.socket())
    }
}
