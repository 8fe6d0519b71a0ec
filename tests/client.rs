use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hsclient::{
    Client, ClientConfig, ClientError, CommunicationError, IndexDescriptor, Inserted, Mode, Value,
};

/// Accepts one connection and answers each received line with the next reply.
/// Returns the port and a handle yielding the lines the client sent.
fn spawn_server(replies: Vec<&'static [u8]>) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));

        let mut received = Vec::new();
        for reply in replies {
            let mut line = Vec::new();
            if reader.read_until(b'\n', &mut line).expect("read command") == 0 {
                break;
            }
            line.pop();
            received.push(String::from_utf8_lossy(&line).replace('\t', " "));
            stream.write_all(reply).expect("write reply");
        }
        received
    });

    (port, handle)
}

fn config(read_port: u16, write_port: u16) -> ClientConfig {
    let mut config = ClientConfig {
        host: "127.0.0.1".into(),
        read_port,
        write_port,
        ..Default::default()
    };
    let table = IndexDescriptor::new("test", "kv", "PRIMARY", ["key", "value"]);
    config.registry.register(Mode::Read, 98, table.clone());
    config.registry.register(Mode::Write, 99, table);
    config
}

fn unused_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("bind")
}

#[test]
fn select_opens_index_then_finds() {
    let (read_port, server) = spawn_server(vec![b"0\t1\n", b"0\t2\tk1\tv1\n", b"0\t2\n"]);
    let mut client = Client::new(config(read_port, unused_port()));

    let row = client.select(&["k1".into()], 98).expect("select");
    assert_eq!(row, Some(vec![Some(b"k1".to_vec()), Some(b"v1".to_vec())]));
    assert!(client.is_index_open(Mode::Read, 98));

    let missing = client.select(&["k2".into()], 98).expect("select");
    assert_eq!(missing, None);

    client.close(None);
    assert_eq!(
        server.join().expect("server"),
        vec![
            "P 98 test kv PRIMARY key,value",
            "98 = 1 k1",
            "98 = 1 k2",
        ]
    );
}

#[test]
fn null_values_travel_as_null_tokens() {
    let (read_port, server) = spawn_server(vec![b"0\t1\n", b"0\t2\tk1\t\0\n"]);
    let mut client = Client::new(config(read_port, unused_port()));

    let row = client.select(&["k1".into()], 98).expect("select");
    assert_eq!(row, Some(vec![Some(b"k1".to_vec()), None]));

    client.close(None);
    server.join().expect("server");
}

#[test]
fn insert_reports_duplicate_keys() {
    let (write_port, server) = spawn_server(vec![b"0\t1\n", b"0\t1\n", b"1\t1\tcmd\n"]);
    let mut client = Client::new(config(unused_port(), write_port));

    let inserted = client
        .insert(&["k1".into()], &["v1".into()], 99, false)
        .expect("insert");
    assert_eq!(inserted, Inserted::Stored);

    let err = client
        .insert(&["k1".into()], &[Value::Null], 99, false)
        .unwrap_err();
    assert!(matches!(err, ClientError::KeyAlreadyExists(Some(ref m)) if m == "cmd"));
    assert!(client.is_connected(Mode::Write));

    client.close(None);
    assert_eq!(
        server.join().expect("server"),
        vec![
            "P 99 test kv PRIMARY key,value",
            "99 + 2 k1 v1",
            "99 + 2 k1 \0",
        ]
    );
}

#[test]
fn update_and_delete_report_affected_rows() {
    let (write_port, server) = spawn_server(vec![
        b"0\t1\n",
        b"0\t1\t1\n",
        b"0\t1\t0\n",
        b"0\t1\t0\n",
    ]);
    let mut client = Client::new(config(unused_port(), write_port));

    assert!(client.update(&["k1".into()], &["k1".into(), "v2".into()], 99).expect("update"));
    assert!(!client.update(&["k9".into()], &["k9".into(), "v2".into()], 99).expect("update"));
    assert!(!client.delete(&["k9".into()], 99).expect("delete"));

    client.close(None);
    assert_eq!(
        server.join().expect("server"),
        vec![
            "P 99 test kv PRIMARY key,value",
            "99 = 1 k1 1 0 U k1 v2",
            "99 = 1 k9 1 0 U k9 v2",
            "99 = 1 k9 1 0 D",
        ]
    );
}

#[test]
fn truncated_response_closes_connection() {
    let (read_port, server) = spawn_server(vec![b"0\t1\n", b"0\t2\tk1"]);
    let mut client = Client::new(config(read_port, unused_port()));

    let handle = thread::spawn(move || {
        let result = client.select(&["k1".into()], 98);
        (result, client.is_connected(Mode::Read), client.is_index_open(Mode::Read, 98))
    });

    // Dropping the server side ends the truncated line with EOF.
    server.join().expect("server");
    let (result, connected, open) = handle.join().expect("client");

    assert!(matches!(
        result,
        Err(ClientError::CommunicationFailure(CommunicationError::Malformed(_)))
    ));
    assert!(!connected);
    assert!(!open);
}

#[test]
fn refused_connection_names_address() {
    let port = unused_port();
    let mut client = Client::new(config(port, unused_port()));

    match client.select(&["k1".into()], 98) {
        Err(ClientError::ConnectionFailed { address, .. }) => {
            assert_eq!(address, format!("127.0.0.1:{port}"));
        }
        other => panic!("expected connection failure, got {other:?}"),
    }
}
