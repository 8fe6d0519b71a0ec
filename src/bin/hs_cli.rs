use std::{
    error::Error,
    io::{self, Write},
    time::Duration,
};

use clap::Parser;
use hsclient::{
    Client, ClientConfig, IndexDescriptor, IndexResolver, Mode,
    cli::{Command, CommandError, execute, prompt},
    config::{DEFAULT_READ_PORT, DEFAULT_WRITE_PORT},
    protocol::Dialer,
};
use log::info;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// HandlerSocket host
    #[arg(long, default_value = "localhost")]
    host: String,
    /// Port of the read socket
    #[arg(long, default_value_t = DEFAULT_READ_PORT)]
    read_port: u16,
    /// Port of the write socket
    #[arg(long, default_value_t = DEFAULT_WRITE_PORT)]
    write_port: u16,
    /// Keep indexes open between requests, reopening only when the server asks
    #[arg(long)]
    persistent: bool,
    /// Connect timeout in seconds
    #[arg(long, default_value = "2", value_parser = parse_seconds)]
    connect_timeout: Duration,
    /// Read socket I/O timeout in seconds
    #[arg(long, default_value = "2", value_parser = parse_seconds)]
    read_timeout: Duration,
    /// Write socket I/O timeout in seconds
    #[arg(long, default_value = "3", value_parser = parse_seconds)]
    write_timeout: Duration,
    #[arg(long, default_value_t = 3)]
    retries: u32,
    /// Read index binding, NUM=db.table.index:field1,field2[:filter1,..]
    #[arg(long = "read-index", value_parser = parse_binding)]
    read_indexes: Vec<(u32, IndexDescriptor)>,
    /// Write index binding, NUM=db.table.index:field1,field2[:filter1,..]
    #[arg(long = "write-index", value_parser = parse_binding)]
    write_indexes: Vec<(u32, IndexDescriptor)>,
    /// Read session template for shard numbers, e.g. toolbar%d.sess%d.PRIMARY:bucket,hash,data
    #[arg(long)]
    read_template: Option<IndexDescriptor>,
    /// Write session template for shard numbers
    #[arg(long)]
    write_template: Option<IndexDescriptor>,
    /// Accept shard numbers (10000-19999 read, 20000-29999 write)
    #[arg(long)]
    sharded: bool,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs = s.parse::<f64>().map_err(|e| e.to_string())?;
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn parse_binding(s: &str) -> Result<(u32, IndexDescriptor), String> {
    let (num, descriptor) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' should look like NUM=db.table.index:fields"))?;
    let num = num.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let descriptor = descriptor.parse::<IndexDescriptor>().map_err(|e| e.to_string())?;
    Ok((num, descriptor))
}

impl From<Cli> for ClientConfig {
    fn from(cli: Cli) -> Self {
        let mut config = ClientConfig {
            host: cli.host,
            read_port: cli.read_port,
            write_port: cli.write_port,
            persistent: cli.persistent,
            connect_timeout: cli.connect_timeout,
            read_timeout: cli.read_timeout,
            write_timeout: cli.write_timeout,
            retries: cli.retries,
            ..Default::default()
        };
        for (num, descriptor) in cli.read_indexes {
            config.registry.register(Mode::Read, num, descriptor);
        }
        for (num, descriptor) in cli.write_indexes {
            config.registry.register(Mode::Write, num, descriptor);
        }
        if let Some(template) = cli.read_template {
            config.registry.set_session_template(Mode::Read, template);
        }
        if let Some(template) = cli.write_template {
            config.registry.set_session_template(Mode::Write, template);
        }
        config
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    ctrlc::set_handler(|| {
        info!("interrupted, exiting");
        std::process::exit(130);
    })?;

    let cli = Cli::parse();
    let sharded = cli.sharded;
    let config = ClientConfig::from(cli);

    if sharded {
        shell(&mut Client::sharded(config))
    } else {
        shell(&mut Client::new(config))
    }
}

fn shell<R, D>(client: &mut Client<R, D>) -> Result<(), Box<dyn Error>>
where
    R: IndexResolver,
    D: Dialer,
{
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let cmd = match prompt(stdin.lock(), stdout.lock()) {
            Ok(c) => c,
            Err(CommandError::UnrecognizedCommand(s)) if s.is_empty() => continue,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };

        if cmd == Command::Exit {
            client.close(None);
            break;
        }

        match execute(client, cmd) {
            Ok(None) => {}
            Ok(Some(out)) => writeln!(stdout, "{out}")?,
            Err(e) => eprintln!("query error: {e}"),
        }
    }

    Ok(())
}
