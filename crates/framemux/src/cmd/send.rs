use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use framemux_conn::{Client, Config, ConnError};
use framemux_frame::{BincodeEncoding, Encoding, JsonEncoding, MsgPackEncoding};
use tracing::{debug, warn};

use crate::cmd::{EncodingArg, SendArgs};
use crate::exit::{conn_error, io_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};

pub fn run(args: SendArgs, encoding: EncodingArg) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let stream = TcpStream::connect(&args.addr).map_err(|err| io_error("connect failed", err))?;

    match encoding {
        EncodingArg::Bincode => deliver(stream, BincodeEncoding, &args, timeout),
        EncodingArg::Json => deliver(stream, JsonEncoding, &args, timeout),
        EncodingArg::Msgpack => deliver(stream, MsgPackEncoding, &args, timeout),
    }
}

fn deliver<E: Encoding>(
    stream: TcpStream,
    encoding: E,
    args: &SendArgs,
    timeout: Duration,
) -> CliResult<i32> {
    let client = Client::new(stream, encoding, Config::default())
        .map_err(|err| conn_error("connection setup failed", err))?;
    let signal = client.shutdown_signal();

    thread::scope(|s| {
        let reader = s.spawn(|| client.recv());
        let watchdog = s.spawn(|| {
            let expired = !signal.wait_timeout(timeout);
            if expired {
                warn!(?timeout, "no completion report from server");
                if let Err(err) = client.shutdown() {
                    debug!(error = %err, "shutdown after timeout failed");
                }
            }
            expired
        });

        let outcome = client
            .send(args.frame_type, &args.data)
            .and_then(|()| client.wait());
        // Both background threads end once the connection is down.
        if let Err(err) = client.shutdown() {
            debug!(error = %err, "shutdown failed");
        }

        let expired = watchdog.join().unwrap_or(false);
        let received = reader.join();

        match outcome {
            Ok(()) => Ok(SUCCESS),
            Err(ConnError::Disconnected) if expired => Err(CliError::new(
                TIMEOUT,
                format!("no completion report within {timeout:?}"),
            )),
            Err(ConnError::Disconnected) => match received {
                Ok(Err(err)) => Err(conn_error("receive failed", err)),
                _ => Err(conn_error("wait failed", ConnError::Disconnected)),
            },
            Err(err) => Err(conn_error("send failed", err)),
        }
    })
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("  ").is_err());
    }

    #[test]
    fn send_reports_remote_failure() {
        use std::net::TcpListener;

        use framemux_conn::Server;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let args = SendArgs {
            addr: listener.local_addr().unwrap().to_string(),
            data: "job".to_string(),
            frame_type: 3,
            timeout: "5s".to_string(),
        };

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let server = Server::with_defaults(stream).unwrap();
            let (tx, rx) = std::sync::mpsc::sync_channel::<String>(1);
            server.receive(3, server.string_receiver(tx));
            thread::scope(|s| {
                let reader = s.spawn(|| server.recv());
                assert_eq!(rx.recv().unwrap(), "job");
                server
                    .done(Some(&std::io::Error::other("boom")))
                    .unwrap();
                reader.join().unwrap().unwrap();
            });
        });

        let err = run(args, EncodingArg::Bincode).unwrap_err();
        assert_eq!(err.code, crate::exit::FAILURE);
        assert!(err.message.contains("boom"));
        server.join().unwrap();
    }
}
