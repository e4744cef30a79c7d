use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::thread;

use framemux_conn::{Config, Server};
use framemux_frame::{BincodeEncoding, Encoding, JsonEncoding, MsgPackEncoding};
use tracing::{info, warn};

use crate::cmd::{EncodingArg, ListenArgs};
use crate::exit::{conn_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_value, OutputFormat};

const VALUE_BUFFER: usize = 16;

pub fn run(args: ListenArgs, encoding: EncodingArg, format: OutputFormat) -> CliResult<i32> {
    let listener = TcpListener::bind(&args.addr).map_err(|err| io_error("bind failed", err))?;
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }

    let (stream, peer) = listener
        .accept()
        .map_err(|err| io_error("accept failed", err))?;
    info!(%peer, "accepted connection");

    match encoding {
        EncodingArg::Bincode => serve(stream, BincodeEncoding, &args, format),
        EncodingArg::Json => serve(stream, JsonEncoding, &args, format),
        EncodingArg::Msgpack => serve(stream, MsgPackEncoding, &args, format),
    }
}

fn serve<E: Encoding>(
    stream: TcpStream,
    encoding: E,
    args: &ListenArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let server = Server::new(stream, encoding, Config::default())
        .map_err(|err| conn_error("connection setup failed", err))?;
    let server = Arc::new(server);

    let (tx, values) = sync_channel::<String>(VALUE_BUFFER);
    server.receive(args.frame_type, server.string_receiver(tx));
    install_ctrlc_handler(Arc::clone(&server))?;

    let peer = server.peer_addr();
    thread::scope(|s| {
        let reader = s.spawn(|| server.recv());

        let mut printed = 0usize;
        let mut reported = Ok(());
        for value in values.iter() {
            print_value(args.frame_type, &value, &peer, format);
            printed = printed.saturating_add(1);

            if args.count.is_some_and(|count| printed >= count) {
                reported = server.done(None);
                break;
            }
        }
        // Unblock the read loop if the client keeps sending past --count.
        drop(values);

        let received = reader
            .join()
            .map_err(|_| CliError::new(INTERNAL, "read loop panicked"))?;
        reported.map_err(|err| conn_error("completion report failed", err))?;
        received.map_err(|err| conn_error("receive failed", err))?;

        if args.count.is_some_and(|count| printed < count) {
            warn!(printed, "connection ended before --count values arrived");
        }
        Ok(SUCCESS)
    })
}

fn install_ctrlc_handler<E: Encoding>(server: Arc<Server<E>>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if let Err(err) = server.shutdown() {
            warn!(error = %err, "shutdown after interrupt failed");
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
