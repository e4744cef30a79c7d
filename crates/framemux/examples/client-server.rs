//! Client/server example: jobs go out on one frame type, progress logs come
//! back on LOG, and the server reports completion on ERROR.

use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::sync_channel;
use std::thread;

use framemux::conn::{Client, Server};
use framemux::frame::LOG;
use serde::{Deserialize, Serialize};

const JOB: u8 = 3;

#[derive(Debug, Serialize, Deserialize)]
struct Job {
    id: u32,
    words: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let server = thread::spawn(move || -> Result<(), framemux::conn::ConnError> {
        let (stream, _) = listener.accept().map_err(framemux::transport::TransportError::from)?;
        let server = Server::with_defaults(stream)?;
        let (tx, jobs) = sync_channel::<Job>(1);
        server.receive(JOB, server.value_receiver(tx));

        thread::scope(|s| {
            let reader = s.spawn(|| server.recv());

            let job = jobs.recv().map_err(|_| framemux::conn::ConnError::Disconnected)?;
            for word in &job.words {
                server.send(LOG, &format!("job {}: processed {word}", job.id))?;
            }
            server.done(None)?;

            reader
                .join()
                .unwrap_or(Err(framemux::conn::ConnError::Disconnected))
        })
    });

    let client = Client::with_defaults(TcpStream::connect(addr)?)?;
    let (tx, logs) = sync_channel::<String>(8);
    client.receive(LOG, client.string_receiver(tx));

    thread::scope(|s| {
        s.spawn(|| client.recv());
        s.spawn(move || {
            for line in logs.iter() {
                println!("{line}");
            }
        });

        client.send(
            JOB,
            &Job {
                id: 1,
                words: vec!["alpha".to_string(), "beta".to_string()],
            },
        )?;
        client.wait()
    })?;

    server.join().map_err(|_| "server thread panicked")??;
    println!("server reported success");
    Ok(())
}
