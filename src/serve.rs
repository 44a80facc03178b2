//! HTTP serving shell.
//!
//! A deliberately small, synchronous HTTP server with two endpoints: `/`
//! serves a static page embedding the video feed, and `/stream` relays the
//! multipart image stream (`multipart/x-mixed-replace`, boundary `frame`)
//! until the pipeline terminates or the client disconnects. Each connection
//! is handled on its own thread.

use std::io::{prelude::*, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

use anyhow::bail;

use crate::fanout::Broadcaster;
use crate::stream::BOUNDARY;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AR Camera</title>
</head>
<body>
    <h1>AR Camera</h1>
    <img src="/stream" width="640" height="480">
</body>
</html>
"#;

/// The HTTP server delivering the annotated image stream.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Binds the listening socket.
    pub fn bind(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts and serves connections forever.
    ///
    /// Stream clients subscribe to `broadcaster`; the camera runs only while
    /// at least one of them is connected.
    pub fn run(self, broadcaster: Arc<Broadcaster>) -> anyhow::Result<()> {
        log::info!("serving on {}", self.local_addr()?);
        for conn in self.listener.incoming() {
            match conn {
                Ok(conn) => {
                    let broadcaster = broadcaster.clone();
                    thread::Builder::new()
                        .name("http client".into())
                        .spawn(move || {
                            if let Err(e) = handle_client(conn, &broadcaster) {
                                log::debug!("client connection ended: {}", e);
                            }
                        })?;
                }
                Err(e) => log::warn!("failed to accept connection: {}", e),
            }
        }
        Ok(())
    }
}

fn handle_client(conn: TcpStream, broadcaster: &Arc<Broadcaster>) -> anyhow::Result<()> {
    let peer = conn.peer_addr()?;
    let mut reader = BufReader::new(conn);

    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        bail!("malformed request line: {}", line.trim());
    };
    if method != "GET" {
        bail!("unsupported method: {}", method);
    }
    let path = path.to_string();

    // Drain the request headers; none of them matter to us.
    loop {
        line.clear();
        reader.read_line(&mut line)?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
    }

    let mut conn = reader.into_inner();
    match &*path {
        "/" => {
            write!(
                conn,
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
                INDEX_HTML.len(),
            )?;
            conn.write_all(INDEX_HTML.as_bytes())?;
        }
        "/stream" => {
            log::info!("{} started watching", peer);
            write!(
                conn,
                "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary={}\r\n\r\n",
                BOUNDARY,
            )?;
            // Relay chunks until the pipeline dies or the client hangs up
            // (the write fails, and dropping the subscription unsubscribes).
            for chunk in broadcaster.subscribe() {
                conn.write_all(chunk.as_bytes())?;
                conn.flush()?;
            }
            log::info!("stream to {} ended", peer);
        }
        _ => {
            log::debug!("{} requested unknown path {}", peer, path);
            let body = "not found";
            write!(
                conn,
                "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body,
            )?;
        }
    }

    Ok(())
}
