//! TCP socket with per-connection read readiness.
//!
//! `register` splits an accepted stream into the handle the manager owns and
//! a readiness stream for the dispatch loop. The readiness stream yields each
//! time the socket becomes readable and ends once the handle is deregistered,
//! so the loop only ever hears about connections that have something to read.

use std::sync::Arc;

use futures_util::future::AbortHandle;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tokio::net::TcpStream;

use crate::net::connection::SinkIo;

/// Accepted TCP stream owned by a sink connection.
#[derive(Debug)]
pub struct SinkSocket {
    stream: Arc<TcpStream>,
    readiness: AbortHandle,
}

impl SinkSocket {
    /// Wrap `stream` and return its readiness stream.
    pub fn register(stream: TcpStream) -> (Self, BoxStream<'static, ()>) {
        let stream = Arc::new(stream);
        let (readiness, handle) = stream::abortable(readable(Arc::clone(&stream)));
        (
            Self {
                stream,
                readiness: handle,
            },
            readiness.boxed(),
        )
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}

impl SinkIo for SinkSocket {
    /// Ends the readiness stream, which drops its reference to the socket.
    fn deregister(&mut self) {
        self.readiness.abort();
    }
}

fn readable(stream: Arc<TcpStream>) -> impl Stream<Item = ()> + Send + 'static {
    stream::unfold(stream, |stream| async move {
        // Errors show up again on the next read.
        let _ = stream.readable().await;
        Some(((), stream))
    })
}
