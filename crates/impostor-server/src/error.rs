use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Fatal server errors.  Everything per-connection is logged and swallowed;
/// only these end the process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server stopped: {0}")]
    Serve(#[from] io::Error),
}
