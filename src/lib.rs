use tokio::{
    select,
    signal::unix::{signal, Signal, SignalKind},
};
use tracing::debug;

// Mods

pub mod api;
pub mod domain;
pub mod feed;
pub mod mail;
pub mod store;

// SignalListener

pub struct SignalListener {
    int: Signal,
    term: Signal,
}

impl SignalListener {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            int: signal(SignalKind::interrupt())?,
            term: signal(SignalKind::terminate())?,
        })
    }

    pub async fn recv(&mut self) {
        select! {
            _ = self.int.recv() => {
                debug!("sigint received");
            }
            _ = self.term.recv() => {
                debug!("sigterm received")
            }
        }
    }
}

// Tests
