//! replays recorded agent responses from disk or memory

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::error::{Error, IoResultExt, Result};
use crate::transport::{Payload, Response, Transport};

#[derive(Debug)]
enum Recorded {
    File(PathBuf),
    Body(Vec<u8>),
}

/// transport answering each request with the next recorded response
#[derive(Debug, Default)]
pub struct ReplayTransport {
    queue: VecDeque<Recorded>,
    sent: Vec<Payload>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// responses read lazily from files, in order
    pub fn from_files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut t = Self::new();
        for p in paths {
            t.queue.push_back(Recorded::File(p.into()));
        }
        t
    }

    /// queue a raw response body
    pub fn push_body(&mut self, body: impl Into<Vec<u8>>) {
        self.queue.push_back(Recorded::Body(body.into()));
    }

    /// responses not yet replayed
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// payloads received so far
    pub fn sent(&self) -> &[Payload] {
        &self.sent
    }
}

impl Transport for ReplayTransport {
    fn send_config(&mut self, payload: &Payload) -> Result<Response> {
        let next = self.queue.pop_front().ok_or_else(|| Error::Transport {
            message: "no recorded response left".to_string(),
        })?;
        self.sent.push(payload.clone());

        let body = match next {
            Recorded::File(path) => std::fs::read(&path).with_path(&path)?,
            Recorded::Body(body) => body,
        };
        Response::from_slice(&body)
    }
}
