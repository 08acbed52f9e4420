//! Off-thread compilation actor.
//!
//! One stateless actor per worker: requests `{id, source, options}` go
//! in, exactly one response `{id, result}` comes out per id. The engine
//! never raises, so failures travel inside the result. There is no
//! preemptive cancellation: a superseding request does not abort an
//! in-flight one, and callers discard responses for stale ids by
//! tracking only the latest id they issued. Dropping the worker closes
//! the request channel and joins the thread.

use std::sync::mpsc::{Receiver, RecvTimeoutError, SendError, Sender, channel};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::engine::{CompilationResult, CompilerOptions, Compiler, compile};
use crate::imports::ImportResolver;

/// A compile request, correlated to its response by `id`.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub id: u64,
    pub source: String,
    pub options: CompilerOptions,
}

/// The single response delivered for a request id.
#[derive(Debug, Clone)]
pub struct CompileResponse {
    pub id: u64,
    pub result: CompilationResult,
}

/// Handle to a worker thread running compilations off the caller's
/// thread.
pub struct CompileWorker {
    sender: Option<Sender<CompileRequest>>,
    receiver: Receiver<CompileResponse>,
    handle: Option<JoinHandle<()>>,
}

impl CompileWorker {
    /// Spawn a worker with no import resolution.
    pub fn spawn() -> Self {
        Self::spawn_inner(None)
    }

    /// Spawn a worker that serves `@import` through the given resolver.
    pub fn spawn_with_resolver(resolver: Box<dyn ImportResolver + Send>) -> Self {
        Self::spawn_inner(Some(resolver))
    }

    fn spawn_inner(resolver: Option<Box<dyn ImportResolver + Send>>) -> Self {
        let (request_tx, request_rx) = channel::<CompileRequest>();
        let (response_tx, response_rx) = channel::<CompileResponse>();
        let handle = std::thread::spawn(move || {
            // Ends when the sender side is dropped
            while let Ok(request) = request_rx.recv() {
                debug!(id = request.id, bytes = request.source.len(), "worker compiling");
                let result = match &resolver {
                    Some(resolver) => Compiler::new(request.options)
                        .with_resolver(resolver.as_ref())
                        .compile(&request.source),
                    None => compile(&request.source, &request.options),
                };
                let response = CompileResponse {
                    id: request.id,
                    result,
                };
                if response_tx.send(response).is_err() {
                    break;
                }
            }
        });
        Self {
            sender: Some(request_tx),
            receiver: response_rx,
            handle: Some(handle),
        }
    }

    /// Queue a request. Fails only if the worker thread has exited.
    pub fn submit(&self, request: CompileRequest) -> Result<(), SendError<CompileRequest>> {
        self.sender
            .as_ref()
            .expect("sender present until drop")
            .send(request)
    }

    /// Block until the next response.
    pub fn recv(&self) -> Option<CompileResponse> {
        self.receiver.recv().ok()
    }

    /// Block up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<CompileResponse, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

impl Drop for CompileWorker {
    fn drop(&mut self) {
        // Closing the request channel lets the thread finish its queue
        // and exit
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
