//! Channel front-end for the dispatcher.
//!
//! `DispatcherHandle::spawn` moves a `Dispatcher` onto its own thread.
//! Callers send `(Request, reply sender)` pairs over a command channel
//! and block on the reply.  The thread handles one request at a time,
//! so concurrent callers are serialized without any lock around the
//! lockout state.  The thread exits once every handle is dropped and
//! hands the dispatcher back through its `JoinHandle`.
//! `spawn_with` also runs a hook after each request, before the reply
//! goes out, so guard state can be saved while the session is live.

use std::sync::mpsc;
use std::thread::JoinHandle;

use super::{Dispatcher, Request, Response};
use crate::backend::Backend;
use crate::errors::{Result, UpassError};
use crate::lockout::Clock;

type Command = (Request, mpsc::SyncSender<Response>);

/// Cloneable handle to a dispatcher running on a background thread.
#[derive(Clone)]
pub struct DispatcherHandle {
    commands: mpsc::Sender<Command>,
}

impl DispatcherHandle {
    /// Start `dispatcher` on a dedicated thread.
    pub fn spawn<B, C>(dispatcher: Dispatcher<B, C>) -> Result<(Self, JoinHandle<Dispatcher<B, C>>)>
    where
        B: Backend + 'static,
        C: Clock + 'static,
    {
        Self::spawn_with(dispatcher, |_| {})
    }

    /// Like `spawn`, calling `after_each` once a request has been handled
    /// and before its response is sent.
    pub fn spawn_with<B, C, F>(
        mut dispatcher: Dispatcher<B, C>,
        mut after_each: F,
    ) -> Result<(Self, JoinHandle<Dispatcher<B, C>>)>
    where
        B: Backend + 'static,
        C: Clock + 'static,
        F: FnMut(&mut Dispatcher<B, C>) + Send + 'static,
    {
        let (commands, inbox) = mpsc::channel::<Command>();
        let thread = std::thread::Builder::new()
            .name("upass-dispatch".into())
            .spawn(move || {
                for (request, reply) in inbox {
                    let response = dispatcher.handle(request);
                    after_each(&mut dispatcher);
                    // The caller may have gone away; the work is done either way.
                    let _ = reply.send(response);
                }
                tracing::debug!("dispatcher stopped");
                dispatcher
            })?;
        Ok((Self { commands }, thread))
    }

    /// Send `request` and wait for its single response.
    pub fn call(&self, request: Request) -> Result<Response> {
        let (reply, response) = mpsc::sync_channel(1);
        self.commands
            .send((request, reply))
            .map_err(|_| UpassError::CommandFailed("dispatcher is not running".into()))?;
        response
            .recv()
            .map_err(|_| UpassError::CommandFailed("dispatcher dropped the request".into()))
    }
}
