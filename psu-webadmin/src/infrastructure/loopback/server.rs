//! Drives [`WebAdmin`] the way the embedded server does.

use super::session::{LoopbackConfig, LoopbackSession, Response};
use crate::domain::error::WebAdminError;
use crate::domain::ports::{
    HandlerStatus, HttpSession, ParamStore, RelayControl, Status, StorageDevice, SystemControl,
    UpgradeSubsystem,
};
use crate::routes;
use crate::webadmin::WebAdmin;

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The handler completed and the response was finalized.
    Completed,
    /// No route matched; the server answered `404`.
    NotFound,
    /// A handler returned an error.
    Failed(WebAdminError),
    /// The client went away after the configured number of calls.
    Disconnected,
    /// The handler wanted more but nothing could make progress.
    Stalled,
}

/// Record of one exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// How it ended.
    pub outcome: Outcome,
    /// What the client received.
    pub response: Option<Response>,
    /// Handler invocations.
    pub calls: u32,
    /// Send-opportunity callbacks.
    pub sent_callbacks: u32,
    /// `RecvUnhold` signals processed.
    pub unholds: u32,
    /// Signals refused by a full queue.
    pub refused_signals: u32,
    /// Whether the transfer slot was empty at the end.
    pub released: bool,
}

impl Exchange {
    /// Whether the exchange completed.
    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }

    /// Response body as text.
    pub fn text(&self) -> &str {
        self.response.as_ref().map(Response::text).unwrap_or_default()
    }
}

/// In-process stand-in for the appliance's HTTP server.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackServer {
    config: LoopbackConfig,
}

impl LoopbackServer {
    /// Create a server with `config`.
    pub fn new(config: LoopbackConfig) -> Self {
        Self { config }
    }

    /// Transport settings.
    pub fn config(&self) -> &LoopbackConfig {
        &self.config
    }

    /// Run `verb path` with `body` against `admin` to the end.
    pub fn request<S, U, R, Y, P>(
        &self,
        admin: &mut WebAdmin<S, U, R, Y, P>,
        verb: &str,
        path: &str,
        body: &[u8],
    ) -> Exchange
    where
        S: StorageDevice,
        U: UpgradeSubsystem,
        R: RelayControl,
        Y: SystemControl,
        P: ParamStore,
    {
        let mut session = LoopbackSession::new(self.config, path, body);
        let mut sent_callbacks = 0;

        let outcome = match routes::find(verb, path) {
            None => {
                let _ = session.respond_head(Status::NOT_FOUND);
                Outcome::NotFound
            }
            Some(endpoint) => {
                session.deliver();
                loop {
                    if self.config.disconnect_after == Some(session.handler_calls()) {
                        admin.on_close(&mut session);
                        break Outcome::Disconnected;
                    }

                    session.begin_call();
                    match admin.handle(endpoint, &mut session) {
                        Err(e) => break Outcome::Failed(e),
                        Ok(HandlerStatus::Complete) => {
                            break drain(admin, &mut session, &mut sent_callbacks);
                        }
                        Ok(HandlerStatus::More) => {}
                    }

                    session.process_signals();
                    if session.body_remaining() > 0 {
                        if !session.deliver() {
                            break Outcome::Stalled;
                        }
                    } else if session.available() == 0 && session.response().is_some() {
                        break drain(admin, &mut session, &mut sent_callbacks);
                    } else {
                        break Outcome::Stalled;
                    }
                }
            }
        };

        Exchange {
            outcome,
            calls: session.handler_calls(),
            sent_callbacks,
            unholds: session.unholds(),
            refused_signals: session.refused_signals(),
            released: !session.has_transfer(),
            response: session.into_response(),
        }
    }
}

/// Flush the outgoing buffer and offer send opportunities until the
/// response is finalized.
fn drain<S, U, R, Y, P>(
    admin: &mut WebAdmin<S, U, R, Y, P>,
    session: &mut LoopbackSession,
    sent_callbacks: &mut u32,
) -> Outcome
where
    S: StorageDevice,
    U: UpgradeSubsystem,
    R: RelayControl,
    Y: SystemControl,
    P: ParamStore,
{
    loop {
        session.flush();
        if session.is_finalized() {
            return Outcome::Completed;
        }

        *sent_callbacks += 1;
        if let Err(e) = admin.on_sent(session) {
            return Outcome::Failed(e);
        }

        if session.response_pending() == 0 && !session.is_finalized() {
            return Outcome::Stalled;
        }
    }
}
