//! FlowGate - releases the transport's body-intake throttle.
//!
//! The server pauses body delivery while a handler is busy with a sector.
//! After each commit the writer asks it to resume, unless the body has
//! already been delivered in full.

use crate::domain::error::WebAdminError;
use crate::domain::ports::{HttpSession, Signal};

/// Release the intake throttle after a commit.
///
/// `body_remaining` is the undelivered body length sampled at the start of
/// the invocation that made the commit. Nothing is scheduled when it is
/// zero.
///
/// # Errors
///
/// Returns [`WebAdminError::FlowControlQueueFull`] when the server's signal
/// queue cannot take the request.
pub fn release<H>(session: &mut H, body_remaining: u32) -> Result<(), WebAdminError>
where
    H: HttpSession + ?Sized,
{
    if body_remaining == 0 {
        return Ok(());
    }

    if session.schedule(Signal::RecvUnhold) {
        Ok(())
    } else {
        error!("Cannot schedule recv unhold, {} bytes pending", body_remaining);
        Err(WebAdminError::FlowControlQueueFull)
    }
}
