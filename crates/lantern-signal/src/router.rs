//! Message routing between registered connections

use lantern_core::error::RouteError;
use lantern_core::messages::Envelope;

use crate::registry::Registry;

/// Validate an inbound frame, rewrite its address, and forward it
///
/// In the client-to-server direction `id` names the destination; the
/// router swaps in the sender's id so the recipient sees the origin.
/// Call state on both ends is updated before delivery, so an `answer`
/// records the notify-on-close obligation symmetrically and a `bye`
/// clears it symmetrically.
///
/// Errors are dropped frames, never a reason to close the sender.
pub fn route(registry: &Registry, sender_id: &str, raw: &str) -> Result<(), RouteError> {
    let mut frame = Envelope::from_json(raw)?;
    if frame.id.is_empty() {
        return Err(RouteError::MissingTarget);
    }

    let target_id = std::mem::replace(&mut frame.id, sender_id.to_string());
    let target = match registry.lookup(&target_id) {
        Some(peer) => peer,
        None => return Err(RouteError::PeerNotFound(target_id)),
    };

    // The sender can race its own teardown; a missing entry just means
    // there is no call state left to update.
    if let Some(sender) = registry.lookup(sender_id) {
        sender.track_call(&frame.kind, &target_id);
    }
    target.track_call(&frame.kind, sender_id);

    let json = frame.to_json()?;
    target
        .send_text(json)
        .map_err(|_| RouteError::Delivery(target_id))
}
