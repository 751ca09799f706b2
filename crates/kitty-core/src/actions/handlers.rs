//! The default action handlers.
//!
//! - `PET`: refused while someone else is petting; otherwise the kitty
//!   enters `BEING_PET`.
//! - `PUT_TO_SLEEP`: only from `VIBING`, and only if the kitty has not
//!   slept in the last [`SLEEP_COOLDOWN`].
//! - `PONG`: liveness reply from a client. No state change.
//!
//! Every check-then-transition happens under one session lock. The lock is
//! released before a rejection is narrated.

use std::time::Duration;

use kitty_types::PetState;
use tracing::{debug, info};

use super::ActionContext;

/// Action name for petting.
pub const PET: &str = "PET";
/// Action name for putting the kitty to bed.
pub const PUT_TO_SLEEP: &str = "PUT_TO_SLEEP";
/// Action name for liveness replies.
pub const PONG: &str = "PONG";

/// Minimum time between two naps.
pub const SLEEP_COOLDOWN: Duration = Duration::from_secs(8 * 60 * 60);

/// Narration when `PET` arrives during a petting session.
pub const MSG_SOMEONE_ELSE_PETTING: &str = "Someone else is petting";
/// Narration when `PUT_TO_SLEEP` arrives while asleep.
pub const MSG_ALREADY_SLEEPING: &str = "Kitty is already sleeping!";
/// Narration when `PUT_TO_SLEEP` arrives from anything but `VIBING`.
pub const MSG_PET_BEFORE_BED: &str =
    "You should probably pet the kitty before sending him to bed!";
/// Narration when `PUT_TO_SLEEP` arrives during the cooldown.
pub const MSG_NOT_TIRED: &str = "Kitty is not tired, try again later";

fn reject(ctx: &ActionContext<'_>, action: &str, state: PetState, message: &str) {
    info!(action, actor = ctx.actor, %state, message, "Action rejected");
    ctx.narrator.broadcast_message(message);
}

/// `PET` handler.
pub fn pet(ctx: &ActionContext<'_>) {
    let mut session = ctx.machine.lock();
    let state = session.state();
    if state == PetState::BeingPet {
        drop(session);
        reject(ctx, PET, state, MSG_SOMEONE_ELSE_PETTING);
        return;
    }
    session.transition(PetState::BeingPet, ctx.actor);
}

/// `PUT_TO_SLEEP` handler.
pub fn put_to_sleep(ctx: &ActionContext<'_>) {
    let mut session = ctx.machine.lock();
    let state = session.state();

    let rejection = match state {
        PetState::Sleeping => Some(MSG_ALREADY_SLEEPING),
        PetState::Vibing => session
            .last_time_slept()
            .filter(|stamp| stamp.is_within(SLEEP_COOLDOWN))
            .map(|_| MSG_NOT_TIRED),
        PetState::BeingPet | PetState::Dying | PetState::Dead => Some(MSG_PET_BEFORE_BED),
    };

    match rejection {
        Some(message) => {
            drop(session);
            reject(ctx, PUT_TO_SLEEP, state, message);
        }
        None => {
            session.transition(PetState::Sleeping, ctx.actor);
        }
    }
}

/// `PONG` handler.
pub fn pong(ctx: &ActionContext<'_>) {
    debug!(actor = ctx.actor, "handling ping");
}
