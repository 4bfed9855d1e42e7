//! Floorboard device agent.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each kiosk runs one agent. It holds the device's local copy of the shared
//! state document and keeps it converged with the server by polling, pushes
//! local edits after a quiet period, and watches its notification inbox for
//! incoming calls and chat alerts.
//!
//! Every network operation goes through [`source::DataSource`], chosen once at
//! startup: the real server over HTTP, or in-memory fixtures for preview.

pub mod call;
pub mod identity;
pub mod poller;
pub mod source;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random lowercase base-36 suffix for generated ids.
pub(crate) fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect()
}
