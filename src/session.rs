use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

/// Number of internal shards the session table is split across, so that
/// allocation for one client does not contend with correlation for another
/// (spec §4.2, "per-client shards recommended").
const SHARD_COUNT: usize = 16;

#[derive(Default)]
struct ClientState {
    next_session_id: u16,
    outstanding: HashMap<u16, Instant>,
}

impl ClientState {
    fn allocate(&mut self) -> u16 {
        if self.next_session_id == 0 {
            self.next_session_id = 1;
        }
        let id = self.next_session_id;
        self.next_session_id = if id == 0xffff { 1 } else { id + 1 };
        id
    }
}

/// A timed-out outstanding request, yielded by [`SessionManager::sweep`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimedOutRequest {
    pub client_id: u16,
    pub session_id: u16,
}

/// Owns per-client session counters and the outstanding-request table (spec
/// §4.2). Sharded by `client_id` so concurrent clients don't serialize on a
/// single lock.
pub struct SessionManager {
    shards: Vec<Mutex<HashMap<u16, ClientState>>>,
}

impl SessionManager {
    pub fn new() -> SessionManager {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        shards.resize_with(SHARD_COUNT, || Mutex::new(HashMap::new()));
        SessionManager { shards }
    }

    fn shard_for(&self, client_id: u16) -> &Mutex<HashMap<u16, ClientState>> {
        &self.shards[client_id as usize % SHARD_COUNT]
    }

    /// Returns the next session_id for `client_id`, creating state at
    /// `0x0001` on first use and wrapping `0xFFFF -> 0x0001`. Never returns
    /// `0x0000` (spec §4.2, §8).
    pub fn allocate(&self, client_id: u16) -> u16 {
        let mut shard = self.shard_for(client_id).lock();
        shard.entry(client_id).or_default().allocate()
    }

    /// Records an outstanding request, keyed by (client_id, session_id).
    /// A duplicate on the same pair overwrites the prior deadline.
    pub fn register_outstanding(&self, client_id: u16, session_id: u16, deadline: Instant) {
        let mut shard = self.shard_for(client_id).lock();
        shard
            .entry(client_id)
            .or_default()
            .outstanding
            .insert(session_id, deadline);
    }

    /// Looks up and removes the outstanding entry for (client_id,
    /// session_id). An unknown pair returns `None`; the caller treats this
    /// as a spurious response (spec §4.2).
    pub fn correlate(&self, client_id: u16, session_id: u16) -> Option<()> {
        let mut shard = self.shard_for(client_id).lock();
        let state = shard.get_mut(&client_id)?;
        state.outstanding.remove(&session_id).map(|_| ())
    }

    /// Removes every outstanding entry with `deadline <= now`, returning
    /// them as timeout events.
    pub fn sweep(&self, now: Instant) -> Vec<TimedOutRequest> {
        let mut expired = Vec::new();
        for shard in &self.shards {
            let mut shard = shard.lock();
            for (client_id, state) in shard.iter_mut() {
                state.outstanding.retain(|session_id, deadline| {
                    if *deadline <= now {
                        expired.push(TimedOutRequest {
                            client_id: *client_id,
                            session_id: *session_id,
                        });
                        false
                    } else {
                        true
                    }
                });
            }
        }
        expired
    }
}

impl Default for SessionManager {
    fn default() -> SessionManager {
        SessionManager::new()
    }
}
