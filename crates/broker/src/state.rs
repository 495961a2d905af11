// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! The broker's routing tables: `workers` and `cookie_origin`,
//! plus the reverse indices (`cookie_worker`, `client_cookies`) needed
//! to do O(1) cleanup on worker/client disconnect. All four live under
//! one `parking_lot::Mutex`, following the same "one mutex-guarded
//! state struct" convention as [`crate::Broker`]'s peers
//! ([`reasonchip_taskmanager::TaskManager`]'s `tasks` map,
//! [`reasonchip_client::Multiplexor`]'s `connections`/`cookies` maps).

use std::collections::{HashMap, HashSet, VecDeque};

use reasonchip_core::Cookie;
use reasonchip_transport::ConnectionId;

/// A registered worker's declared capacity and the cookies it currently
/// holds.
pub(crate) struct WorkerEntry {
    pub(crate) declared_capacity: u32,
    pub(crate) in_flight: HashSet<Cookie>,
}

impl WorkerEntry {
    fn available(&self) -> u32 {
        self.declared_capacity.saturating_sub(self.in_flight.len() as u32)
    }
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) workers: HashMap<ConnectionId, WorkerEntry>,
    /// Round-robin candidate order. A worker appears here exactly once
    /// while registered.
    round_robin: VecDeque<ConnectionId>,
    /// `cookie -> client connection that issued the RUN`.
    pub(crate) cookie_origin: HashMap<Cookie, ConnectionId>,
    /// `cookie -> worker connection currently holding it`.
    pub(crate) cookie_worker: HashMap<Cookie, ConnectionId>,
    /// `client connection -> cookies it originated`, for disconnect
    /// cleanup.
    pub(crate) client_cookies: HashMap<ConnectionId, HashSet<Cookie>>,
}

impl State {
    pub(crate) fn register_worker(&mut self, id: ConnectionId, declared_capacity: u32) {
        self.workers.insert(id, WorkerEntry { declared_capacity, in_flight: HashSet::new() });
        self.round_robin.push_back(id);
    }

    /// Remove a worker and return the `(cookie, originating client)`
    /// pairs that were in flight on it, so the caller can synthesize
    /// WORKER_WENT_AWAY for each.
    pub(crate) fn remove_worker(&mut self, id: ConnectionId) -> Vec<(Cookie, ConnectionId)> {
        self.round_robin.retain(|candidate| *candidate != id);
        let Some(entry) = self.workers.remove(&id) else {
            return Vec::new();
        };
        let mut orphaned = Vec::with_capacity(entry.in_flight.len());
        for cookie in entry.in_flight {
            self.cookie_worker.remove(&cookie);
            if let Some(origin) = self.cookie_origin.remove(&cookie) {
                if let Some(cookies) = self.client_cookies.get_mut(&origin) {
                    cookies.remove(&cookie);
                }
                orphaned.push((cookie, origin));
            }
        }
        orphaned
    }

    /// Pick the next worker with spare capacity, round-robin among
    /// candidates, and rotate the ring so the next pick starts after
    /// it.
    pub(crate) fn pick_worker(&mut self) -> Option<ConnectionId> {
        let candidates = self.round_robin.len();
        for _ in 0..candidates {
            let candidate = self.round_robin.pop_front()?;
            self.round_robin.push_back(candidate);
            if self.workers.get(&candidate).is_some_and(|w| w.available() > 0) {
                return Some(candidate);
            }
        }
        None
    }

    /// Record a RUN's admission: `cookie` assigned to `worker`,
    /// originating from `client`.
    pub(crate) fn admit(&mut self, cookie: Cookie, client: ConnectionId, worker: ConnectionId) {
        if let Some(entry) = self.workers.get_mut(&worker) {
            entry.in_flight.insert(cookie);
        }
        self.cookie_origin.insert(cookie, client);
        self.cookie_worker.insert(cookie, worker);
        self.client_cookies.entry(client).or_default().insert(cookie);
    }

    /// Resolve a worker's RESULT back to its originating client,
    /// releasing the cookie's bookkeeping. `None` if the cookie is
    /// unknown (already resolved, or never admitted).
    pub(crate) fn resolve(&mut self, cookie: Cookie, worker: ConnectionId) -> Option<ConnectionId> {
        if let Some(entry) = self.workers.get_mut(&worker) {
            entry.in_flight.remove(&cookie);
        }
        self.cookie_worker.remove(&cookie);
        let origin = self.cookie_origin.remove(&cookie)?;
        if let Some(cookies) = self.client_cookies.get_mut(&origin) {
            cookies.remove(&cookie);
        }
        Some(origin)
    }

    /// Remove a client's bookkeeping on disconnect, returning the
    /// `(cookie, worker)` pairs it still had outstanding so the caller
    /// can forward a CANCEL for each.
    pub(crate) fn remove_client(&mut self, id: ConnectionId) -> Vec<(Cookie, ConnectionId)> {
        let Some(cookies) = self.client_cookies.remove(&id) else {
            return Vec::new();
        };
        cookies
            .into_iter()
            .filter_map(|cookie| {
                let worker = self.cookie_worker.get(&cookie).copied();
                self.cookie_origin.remove(&cookie);
                worker.map(|w| (cookie, w))
            })
            .collect()
    }
}
