//! SD Server/Client state machines: offer/find/subscribe lifecycles, TTL
//! expiry and reboot detection (spec §4.7). Grounded on the teacher's
//! tick-driven, lock-guarded design (`tp_pool.rs`/`tp_buf.rs`) and, for the
//! Server's offer/subscribe shape, the SD server module of the
//! `simple_someip` example in the retrieval pack (`server/mod.rs`) —
//! translated here from its tokio/async-socket form into the synchronous,
//! transport-agnostic style the rest of this crate uses.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;

use crate::config::SdConfig;
use crate::transport::Endpoint;

use super::entry::{EventgroupEntry, OptionRun, SdEntry, ServiceEntry};
use super::message::{SdFlags, SdMessage};
use super::option::{Ipv4EndpointData, SdOption, TransportProtocol};

/// Allocates SD session_ids: monotonic, wraps `0xFFFF -> 1`, never emits 0
/// (spec §3 "SD session_id increments monotonically..."). The reboot flag
/// stays set until the first wrap (spec §3, §4.7).
pub struct SdSessionAllocator {
    next: Mutex<(u16, bool)>,
}

impl SdSessionAllocator {
    pub fn new() -> SdSessionAllocator {
        SdSessionAllocator {
            next: Mutex::new((1, true)),
        }
    }

    /// Returns `(session_id, reboot_flag)` for the next outgoing SD message.
    pub fn next(&self) -> (u16, bool) {
        let mut state = self.next.lock();
        let (session_id, reboot) = *state;
        let wrapped = session_id == 0xFFFF;
        state.0 = if wrapped { 1 } else { session_id + 1 };
        if wrapped {
            state.1 = false;
        }
        (session_id, reboot)
    }
}

impl Default for SdSessionAllocator {
    fn default() -> SdSessionAllocator {
        SdSessionAllocator::new()
    }
}

/// Tracks each remote sender's last-seen (session_id, reboot_flag) to detect
/// reboots (spec §4.7 "Reboot detection"). A session_id lower than the last
/// observed one, sent with the reboot flag set, means the sender restarted
/// and any state kept about it must be invalidated.
#[derive(Default)]
pub struct RebootTracker {
    last_seen: Mutex<HashMap<Ipv4Addr, (u16, bool)>>,
}

impl RebootTracker {
    pub fn new() -> RebootTracker {
        RebootTracker::default()
    }

    /// Records one received SD message from `sender`. Returns `true` if this
    /// message indicates the sender rebooted since the last message from it.
    pub fn observe(&self, sender: Ipv4Addr, session_id: u16, reboot_flag: bool) -> bool {
        let mut last_seen = self.last_seen.lock();
        let rebooted = match last_seen.get(&sender) {
            Some((last_session, _)) => reboot_flag && session_id < *last_session,
            None => false,
        };
        last_seen.insert(sender, (session_id, reboot_flag));
        rebooted
    }

    pub fn forget(&self, sender: Ipv4Addr) {
        self.last_seen.lock().remove(&sender);
    }
}

/// A service instance as tracked by an SD client (spec §3 `ServiceInstance`).
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceInstance {
    pub service_id: u16,
    pub instance_id: u16,
    pub major_version: u8,
    pub minor_version: u32,
    pub endpoint: Option<Ipv4EndpointData>,
    pub ttl_deadline: Instant,
}

/// Phase of an offered service's announcement lifecycle (spec §4.7 "Server
/// state machine").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ServerPhase {
    NotReady,
    InitialWait { fire_at: Instant },
    Repetition { fire_at: Instant, interval: Duration, remaining: u32 },
    Main { fire_at: Instant },
    Stopped,
}

struct OfferedService {
    service_id: u16,
    instance_id: u16,
    major_version: u8,
    minor_version: u32,
    ttl: u32,
    endpoint: Ipv4EndpointData,
    phase: ServerPhase,
    subscribers: HashMap<(u16, Endpoint), Instant>,
}

/// The SD Server role: announces offered services and answers
/// FindService/SubscribeEventgroup requests (spec §4.7).
pub struct SdServer {
    config: SdConfig,
    sessions: SdSessionAllocator,
    services: Mutex<HashMap<(u16, u16), OfferedService>>,
}

impl SdServer {
    pub fn new(config: SdConfig) -> SdServer {
        SdServer {
            config,
            sessions: SdSessionAllocator::new(),
            services: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a service to be offered once [`SdServer::enable`] activates
    /// it. Starts in `NotReady` (spec §4.7: "NotReady -> InitialWait: on
    /// enable, wait INITIAL_DELAY").
    pub fn offer(
        &self,
        service_id: u16,
        instance_id: u16,
        major_version: u8,
        minor_version: u32,
        ttl: u32,
        endpoint: Ipv4EndpointData,
    ) {
        self.services.lock().insert(
            (service_id, instance_id),
            OfferedService {
                service_id,
                instance_id,
                major_version,
                minor_version,
                ttl,
                endpoint,
                phase: ServerPhase::NotReady,
                subscribers: HashMap::new(),
            },
        );
    }

    /// Moves a registered service from `NotReady` into `InitialWait`,
    /// randomizing the wait within `[0, sd.initial_delay]` (spec §4.7
    /// "INITIAL_DELAY (randomized bound)").
    pub fn enable(&self, service_id: u16, instance_id: u16, now: Instant) {
        if let Some(service) = self.services.lock().get_mut(&(service_id, instance_id)) {
            if service.phase == ServerPhase::NotReady {
                let jitter = rand::thread_rng().gen_range(0..=self.config.initial_delay.as_millis() as u64);
                service.phase = ServerPhase::InitialWait {
                    fire_at: now + Duration::from_millis(jitter),
                };
            }
        }
    }

    /// Moves a service to `Stopped`, returning the (session_id,
    /// StopOfferService) pair to multicast — the session_id belongs in the
    /// outer SOME/IP envelope's `RequestId`, which this module does not
    /// construct (spec §4.7 "Main -> Stopped: on disable, emit one
    /// StopOfferService (TTL=0); discard local state").
    pub fn disable(&self, service_id: u16, instance_id: u16) -> Option<(u16, SdMessage)> {
        let mut services = self.services.lock();
        let service = services.get_mut(&(service_id, instance_id))?;
        if service.phase == ServerPhase::NotReady || service.phase == ServerPhase::Stopped {
            return None;
        }
        service.phase = ServerPhase::Stopped;
        let (session_id, reboot) = self.sessions.next();
        Some((session_id, self.stop_offer_message(service, reboot)))
    }

    fn offer_message(&self, service: &OfferedService, reboot: bool) -> SdMessage {
        self.service_message(service, service.ttl, reboot)
    }

    fn stop_offer_message(&self, service: &OfferedService, reboot: bool) -> SdMessage {
        self.service_message(service, 0, reboot)
    }

    fn service_message(&self, service: &OfferedService, ttl: u32, reboot: bool) -> SdMessage {
        let entry = SdEntry::OfferService(ServiceEntry {
            options: OptionRun {
                index1: 0,
                index2: 0,
                num_opts1: 1,
                num_opts2: 0,
            },
            service_id: service.service_id,
            instance_id: service.instance_id,
            major_version: service.major_version,
            ttl,
            minor_version: service.minor_version,
        });
        SdMessage::new(
            SdFlags {
                reboot,
                unicast: false,
            },
            vec![entry],
            vec![SdOption::Ipv4Endpoint(service.endpoint)],
        )
    }

    /// Advances every offered service's phase and returns the
    /// (session_id, message) multicast pairs due to be sent right now (spec
    /// §4.7 "InitialWait -> Repetition", "Repetition -> Main").
    pub fn tick(&self, now: Instant) -> Vec<(u16, SdMessage)> {
        let mut due = Vec::new();
        let mut services = self.services.lock();
        for service in services.values_mut() {
            match service.phase {
                ServerPhase::InitialWait { fire_at } if now >= fire_at => {
                    let (session_id, reboot) = self.sessions.next();
                    due.push((session_id, self.offer_message(service, reboot)));
                    service.phase = ServerPhase::Repetition {
                        fire_at: now + self.config.repetition_base_delay,
                        interval: self.config.repetition_base_delay,
                        remaining: self.config.repetitions_max,
                    };
                }
                ServerPhase::Repetition {
                    fire_at,
                    interval,
                    remaining,
                } if now >= fire_at => {
                    let (session_id, reboot) = self.sessions.next();
                    due.push((session_id, self.offer_message(service, reboot)));
                    if remaining <= 1 {
                        service.phase = ServerPhase::Main {
                            fire_at: now + self.config.cyclic_offer_delay,
                        };
                    } else {
                        let next_interval = (interval * 2).min(self.config.repetition_max);
                        service.phase = ServerPhase::Repetition {
                            fire_at: now + next_interval,
                            interval: next_interval,
                            remaining: remaining - 1,
                        };
                    }
                }
                ServerPhase::Main { fire_at } if now >= fire_at => {
                    let (session_id, reboot) = self.sessions.next();
                    due.push((session_id, self.offer_message(service, reboot)));
                    service.phase = ServerPhase::Main {
                        fire_at: now + self.config.cyclic_offer_delay,
                    };
                }
                _ => {}
            }
        }
        due
    }

    /// Handles one received SD message, returning (session_id, reply) pairs
    /// addressed unicast to `sender` (spec §4.7 "Receive FindService
    /// matching...", "Receive SubscribeEventgroup matching...").
    pub fn handle_received(&self, message: &SdMessage, sender: Endpoint) -> Vec<(u16, SdMessage)> {
        let mut replies = Vec::new();
        let mut services = self.services.lock();
        for entry in &message.entries {
            match entry {
                SdEntry::FindService(find) => {
                    if let Some(service) = services.get(&(find.service_id, find.instance_id)) {
                        if matches!(service.phase, ServerPhase::Repetition { .. } | ServerPhase::Main { .. }) {
                            let (session_id, reboot) = self.sessions.next();
                            let mut reply = self.offer_message(service, reboot);
                            reply.flags.unicast = true;
                            replies.push((session_id, reply));
                        }
                    }
                }
                SdEntry::SubscribeEventgroup(sub) => {
                    if let Some(service) =
                        services.get_mut(&(sub.service_id, sub.instance_id))
                    {
                        service
                            .subscribers
                            .insert((sub.eventgroup_id, sender), Instant::now());
                        let (session_id, reboot) = self.sessions.next();
                        replies.push((session_id, self.subscribe_ack(sub, reboot)));
                    }
                }
                SdEntry::StopSubscribeEventgroup(sub) => {
                    if let Some(service) =
                        services.get_mut(&(sub.service_id, sub.instance_id))
                    {
                        service.subscribers.remove(&(sub.eventgroup_id, sender));
                    }
                }
                _ => {}
            }
        }
        replies
    }

    fn subscribe_ack(&self, sub: &EventgroupEntry, reboot: bool) -> SdMessage {
        let entry = SdEntry::SubscribeEventgroupAck(EventgroupEntry {
            options: OptionRun::NONE,
            service_id: sub.service_id,
            instance_id: sub.instance_id,
            major_version: sub.major_version,
            ttl: sub.ttl,
            initial_data_requested: sub.initial_data_requested,
            counter: sub.counter,
            eventgroup_id: sub.eventgroup_id,
        });
        SdMessage::new(
            SdFlags {
                reboot,
                unicast: true,
            },
            vec![entry],
            Vec::new(),
        )
    }
}

/// Pending `find_service` call armed by an [`SdClient`] (spec §4.7
/// "find_service(service_id, timeout)").
struct PendingFind {
    deadline: Instant,
}

/// The SD Client role: discovers services by id and tracks their
/// availability/TTL (spec §4.7 "Client state machine").
pub struct SdClient {
    config: SdConfig,
    sessions: SdSessionAllocator,
    pending_finds: Mutex<HashMap<u16, PendingFind>>,
    instances: Mutex<HashMap<(u16, u16), ServiceInstance>>,
}

impl SdClient {
    pub fn new(config: SdConfig) -> SdClient {
        SdClient {
            config,
            sessions: SdSessionAllocator::new(),
            pending_finds: Mutex::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Arms a pending find and returns the (session_id, FindService message)
    /// pair to multicast (spec §4.7: "emit multicast FindService entry with
    /// ttl=3").
    pub fn find_service(&self, service_id: u16, timeout: Duration, now: Instant) -> (u16, SdMessage) {
        self.pending_finds.lock().insert(
            service_id,
            PendingFind {
                deadline: now + timeout,
            },
        );
        let (session_id, reboot) = self.sessions.next();
        let entry = SdEntry::FindService(ServiceEntry {
            options: OptionRun::NONE,
            service_id,
            instance_id: 0xffff,
            major_version: 0xff,
            ttl: 3,
            minor_version: 0xffff_ffff,
        });
        let message = SdMessage::new(
            SdFlags {
                reboot,
                unicast: false,
            },
            vec![entry],
            Vec::new(),
        );
        (session_id, message)
    }

    /// Processes one received SD message, returning instances that newly
    /// became available and instances that just expired/stopped (spec §4.7
    /// "On each received OfferService", "On each StopOfferService").
    pub fn handle_received(&self, message: &SdMessage, now: Instant) -> (Vec<ServiceInstance>, Vec<(u16, u16)>) {
        let mut became_available = Vec::new();
        let mut became_unavailable = Vec::new();

        let resolved = match message.resolved_entries() {
            Ok(r) => r,
            Err(_) => return (became_available, became_unavailable),
        };

        for (entry, options) in resolved {
            let offer = match entry {
                SdEntry::OfferService(offer) => offer,
                SdEntry::StopOfferService(offer) => offer,
                _ => continue,
            };
            let is_stop = matches!(entry, SdEntry::StopOfferService(_));
            let key = (offer.service_id, offer.instance_id);

            if is_stop {
                if self.instances.lock().remove(&key).is_some() {
                    became_unavailable.push(key);
                }
                self.pending_finds.lock().remove(&offer.service_id);
                continue;
            }

            let endpoint = options.iter().find_map(|o| match o {
                SdOption::Ipv4Endpoint(d) => Some(*d),
                _ => None,
            });
            let instance = ServiceInstance {
                service_id: offer.service_id,
                instance_id: offer.instance_id,
                major_version: offer.major_version,
                minor_version: offer.minor_version,
                endpoint,
                ttl_deadline: now + Duration::from_secs(offer.ttl as u64),
            };

            let is_new = !self.instances.lock().contains_key(&key);
            self.instances.lock().insert(key, instance.clone());
            self.pending_finds.lock().remove(&offer.service_id);
            if is_new {
                became_available.push(instance);
            }
        }

        (became_available, became_unavailable)
    }

    /// Evicts TTL-expired instances and timed-out pending finds, reporting
    /// expired instances as stop-offers (spec §4.7 "TTL expiry sweep").
    pub fn sweep(&self, now: Instant) -> Vec<(u16, u16)> {
        let mut expired = Vec::new();
        self.instances.lock().retain(|key, instance| {
            let alive = instance.ttl_deadline > now;
            if !alive {
                expired.push(*key);
            }
            alive
        });
        self.pending_finds.lock().retain(|_, pending| pending.deadline > now);
        expired
    }

    pub fn known_instances(&self) -> Vec<ServiceInstance> {
        self.instances.lock().values().cloned().collect()
    }
}
