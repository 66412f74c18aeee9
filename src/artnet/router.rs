//! Multi-destination Art-Net routing and UDP emission.
//!
//! The router owns one non-blocking UDP socket and a table mapping each
//! universe to a destination. Sends are fire-and-forget; a failure on one
//! destination never blocks the others. Consecutive failures degrade a
//! destination to *down* until a send succeeds again.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use serde::{Deserialize, Serialize};

use super::packet::encode_art_dmx;
use crate::dmx::UNIVERSE_SIZE;
use crate::fixture::UniverseId;
use crate::ConsoleError;

/// Where a universe's frames go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    /// Limited broadcast on the given port.
    Broadcast {
        /// UDP port.
        port: u16,
    },
    /// A single node.
    Unicast {
        /// Node address.
        ip: IpAddr,
        /// UDP port.
        port: u16,
    },
}

impl Destination {
    /// The socket address packets are sent to.
    pub fn socket_addr(&self) -> SocketAddr {
        match *self {
            Destination::Broadcast { port } => {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port)
            }
            Destination::Unicast { ip, port } => SocketAddr::new(ip, port),
        }
    }
}

/// Health notifications produced while emitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// A composited universe has no destination; reported once per run.
    UnroutedUniverse {
        /// The unrouted universe.
        universe: UniverseId,
    },
    /// A send failed (first failure of a streak).
    SendFailed {
        /// Destination that failed.
        destination: SocketAddr,
        /// OS error text.
        error: String,
    },
    /// Consecutive failures crossed the down threshold.
    DestinationDown {
        /// Destination declared down.
        destination: SocketAddr,
        /// Failures in the streak.
        consecutive: u32,
    },
    /// A send succeeded after failures.
    DestinationRestored {
        /// Destination that recovered.
        destination: SocketAddr,
    },
}

#[derive(Debug)]
struct DestinationState {
    addr: SocketAddr,
    consecutive_errors: u32,
    down: bool,
}

/// Transmits composited universes as ArtDMX packets.
#[derive(Debug)]
pub struct ArtNetRouter {
    socket: UdpSocket,
    destinations: Vec<DestinationState>,
    routes: BTreeMap<UniverseId, usize>,
    /// Catch-all destination for universes without an explicit route
    /// (single-destination setups).
    default_route: Option<usize>,
    /// Sequence counters per (destination, universe), 1..=255.
    sequences: HashMap<(usize, UniverseId), u8>,
    warned_unrouted: HashSet<UniverseId>,
    down_threshold: u32,
    physical: u8,
}

impl ArtNetRouter {
    /// Binds the transmit socket and installs the routing table.
    ///
    /// `routes` maps universes to indices into `destinations`;
    /// `default_route` is the catch-all for single-destination setups.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::Socket`] if the socket cannot be bound or configured,
    /// [`ConsoleError::InvalidConfig`] for a route pointing past the
    /// destination table.
    pub fn new(
        source_ip: IpAddr,
        destinations: Vec<Destination>,
        routes: BTreeMap<UniverseId, usize>,
        default_route: Option<usize>,
        down_threshold: u32,
    ) -> Result<Self, ConsoleError> {
        if let Some((universe, index)) = routes.iter().find(|(_, i)| **i >= destinations.len()) {
            return Err(ConsoleError::InvalidConfig(format!(
                "universe {universe} routed to missing destination {index}"
            )));
        }
        if default_route.is_some_and(|i| i >= destinations.len()) {
            return Err(ConsoleError::InvalidConfig(
                "default route points to a missing destination".into(),
            ));
        }

        let socket = UdpSocket::bind((source_ip, 0))?;
        socket.set_nonblocking(true)?;
        if destinations
            .iter()
            .any(|d| matches!(d, Destination::Broadcast { .. }))
        {
            socket.set_broadcast(true)?;
        }

        Ok(Self {
            socket,
            destinations: destinations
                .into_iter()
                .map(|d| DestinationState {
                    addr: d.socket_addr(),
                    consecutive_errors: 0,
                    down: false,
                })
                .collect(),
            routes,
            default_route,
            sequences: HashMap::new(),
            warned_unrouted: HashSet::new(),
            down_threshold: down_threshold.max(1),
            physical: 0,
        })
    }

    /// Universes with a destination.
    pub fn routed_universes(&self) -> impl Iterator<Item = UniverseId> + '_ {
        self.routes.keys().copied()
    }

    /// Destination health as `(address, is_down)` pairs.
    pub fn destination_health(&self) -> Vec<(SocketAddr, bool)> {
        self.destinations
            .iter()
            .map(|d| (d.addr, d.down))
            .collect()
    }

    /// Emits every frame to its routed destination.
    ///
    /// Unmapped universes are dropped with a one-shot warning. Send errors
    /// surface as [`RouterEvent`]s and never interrupt the remaining sends.
    pub fn emit(
        &mut self,
        frames: &BTreeMap<UniverseId, [u8; UNIVERSE_SIZE]>,
    ) -> Vec<RouterEvent> {
        let mut events = Vec::new();

        for (&universe, data) in frames {
            let Some(index) = self
                .routes
                .get(&universe)
                .copied()
                .or(self.default_route)
            else {
                if self.warned_unrouted.insert(universe) {
                    tracing::warn!(%universe, "universe has no destination, dropping");
                    events.push(RouterEvent::UnroutedUniverse { universe });
                }
                continue;
            };

            let sequence = self.next_sequence(index, universe);
            let packet = encode_art_dmx(universe, sequence, self.physical, data);
            let destination = &mut self.destinations[index];

            match self.socket.send_to(&packet, destination.addr) {
                Ok(_) => {
                    if destination.consecutive_errors > 0 {
                        tracing::info!(destination = %destination.addr, "destination restored");
                        events.push(RouterEvent::DestinationRestored {
                            destination: destination.addr,
                        });
                    }
                    destination.consecutive_errors = 0;
                    destination.down = false;
                }
                Err(err) => {
                    destination.consecutive_errors += 1;
                    if destination.consecutive_errors == 1 {
                        tracing::warn!(destination = %destination.addr, %err, "artnet send failed");
                        events.push(RouterEvent::SendFailed {
                            destination: destination.addr,
                            error: err.to_string(),
                        });
                    }
                    if destination.consecutive_errors == self.down_threshold && !destination.down {
                        destination.down = true;
                        events.push(RouterEvent::DestinationDown {
                            destination: destination.addr,
                            consecutive: destination.consecutive_errors,
                        });
                    }
                }
            }
        }

        events
    }

    /// Advances the per-(destination, universe) sequence: 1..=255, skipping
    /// 0, which the protocol reserves for "sequencing disabled".
    fn next_sequence(&mut self, index: usize, universe: UniverseId) -> u8 {
        let counter = self.sequences.entry((index, universe)).or_insert(0);
        *counter = counter.wrapping_add(1);
        if *counter == 0 {
            *counter = 1;
        }
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn u(n: u16) -> UniverseId {
        UniverseId::new(n).unwrap()
    }

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    fn recv_socket() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind((localhost(), 0)).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    fn one_frame(universe: UniverseId, first: u8) -> BTreeMap<UniverseId, [u8; UNIVERSE_SIZE]> {
        let mut data = [0u8; UNIVERSE_SIZE];
        data[0] = first;
        BTreeMap::from([(universe, data)])
    }

    #[test]
    fn test_emit_delivers_packet() {
        let (receiver, port) = recv_socket();
        let mut router = ArtNetRouter::new(
            localhost(),
            vec![Destination::Unicast {
                ip: localhost(),
                port,
            }],
            BTreeMap::from([(u(5), 0)]),
            None,
            5,
        )
        .unwrap();

        let events = router.emit(&one_frame(u(5), 255));
        assert!(events.is_empty());

        let mut buffer = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buffer).unwrap();
        assert_eq!(len, 530);
        assert_eq!(&buffer[0..8], b"Art-Net\0");
        assert_eq!(buffer[14], 5);
        assert_eq!(buffer[18], 255);
    }

    #[test]
    fn test_sequence_increments_per_universe() {
        let (receiver, port) = recv_socket();
        let mut router = ArtNetRouter::new(
            localhost(),
            vec![Destination::Unicast {
                ip: localhost(),
                port,
            }],
            BTreeMap::from([(u(1), 0)]),
            None,
            5,
        )
        .unwrap();

        router.emit(&one_frame(u(1), 0));
        router.emit(&one_frame(u(1), 0));

        let mut buffer = [0u8; 1024];
        receiver.recv_from(&mut buffer).unwrap();
        assert_eq!(buffer[12], 1);
        receiver.recv_from(&mut buffer).unwrap();
        assert_eq!(buffer[12], 2);
    }

    #[test]
    fn test_unrouted_universe_warns_once() {
        let (_receiver, port) = recv_socket();
        let mut router = ArtNetRouter::new(
            localhost(),
            vec![Destination::Unicast {
                ip: localhost(),
                port,
            }],
            BTreeMap::from([(u(1), 0)]),
            None,
            5,
        )
        .unwrap();

        let events = router.emit(&one_frame(u(7), 0));
        assert_eq!(
            events,
            vec![RouterEvent::UnroutedUniverse { universe: u(7) }]
        );
        let events = router.emit(&one_frame(u(7), 0));
        assert!(events.is_empty());
    }

    #[test]
    fn test_default_route_catches_unmapped_universes() {
        let (receiver, port) = recv_socket();
        let mut router = ArtNetRouter::new(
            localhost(),
            vec![Destination::Unicast {
                ip: localhost(),
                port,
            }],
            BTreeMap::new(),
            Some(0),
            5,
        )
        .unwrap();

        let events = router.emit(&one_frame(u(9), 42));
        assert!(events.is_empty());

        let mut buffer = [0u8; 1024];
        receiver.recv_from(&mut buffer).unwrap();
        assert_eq!(buffer[14], 9);
        assert_eq!(buffer[18], 42);
    }

    #[test]
    fn test_route_to_missing_destination_rejected() {
        let err =
            ArtNetRouter::new(localhost(), vec![], BTreeMap::from([(u(1), 0)]), None, 5)
                .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidConfig(_)));
    }

    #[test]
    fn test_sequence_skips_zero_on_wrap() {
        let (_receiver, port) = recv_socket();
        let mut router = ArtNetRouter::new(
            localhost(),
            vec![Destination::Unicast {
                ip: localhost(),
                port,
            }],
            BTreeMap::from([(u(1), 0)]),
            None,
            5,
        )
        .unwrap();

        router.sequences.insert((0, u(1)), 255);
        assert_eq!(router.next_sequence(0, u(1)), 1);
        assert_eq!(router.next_sequence(0, u(1)), 2);
    }
}
