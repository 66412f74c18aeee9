//! Console configuration.
//!
//! [`ConsoleConfig`] carries the parameters an outer CLI or config file
//! resolves before the core starts: source IP, Art-Net destinations and
//! universe routing, tempo defaults, and engine tuning. Defaults match the
//! console's deployment shape: one lighting universe plus a block of pixel
//! universes starting at 2.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::artnet::{Destination, ARTNET_PORT};
use crate::fixture::UniverseId;
use crate::ConsoleError;

/// Default tick rate: one DMX frame every ~22.7 ms.
pub const DEFAULT_TICK_RATE: f64 = 44.0;

/// First pixel universe when none is configured.
pub const DEFAULT_PIXEL_START_UNIVERSE: u16 = 2;

/// Last pixel universe when none is configured.
pub const DEFAULT_PIXEL_END_UNIVERSE: u16 = 16;

/// A unicast route for the main lighting universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightingRoute {
    /// The lighting universe.
    pub universe: UniverseId,
    /// Node that receives it.
    pub ip: IpAddr,
}

/// A unicast route for a contiguous block of pixel universes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRoute {
    /// Node that receives the block.
    pub ip: IpAddr,
    /// First pixel universe (default 2).
    pub start_universe: u16,
    /// Last pixel universe, inclusive (default 16).
    pub end_universe: u16,
}

impl PixelRoute {
    /// A pixel block on the default universe range `[2, 16]`.
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            start_universe: DEFAULT_PIXEL_START_UNIVERSE,
            end_universe: DEFAULT_PIXEL_END_UNIVERSE,
        }
    }
}

/// How composited universes map onto Art-Net destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputRouting {
    /// Every universe to one destination: the given IP, or broadcast when
    /// `None` (or when force-broadcast is set).
    Single {
        /// Destination node; `None` broadcasts.
        dest_ip: Option<IpAddr>,
    },
    /// Separate lighting and pixel destinations with explicit universes.
    Routed {
        /// The lighting universe's destination.
        lighting: Option<LightingRoute>,
        /// The pixel universes' destination.
        pixel: Option<PixelRoute>,
    },
}

impl Default for OutputRouting {
    fn default() -> Self {
        OutputRouting::Single { dest_ip: None }
    }
}

/// Configuration for the playback core.
///
/// # Example
///
/// ```
/// use halo_core::ConsoleConfig;
///
/// let config = ConsoleConfig::new("192.168.1.100".parse().unwrap());
/// assert_eq!(config.artnet_port, 6454);
/// assert!((config.tick_rate - 44.0).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Local interface the Art-Net socket binds to.
    pub source_ip: IpAddr,
    /// Universe-to-destination mapping.
    pub routing: OutputRouting,
    /// Art-Net UDP port (default 6454).
    pub artnet_port: u16,
    /// Replace every unicast destination with limited broadcast.
    pub force_broadcast: bool,
    /// Whether a MIDI collaborator feeds override commands.
    pub enable_midi: bool,

    /// Frames per second of the event loop.
    pub tick_rate: f64,
    /// Startup tempo in BPM.
    pub bpm: f64,
    /// Bar length in beats.
    pub beats_per_bar: u32,
    /// Phrase length in bars.
    pub bars_per_phrase: u32,

    /// Command channel capacity; sends beyond it fail with backpressure.
    pub command_queue_capacity: usize,
    /// Drained commands per tick that trigger a backpressure warning.
    pub command_high_water: usize,
    /// Consecutive send failures before a destination is declared down.
    pub destination_down_threshold: u32,
}

impl ConsoleConfig {
    /// Defaults for the given source interface: broadcast output, 44 Hz,
    /// 120 BPM in 4/4 with 8-bar phrases.
    pub fn new(source_ip: IpAddr) -> Self {
        Self {
            source_ip,
            routing: OutputRouting::default(),
            artnet_port: ARTNET_PORT,
            force_broadcast: false,
            enable_midi: false,
            tick_rate: DEFAULT_TICK_RATE,
            bpm: 120.0,
            beats_per_bar: 4,
            bars_per_phrase: 8,
            command_queue_capacity: 64,
            command_high_water: 48,
            destination_down_threshold: 5,
        }
    }

    /// The tick period, `1000 / tick_rate` ms.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate)
    }

    /// Expands the routing declaration into the router's destination table.
    ///
    /// Returns `(destinations, routes, default_route)`.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::InvalidConfig`] for an empty routed declaration or an
    /// inverted pixel range; [`ConsoleError::UniverseOutOfRange`] for pixel
    /// universes outside `1..=32767`.
    pub fn build_routing(
        &self,
    ) -> Result<(Vec<Destination>, BTreeMap<UniverseId, usize>, Option<usize>), ConsoleError> {
        let port = self.artnet_port;
        let make = |ip: IpAddr| -> Destination {
            if self.force_broadcast {
                Destination::Broadcast { port }
            } else {
                Destination::Unicast { ip, port }
            }
        };

        match &self.routing {
            OutputRouting::Single { dest_ip } => {
                let destination = match dest_ip {
                    Some(ip) => make(*ip),
                    None => Destination::Broadcast { port },
                };
                Ok((vec![destination], BTreeMap::new(), Some(0)))
            }
            OutputRouting::Routed { lighting, pixel } => {
                if lighting.is_none() && pixel.is_none() {
                    return Err(ConsoleError::InvalidConfig(
                        "routed output needs a lighting or pixel destination".into(),
                    ));
                }

                let mut destinations = Vec::new();
                let mut routes = BTreeMap::new();

                if let Some(route) = lighting {
                    destinations.push(make(route.ip));
                    routes.insert(route.universe, 0);
                }
                if let Some(route) = pixel {
                    if route.start_universe > route.end_universe {
                        return Err(ConsoleError::InvalidConfig(format!(
                            "pixel universe range {}..={} is inverted",
                            route.start_universe, route.end_universe
                        )));
                    }
                    let index = destinations.len();
                    destinations.push(make(route.ip));
                    for raw in route.start_universe..=route.end_universe {
                        routes.insert(UniverseId::new(raw)?, index);
                    }
                }

                Ok((destinations, routes, None))
            }
        }
    }

    /// Checks tunables the builder relies on.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::InvalidConfig`] for a non-positive tick rate or a
    /// zero-capacity command queue.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            return Err(ConsoleError::InvalidConfig(format!(
                "tick rate {} must be positive",
                self.tick_rate
            )));
        }
        if self.command_queue_capacity == 0 {
            return Err(ConsoleError::InvalidConfig(
                "command queue capacity must be nonzero".into(),
            ));
        }
        self.build_routing().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::new(ip(100));
        assert_eq!(config.artnet_port, 6454);
        assert!((config.tick_rate - 44.0).abs() < f64::EPSILON);
        assert_eq!(config.beats_per_bar, 4);
        assert_eq!(config.bars_per_phrase, 8);
        // ~22.7 ms tick.
        let ms = config.tick_interval().as_secs_f64() * 1000.0;
        assert!((ms - 22.727).abs() < 0.01);
    }

    #[test]
    fn test_single_destination_catch_all() {
        let mut config = ConsoleConfig::new(ip(100));
        config.routing = OutputRouting::Single {
            dest_ip: Some(ip(200)),
        };
        let (destinations, routes, default) = config.build_routing().unwrap();
        assert_eq!(
            destinations,
            vec![Destination::Unicast {
                ip: ip(200),
                port: 6454
            }]
        );
        assert!(routes.is_empty());
        assert_eq!(default, Some(0));
    }

    #[test]
    fn test_single_without_ip_broadcasts() {
        let config = ConsoleConfig::new(ip(100));
        let (destinations, _, default) = config.build_routing().unwrap();
        assert_eq!(destinations, vec![Destination::Broadcast { port: 6454 }]);
        assert_eq!(default, Some(0));
    }

    #[test]
    fn test_routed_lighting_and_pixel() {
        let mut config = ConsoleConfig::new(ip(100));
        config.routing = OutputRouting::Routed {
            lighting: Some(LightingRoute {
                universe: UniverseId::new(1).unwrap(),
                ip: ip(200),
            }),
            pixel: Some(PixelRoute::new(ip(201))),
        };
        let (destinations, routes, default) = config.build_routing().unwrap();
        assert_eq!(destinations.len(), 2);
        assert_eq!(default, None);
        assert_eq!(routes[&UniverseId::new(1).unwrap()], 0);
        // Pixel block covers [2, 16].
        assert_eq!(routes[&UniverseId::new(2).unwrap()], 1);
        assert_eq!(routes[&UniverseId::new(16).unwrap()], 1);
        assert_eq!(routes.len(), 16);
        assert!(!routes.contains_key(&UniverseId::new(17).unwrap()));
    }

    #[test]
    fn test_force_broadcast_overrides_unicast() {
        let mut config = ConsoleConfig::new(ip(100));
        config.force_broadcast = true;
        config.routing = OutputRouting::Single {
            dest_ip: Some(ip(200)),
        };
        let (destinations, _, _) = config.build_routing().unwrap();
        assert_eq!(destinations, vec![Destination::Broadcast { port: 6454 }]);
    }

    #[test]
    fn test_empty_routed_rejected() {
        let mut config = ConsoleConfig::new(ip(100));
        config.routing = OutputRouting::Routed {
            lighting: None,
            pixel: None,
        };
        assert!(matches!(
            config.build_routing(),
            Err(ConsoleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inverted_pixel_range_rejected() {
        let mut config = ConsoleConfig::new(ip(100));
        config.routing = OutputRouting::Routed {
            lighting: None,
            pixel: Some(PixelRoute {
                ip: ip(201),
                start_universe: 10,
                end_universe: 2,
            }),
        };
        assert!(config.build_routing().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_tunables() {
        let mut config = ConsoleConfig::new(ip(100));
        config.tick_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::new(ip(100));
        config.command_queue_capacity = 0;
        assert!(config.validate().is_err());
    }
}
