//! Art-Net output: ArtDMX framing and multi-destination routing.

mod packet;
mod router;

pub use packet::{encode_art_dmx, ARTNET_HEADER, ARTNET_PORT, ART_DMX_LEN, OP_OUTPUT, PROTOCOL_VERSION};
pub use router::{ArtNetRouter, Destination, RouterEvent};
