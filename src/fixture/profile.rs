//! Fixture profiles: semantic attribute names mapped to channel offsets.
//!
//! A [`Profile`] is pure data, immutable after construction. It describes the
//! DMX footprint of one fixture model: which semantic attribute sits at which
//! 1-based offset, how many channels the footprint spans, and (for pixel bars)
//! how many RGB pixels it carries.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ConsoleError;

/// Semantic channel names a profile can map.
///
/// The set is closed apart from [`Attribute::Aux`], which carries
/// fixture-specific extras (a fog output, a laser pattern knob) under a free
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(missing_docs)] // the closed set is self-describing
pub enum Attribute {
    Intensity,
    Red,
    Green,
    Blue,
    White,
    Amber,
    Uv,
    Pan,
    Tilt,
    Strobe,
    Gobo,
    Zoom,
    Focus,
    FunctionSelect,
    FunctionSpeed,
    PanSpeed,
    TiltSpeed,
    Reset,
    /// A named auxiliary channel outside the closed set.
    Aux(String),
}

impl Attribute {
    /// `true` for channels that select discrete functions rather than a
    /// continuous level. Discrete channels snap during fades instead of
    /// interpolating.
    pub fn is_discrete(&self) -> bool {
        matches!(
            self,
            Attribute::Strobe | Attribute::Gobo | Attribute::FunctionSelect | Attribute::Reset
        )
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Intensity => "intensity",
            Attribute::Red => "red",
            Attribute::Green => "green",
            Attribute::Blue => "blue",
            Attribute::White => "white",
            Attribute::Amber => "amber",
            Attribute::Uv => "uv",
            Attribute::Pan => "pan",
            Attribute::Tilt => "tilt",
            Attribute::Strobe => "strobe",
            Attribute::Gobo => "gobo",
            Attribute::Zoom => "zoom",
            Attribute::Focus => "focus",
            Attribute::FunctionSelect => "function-select",
            Attribute::FunctionSpeed => "function-speed",
            Attribute::PanSpeed => "pan-speed",
            Attribute::TiltSpeed => "tilt-speed",
            Attribute::Reset => "reset",
            Attribute::Aux(name) => name,
        };
        f.write_str(name)
    }
}

/// Immutable channel map for one fixture model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    name: String,
    channel_count: u16,
    offsets: BTreeMap<Attribute, u16>,
    /// Number of individually addressable RGB pixels; 1 for ordinary fixtures.
    pixel_count: u16,
    /// 1-based offset of the first pixel's red channel, for pixel bars.
    pixel_base: Option<u16>,
}

impl Profile {
    /// Builds a profile from `(attribute, 1-based offset)` pairs.
    ///
    /// # Errors
    ///
    /// Rejects footprints larger than 512 channels, offsets outside the
    /// footprint, and duplicate offsets.
    pub fn new(
        name: impl Into<String>,
        channel_count: u16,
        offsets: impl IntoIterator<Item = (Attribute, u16)>,
    ) -> Result<Self, ConsoleError> {
        let name = name.into();
        if channel_count == 0 || channel_count > 512 {
            return Err(ConsoleError::invalid_profile(
                &name,
                format!("channel count {channel_count} outside 1..=512"),
            ));
        }

        let mut map = BTreeMap::new();
        let mut used = std::collections::HashSet::new();
        for (attr, offset) in offsets {
            if offset == 0 || offset > channel_count {
                return Err(ConsoleError::invalid_profile(
                    &name,
                    format!("'{attr}' offset {offset} outside footprint 1..={channel_count}"),
                ));
            }
            if !used.insert(offset) {
                return Err(ConsoleError::invalid_profile(
                    &name,
                    format!("offset {offset} mapped twice"),
                ));
            }
            map.insert(attr, offset);
        }

        Ok(Self {
            name,
            channel_count,
            offsets: map,
            pixel_count: 1,
            pixel_base: None,
        })
    }

    /// Marks this profile as a pixel bar: `pixel_count` RGB triples starting
    /// at 1-based offset `pixel_base`.
    ///
    /// # Errors
    ///
    /// Rejects layouts whose pixel block does not fit inside the footprint.
    pub fn with_pixels(mut self, pixel_count: u16, pixel_base: u16) -> Result<Self, ConsoleError> {
        if pixel_count == 0 {
            return Err(ConsoleError::invalid_profile(&self.name, "zero pixels"));
        }
        let end = pixel_base as u32 + pixel_count as u32 * 3 - 1;
        if pixel_base == 0 || end > self.channel_count as u32 {
            return Err(ConsoleError::invalid_profile(
                &self.name,
                format!(
                    "pixel block {pixel_base}..={end} outside footprint 1..={}",
                    self.channel_count
                ),
            ));
        }
        self.pixel_count = pixel_count;
        self.pixel_base = Some(pixel_base);
        Ok(self)
    }

    /// Profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Footprint size in channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Number of addressable pixels (1 for non-pixel fixtures).
    pub fn pixel_count(&self) -> u16 {
        self.pixel_count
    }

    /// `true` if this profile addresses more than one pixel.
    pub fn is_pixel_bar(&self) -> bool {
        self.pixel_count > 1
    }

    /// 1-based offset for `attribute`, if mapped.
    pub fn offset(&self, attribute: &Attribute) -> Option<u16> {
        self.offsets.get(attribute).copied()
    }

    /// 1-based `(red, green, blue)` offsets for pixel `index` (0-based), for
    /// pixel bars.
    pub fn pixel_rgb_offsets(&self, index: u16) -> Option<(u16, u16, u16)> {
        let base = self.pixel_base?;
        if index >= self.pixel_count {
            return None;
        }
        let r = base + index * 3;
        Some((r, r + 1, r + 2))
    }

    /// Iterates mapped `(attribute, offset)` pairs in attribute order.
    pub fn mapped(&self) -> impl Iterator<Item = (&Attribute, u16)> {
        self.offsets.iter().map(|(a, o)| (a, *o))
    }
}
