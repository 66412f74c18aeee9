//! Fixture identity, profiles, groups, and the authoritative state model.

mod fixture;
mod group;
mod model;
mod profile;

pub use fixture::{Fixture, FixtureId, FixturePatch, FixtureState, UniverseId};
pub use group::{FixtureGroup, GroupId};
pub use model::FixtureModel;
pub use profile::{Attribute, Profile};
