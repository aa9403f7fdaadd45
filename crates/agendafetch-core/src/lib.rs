//! Core types: agenda locations, request signing, time codec, schedule model

pub mod locator;
pub mod model;
pub mod signing;
pub mod time;
pub mod tracing;

pub use locator::{
    build_category_url, build_conference_url, is_valid_category, parse_category,
    parse_conference, Dialect, Location, LocatorError, DEFAULT_SITE,
};
pub use model::{unset_time, Meeting, Session, Talk, TalkKind, TalkMaterial};
pub use signing::{sign, signature, Credentials};
pub use time::{
    from_epoch_seconds, from_epoch_seconds_in, to_epoch_seconds, to_epoch_seconds_in,
    TimeCodecError, WallClock, ZoneKind,
};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
