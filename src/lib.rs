//! # hue_bridge_rs
//!
//! An async Rust client for Philips Hue bridges on the local network.
//!
//! The crate finds the bridge with an SSDP search, pairs with it through the
//! link button, and keeps the resulting address and credential in a small
//! session file. Lights and groups are then modelled as entities with cached
//! remote state that can be commanded one by one or as a whole collection.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hue_bridge_rs::{Bridge, BridgeConfig, Color, Operation};
//!
//! #[tokio::main]
//! async fn main() -> hue_bridge_rs::Result<()> {
//!     // Press the bridge's link button when asked on first run.
//!     let bridge = Bridge::connect(BridgeConfig::default()).await?;
//!
//!     // Color lights turn red, dimmable lights are skipped.
//!     bridge
//!         .lights()
//!         .apply(&Operation::SetColor(Color::rgb(255, 0, 0)))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Discovery and pairing**: [`DiscoverySession`] reuses a stored session
//!   while it stays valid and otherwise scans and pairs again
//! - **Capabilities**: every [`LightKind`] declares its [`Capability`] tags and
//!   collection-wide [`Operation`]s reach only the lights that support them
//! - **Cached state**: reads refetch at most once per cache TTL, see
//!   [`CachedEntity`]
//! - **Gamut conversion**: RGB colors are mapped into the light's
//!   [`Gamut`] before they are sent
//! - **Groups and users**: create and delete light groups, list and revoke
//!   whitelisted credentials
//!
//! ## Communication
//!
//! Discovery uses UDP multicast to `239.255.255.250:1900`. Everything else is
//! JSON over HTTP on port 80 of the bridge.

mod bridge;
mod cache;
mod capability;
mod config;
mod discovery;
mod errors;
mod gamut;
mod group;
mod light;
mod lights;
pub mod runtime;
mod session;
mod ssdp;
mod transport;
mod types;

// Re-export public API
pub use bridge::{Bridge, WhitelistEntry};
pub use cache::CachedEntity;
pub use capability::{Capability, CapabilityTable, Controllable, Operation};
pub use config::BridgeConfig;
pub use discovery::{DESCRIPTION_PATH, DiscoverySession, Established};
pub use errors::{Error, RemoteError};
pub use gamut::{GAMUT_A, GAMUT_B, GAMUT_C, Gamut, GamutClass, WHITE_POINT, to_xy_and_brightness};
pub use group::{Group, GroupAction, GroupData, GroupKind, GroupState, Groups};
pub use light::{Light, LightDescriptor, LightKind, LightState};
pub use lights::Lights;
pub use session::{SessionRecord, SessionStore};
pub use ssdp::{BridgeDescriptor, Candidate, CandidateSet, SSDP_ADDR, Scanner, SsdpScanner};
pub use transport::{Connector, HttpConnector, HttpTransport, Transport};
pub use types::{
    Alert, Brightness, Color, ColorMode, Effect, HueSaturation, Mired, Saturation, XyPoint,
};

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
