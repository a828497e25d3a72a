//! Representative daemon commands.
//!
//! Each command only computes its path and arguments, picks the response mode, and
//! deserializes the wire shape. Everything else is the client's job.

mod block;
mod cat;
mod ping;
mod refs;
mod repo;
mod version;

pub use block::block_get;
pub use cat::{cat, CatOptions};
pub use ping::{ping, PingReply};
pub use refs::{refs_local, RefEntry};
pub use repo::{repo_gc, GcResult};
pub use version::{id, version, PeerIdentity, VersionInfo};
