//! A high-throughput longest-prefix-match engine for IPv4 and IPv6.
//!
//! Three index implementations share one contract - insert, delete,
//! single and batch lookup - over an address family and a set of bound
//! `(prefix, length, next-hop)` triples:
//!
//! - [`trie8::Trie8Index`]: a plain 8-bit-stride trie, the universal
//!   fallback for either address family.
//! - [`dir24::Dir24Index`]: a 2^24-entry primary table plus tbl8
//!   extension groups, IPv4 only.
//! - [`wide16::Wide16Index`]: three 16-bit strides followed by 8-bit
//!   strides, IPv6 only.
//!
//! [`index::Index`] erases the choice of algorithm behind one enum for
//! callers who don't want to name a concrete type. [`simd`] holds the
//! runtime-dispatched batch lookup variants for DIR-24-8.

pub mod address;
pub mod arena;
pub mod cache;
pub mod dir24;
pub mod error;
pub mod index;
pub mod resultset;
pub mod simd;
#[cfg(feature = "sync")]
pub mod sync;
pub mod trie8;
pub mod wide16;

pub use address::{AddressFamily, Family, Ipv4Addr, Ipv6Addr, Prefix, INVALID_NEXT_HOP};
pub use dir24::Dir24Index;
pub use error::{ErrorKind, Result};
pub use index::{Algorithm, Index};
pub use resultset::ResultSet;
pub use trie8::Trie8Index;
pub use wide16::Wide16Index;

#[cfg(feature = "sync")]
pub use sync::SyncIndex;
