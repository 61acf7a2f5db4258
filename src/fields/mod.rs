//! Field decoders (spec §4.E): everything that turns a raw header/query/body
//! span into a usable value, invoked lazily by the driver only when a
//! route's flags ask for it.

pub mod accept_encoding;
pub mod if_modified_since;
pub mod kv;
pub mod range;

pub use accept_encoding::parse_accept_encoding;
pub use if_modified_since::parse_if_modified_since;
pub use kv::{lookup, parse_key_values, KvPair, ValueDecoder};
pub use range::{parse_range, ByteRange};
