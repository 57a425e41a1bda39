//! Parsers for Nintendo binary formats.
//!
//! Each submodule targets one format family. All parsers follow the same
//! conventions:
//!
//! * **Slice input** - parsers read from a `&[u8]` through
//!   [`crate::stream::DataStream`]. Archive formats borrow file contents
//!   from that slice instead of copying them.
//! * **Forward-only validation** - offsets read from headers are asserted
//!   against the cursor rather than jumped to, so overlapping or
//!   out-of-order sections are rejected.
//! * **Compression is separate** - parsers receive already-decompressed
//!   bytes. Use [`crate::compression`] first when necessary.
//!
//! ## Format overview
//!
//! | Module   | Format | Description |
//! |----------|--------|-------------|
//! | [`byml`] | BYML   | Hash/array tree of typed values with shared key and string tables |
//! | [`sarc`] | SARC   | General-purpose game asset archive; often Yaz0 or Zstd compressed (`.szs` / `.zs`) |
//! | [`kcl`]  | KCL    | Collision prisms partitioned by model and polygon octrees |

pub mod byml;
pub mod kcl;
pub mod sarc;
