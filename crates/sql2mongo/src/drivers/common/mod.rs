//! Utilities shared by the source adapters.
//!
//! - [`tls`]: `ssl_mode` parsing and the rustls connector for PostgreSQL
//! - [`cursor`]: channel-backed [`RowCursor`](crate::core::RowCursor)

pub mod cursor;
pub mod tls;

pub use cursor::ChannelCursor;
#[cfg(feature = "postgres")]
pub use tls::TlsBuilder;
pub use tls::SslMode;
