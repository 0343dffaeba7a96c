//! MySQL/MariaDB source adapter.
//!
//! Uses SQLx for pooling and row streaming. Only available with the `mysql`
//! feature.
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod reader;

pub use reader::MysqlReader;
