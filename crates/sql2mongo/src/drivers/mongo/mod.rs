//! MongoDB destination adapter.

mod writer;

pub use writer::{to_bson, to_document, MongoSink};
