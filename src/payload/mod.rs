//! RPC argument (de)serialization (spec §4.1, "Payload type system").
mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;
