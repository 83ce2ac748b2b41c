//! Port traits implemented by the infrastructure layer. The application
//! layer depends only on these, never on a concrete adapter.

mod logging;
mod manifest;
mod parser;
mod recall;
mod storage;
mod writer;

pub use logging::{LogLevel, OperationLogger};
pub use manifest::ManifestLoader;
pub use parser::{ExtractorOutput, ParserPool, RawCallEdge, RawIncludeDep, RawReference, RawSymbol};
pub use recall::{RecallEngine, RecallHit};
pub use storage::StorageEngine;
pub use writer::{ParsePayload, SingleWriter, WriterStats};
