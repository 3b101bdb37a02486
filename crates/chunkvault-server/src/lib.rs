//! Ingestion service for chunkvault.
//!
//! Accepts chunked uploads over a client-streaming call and answers metadata
//! listings, with both operations behind non-blocking admission gates. The
//! service itself is transport-agnostic ([`IngestionService`] drives any
//! [`UploadStream`]); [`router::build_router`] binds it to HTTP.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod service;
pub mod stream;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::HttpUploadStream;
pub use server::ChunkvaultServer;
pub use service::{CallContext, IngestionService};
pub use stream::{channel, ChannelUploadStream, StreamError, UploadSender, UploadStream};
