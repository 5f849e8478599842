pub mod index_client;

pub use index_client::{IndexClient, RawResponse};
