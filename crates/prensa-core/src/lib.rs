pub mod consumer;
pub mod enrich;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod queue;
pub mod sentiment;
pub mod sink;
pub mod structured;
pub mod testutil;
pub mod traits;
pub mod util;

pub use error::AppError;
pub use models::{ArticleRecord, Envelope, HarvestConfig, HarvestReport};
pub use traits::{ArticleSource, ArticleStore, Enricher, Fetcher, ListingSource, RecordSink};
