pub mod crawler;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod result;

pub use crawler::{DomainCrawler, FetchOutcome, PathCrawler};
pub use error::ScanError;
pub use extract::AddressExtractor;
pub use normalize::normalize;
pub use result::{DomainOutcome, OutcomeStatus};
