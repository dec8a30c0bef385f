pub mod extract;
pub mod fetch;

pub use extract::{Submission, extract};
pub use fetch::{HttpTitleFetcher, TitleFetcher};
