mod http;

pub use http::HttpQuoteSource;
