pub mod dto;
mod error;
mod handler;
mod router;

pub use dto::{OrderMessage, RatesRequest, RatesResponse};
pub use error::{RpcCode, RpcStatus};
pub use handler::{RatesController, TIMEOUT_HEADER};
pub use router::{GET_RATES_PATH, create_router};
