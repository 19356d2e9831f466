mod depth;
mod history;
mod order;

pub use depth::{Depth, DepthEnvelope};
pub use history::{HistoryRow, Leg};
pub use order::Order;
