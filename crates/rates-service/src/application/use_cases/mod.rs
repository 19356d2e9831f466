mod get_rates;

pub use get_rates::{CallContext, GetRatesUseCase, RatesError, RatesService};
