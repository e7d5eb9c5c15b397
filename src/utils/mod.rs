mod cancel;
mod env;
mod logger;
mod metrics;

pub use cancel::setup_cancel_token;
pub use env::load_env;
pub use logger::init_logger;
pub use metrics::init_metrics;
