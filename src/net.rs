mod dispatcher;
mod response;

pub use dispatcher::{CookieDispatcher, CookieOutcome};
pub use response::Response;
