//! Tower/axum middleware applied around every route.
//!
//! Order, outermost first: `instrument` -> security headers -> panic catcher
//! -> body limit -> handler. Keeping `instrument` outermost means rejected or
//! panicking requests are still measured and logged.

pub mod instrument;
pub mod security;

pub use instrument::{
    instrument, method_label, Completion, RequestId, ACCESS_TARGET, OTHER_METHOD, UNMATCHED_ROUTE,
    X_REQUEST_ID,
};
