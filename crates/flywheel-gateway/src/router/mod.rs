//! Request routing: proxy rules and mock rules.

mod mock;
mod prefix;

pub use mock::{MockMatch, MockResponder};
pub use prefix::PrefixRouter;
