// ── Query building ──
//
// `Query` is the by-value builder every chain goes through. Its state lives
// in a `PendingQuery`; filters are an expression tree until the sentence is
// assembled.

mod builder;
pub mod filter;
pub mod pending;

pub use builder::Query;
pub use filter::{Comparison, Filter};
pub use pending::{Param, ParamValue, PendingQuery};
