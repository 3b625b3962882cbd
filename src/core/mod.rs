pub mod rewrite;
pub mod route_table;

pub use route_table::{ResolveError, RouteEntry, RouteTable};
