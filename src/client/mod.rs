//! The client facade: transient query/mutation orchestration over one
//! shared cache and bus, plus a detached variant for isolated sessions.

pub mod detached;
pub mod facade;
pub mod options;

pub use detached::DetachedClient;
pub use facade::{ActiveKey, Client, MutationRequest, QueryRequest};
pub use options::{ClientBuilder, ClientOptions};
