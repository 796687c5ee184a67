pub mod bundle;
pub mod errors;
pub mod sensor;
pub mod session;
pub mod store;

pub use errors::{PosesyncError, Result};
pub use session::Session;
