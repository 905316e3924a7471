mod batch;
mod registry;
mod traits;

pub use batch::{BatchItem, BatchOutcome};
pub use registry::TableRegistry;
pub use traits::Connection;
