mod error;
mod handlers;
mod router;
mod server;
mod types;

pub use error::{reply, success, ApiError, WriteOp};
pub use router::{router, GRADES_PATH};
pub use server::serve;
pub use types::{AppState, EnrollmentKey, EnrollmentWrite, ReadParams};
