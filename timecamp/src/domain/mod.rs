mod entry;
mod lenient;
mod task;
mod timer;
mod user;

pub use entry::*;
pub use task::*;
pub use timer::*;
pub use user::*;
