mod event;
mod key;

pub use event::*;
pub use key::*;
