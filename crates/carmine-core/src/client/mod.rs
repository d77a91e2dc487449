//! Client side: sessions, stubs and typed remote interfaces.

mod interface;
mod session;
mod stub;

pub use interface::RemoteInterface;
pub use session::{Session, SessionBuilder};
pub use stub::ClientStub;
