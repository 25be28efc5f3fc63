pub mod protocol;
pub mod entities;
pub mod items;
pub mod abilities;

pub use protocol::*;
pub use entities::*;
pub use items::*;
pub use abilities::*;
