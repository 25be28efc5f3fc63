mod server;

pub use server::{ClientConnection, Server, UdpSink};
