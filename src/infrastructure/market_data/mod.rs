pub mod frame_parser;
pub mod websocket;

pub use websocket::BrokerWebSocketFeed;
