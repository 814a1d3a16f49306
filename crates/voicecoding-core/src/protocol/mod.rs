//! Protocol module containing message types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{
    decode_message, decode_server_message, encode_message, encode_server_message, DecodeError,
    ProtocolError,
};
pub use messages::*;
