//! Event framing between the answer pipeline and remote consumers.
//!
//! Each frame is `data: <single-line JSON>` followed by a blank line. The encoder lives in
//! [`frame`], typed wire events in [`events`].

pub mod events;
pub mod frame;

pub use events::{WireEvent, decode_events};
pub use frame::{FrameDecoder, encode_frame, frame_payloads};
