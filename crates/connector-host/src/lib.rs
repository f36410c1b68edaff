//! BitKip Connector Host - native messaging host for the browser extension.
//!
//! The extension's background script opens a native messaging port and
//! forwards browser events over it. This crate turns those frames into calls
//! on a [`connector_core::Connector`] and turns the connector's host calls
//! back into commands for the extension.
//!
//! - [`native`]: length-prefixed JSON frames on stdin/stdout
//! - [`protocol`]: the event and command messages
//! - [`bridge`]: [`NativeHost`], the browser capabilities over the pipe
//! - [`session`]: the read loop tying it together

pub mod bridge;
pub mod native;
pub mod protocol;
pub mod session;

pub use bridge::NativeHost;
pub use native::{read_frame, write_frame, FrameError, MAX_INBOUND_FRAME, MAX_OUTBOUND_FRAME};
pub use protocol::{CallId, HostCommand, HostEvent, RequestId};
pub use session::Session;
