/// Errors surfaced synchronously by the link layer.
///
/// Transport-level faults (dropped, corrupted, or reordered frames) are
/// never errors: the protocol absorbs them via silent drop and
/// retransmission.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// A caller violated a precondition (zero-length or oversized send
    /// request, undersized receive buffer, invalid configuration).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A frame is structurally invalid (oversized or truncated).
    #[error("invalid packet: {0}")]
    InvalidPacket(&'static str),

    /// The background driver thread could not be started.
    #[error("failed to start the link driver thread")]
    ConstructionFailure,
}
