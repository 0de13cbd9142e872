/// The unreliable physical transmission medium underneath the link layer.
///
/// Implementations may drop, corrupt, or reorder frames at will; the link
/// layer's job is to recover. Both operations are non-blocking polls and
/// must never wait indefinitely.
pub trait PhysicalLayer: Send {
    /// Hand one encoded frame to the medium. Best-effort: may report fewer
    /// bytes than given, or 0 when the frame was not taken at all.
    fn send(&mut self, frame: &[u8]) -> usize;

    /// Poll for one inbound frame, copying it into `buf`.
    /// Returns 0 when nothing is currently available.
    fn receive(&mut self, buf: &mut [u8]) -> usize;
}
