//! Shared protocol state and the transitions the driver loop runs.
//!
//! Everything here executes under the single link-layer lock: the send
//! window, the single-slot receive buffer, and the sequence cursors are
//! only ever touched through a locked [`LinkState`].

use std::time::Instant;

use link_lab_abstract::{
    FRAME_LEN, Frame, LinkConfig, LinkError, PhysicalLayer, checksum,
};
use tracing::{debug, trace};

use crate::window::SendWindow;

pub(crate) struct LinkState {
    config: LinkConfig,
    medium: Box<dyn PhysicalLayer>,
    window: SendWindow,
    /// Single-slot queue of one delivered payload awaiting the application.
    /// While occupied, no further in-order frame is accepted (backpressure).
    receive_slot: Option<Vec<u8>>,
    next_send_seq: u32,
    next_receive_seq: u32,
    last_receive_ack: u32,
    /// Becomes true on the first accepted frame. Until then the cumulative
    /// ack value is meaningless (N-1 with nothing received) and advertising
    /// it could evict peer frames that were never delivered.
    ack_established: bool,
}

impl LinkState {
    pub(crate) fn new(medium: Box<dyn PhysicalLayer>, config: LinkConfig) -> Self {
        Self {
            window: SendWindow::new(config.max_window),
            config,
            medium,
            receive_slot: None,
            next_send_seq: 0,
            next_receive_seq: 0,
            last_receive_ack: 0,
            ack_established: false,
        }
    }

    /// Last in-order sequence number received, `next_receive_seq - 1 mod N`.
    fn cumulative_ack(&self) -> u32 {
        let n = self.config.num_sequence_numbers;
        (self.next_receive_seq + n - 1) % n
    }

    /// Application-side `send`: build, transmit, and enqueue one frame.
    ///
    /// Returns `Ok(0)` without consuming anything when the window is full.
    /// The initial transmission is best-effort; if the medium takes nothing
    /// the retransmission monitor recovers.
    pub(crate) fn enqueue_send(&mut self, payload: &[u8], now: Instant) -> Result<usize, LinkError> {
        if self.window.is_full() {
            trace!(outstanding = self.window.len(), "send window full");
            return Ok(0);
        }

        let mut frame = Frame::data(self.next_send_seq, self.cumulative_ack(), payload)?;
        frame.header.checksum = checksum::compute(&frame)?;

        let sent = self.medium.send(&frame.encode());
        debug!(
            seq = frame.header.seq,
            ack = frame.header.ack,
            len = payload.len(),
            sent,
            "transmit data frame"
        );

        self.next_send_seq = (self.next_send_seq + 1) % self.config.num_sequence_numbers;
        self.window.push(frame, now);
        Ok(payload.len())
    }

    /// Application-side `receive`: drain the pending payload into `buf`.
    pub(crate) fn take_delivery(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match &self.receive_slot {
            None => Ok(0),
            Some(payload) if payload.len() > buf.len() => {
                Err(LinkError::InvalidArgument("receive buffer too small"))
            }
            Some(_) => {
                let payload = self.receive_slot.take().unwrap_or_default();
                buf[..payload.len()].copy_from_slice(&payload);
                Ok(payload.len())
            }
        }
    }

    /// Receive-sequencer transition for one raw inbound frame.
    ///
    /// Accepts only the frame carrying the expected sequence number with a
    /// valid checksum, a nonzero payload, and an empty receive slot;
    /// everything else is dropped silently. The frame's ack field is
    /// recorded and applied to the send window regardless of acceptance.
    pub(crate) fn process_inbound(&mut self, raw: &[u8]) {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%err, "drop undecodable frame");
                return;
            }
        };
        let header = frame.header;

        if header.seq == self.next_receive_seq
            && !frame.is_ack_only()
            && self.receive_slot.is_none()
            && checksum::verify(&frame)
        {
            debug!(seq = header.seq, len = header.payload_len, "accept frame");
            self.receive_slot = Some(frame.data_bytes().to_vec());
            self.next_receive_seq =
                (self.next_receive_seq + 1) % self.config.num_sequence_numbers;
            self.ack_established = true;
        } else {
            trace!(
                seq = header.seq,
                expected = self.next_receive_seq,
                ack_only = frame.is_ack_only(),
                slot_free = self.receive_slot.is_none(),
                "drop frame"
            );
        }

        self.last_receive_ack = header.ack;
        let evicted = self.window.apply_ack(self.last_receive_ack);
        if evicted > 0 {
            debug!(ack = self.last_receive_ack, evicted, "window slide");
        }
    }

    /// Resend every outstanding frame older than the timeout, restamping
    /// its piggybacked ack and checksum first.
    pub(crate) fn retransmit_expired(&mut self, now: Instant) {
        let timeout = self.config.timeout();
        let ack = self.cumulative_ack();

        for slot in self.window.iter_mut() {
            if now.duration_since(slot.sent_at) < timeout {
                continue;
            }
            slot.frame.header.ack = ack;
            if let Ok(sum) = checksum::compute(&slot.frame) {
                slot.frame.header.checksum = sum;
            }
            let sent = self.medium.send(&slot.frame.encode());
            debug!(seq = slot.frame.header.seq, ack, sent, "retransmit frame");
            if sent > 0 {
                slot.sent_at = now;
            }
        }
    }

    /// Emit a zero-payload cumulative-ack frame whenever the send window
    /// offers nothing to piggyback the ack on.
    ///
    /// Runs every driver iteration, so an idle receiver keeps advertising
    /// its cumulative ack; the peer matches it against its outstanding
    /// frames once their piggybacked ack fields catch up through
    /// retransmission. Suppressed until the first frame is accepted: an
    /// endpoint that has received nothing has no receipt to advertise.
    pub(crate) fn flush_standalone_ack(&mut self) {
        if !self.ack_established || !self.window.is_empty() {
            return;
        }
        let mut frame = Frame::standalone_ack(self.next_send_seq, self.cumulative_ack());
        if let Ok(sum) = checksum::compute(&frame) {
            frame.header.checksum = sum;
        }
        let sent = self.medium.send(&frame.encode());
        trace!(ack = frame.header.ack, sent, "standalone ack");
    }

    /// One driver-loop iteration: poll, sequence, retransmit, ack.
    pub(crate) fn step(&mut self, now: Instant) {
        if self.receive_slot.is_none() {
            let mut raw = [0u8; FRAME_LEN];
            let n = self.medium.receive(&mut raw);
            if n > 0 {
                self.process_inbound(&raw[..n]);
            }
        }
        self.retransmit_expired(now);
        self.flush_standalone_ack();
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> usize {
        self.window.len()
    }

    #[cfg(test)]
    pub(crate) fn cursors(&self) -> (u32, u32, u32) {
        (self.next_send_seq, self.next_receive_seq, self.last_receive_ack)
    }
}
