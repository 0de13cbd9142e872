//! Link-layer state machine: sliding send window, in-order receive
//! sequencing, timeout-driven retransmission, and the polling driver that
//! ties them to a [`link_lab_abstract::PhysicalLayer`].

pub mod link;
pub mod state;
pub mod window;

pub use link::LinkLayer;
