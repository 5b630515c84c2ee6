//! Message descriptors handed to the resolver by the transport.

/// An outbound message whose unscheduled packets need priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Total message size in bytes.
    pub msg_size: u32,
    /// Unscheduled packets still waiting for a priority.
    pub unsched_pkts: usize,
}

impl OutboundMessage {
    pub fn new(msg_size: u32, unsched_pkts: usize) -> Self {
        OutboundMessage {
            msg_size,
            unsched_pkts,
        }
    }
}

/// An inbound message whose next scheduled packet needs a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundMessage {
    /// Total message size in bytes.
    pub msg_size: u32,
    /// Bytes the sender transmitted without a grant.
    pub total_unsched_bytes: u32,
    /// Bytes the receiver has not granted yet.
    pub bytes_to_grant: u32,
}

impl InboundMessage {
    pub fn new(msg_size: u32, total_unsched_bytes: u32, bytes_to_grant: u32) -> Self {
        InboundMessage {
            msg_size,
            total_unsched_bytes,
            bytes_to_grant,
        }
    }

    /// Bytes of the message that travel as scheduled packets.
    pub fn sched_bytes(&self) -> u32 {
        self.msg_size.saturating_sub(self.total_unsched_bytes)
    }
}
