//! Byte link between the USB CDC task and the control loop.
//!
//! Host bytes arrive in packet-sized [`LinkFrame`]s and are fed to the robot
//! verbatim; command boundaries are recovered by the protocol queue, not here.
//! Outgoing reply frames are packed back-to-back by [`ReplyPacker`] so a burst
//! of reports costs as few USB packets as possible.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::mem;

use embassy_sync::channel::{Channel, Receiver, Sender};
use robot_core::protocol::{MAX_FRAME_LEN, Reply};

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;

#[cfg(target_os = "none")]
type LinkMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type LinkMutex = NoopRawMutex;

/// Payload bytes per frame, one short of the full-speed packet size so a full
/// frame never needs a trailing zero-length packet.
pub const LINK_FRAME_CAPACITY: usize = 63;

/// Depth for each bounded link channel.
pub const LINK_QUEUE_DEPTH: usize = 8;

const _: () = assert!(MAX_FRAME_LEN <= LINK_FRAME_CAPACITY);

/// Chunk of raw bytes moving across the link.
pub type LinkFrame = heapless::Vec<u8, LINK_FRAME_CAPACITY>;

pub type LinkChannel = Channel<LinkMutex, LinkFrame, LINK_QUEUE_DEPTH>;

pub type LinkSender<'a> = Sender<'a, LinkMutex, LinkFrame, LINK_QUEUE_DEPTH>;

pub type LinkReceiver<'a> = Receiver<'a, LinkMutex, LinkFrame, LINK_QUEUE_DEPTH>;

/// Both directions of the host link.
pub struct LinkQueue {
    pub host_to_robot: LinkChannel,
    pub robot_to_host: LinkChannel,
}

impl LinkQueue {
    pub const fn new() -> Self {
        Self {
            host_to_robot: Channel::new(),
            robot_to_host: Channel::new(),
        }
    }

    /// Returns the sender the USB task uses for received bytes.
    pub fn host_to_robot_sender(&self) -> LinkSender<'_> {
        self.host_to_robot.sender()
    }

    /// Returns the receiver the control loop drains each iteration.
    pub fn host_to_robot_receiver(&self) -> LinkReceiver<'_> {
        self.host_to_robot.receiver()
    }

    /// Returns the sender the control loop uses for packed replies.
    pub fn robot_to_host_sender(&self) -> LinkSender<'_> {
        self.robot_to_host.sender()
    }

    /// Returns the receiver the USB task writes out to the host.
    pub fn robot_to_host_receiver(&self) -> LinkReceiver<'_> {
        self.robot_to_host.receiver()
    }
}

impl Default for LinkQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Packs encoded replies into link frames without splitting a reply.
#[derive(Debug, Default)]
pub struct ReplyPacker {
    current: LinkFrame,
}

impl ReplyPacker {
    pub const fn new() -> Self {
        Self {
            current: heapless::Vec::new(),
        }
    }

    /// Appends `reply`, returning the previous frame once it can no longer
    /// take the new reply.
    pub fn push(&mut self, reply: &Reply) -> Option<LinkFrame> {
        let bytes = reply.encode();
        let full = if self.current.len() + bytes.len() > LINK_FRAME_CAPACITY {
            Some(mem::take(&mut self.current))
        } else {
            None
        };
        // An empty frame always fits one reply.
        let _ = self.current.extend_from_slice(&bytes);
        full
    }

    /// Takes whatever has been packed so far.
    pub fn flush(&mut self) -> Option<LinkFrame> {
        if self.current.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.current))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Frames the packed `replies` and hands each finished frame to `deliver`.
pub fn pack_replies<I>(replies: I, mut deliver: impl FnMut(LinkFrame))
where
    I: IntoIterator<Item = Reply>,
{
    let mut packer = ReplyPacker::new();
    for reply in replies {
        if let Some(frame) = packer.push(&reply) {
            deliver(frame);
        }
    }
    if let Some(frame) = packer.flush() {
        deliver(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_replies_share_a_frame() {
        let replies = [
            Reply::Unknown { byte: b'x' },
            Reply::Voltage {
                command: b'b',
                volts: 5.0,
            },
        ];
        let mut frames = Vec::new();
        pack_replies(replies, |frame| frames.push(frame));

        assert_eq!(frames.len(), 1);
        let expected: Vec<u8> = replies.iter().flat_map(|reply| reply.encode()).collect();
        assert_eq!(frames[0].as_slice(), expected.as_slice());
    }

    #[test]
    fn replies_are_never_split_across_frames() {
        let reply = Reply::Encoder {
            command: b'E',
            left: 1.0,
            right: -1.0,
        };
        let len = reply.encode().len();
        let per_frame = LINK_FRAME_CAPACITY / len;

        let mut frames = Vec::new();
        pack_replies(core::iter::repeat_n(reply, per_frame + 1), |frame| {
            frames.push(frame);
        });

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), per_frame * len);
        assert_eq!(frames[1].len(), len);
    }

    #[test]
    fn empty_packer_flushes_nothing() {
        let mut packer = ReplyPacker::new();
        assert!(packer.is_empty());
        assert!(packer.flush().is_none());
    }

    #[test]
    fn queue_carries_frames_in_order() {
        let queue = LinkQueue::new();
        let sender = queue.host_to_robot_sender();
        let receiver = queue.host_to_robot_receiver();

        for chunk in [&b"t\x00"[..], b"q"] {
            let mut frame = LinkFrame::new();
            frame.extend_from_slice(chunk).unwrap();
            sender.try_send(frame).unwrap();
        }

        assert_eq!(receiver.try_receive().unwrap().as_slice(), b"t\x00");
        assert_eq!(receiver.try_receive().unwrap().as_slice(), b"q");
        assert!(receiver.try_receive().is_err());
    }
}
