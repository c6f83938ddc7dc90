use super::{Command, MAX_COMMAND_LEN, ProtocolError, message_len, parse};
use crate::ring_buffer::RingBuffer;

/// Storage slots in the inbound byte queue; `QUEUE_SIZE - 1` bytes fit.
pub const QUEUE_SIZE: usize = 64;

/// Accumulates raw link bytes and yields complete messages.
///
/// When the queue is full the oldest byte is dropped, so a host that outruns the
/// main loop loses framing rather than stalling the link. An unrecognized
/// leading byte flushes the queue, which resynchronizes on the next message.
#[derive(Clone, Debug, Default)]
pub struct MessageQueue {
    bytes: RingBuffer<u8, QUEUE_SIZE>,
}

impl MessageQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: RingBuffer::new(),
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes.push_back(byte);
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Leading byte, if any.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        (!self.is_empty()).then(|| self.bytes.get(0))
    }

    /// Discards every queued byte.
    pub fn flush(&mut self) {
        self.bytes.clear();
    }

    /// Pops the next complete message.
    ///
    /// Returns `None` while the queue is empty or the leading message is still
    /// incomplete. An unknown leading byte flushes the queue and is reported as
    /// [`ProtocolError::UnknownCommand`].
    pub fn next_command(&mut self) -> Option<Result<Command, ProtocolError>> {
        let command = self.peek()?;
        let Some(len) = message_len(command) else {
            self.flush();
            return Some(Err(ProtocolError::UnknownCommand(command)));
        };
        if self.len() < len {
            return None;
        }

        let mut frame = [0u8; MAX_COMMAND_LEN];
        for slot in &mut frame[..len] {
            *slot = self.bytes.pop_front();
        }
        Some(parse(&frame[..len]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ArithmeticOp, TimeRequest};

    #[test]
    fn waits_for_complete_message() {
        let mut queue = MessageQueue::new();
        let bytes = Command::EncoderEvery { period_ms: 100.0 }.encode();

        queue.extend(&bytes[..3]);
        assert_eq!(queue.next_command(), None);
        assert_eq!(queue.len(), 3);

        queue.extend(&bytes[3..]);
        assert_eq!(
            queue.next_command(),
            Some(Ok(Command::EncoderEvery { period_ms: 100.0 }))
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn splits_back_to_back_messages() {
        let mut queue = MessageQueue::new();
        queue.extend(b"e");
        queue.extend(
            &Command::Arithmetic {
                op: ArithmeticOp::Add,
                lhs: 1.0,
                rhs: 2.0,
            }
            .encode(),
        );
        queue.extend(b"t\x00");

        assert_eq!(queue.next_command(), Some(Ok(Command::Encoder)));
        assert!(matches!(
            queue.next_command(),
            Some(Ok(Command::Arithmetic {
                op: ArithmeticOp::Add,
                ..
            }))
        ));
        assert_eq!(
            queue.next_command(),
            Some(Ok(Command::Time(TimeRequest::Now)))
        );
        assert_eq!(queue.next_command(), None);
    }

    #[test]
    fn unknown_byte_flushes_queue() {
        let mut queue = MessageQueue::new();
        queue.extend(b"xe");
        assert_eq!(
            queue.next_command(),
            Some(Err(ProtocolError::UnknownCommand(b'x')))
        );
        assert!(queue.is_empty());

        queue.push(b'e');
        assert_eq!(queue.next_command(), Some(Ok(Command::Encoder)));
    }

    #[test]
    fn bad_subcommand_consumes_message() {
        let mut queue = MessageQueue::new();
        queue.extend(b"t\x09q");
        assert_eq!(
            queue.next_command(),
            Some(Err(ProtocolError::UnknownSubcommand {
                command: b't',
                subcommand: 9
            }))
        );
        assert_eq!(queue.next_command(), Some(Ok(Command::SysInfo)));
    }

    #[test]
    fn overflow_drops_oldest_bytes() {
        let mut queue = MessageQueue::new();
        for _ in 0..QUEUE_SIZE + 10 {
            queue.push(b's');
        }
        assert_eq!(queue.len(), QUEUE_SIZE - 1);
        assert_eq!(queue.peek(), Some(b's'));
    }
}
