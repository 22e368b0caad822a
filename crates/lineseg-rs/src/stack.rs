//! Fixed-capacity label stack packed into the low 24 bits of a map cell.
//!
//! A cell value holds up to [`STACK_CAPACITY`] labels, one per byte. The first
//! label written sits in the most-significant occupied byte and the most recent
//! one in the least-significant byte, so `a` then `b` packs to `(a << 8) + b`.
//! The top byte of the word stays free: the 3-slot cap is part of the format.

use crate::error::{Error, Result};

/// Maximum number of labels a single pixel may carry.
pub const STACK_CAPACITY: usize = 3;

/// Ordered stack of 0..=3 one-byte labels, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelStack {
    labels: [u8; STACK_CAPACITY],
    len: u8,
}

/// Returned by [`LabelStack::push`] on a full stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityExceeded;

impl LabelStack {
    /// Stack holding only the background label 0.
    pub fn background() -> Self {
        LabelStack {
            labels: [0; STACK_CAPACITY],
            len: 1,
        }
    }

    /// Split a packed cell into its labels.
    ///
    /// `0` unpacks to an empty stack. Returns `None` when the value needs more
    /// than [`STACK_CAPACITY`] bytes.
    pub fn unpack(value: u32) -> Option<Self> {
        let mut lsb_first = [0u8; STACK_CAPACITY];
        let mut n = 0usize;
        let mut v = value;
        while v > 0 {
            if n == STACK_CAPACITY {
                return None;
            }
            lsb_first[n] = (v & 0xff) as u8;
            v >>= 8;
            n += 1;
        }
        let mut stack = LabelStack::default();
        for &label in lsb_first[..n].iter().rev() {
            stack.labels[stack.len as usize] = label;
            stack.len += 1;
        }
        Some(stack)
    }

    /// Like [`LabelStack::unpack`], but background (`0`) is a one-layer stack `[0]`.
    pub fn layers(value: u32) -> Option<Self> {
        if value == 0 {
            Some(LabelStack::background())
        } else {
            LabelStack::unpack(value)
        }
    }

    /// Pack back into a cell value.
    pub fn pack(&self) -> u32 {
        self.as_slice()
            .iter()
            .fold(0u32, |acc, &label| (acc << 8) | label as u32)
    }

    /// Put `label` on top of the stack.
    pub fn push(&mut self, label: u8) -> std::result::Result<(), CapacityExceeded> {
        if self.is_full() {
            return Err(CapacityExceeded);
        }
        self.labels[self.len as usize] = label;
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len as usize == STACK_CAPACITY
    }

    /// Labels, oldest first.
    pub fn as_slice(&self) -> &[u8] {
        &self.labels[..self.len as usize]
    }

    pub fn contains(&self, label: u8) -> bool {
        self.as_slice().contains(&label)
    }
}

/// Validate a polygon label and narrow it to its byte slot.
pub fn label_byte(label: u32) -> Result<u8> {
    match u8::try_from(label) {
        Ok(byte) if byte != 0 => Ok(byte),
        _ => Err(Error::InvalidLabel(label)),
    }
}

/// Decode a packed cell value into its labels, oldest first.
///
/// `0` decodes to `[0]` (background). A value with more than 24 significant
/// bits has no valid decomposition and yields an empty list.
pub fn recover_labels(value: u32) -> Vec<u32> {
    match LabelStack::layers(value) {
        Some(stack) => stack.as_slice().iter().map(|&l| l as u32).collect(),
        None => Vec::new(),
    }
}
