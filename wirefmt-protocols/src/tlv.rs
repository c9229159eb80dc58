//! Generic type-length-value list engine
//!
//! DHCP option lists and netlink attribute lists share one walker. A format
//! describes itself through [`TlvRecord`]: how long its header is, how
//! entries are aligned, and what the bytes at the cursor mean. The format's
//! [`HeaderStep::End`] is the stop predicate; a format that never returns it
//! ends at input exhaustion.

use std::marker::PhantomData;

use bytes::{BufMut, BytesMut};
use tracing::trace;
use wirefmt_core::{align_to, Error, Result};

/// What the bytes at the cursor hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStep {
    /// An entry whose value starts `header_len` bytes past the cursor
    Entry {
        kind: u16,
        value_len: usize,
        header_len: usize,
    },
    /// Filler to step over without producing an entry
    Skip(usize),
    /// List sentinel
    End,
}

/// A record format that can be walked by [`TlvIter`]
pub trait TlvRecord: Sized {
    /// Bytes in front of the value
    const HEADER_LEN: usize;
    /// Each entry is padded to a multiple of this on encode
    const ALIGN: usize;
    /// Largest value the length field can describe
    const MAX_VALUE_LEN: usize;

    fn kind(&self) -> u16;

    fn value(&self) -> &[u8];

    fn from_parts(kind: u16, value: &[u8]) -> Self;

    /// Classify the bytes at the cursor; `rest` is never empty.
    ///
    /// An `Entry` must fit inside `rest`, otherwise the format reports its
    /// own truncation error.
    fn read_header(rest: &[u8]) -> Result<HeaderStep>;

    /// Write the header for `self`, value length included
    fn write_header(&self, buf: &mut BytesMut) -> Result<()>;

    /// Append the list sentinel, if the format has one
    fn write_terminator(_buf: &mut BytesMut) {}
}

/// Borrowed view of one decoded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvRef<'a> {
    pub kind: u16,
    pub value: &'a [u8],
}

impl<'a> TlvRef<'a> {
    /// Copy into an owned record
    pub fn to_record<R: TlvRecord>(&self) -> R {
        R::from_parts(self.kind, self.value)
    }
}

/// Lazy walker over an encoded list.
///
/// Stops after the sentinel, at exhaustion, or after yielding the first
/// error. Every call to [`TlvIter::new`] starts from the beginning of the
/// slice; no state is shared between walkers.
#[derive(Debug, Clone)]
pub struct TlvIter<'a, R> {
    buf: &'a [u8],
    offset: usize,
    done: bool,
    terminated: bool,
    _format: PhantomData<fn() -> R>,
}

impl<'a, R: TlvRecord> TlvIter<'a, R> {
    pub fn new(buf: &'a [u8]) -> Self {
        TlvIter {
            buf,
            offset: 0,
            done: false,
            terminated: false,
            _format: PhantomData,
        }
    }

    /// Cursor position relative to the start of the list
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes after the cursor
    pub fn remaining(&self) -> &'a [u8] {
        self.buf.get(self.offset..).unwrap_or(&[])
    }

    /// True once the sentinel has been seen
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    fn step(&mut self) -> Option<Result<TlvRef<'a>>> {
        loop {
            let rest = self.remaining();
            if rest.is_empty() {
                return None;
            }

            match R::read_header(rest) {
                Err(err) => return Some(Err(err)),
                Ok(HeaderStep::End) => {
                    self.terminated = true;
                    return None;
                }
                Ok(HeaderStep::Skip(n)) => {
                    self.offset += n.clamp(1, rest.len());
                }
                Ok(HeaderStep::Entry {
                    kind,
                    value_len,
                    header_len,
                }) => {
                    let end = header_len + value_len;
                    let value = match rest.get(header_len..end) {
                        Some(value) => value,
                        None => {
                            return Some(Err(Error::truncated("TLV value", end, rest.len())))
                        }
                    };
                    self.offset += align_to(end, R::ALIGN).min(rest.len());
                    trace!(kind, len = value_len, offset = self.offset, "decoded TLV entry");
                    return Some(Ok(TlvRef { kind, value }));
                }
            }
        }
    }
}

impl<'a, R: TlvRecord> Iterator for TlvIter<'a, R> {
    type Item = Result<TlvRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.step();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Decode a whole list into owned records
pub fn decode_list<R: TlvRecord>(buf: &[u8]) -> Result<Vec<R>> {
    TlvIter::<R>::new(buf)
        .map(|entry| entry.map(|entry| entry.to_record()))
        .collect()
}

/// Encode `records` in order, padding each to the format's alignment and
/// appending the sentinel if the format has one
pub fn encode_list<R: TlvRecord>(records: &[R]) -> Result<Vec<u8>> {
    let capacity = records
        .iter()
        .map(|r| align_to(R::HEADER_LEN + r.value().len(), R::ALIGN))
        .sum::<usize>()
        + 1;
    let mut buf = BytesMut::with_capacity(capacity);

    for record in records {
        let value = record.value();
        if value.len() > R::MAX_VALUE_LEN {
            return Err(Error::invalid_construction(format!(
                "value of {} bytes for type {} exceeds {}",
                value.len(),
                record.kind(),
                R::MAX_VALUE_LEN
            )));
        }
        let start = buf.len();
        record.write_header(&mut buf)?;
        buf.put_slice(value);
        let written = buf.len() - start;
        buf.put_bytes(0, align_to(written, R::ALIGN) - written);
    }

    R::write_terminator(&mut buf);
    Ok(buf.to_vec())
}
