//! Minimal DER cursor.
//!
//! A [`DerNode`] is a position inside one buffer: the offsets of an element's tag and
//! content, its content length, and the end of the element that encloses it. Nothing is
//! parsed ahead of time; children and siblings are decoded from the length prefixes each
//! time they are asked for.
//!
//! Only what an X.509 walk needs is supported: single-octet tags and definite lengths with
//! at most four length octets.

use crate::error::DerError;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;
/// `[0] EXPLICIT`, the TBSCertificate version wrapper.
pub const TAG_CONTEXT_0: u8 = 0xa0;

const CONSTRUCTED: u8 = 0x20;
const HIGH_TAG_NUMBER: u8 = 0x1f;
const MAX_LENGTH_OCTETS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerNode<'a> {
    buf: &'a [u8],
    tag_offset: usize,
    content_offset: usize,
    content_len: usize,
    /// End of the enclosing element's content, the bound for `next_sibling`.
    parent_end: usize,
}

impl<'a> DerNode<'a> {
    /// The outermost element of `buf`. Bytes after it are ignored.
    pub fn root(buf: &'a [u8]) -> Result<Self, DerError> {
        let node = Self::read_at(buf, 0, buf.len())?;
        Ok(DerNode {
            parent_end: node.end(),
            ..node
        })
    }

    /// The first element nested inside this one.
    ///
    /// Works on constructed elements and on BIT STRINGs whose payload is itself DER, such as
    /// `subjectPublicKey`.
    pub fn first_child(&self) -> Result<Self, DerError> {
        let start = match self.tag() {
            TAG_BIT_STRING => {
                self.unused_bits_checked()?;
                self.content_offset + 1
            },
            tag if tag & CONSTRUCTED != 0 => self.content_offset,
            tag => return Err(DerError::NotConstructedType { tag }),
        };

        let end = self.end();
        if start >= end {
            return Err(DerError::NoMoreSiblings);
        }
        Self::read_at(self.buf, start, end)
    }

    /// The element right after this one inside the same parent.
    pub fn next_sibling(&self) -> Result<Self, DerError> {
        let start = self.end();
        if start >= self.parent_end {
            return Err(DerError::NoMoreSiblings);
        }
        Self::read_at(self.buf, start, self.parent_end)
    }

    pub fn tag(&self) -> u8 {
        self.buf[self.tag_offset]
    }

    /// Fails with [`DerError::UnexpectedTag`] unless this element carries `tag`.
    pub fn expect_tag(self, tag: u8) -> Result<Self, DerError> {
        if self.tag() != tag {
            return Err(DerError::UnexpectedTag {
                expected: tag,
                found: self.tag(),
            });
        }
        Ok(self)
    }

    /// Content octets, tag and length stripped.
    pub fn bytes(&self) -> &'a [u8] {
        &self.buf[self.content_offset..self.end()]
    }

    /// The complete encoding: tag, length and content.
    pub fn all_bytes(&self) -> &'a [u8] {
        &self.buf[self.tag_offset..self.end()]
    }

    /// BIT STRING payload without the leading unused-bits octet.
    pub fn bitstring(&self) -> Result<&'a [u8], DerError> {
        let node = self.expect_tag(TAG_BIT_STRING)?;
        node.unused_bits_checked()?;
        Ok(&node.buf[node.content_offset + 1..node.end()])
    }

    /// Offset one past the last content octet.
    fn end(&self) -> usize {
        self.content_offset + self.content_len
    }

    /// A byte-aligned BIT STRING has a first content octet of zero.
    fn unused_bits_checked(&self) -> Result<(), DerError> {
        match self.bytes().first() {
            Some(0) => Ok(()),
            _ => Err(DerError::MalformedEncoding {
                offset: self.content_offset,
            }),
        }
    }

    /// Decode the tag and length prefix at `offset`, requiring the element to finish by
    /// `limit`.
    fn read_at(buf: &'a [u8], offset: usize, limit: usize) -> Result<Self, DerError> {
        let malformed = |offset| DerError::MalformedEncoding { offset };
        let limit = limit.min(buf.len());

        let tag = *buf.get(offset).filter(|_| offset < limit).ok_or(malformed(offset))?;
        if tag & HIGH_TAG_NUMBER == HIGH_TAG_NUMBER {
            return Err(malformed(offset));
        }

        let len_offset = offset + 1;
        let first = *buf
            .get(len_offset)
            .filter(|_| len_offset < limit)
            .ok_or(malformed(len_offset))?;

        let (content_len, header_len) = if first & 0x80 == 0 {
            (first as usize, 2)
        } else {
            let octets = (first & 0x7f) as usize;
            // 0x80 is the BER indefinite form
            if octets == 0 || octets > MAX_LENGTH_OCTETS {
                return Err(malformed(len_offset));
            }
            let start = len_offset + 1;
            let raw = buf
                .get(start..start + octets)
                .filter(|_| start + octets <= limit)
                .ok_or(malformed(start))?;
            // DER requires the shortest form
            if raw[0] == 0 {
                return Err(malformed(start));
            }
            let len = raw.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
            if len < 0x80 {
                return Err(malformed(start));
            }
            (len, 2 + octets)
        };

        let content_offset = offset + header_len;
        let end = content_offset
            .checked_add(content_len)
            .ok_or(malformed(len_offset))?;
        if end > limit {
            return Err(malformed(len_offset));
        }

        Ok(DerNode {
            buf,
            tag_offset: offset,
            content_offset,
            content_len,
            parent_end: limit,
        })
    }
}

/// Strip the sign octet and any other leading zeros from an INTEGER's content.
pub fn unsigned_magnitude(bytes: &[u8]) -> &[u8] {
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[first_nonzero..]
}
