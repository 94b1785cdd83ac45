//! BER-TLV tree codec
//!
//! Only the subset used by PKCS#15 and GPD access-control files is supported:
//! single-byte tags and short-form lengths (`0x00..=0x7F`). Anything else is
//! reported as malformed instead of being guessed at.
//!
//! A tag with the BER constructed bit (`0x20`) set is decoded recursively; its
//! children must consume the value exactly. Every other tag, known or not, is
//! kept as an opaque primitive leaf.

use bytes::{BufMut, Bytes, BytesMut};

/// Constructed bit of a BER tag
pub const CONSTRUCTED_BIT: u8 = 0x20;

/// Largest value length expressible in short form
pub const MAX_SHORT_LENGTH: usize = 0x7F;

/// Errors raised while decoding or encoding TLV data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// Input ended before the announced length
    #[error("truncated TLV at offset {offset}: need {need} bytes, {available} available")]
    Truncated {
        /// Position of the element being parsed
        offset: usize,
        /// Bytes required
        need: usize,
        /// Bytes left in the input
        available: usize,
    },

    /// Tag number does not fit into a single byte
    #[error("multi-byte tag {0:#04X} is not supported")]
    MultiByteTag(u8),

    /// Long-form or indefinite length byte
    #[error("length byte {0:#04X} is not a short-form length")]
    LongFormLength(u8),

    /// Bytes left after a complete TLV where none were expected
    #[error("{remaining} unexpected bytes after the TLV")]
    TrailingData {
        /// Number of bytes left over
        remaining: usize,
    },

    /// Value too long to encode with a short-form length
    #[error("value of {0} bytes exceeds the short-form length limit")]
    ValueTooLong(usize),

    /// Node kind disagrees with the constructed bit of its tag
    #[error("tag {0:#04X} does not match its node kind")]
    KindMismatch(u8),

    /// No input at all
    #[error("empty input")]
    Empty,
}

/// Value of a TLV node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlvValue {
    /// Raw value bytes
    Primitive(Bytes),
    /// Ordered children of a constructed tag
    Constructed(Vec<TlvNode>),
}

/// One decoded BER-TLV element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvNode {
    tag: u8,
    value: TlvValue,
}

/// Whether `tag` carries the BER constructed bit
pub const fn is_constructed_tag(tag: u8) -> bool {
    tag & CONSTRUCTED_BIT != 0
}

impl TlvNode {
    /// Create a primitive node
    pub fn primitive(tag: u8, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: TlvValue::Primitive(value.into()),
        }
    }

    /// Create a constructed node
    pub const fn constructed(tag: u8, children: Vec<Self>) -> Self {
        Self {
            tag,
            value: TlvValue::Constructed(children),
        }
    }

    /// Tag byte
    pub const fn tag(&self) -> u8 {
        self.tag
    }

    /// Value of the node
    pub const fn value(&self) -> &TlvValue {
        &self.value
    }

    /// Whether the node holds children
    pub const fn is_constructed(&self) -> bool {
        matches!(self.value, TlvValue::Constructed(_))
    }

    /// Children of a constructed node, empty for primitives
    pub fn children(&self) -> &[Self] {
        match &self.value {
            TlvValue::Constructed(children) => children,
            TlvValue::Primitive(_) => &[],
        }
    }

    /// Raw bytes of a primitive node
    pub const fn bytes(&self) -> Option<&Bytes> {
        match &self.value {
            TlvValue::Primitive(bytes) => Some(bytes),
            TlvValue::Constructed(_) => None,
        }
    }

    /// First child with the given tag
    pub fn child(&self, tag: u8) -> Option<&Self> {
        self.children().iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag, in order
    pub fn children_with_tag(&self, tag: u8) -> impl Iterator<Item = &Self> {
        self.children().iter().filter(move |c| c.tag == tag)
    }

    /// Encoded length of the value field
    pub fn length(&self) -> usize {
        match &self.value {
            TlvValue::Primitive(bytes) => bytes.len(),
            TlvValue::Constructed(children) => children.iter().map(Self::encoded_len).sum(),
        }
    }

    /// Encoded length of the whole element (tag, length and value)
    pub fn encoded_len(&self) -> usize {
        2 + self.length()
    }

    /// Encode the node into a fresh buffer
    pub fn to_bytes(&self) -> Result<Bytes, TlvError> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Append the encoded node to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<(), TlvError> {
        if self.tag & 0x1F == 0x1F {
            return Err(TlvError::MultiByteTag(self.tag));
        }
        if is_constructed_tag(self.tag) != self.is_constructed() {
            return Err(TlvError::KindMismatch(self.tag));
        }

        let length = self.length();
        if length > MAX_SHORT_LENGTH {
            return Err(TlvError::ValueTooLong(length));
        }

        buf.put_u8(self.tag);
        buf.put_u8(length as u8);
        match &self.value {
            TlvValue::Primitive(bytes) => buf.put_slice(bytes),
            TlvValue::Constructed(children) => {
                for child in children {
                    child.encode_into(buf)?;
                }
            }
        }
        Ok(())
    }
}

/// Parse one element starting at `offset`, returning it and the offset after it
fn parse_node(data: &Bytes, offset: usize) -> Result<(TlvNode, usize), TlvError> {
    let available = data.len() - offset;
    let (tag, len_byte) = match data.get(offset..offset + 2) {
        Some(&[tag, len]) => (tag, len),
        _ => {
            return Err(TlvError::Truncated {
                offset,
                need: 2,
                available,
            });
        }
    };

    if tag & 0x1F == 0x1F {
        return Err(TlvError::MultiByteTag(tag));
    }
    if len_byte >= 0x80 {
        return Err(TlvError::LongFormLength(len_byte));
    }

    let start = offset + 2;
    let end = start + usize::from(len_byte);
    if end > data.len() {
        return Err(TlvError::Truncated {
            offset,
            need: 2 + usize::from(len_byte),
            available,
        });
    }

    let value = data.slice(start..end);
    let node = if is_constructed_tag(tag) {
        TlvNode::constructed(tag, parse_sequence(&value)?)
    } else {
        TlvNode::primitive(tag, value)
    };

    Ok((node, end))
}

/// Parse a buffer that must be an exact concatenation of elements
fn parse_sequence(data: &Bytes) -> Result<Vec<TlvNode>, TlvError> {
    let mut nodes = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let (node, next) = parse_node(data, offset)?;
        nodes.push(node);
        offset = next;
    }
    Ok(nodes)
}

/// Decode exactly one top-level TLV covering the whole input
pub fn decode_tlv(data: &[u8]) -> Result<TlvNode, TlvError> {
    if data.is_empty() {
        return Err(TlvError::Empty);
    }

    let data = Bytes::copy_from_slice(data);
    let (node, end) = parse_node(&data, 0)?;
    if end != data.len() {
        return Err(TlvError::TrailingData {
            remaining: data.len() - end,
        });
    }
    Ok(node)
}

/// Decode a concatenation of top-level TLVs
///
/// An empty input yields an empty list.
pub fn decode_all(data: &[u8]) -> Result<Vec<TlvNode>, TlvError> {
    parse_sequence(&Bytes::copy_from_slice(data))
}

/// Decode the contents of a transparent EF
///
/// Works like [`decode_all`] but stops at trailing `00`/`FF` filler, which
/// fixed-size files commonly carry after their last element.
pub fn decode_file(data: &[u8]) -> Result<Vec<TlvNode>, TlvError> {
    let data = Bytes::copy_from_slice(data);
    let mut nodes = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        if data[offset..].iter().all(|b| matches!(*b, 0x00 | 0xFF)) {
            break;
        }
        let (node, next) = parse_node(&data, offset)?;
        nodes.push(node);
        offset = next;
    }
    Ok(nodes)
}
