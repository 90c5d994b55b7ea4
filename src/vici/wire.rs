// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Framed VICI message codec: segment framing, the element byte-stream, and
//! the recursive [`Value`] tree that element streams decode into.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::vici::error::ViciError;

const ELEM_SECTION_START: u8 = 1;
const ELEM_SECTION_END: u8 = 2;
const ELEM_KEY_VALUE: u8 = 3;
const ELEM_LIST_START: u8 = 4;
const ELEM_LIST_ITEM: u8 = 5;
const ELEM_LIST_END: u8 = 6;

/// Segment kind: the single byte following the outer length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    CmdRequest,
    CmdResponse,
    CmdUnknown,
    EventRegister,
    EventUnregister,
    EventConfirm,
    EventUnknown,
    Event,
}

impl SegmentKind {
    fn from_byte(b: u8) -> Result<Self, ViciError> {
        Ok(match b {
            0 => SegmentKind::CmdRequest,
            1 => SegmentKind::CmdResponse,
            2 => SegmentKind::CmdUnknown,
            3 => SegmentKind::EventRegister,
            4 => SegmentKind::EventUnregister,
            5 => SegmentKind::EventConfirm,
            6 => SegmentKind::EventUnknown,
            7 => SegmentKind::Event,
            _ => return Err(ViciError::MalformedFrame(format!("bad segment type {b}"))),
        })
    }

    fn to_byte(self) -> u8 {
        match self {
            SegmentKind::CmdRequest => 0,
            SegmentKind::CmdResponse => 1,
            SegmentKind::CmdUnknown => 2,
            SegmentKind::EventRegister => 3,
            SegmentKind::EventUnregister => 4,
            SegmentKind::EventConfirm => 5,
            SegmentKind::EventUnknown => 6,
            SegmentKind::Event => 7,
        }
    }

    /// Whether this kind carries a name: the command name for a request, the
    /// event name for register/unregister/event kinds.
    fn has_name(self) -> bool {
        matches!(
            self,
            SegmentKind::CmdRequest
                | SegmentKind::EventRegister
                | SegmentKind::EventUnregister
                | SegmentKind::Event
        )
    }

    /// Whether this kind carries an element-stream body.
    fn has_body(self) -> bool {
        matches!(
            self,
            SegmentKind::CmdRequest | SegmentKind::CmdResponse | SegmentKind::Event
        )
    }
}

/// A single decoded VICI segment: kind, optional name, optional body.
#[derive(Debug, Clone)]
pub struct Segment {
    pub kind: SegmentKind,
    pub name: Option<String>,
    pub body: Value,
}

impl Segment {
    pub fn named(kind: SegmentKind, name: impl Into<String>, body: Value) -> Self {
        Self { kind, name: Some(name.into()), body: body_or_empty(kind, body) }
    }
}

fn body_or_empty(kind: SegmentKind, body: Value) -> Value {
    if kind.has_body() { body } else { Value::Section(OrderedMap::new()) }
}

/// A value in the recursive VICI element tree.
///
/// `Section` preserves insertion order and allows duplicate keys to survive
/// decode as `key##N` per the wire format's duplicate-key convention.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Section(OrderedMap),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&OrderedMap> {
        match self {
            Value::Section(m) => Some(m),
            _ => None,
        }
    }
}

/// Insertion-ordered string-keyed map, since a plain `HashMap` cannot hold
/// the duplicate keys the wire format permits before renaming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedMap(Vec<(String, Value)>);

impl OrderedMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Inserts `value` under `key`, renaming to `key##N` (smallest unused N,
    /// starting at 0) when `key` is already present.
    pub fn insert_dedup(&mut self, key: String, value: Value) {
        if !self.contains_key(&key) {
            self.0.push((key, value));
            return;
        }
        let mut n = 0u32;
        loop {
            let candidate = format!("{key}##{n}");
            if !self.contains_key(&candidate) {
                self.0.push((candidate, value));
                return;
            }
            n += 1;
        }
    }

    /// Inserts without dedup, for callers building a section they know has
    /// no duplicate keys (e.g. typed-request builders).
    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        self.0.push((key.into(), value));
    }
}

impl FromIterator<(String, Value)> for OrderedMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut m = OrderedMap::new();
        for (k, v) in iter {
            m.push(k, v);
        }
        m
    }
}

// ---- string length helpers ----

fn write_string1(buf: &mut BytesMut, s: &str) -> Result<(), ViciError> {
    let bytes = s.as_bytes();
    if bytes.len() > u8::MAX as usize {
        return Err(ViciError::EncodingTooLong(s.len()));
    }
    buf.put_u8(bytes.len() as u8);
    buf.put_slice(bytes);
    Ok(())
}

fn write_string2(buf: &mut BytesMut, s: &str) -> Result<(), ViciError> {
    let bytes = s.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(ViciError::EncodingTooLong(s.len()));
    }
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
    Ok(())
}

fn read_string1(buf: &mut Bytes) -> Result<String, ViciError> {
    if buf.is_empty() {
        return Err(ViciError::Truncated);
    }
    let len = buf.get_u8() as usize;
    if buf.len() < len {
        return Err(ViciError::Truncated);
    }
    let s = buf.split_to(len);
    String::from_utf8(s.to_vec()).map_err(|e| ViciError::MalformedFrame(e.to_string()))
}

fn read_string2(buf: &mut Bytes) -> Result<String, ViciError> {
    if buf.len() < 2 {
        return Err(ViciError::Truncated);
    }
    let len = buf.get_u16() as usize;
    if buf.len() < len {
        return Err(ViciError::Truncated);
    }
    let s = buf.split_to(len);
    String::from_utf8(s.to_vec()).map_err(|e| ViciError::MalformedFrame(e.to_string()))
}

// ---- element-stream encode ----

fn write_value(buf: &mut BytesMut, key: Option<&str>, value: &Value) -> Result<(), ViciError> {
    match value {
        Value::Str(s) => {
            buf.put_u8(ELEM_KEY_VALUE);
            write_string1(buf, key.unwrap_or_default())?;
            write_string2(buf, s)?;
        },
        Value::List(items) => {
            buf.put_u8(ELEM_LIST_START);
            write_string1(buf, key.unwrap_or_default())?;
            for item in items {
                buf.put_u8(ELEM_LIST_ITEM);
                write_string2(buf, item)?;
            }
            buf.put_u8(ELEM_LIST_END);
        },
        Value::Section(map) => {
            buf.put_u8(ELEM_SECTION_START);
            write_string1(buf, key.unwrap_or_default())?;
            for (k, v) in map.iter() {
                write_value(buf, Some(k), v)?;
            }
            buf.put_u8(ELEM_SECTION_END);
        },
    }
    Ok(())
}

fn encode_section(section: &OrderedMap) -> Result<BytesMut, ViciError> {
    let mut buf = BytesMut::new();
    for (k, v) in section.iter() {
        write_value(&mut buf, Some(k), v)?;
    }
    Ok(buf)
}

// ---- element-stream decode ----

/// Decodes a top-level section body (no enclosing SECTION_START/END pair),
/// consuming elements until `buf` is exhausted.
fn decode_root_section(buf: &mut Bytes) -> Result<OrderedMap, ViciError> {
    let mut map = OrderedMap::new();
    while !buf.is_empty() {
        let elem = buf.get_u8();
        match elem {
            ELEM_KEY_VALUE => {
                let key = read_string1(buf)?;
                let val = read_string2(buf)?;
                map.insert_dedup(key, Value::Str(val));
            },
            ELEM_LIST_START => {
                let key = read_string1(buf)?;
                let list = decode_list(buf)?;
                map.insert_dedup(key, Value::List(list));
            },
            ELEM_SECTION_START => {
                let key = read_string1(buf)?;
                let nested = decode_section(buf)?;
                map.insert_dedup(key, Value::Section(nested));
            },
            other => return Err(ViciError::MalformedFrame(format!("unexpected element {other}"))),
        }
    }
    Ok(map)
}

/// Decodes a nested section body up to its terminating SECTION_END.
fn decode_section(buf: &mut Bytes) -> Result<OrderedMap, ViciError> {
    let mut map = OrderedMap::new();
    loop {
        if buf.is_empty() {
            return Err(ViciError::Truncated);
        }
        let elem = buf.get_u8();
        match elem {
            ELEM_SECTION_END => return Ok(map),
            ELEM_KEY_VALUE => {
                let key = read_string1(buf)?;
                let val = read_string2(buf)?;
                map.insert_dedup(key, Value::Str(val));
            },
            ELEM_LIST_START => {
                let key = read_string1(buf)?;
                let list = decode_list(buf)?;
                map.insert_dedup(key, Value::List(list));
            },
            ELEM_SECTION_START => {
                let key = read_string1(buf)?;
                let nested = decode_section(buf)?;
                map.insert_dedup(key, Value::Section(nested));
            },
            other => return Err(ViciError::MalformedFrame(format!("unexpected element {other}"))),
        }
    }
}

fn decode_list(buf: &mut Bytes) -> Result<Vec<String>, ViciError> {
    let mut items = Vec::new();
    loop {
        if buf.is_empty() {
            return Err(ViciError::Truncated);
        }
        let elem = buf.get_u8();
        match elem {
            ELEM_LIST_END => return Ok(items),
            ELEM_LIST_ITEM => items.push(read_string2(buf)?),
            other => return Err(ViciError::MalformedFrame(format!("unexpected element {other} in list"))),
        }
    }
}

// ---- segment framing ----

pub async fn write_segment<W: AsyncWrite + Unpin>(
    w: &mut W,
    segment: &Segment,
) -> Result<(), ViciError> {
    let mut body_buf = BytesMut::new();
    body_buf.put_u8(segment.kind.to_byte());
    if segment.kind.has_name() {
        write_string1(&mut body_buf, segment.name.as_deref().unwrap_or_default())?;
    }
    if segment.kind.has_body()
        && let Value::Section(map) = &segment.body
    {
        let encoded = encode_section(map)?;
        body_buf.extend_from_slice(&encoded);
    }

    if body_buf.len() > u32::MAX as usize {
        return Err(ViciError::EncodingTooLong(body_buf.len()));
    }

    let mut framed = BytesMut::with_capacity(4 + body_buf.len());
    framed.put_u32(body_buf.len() as u32);
    framed.extend_from_slice(&body_buf);

    w.write_all(&framed).await.map_err(|e| ViciError::Transport(e.to_string()))?;
    w.flush().await.map_err(|e| ViciError::Transport(e.to_string()))?;
    Ok(())
}

pub async fn read_segment<R: AsyncRead + Unpin>(r: &mut R) -> Result<Segment, ViciError> {
    let mut len_buf = [0u8; 4];
    match r.read_exact(&mut len_buf).await {
        Ok(_) => {},
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ViciError::Transport("connection closed".into()));
        },
        Err(e) => return Err(ViciError::Transport(e.to_string())),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(ViciError::Truncated);
    }

    let mut body = vec![0u8; len];
    r.read_exact(&mut body).await.map_err(|e| ViciError::Transport(e.to_string()))?;
    let mut body = Bytes::from(body);

    if body.is_empty() {
        return Err(ViciError::Truncated);
    }
    let kind = SegmentKind::from_byte(body.get_u8())?;

    let name = if kind.has_name() { Some(read_string1(&mut body)?) } else { None };

    let section = if kind.has_body() { decode_root_section(&mut body) } else { Ok(OrderedMap::new()) }?;

    Ok(Segment { kind, name, body: Value::Section(section) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(pairs: Vec<(&str, Value)>) -> Value {
        let mut m = OrderedMap::new();
        for (k, v) in pairs {
            m.push(k, v);
        }
        Value::Section(m)
    }

    #[tokio::test]
    async fn round_trips_plain_request() {
        let body = section(vec![
            ("name", Value::Str("foo".into())),
            ("children", Value::List(vec!["a".into(), "b".into()])),
        ]);
        let seg = Segment::named(SegmentKind::CmdRequest, "version", body);

        let mut buf = Vec::new();
        write_segment(&mut buf, &seg).await.expect("encode");

        let mut cursor = Bytes::from(buf);
        let decoded = read_segment(&mut cursor).await.expect("decode");

        assert_eq!(decoded.kind, SegmentKind::CmdRequest);
        assert_eq!(decoded.name.as_deref(), Some("version"));
        assert_eq!(
            decoded.body.as_section().expect("section").get("name").expect("name").as_str(),
            Some("foo")
        );
        assert_eq!(
            decoded.body.as_section().expect("section").get("children").expect("children").as_list(),
            Some(&["a".to_string(), "b".to_string()][..])
        );
    }

    #[tokio::test]
    async fn round_trips_named_event_segment() {
        let seg = Segment::named(SegmentKind::EventRegister, "ike-updown", Value::Section(OrderedMap::new()));
        let mut buf = Vec::new();
        write_segment(&mut buf, &seg).await.expect("encode");

        let mut cursor = Bytes::from(buf);
        let decoded = read_segment(&mut cursor).await.expect("decode");
        assert_eq!(decoded.kind, SegmentKind::EventRegister);
        assert_eq!(decoded.name.as_deref(), Some("ike-updown"));
    }

    #[tokio::test]
    async fn duplicate_keys_survive_as_suffixed() {
        let mut m = OrderedMap::new();
        m.insert_dedup("child".into(), Value::Str("one".into()));
        m.insert_dedup("child".into(), Value::Str("two".into()));
        m.insert_dedup("child".into(), Value::Str("three".into()));

        assert_eq!(m.get("child").expect("child").as_str(), Some("one"));
        assert_eq!(m.get("child##0").expect("child##0").as_str(), Some("two"));
        assert_eq!(m.get("child##1").expect("child##1").as_str(), Some("three"));
    }

    #[tokio::test]
    async fn truncated_frame_is_rejected() {
        // length prefix claims 10 bytes, body only has 2
        let mut buf = BytesMut::new();
        buf.put_u32(10);
        buf.put_slice(&[0u8, 1]);
        let mut cursor = buf.freeze();
        let err = read_segment(&mut cursor).await.unwrap_err();
        assert!(matches!(err, ViciError::Transport(_)));
    }
}
