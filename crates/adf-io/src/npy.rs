use std::collections::BTreeMap;
use std::ops::Range;

use crate::{IOError, IOSupportedDType, MAX_HEADER_BYTES, MAX_SHAPE_RANK, NPY_MAGIC_PREFIX};

const NPY_HEADER_KEYS: [&str; 3] = ["descr", "fortran_order", "shape"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    pub shape: Vec<usize>,
    pub fortran_order: bool,
    pub descr: IOSupportedDType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyArrayBytes {
    pub version: (u8, u8),
    pub header: NpyHeader,
    pub payload: Vec<u8>,
}

pub(crate) fn element_count(shape: &[usize]) -> Result<usize, IOError> {
    shape
        .iter()
        .copied()
        .try_fold(1usize, |acc, dim| acc.checked_mul(dim))
        .ok_or(IOError::HeaderSchemaInvalid(
            "shape element-count overflowed",
        ))
}

/// Width of the little-endian header length field for a format version.
fn length_field_width(version: (u8, u8)) -> Result<usize, IOError> {
    match version {
        (1, 0) => Ok(2),
        (2, 0) | (3, 0) => Ok(4),
        _ => Err(IOError::MagicInvalid),
    }
}

fn header_start(version: (u8, u8)) -> Result<usize, IOError> {
    Ok(NPY_MAGIC_PREFIX.len() + 2 + length_field_width(version)?)
}

fn render_shape(shape: &[usize]) -> String {
    let dims = shape.iter().map(ToString::to_string).collect::<Vec<_>>();
    match dims.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", dims.join(", ")),
    }
}

/// Header dictionary padded so the payload starts on a 64-byte boundary.
fn encode_header_text(header: &NpyHeader, version: (u8, u8)) -> Result<Vec<u8>, IOError> {
    let mut text = format!(
        "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
        header.descr.descr(),
        if header.fortran_order { "True" } else { "False" },
        render_shape(&header.shape)
    );
    let unpadded = header_start(version)? + text.len() + 1;
    text.extend(std::iter::repeat_n(' ', unpadded.next_multiple_of(64) - unpadded));
    text.push('\n');

    if text.len() > MAX_HEADER_BYTES {
        return Err(IOError::HeaderSchemaInvalid(
            "header bytes must be within bounded budget",
        ));
    }
    Ok(text.into_bytes())
}

fn push_preamble(
    buffer: &mut Vec<u8>,
    version: (u8, u8),
    header_len: usize,
) -> Result<(), IOError> {
    buffer.extend_from_slice(&NPY_MAGIC_PREFIX);
    buffer.extend_from_slice(&[version.0, version.1]);
    if length_field_width(version)? == 2 {
        let len = u16::try_from(header_len).map_err(|_| {
            IOError::HeaderSchemaInvalid("header too long for a version 1.0 file")
        })?;
        buffer.extend_from_slice(&len.to_le_bytes());
    } else {
        let len = u32::try_from(header_len)
            .map_err(|_| IOError::HeaderSchemaInvalid("header length exceeds u32 boundary"))?;
        buffer.extend_from_slice(&len.to_le_bytes());
    }
    Ok(())
}

/// Byte range of the header dictionary.
fn header_span(bytes: &[u8], version: (u8, u8)) -> Result<Range<usize>, IOError> {
    let start = header_start(version)?;
    let field = bytes
        .get(NPY_MAGIC_PREFIX.len() + 2..start)
        .ok_or(IOError::HeaderSchemaInvalid(
            "file ends inside the header length field",
        ))?;
    let len = field
        .iter()
        .rev()
        .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));

    if len == 0 || len > MAX_HEADER_BYTES {
        return Err(IOError::HeaderSchemaInvalid(
            "header bytes must be within bounded budget",
        ));
    }
    if bytes.len() < start + len {
        return Err(IOError::HeaderSchemaInvalid(
            "file ends inside the header dictionary",
        ));
    }
    Ok(start..start + len)
}

/// Split off a leading `'...'` or `"..."` literal: `(inner, rest)`.
fn take_quoted(text: &str) -> Result<(&str, &str), IOError> {
    let quote = text
        .chars()
        .next()
        .filter(|c| matches!(c, '\'' | '"'))
        .ok_or(IOError::HeaderSchemaInvalid(
            "header keys and strings must be quoted",
        ))?;
    let inner = &text[1..];
    let end = inner
        .find(quote)
        .ok_or(IOError::HeaderSchemaInvalid("header quote is not terminated"))?;
    Ok((&inner[..end], &inner[end + 1..]))
}

/// Raw `key -> value` pairs of a Python dict literal with scalar, string and
/// tuple values.
fn split_header_dict(text: &str) -> Result<BTreeMap<&str, &str>, IOError> {
    let body = text
        .trim_end()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or(IOError::HeaderSchemaInvalid(
            "header dictionary must be wrapped in braces",
        ))?;

    let mut fields = BTreeMap::new();
    let mut rest = body.trim_start();
    while !rest.is_empty() {
        let (key, tail) = take_quoted(rest)?;
        let tail = tail
            .trim_start()
            .strip_prefix(':')
            .ok_or(IOError::HeaderSchemaInvalid(
                "header field is missing ':' separator",
            ))?
            .trim_start();

        let value_len = match tail.chars().next() {
            Some('\'' | '"') => take_quoted(tail)?.0.len() + 2,
            Some('(') => {
                tail.find(')').ok_or(IOError::HeaderSchemaInvalid(
                    "shape tuple missing closing ')'",
                ))? + 1
            }
            _ => tail.find(',').unwrap_or(tail.len()),
        };
        let (value, tail) = tail.split_at(value_len);
        if fields.insert(key, value.trim()).is_some() {
            return Err(IOError::HeaderSchemaInvalid(
                "header dictionary contains duplicate keys",
            ));
        }

        let tail = tail.trim_start();
        rest = tail.strip_prefix(',').unwrap_or(tail).trim_start();
    }
    Ok(fields)
}

fn parse_shape(literal: &str) -> Result<Vec<usize>, IOError> {
    let inner = literal
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or(IOError::HeaderSchemaInvalid(
            "shape field must be a tuple",
        ))?;

    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        // Older writers emit Python 2 longs such as `3L`.
        .map(|token| token.strip_suffix('L').unwrap_or(token).parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| IOError::HeaderSchemaInvalid("shape tuple entries must be usize"))?;

    if shape.len() == 1 && !inner.contains(',') {
        return Err(IOError::HeaderSchemaInvalid(
            "singleton shape tuples must include trailing comma",
        ));
    }
    Ok(shape)
}

fn parse_header(header_bytes: &[u8]) -> Result<NpyHeader, IOError> {
    let text = std::str::from_utf8(header_bytes).map_err(|_| {
        IOError::HeaderSchemaInvalid("header bytes must decode as utf-8/ascii dictionary")
    })?;
    let fields = split_header_dict(text)?;
    if fields.len() != NPY_HEADER_KEYS.len()
        || NPY_HEADER_KEYS.iter().any(|key| !fields.contains_key(key))
    {
        return Err(IOError::HeaderSchemaInvalid(
            "header dictionary must contain exactly descr/fortran_order/shape keys",
        ));
    }
    let field = |key: &str| {
        fields
            .get(key)
            .copied()
            .ok_or(IOError::HeaderSchemaInvalid("required header field is missing"))
    };

    let (descr, _) = take_quoted(field("descr")?)?;
    let fortran_order = match field("fortran_order")? {
        "True" => true,
        "False" => false,
        _ => {
            return Err(IOError::HeaderSchemaInvalid(
                "fortran_order field must be True or False",
            ));
        }
    };
    let shape = parse_shape(field("shape")?)?;

    validate_header_schema(&shape, fortran_order, descr, header_bytes.len())
}

pub fn validate_magic_version(payload: &[u8]) -> Result<(u8, u8), IOError> {
    if payload.len() < 8 || payload[..6] != NPY_MAGIC_PREFIX {
        return Err(IOError::MagicInvalid);
    }

    let version = (payload[6], payload[7]);
    if matches!(version, (1, 0) | (2, 0) | (3, 0)) {
        Ok(version)
    } else {
        Err(IOError::MagicInvalid)
    }
}

pub fn validate_header_schema(
    shape: &[usize],
    fortran_order: bool,
    descr: &str,
    header_len: usize,
) -> Result<NpyHeader, IOError> {
    if header_len == 0 || header_len > MAX_HEADER_BYTES {
        return Err(IOError::HeaderSchemaInvalid(
            "header bytes must be within bounded budget",
        ));
    }
    if shape.len() > MAX_SHAPE_RANK {
        return Err(IOError::HeaderSchemaInvalid(
            "shape rank exceeds validation budget",
        ));
    }

    element_count(shape)?;
    let descr = IOSupportedDType::decode(descr)?;

    Ok(NpyHeader {
        shape: shape.to_vec(),
        fortran_order,
        descr,
    })
}

/// Checks the body length against the header and returns the element count.
pub fn validate_read_payload(
    shape: &[usize],
    payload_len_bytes: usize,
    dtype: IOSupportedDType,
) -> Result<usize, IOError> {
    let item_size = dtype.item_size().ok_or(IOError::PicklePolicyViolation)?;
    let expected_count = element_count(shape)
        .map_err(|_| IOError::ReadPayloadIncomplete("failed to compute expected element count"))?;
    let expected_bytes =
        expected_count
            .checked_mul(item_size)
            .ok_or(IOError::ReadPayloadIncomplete(
                "expected payload bytes overflowed",
            ))?;

    if payload_len_bytes != expected_bytes {
        return Err(IOError::ReadPayloadIncomplete(
            "payload bytes must exactly match expected shape/dtype footprint",
        ));
    }

    Ok(expected_count)
}

pub fn write_npy_bytes(header: &NpyHeader, payload: &[u8]) -> Result<Vec<u8>, IOError> {
    write_npy_bytes_with_version(header, payload, (1, 0))
}

pub fn write_npy_bytes_with_version(
    header: &NpyHeader,
    payload: &[u8],
    version: (u8, u8),
) -> Result<Vec<u8>, IOError> {
    let item_size = header
        .descr
        .item_size()
        .ok_or(IOError::PicklePolicyViolation)?;
    let expected_count = element_count(&header.shape)?;
    if Some(payload.len()) != expected_count.checked_mul(item_size) {
        return Err(IOError::WriteContractViolation(
            "payload bytes do not match shape element count",
        ));
    }

    let header_text = encode_header_text(header, version)?;
    let mut encoded =
        Vec::with_capacity(header_start(version)? + header_text.len() + payload.len());
    push_preamble(&mut encoded, version, header_text.len())?;
    encoded.extend_from_slice(&header_text);
    encoded.extend_from_slice(payload);
    Ok(encoded)
}

/// Parse an `.npy` byte stream. Object payloads are always rejected.
pub fn read_npy_bytes(payload: &[u8]) -> Result<NpyArrayBytes, IOError> {
    let version = validate_magic_version(payload)?;
    let span = header_span(payload, version)?;
    let body = &payload[span.end..];
    let header = parse_header(&payload[span])?;

    validate_read_payload(&header.shape, body.len(), header.descr)?;

    Ok(NpyArrayBytes {
        version,
        header,
        payload: body.to_vec(),
    })
}

fn le_bytes<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

/// Widen a little-endian numeric payload to `f64`, element by element.
///
/// Returns `None` for non-numeric dtypes. The caller has already checked the
/// payload length against the header.
#[must_use]
pub fn decode_numeric_payload(dtype: IOSupportedDType, payload: &[u8]) -> Option<Vec<f64>> {
    let values = match dtype {
        IOSupportedDType::I8 => payload
            .iter()
            .map(|&byte| f64::from(i8::from_le_bytes([byte])))
            .collect(),
        IOSupportedDType::U8 => payload.iter().map(|&byte| f64::from(byte)).collect(),
        IOSupportedDType::I16 => payload
            .chunks_exact(2)
            .map(|c| f64::from(i16::from_le_bytes(le_bytes(c))))
            .collect(),
        IOSupportedDType::U16 => payload
            .chunks_exact(2)
            .map(|c| f64::from(u16::from_le_bytes(le_bytes(c))))
            .collect(),
        IOSupportedDType::I32 => payload
            .chunks_exact(4)
            .map(|c| f64::from(i32::from_le_bytes(le_bytes(c))))
            .collect(),
        IOSupportedDType::U32 => payload
            .chunks_exact(4)
            .map(|c| f64::from(u32::from_le_bytes(le_bytes(c))))
            .collect(),
        IOSupportedDType::I64 => payload
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes(le_bytes(c)) as f64)
            .collect(),
        IOSupportedDType::U64 => payload
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(le_bytes(c)) as f64)
            .collect(),
        IOSupportedDType::F32 => payload
            .chunks_exact(4)
            .map(|c| f64::from(f32::from_le_bytes(le_bytes(c))))
            .collect(),
        IOSupportedDType::F64 => payload
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(le_bytes(c)))
            .collect(),
        IOSupportedDType::Bool
        | IOSupportedDType::Object
        | IOSupportedDType::Unicode(_)
        | IOSupportedDType::Bytes(_) => return None,
    };
    Some(values)
}

#[must_use]
pub fn encode_f64_payload(values: &[f64]) -> Vec<u8> {
    values.iter().copied().flat_map(f64::to_le_bytes).collect()
}
