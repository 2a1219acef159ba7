//! Byte encoding for bridged values
//!
//! Scalars and vector structs are packed little-endian. Strings travel as
//! UTF-8 with a trailing NUL. Rotators permute axes at the boundary so the
//! peer sees [roll, pitch, yaw] while the host stores [pitch, yaw, roll].

use scenelink_host::{FieldKind, FieldValue, TrackValue};

use super::TypeTag;
use crate::error::{BridgeError, Result};

/// UTF-8 bytes plus a trailing NUL
pub fn encode_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    out
}

/// Lossy UTF-8, truncated at the first NUL
pub fn decode_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn push_f64s(out: &mut Vec<u8>, values: &[f64]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn read_f64(bytes: &[u8], index: usize) -> f64 {
    let start = index * 8;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[start..start + 8]);
    f64::from_le_bytes(raw)
}

/// 19 doubles, fixed field order
pub fn encode_track(t: &TrackValue) -> Vec<u8> {
    let mut out = Vec::with_capacity(152);
    push_f64s(&mut out, &t.location);
    push_f64s(&mut out, &t.rotation);
    push_f64s(
        &mut out,
        &[t.fov, t.focus, t.center_shift[0], t.center_shift[1], t.zoom],
    );
    push_f64s(
        &mut out,
        &[t.k1, t.k2, t.render_ratio, t.distortion_scale],
    );
    push_f64s(
        &mut out,
        &[
            t.sensor_size[0],
            t.sensor_size[1],
            t.pixel_aspect_ratio,
            t.nodal_offset,
        ],
    );
    out
}

pub fn decode_track(bytes: &[u8]) -> Result<TrackValue> {
    if bytes.len() != 152 {
        return Err(BridgeError::SizeMismatch {
            expected: 152,
            actual: bytes.len(),
        });
    }
    Ok(TrackValue {
        location: [read_f64(bytes, 0), read_f64(bytes, 1), read_f64(bytes, 2)],
        rotation: [read_f64(bytes, 3), read_f64(bytes, 4), read_f64(bytes, 5)],
        fov: read_f64(bytes, 6),
        focus: read_f64(bytes, 7),
        center_shift: [read_f64(bytes, 8), read_f64(bytes, 9)],
        zoom: read_f64(bytes, 10),
        k1: read_f64(bytes, 11),
        k2: read_f64(bytes, 12),
        render_ratio: read_f64(bytes, 13),
        distortion_scale: read_f64(bytes, 14),
        sensor_size: [read_f64(bytes, 15), read_f64(bytes, 16)],
        pixel_aspect_ratio: read_f64(bytes, 17),
        nodal_offset: read_f64(bytes, 18),
    })
}

/// Encode a host value for the wire. Kinds with no wire representation
/// produce the one-byte dummy payload.
pub fn encode_value(value: &FieldValue, kind: &FieldKind) -> Vec<u8> {
    match value {
        FieldValue::F32(v) => v.to_le_bytes().to_vec(),
        FieldValue::F64(v) => v.to_le_bytes().to_vec(),
        FieldValue::I8(v) => v.to_le_bytes().to_vec(),
        FieldValue::I16(v) => v.to_le_bytes().to_vec(),
        FieldValue::I32(v) => v.to_le_bytes().to_vec(),
        FieldValue::I64(v) => v.to_le_bytes().to_vec(),
        FieldValue::U8(v) => vec![*v],
        FieldValue::U16(v) => v.to_le_bytes().to_vec(),
        FieldValue::U32(v) => v.to_le_bytes().to_vec(),
        FieldValue::U64(v) => v.to_le_bytes().to_vec(),
        FieldValue::Bool(v) => vec![*v as u8],
        FieldValue::Str(s) | FieldValue::Name(s) | FieldValue::Text(s) => encode_string(s),
        FieldValue::Enum(v) => {
            let name = match kind {
                FieldKind::Enum(desc) => desc.name_by_value(*v).unwrap_or(""),
                _ => "",
            };
            encode_string(name)
        }
        FieldValue::Vec2(v) => {
            let mut out = Vec::with_capacity(16);
            push_f64s(&mut out, v);
            out
        }
        FieldValue::Vec3(v) => {
            let mut out = Vec::with_capacity(24);
            push_f64s(&mut out, v);
            out
        }
        FieldValue::Vec4(v) => {
            let mut out = Vec::with_capacity(32);
            push_f64s(&mut out, v);
            out
        }
        // host order [pitch, yaw, roll], wire order [roll, pitch, yaw]
        FieldValue::Rotator([pitch, yaw, roll]) => {
            let mut out = Vec::with_capacity(24);
            push_f64s(&mut out, &[*roll, *pitch, *yaw]);
            out
        }
        FieldValue::Track(t) => encode_track(t),
        FieldValue::Struct(_) | FieldValue::ObjectRef(_) | FieldValue::Unsupported => vec![0],
    }
}

/// Decode wire bytes into a host value slot.
///
/// Fixed-size tags are length-checked before any write. Enum names that do
/// not resolve against the field's descriptor leave the slot untouched.
pub fn decode_into(
    tag: TypeTag,
    bytes: &[u8],
    value: &mut FieldValue,
    kind: &FieldKind,
) -> Result<()> {
    if !tag.is_writable() {
        return Err(BridgeError::UnsupportedType(tag.wire_name().to_string()));
    }
    if let Some(expected) = tag.natural_size() {
        if bytes.len() != expected {
            return Err(BridgeError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
    }
    match tag {
        TypeTag::F32 => {
            *value = FieldValue::F32(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        TypeTag::F64 => *value = FieldValue::F64(read_f64(bytes, 0)),
        TypeTag::I8 => *value = FieldValue::I8(bytes[0] as i8),
        TypeTag::I16 => *value = FieldValue::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
        TypeTag::I32 => {
            *value = FieldValue::I32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        TypeTag::I64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            *value = FieldValue::I64(i64::from_le_bytes(raw));
        }
        TypeTag::U8 => *value = FieldValue::U8(bytes[0]),
        TypeTag::U16 => *value = FieldValue::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
        TypeTag::U32 => {
            *value = FieldValue::U32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        TypeTag::U64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            *value = FieldValue::U64(u64::from_le_bytes(raw));
        }
        TypeTag::Bool => *value = FieldValue::Bool(bytes[0] != 0),
        TypeTag::String => {
            let s = decode_string(bytes);
            *value = match value {
                FieldValue::Name(_) => FieldValue::Name(s),
                FieldValue::Text(_) => FieldValue::Text(s),
                _ => FieldValue::Str(s),
            };
        }
        TypeTag::EnumAsString => {
            let member = decode_string(bytes);
            let FieldKind::Enum(desc) = kind else {
                return Err(BridgeError::UnsupportedType("enum".to_string()));
            };
            let Some(v) = desc.value_by_name(&member) else {
                return Err(BridgeError::EnumNameNotFound {
                    enum_name: desc.name.clone(),
                    member,
                });
            };
            *value = FieldValue::Enum(v);
        }
        TypeTag::Vec2 => *value = FieldValue::Vec2([read_f64(bytes, 0), read_f64(bytes, 1)]),
        TypeTag::Vec3 => {
            *value = FieldValue::Vec3([read_f64(bytes, 0), read_f64(bytes, 1), read_f64(bytes, 2)])
        }
        TypeTag::Vec4 => {
            *value = FieldValue::Vec4([
                read_f64(bytes, 0),
                read_f64(bytes, 1),
                read_f64(bytes, 2),
                read_f64(bytes, 3),
            ])
        }
        // wire [x, y, z] lands as host [y, z, x]
        TypeTag::Rotator => {
            let (x, y, z) = (read_f64(bytes, 0), read_f64(bytes, 1), read_f64(bytes, 2));
            *value = FieldValue::Rotator([y, z, x]);
        }
        TypeTag::Track => *value = FieldValue::Track(decode_track(bytes)?),
        TypeTag::TextureHandle
        | TypeTag::AutoStruct
        | TypeTag::ObjectReference
        | TypeTag::Void => unreachable!("filtered by is_writable"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scenelink_host::EnumDescriptor;

    use super::*;

    #[test]
    fn test_string_round_trip_nul_terminated() {
        let bytes = encode_string("Lamp01");
        assert_eq!(bytes.last(), Some(&0));
        assert_eq!(decode_string(&bytes), "Lamp01");
        // bytes past the first NUL are ignored
        assert_eq!(decode_string(b"abc\0junk"), "abc");
        assert_eq!(decode_string(b""), "");
    }

    #[test]
    fn test_rotator_round_trip_is_identity() {
        let host = FieldValue::Rotator([10.0, 20.0, 30.0]);
        let wire = encode_value(&host, &FieldKind::F64);
        assert_eq!(wire.len(), 24);
        // wire carries [roll, pitch, yaw]
        assert_eq!(read_f64(&wire, 0), 30.0);
        assert_eq!(read_f64(&wire, 1), 10.0);
        assert_eq!(read_f64(&wire, 2), 20.0);

        let mut back = FieldValue::Rotator([0.0; 3]);
        decode_into(TypeTag::Rotator, &wire, &mut back, &FieldKind::F64).unwrap();
        match back {
            FieldValue::Rotator(v) => assert_eq!(v, [10.0, 20.0, 30.0]),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_rotator_permutation_is_not_identity() {
        let wire: Vec<u8> = [1.0f64, 2.0, 3.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let mut value = FieldValue::Rotator([0.0; 3]);
        decode_into(TypeTag::Rotator, &wire, &mut value, &FieldKind::F64).unwrap();
        match value {
            FieldValue::Rotator(v) => assert_eq!(v, [2.0, 3.0, 1.0]),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_track_layout() {
        let track = TrackValue {
            location: [1.0, 2.0, 3.0],
            rotation: [4.0, 5.0, 6.0],
            fov: 7.0,
            focus: 8.0,
            center_shift: [9.0, 10.0],
            zoom: 11.0,
            k1: 12.0,
            k2: 13.0,
            render_ratio: 14.0,
            distortion_scale: 15.0,
            sensor_size: [16.0, 17.0],
            pixel_aspect_ratio: 18.0,
            nodal_offset: 19.0,
        };
        let bytes = encode_track(&track);
        assert_eq!(bytes.len(), 152);
        for i in 0..19 {
            assert_eq!(read_f64(&bytes, i), (i + 1) as f64);
        }
        assert_eq!(decode_track(&bytes).unwrap(), track);
        assert!(matches!(
            decode_track(&bytes[..100]),
            Err(BridgeError::SizeMismatch { expected: 152, actual: 100 })
        ));
    }

    #[test]
    fn test_enum_decodes_by_member_name() {
        let kind = FieldKind::Enum(Arc::new(EnumDescriptor::new(
            "RunState",
            vec![("Idle".into(), 0), ("Running".into(), 4)],
        )));
        let mut value = FieldValue::Enum(0);
        decode_into(TypeTag::EnumAsString, &encode_string("Running"), &mut value, &kind).unwrap();
        assert!(matches!(value, FieldValue::Enum(4)));

        let err = decode_into(TypeTag::EnumAsString, &encode_string("Bogus"), &mut value, &kind)
            .unwrap_err();
        assert!(matches!(err, BridgeError::EnumNameNotFound { .. }));
        // slot untouched on failure
        assert!(matches!(value, FieldValue::Enum(4)));
    }

    #[test]
    fn test_signed_boundaries_round_trip() {
        for v in [i64::MIN, -1, 0, i64::MAX] {
            let mut slot = FieldValue::I64(0);
            let bytes = encode_value(&FieldValue::I64(v), &FieldKind::I64);
            decode_into(TypeTag::I64, &bytes, &mut slot, &FieldKind::I64).unwrap();
            assert!(matches!(slot, FieldValue::I64(got) if got == v));
        }
        for v in [u64::MIN, u64::MAX] {
            let mut slot = FieldValue::U64(0);
            let bytes = encode_value(&FieldValue::U64(v), &FieldKind::U64);
            decode_into(TypeTag::U64, &bytes, &mut slot, &FieldKind::U64).unwrap();
            assert!(matches!(slot, FieldValue::U64(got) if got == v));
        }
    }

    #[test]
    fn test_scalar_size_checked() {
        let mut value = FieldValue::F32(0.0);
        let err = decode_into(TypeTag::F32, &[0u8; 3], &mut value, &FieldKind::F32).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::SizeMismatch { expected: 4, actual: 3 }
        ));
        decode_into(TypeTag::F32, &2.5f32.to_le_bytes(), &mut value, &FieldKind::F32).unwrap();
        assert!(matches!(value, FieldValue::F32(v) if v == 2.5));
    }

    #[test]
    fn test_non_writable_tags_rejected() {
        let mut value = FieldValue::Unsupported;
        for tag in [TypeTag::Void, TypeTag::TextureHandle, TypeTag::AutoStruct] {
            assert!(matches!(
                decode_into(tag, &[0], &mut value, &FieldKind::Bool),
                Err(BridgeError::UnsupportedType(_))
            ));
        }
    }
}
