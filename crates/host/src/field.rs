//! Typed field model for host objects
//!
//! Every addressable field on a host object is described by a
//! [`FieldDescriptor`] (name, display metadata, runtime kind, flags) and
//! stores a matching [`FieldValue`]. Nested struct and widget fields are
//! addressed by a path of field names rather than raw container offsets.

use std::sync::Arc;

use bitflags::bitflags;
use uuid::Uuid;

bitflags! {
    /// Per-field flags controlling visibility and write access
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldFlags: u32 {
        /// Field is editable in the host's editor
        const EDIT = 1 << 0;
        /// Field is publicly accessible
        const PUBLIC = 1 << 1;
        /// Field is deprecated and must not be bridged
        const DEPRECATED = 1 << 2;
        /// Editing on instances is disabled for this field
        const DISABLE_EDIT_ON_INSTANCE = 1 << 3;
        /// Field is hidden behind the "advanced" disclosure by default
        const ADVANCED = 1 << 4;
        /// Field does not persist
        const TRANSIENT = 1 << 5;
        /// Function parameter flowing out of the call
        const OUT_PARAM = 1 << 6;
    }
}

/// Named members of a host enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: String,
    /// Ordered (member name, integer value) pairs
    pub members: Vec<(String, i64)>,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>, members: Vec<(String, i64)>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn value_by_name(&self, name: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn name_by_value(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }
}

/// Structural identity of a struct-typed field
///
/// The bridge dispatches on this rather than on the struct's name: well-known
/// math and telemetry structs get dedicated wire encodings, everything else
/// expands field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructIdent {
    Vec2,
    Vec3,
    Vec4,
    Quat,
    Rotator,
    Track,
    Other,
}

#[derive(Debug, Clone)]
pub struct StructDescriptor {
    pub ident: StructIdent,
    pub name: String,
    /// Sub-fields, only populated for `StructIdent::Other`
    pub fields: Vec<FieldDescriptor>,
}

impl StructDescriptor {
    pub fn well_known(ident: StructIdent, name: impl Into<String>) -> Self {
        Self {
            ident,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn composite(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            ident: StructIdent::Other,
            name: name.into(),
            fields,
        }
    }
}

/// Runtime type of a host field
#[derive(Debug, Clone)]
pub enum FieldKind {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    /// Plain string
    Str,
    /// Interned name, converted to/from string at the boundary
    Name,
    /// Localizable text, converted to/from string at the boundary
    Text,
    Enum(Arc<EnumDescriptor>),
    Struct(Arc<StructDescriptor>),
    /// Reference to another host sub-object
    ObjectRef,
    /// Container types are not bridgeable
    Array,
    Map,
}

/// Description of one host field: identity, metadata, kind, flags
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub kind: FieldKind,
    pub flags: FieldFlags,
    pub ui_min: Option<String>,
    pub ui_max: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            category: None,
            kind,
            flags: FieldFlags::EDIT | FieldFlags::PUBLIC,
            ui_min: None,
            ui_max: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_display_name(mut self, display: impl Into<String>) -> Self {
        self.display_name = Some(display.into());
        self
    }

    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Display name with the metadata fallback to the field name
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Category with the metadata fallback
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or("Default")
    }
}

/// Composite telemetry record carried by `StructIdent::Track` fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackValue {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub fov: f64,
    pub focus: f64,
    pub center_shift: [f64; 2],
    pub zoom: f64,
    pub k1: f64,
    pub k2: f64,
    pub render_ratio: f64,
    pub distortion_scale: f64,
    pub sensor_size: [f64; 2],
    pub pixel_aspect_ratio: f64,
    pub nodal_offset: f64,
}

/// A sub-object owned inline by an object-reference field, carrying its own
/// visible fields (the widget case)
#[derive(Debug, Clone)]
pub struct WidgetObject {
    pub name: String,
    pub class_name: String,
    pub fields: Vec<FieldSlot>,
}

/// Target of an object-reference field
#[derive(Debug, Clone)]
pub enum ObjectRefValue {
    /// Unset or unsupported target
    None,
    /// Shareable render target, identified by its texture handle
    RenderTarget(Uuid),
    /// Widget sub-object expanded field by field
    Widget(WidgetObject),
}

/// Current value of a host field, one variant per [`FieldKind`]
#[derive(Debug, Clone)]
pub enum FieldValue {
    F32(f32),
    F64(f64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Str(String),
    Name(String),
    Text(String),
    Enum(i64),
    Vec2([f64; 2]),
    Vec3([f64; 3]),
    Vec4([f64; 4]),
    /// Stored as [pitch, yaw, roll]
    Rotator([f64; 3]),
    Track(TrackValue),
    Struct(Vec<FieldSlot>),
    ObjectRef(ObjectRefValue),
    Unsupported,
}

/// One field on an object: its descriptor plus its current value
#[derive(Debug, Clone)]
pub struct FieldSlot {
    pub desc: FieldDescriptor,
    pub value: FieldValue,
}

impl FieldSlot {
    pub fn new(desc: FieldDescriptor, value: FieldValue) -> Self {
        Self { desc, value }
    }

    /// Slot holding the zero value for the descriptor's kind
    pub fn zeroed(desc: FieldDescriptor) -> Self {
        let value = zeroed_value(&desc.kind);
        Self { desc, value }
    }
}

/// Default value for a field kind, used when allocating parameter blocks
pub fn zeroed_value(kind: &FieldKind) -> FieldValue {
    match kind {
        FieldKind::F32 => FieldValue::F32(0.0),
        FieldKind::F64 => FieldValue::F64(0.0),
        FieldKind::I8 => FieldValue::I8(0),
        FieldKind::I16 => FieldValue::I16(0),
        FieldKind::I32 => FieldValue::I32(0),
        FieldKind::I64 => FieldValue::I64(0),
        FieldKind::U8 => FieldValue::U8(0),
        FieldKind::U16 => FieldValue::U16(0),
        FieldKind::U32 => FieldValue::U32(0),
        FieldKind::U64 => FieldValue::U64(0),
        FieldKind::Bool => FieldValue::Bool(false),
        FieldKind::Str => FieldValue::Str(String::new()),
        FieldKind::Name => FieldValue::Name(String::new()),
        FieldKind::Text => FieldValue::Text(String::new()),
        FieldKind::Enum(desc) => {
            FieldValue::Enum(desc.members.first().map(|(_, v)| *v).unwrap_or(0))
        }
        FieldKind::Struct(desc) => match desc.ident {
            StructIdent::Vec2 => FieldValue::Vec2([0.0; 2]),
            StructIdent::Vec3 => FieldValue::Vec3([0.0; 3]),
            StructIdent::Vec4 | StructIdent::Quat => FieldValue::Vec4([0.0; 4]),
            StructIdent::Rotator => FieldValue::Rotator([0.0; 3]),
            StructIdent::Track => FieldValue::Track(TrackValue::default()),
            StructIdent::Other => FieldValue::Struct(
                desc.fields
                    .iter()
                    .map(|f| FieldSlot::zeroed(f.clone()))
                    .collect(),
            ),
        },
        FieldKind::ObjectRef => FieldValue::ObjectRef(ObjectRefValue::None),
        FieldKind::Array | FieldKind::Map => FieldValue::Unsupported,
    }
}

/// Resolve a field path against a slot list, descending through struct
/// values and inline widget objects.
pub fn lookup<'a>(slots: &'a [FieldSlot], path: &[String]) -> Option<&'a FieldValue> {
    let (head, rest) = path.split_first()?;
    let slot = slots.iter().find(|s| &s.desc.name == head)?;
    if rest.is_empty() {
        return Some(&slot.value);
    }
    match &slot.value {
        FieldValue::Struct(inner) => lookup(inner, rest),
        FieldValue::ObjectRef(ObjectRefValue::Widget(widget)) => lookup(&widget.fields, rest),
        _ => None,
    }
}

/// Mutable variant of [`lookup`]
pub fn lookup_mut<'a>(slots: &'a mut [FieldSlot], path: &[String]) -> Option<&'a mut FieldValue> {
    let (head, rest) = path.split_first()?;
    let slot = slots.iter_mut().find(|s| &s.desc.name == head)?;
    if rest.is_empty() {
        return Some(&mut slot.value);
    }
    match &mut slot.value {
        FieldValue::Struct(inner) => lookup_mut(inner, rest),
        FieldValue::ObjectRef(ObjectRefValue::Widget(widget)) => lookup_mut(&mut widget.fields, rest),
        _ => None,
    }
}

/// Resolve a field path to the slot itself (descriptor + value)
pub fn lookup_slot<'a>(slots: &'a [FieldSlot], path: &[String]) -> Option<&'a FieldSlot> {
    let (head, rest) = path.split_first()?;
    let slot = slots.iter().find(|s| &s.desc.name == head)?;
    if rest.is_empty() {
        return Some(slot);
    }
    match &slot.value {
        FieldValue::Struct(inner) => lookup_slot(inner, rest),
        FieldValue::ObjectRef(ObjectRefValue::Widget(widget)) => lookup_slot(&widget.fields, rest),
        _ => None,
    }
}

/// Parameter block for invoking a host function: default-initialized slots,
/// one per parameter in signature order
#[derive(Debug, Clone, Default)]
pub struct ParamBlock {
    pub slots: Vec<FieldSlot>,
}

impl ParamBlock {
    pub fn zeroed(signature: &[FieldDescriptor]) -> Self {
        Self {
            slots: signature.iter().map(|d| FieldSlot::zeroed(d.clone())).collect(),
        }
    }

    pub fn field(&self, path: &[String]) -> Option<&FieldValue> {
        lookup(&self.slots, path)
    }

    pub fn field_mut(&mut self, path: &[String]) -> Option<&mut FieldValue> {
        lookup_mut(&mut self.slots, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3_kind() -> FieldKind {
        FieldKind::Struct(Arc::new(StructDescriptor::well_known(
            StructIdent::Vec3,
            "Vec3",
        )))
    }

    #[test]
    fn test_enum_descriptor_lookup() {
        let desc = EnumDescriptor::new(
            "RunState",
            vec![("Idle".into(), 0), ("Running".into(), 1)],
        );
        assert_eq!(desc.value_by_name("Running"), Some(1));
        assert_eq!(desc.value_by_name("Bogus"), None);
        assert_eq!(desc.name_by_value(0), Some("Idle"));
        assert_eq!(desc.name_by_value(7), None);
    }

    #[test]
    fn test_descriptor_fallbacks() {
        let desc = FieldDescriptor::new("count", FieldKind::I32);
        assert_eq!(desc.display(), "count");
        assert_eq!(desc.category(), "Default");

        let desc = desc.with_display_name("Count").with_category("Stats");
        assert_eq!(desc.display(), "Count");
        assert_eq!(desc.category(), "Stats");
    }

    #[test]
    fn test_lookup_nested_struct_path() {
        let inner = FieldDescriptor::new("radius", FieldKind::F32);
        let outer_kind = FieldKind::Struct(Arc::new(StructDescriptor::composite(
            "Shape",
            vec![inner.clone()],
        )));
        let slots = vec![FieldSlot::new(
            FieldDescriptor::new("shape", outer_kind),
            FieldValue::Struct(vec![FieldSlot::new(inner, FieldValue::F32(2.5))]),
        )];

        let path = vec!["shape".to_string(), "radius".to_string()];
        match lookup(&slots, &path) {
            Some(FieldValue::F32(v)) => assert_eq!(*v, 2.5),
            other => panic!("unexpected lookup result: {other:?}"),
        }
        assert!(lookup(&slots, &["shape".to_string(), "nope".to_string()]).is_none());
    }

    #[test]
    fn test_param_block_zeroed() {
        let sig = vec![
            FieldDescriptor::new("count", FieldKind::I32),
            FieldDescriptor::new("center", vec3_kind()),
        ];
        let block = ParamBlock::zeroed(&sig);
        assert_eq!(block.slots.len(), 2);
        assert!(matches!(
            block.field(&["count".to_string()]),
            Some(FieldValue::I32(0))
        ));
        assert!(matches!(
            block.field(&["center".to_string()]),
            Some(FieldValue::Vec3(v)) if *v == [0.0; 3]
        ));
    }
}
