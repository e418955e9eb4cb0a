use serde_derive::{Deserialize, Serialize};

/// A complete interface description: every namespace the upstream compiler
/// produced, in declaration order.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Api {
    pub namespaces: Vec<Namespace>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Namespace {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub aliases: Vec<Alias>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum TypeDef {
    Struct(Struct),
    Union(Union),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Struct(s) => &s.name,
            TypeDef::Union(u) => &u.name,
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            TypeDef::Struct(s) => s.doc.as_deref(),
            TypeDef::Union(u) => u.doc.as_deref(),
        }
    }
}

/// A transparent rename of another data type.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Alias {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    pub data_type: DataType,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct IntAttrs {
    #[serde(default)]
    pub min_value: Option<i64>,
    #[serde(default)]
    pub max_value: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct FloatAttrs {
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct StringAttrs {
    #[serde(default)]
    pub min_length: Option<u64>,
    #[serde(default)]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TimestampAttrs {
    /// strftime-style format string the wire representation uses.
    pub format: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct MapAttrs {
    pub key: Box<DataType>,
    pub value: Box<DataType>,
}

/// Reference to a user-defined type (struct, union or alias). An unqualified
/// reference resolves in the namespace it appears in.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TypeRef {
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
}

/// The closed set of IR data types. Every consumer matches exhaustively, so
/// adding a kind here is a compile-time obligation on the naming layer, the
/// codec generator and the test synthesizer alike.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    Void,
    Boolean,
    Int32(IntAttrs),
    UInt32(IntAttrs),
    Int64(IntAttrs),
    UInt64(IntAttrs),
    Float32(FloatAttrs),
    Float64(FloatAttrs),
    Str(StringAttrs),
    Bytes,
    Timestamp(TimestampAttrs),
    List(Box<DataType>),
    Map(MapAttrs),
    Nullable(Box<DataType>),
    Ref(TypeRef),
}

impl DataType {
    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }

    /// The inner type if nullable, the type itself otherwise, plus whether a
    /// nullable wrapper was peeled off.
    pub fn unwrap_nullable(&self) -> (&DataType, bool) {
        match self {
            DataType::Nullable(inner) => (inner, true),
            other => (other, false),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32(_)
                | DataType::UInt32(_)
                | DataType::Int64(_)
                | DataType::UInt64(_)
                | DataType::Float32(_)
                | DataType::Float64(_)
        )
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Void
    }
}

/// Declared default of a struct field. A field may not be both nullable and
/// carry a non-null default; the upstream compiler enforces that.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Reference to a named variant of a union type.
    TagRef(TagRef),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TagRef {
    pub union: TypeRef,
    pub tag: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct StructField {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    pub data_type: DataType,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Field is only visible with the "internal" permission marker. The
    /// struct definition always includes it; only wire encoders consult it.
    #[serde(default)]
    pub internal: bool,
}

impl StructField {
    /// Optional fields are those that can be absent from the wire: nullable
    /// fields and fields with a declared default.
    pub fn is_optional(&self) -> bool {
        self.data_type.is_nullable() || self.default.is_some()
    }
}

/// One enumerated subtype of a polymorphic struct: the wire tag plus the
/// subtype struct it selects.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Subtype {
    pub tag: String,
    #[serde(default)]
    pub doc: Option<String>,
    pub type_ref: TypeRef,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Struct {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    /// All fields, own plus inherited, in wire order. The upstream compiler
    /// flattens the extension chain before this IR is built.
    #[serde(default)]
    pub fields: Vec<StructField>,
    #[serde(default)]
    pub parent: Option<TypeRef>,
    /// Non-empty when this struct behaves as a tagged union over named
    /// subtype structs rather than a plain record.
    #[serde(default)]
    pub subtypes: Vec<Subtype>,
    /// Whether unknown subtype tags are accepted (enumerated subtypes only).
    #[serde(default)]
    pub catch_all: bool,
}

impl Struct {
    pub fn has_enumerated_subtypes(&self) -> bool {
        !self.subtypes.is_empty()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &StructField> {
        self.fields.iter().filter(|f| !f.is_optional())
    }

    pub fn optional_fields(&self) -> impl Iterator<Item = &StructField> {
        self.fields.iter().filter(|f| f.is_optional())
    }

    pub fn has_required_fields(&self) -> bool {
        self.required_fields().next().is_some()
    }

    pub fn has_optional_fields(&self) -> bool {
        self.optional_fields().next().is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct UnionVariant {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    /// `Void` for tag-only variants.
    #[serde(default)]
    pub data_type: DataType,
    /// Marks the variant representing unrecognized tags. At most one per
    /// union, and only on open unions.
    #[serde(default)]
    pub catch_all: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Union {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    /// All variants, own plus inherited from the parent union, in wire order.
    #[serde(default)]
    pub variants: Vec<UnionVariant>,
    /// Closed unions reject unknown tags instead of mapping them to the
    /// catch-all variant.
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub parent: Option<TypeRef>,
}

impl Union {
    /// A fully-open enumeration: the catch-all is the only variant, so the
    /// union can never be serialized.
    pub fn is_catch_all_only(&self) -> bool {
        self.variants.len() == 1 && self.variants[0].catch_all
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Route {
    pub name: String,
    #[serde(default = "default_route_version")]
    pub version: u32,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub deprecated: Option<Deprecation>,
    #[serde(default)]
    pub arg: DataType,
    #[serde(default)]
    pub result: DataType,
    #[serde(default)]
    pub error: DataType,
    #[serde(default)]
    pub attrs: RouteAttrs,
}

impl Route {
    /// The name component of the HTTP path: the raw route name, with a
    /// version suffix for revised routes.
    pub fn wire_name(&self) -> String {
        if self.version > 1 {
            format!("{}_v{}", self.name, self.version)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Deprecation {
    /// The successor route, if any.
    #[serde(default)]
    pub by: Option<RouteRef>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct RouteRef {
    pub name: String,
    #[serde(default = "default_route_version")]
    pub version: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct RouteAttrs {
    #[serde(default)]
    pub host: Host,
    #[serde(default)]
    pub style: Style,
    /// Comma-separated auth kinds; "user", "team", "app", "noauth", or the
    /// combination "app,user".
    #[serde(default = "default_auth")]
    pub auth: String,
    #[serde(default)]
    pub is_preview: bool,
}

impl Default for RouteAttrs {
    fn default() -> Self {
        Self {
            host: Host::default(),
            style: Style::default(),
            auth: default_auth(),
            is_preview: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Host {
    #[default]
    Api,
    Content,
    Notify,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Rpc,
    Upload,
    Download,
}

fn default_route_version() -> u32 {
    1
}

fn default_auth() -> String {
    "user".to_string()
}
