/* Test-value synthesis.
 *
 * For every user-defined type this builds one or more concrete values: a
 * fully-populated one per struct (plus a twin omitting every optional field
 * when the struct has any), and one per union variant or enumerated subtype.
 * Leaves get deterministic extremes: declared maxima for numbers, pattern-
 * inverted or filler strings, a fixed post-2038 timestamp. The reference
 * encoder turns these values into oracle JSON; the assertion emitter walks
 * the same tree to check the decoded result leaf by leaf.
 */

use idl_types::{
    DataType, DefaultValue, ResolvedDef, StringAttrs, Struct, StructField, Subtype, TypeDef,
    TypeRegistry, UltimateType, Union, UnionVariant,
};

use crate::errors::{GenError, GenResult};
use crate::names;
use crate::unregex::Unregex;

/// Instant rendered into every synthesized timestamp: 2^33 - 1 seconds after
/// the epoch, comfortably past 2038 to catch 32-bit time handling.
const TEST_INSTANT: i64 = 8_589_934_591;

const TEST_BYTES: &[u8] = &[0, 1, 2, 3, 4, 5];

/// One synthesized value, shaped like the Rust value the generated codec
/// decodes to. `Absent` stands for a nullable field left unset.
pub enum TestValue<'a> {
    Absent,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Already rendered through the type's format string.
    Timestamp(String),
    Bytes(&'static [u8]),
    /// Single-element list.
    List(Box<TestValue<'a>>),
    /// Single-entry map.
    Map {
        key: String,
        value: Box<TestValue<'a>>,
    },
    Struct(StructValue<'a>),
    Union(Box<UnionValue<'a>>),
}

/// A value plus how it sits in its container.
pub struct TestField<'a> {
    /// Wire name; `None` for union payloads and container elements.
    pub name: Option<&'a str>,
    /// The Rust-side field is an `Option`.
    pub nullable: bool,
    /// Whether the reference encoder writes the field at all. False for
    /// fields omitted by the required-fields-only twin.
    pub on_wire: bool,
    pub default: Option<&'a DefaultValue>,
    pub value: TestValue<'a>,
}

pub struct StructValue<'a> {
    pub fields: Vec<TestField<'a>>,
}

/// How a union variant's payload sits on the wire.
pub enum PayloadShape {
    /// Tag only.
    Void,
    /// Struct payload, fields hoisted into the tagged object.
    Hoisted,
    /// Payload nested under a key named after the tag.
    Keyed,
}

/// One selected variant of a union or polymorphic struct.
pub struct UnionValue<'a> {
    pub def_ns: &'a str,
    /// IR name of the union (or polymorphic parent struct) definition.
    pub name: &'a str,
    /// IR tag of the selected variant.
    pub tag: &'a str,
    pub catch_all: bool,
    /// Whether an exhaustive match on this value needs a wildcard arm.
    pub has_other_variants: bool,
    pub shape: PayloadShape,
    /// `None` only for void payloads.
    pub payload: Option<Box<TestField<'a>>>,
}

/// A top-level value to emit one test function for.
pub struct TestCase<'a> {
    /// Appended to the test function name ("_OnlyRequiredFields", variant
    /// names).
    pub suffix: String,
    pub value: TestValue<'a>,
    /// Catch-all union values cannot be re-encoded; their tests assert the
    /// serializer fails instead of round-tripping.
    pub serializable: bool,
}

pub struct ValueBuilder<'a> {
    registry: &'a TypeRegistry<'a>,
}

impl<'a> ValueBuilder<'a> {
    pub fn new(registry: &'a TypeRegistry<'a>) -> Self {
        Self { registry }
    }

    /// All test cases for one type definition.
    pub fn type_cases(&self, ns: &'a str, def: &'a TypeDef) -> GenResult<Vec<TestCase<'a>>> {
        match def {
            TypeDef::Struct(s) if s.has_enumerated_subtypes() => self.polymorphic_cases(ns, s),
            TypeDef::Struct(s) => self.struct_cases(ns, s),
            TypeDef::Union(u) => self.union_cases(ns, u),
        }
    }

    /// The single fully-populated case for a route argument type.
    pub fn data_type_case(&self, ns: &'a str, data_type: &'a DataType) -> GenResult<TestCase<'a>> {
        Ok(TestCase {
            suffix: String::new(),
            value: self.make_value(ns, data_type, false)?,
            serializable: true,
        })
    }

    fn struct_cases(&self, ns: &'a str, s: &'a Struct) -> GenResult<Vec<TestCase<'a>>> {
        let mut cases = vec![TestCase {
            suffix: String::new(),
            value: TestValue::Struct(self.struct_value(ns, s, false)?),
            serializable: true,
        }];
        if s.has_optional_fields() {
            cases.push(TestCase {
                suffix: "_OnlyRequiredFields".to_string(),
                value: TestValue::Struct(self.struct_value(ns, s, true)?),
                serializable: true,
            });
        }
        Ok(cases)
    }

    fn union_cases(&self, ns: &'a str, u: &'a Union) -> GenResult<Vec<TestCase<'a>>> {
        u.variants
            .iter()
            .map(|variant| {
                Ok(TestCase {
                    suffix: format!("_{}", names::variant_name(&variant.name)),
                    value: TestValue::Union(Box::new(self.union_value(ns, u, variant, false)?)),
                    serializable: !variant.catch_all,
                })
            })
            .collect()
    }

    fn polymorphic_cases(&self, ns: &'a str, s: &'a Struct) -> GenResult<Vec<TestCase<'a>>> {
        let mut cases = Vec::new();
        for subtype in &s.subtypes {
            let variant = names::variant_name(&subtype.tag);
            cases.push(TestCase {
                suffix: format!("_{}", variant),
                value: TestValue::Union(Box::new(self.subtype_value(ns, s, subtype, false)?)),
                serializable: true,
            });
            let (_, sub) = self.subtype_struct(ns, subtype)?;
            if sub.has_optional_fields() {
                cases.push(TestCase {
                    suffix: format!("_{}_OnlyRequiredFields", variant),
                    value: TestValue::Union(Box::new(self.subtype_value(ns, s, subtype, true)?)),
                    serializable: true,
                });
            }
        }
        Ok(cases)
    }

    fn struct_value(
        &self,
        ns: &'a str,
        s: &'a Struct,
        no_optional: bool,
    ) -> GenResult<StructValue<'a>> {
        let mut fields = Vec::with_capacity(s.fields.len());
        for field in &s.fields {
            fields.push(self.field_value(ns, field, no_optional)?);
        }
        Ok(StructValue { fields })
    }

    fn field_value(
        &self,
        ns: &'a str,
        field: &'a StructField,
        no_optional: bool,
    ) -> GenResult<TestField<'a>> {
        let (dt_ns, dt) = self
            .registry
            .unwrap_aliases(ns, &field.data_type)
            .ok_or_else(|| unresolved(ns, &field.data_type))?;
        let (inner, nullable) = dt.unwrap_nullable();

        if no_optional && field.is_optional() {
            // Left off the wire; decoding must produce None for nullable
            // fields and the declared default otherwise.
            let value = if nullable {
                TestValue::Absent
            } else if let Some(default) = &field.default {
                self.default_value(dt_ns, default)?
            } else {
                TestValue::Absent
            };
            return Ok(TestField {
                name: Some(&field.name),
                nullable,
                on_wire: false,
                default: field.default.as_ref(),
                value,
            });
        }

        Ok(TestField {
            name: Some(&field.name),
            nullable,
            on_wire: true,
            default: field.default.as_ref(),
            value: self.make_value(dt_ns, inner, no_optional)?,
        })
    }

    fn default_value(&self, ns: &'a str, default: &'a DefaultValue) -> GenResult<TestValue<'a>> {
        Ok(match default {
            DefaultValue::Bool(b) => TestValue::Bool(*b),
            DefaultValue::Int(i) => TestValue::Int(*i),
            DefaultValue::UInt(u) => TestValue::UInt(*u),
            DefaultValue::Float(f) => TestValue::Float(*f),
            DefaultValue::Str(s) => TestValue::Str(s.clone()),
            DefaultValue::TagRef(tag_ref) => {
                let (u_ns, def) = self.registry.resolve(ns, &tag_ref.union).ok_or_else(|| {
                    GenError::UnresolvedTypeRef {
                        namespace: tag_ref.union.namespace.clone().unwrap_or_else(|| ns.into()),
                        name: tag_ref.union.name.clone(),
                    }
                })?;
                let ResolvedDef::Union(u) = def else {
                    return Err(GenError::UnknownTagRefVariant {
                        union: tag_ref.union.name.clone(),
                        tag: tag_ref.tag.clone(),
                    });
                };
                let variant = u
                    .variants
                    .iter()
                    .find(|v| v.name == tag_ref.tag)
                    .ok_or_else(|| GenError::UnknownTagRefVariant {
                        union: u.name.clone(),
                        tag: tag_ref.tag.clone(),
                    })?;
                TestValue::Union(Box::new(self.union_value(u_ns, u, variant, true)?))
            }
        })
    }

    /// Synthesize a value for a (non-nullable) data type.
    fn make_value(
        &self,
        ns: &'a str,
        data_type: &'a DataType,
        no_optional: bool,
    ) -> GenResult<TestValue<'a>> {
        let (ns, dt) = self
            .registry
            .unwrap_aliases(ns, data_type)
            .ok_or_else(|| unresolved(ns, data_type))?;
        let (dt, _) = dt.unwrap_nullable();
        let (ns, dt) = self
            .registry
            .unwrap_aliases(ns, dt)
            .ok_or_else(|| unresolved(ns, dt))?;
        Ok(match dt {
            DataType::Void => TestValue::Absent,
            DataType::Boolean => TestValue::Bool(true),
            DataType::Int32(a) => {
                TestValue::Int(a.max_value.map_or(i64::from(i32::MAX), |v| v as i64))
            }
            DataType::UInt32(a) => TestValue::UInt(a.max_value.unwrap_or(u64::from(u32::MAX))),
            DataType::Int64(a) => TestValue::Int(a.max_value.map_or(i64::MAX, |v| v as i64)),
            DataType::UInt64(a) => TestValue::UInt(a.max_value.unwrap_or(u64::MAX)),
            DataType::Float32(a) => TestValue::Float(a.max_value.unwrap_or(f64::from(f32::MAX))),
            DataType::Float64(a) => TestValue::Float(a.max_value.unwrap_or(1e307)),
            DataType::Str(a) => TestValue::Str(string_value(a)?),
            DataType::Bytes => TestValue::Bytes(TEST_BYTES),
            DataType::Timestamp(a) => TestValue::Timestamp(timestamp_value(&a.format)?),
            DataType::List(inner) => {
                TestValue::List(Box::new(self.make_value(ns, inner, no_optional)?))
            }
            DataType::Map(map) => {
                let key = match self.make_value(ns, &map.key, no_optional)? {
                    TestValue::Str(s) => s,
                    _ => {
                        return Err(GenError::UnsupportedType {
                            type_name: format!("{:?}", map.key),
                            detail: "map keys must be strings".to_string(),
                        });
                    }
                };
                TestValue::Map {
                    key,
                    value: Box::new(self.make_value(ns, &map.value, no_optional)?),
                }
            }
            DataType::Nullable(_) => unreachable_nullable(dt)?,
            DataType::Ref(r) => {
                let (def_ns, def) = self
                    .registry
                    .resolve(ns, r)
                    .ok_or_else(|| unresolved(ns, dt))?;
                match def {
                    ResolvedDef::Struct(s) if s.has_enumerated_subtypes() => {
                        // One subtype suffices here; every subtype gets its
                        // own top-level case anyway.
                        let subtype = &s.subtypes[0];
                        TestValue::Union(Box::new(
                            self.subtype_value(def_ns, s, subtype, no_optional)?,
                        ))
                    }
                    ResolvedDef::Struct(s) => {
                        TestValue::Struct(self.struct_value(def_ns, s, no_optional)?)
                    }
                    ResolvedDef::Union(u) => {
                        let variant = u.variants.first().ok_or_else(|| {
                            GenError::UnsupportedType {
                                type_name: u.name.clone(),
                                detail: "union with no variants".to_string(),
                            }
                        })?;
                        TestValue::Union(Box::new(
                            self.union_value(def_ns, u, variant, no_optional)?,
                        ))
                    }
                    // unwrap_aliases already followed these
                    ResolvedDef::Alias(a) => {
                        return Err(GenError::UnresolvedTypeRef {
                            namespace: def_ns.to_string(),
                            name: a.name.clone(),
                        });
                    }
                }
            }
        })
    }

    fn union_value(
        &self,
        def_ns: &'a str,
        u: &'a Union,
        variant: &'a UnionVariant,
        no_optional: bool,
    ) -> GenResult<UnionValue<'a>> {
        let (shape, payload) = self.variant_payload(def_ns, variant, no_optional)?;
        Ok(UnionValue {
            def_ns,
            name: &u.name,
            tag: &variant.name,
            catch_all: variant.catch_all,
            has_other_variants: u.variants.len() > 1 || !u.closed,
            shape,
            payload,
        })
    }

    fn variant_payload(
        &self,
        ns: &'a str,
        variant: &'a UnionVariant,
        no_optional: bool,
    ) -> GenResult<(PayloadShape, Option<Box<TestField<'a>>>)> {
        if variant.data_type.is_void() {
            return Ok((PayloadShape::Void, None));
        }
        let (dt_ns, dt) = self
            .registry
            .unwrap_aliases(ns, &variant.data_type)
            .ok_or_else(|| unresolved(ns, &variant.data_type))?;
        let (inner, nullable) = dt.unwrap_nullable();
        let shape = match self.registry.ultimate(dt_ns, inner) {
            Some(UltimateType::Struct(_, s)) if !s.has_enumerated_subtypes() => {
                PayloadShape::Hoisted
            }
            Some(_) => PayloadShape::Keyed,
            None => return Err(unresolved(dt_ns, inner)),
        };
        let value = self.make_value(dt_ns, inner, no_optional)?;
        Ok((
            shape,
            Some(Box::new(TestField {
                name: None,
                nullable,
                on_wire: true,
                default: None,
                value,
            })),
        ))
    }

    fn subtype_value(
        &self,
        parent_ns: &'a str,
        parent: &'a Struct,
        subtype: &'a Subtype,
        no_optional: bool,
    ) -> GenResult<UnionValue<'a>> {
        let (sub_ns, sub) = self.subtype_struct(parent_ns, subtype)?;
        let value = TestValue::Struct(self.struct_value(sub_ns, sub, no_optional)?);
        Ok(UnionValue {
            def_ns: parent_ns,
            name: &parent.name,
            tag: &subtype.tag,
            catch_all: false,
            has_other_variants: parent.subtypes.len() > 1 || parent.catch_all,
            shape: PayloadShape::Hoisted,
            payload: Some(Box::new(TestField {
                name: None,
                nullable: false,
                on_wire: true,
                default: None,
                value,
            })),
        })
    }

    fn subtype_struct(
        &self,
        parent_ns: &'a str,
        subtype: &'a Subtype,
    ) -> GenResult<(&'a str, &'a Struct)> {
        match self.registry.resolve(parent_ns, &subtype.type_ref) {
            Some((sub_ns, ResolvedDef::Struct(s))) => Ok((sub_ns, s)),
            _ => Err(GenError::UnresolvedTypeRef {
                namespace: subtype
                    .type_ref
                    .namespace
                    .clone()
                    .unwrap_or_else(|| parent_ns.to_string()),
                name: subtype.type_ref.name.clone(),
            }),
        }
    }
}

impl TestValue<'_> {
    /// Whether this value equals a declared field default, in which case the
    /// reference encoder elides the field just like the generated serializer.
    pub(super) fn matches_default(&self, default: &DefaultValue) -> bool {
        match (self, default) {
            (TestValue::Bool(v), DefaultValue::Bool(d)) => v == d,
            (TestValue::Int(v), DefaultValue::Int(d)) => v == d,
            (TestValue::Int(v), DefaultValue::UInt(d)) => u64::try_from(*v) == Ok(*d),
            (TestValue::UInt(v), DefaultValue::UInt(d)) => v == d,
            (TestValue::UInt(v), DefaultValue::Int(d)) => i64::try_from(*v) == Ok(*d),
            (TestValue::Float(v), DefaultValue::Float(d)) => v.to_bits() == d.to_bits(),
            (TestValue::Str(v), DefaultValue::Str(d)) => v == d,
            (TestValue::Union(v), DefaultValue::TagRef(t)) => {
                v.tag == t.tag && matches!(v.shape, PayloadShape::Void)
            }
            _ => false,
        }
    }
}

fn string_value(attrs: &StringAttrs) -> GenResult<String> {
    if let Some(pattern) = &attrs.pattern {
        let min = attrs.min_length.map(|n| n as usize);
        return Ok(Unregex::new(pattern, min)?.generate()?);
    }
    match attrs.min_length {
        Some(n) if n > 0 => Ok("a".repeat(n as usize)),
        _ => Ok("something".to_string()),
    }
}

fn timestamp_value(format: &str) -> GenResult<String> {
    use std::fmt::Write as _;
    let instant = chrono::DateTime::<chrono::Utc>::from_timestamp(TEST_INSTANT, 0).ok_or_else(
        || GenError::UnsupportedType {
            type_name: "Timestamp".to_string(),
            detail: "test instant out of range".to_string(),
        },
    )?;
    let mut out = String::new();
    write!(out, "{}", instant.format(format)).map_err(|_| GenError::UnsupportedType {
        type_name: "Timestamp".to_string(),
        detail: format!("invalid format string {:?}", format),
    })?;
    Ok(out)
}

fn unresolved(ns: &str, data_type: &DataType) -> GenError {
    match data_type {
        DataType::Ref(r) => GenError::UnresolvedTypeRef {
            namespace: r.namespace.clone().unwrap_or_else(|| ns.to_string()),
            name: r.name.clone(),
        },
        other => GenError::UnsupportedType {
            type_name: format!("{:?}", other),
            detail: "unresolvable type".to_string(),
        },
    }
}

fn unreachable_nullable(dt: &DataType) -> GenResult<TestValue<'static>> {
    Err(GenError::UnsupportedType {
        type_name: format!("{:?}", dt),
        detail: "doubly-nullable type".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use idl_types::{Api, IntAttrs, Namespace, TagRef, TypeRef};

    fn registry(api: &Api) -> TypeRegistry<'_> {
        TypeRegistry::new(api)
    }

    fn str_field(name: &str) -> StructField {
        StructField {
            name: name.to_string(),
            doc: None,
            data_type: DataType::Str(StringAttrs::default()),
            default: None,
            internal: false,
        }
    }

    fn api_with(types: Vec<TypeDef>) -> Api {
        Api {
            namespaces: vec![Namespace {
                name: "files".to_string(),
                doc: None,
                aliases: vec![],
                types,
                routes: vec![],
            }],
        }
    }

    #[test]
    fn struct_with_optional_fields_gets_a_required_only_twin() {
        let api = api_with(vec![TypeDef::Struct(Struct {
            name: "Entry".to_string(),
            doc: None,
            fields: vec![
                str_field("name"),
                StructField {
                    name: "rev".to_string(),
                    doc: None,
                    data_type: DataType::Nullable(Box::new(DataType::Str(
                        StringAttrs::default(),
                    ))),
                    default: None,
                    internal: false,
                },
            ],
            parent: None,
            subtypes: vec![],
            catch_all: false,
        })]);
        let registry = registry(&api);
        let builder = ValueBuilder::new(&registry);
        let cases = builder.type_cases("files", &api.namespaces[0].types[0]).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].suffix, "");
        assert_eq!(cases[1].suffix, "_OnlyRequiredFields");

        let TestValue::Struct(twin) = &cases[1].value else {
            panic!("expected a struct value");
        };
        assert!(twin.fields[0].on_wire);
        assert!(!twin.fields[1].on_wire);
        assert!(matches!(twin.fields[1].value, TestValue::Absent));
    }

    #[test]
    fn union_gets_one_case_per_variant_and_catch_all_is_not_serializable() {
        let api = api_with(vec![TypeDef::Union(Union {
            name: "WriteMode".to_string(),
            doc: None,
            variants: vec![
                UnionVariant {
                    name: "add".to_string(),
                    doc: None,
                    data_type: DataType::Void,
                    catch_all: false,
                },
                UnionVariant {
                    name: "other".to_string(),
                    doc: None,
                    data_type: DataType::Void,
                    catch_all: true,
                },
            ],
            closed: false,
            parent: None,
        })]);
        let registry = registry(&api);
        let builder = ValueBuilder::new(&registry);
        let cases = builder.type_cases("files", &api.namespaces[0].types[0]).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].suffix, "_Add");
        assert!(cases[0].serializable);
        assert_eq!(cases[1].suffix, "_Other");
        assert!(!cases[1].serializable);
    }

    #[test]
    fn numeric_leaves_use_declared_maxima() {
        let api = api_with(vec![TypeDef::Struct(Struct {
            name: "Quota".to_string(),
            doc: None,
            fields: vec![StructField {
                name: "used".to_string(),
                doc: None,
                data_type: DataType::Int32(IntAttrs {
                    min_value: None,
                    max_value: Some(500),
                }),
                default: None,
                internal: false,
            }],
            parent: None,
            subtypes: vec![],
            catch_all: false,
        })]);
        let registry = registry(&api);
        let builder = ValueBuilder::new(&registry);
        let cases = builder.type_cases("files", &api.namespaces[0].types[0]).unwrap();
        let TestValue::Struct(v) = &cases[0].value else {
            panic!("expected a struct value");
        };
        assert!(matches!(v.fields[0].value, TestValue::Int(500)));
    }

    #[test]
    fn timestamps_render_the_fixed_instant() {
        assert_eq!(
            timestamp_value("%Y-%m-%dT%H:%M:%SZ").unwrap(),
            "2242-03-16T12:56:31Z"
        );
    }

    #[test]
    fn patterned_strings_go_through_unregex() {
        let attrs = StringAttrs {
            min_length: Some(3),
            max_length: None,
            pattern: Some("[a-c]+".to_string()),
        };
        assert_eq!(string_value(&attrs).unwrap(), "aaa");

        let plain = StringAttrs {
            min_length: Some(4),
            max_length: None,
            pattern: None,
        };
        assert_eq!(string_value(&plain).unwrap(), "aaaa");

        assert_eq!(string_value(&StringAttrs::default()).unwrap(), "something");
    }

    #[test]
    fn tag_ref_defaults_become_union_values() {
        let api = api_with(vec![
            TypeDef::Union(Union {
                name: "WriteMode".to_string(),
                doc: None,
                variants: vec![UnionVariant {
                    name: "add".to_string(),
                    doc: None,
                    data_type: DataType::Void,
                    catch_all: false,
                }],
                closed: true,
                parent: None,
            }),
            TypeDef::Struct(Struct {
                name: "CommitInfo".to_string(),
                doc: None,
                fields: vec![StructField {
                    name: "mode".to_string(),
                    doc: None,
                    data_type: DataType::Ref(TypeRef {
                        namespace: None,
                        name: "WriteMode".to_string(),
                    }),
                    default: Some(DefaultValue::TagRef(TagRef {
                        union: TypeRef {
                            namespace: None,
                            name: "WriteMode".to_string(),
                        },
                        tag: "add".to_string(),
                    })),
                    internal: false,
                }],
                parent: None,
                subtypes: vec![],
                catch_all: false,
            }),
        ]);
        let registry = registry(&api);
        let builder = ValueBuilder::new(&registry);
        let cases = builder.type_cases("files", &api.namespaces[0].types[1]).unwrap();
        // Defaulted field counts as optional: full case plus the twin.
        assert_eq!(cases.len(), 2);
        let TestValue::Struct(twin) = &cases[1].value else {
            panic!("expected a struct value");
        };
        assert!(!twin.fields[0].on_wire);
        let TestValue::Union(u) = &twin.fields[0].value else {
            panic!("expected the tag-ref default to resolve to a union value");
        };
        assert_eq!(u.tag, "add");
        assert!(matches!(u.shape, PayloadShape::Void));
    }
}
