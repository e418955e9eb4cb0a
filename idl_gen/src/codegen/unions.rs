/* Union and enumerated-subtype (polymorphic) struct emission.
 *
 * Both are Rust enums over a `.tag` wire discriminator. The wire layout of
 * a union variant's payload depends on its type: struct fields are hoisted
 * into the tagged object, enum payloads nest one level under a key named
 * after the variant, primitives get a single extra key, and nullable
 * payloads may omit everything but the tag.
 */

use std::collections::HashSet;

use idl_types::{ResolvedDef, Struct, Union, UltimateType, UnionVariant};

use super::display::DisplayVariant;
use super::docs::DocHost;
use super::{emit_other_variant, Generator};
use crate::errors::{GenError, GenResult};
use crate::names;
use crate::writer::CodeWriter;

/// Wire layout of one union variant's payload.
enum Payload<'a> {
    Void,
    /// Fields hoisted into the tagged object; `nullable` payloads may be
    /// entirely absent after the tag.
    Struct {
        nullable: bool,
        struct_ns: &'a str,
        struct_: &'a Struct,
    },
    /// Nested object under a key named after the variant (union or
    /// polymorphic struct payload).
    Enum,
    /// One extra key named after the variant.
    Primitive { nullable: bool },
}

impl<'a> Generator<'a> {
    pub(super) fn emit_union(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        union: &'a Union,
    ) -> GenResult<()> {
        let enum_name = names::enum_name(&union.name);
        let host = DocHost::Union(union);
        self.emit_doc(w, union.doc.as_deref(), "///", ns, host);

        let mut derives: Vec<&str> = vec!["Debug", "Clone", "PartialEq"];
        let mut visited = HashSet::new();
        if union
            .variants
            .iter()
            .all(|v| self.can_derive_eq(ns, &v.data_type, &mut visited))
        {
            derives.push("Eq");
        }
        w.emit(&format!("#[derive({})]", derives.join(", ")));
        if !union.closed {
            w.emit("#[non_exhaustive] // variants may be added in the future");
        }
        let mut body_err = Ok(());
        w.block(&format!("pub enum {}", enum_name), |w| {
            for variant in &union.variants {
                if variant.catch_all {
                    // Handle the 'Other' variant at the end.
                    continue;
                }
                self.emit_doc(w, variant.doc.as_deref(), "///", ns, host);
                let name = names::variant_name(&variant.name);
                if variant.data_type.is_void() {
                    w.emit(&format!("{},", name));
                } else {
                    match self.rust_type(ns, &variant.data_type) {
                        Ok(t) => w.emit(&format!("{}({}),", name, t)),
                        Err(e) => {
                            body_err = Err(e);
                            return;
                        }
                    }
                }
            }
            if !union.closed {
                emit_other_variant(w);
            }
        });
        body_err?;
        w.blank();

        self.impl_serde_for_union(w, ns, union)?;

        if self.is_error_def(ns, &union.name) {
            let variants: Vec<DisplayVariant<'_>> = union
                .variants
                .iter()
                .filter(|v| !v.catch_all)
                .map(DisplayVariant::from_union_variant)
                .collect();
            self.impl_error(w, ns, &enum_name, &variants, union.closed)?;
        }

        if let Some(parent_ref) = &union.parent {
            let Some((parent_ns, ResolvedDef::Union(parent))) = self.registry.resolve(ns, parent_ref)
            else {
                return Err(GenError::UnresolvedTypeRef {
                    namespace: parent_ref.namespace.clone().unwrap_or_else(|| ns.to_string()),
                    name: parent_ref.name.clone(),
                });
            };
            self.impl_from_for_union(w, ns, union, parent_ns, parent);
            w.blank();
        }
        Ok(())
    }

    pub(super) fn emit_polymorphic_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
    ) -> GenResult<()> {
        let enum_name = names::enum_name(&struct_.name);
        let host = DocHost::Struct(struct_);
        self.emit_doc(w, struct_.doc.as_deref(), "///", ns, host);

        let mut derives: Vec<&str> = vec!["Debug", "Clone", "PartialEq"];
        let mut visited = HashSet::new();
        let eq = struct_
            .subtypes
            .iter()
            .all(|st| match self.registry.resolve(ns, &st.type_ref) {
                Some((st_ns, ResolvedDef::Struct(sub))) => sub
                    .fields
                    .iter()
                    .all(|f| self.can_derive_eq(st_ns, &f.data_type, &mut visited)),
                _ => true,
            });
        if eq {
            derives.push("Eq");
        }
        w.emit(&format!("#[derive({})]", derives.join(", ")));
        if struct_.catch_all {
            w.emit("#[non_exhaustive] // variants may be added in the future");
        }
        let mut body_err = Ok(());
        w.block(&format!("pub enum {}", enum_name), |w| {
            for subtype in &struct_.subtypes {
                self.emit_doc(w, subtype.doc.as_deref(), "///", ns, host);
                let typ = match self.subtype_struct_type(ns, struct_, subtype) {
                    Ok(t) => t,
                    Err(e) => {
                        body_err = Err(e);
                        return;
                    }
                };
                w.emit(&format!("{}({}),", names::variant_name(&subtype.tag), typ));
            }
            if struct_.catch_all {
                emit_other_variant(w);
            }
        });
        body_err?;
        w.blank();

        self.impl_serde_for_polymorphic_struct(w, ns, struct_)?;

        if self.is_error_def(ns, &struct_.name) {
            let variants: Vec<DisplayVariant<'_>> = struct_
                .subtypes
                .iter()
                .map(DisplayVariant::from_subtype)
                .collect();
            self.impl_error(w, ns, &enum_name, &variants, !struct_.catch_all)?;
        }
        Ok(())
    }

    fn classify_payload(
        &self,
        ns: &'a str,
        union: &'a Union,
        variant: &'a UnionVariant,
    ) -> GenResult<Payload<'a>> {
        if variant.data_type.is_void() {
            return Ok(Payload::Void);
        }
        // Validates any type references along the way.
        self.rust_type(ns, &variant.data_type)?;
        let nullable = self
            .registry
            .unwrap_aliases(ns, &variant.data_type)
            .map(|(_, dt)| dt.is_nullable())
            .unwrap_or(false);
        match self.registry.ultimate(ns, &variant.data_type) {
            Some(UltimateType::Struct(struct_ns, s)) if !s.has_enumerated_subtypes() => {
                if nullable && !s.has_required_fields() {
                    return Err(GenError::AmbiguousOptionalVariant {
                        union: union.name.clone(),
                        variant: variant.name.clone(),
                    });
                }
                Ok(Payload::Struct {
                    nullable,
                    struct_ns,
                    struct_: s,
                })
            }
            Some(UltimateType::Struct(_, _)) | Some(UltimateType::Union(_, _)) => Ok(Payload::Enum),
            _ => Ok(Payload::Primitive { nullable }),
        }
    }

    fn impl_serde_for_union(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        union: &'a Union,
    ) -> GenResult<()> {
        let type_name = names::enum_name(&union.name);

        // Classify everything up front so IR-shape errors abort the run
        // before any of this type's impls are emitted.
        let mut payloads = Vec::new();
        for variant in &union.variants {
            payloads.push(self.classify_payload(ns, union, variant)?);
        }

        self.impl_deserialize(w, &type_name, |w| {
            w.emit("// union deserializer");
            w.emit("use serde::de::{self, MapAccess, Visitor};");
            w.emit("struct EnumVisitor;");
            w.block("impl<'de> Visitor<'de> for EnumVisitor", |w| {
                w.emit(&format!("type Value = {};", type_name));
                w.emit_fn(
                    "",
                    "expecting",
                    &["&self", "f: &mut ::std::fmt::Formatter<'_>"],
                    Some("::std::fmt::Result"),
                    |w| {
                        w.emit(&format!("f.write_str(\"a {} structure\")", union.name));
                    },
                );
                w.emit_fn(
                    "",
                    "visit_map<V: MapAccess<'de>>",
                    &["self", "mut map: V"],
                    Some("Result<Self::Value, V::Error>"),
                    |w| {
                        w.block_with("let tag: &str = match map.next_key()?", ("{", "};"), |w| {
                            w.emit("Some(\".tag\") => map.next_value()?,");
                            w.emit("_ => return Err(de::Error::missing_field(\".tag\"))");
                        });
                        if union.is_catch_all_only() {
                            w.emit("// open enum with no defined variants");
                            w.emit("let _ = tag;");
                            w.emit(&format!("{}(&mut map)?;", self.eat_fields_path()));
                            w.emit(&format!("Ok({}::Other)", type_name));
                            return;
                        }
                        w.block_with("let value = match tag", ("{", "};"), |w| {
                            for (variant, payload) in union.variants.iter().zip(&payloads) {
                                if variant.catch_all {
                                    // Handle the 'Other' variant at the end.
                                    continue;
                                }
                                let variant_name = names::variant_name(&variant.name);
                                match payload {
                                    Payload::Void => w.emit(&format!(
                                        "\"{}\" => {}::{},",
                                        variant.name, type_name, variant_name
                                    )),
                                    Payload::Struct {
                                        nullable: true,
                                        struct_ns,
                                        struct_,
                                    } => {
                                        let styp = self.def_type_name(
                                            ns,
                                            struct_ns,
                                            ResolvedDef::Struct(struct_),
                                        );
                                        w.emit(&format!(
                                            "\"{}\" => {}::{}({}::internal_deserialize_opt(&mut map, true)?),",
                                            variant.name, type_name, variant_name, styp
                                        ));
                                    }
                                    Payload::Struct {
                                        nullable: false,
                                        struct_ns,
                                        struct_,
                                    } => {
                                        let styp = self.def_type_name(
                                            ns,
                                            struct_ns,
                                            ResolvedDef::Struct(struct_),
                                        );
                                        w.emit(&format!(
                                            "\"{}\" => {}::{}({}::internal_deserialize(&mut map)?),",
                                            variant.name, type_name, variant_name, styp
                                        ));
                                    }
                                    Payload::Enum | Payload::Primitive { .. } => {
                                        let nullable = matches!(
                                            payload,
                                            Payload::Primitive { nullable: true }
                                        );
                                        w.block(&format!("\"{}\" =>", variant.name), |w| {
                                            w.block("match map.next_key()?", |w| {
                                                w.emit(&format!(
                                                    "Some(\"{}\") => {}::{}(map.next_value()?),",
                                                    variant.name, type_name, variant_name
                                                ));
                                                if nullable {
                                                    // a null payload may be omitted entirely
                                                    w.emit(&format!(
                                                        "None => {}::{}(None),",
                                                        type_name, variant_name
                                                    ));
                                                } else {
                                                    w.emit(&format!(
                                                        "None => return Err(de::Error::missing_field(\"{}\")),",
                                                        variant.name
                                                    ));
                                                }
                                                w.emit(
                                                    "_ => return Err(de::Error::unknown_field(tag, VARIANTS))",
                                                );
                                            });
                                        });
                                    }
                                }
                            }
                            if !union.closed {
                                w.emit(&format!("_ => {}::Other,", type_name));
                            } else {
                                w.emit("_ => return Err(de::Error::unknown_variant(tag, VARIANTS))");
                            }
                        });
                        w.emit(&format!("{}(&mut map)?;", self.eat_fields_path()));
                        w.emit("Ok(value)");
                    },
                );
            });
            w.emit_list(
                "const VARIANTS: &[&str] = &",
                union.variants.iter().map(|v| format!("\"{}\"", v.name)),
                ("[", "]"),
                ";",
            );
            w.emit(&format!(
                "deserializer.deserialize_struct(\"{}\", VARIANTS, EnumVisitor)",
                union.name
            ));
        });
        w.blank();

        self.impl_serialize(w, &type_name, |w| {
            w.emit("// union serializer");
            if union.is_catch_all_only() {
                // special case: an open union with no variants defined.
                w.emit("#![allow(unused_variables)]");
                w.emit(
                    "Err(::serde::ser::Error::custom(\"cannot serialize an open union with no \
                     defined variants\"))",
                );
                return;
            }
            w.emit("use serde::ser::SerializeStruct;");
            w.block("match *self", |w| {
                for (variant, payload) in union.variants.iter().zip(&payloads) {
                    if variant.catch_all {
                        continue;
                    }
                    let variant_name = names::variant_name(&variant.name);
                    match payload {
                        Payload::Void => {
                            w.block(&format!("{}::{} =>", type_name, variant_name), |w| {
                                w.emit("// unit");
                                w.emit(&format!(
                                    "let mut s = serializer.serialize_struct(\"{}\", 1)?;",
                                    union.name
                                ));
                                w.emit(&format!(
                                    "s.serialize_field(\".tag\", \"{}\")?;",
                                    variant.name
                                ));
                                w.emit("s.end()");
                            });
                        }
                        Payload::Enum => {
                            w.block(
                                &format!("{}::{}(ref x) =>", type_name, variant_name),
                                |w| {
                                    w.emit("// union or polymorphic struct");
                                    w.emit(&format!(
                                        "let mut s = serializer.serialize_struct(\"{}\", 2)?;",
                                        union.name
                                    ));
                                    w.emit(&format!(
                                        "s.serialize_field(\".tag\", \"{}\")?;",
                                        variant.name
                                    ));
                                    w.emit(&format!(
                                        "s.serialize_field(\"{}\", x)?;",
                                        variant.name
                                    ));
                                    w.emit("s.end()");
                                },
                            );
                        }
                        Payload::Struct { nullable: true, struct_: s, .. } => {
                            let num_fields = s.fields.len() + 1;
                            w.block(
                                &format!("{}::{}(ref x) =>", type_name, variant_name),
                                |w| {
                                    w.emit("// nullable struct");
                                    w.emit(&format!(
                                        "let n = if x.is_some() {{ {} }} else {{ 1 }};",
                                        num_fields + 1
                                    ));
                                    w.emit(&format!(
                                        "let mut s = serializer.serialize_struct(\"{}\", n)?;",
                                        union.name
                                    ));
                                    w.emit(&format!(
                                        "s.serialize_field(\".tag\", \"{}\")?;",
                                        variant.name
                                    ));
                                    w.block("if let Some(ref x) = x", |w| {
                                        w.emit("x.internal_serialize::<S>(&mut s)?;");
                                    });
                                    w.emit("s.end()");
                                },
                            );
                        }
                        Payload::Primitive { nullable: true } => {
                            w.block(
                                &format!("{}::{}(ref x) =>", type_name, variant_name),
                                |w| {
                                    w.emit("// nullable primitive");
                                    w.emit("let n = if x.is_some() { 2 } else { 1 };");
                                    w.emit(&format!(
                                        "let mut s = serializer.serialize_struct(\"{}\", n)?;",
                                        union.name
                                    ));
                                    w.emit(&format!(
                                        "s.serialize_field(\".tag\", \"{}\")?;",
                                        variant.name
                                    ));
                                    w.block("if let Some(ref x) = x", |w| {
                                        w.emit(&format!(
                                            "s.serialize_field(\"{}\", &x)?;",
                                            variant.name
                                        ));
                                    });
                                    w.emit("s.end()");
                                },
                            );
                        }
                        Payload::Struct { nullable: false, struct_: s, .. } => {
                            let needs_x = !s.fields.is_empty();
                            let pattern = if needs_x { "(ref x)" } else { "(_)" };
                            w.block(
                                &format!("{}::{}{} =>", type_name, variant_name, pattern),
                                |w| {
                                    w.emit("// struct");
                                    w.emit(&format!(
                                        "let mut s = serializer.serialize_struct(\"{}\", {})?;",
                                        union.name,
                                        s.fields.len() + 1
                                    ));
                                    w.emit(&format!(
                                        "s.serialize_field(\".tag\", \"{}\")?;",
                                        variant.name
                                    ));
                                    if needs_x {
                                        w.emit("x.internal_serialize::<S>(&mut s)?;");
                                    }
                                    w.emit("s.end()");
                                },
                            );
                        }
                        Payload::Primitive { nullable: false } => {
                            w.block(
                                &format!("{}::{}(ref x) =>", type_name, variant_name),
                                |w| {
                                    w.emit("// primitive");
                                    w.emit(&format!(
                                        "let mut s = serializer.serialize_struct(\"{}\", 2)?;",
                                        union.name
                                    ));
                                    w.emit(&format!(
                                        "s.serialize_field(\".tag\", \"{}\")?;",
                                        variant.name
                                    ));
                                    w.emit(&format!(
                                        "s.serialize_field(\"{}\", x)?;",
                                        variant.name
                                    ));
                                    w.emit("s.end()");
                                },
                            );
                        }
                    }
                }
                if !union.closed {
                    w.emit(&format!(
                        "{}::Other => Err(::serde::ser::Error::custom(\"cannot serialize 'Other' \
                         variant\"))",
                        type_name
                    ));
                }
            });
        });
        w.blank();
        Ok(())
    }

    fn impl_serde_for_polymorphic_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
    ) -> GenResult<()> {
        let type_name = names::enum_name(&struct_.name);

        // Resolve each subtype's struct up front.
        let mut subtype_structs = Vec::new();
        for subtype in &struct_.subtypes {
            let Some((st_ns, ResolvedDef::Struct(sub))) =
                self.registry.resolve(ns, &subtype.type_ref)
            else {
                return Err(GenError::UnresolvedTypeRef {
                    namespace: subtype
                        .type_ref
                        .namespace
                        .clone()
                        .unwrap_or_else(|| ns.to_string()),
                    name: subtype.type_ref.name.clone(),
                });
            };
            subtype_structs.push((st_ns, sub));
        }

        self.impl_deserialize(w, &type_name, |w| {
            w.emit("// polymorphic struct deserializer");
            w.emit("use serde::de::{self, MapAccess, Visitor};");
            w.emit("struct EnumVisitor;");
            w.block("impl<'de> Visitor<'de> for EnumVisitor", |w| {
                w.emit(&format!("type Value = {};", type_name));
                w.emit_fn(
                    "",
                    "expecting",
                    &["&self", "f: &mut ::std::fmt::Formatter<'_>"],
                    Some("::std::fmt::Result"),
                    |w| {
                        w.emit(&format!("f.write_str(\"a {} structure\")", struct_.name));
                    },
                );
                w.emit_fn(
                    "",
                    "visit_map<V: MapAccess<'de>>",
                    &["self", "mut map: V"],
                    Some("Result<Self::Value, V::Error>"),
                    |w| {
                        w.block_with("let tag = match map.next_key()?", ("{", "};"), |w| {
                            w.emit("Some(\".tag\") => map.next_value()?,");
                            w.emit("_ => return Err(de::Error::missing_field(\".tag\"))");
                        });
                        w.block("match tag", |w| {
                            for (subtype, (st_ns, sub)) in
                                struct_.subtypes.iter().zip(&subtype_structs)
                            {
                                let variant_name = names::variant_name(&subtype.tag);
                                let styp =
                                    self.def_type_name(ns, st_ns, ResolvedDef::Struct(sub));
                                w.emit(&format!(
                                    "\"{}\" => Ok({}::{}({}::internal_deserialize(map)?)),",
                                    subtype.tag, type_name, variant_name, styp
                                ));
                            }
                            if struct_.catch_all {
                                w.block("_ =>", |w| {
                                    w.emit(&format!("{}(&mut map)?;", self.eat_fields_path()));
                                    w.emit(&format!("Ok({}::Other)", type_name));
                                });
                            } else {
                                w.emit("_ => Err(de::Error::unknown_variant(tag, VARIANTS))");
                            }
                        });
                    },
                );
            });
            w.emit_list(
                "const VARIANTS: &[&str] = &",
                struct_.subtypes.iter().map(|s| format!("\"{}\"", s.tag)),
                ("[", "]"),
                ";",
            );
            w.emit(&format!(
                "deserializer.deserialize_struct(\"{}\", VARIANTS, EnumVisitor)",
                struct_.name
            ));
        });
        w.blank();

        self.impl_serialize(w, &type_name, |w| {
            w.emit("// polymorphic struct serializer");
            w.emit("use serde::ser::SerializeStruct;");
            w.block("match *self", |w| {
                for (subtype, (_, sub)) in struct_.subtypes.iter().zip(&subtype_structs) {
                    let variant_name = names::variant_name(&subtype.tag);
                    w.block(&format!("{}::{}(ref x) =>", type_name, variant_name), |w| {
                        w.emit(&format!(
                            "let mut s = serializer.serialize_struct(\"{}\", {})?;",
                            type_name,
                            sub.fields.len() + 1
                        ));
                        w.emit(&format!("s.serialize_field(\".tag\", \"{}\")?;", subtype.tag));
                        w.emit("x.internal_serialize::<S>(&mut s)?;");
                        w.emit("s.end()");
                    });
                }
                if struct_.catch_all {
                    w.emit(&format!(
                        "{}::Other => Err(::serde::ser::Error::custom(\"cannot serialize unknown \
                         variant\"))",
                        type_name
                    ));
                }
            });
        });
        w.blank();
        Ok(())
    }

    fn subtype_struct_type(
        &self,
        ns: &'a str,
        struct_: &'a Struct,
        subtype: &'a idl_types::Subtype,
    ) -> GenResult<String> {
        match self.registry.resolve(ns, &subtype.type_ref) {
            Some((def_ns, def @ ResolvedDef::Struct(_))) => {
                Ok(self.def_type_name(ns, def_ns, def))
            }
            Some(_) => Err(GenError::UnsupportedType {
                type_name: struct_.name.clone(),
                detail: format!("subtype {} is not a struct", subtype.type_ref.name),
            }),
            None => Err(GenError::UnresolvedTypeRef {
                namespace: subtype
                    .type_ref
                    .namespace
                    .clone()
                    .unwrap_or_else(|| ns.to_string()),
                name: subtype.type_ref.name.clone(),
            }),
        }
    }

    // A union only ever adds variants in its children, so conversion is
    // legal parent-to-child, never the reverse.
    fn impl_from_for_union(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        union: &'a Union,
        parent_ns: &'a str,
        parent: &'a Union,
    ) {
        let subtype = names::enum_name(&union.name);
        let supertype = self.def_type_name(ns, parent_ns, ResolvedDef::Union(parent));
        w.emit(&format!("// union extends {}", supertype));
        w.block(&format!("impl From<{}> for {}", supertype, subtype), |w| {
            w.emit_fn(
                "",
                "from",
                &[&format!("parent: {}", supertype)],
                Some("Self"),
                |w| {
                    w.block("match parent", |w| {
                        for variant in &parent.variants {
                            let name = if variant.catch_all {
                                "Other".to_string()
                            } else {
                                names::variant_name(&variant.name)
                            };
                            let x = if variant.data_type.is_void() || variant.catch_all {
                                ""
                            } else {
                                "(x)"
                            };
                            w.emit(&format!(
                                "{}::{}{} => {}::{}{},",
                                supertype, name, x, subtype, name, x
                            ));
                        }
                    });
                },
            );
        });
    }
}
