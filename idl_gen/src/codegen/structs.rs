/* Plain-struct emission: record definition, constructors, manual serde
 * impls with the wire format's duplicate/unknown/missing-field rules, and
 * the struct-extension From adapter.
 */

use std::collections::HashSet;

use idl_types::{DataType, DefaultValue, ResolvedDef, Struct, StructField};

use super::docs::DocHost;
use super::{is_primitive, Generator};
use crate::errors::{GenError, GenResult};
use crate::names;
use crate::writer::CodeWriter;

const DERIVE_TRAITS: &[&str] = &["Debug", "Clone", "PartialEq"];

impl<'a> Generator<'a> {
    pub(super) fn emit_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
    ) -> GenResult<()> {
        let struct_name = names::struct_name(&struct_.name);
        let host = DocHost::Struct(struct_);
        self.emit_doc(w, struct_.doc.as_deref(), "///", ns, host);

        let mut derives: Vec<&str> = DERIVE_TRAITS.to_vec();
        let mut visited = HashSet::new();
        if struct_
            .fields
            .iter()
            .all(|f| self.can_derive_eq(ns, &f.data_type, &mut visited))
        {
            derives.push("Eq");
        }
        let derive_default = !struct_.fields.iter().any(needs_explicit_default);
        if derive_default {
            derives.push("Default");
        }
        w.emit(&format!("#[derive({})]", derives.join(", ")));
        w.emit("#[non_exhaustive] // structs may have more fields added in the future.");
        let mut body_err = Ok(());
        w.block(&format!("pub struct {}", struct_name), |w| {
            for field in &struct_.fields {
                let typ = match self.rust_type(ns, &field.data_type) {
                    Ok(t) => t,
                    Err(e) => {
                        body_err = Err(e);
                        return;
                    }
                };
                self.emit_doc(w, field.doc.as_deref(), "///", ns, host);
                w.emit(&format!("pub {}: {},", names::field_name(&field.name), typ));
            }
        });
        body_err?;
        w.blank();

        if !struct_.has_required_fields() && !derive_default {
            self.impl_default_for_struct(w, ns, struct_)?;
            w.blank();
        }

        if !struct_.fields.is_empty() {
            let mut body_err = Ok(());
            w.block(&format!("impl {}", struct_name), |w| {
                body_err = self.emit_new_for_struct(w, ns, struct_);
            });
            body_err?;
            w.blank();
        }

        self.impl_serde_for_struct(w, ns, struct_)?;

        if self.is_error_def(ns, &struct_.name) {
            // Error-typed structs are rare but legal; they get the Debug
            // rendering since there are no variants to describe.
            self.impl_error(w, ns, &struct_name, &[], true)?;
        }

        if let Some(parent_ref) = &struct_.parent {
            let Some((parent_ns, ResolvedDef::Struct(parent))) =
                self.registry.resolve(ns, parent_ref)
            else {
                return Err(GenError::UnresolvedTypeRef {
                    namespace: parent_ref.namespace.clone().unwrap_or_else(|| ns.to_string()),
                    name: parent_ref.name.clone(),
                });
            };
            if parent.has_enumerated_subtypes() {
                self.impl_from_for_polymorphic_struct(w, ns, struct_, parent_ns, parent)?;
            } else {
                self.impl_from_for_struct(w, ns, struct_, parent_ns, parent);
            }
            w.blank();
        }
        Ok(())
    }

    /// Equality is strict for everything except floats; any reachable float
    /// forfeits `Eq`. Reference cycles are broken by treating a type already
    /// under inspection as float-free (a float in the cycle is found on the
    /// path that first reaches it).
    pub(super) fn can_derive_eq(
        &self,
        ns: &'a str,
        data_type: &'a DataType,
        visited: &mut HashSet<(&'a str, &'a str)>,
    ) -> bool {
        match data_type {
            DataType::Float32(_) | DataType::Float64(_) => false,
            DataType::List(inner) | DataType::Nullable(inner) => {
                self.can_derive_eq(ns, inner, visited)
            }
            DataType::Map(map) => {
                self.can_derive_eq(ns, &map.key, visited)
                    && self.can_derive_eq(ns, &map.value, visited)
            }
            DataType::Ref(r) => {
                let Some((def_ns, def)) = self.registry.resolve(ns, r) else {
                    return true; // unresolved refs fail later with a better error
                };
                if !visited.insert((def_ns, def.name())) {
                    return true;
                }
                match def {
                    ResolvedDef::Alias(a) => self.can_derive_eq(def_ns, &a.data_type, visited),
                    ResolvedDef::Struct(s) if s.has_enumerated_subtypes() => s
                        .subtypes
                        .iter()
                        .all(|st| match self.registry.resolve(def_ns, &st.type_ref) {
                            Some((st_ns, ResolvedDef::Struct(sub))) => sub
                                .fields
                                .iter()
                                .all(|f| self.can_derive_eq(st_ns, &f.data_type, visited)),
                            _ => true,
                        }),
                    ResolvedDef::Struct(s) => s
                        .fields
                        .iter()
                        .all(|f| self.can_derive_eq(def_ns, &f.data_type, visited)),
                    ResolvedDef::Union(u) => u
                        .variants
                        .iter()
                        .all(|v| self.can_derive_eq(def_ns, &v.data_type, visited)),
                }
            }
            _ => true,
        }
    }

    /// The Rust expression for a field's default, used by `new()`, `Default`
    /// and the missing-field resolution in the deserializer.
    pub(super) fn default_value_expr(
        &self,
        ns: &'a str,
        field: &'a StructField,
    ) -> GenResult<String> {
        if field.data_type.is_nullable() {
            return Ok("None".to_string());
        }
        match &field.default {
            Some(DefaultValue::Bool(b)) => Ok(b.to_string()),
            Some(DefaultValue::Int(i)) => Ok(i.to_string()),
            Some(DefaultValue::UInt(u)) => Ok(u.to_string()),
            Some(DefaultValue::Float(f)) => Ok(format!("{:?}", f)),
            Some(DefaultValue::Str(s)) => {
                if s.is_empty() {
                    Ok("String::new()".to_string())
                } else {
                    Ok(format!("\"{}\".to_owned()", escape_str(s)))
                }
            }
            Some(DefaultValue::TagRef(tag_ref)) => {
                let Some((def_ns, def)) = self.registry.resolve(ns, &tag_ref.union) else {
                    return Err(GenError::UnresolvedTypeRef {
                        namespace: tag_ref
                            .union
                            .namespace
                            .clone()
                            .unwrap_or_else(|| ns.to_string()),
                        name: tag_ref.union.name.clone(),
                    });
                };
                let ResolvedDef::Union(union) = def else {
                    return Err(GenError::UnsupportedDefault {
                        field: field.name.clone(),
                        detail: format!("tag reference into non-union {}", def.name()),
                    });
                };
                let variant = union
                    .variants
                    .iter()
                    .find(|v| v.name == tag_ref.tag)
                    .ok_or_else(|| GenError::UnknownTagRefVariant {
                        union: union.name.clone(),
                        tag: tag_ref.tag.clone(),
                    })?;
                Ok(format!(
                    "{}::{}",
                    self.def_type_name(ns, def_ns, def),
                    names::variant_name(&variant.name)
                ))
            }
            None => Err(GenError::UnsupportedDefault {
                field: field.name.clone(),
                detail: "field has no declared default".to_string(),
            }),
        }
    }

    fn impl_default_for_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
    ) -> GenResult<()> {
        let struct_name = names::struct_name(&struct_.name);
        let mut body_err = Ok(());
        w.block(&format!("impl Default for {}", struct_name), |w| {
            w.emit_fn("", "default", &[], Some("Self"), |w| {
                w.block_with(&struct_name, ("{", "}"), |w| {
                    for field in &struct_.fields {
                        match self.default_value_expr(ns, field) {
                            Ok(value) => w.emit(&format!(
                                "{}: {},",
                                names::field_name(&field.name),
                                value
                            )),
                            Err(e) => {
                                body_err = Err(e);
                                return;
                            }
                        }
                    }
                });
            });
        });
        body_err
    }

    fn emit_new_for_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
    ) -> GenResult<()> {
        let struct_name = names::struct_name(&struct_.name);
        let mut first = true;

        if struct_.has_required_fields() {
            let mut args = Vec::new();
            for field in struct_.required_fields() {
                args.push(format!(
                    "{}: {}",
                    names::field_name(&field.name),
                    self.rust_type(ns, &field.data_type)?
                ));
            }
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let mut defaults = Vec::new();
            for field in struct_.optional_fields() {
                defaults.push((
                    names::field_name(&field.name),
                    self.default_value_expr(ns, field)?,
                ));
            }
            w.emit_fn("pub", "new", &arg_refs, Some("Self"), |w| {
                w.block_with(&struct_name, ("{", "}"), |w| {
                    for field in struct_.required_fields() {
                        // shorthand assignment
                        w.emit(&format!("{},", names::field_name(&field.name)));
                    }
                    for (name, value) in &defaults {
                        w.emit(&format!("{}: {},", name, value));
                    }
                });
            });
            first = false;
        }

        for field in struct_.optional_fields() {
            if first {
                first = false;
            } else {
                w.blank();
            }
            let field_name = names::field_name(&field.name);
            // Builders for nullable fields take the inner type; a caller
            // using the builder never wants the default, so requiring
            // `Some(...)` would be noise.
            let (arg_type, value) = match &field.data_type {
                DataType::Nullable(inner) => (self.rust_type(ns, inner)?, "Some(value)"),
                other => (self.rust_type(ns, other)?, "value"),
            };
            w.emit_fn(
                "pub",
                &format!("with_{}", field_name),
                &["mut self", &format!("value: {}", arg_type)],
                Some("Self"),
                |w| {
                    w.emit(&format!("self.{} = {};", field_name, value));
                    w.emit("self");
                },
            );
        }
        Ok(())
    }

    /// The map-based deserializer pair and field-level serializer. The
    /// `_opt` entry point exists only for structs with at least one required
    /// field: with all fields optional there is no way to tell a null value
    /// from one where every field is default.
    fn impl_serde_for_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
    ) -> GenResult<()> {
        let type_name = names::struct_name(&struct_.name);
        let field_list_name = format!("{}_FIELDS", names::fmt_shouting_snake(&struct_.name));
        w.emit_list(
            &format!("const {}: &[&str] = &", field_list_name),
            struct_.fields.iter().map(|f| format!("\"{}\"", f.name)),
            ("[", "]"),
            ";",
        );

        let optional = struct_.has_required_fields();
        let mut body_err = Ok(());
        w.block(&format!("impl {}", type_name), |w| {
            if optional {
                w.emit_fn(
                    "pub(crate)",
                    "internal_deserialize<'de, V: ::serde::de::MapAccess<'de>>",
                    &["map: V"],
                    Some(&format!("Result<{}, V::Error>", type_name)),
                    |w| {
                        w.emit("Self::internal_deserialize_opt(map, false).map(Option::unwrap)");
                    },
                );
                w.blank();
            } else {
                w.emit("// no _opt deserializer");
            }
            let fn_name = if optional {
                "internal_deserialize_opt<'de, V: ::serde::de::MapAccess<'de>>"
            } else {
                "internal_deserialize<'de, V: ::serde::de::MapAccess<'de>>"
            };
            let args: Vec<&str> = if optional {
                vec!["mut map: V", "optional: bool"]
            } else {
                vec!["mut map: V"]
            };
            let ret = if optional {
                format!("Result<Option<{}>, V::Error>", type_name)
            } else {
                format!("Result<{}, V::Error>", type_name)
            };
            w.emit_fn("pub(crate)", fn_name, &args, Some(&ret), |w| {
                if struct_.fields.is_empty() {
                    w.emit("// ignore any fields found; none are presently recognized");
                    w.emit(&format!("{}(&mut map)?;", self.eat_fields_path()));
                    w.emit(&format!("Ok({} {{}})", type_name));
                    return;
                }
                for field in &struct_.fields {
                    w.emit(&format!("let mut field_{} = None;", names::field_name(&field.name)));
                }
                if optional {
                    w.emit("let mut nothing = true;");
                }
                w.block("while let Some(key) = map.next_key::<&str>()?", |w| {
                    if optional {
                        w.emit("nothing = false;");
                    }
                    w.block("match key", |w| {
                        for field in &struct_.fields {
                            let field_name = names::field_name(&field.name);
                            w.block(&format!("\"{}\" =>", field.name), |w| {
                                w.block(&format!("if field_{}.is_some()", field_name), |w| {
                                    w.emit(&format!(
                                        "return Err(::serde::de::Error::duplicate_field(\"{}\"));",
                                        field.name
                                    ));
                                });
                                w.emit(&format!(
                                    "field_{} = Some(map.next_value()?);",
                                    field_name
                                ));
                            });
                        }
                        w.block("_ =>", |w| {
                            w.emit("// unknown field allowed and ignored");
                            w.emit("map.next_value::<::serde_json::Value>()?;");
                        });
                    });
                });
                if optional {
                    w.block("if optional && nothing", |w| {
                        w.emit("return Ok(None);");
                    });
                }
                w.block_with(&format!("let result = {}", type_name), ("{", "};"), |w| {
                    for field in &struct_.fields {
                        let field_name = names::field_name(&field.name);
                        if field.data_type.is_nullable() {
                            // None -> field is not present
                            // Some(None) -> field is present with null value
                            // Some(Some(x)) -> field is present and non-null
                            // First two are equivalent here, hence Option::flatten().
                            w.emit(&format!(
                                "{}: field_{}.and_then(Option::flatten),",
                                field_name, field_name
                            ));
                        } else if field.default.is_some() {
                            let expr = match self.default_value_expr(ns, field) {
                                Ok(e) => e,
                                Err(e) => {
                                    body_err = Err(e);
                                    return;
                                }
                            };
                            let is_empty_string_default =
                                matches!(&field.default, Some(DefaultValue::Str(s)) if s.is_empty());
                            let trivial = self.is_trivial_default(ns, field, &expr);
                            if is_empty_string_default {
                                w.emit(&format!(
                                    "{}: field_{}.unwrap_or_default(),",
                                    field_name, field_name
                                ));
                            } else if trivial {
                                w.emit(&format!(
                                    "{}: field_{}.unwrap_or({}),",
                                    field_name, field_name, expr
                                ));
                            } else {
                                w.emit(&format!(
                                    "{}: field_{}.unwrap_or_else(|| {}),",
                                    field_name, field_name, expr
                                ));
                            }
                        } else {
                            w.emit(&format!(
                                "{}: field_{}.ok_or_else(|| \
                                 ::serde::de::Error::missing_field(\"{}\"))?,",
                                field_name, field_name, field.name
                            ));
                        }
                    }
                });
                if optional {
                    w.emit("Ok(Some(result))");
                } else {
                    w.emit("Ok(result)");
                }
            });
            if !struct_.fields.is_empty() {
                w.blank();
                w.emit_fn(
                    "pub(crate)",
                    "internal_serialize<S: ::serde::ser::Serializer>",
                    &["&self", "s: &mut S::SerializeStruct"],
                    Some("Result<(), S::Error>"),
                    |w| {
                        w.emit("use serde::ser::SerializeStruct;");
                        for field in &struct_.fields {
                            let field_name = names::field_name(&field.name);
                            if field.data_type.is_nullable() {
                                // A field can't be both nullable and carry a
                                // non-null default.
                                w.block(
                                    &format!("if let Some(val) = &self.{}", field_name),
                                    |w| {
                                        w.emit(&format!(
                                            "s.serialize_field(\"{}\", val)?;",
                                            field.name
                                        ));
                                    },
                                );
                            } else if field.default.is_some() {
                                let fieldval = format!("self.{}", field_name);
                                let guard = match &field.default {
                                    Some(DefaultValue::Str(s)) if s.is_empty() => {
                                        format!("if !{}.is_empty()", fieldval)
                                    }
                                    Some(DefaultValue::Bool(true)) => format!("if !{}", fieldval),
                                    Some(DefaultValue::Bool(false)) => format!("if {}", fieldval),
                                    _ => {
                                        let expr = match self.default_value_expr(ns, field) {
                                            Ok(e) => e,
                                            Err(e) => {
                                                body_err = Err(e);
                                                return;
                                            }
                                        };
                                        format!("if {} != {}", fieldval, expr)
                                    }
                                };
                                w.block(&guard, |w| {
                                    w.emit(&format!(
                                        "s.serialize_field(\"{}\", &{})?;",
                                        field.name, fieldval
                                    ));
                                });
                            } else {
                                w.emit(&format!(
                                    "s.serialize_field(\"{}\", &self.{})?;",
                                    field.name, field_name
                                ));
                            }
                        }
                        w.emit("Ok(())");
                    },
                );
            }
        });
        body_err?;
        w.blank();

        self.impl_deserialize(w, &type_name, |w| {
            w.emit("// struct deserializer");
            w.emit("use serde::de::{MapAccess, Visitor};");
            w.emit("struct StructVisitor;");
            w.block("impl<'de> Visitor<'de> for StructVisitor", |w| {
                w.emit(&format!("type Value = {};", type_name));
                w.emit_fn(
                    "",
                    "expecting",
                    &["&self", "f: &mut ::std::fmt::Formatter<'_>"],
                    Some("::std::fmt::Result"),
                    |w| {
                        w.emit(&format!("f.write_str(\"a {} struct\")", struct_.name));
                    },
                );
                w.emit_fn(
                    "",
                    "visit_map<V: MapAccess<'de>>",
                    &["self", "map: V"],
                    Some("Result<Self::Value, V::Error>"),
                    |w| {
                        w.emit(&format!("{}::internal_deserialize(map)", type_name));
                    },
                );
            });
            w.emit(&format!(
                "deserializer.deserialize_struct(\"{}\", {}, StructVisitor)",
                struct_.name, field_list_name
            ));
        });
        w.blank();

        self.impl_serialize(w, &type_name, |w| {
            w.emit("// struct serializer");
            w.emit("use serde::ser::SerializeStruct;");
            if struct_.fields.is_empty() {
                w.emit(&format!(
                    "serializer.serialize_struct(\"{}\", 0)?.end()",
                    struct_.name
                ));
            } else {
                w.emit(&format!(
                    "let mut s = serializer.serialize_struct(\"{}\", {})?;",
                    struct_.name,
                    struct_.fields.len()
                ));
                w.emit("self.internal_serialize::<S>(&mut s)?;");
                w.emit("s.end()");
            }
        });
        w.blank();
        Ok(())
    }

    /// Whether the default expression can go in `unwrap_or` without tripping
    /// the lazy-evaluation lint: primitive-typed defaults, or any expression
    /// with no function call in it.
    fn is_trivial_default(&self, ns: &'a str, field: &'a StructField, expr: &str) -> bool {
        let unwrapped = self
            .registry
            .unwrap_aliases(ns, &field.data_type)
            .map(|(_, dt)| dt)
            .unwrap_or(&field.data_type);
        is_primitive(unwrapped) || !expr.contains('(')
    }

    pub(super) fn impl_deserialize(
        &self,
        w: &mut CodeWriter,
        type_name: &str,
        body: impl FnOnce(&mut CodeWriter),
    ) {
        w.block(
            &format!("impl<'de> ::serde::de::Deserialize<'de> for {}", type_name),
            |w| {
                w.emit_fn(
                    "",
                    "deserialize<D: ::serde::de::Deserializer<'de>>",
                    &["deserializer: D"],
                    Some("Result<Self, D::Error>"),
                    body,
                );
            },
        );
    }

    pub(super) fn impl_serialize(
        &self,
        w: &mut CodeWriter,
        type_name: &str,
        body: impl FnOnce(&mut CodeWriter),
    ) {
        w.block(
            &format!("impl ::serde::ser::Serialize for {}", type_name),
            |w| {
                w.emit_fn(
                    "",
                    "serialize<S: ::serde::ser::Serializer>",
                    &["&self", "serializer: S"],
                    Some("Result<S::Ok, S::Error>"),
                    body,
                );
            },
        );
    }

    fn impl_from_for_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
        parent_ns: &'a str,
        parent: &'a Struct,
    ) {
        let subtype = names::struct_name(&struct_.name);
        let supertype = self.def_type_name(ns, parent_ns, ResolvedDef::Struct(parent));
        w.emit(&format!("// struct extends {}", supertype));
        w.block(&format!("impl From<{}> for {}", subtype, supertype), |w| {
            if parent.fields.is_empty() {
                w.emit_fn("", "from", &[&format!("_: {}", subtype)], Some("Self"), |w| {
                    w.emit("Self {}");
                });
                return;
            }
            w.emit_fn(
                "",
                "from",
                &[&format!("subtype: {}", subtype)],
                Some("Self"),
                |w| {
                    w.block("Self", |w| {
                        for field in &parent.fields {
                            let field_name = names::field_name(&field.name);
                            w.emit(&format!("{}: subtype.{},", field_name, field_name));
                        }
                    });
                },
            );
        });
    }

    fn impl_from_for_polymorphic_struct(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        struct_: &'a Struct,
        parent_ns: &'a str,
        parent: &'a Struct,
    ) -> GenResult<()> {
        let thistype = names::struct_name(&struct_.name);
        let supertype = self.def_type_name(ns, parent_ns, ResolvedDef::Struct(parent));
        w.emit(&format!("// struct extends polymorphic struct {}", supertype));
        let mut matching = None;
        for subtype in &parent.subtypes {
            if let Some((def_ns, def)) = self.registry.resolve(parent_ns, &subtype.type_ref) {
                if def_ns == ns && def.name() == struct_.name {
                    matching = Some(subtype);
                }
            }
        }
        let Some(subtype) = matching else {
            return Err(GenError::UnsupportedType {
                type_name: struct_.name.clone(),
                detail: format!("not an enumerated subtype of {}", parent.name),
            });
        };
        w.block(&format!("impl From<{}> for {}", thistype, supertype), |w| {
            w.emit_fn(
                "",
                "from",
                &[&format!("subtype: {}", thistype)],
                Some("Self"),
                |w| {
                    w.emit(&format!(
                        "{}::{}(subtype)",
                        supertype,
                        names::variant_name(&subtype.tag)
                    ));
                },
            );
        });
        Ok(())
    }

    pub(super) fn eat_fields_path(&self) -> String {
        format!("{}::eat_json_fields", self.crate_path())
    }
}

fn needs_explicit_default(field: &StructField) -> bool {
    if field.data_type.is_nullable() {
        // default is always None
        return false;
    }
    match &field.default {
        None | Some(DefaultValue::TagRef(_)) => true,
        Some(DefaultValue::Bool(b)) => *b,
        Some(DefaultValue::Int(i)) => *i != 0,
        Some(DefaultValue::UInt(u)) => *u != 0,
        Some(DefaultValue::Float(f)) => *f != 0.0,
        Some(DefaultValue::Str(s)) => !s.is_empty(),
    }
}

pub(super) fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
