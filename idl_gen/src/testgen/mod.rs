/* Test generator.
 *
 * Emits one Rust test file per namespace. Each test decodes oracle JSON
 * produced by the reference encoder, asserts every leaf of the decoded value,
 * checks self-equality, and (when the value is serializable) re-encodes with
 * the generated serializer and decodes again. Closed unions additionally get
 * a compile-time exhaustive-match test, and every route gets a call against
 * a no-op client stub that must fail with the transport error.
 */

pub mod reference;
pub mod values;

use idl_types::{Api, Namespace, Route, Style, TypeDef, TypeRegistry};

use crate::codegen::GeneratedFile;
use crate::errors::GenResult;
use crate::names;
use crate::writer::CodeWriter;

use self::values::{PayloadShape, TestCase, TestField, TestValue, UnionValue, ValueBuilder};

/// Replaces the reserved catch-all tag in oracle JSON so decoding exercises
/// the unknown-variant path rather than a declared tag.
const BOGUS_TAG: &str = "idl-gen-bogus-test-variant";

pub struct TestGenOptions {
    /// Name of the crate the generated SDK sources land in, as referenced
    /// from the emitted tests.
    pub crate_name: String,
    /// Namespaces compiled unconditionally; the rest sit behind features.
    pub required_namespaces: Vec<String>,
}

pub struct TestGenerator<'a> {
    api: &'a Api,
    registry: &'a TypeRegistry<'a>,
    options: TestGenOptions,
}

impl<'a> TestGenerator<'a> {
    pub fn new(api: &'a Api, registry: &'a TypeRegistry<'a>, options: TestGenOptions) -> Self {
        Self {
            api,
            registry,
            options,
        }
    }

    pub fn generate(&self) -> GenResult<Vec<GeneratedFile>> {
        let builder = ValueBuilder::new(self.registry);
        let mut files = Vec::new();
        for ns in &self.api.namespaces {
            let mut w = CodeWriter::new();
            emit_test_header(&mut w);
            for def in &ns.types {
                self.emit_type_tests(&mut w, &builder, ns, def)?;
                if is_closed_enum_def(def) {
                    self.emit_closed_union_test(&mut w, &ns.name, def);
                }
            }
            for route in &ns.routes {
                self.emit_route_test(&mut w, &builder, ns, route, None)?;
            }
            files.push(GeneratedFile {
                path: format!("{}.rs", names::namespace_name(&ns.name)),
                contents: w.into_string(),
            });
        }
        files.push(GeneratedFile {
            path: "mod.rs".to_string(),
            contents: self.emit_mod_file(),
        });
        Ok(files)
    }

    fn type_path(&self, ns: &str, def: &TypeDef) -> String {
        format!(
            "::{}::types::{}::{}",
            self.options.crate_name,
            names::namespace_name(ns),
            rust_def_name(def)
        )
    }

    fn emit_type_tests(
        &self,
        w: &mut CodeWriter,
        builder: &ValueBuilder<'a>,
        ns: &'a Namespace,
        def: &'a TypeDef,
    ) -> GenResult<()> {
        let full_type = self.type_path(&ns.name, def);
        for case in builder.type_cases(&ns.name, def)? {
            let json = serde_json::to_string(&reference::encode(&case.value))?;
            let json = json.replace(
                "{\".tag\":\"other\"",
                &format!("{{\".tag\":\"{}\"", BOGUS_TAG),
            );
            w.emit("#[test]");
            w.emit_fn(
                "",
                &format!("test_{}{}", rust_def_name(def), case.suffix),
                &[],
                None,
                |w| {
                    w.emit(&format!("let json = r#\"{}\"#;", json));
                    w.emit(&format!(
                        "let x = ::serde_json::from_str::<{}>(json).unwrap();",
                        full_type
                    ));
                    emit_asserts(w, &case.value, "x", &self.options.crate_name);
                    w.emit("assert_eq!(x, x.clone());");
                    if case.serializable {
                        w.blank();
                        w.emit("let json2 = ::serde_json::to_string(&x).unwrap();");
                        let de = format!(
                            "::serde_json::from_str::<{}>(&json2).unwrap()",
                            full_type
                        );
                        if def_has_fields(def) {
                            w.emit(&format!("let x2 = {};", de));
                            emit_asserts(w, &case.value, "x2", &self.options.crate_name);
                            w.emit("assert_eq!(x, x2);");
                        } else {
                            w.emit(&format!("{};", de));
                        }
                    } else {
                        w.emit("assert!(::serde_json::to_string(&x).is_err());");
                    }
                },
            );
            w.blank();
        }
        Ok(())
    }

    fn emit_closed_union_test(&self, w: &mut CodeWriter, ns: &str, def: &TypeDef) {
        let enum_path = self.type_path(ns, def);
        let arms: Vec<String> = match def {
            TypeDef::Union(u) => u
                .variants
                .iter()
                .map(|v| {
                    let payload = if v.data_type.is_void() { "" } else { "(_)" };
                    format!(
                        "Some({}::{}{})",
                        enum_path,
                        names::variant_name(&v.name),
                        payload
                    )
                })
                .collect(),
            TypeDef::Struct(s) => s
                .subtypes
                .iter()
                .map(|sub| {
                    format!("Some({}::{}(_))", enum_path, names::variant_name(&sub.tag))
                })
                .collect(),
        };
        w.emit("#[test]");
        w.emit_fn(
            "",
            &format!("test_ClosedUnion_{}", rust_def_name(def)),
            &[],
            None,
            |w| {
                w.emit("// This test ensures that an exhaustive match compiles.");
                w.emit(&format!("let x: Option<{}> = None;", enum_path));
                w.block("match x", |w| {
                    if arms.is_empty() {
                        w.emit("None => (),");
                        return;
                    }
                    w.emit("None |");
                    for (i, arm) in arms.iter().enumerate() {
                        if i + 1 < arms.len() {
                            w.emit(&format!("{} |", arm));
                        } else {
                            w.emit(&format!("{} => (),", arm));
                        }
                    }
                });
            },
        );
        w.blank();
    }

    fn emit_route_test(
        &self,
        w: &mut CodeWriter,
        builder: &ValueBuilder<'a>,
        ns: &'a Namespace,
        route: &'a Route,
        auth_kind: Option<&str>,
    ) -> GenResult<()> {
        let cp = format!("::{}", self.options.crate_name);
        let mut fn_name = names::route_name(&route.name, route.version);

        let auth_kind = match auth_kind {
            Some(kind) => kind.to_string(),
            None => {
                let mut auths: Vec<&str> = route.attrs.auth.split(',').map(str::trim).collect();
                auths.sort_unstable();
                if auths == ["app", "user"] {
                    // Mirrors the route emitter: a user-auth function plus an
                    // _app_auth twin.
                    self.emit_route_test(w, builder, ns, route, Some("user"))?;
                    fn_name.push_str("_app_auth");
                    "app".to_string()
                } else {
                    auths.first().copied().unwrap_or("user").to_string()
                }
            }
        };

        let arg_json = if route.arg.is_void() {
            None
        } else {
            let case = builder.data_type_case(&ns.name, &route.arg)?;
            Some(serde_json::to_string(&reference::encode(&case.value))?)
        };

        let arg_type = names::rust_type_fq(self.registry, &ns.name, &route.arg, &cp)?;
        let mut ok_type = names::rust_type_fq(self.registry, &ns.name, &route.result, &cp)?;
        if matches!(route.attrs.style, Style::Download) {
            ok_type = format!("{}::client_trait::HttpRequestResult<{}>", cp, ok_type);
        }
        let err_type = if route.error.is_void() {
            format!("{}::NoError", cp)
        } else {
            names::rust_type_fq(self.registry, &ns.name, &route.error, &cp)?
        };

        if route.attrs.is_preview {
            w.emit("#[cfg(feature = \"unstable\")]");
        }
        if route.deprecated.is_some() {
            w.emit("#[allow(deprecated)]");
        }
        w.emit("#[test]");
        w.emit_fn("", &format!("test_route_{}", fn_name), &[], None, |w| {
            if let Some(json) = &arg_json {
                w.emit(&format!(
                    "let arg: {} = ::serde_json::from_str(r#\"{}\"#).unwrap();",
                    arg_type, json
                ));
            }
            w.emit(&format!(
                "let ret: Result<{}, {}::Error<{}>> =",
                ok_type, cp, err_type
            ));
            w.indented(|w| {
                w.block_with(
                    &format!(
                        "{}::sync_routes::{}::{}(",
                        cp,
                        names::namespace_name(&ns.name),
                        fn_name
                    ),
                    ("", ");"),
                    |w| {
                        w.emit(&format!("&super::noop_client::{}::Client,", auth_kind));
                        if arg_json.is_some() {
                            w.emit("&arg,");
                        } else {
                            w.emit("/* no args */");
                        }
                        match route.attrs.style {
                            Style::Rpc => {}
                            Style::Upload => w.emit("&[],"),
                            Style::Download => {
                                w.emit("None,");
                                w.emit("None,");
                            }
                        }
                    },
                );
            });
            w.emit(&format!(
                "assert!(matches!(ret, Err({}::Error::HttpClient(..))));",
                cp
            ));
        });
        w.blank();
        Ok(())
    }

    fn emit_mod_file(&self) -> String {
        let mut w = CodeWriter::new();
        emit_test_header(&mut w);
        w.emit("#[path = \"../noop_client.rs\"]");
        w.emit("pub mod noop_client;");
        w.blank();
        for ns in &self.api.namespaces {
            if !self.options.required_namespaces.iter().any(|r| r == &ns.name) {
                w.emit(&format!("#[cfg(feature = \"ns_{}\")]", ns.name));
            }
            w.emit(&format!("mod {};", names::namespace_name(&ns.name)));
            w.blank();
        }
        w.into_string()
    }
}

fn emit_test_header(w: &mut CodeWriter) {
    w.emit("// DO NOT EDIT");
    w.emit("// This file was @generated by idl-gen");
    w.blank();
    w.emit("#![allow(nonstandard_style)]");
    w.blank();
    w.emit("#![allow(");
    w.emit("    clippy::float_cmp,");
    w.emit("    clippy::unreadable_literal,");
    w.emit("    clippy::cognitive_complexity,");
    w.emit("    clippy::collapsible_match,");
    w.emit("    clippy::bool_assert_comparison,");
    w.emit("    clippy::explicit_auto_deref,");
    w.emit(")]");
    w.blank();
}

fn rust_def_name(def: &TypeDef) -> String {
    match def {
        TypeDef::Struct(s) if s.has_enumerated_subtypes() => names::enum_name(&s.name),
        TypeDef::Struct(s) => names::struct_name(&s.name),
        TypeDef::Union(u) => names::enum_name(&u.name),
    }
}

fn is_closed_enum_def(def: &TypeDef) -> bool {
    match def {
        TypeDef::Union(u) => u.closed,
        TypeDef::Struct(s) => s.has_enumerated_subtypes() && !s.catch_all,
    }
}

fn def_has_fields(def: &TypeDef) -> bool {
    match def {
        TypeDef::Struct(s) => !s.fields.is_empty() || s.has_enumerated_subtypes(),
        TypeDef::Union(u) => !u.variants.is_empty(),
    }
}

/// Emit one assertion per leaf of a synthesized value.
fn emit_asserts(w: &mut CodeWriter, value: &TestValue<'_>, expr: &str, crate_name: &str) {
    match value {
        // Absence is asserted by the field wrapper.
        TestValue::Absent => {}
        TestValue::Bool(b) => w.emit(&format!("assert_eq!({}, {});", expr, b)),
        TestValue::Int(i) => w.emit(&format!("assert_eq!({}, {});", expr, i)),
        TestValue::UInt(u) => w.emit(&format!("assert_eq!({}, {});", expr, u)),
        TestValue::Float(f) => w.emit(&format!("assert_eq!({}, {:?});", expr, f)),
        TestValue::Str(s) => {
            w.emit(&format!("assert_eq!({}.as_str(), r#\"{}\"#);", expr, s));
        }
        TestValue::Timestamp(s) => {
            w.emit(&format!("assert_eq!({}.as_str(), \"{}\");", expr, s));
        }
        TestValue::Bytes(bytes) => w.emit(&format!(
            "assert_eq!(&{}, &[{}]);",
            expr,
            bytes
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )),
        TestValue::List(inner) => {
            emit_asserts(w, inner, &format!("{}[0]", expr), crate_name);
        }
        TestValue::Map { key, value } => {
            emit_asserts(w, value, &format!("{}[\"{}\"]", expr, key), crate_name);
        }
        TestValue::Struct(s) => {
            for field in &s.fields {
                emit_field_assert(w, field, expr, crate_name);
            }
        }
        TestValue::Union(u) => emit_union_asserts(w, u, expr, crate_name),
    }
}

fn emit_field_assert(w: &mut CodeWriter, field: &TestField<'_>, expr: &str, crate_name: &str) {
    let path = match field.name {
        Some(name) => format!("{}.{}", expr, names::field_name(name)),
        None => expr.to_string(),
    };
    if field.nullable {
        if matches!(field.value, TestValue::Absent) {
            w.emit(&format!("assert!({}.is_none());", path));
            return;
        }
        let inner = format!("(*{}.as_ref().unwrap())", path);
        emit_asserts(w, &field.value, &inner, crate_name);
    } else {
        emit_asserts(w, &field.value, &path, crate_name);
    }
}

fn emit_union_asserts(w: &mut CodeWriter, value: &UnionValue<'_>, expr: &str, crate_name: &str) {
    // Superfluous parens from option unwrapping read poorly in a match head.
    let expr = expr
        .strip_prefix('(')
        .and_then(|e| e.strip_suffix(')'))
        .unwrap_or(expr);
    let path = format!(
        "::{}::types::{}::{}::{}",
        crate_name,
        names::namespace_name(value.def_ns),
        names::enum_name(value.name),
        names::variant_name(value.tag)
    );
    w.block(&format!("match {}", expr), |w| {
        match &value.payload {
            None => w.emit(&format!("{} => (),", path)),
            Some(payload) if is_nullary_struct(payload) => {
                w.emit(&format!("{}(..) => (), // nullary struct", path));
            }
            Some(payload) => {
                w.block(&format!("{}(ref v) =>", path), |w| {
                    emit_field_assert(w, payload, "(*v)", crate_name);
                });
            }
        }
        if value.has_other_variants {
            w.emit("_ => panic!(\"wrong variant\"),");
        }
    });
}

fn is_nullary_struct(payload: &TestField<'_>) -> bool {
    !payload.nullable
        && matches!(&payload.value, TestValue::Struct(s) if s.fields.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idl_types::{DataType, RouteAttrs, StringAttrs, Struct, StructField, Union, UnionVariant};

    fn options() -> TestGenOptions {
        TestGenOptions {
            crate_name: "my_sdk".to_string(),
            required_namespaces: vec![],
        }
    }

    fn api(types: Vec<TypeDef>, routes: Vec<Route>) -> Api {
        Api {
            namespaces: vec![Namespace {
                name: "files".to_string(),
                doc: None,
                aliases: vec![],
                types,
                routes,
            }],
        }
    }

    fn open_union() -> TypeDef {
        TypeDef::Union(Union {
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
        })
    }

    #[test]
    fn catch_all_tags_are_rewritten_to_a_bogus_tag() {
        let api = api(vec![open_union()], vec![]);
        let registry = TypeRegistry::new(&api);
        let generator = TestGenerator::new(&api, &registry, options());
        let files = generator.generate().unwrap();
        let out = &files[0].contents;
        assert!(out.contains(BOGUS_TAG));
        assert!(!out.contains("r#\"{\".tag\":\"other\"}\"#"));
        // The catch-all case asserts the serializer refuses it.
        assert!(out.contains("assert!(::serde_json::to_string(&x).is_err());"));
    }

    #[test]
    fn closed_unions_get_an_exhaustive_match_test() {
        let api = api(
            vec![TypeDef::Union(Union {
                name: "Mode".to_string(),
                doc: None,
                variants: vec![
                    UnionVariant {
                        name: "on".to_string(),
                        doc: None,
                        data_type: DataType::Void,
                        catch_all: false,
                    },
                    UnionVariant {
                        name: "level".to_string(),
                        doc: None,
                        data_type: DataType::Str(StringAttrs::default()),
                        catch_all: false,
                    },
                ],
                closed: true,
                parent: None,
            })],
            vec![],
        );
        let registry = TypeRegistry::new(&api);
        let generator = TestGenerator::new(&api, &registry, options());
        let files = generator.generate().unwrap();
        let out = &files[0].contents;
        assert!(out.contains("fn test_ClosedUnion_Mode()"));
        assert!(out.contains("Some(::my_sdk::types::files::Mode::On) |"));
        assert!(out.contains("Some(::my_sdk::types::files::Mode::Level(_)) => (),"));
    }

    #[test]
    fn struct_tests_decode_assert_and_round_trip() {
        let api = api(
            vec![TypeDef::Struct(Struct {
                name: "Entry".to_string(),
                doc: None,
                fields: vec![StructField {
                    name: "name".to_string(),
                    doc: None,
                    data_type: DataType::Str(StringAttrs::default()),
                    default: None,
                    internal: false,
                }],
                parent: None,
                subtypes: vec![],
                catch_all: false,
            })],
            vec![],
        );
        let registry = TypeRegistry::new(&api);
        let generator = TestGenerator::new(&api, &registry, options());
        let files = generator.generate().unwrap();
        let out = &files[0].contents;
        assert!(out.contains("fn test_Entry()"));
        assert!(out.contains(r##"let json = r#"{"name":"something"}"#;"##));
        assert!(out.contains(
            "let x = ::serde_json::from_str::<::my_sdk::types::files::Entry>(json).unwrap();"
        ));
        assert!(out.contains(r##"assert_eq!(x.name.as_str(), r#"something"#);"##));
        assert!(out.contains("assert_eq!(x, x.clone());"));
        assert!(out.contains("let json2 = ::serde_json::to_string(&x).unwrap();"));
        assert!(out.contains("assert_eq!(x, x2);"));
    }

    #[test]
    fn route_tests_target_the_noop_client() {
        let api = api(
            vec![],
            vec![Route {
                name: "get_quota".to_string(),
                version: 1,
                doc: None,
                deprecated: None,
                arg: DataType::Void,
                result: DataType::Void,
                error: DataType::Void,
                attrs: RouteAttrs::default(),
            }],
        );
        let registry = TypeRegistry::new(&api);
        let generator = TestGenerator::new(&api, &registry, options());
        let files = generator.generate().unwrap();
        let out = &files[0].contents;
        assert!(out.contains("fn test_route_get_quota()"));
        assert!(out.contains("let ret: Result<(), ::my_sdk::Error<::my_sdk::NoError>> ="));
        assert!(out.contains("::my_sdk::sync_routes::files::get_quota("));
        assert!(out.contains("&super::noop_client::user::Client,"));
        assert!(out.contains("/* no args */"));
        assert!(out.contains(
            "assert!(matches!(ret, Err(::my_sdk::Error::HttpClient(..))));"
        ));
    }

    #[test]
    fn mod_file_gates_optional_namespaces_and_mounts_the_stub() {
        let api = api(vec![], vec![]);
        let registry = TypeRegistry::new(&api);
        let generator = TestGenerator::new(&api, &registry, options());
        let files = generator.generate().unwrap();
        let mod_file = &files.last().unwrap().contents;
        assert!(mod_file.contains("#[path = \"../noop_client.rs\"]"));
        assert!(mod_file.contains("#[cfg(feature = \"ns_files\")]"));
        assert!(mod_file.contains("mod files;"));
    }
}
