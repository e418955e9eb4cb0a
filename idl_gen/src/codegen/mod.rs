/* Rust codec generator.
 *
 * Walks the IR namespace by namespace and emits, for each one, a data
 * definitions file (`types/<ns>.rs`) and a sync and async route-function
 * file. The emitted codec impls are hand-rolled serde visitors rather than
 * derives: the wire format's tag conventions, field elision rules and
 * open/closed union semantics are a fixed external contract that derive
 * attributes cannot express.
 */

mod display;
mod docs;
mod routes;
mod structs;
mod unions;

use std::collections::HashSet;

use idl_types::{Api, DataType, Namespace, ResolvedDef, TypeDef, TypeRegistry, UltimateType};

use crate::errors::GenResult;
use crate::names;
use crate::writer::CodeWriter;

/// One output file, path relative to the generated-module root.
#[derive(Debug)]
pub struct GeneratedFile {
    pub path: String,
    pub contents: String,
}

pub struct GenOptions {
    /// Path prefix for cross-namespace type references in generated code;
    /// `"crate"` when the output lands inside the SDK crate itself.
    pub crate_path: String,
    /// Namespaces that are always compiled in; everything else goes behind a
    /// feature switch.
    pub required_namespaces: Vec<String>,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            crate_path: "crate".to_string(),
            required_namespaces: Vec::new(),
        }
    }
}

pub struct Generator<'a> {
    api: &'a Api,
    pub(crate) registry: TypeRegistry<'a>,
    /// Types that get a `std::error::Error` impl: every route's declared
    /// error type, plus enum types whose names end in "Error" (those tend to
    /// be nested inside other errors even when no route names them directly).
    error_types: HashSet<(&'a str, &'a str)>,
    options: GenOptions,
}

impl<'a> Generator<'a> {
    pub fn new(api: &'a Api, options: GenOptions) -> Self {
        let registry = TypeRegistry::new(api);
        let mut error_types = HashSet::new();
        for ns in &api.namespaces {
            for route in &ns.routes {
                if let Some(key) = ultimate_user_type(&registry, &ns.name, &route.error) {
                    error_types.insert(key);
                }
            }
            for typ in &ns.types {
                let is_enum = match typ {
                    TypeDef::Union(_) => true,
                    TypeDef::Struct(s) => s.has_enumerated_subtypes(),
                };
                if is_enum && typ.name().ends_with("Error") {
                    error_types.insert((ns.name.as_str(), typ.name()));
                }
            }
        }
        Self {
            api,
            registry,
            error_types,
            options,
        }
    }

    pub fn generate(&self) -> GenResult<Vec<GeneratedFile>> {
        let mut files = Vec::new();
        let mut modules: Vec<&str> = Vec::new();
        for ns in &self.api.namespaces {
            let mod_name = names::namespace_name(&ns.name);
            files.push(GeneratedFile {
                path: format!("types/{}.rs", mod_name),
                contents: self.emit_types_file(ns)?,
            });
            files.push(GeneratedFile {
                path: format!("sync_routes/{}.rs", mod_name),
                contents: self.emit_routes_file(ns, false)?,
            });
            files.push(GeneratedFile {
                path: format!("async_routes/{}.rs", mod_name),
                contents: self.emit_routes_file(ns, true)?,
            });
            modules.push(&ns.name);
        }
        for dir in ["async_routes", "sync_routes", "types"] {
            files.push(GeneratedFile {
                path: format!("{}/mod.rs", dir),
                contents: self.emit_mod_file(&modules),
            });
        }
        files.push(GeneratedFile {
            path: "mod.rs".to_string(),
            contents: self.emit_root_mod(),
        });
        Ok(files)
    }

    fn emit_types_file(&self, ns: &'a Namespace) -> GenResult<String> {
        let mut w = CodeWriter::new();
        emit_header(&mut w);
        if let Some(doc) = &ns.doc {
            self.emit_doc(&mut w, Some(doc), "//!", &ns.name, docs::DocHost::None);
            w.blank();
        }
        for alias in &ns.aliases {
            self.emit_doc(&mut w, alias.doc.as_deref(), "///", &ns.name, docs::DocHost::None);
            w.emit(&format!(
                "pub type {} = {};",
                names::alias_name(&alias.name),
                self.rust_type(&ns.name, &alias.data_type)?
            ));
        }
        if !ns.aliases.is_empty() {
            w.blank();
        }
        for typ in &ns.types {
            match typ {
                TypeDef::Struct(s) if s.has_enumerated_subtypes() => {
                    self.emit_polymorphic_struct(&mut w, &ns.name, s)?;
                }
                TypeDef::Struct(s) => self.emit_struct(&mut w, &ns.name, s)?,
                TypeDef::Union(u) => self.emit_union(&mut w, &ns.name, u)?,
            }
        }
        Ok(w.into_string())
    }

    fn emit_routes_file(&self, ns: &'a Namespace, as_async: bool) -> GenResult<String> {
        let mut w = CodeWriter::new();
        emit_header(&mut w);
        w.emit("#[allow(unused_imports)]");
        w.emit(&format!(
            "pub use {}::types::{}::*;",
            self.options.crate_path,
            names::namespace_name(&ns.name)
        ));
        w.blank();
        for route in &ns.routes {
            self.emit_route(&mut w, ns, route, None, as_async)?;
        }
        Ok(w.into_string())
    }

    fn emit_mod_file(&self, modules: &[&str]) -> String {
        let mut w = CodeWriter::new();
        emit_header(&mut w);
        w.emit("#![allow(missing_docs)]");
        w.blank();
        for module in modules {
            let ns = names::namespace_name(module);
            if self.options.required_namespaces.iter().any(|r| r == module) {
                w.emit(&format!("pub mod {};", ns));
            } else {
                w.emit(&format!("if_feature! {{ \"ns_{}\", pub mod {}; }}", module, ns));
            }
            w.blank();
        }
        w.into_string()
    }

    fn emit_root_mod(&self) -> String {
        let mut w = CodeWriter::new();
        emit_header(&mut w);
        w.emit("pub mod types;");
        w.blank();
        w.block_with("if_feature! { \"async_routes\",", ("", "}"), |w| {
            w.emit("pub mod async_routes;");
        });
        w.blank();
        w.block_with("if_feature! { \"sync_routes\",", ("", "}"), |w| {
            w.emit("pub mod sync_routes;");
        });
        w.blank();
        w.block(
            "pub(crate) fn eat_json_fields<'de, V>(map: &mut V) -> Result<(), V::Error> \
             where V: ::serde::de::MapAccess<'de>",
            |w| {
                w.block(
                    "while map.next_entry::<&str, ::serde_json::Value>()?.is_some()",
                    |w| {
                        w.emit("/* ignore */");
                    },
                );
                w.emit("Ok(())");
            },
        );
        w.into_string()
    }

    // Shared lookups

    pub(crate) fn crate_path(&self) -> &str {
        &self.options.crate_path
    }

    pub(crate) fn rust_type(&self, current_ns: &str, data_type: &DataType) -> GenResult<String> {
        names::rust_type(
            &self.registry,
            current_ns,
            data_type,
            false,
            &self.options.crate_path,
        )
    }

    pub(crate) fn rust_type_no_qualify(
        &self,
        current_ns: &str,
        data_type: &DataType,
    ) -> GenResult<String> {
        names::rust_type(&self.registry, current_ns, data_type, true, &self.options.crate_path)
    }

    /// Qualified Rust name of a definition already looked up in the registry.
    pub(crate) fn def_type_name(
        &self,
        current_ns: &str,
        def_ns: &str,
        def: ResolvedDef<'_>,
    ) -> String {
        let name = match def {
            ResolvedDef::Struct(s) if s.has_enumerated_subtypes() => names::enum_name(&s.name),
            ResolvedDef::Struct(s) => names::struct_name(&s.name),
            ResolvedDef::Union(u) => names::enum_name(&u.name),
            ResolvedDef::Alias(a) => names::alias_name(&a.name),
        };
        if def_ns == current_ns {
            name
        } else {
            format!(
                "{}::types::{}::{}",
                self.options.crate_path,
                names::namespace_name(def_ns),
                name
            )
        }
    }

    pub(crate) fn is_error_def(&self, def_ns: &str, name: &str) -> bool {
        self.error_types.contains(&(def_ns, name))
    }

    /// Whether the (alias/nullable-peeled) type is in the error-type set.
    pub(crate) fn is_error_data_type(&self, current_ns: &'a str, data_type: &'a DataType) -> bool {
        match ultimate_user_type(&self.registry, current_ns, data_type) {
            Some(key) => self.error_types.contains(&key),
            None => false,
        }
    }
}

/// Resolve to the underlying user-defined type's (namespace, name) key, if
/// the type is (or wraps, through aliases and nullability) a struct or union.
fn ultimate_user_type<'a>(
    registry: &TypeRegistry<'a>,
    current_ns: &'a str,
    data_type: &'a DataType,
) -> Option<(&'a str, &'a str)> {
    match registry.ultimate(current_ns, data_type)? {
        UltimateType::Struct(ns, s) => Some((ns, s.name.as_str())),
        UltimateType::Union(ns, u) => Some((ns, u.name.as_str())),
        UltimateType::Primitive(_) => None,
    }
}

/// Primitive in the wire sense: a leaf value, not a record, list or map.
pub(crate) fn is_primitive(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Void
            | DataType::Boolean
            | DataType::Int32(_)
            | DataType::UInt32(_)
            | DataType::Int64(_)
            | DataType::UInt64(_)
            | DataType::Float32(_)
            | DataType::Float64(_)
            | DataType::Str(_)
            | DataType::Bytes
            | DataType::Timestamp(_)
    )
}

pub(crate) fn emit_header(w: &mut CodeWriter) {
    w.emit("// DO NOT EDIT");
    w.emit("// This file was @generated by idl-gen");
    w.blank();
    w.emit("#![allow(");
    w.emit("    clippy::too_many_arguments,");
    w.emit("    clippy::large_enum_variant,");
    w.emit("    clippy::result_large_err,");
    w.emit("    clippy::doc_markdown,");
    w.emit(")]");
    w.blank();
}

pub(crate) fn emit_other_variant(w: &mut CodeWriter) {
    w.emit_wrapped(
        "Catch-all used for unrecognized values returned from the server. Encountering this \
         value typically indicates that this SDK version is out of date.",
        "/// ",
        100,
    );
    w.emit("Other,");
}

#[cfg(test)]
mod tests {
    use super::*;
    use idl_types::{Route, Union, UnionVariant};

    fn api_with_error_union() -> Api {
        Api {
            namespaces: vec![Namespace {
                name: "files".to_string(),
                doc: None,
                aliases: vec![],
                types: vec![TypeDef::Union(Union {
                    name: "LookupError".to_string(),
                    doc: None,
                    variants: vec![UnionVariant {
                        name: "not_found".to_string(),
                        doc: None,
                        data_type: DataType::Void,
                        catch_all: false,
                    }],
                    closed: false,
                    parent: None,
                })],
                routes: vec![Route {
                    name: "noop".to_string(),
                    version: 1,
                    doc: None,
                    deprecated: None,
                    arg: DataType::Void,
                    result: DataType::Void,
                    error: DataType::Void,
                    attrs: Default::default(),
                }],
            }],
        }
    }

    #[test]
    fn error_suffixed_unions_join_the_error_set() {
        let api = api_with_error_union();
        let generator = Generator::new(&api, GenOptions::default());
        assert!(generator.is_error_def("files", "LookupError"));
    }

    #[test]
    fn mod_file_gates_non_required_namespaces() {
        let api = api_with_error_union();
        let generator = Generator::new(&api, GenOptions::default());
        let out = generator.emit_mod_file(&["files"]);
        assert!(out.contains("if_feature! { \"ns_files\", pub mod files; }"));

        let generator = Generator::new(
            &api,
            GenOptions {
                required_namespaces: vec!["files".to_string()],
                ..Default::default()
            },
        );
        let out = generator.emit_mod_file(&["files"]);
        assert!(out.contains("pub mod files;"));
        assert!(!out.contains("if_feature!"));
    }

    #[test]
    fn root_mod_defines_the_field_eater() {
        let api = api_with_error_union();
        let generator = Generator::new(&api, GenOptions::default());
        let out = generator.emit_root_mod();
        assert!(out.contains("pub(crate) fn eat_json_fields"));
        assert!(out.contains("next_entry::<&str, ::serde_json::Value>()"));
    }
}
