/* Naming & type-mapping layer.
 *
 * This is the single source of truth for generated identifiers. The codec
 * generator and the test synthesizer both go through these functions; any
 * divergence between the two would miscompile the generated crate.
 */

use crate::errors::{GenError, GenResult};
use idl_types::{DataType, ResolvedDef, TypeRegistry};

/* Rust reserved words that can never be used as bare identifiers */
pub const RUST_RESERVED_WORDS: &[&str] = &[
    "abstract", "alignof", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "offsetof", "override", "priv",
    "proc", "pub", "pure", "ref", "return", "Self", "self", "sizeof", "static", "struct", "super",
    "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where",
    "while", "yield",
];

/* Prelude names we avoid shadowing with generated type names */
pub const RUST_GLOBAL_NAMESPACE: &[&str] = &[
    "Copy", "Send", "Sized", "Sync", "Drop", "Fn", "FnMut", "FnOnce", "drop", "Box", "ToOwned",
    "Clone", "PartialEq", "PartialOrd", "Eq", "Ord", "AsRef", "AsMut", "Into", "From", "Default",
    "Iterator", "Extend", "IntoIterator", "DoubleEndedIterator", "ExactSizeIterator", "Option",
    "Some", "None", "Result", "Ok", "Err", "String", "ToString", "Vec",
];

fn is_reserved(name: &str) -> bool {
    RUST_RESERVED_WORDS.contains(&name)
}

fn is_global(name: &str) -> bool {
    RUST_GLOBAL_NAMESPACE.contains(&name)
}

/// Split an IR name into words at delimiters and camel-case boundaries.
/// `"GetMetadataArg"` and `"get_metadata_arg"` both yield
/// `["Get", "Metadata", "Arg"]`-shaped word lists (original casing kept).
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '/' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let prev = if i > 0 { chars.get(i - 1) } else { None };
        let next = chars.get(i + 1);
        let lower_to_upper =
            c.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
        // "HTTPError" splits before the 'E': upper followed by lower, after an upper run.
        let acronym_end = c.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_uppercase())
            && next.is_some_and(|n| n.is_ascii_lowercase());
        if (lower_to_upper || acronym_end) && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `some_name` / `SomeName` -> `SomeName`
pub fn fmt_pascal(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &cs.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// `SomeName` / `some_name` -> `some_name`
pub fn fmt_snake(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// `SomeName` -> `SOME_NAME` (used for generated field-list constants)
pub fn fmt_shouting_snake(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn namespace_name(name: &str) -> String {
    let name = fmt_snake(name);
    if is_reserved(&name) || is_global(&name) {
        format!("ns_{}", name)
    } else {
        name
    }
}

pub fn struct_name(name: &str) -> String {
    let name = fmt_pascal(name);
    if is_reserved(&name) || is_global(&name) {
        name + "Struct"
    } else {
        name
    }
}

/// Name for a union, or for a struct with enumerated subtypes (which is
/// emitted as a Rust enum).
pub fn enum_name(name: &str) -> String {
    let name = fmt_pascal(name);
    if is_reserved(&name) || is_global(&name) {
        name + "Union"
    } else {
        name
    }
}

pub fn field_name(name: &str) -> String {
    let name = fmt_snake(name);
    if is_reserved(&name) {
        name + "_field"
    } else {
        name
    }
}

pub fn variant_name(name: &str) -> String {
    let name = fmt_pascal(name);
    if is_reserved(&name) {
        name + "Variant"
    } else {
        name
    }
}

/// Route function name. The version suffix is applied before the collision
/// check so `foo` v2 becomes `foo_v2` (and a hypothetical reserved result
/// would get the `do_` prefix after that).
pub fn route_name(name: &str, version: u32) -> String {
    let mut name = fmt_snake(name);
    if version > 1 {
        name = format!("{}_v{}", name, version);
    }
    if is_reserved(&name) {
        format!("do_{}", name)
    } else {
        name
    }
}

pub fn alias_name(name: &str) -> String {
    let name = fmt_pascal(name);
    if is_reserved(&name) || is_global(&name) {
        name + "Alias"
    } else {
        name
    }
}

/// Map an IR data type to a Rust type expression.
///
/// User-defined references are qualified as `<crate_path>::types::<ns>::<Name>`
/// unless they live in `current_ns` or `no_qualify` is set (doc links use the
/// unqualified form). `crate_path` is `"crate"` in generated SDK code and the
/// SDK crate name in generated tests.
pub fn rust_type(
    registry: &TypeRegistry<'_>,
    current_ns: &str,
    data_type: &DataType,
    no_qualify: bool,
    crate_path: &str,
) -> GenResult<String> {
    rust_type_q(
        registry,
        current_ns,
        data_type,
        if no_qualify { Qualify::Never } else { Qualify::CrossNamespace },
        crate_path,
    )
}

/// Like [`rust_type`] but qualifying every user-defined reference, including
/// same-namespace ones. Generated tests live outside the SDK module tree and
/// need full paths throughout.
pub fn rust_type_fq(
    registry: &TypeRegistry<'_>,
    current_ns: &str,
    data_type: &DataType,
    crate_path: &str,
) -> GenResult<String> {
    rust_type_q(registry, current_ns, data_type, Qualify::Always, crate_path)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Qualify {
    Never,
    CrossNamespace,
    Always,
}

fn rust_type_q(
    registry: &TypeRegistry<'_>,
    current_ns: &str,
    data_type: &DataType,
    qualify: Qualify,
    crate_path: &str,
) -> GenResult<String> {
    let q = |ns: &str, name: String| match qualify {
        Qualify::Never => name,
        Qualify::CrossNamespace if ns == current_ns => name,
        _ => format!("{}::types::{}::{}", crate_path, namespace_name(ns), name),
    };
    Ok(match data_type {
        DataType::Void => "()".to_string(),
        DataType::Boolean => "bool".to_string(),
        DataType::Int32(_) => "i32".to_string(),
        DataType::UInt32(_) => "u32".to_string(),
        DataType::Int64(_) => "i64".to_string(),
        DataType::UInt64(_) => "u64".to_string(),
        DataType::Float32(_) => "f32".to_string(),
        DataType::Float64(_) => "f64".to_string(),
        DataType::Str(_) => "String".to_string(),
        DataType::Bytes => "Vec<u8>".to_string(),
        DataType::Timestamp(_) => "String".to_string(),
        DataType::List(inner) => format!(
            "Vec<{}>",
            rust_type_q(registry, current_ns, inner, qualify, crate_path)?
        ),
        DataType::Map(map) => format!(
            "::std::collections::HashMap<{}, {}>",
            rust_type_q(registry, current_ns, &map.key, qualify, crate_path)?,
            rust_type_q(registry, current_ns, &map.value, qualify, crate_path)?
        ),
        DataType::Nullable(inner) => format!(
            "Option<{}>",
            rust_type_q(registry, current_ns, inner, qualify, crate_path)?
        ),
        DataType::Ref(r) => {
            let (def_ns, def) =
                registry
                    .resolve(current_ns, r)
                    .ok_or_else(|| GenError::UnresolvedTypeRef {
                        namespace: r.namespace.clone().unwrap_or_else(|| current_ns.to_string()),
                        name: r.name.clone(),
                    })?;
            match def {
                ResolvedDef::Struct(s) if s.has_enumerated_subtypes() => {
                    q(def_ns, enum_name(&s.name))
                }
                ResolvedDef::Struct(s) => q(def_ns, struct_name(&s.name)),
                ResolvedDef::Union(u) => q(def_ns, enum_name(&u.name)),
                ResolvedDef::Alias(a) => q(def_ns, alias_name(&a.name)),
            }
        }
    })
}
