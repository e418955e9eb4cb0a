/* Doc-string emission.
 *
 * IR doc strings carry inline cross references written as :tag:`value`,
 * where the tag is one of route, field, type, link or val. These are
 * rewritten to rustdoc links resolved through the registry; anything that
 * fails to resolve degrades to inline code rather than a broken link.
 */

use idl_types::{ResolvedDef, Struct, Union};

use super::Generator;
use crate::names;
use crate::writer::CodeWriter;

/// The type whose documentation is being emitted; relative `:field:` refs
/// resolve against it.
#[derive(Clone, Copy)]
pub(super) enum DocHost<'a> {
    None,
    Struct(&'a Struct),
    Union(&'a Union),
}

/// Whether the text contains any cross-reference markup. Used to decide if a
/// doc line can serve as a Display message verbatim.
pub(super) fn has_doc_refs(text: &str) -> bool {
    let mut rest = text;
    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        if let Some(close) = after.find(':') {
            let tag = &after[..close];
            if !tag.is_empty()
                && tag.chars().all(|c| c.is_ascii_alphabetic())
                && after[close + 1..].starts_with('`')
                && after[close + 2..].contains('`')
            {
                return true;
            }
        }
        rest = &rest[start + 1..];
    }
    false
}

impl<'a> Generator<'a> {
    pub(super) fn emit_doc(
        &self,
        w: &mut CodeWriter,
        doc: Option<&str>,
        prefix: &str,
        current_ns: &str,
        host: DocHost<'_>,
    ) {
        let Some(doc) = doc else { return };
        for (idx, chunk) in doc.split("\n\n").enumerate() {
            if idx != 0 {
                w.emit(prefix);
            }
            let processed = self.process_doc(current_ns, host, chunk);
            w.emit_wrapped(&processed, &format!("{} ", prefix), 100);
        }
    }

    /// Rewrite every :tag:`value` reference in the text.
    pub(super) fn process_doc(&self, current_ns: &str, host: DocHost<'_>, text: &str) -> String {
        let mut out = String::new();
        let mut rest = text;
        while let Some(start) = rest.find(':') {
            let (before, candidate) = rest.split_at(start);
            let parsed = parse_ref(candidate);
            match parsed {
                Some((tag, val, consumed)) => {
                    out.push_str(before);
                    out.push_str(&self.doc_ref(current_ns, host, tag, val));
                    rest = &candidate[consumed..];
                }
                None => {
                    out.push_str(before);
                    out.push(':');
                    rest = &candidate[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn doc_ref(&self, current_ns: &str, host: DocHost<'_>, tag: &str, val: &str) -> String {
        match tag {
            "route" => self.route_ref(current_ns, val),
            "field" => self.field_ref(current_ns, host, val),
            "type" => self.type_ref(current_ns, val),
            "link" => match val.rsplit_once(' ') {
                Some((title, url)) => format!("[{}]({})", title, url),
                None => format!("`{}`", val),
            },
            "val" => {
                if val == "null" {
                    "`None`".to_string()
                } else {
                    format!("`{}`", val)
                }
            }
            _ => format!("`{}`", val),
        }
    }

    fn route_ref(&self, current_ns: &str, val: &str) -> String {
        let (val, version) = match val.split_once(':') {
            Some((v, vstr)) => (v, vstr.parse().unwrap_or(1)),
            None => (val, 1),
        };
        let (ns, route) = match val.split_once('.') {
            Some((ns, route)) => (ns, route),
            None => (current_ns, val),
        };
        let rust_fn = names::route_name(route, version);
        let label = if ns != current_ns {
            format!("{}::{}", ns, rust_fn)
        } else {
            rust_fn.clone()
        };
        let target = format!("crate::sync_routes::{}::{}", names::namespace_name(ns), rust_fn);
        format!("[`{}()`]({})", label, target)
    }

    fn field_ref(&self, current_ns: &str, host: DocHost<'_>, val: &str) -> String {
        if let Some((type_name, field)) = val.rsplit_once('.') {
            let Some(def) = self.registry.get(current_ns, type_name) else {
                return format!("`{}`", val);
            };
            let rust_name = self.def_type_name(current_ns, current_ns, def);
            match def {
                ResolvedDef::Union(_) => {
                    let variant = names::variant_name(field);
                    format!("[`{}::{}`]({}::{})", rust_name, variant, rust_name, variant)
                }
                ResolvedDef::Struct(s) if s.has_enumerated_subtypes() => {
                    if s.fields.iter().any(|f| f.name == field) {
                        // A field common to every subtype; rustdoc cannot link
                        // to a field, and we are already on that page.
                        format!("`{}`", names::field_name(field))
                    } else {
                        let variant = names::variant_name(field);
                        format!("[`{}::{}`]({}::{})", rust_name, variant, rust_name, variant)
                    }
                }
                ResolvedDef::Struct(_) => {
                    let field = names::field_name(field);
                    // No way to link to the field itself, link the struct.
                    format!("[`{}::{}`]({})", rust_name, field, rust_name)
                }
                ResolvedDef::Alias(_) => format!("`{}`", val),
            }
        } else {
            // Relative to the type currently being documented.
            match host {
                DocHost::Union(u) => {
                    let type_name = names::enum_name(&u.name);
                    let variant = names::variant_name(val);
                    format!("[`{}`]({}::{})", variant, type_name, variant)
                }
                DocHost::Struct(s) if s.has_enumerated_subtypes() => {
                    let type_name = names::enum_name(&s.name);
                    let variant = names::variant_name(val);
                    format!("[`{}`]({}::{})", variant, type_name, variant)
                }
                _ => format!("`{}`", names::field_name(val)),
            }
        }
    }

    fn type_ref(&self, current_ns: &str, val: &str) -> String {
        if let Some((ns, type_name)) = val.split_once('.') {
            let Some((def_ns, def)) = self.registry.get(ns, type_name).map(|def| (ns, def)) else {
                return format!("`{}`", val);
            };
            let rust_name = self.def_type_name(def_ns, def_ns, def);
            let full_name = self.def_type_name("", def_ns, def);
            format!("[`{}::{}`]({})", ns, rust_name, full_name)
        } else {
            match self.registry.get(current_ns, val) {
                Some(def) => {
                    let rust_name = self.def_type_name(current_ns, current_ns, def);
                    format!("[`{}`]({})", rust_name, rust_name)
                }
                None => format!("`{}`", val),
            }
        }
    }
}

/// Parse a leading `:tag:`value`` reference. Returns the tag, the value, and
/// the byte length consumed.
fn parse_ref(text: &str) -> Option<(&str, &str, usize)> {
    let rest = text.strip_prefix(':')?;
    let close = rest.find(':')?;
    let tag = &rest[..close];
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let after_tag = &rest[close + 1..];
    let val_body = after_tag.strip_prefix('`')?;
    let end = val_body.find('`')?;
    let val = &val_body[..end];
    // 1 (leading ':') + tag + ':' + '`' + val + '`'
    Some((tag, val, 1 + close + 1 + 1 + end + 1))
}
