/* Displayable-error emission for route error types and *Error unions.
 *
 * The Display text for a variant prefers the first line of its
 * documentation when that line carries no cross-reference markup, falling
 * back to the variant name plus a Debug rendering of its payload. Inner
 * error payloads chain through source() and render with their own Display.
 */

use idl_types::{DataType, Subtype, TypeRef, UnionVariant};

use super::docs::has_doc_refs;
use super::structs::escape_str;
use super::Generator;
use crate::errors::GenResult;
use crate::names;
use crate::writer::CodeWriter;

pub(super) enum DisplayPayload<'a> {
    /// A union variant's declared payload type (may be `Void`).
    Data(&'a DataType),
    /// An enumerated subtype's struct reference.
    Subtype(&'a TypeRef),
}

pub(super) struct DisplayVariant<'a> {
    pub name: &'a str,
    pub doc: Option<&'a str>,
    pub payload: DisplayPayload<'a>,
}

impl<'a> DisplayVariant<'a> {
    pub fn from_union_variant(v: &'a UnionVariant) -> Self {
        Self {
            name: &v.name,
            doc: v.doc.as_deref(),
            payload: DisplayPayload::Data(&v.data_type),
        }
    }

    pub fn from_subtype(s: &'a Subtype) -> Self {
        Self {
            name: &s.tag,
            doc: s.doc.as_deref(),
            payload: DisplayPayload::Subtype(&s.type_ref),
        }
    }
}

impl<'a> Generator<'a> {
    fn payload_is_error(&self, ns: &'a str, payload: &DisplayPayload<'a>) -> bool {
        match payload {
            DisplayPayload::Data(dt) => self.is_error_data_type(ns, dt),
            DisplayPayload::Subtype(r) => match self.registry.resolve(ns, r) {
                Some((def_ns, def)) => self.is_error_def(def_ns, def.name()),
                None => false,
            },
        }
    }

    pub(super) fn impl_error(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        type_name: &str,
        variants: &[DisplayVariant<'a>],
        closed: bool,
    ) -> GenResult<()> {
        let inner: Vec<&DisplayVariant<'_>> = variants
            .iter()
            .filter(|v| self.payload_is_error(ns, &v.payload))
            .collect();
        w.block(&format!("impl ::std::error::Error for {}", type_name), |w| {
            if inner.is_empty() {
                return;
            }
            w.emit_fn(
                "",
                "source",
                &["&self"],
                Some("Option<&(dyn ::std::error::Error + 'static)>"),
                |w| {
                    w.block("match self", |w| {
                        for variant in &inner {
                            w.emit(&format!(
                                "{}::{}(inner) => Some(inner),",
                                type_name,
                                names::variant_name(variant.name)
                            ));
                        }
                        if !closed || inner.len() != variants.len() {
                            w.emit("_ => None,");
                        }
                    });
                },
            );
        });
        w.blank();
        self.impl_display(w, ns, type_name, variants, closed);
        Ok(())
    }

    pub(super) fn impl_display(
        &self,
        w: &mut CodeWriter,
        ns: &'a str,
        type_name: &str,
        variants: &[DisplayVariant<'a>],
        closed: bool,
    ) {
        let mut arms: Vec<String> = Vec::new();
        let mut any_skipped = false;
        for variant in variants {
            let variant_name = names::variant_name(variant.name);
            let mut var_exp = format!("{}::{}", type_name, variant_name);
            let mut msg = String::new();
            if let Some(doc) = variant.doc {
                let first = doc.split('\n').next().unwrap_or("");
                // A line with doc references makes a poor display string.
                if !has_doc_refs(first) {
                    msg = first.to_string();
                }
            }

            let is_err = self.payload_is_error(ns, &variant.payload);
            let is_void = matches!(variant.payload, DisplayPayload::Data(dt) if dt.is_void());
            let is_nullable =
                matches!(variant.payload, DisplayPayload::Data(dt) if dt.is_nullable());
            let inner_fmt = if is_err {
                // chain to the inner error's own rendering
                "{}"
            } else if !is_void {
                if msg.is_empty() {
                    // No doc line; prefix the variant name for context.
                    msg = variant.name.to_string();
                }
                "{:?}"
            } else {
                ""
            };

            let mut args = "";
            if !inner_fmt.is_empty() {
                // A None payload prints without the trailing "None" noise.
                if is_nullable {
                    arms.push(format!(
                        "{}(None) => f.write_str(\"{}\"),",
                        var_exp,
                        escape_str(&msg)
                    ));
                    var_exp.push_str("(Some(inner))");
                } else {
                    var_exp.push_str("(inner)");
                }
                if msg.ends_with('.') {
                    msg.pop();
                }
                msg = escape_braces(&msg);
                if !msg.is_empty() {
                    msg.push_str(": ");
                }
                msg.push_str(inner_fmt);
                args = "inner";
            }

            if !msg.is_empty() {
                if args.is_empty() {
                    arms.push(format!(
                        "{} => f.write_str(\"{}\"),",
                        var_exp,
                        escape_str(&msg)
                    ));
                } else {
                    arms.push(format!(
                        "{} => write!(f, \"{}\", {}),",
                        var_exp,
                        escape_str(&msg),
                        args
                    ));
                }
            } else {
                any_skipped = true;
            }
        }

        w.block(&format!("impl ::std::fmt::Display for {}", type_name), |w| {
            w.emit_fn(
                "",
                "fmt",
                &["&self", "f: &mut ::std::fmt::Formatter<'_>"],
                Some("::std::fmt::Result"),
                |w| {
                    if arms.is_empty() {
                        w.emit("write!(f, \"{:?}\", *self)");
                        return;
                    }
                    w.block("match self", |w| {
                        for arm in &arms {
                            w.emit(arm);
                        }
                        if !closed || any_skipped {
                            w.emit("_ => write!(f, \"{:?}\", *self),");
                        }
                    });
                },
            );
        });
        w.blank();
    }
}

/// Double any braces so the text can serve as a `write!` format string.
fn escape_braces(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}
