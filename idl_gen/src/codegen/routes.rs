/* Route-function emission, sync and async flavors.
 *
 * Each route becomes one free function taking a client implementing the
 * auth marker trait the route's `auth` attribute selects. The functions
 * target the runtime crate's client helpers; there is no HTTP logic here.
 */

use idl_types::{Host, Namespace, Route, Style};

use super::docs::DocHost;
use super::Generator;
use crate::errors::{GenError, GenResult};
use crate::names;
use crate::writer::CodeWriter;

impl<'a> Generator<'a> {
    pub(super) fn emit_route(
        &self,
        w: &mut CodeWriter,
        ns: &'a Namespace,
        route: &'a Route,
        auth_trait: Option<String>,
        as_async: bool,
    ) -> GenResult<()> {
        let crate_path = self.crate_path().to_string();
        let mut route_name = names::route_name(&route.name, route.version);
        let endpoint = match route.attrs.host {
            Host::Api => format!("{}::client_trait_common::Endpoint::Api", crate_path),
            Host::Content => format!("{}::client_trait_common::Endpoint::Content", crate_path),
            Host::Notify => format!("{}::client_trait_common::Endpoint::Notify", crate_path),
        };

        let trait_mod = if as_async { "async_client_trait" } else { "client_trait" };
        let auth_trait = match auth_trait {
            Some(t) => t,
            None => {
                let mut auths: Vec<&str> =
                    route.attrs.auth.split(',').map(str::trim).collect();
                auths.sort_unstable();
                match auths.as_slice() {
                    ["user"] => format!("{}::{}::UserAuthClient", crate_path, trait_mod),
                    ["team"] => format!("{}::{}::TeamAuthClient", crate_path, trait_mod),
                    ["app"] => format!("{}::{}::AppAuthClient", crate_path, trait_mod),
                    ["app", "user"] => {
                        // There is no marker trait for user-or-app auth, so
                        // emit two functions, one per trait.
                        self.emit_route(
                            w,
                            ns,
                            route,
                            Some(format!("{}::{}::UserAuthClient", crate_path, trait_mod)),
                            as_async,
                        )?;
                        route_name.push_str("_app_auth");
                        format!("{}::{}::AppAuthClient", crate_path, trait_mod)
                    }
                    ["noauth"] => format!("{}::{}::NoauthClient", crate_path, trait_mod),
                    _ => {
                        return Err(GenError::UnsupportedAuth {
                            namespace: ns.name.clone(),
                            route: route_name,
                            auth: route.attrs.auth.clone(),
                        });
                    }
                }
            }
        };

        self.emit_doc(w, route.doc.as_deref(), "///", &ns.name, DocHost::None);

        if route.attrs.is_preview {
            if route.doc.is_some() {
                w.emit("///");
            }
            w.emit("/// # Stability");
            w.emit("/// *PREVIEW*: This function may change or disappear without notice.");
            w.emit("#[cfg(feature = \"unstable\")]");
            w.emit("#[cfg_attr(docsrs, doc(cfg(feature = \"unstable\")))]");
        }

        if let Some(deprecation) = &route.deprecated {
            match &deprecation.by {
                Some(successor) => w.emit(&format!(
                    "#[deprecated(note = \"replaced by {}\")]",
                    names::route_name(&successor.name, successor.version)
                )),
                None => w.emit("#[deprecated]"),
            }
        }

        let arg_void = route.arg.is_void();
        let arg_type = self.rust_type(&ns.name, &route.arg)?;
        let ret_type = self.rust_type(&ns.name, &route.result)?;
        let error_type = if route.error.is_void() {
            format!("{}::NoError", crate_path)
        } else {
            self.rust_type(&ns.name, &route.error)?
        };
        let access = if as_async { "pub async" } else { "pub" };
        let wire_path = format!("\"{}/{}\"", ns.name, route.wire_name());
        let client_arg = format!("client: &impl {}", auth_trait);
        let arg_arg = format!("arg: &{}", arg_type);
        let style_path = |style: &str| format!("{}::client_trait_common::Style::{}", crate_path, style);

        match route.attrs.style {
            Style::Rpc => {
                let mut args = vec![client_arg.clone()];
                if !arg_void {
                    args.push(arg_arg.clone());
                }
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                let call_args = vec![
                    "client".to_string(),
                    endpoint.clone(),
                    style_path("Rpc"),
                    wire_path.clone(),
                    if arg_void { "&()".to_string() } else { "arg".to_string() },
                    "None".to_string(),
                ];
                w.emit_fn(
                    access,
                    &route_name,
                    &arg_refs,
                    Some(&format!("Result<{}, {}::Error<{}>>", ret_type, crate_path, error_type)),
                    |w| {
                        let request = format!("{}::client_helpers::request", crate_path);
                        if as_async {
                            emit_call(w, &request, &call_args, ".await");
                        } else {
                            w.block_with(
                                &format!("{}::client_helpers::unwrap_async(", crate_path),
                                ("", ")"),
                                |w| emit_call(w, &request, &call_args, ""),
                            );
                        }
                    },
                );
            }
            Style::Download => {
                let mut args = vec![client_arg.clone()];
                if !arg_void {
                    args.push(arg_arg.clone());
                }
                args.push("range_start: Option<u64>".to_string());
                args.push("range_end: Option<u64>".to_string());
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                let call_args = vec![
                    "client".to_string(),
                    endpoint.clone(),
                    style_path("Download"),
                    wire_path.clone(),
                    if arg_void { "&()".to_string() } else { "arg".to_string() },
                    "None".to_string(),
                    "range_start".to_string(),
                    "range_end".to_string(),
                ];
                let ret = format!(
                    "Result<{}::{}::HttpRequestResult<{}>, {}::Error<{}>>",
                    crate_path, trait_mod, ret_type, crate_path, error_type
                );
                w.emit_fn(access, &route_name, &arg_refs, Some(&ret), |w| {
                    let request = format!("{}::client_helpers::request_with_body", crate_path);
                    if as_async {
                        emit_call(w, &request, &call_args, ".await");
                    } else {
                        w.block_with(
                            &format!("{}::client_helpers::unwrap_async_body(", crate_path),
                            ("", ")"),
                            |w| {
                                emit_call(w, &request, &call_args, ",");
                                w.emit("client,");
                            },
                        );
                    }
                });
            }
            Style::Upload => {
                let mut args = vec![client_arg.clone()];
                if !arg_void {
                    args.push(arg_arg.clone());
                }
                args.push(if as_async {
                    "body: bytes::Bytes".to_string()
                } else {
                    "body: &[u8]".to_string()
                });
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                let call_args = vec![
                    "client".to_string(),
                    endpoint.clone(),
                    style_path("Upload"),
                    wire_path.clone(),
                    if arg_void { "&()".to_string() } else { "arg".to_string() },
                    format!("Some({}::client_helpers::Body::from(body))", crate_path),
                ];
                w.emit_fn(
                    access,
                    &route_name,
                    &arg_refs,
                    Some(&format!("Result<{}, {}::Error<{}>>", ret_type, crate_path, error_type)),
                    |w| {
                        let request = format!("{}::client_helpers::request", crate_path);
                        if as_async {
                            emit_call(w, &request, &call_args, ".await");
                        } else {
                            w.block_with(
                                &format!("{}::client_helpers::unwrap_async(", crate_path),
                                ("", ")"),
                                |w| emit_call(w, &request, &call_args, ""),
                            );
                        }
                    },
                );
            }
        }
        w.blank();
        Ok(())
    }
}

/// A function call, wrapped to one argument per line when it gets long.
fn emit_call(w: &mut CodeWriter, func: &str, args: &[String], end: &str) {
    let one_line = format!("{}({}){}", func, args.join(", "), end);
    if one_line.len() < 100 {
        w.emit(&one_line);
        return;
    }
    w.emit(&format!("{}(", func));
    w.indented(|w| {
        for (i, arg) in args.iter().enumerate() {
            if i + 1 < args.len() {
                w.emit(&format!("{},", arg));
            } else {
                w.emit(&format!("{}){}", arg, end));
            }
        }
    });
}
