use crate::types::*;
use indexmap::IndexMap;

/// A user-defined type looked up through the registry.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedDef<'a> {
    Struct(&'a Struct),
    Union(&'a Union),
    Alias(&'a Alias),
}

impl<'a> ResolvedDef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            ResolvedDef::Struct(s) => &s.name,
            ResolvedDef::Union(u) => &u.name,
            ResolvedDef::Alias(a) => &a.name,
        }
    }
}

/// A data type with aliases and nullability peeled off, classified for
/// dispatch. This is what wire-layout decisions are made against.
#[derive(Debug, Clone, Copy)]
pub enum UltimateType<'a> {
    /// Any non-reference data type (primitives, lists, maps).
    Primitive(&'a DataType),
    Struct(&'a str, &'a Struct),
    Union(&'a str, &'a Union),
}

/// Namespace → type-name → definition index over a read-only [`Api`].
///
/// Built once per generation run, before any emission pass reads it.
/// Iteration order follows namespace and type declaration order so that
/// output is deterministic.
pub struct TypeRegistry<'a> {
    namespaces: IndexMap<&'a str, IndexMap<&'a str, ResolvedDef<'a>>>,
}

impl<'a> TypeRegistry<'a> {
    pub fn new(api: &'a Api) -> Self {
        let mut namespaces = IndexMap::new();
        for ns in &api.namespaces {
            let mut types: IndexMap<&'a str, ResolvedDef<'a>> = IndexMap::new();
            for alias in &ns.aliases {
                types.insert(alias.name.as_str(), ResolvedDef::Alias(alias));
            }
            for typ in &ns.types {
                let def = match typ {
                    TypeDef::Struct(s) => ResolvedDef::Struct(s),
                    TypeDef::Union(u) => ResolvedDef::Union(u),
                };
                types.insert(typ.name(), def);
            }
            namespaces.insert(ns.name.as_str(), types);
        }
        Self { namespaces }
    }

    /// Look up a type by namespace and name.
    pub fn get(&self, namespace: &str, name: &str) -> Option<ResolvedDef<'a>> {
        self.namespaces.get(namespace)?.get(name).copied()
    }

    /// Resolve a type reference from the given namespace. Returns the
    /// namespace the definition lives in along with the definition.
    pub fn resolve(
        &self,
        current_ns: &'a str,
        type_ref: &TypeRef,
    ) -> Option<(&'a str, ResolvedDef<'a>)> {
        let ns = match &type_ref.namespace {
            Some(ns) => *self.namespaces.get_key_value(ns.as_str())?.0,
            None => current_ns,
        };
        Some((ns, self.namespaces.get(ns)?.get(type_ref.name.as_str()).copied()?))
    }

    /// Follow alias references until the result is not an alias. The
    /// returned data type may still be a reference to a struct or union, or
    /// a nullable wrapper. The upstream compiler guarantees alias chains are
    /// acyclic.
    pub fn unwrap_aliases(
        &self,
        current_ns: &'a str,
        data_type: &'a DataType,
    ) -> Option<(&'a str, &'a DataType)> {
        let mut ns = current_ns;
        let mut dt = data_type;
        loop {
            match dt {
                DataType::Ref(r) => match self.resolve(ns, r)? {
                    (alias_ns, ResolvedDef::Alias(alias)) => {
                        ns = alias_ns;
                        dt = &alias.data_type;
                    }
                    _ => return Some((ns, dt)),
                },
                _ => return Some((ns, dt)),
            }
        }
    }

    /// Peel aliases and nullability and classify what is underneath.
    pub fn ultimate(
        &self,
        current_ns: &'a str,
        data_type: &'a DataType,
    ) -> Option<UltimateType<'a>> {
        let (ns, dt) = self.unwrap_aliases(current_ns, data_type)?;
        let (dt, _) = dt.unwrap_nullable();
        let (ns, dt) = self.unwrap_aliases(ns, dt)?;
        match dt {
            DataType::Ref(r) => match self.resolve(ns, r)? {
                (def_ns, ResolvedDef::Struct(s)) => Some(UltimateType::Struct(def_ns, s)),
                (def_ns, ResolvedDef::Union(u)) => Some(UltimateType::Union(def_ns, u)),
                (_, ResolvedDef::Alias(_)) => None, // unwrap_aliases already followed these
            },
            other => Some(UltimateType::Primitive(other)),
        }
    }

    /// Whether the type is wire-tagged: a union, or a struct with enumerated
    /// subtypes.
    pub fn is_enum_type(&self, current_ns: &'a str, data_type: &'a DataType) -> bool {
        match self.ultimate(current_ns, data_type) {
            Some(UltimateType::Union(_, _)) => true,
            Some(UltimateType::Struct(_, s)) => s.has_enumerated_subtypes(),
            _ => false,
        }
    }

    /// Closed enumerations reject unknown tags: a closed union, or an
    /// enumerated-subtype struct without a catch-all.
    pub fn is_closed_enum(&self, current_ns: &'a str, data_type: &'a DataType) -> bool {
        match self.ultimate(current_ns, data_type) {
            Some(UltimateType::Union(_, u)) => u.closed,
            Some(UltimateType::Struct(_, s)) => s.has_enumerated_subtypes() && !s.catch_all,
            _ => false,
        }
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.namespaces.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_with_alias_chain() -> Api {
        Api {
            namespaces: vec![Namespace {
                name: "files".to_string(),
                doc: None,
                aliases: vec![
                    Alias {
                        name: "Path".to_string(),
                        doc: None,
                        data_type: DataType::Str(StringAttrs::default()),
                    },
                    Alias {
                        name: "PathAlias".to_string(),
                        doc: None,
                        data_type: DataType::Ref(TypeRef {
                            namespace: None,
                            name: "Path".to_string(),
                        }),
                    },
                ],
                types: vec![TypeDef::Struct(Struct {
                    name: "Metadata".to_string(),
                    doc: None,
                    fields: vec![],
                    parent: None,
                    subtypes: vec![],
                    catch_all: false,
                })],
                routes: vec![],
            }],
        }
    }

    #[test]
    fn resolves_through_alias_chains() {
        let api = api_with_alias_chain();
        let reg = TypeRegistry::new(&api);
        let dt = DataType::Ref(TypeRef {
            namespace: Some("files".to_string()),
            name: "PathAlias".to_string(),
        });
        let (ns, unwrapped) = reg.unwrap_aliases("files", &dt).unwrap();
        assert_eq!(ns, "files");
        assert!(matches!(unwrapped, DataType::Str(_)));
    }

    #[test]
    fn classifies_struct_refs() {
        let api = api_with_alias_chain();
        let reg = TypeRegistry::new(&api);
        let dt = DataType::Nullable(Box::new(DataType::Ref(TypeRef {
            namespace: None,
            name: "Metadata".to_string(),
        })));
        match reg.ultimate("files", &dt) {
            Some(UltimateType::Struct(ns, s)) => {
                assert_eq!(ns, "files");
                assert_eq!(s.name, "Metadata");
            }
            other => panic!("expected struct, got {:?}", other.is_some()),
        }
    }
}
