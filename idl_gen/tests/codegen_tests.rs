/* Codec Generation Tests
 *
 * End-to-end checks over the generated SDK sources: parse an IR document,
 * run the generator, and assert on the emitted data definitions, codec
 * impls, conversion adapters and route functions.
 */

use idl_gen::codegen::{GenOptions, GeneratedFile, Generator};
use idl_gen::errors::GenError;
use idl_types::Api;

/* Helper to parse an inline IR document */
fn parse_api(yaml: &str) -> Api {
    let de = serde_yml::Deserializer::from_str(yaml);
    serde_yml::with::singleton_map_recursive::deserialize(de)
        .expect("Failed to parse IR YAML")
}

/* Helper to run the generator over an inline IR document */
fn generate(yaml: &str) -> Vec<GeneratedFile> {
    let api = parse_api(yaml);
    let generator = Generator::new(&api, GenOptions::default());
    generator.generate().expect("Code generation should succeed")
}

fn file<'a>(files: &'a [GeneratedFile], path: &str) -> &'a str {
    files
        .iter()
        .find(|f| f.path == path)
        .unwrap_or_else(|| panic!("Missing generated file: {}", path))
        .contents
        .as_str()
}

const ACCOUNT_IR: &str = r#"
namespaces:
  - name: "files"
    aliases:
      - name: "DisplayName"
        data-type:
          str: {}
    types:
      - struct:
          name: "Account"
          fields:
            - name: "name"
              data-type:
                str: {}
            - name: "active"
              data-type: boolean
              default:
                bool: false
            - name: "path"
              data-type:
                nullable:
                  str: {}
"#;

#[test]
fn test_struct_definition_and_alias() {
    let files = generate(ACCOUNT_IR);
    let out = file(&files, "types/files.rs");

    assert!(
        out.contains("pub type DisplayName = String;"),
        "Alias should expand to a type synonym"
    );
    assert!(out.contains("pub struct Account {"), "Struct definition missing");
    assert!(out.contains("pub name: String,"));
    assert!(out.contains("pub active: bool,"));
    assert!(
        out.contains("pub path: Option<String>,"),
        "Nullable field should map to Option"
    );
    assert!(
        out.contains("#[non_exhaustive] // structs may have more fields added in the future."),
        "Structs should be non-exhaustive"
    );
}

#[test]
fn test_struct_deserializer_guards_and_resolution() {
    let files = generate(ACCOUNT_IR);
    let out = file(&files, "types/files.rs");

    assert!(
        out.contains("const ACCOUNT_FIELDS: &[&str] = &["),
        "Field-name table missing"
    );
    assert!(
        out.contains("return Err(::serde::de::Error::duplicate_field(\"name\"));"),
        "Duplicate keys must be rejected"
    );
    assert!(
        out.contains(
            "name: field_name.ok_or_else(|| ::serde::de::Error::missing_field(\"name\"))?,"
        ),
        "Missing required fields must error"
    );
    assert!(
        out.contains("active: field_active.unwrap_or(false),"),
        "Omitted defaulted fields must be refilled"
    );
    assert!(
        out.contains("path: field_path.and_then(Option::flatten),"),
        "Omitted nullable fields must resolve to None"
    );
    assert!(
        out.contains("Self::internal_deserialize_opt(map, false).map(Option::unwrap)"),
        "Structs with required fields delegate to the optional deserializer"
    );
    assert!(out.contains(
        "deserializer.deserialize_struct(\"Account\", ACCOUNT_FIELDS, StructVisitor)"
    ));
}

#[test]
fn test_struct_deserializer_eats_unknown_fields() {
    let files = generate(ACCOUNT_IR);
    let out = file(&files, "types/files.rs");

    assert!(
        out.contains("// unknown field allowed and ignored"),
        "Unknown fields should be tolerated"
    );
    assert!(out.contains("map.next_value::<::serde_json::Value>()?;"));
}

#[test]
fn test_struct_serializer_elides_defaults_and_none() {
    let files = generate(ACCOUNT_IR);
    let out = file(&files, "types/files.rs");

    assert!(
        out.contains("s.serialize_field(\"name\", &self.name)?;"),
        "Required fields serialize unconditionally"
    );
    assert!(
        out.contains("if self.active {"),
        "Default-valued fields need an elision guard"
    );
    assert!(out.contains("s.serialize_field(\"active\", &self.active)?;"));
    assert!(
        out.contains("if let Some(val) = &self.path {"),
        "None-valued nullable fields must be omitted"
    );
    assert!(out.contains("s.serialize_field(\"path\", val)?;"));
}

const UNION_IR: &str = r#"
namespaces:
  - name: "files"
    types:
      - union:
          name: "WriteMode"
          variants:
            - name: "add"
            - name: "update"
              data-type:
                str: {}
            - name: "other"
              catch-all: true
      - union:
          name: "SyncStatus"
          closed: true
          variants:
            - name: "idle"
            - name: "busy"
"#;

#[test]
fn test_open_union_tag_dispatch() {
    let files = generate(UNION_IR);
    let out = file(&files, "types/files.rs");

    assert!(out.contains("pub enum WriteMode {"));
    assert!(out.contains("Update(String),"));
    assert!(
        out.contains("#[non_exhaustive] // variants may be added in the future"),
        "Open unions should be non-exhaustive"
    );
    assert!(
        out.contains("Some(\".tag\") => map.next_value()?,"),
        "Deserialization must dispatch on the .tag discriminator"
    );
    assert!(out.contains("\"add\" => WriteMode::Add,"));
    assert!(
        out.contains("Some(\"update\") => WriteMode::Update(map.next_value()?),"),
        "Primitive payloads nest one level under the variant key"
    );
    assert!(
        out.contains("_ => WriteMode::Other,"),
        "Open unions map unknown tags to the catch-all"
    );
    assert!(
        out.contains("cannot serialize 'Other' variant"),
        "The catch-all variant must refuse serialization"
    );
}

#[test]
fn test_closed_union_rejects_unknown_tags() {
    let files = generate(UNION_IR);
    let out = file(&files, "types/files.rs");

    assert!(
        out.contains("_ => return Err(de::Error::unknown_variant(tag, VARIANTS))"),
        "Closed unions reject unknown tags"
    );
    assert!(
        !out.contains("SyncStatus::Other"),
        "Closed unions must not get a catch-all variant"
    );
}

#[test]
fn test_ambiguous_nullable_struct_payload_aborts() {
    /* A nullable struct payload with no required fields cannot be told apart
     * from an absent payload on the wire, so generation must fail. */
    let api = parse_api(
        r#"
namespaces:
  - name: "files"
    types:
      - struct:
          name: "Settings"
          fields:
            - name: "theme"
              data-type:
                nullable:
                  str: {}
      - union:
          name: "Pref"
          variants:
            - name: "settings"
              data-type:
                nullable:
                  ref: {name: "Settings"}
"#,
    );
    let generator = Generator::new(&api, GenOptions::default());
    let err = generator
        .generate()
        .expect_err("Ambiguous nullable struct payload should abort generation");
    assert!(
        matches!(&err, GenError::AmbiguousOptionalVariant { .. }),
        "Unexpected error: {}",
        err
    );
}

const ERROR_IR: &str = r#"
namespaces:
  - name: "files"
    types:
      - union:
          name: "BaseError"
          variants:
            - name: "not_found"
              doc: "File not found."
            - name: "other"
              catch-all: true
      - union:
          name: "LookupError"
          parent: {name: "BaseError"}
          variants:
            - name: "not_found"
              doc: "File not found."
            - name: "restricted"
            - name: "other"
              catch-all: true
"#;

#[test]
fn test_union_inheritance_emits_from_adapter() {
    let files = generate(ERROR_IR);
    let out = file(&files, "types/files.rs");

    assert!(out.contains("// union extends BaseError"));
    assert!(out.contains("impl From<BaseError> for LookupError {"));
    assert!(out.contains("BaseError::NotFound => LookupError::NotFound,"));
    assert!(
        out.contains("BaseError::Other => LookupError::Other,"),
        "Catch-all variants convert too"
    );
}

#[test]
fn test_error_unions_get_display_and_error_impls() {
    let files = generate(ERROR_IR);
    let out = file(&files, "types/files.rs");

    assert!(out.contains("impl ::std::error::Error for LookupError {"));
    assert!(out.contains("impl ::std::fmt::Display for LookupError {"));
    assert!(
        out.contains("f.write_str(\"File not found.\")"),
        "Display should prefer the variant's doc line"
    );
    assert!(
        out.contains("_ => write!(f, \"{:?}\", *self),"),
        "Undocumented variants fall back to the Debug rendering"
    );
}

const POLYMORPHIC_IR: &str = r#"
namespaces:
  - name: "files"
    types:
      - struct:
          name: "Metadata"
          fields:
            - name: "name"
              data-type:
                str: {}
          subtypes:
            - tag: "file"
              type-ref: {name: "FileMetadata"}
            - tag: "folder"
              type-ref: {name: "FolderMetadata"}
          catch-all: true
      - struct:
          name: "FileMetadata"
          parent: {name: "Metadata"}
          fields:
            - name: "name"
              data-type:
                str: {}
            - name: "size"
              data-type:
                u-int64: {}
      - struct:
          name: "FolderMetadata"
          parent: {name: "Metadata"}
          fields:
            - name: "name"
              data-type:
                str: {}
"#;

#[test]
fn test_polymorphic_struct_becomes_a_tagged_enum() {
    let files = generate(POLYMORPHIC_IR);
    let out = file(&files, "types/files.rs");

    assert!(out.contains("pub enum Metadata {"));
    assert!(out.contains("File(FileMetadata),"));
    assert!(
        out.contains("\"file\" => Ok(Metadata::File(FileMetadata::internal_deserialize(map)?)),"),
        "Subtype payloads hoist into the tagged object"
    );
    assert!(
        out.contains("Ok(Metadata::Other)"),
        "A catch-all parent accepts unknown subtype tags"
    );
    assert!(out.contains("s.serialize_field(\".tag\", \"file\")?;"));
}

#[test]
fn test_subtype_struct_converts_into_the_parent_enum() {
    let files = generate(POLYMORPHIC_IR);
    let out = file(&files, "types/files.rs");

    assert!(out.contains("// struct extends polymorphic struct Metadata"));
    assert!(out.contains("impl From<FileMetadata> for Metadata {"));
    assert!(out.contains("Metadata::File(subtype)"));
}

#[test]
fn test_struct_extension_projects_onto_the_parent() {
    let files = generate(
        r#"
namespaces:
  - name: "users"
    types:
      - struct:
          name: "BasicAccount"
          fields:
            - name: "email"
              data-type:
                str: {}
      - struct:
          name: "FullAccount"
          parent: {name: "BasicAccount"}
          fields:
            - name: "email"
              data-type:
                str: {}
            - name: "country"
              data-type:
                nullable:
                  str: {}
"#,
    );
    let out = file(&files, "types/users.rs");

    assert!(out.contains("// struct extends BasicAccount"));
    assert!(out.contains("impl From<FullAccount> for BasicAccount {"));
    assert!(
        out.contains("email: subtype.email,"),
        "Conversion projects the shared fields"
    );
}

const ROUTES_IR: &str = r#"
namespaces:
  - name: "files"
    types:
      - struct:
          name: "Account"
          fields:
            - name: "name"
              data-type:
                str: {}
      - union:
          name: "LookupError"
          variants:
            - name: "not_found"
            - name: "other"
              catch-all: true
    routes:
      - name: "get_metadata"
        arg:
          ref: {name: "Account"}
        result:
          ref: {name: "Account"}
        error:
          ref: {name: "LookupError"}
      - name: "get_metadata"
        version: 2
        result:
          ref: {name: "Account"}
      - name: "whoami"
        result:
          ref: {name: "Account"}
        attrs: {auth: "app,user"}
      - name: "fetch"
        arg:
          ref: {name: "Account"}
        result:
          ref: {name: "Account"}
        attrs: {style: download}
      - name: "old_get"
        deprecated:
          by: {name: "get_metadata"}
        result:
          ref: {name: "Account"}
      - name: "peek"
        attrs: {is-preview: true}
"#;

#[test]
fn test_rpc_route_signatures() {
    let files = generate(ROUTES_IR);
    let sync = file(&files, "sync_routes/files.rs");
    let asynch = file(&files, "async_routes/files.rs");

    assert!(sync.contains("pub fn get_metadata("));
    assert!(sync.contains("crate::client_trait::UserAuthClient"));
    assert!(
        sync.contains("crate::Error<LookupError>"),
        "Declared error types thread into the return type"
    );
    assert!(sync.contains("crate::client_helpers::unwrap_async("));
    assert!(sync.contains("\"files/get_metadata\""));
    assert!(
        sync.contains("pub fn get_metadata_v2("),
        "Revised routes get a version suffix"
    );
    assert!(sync.contains("\"files/get_metadata_v2\""));

    assert!(asynch.contains("pub async fn get_metadata("));
    assert!(asynch.contains("crate::async_client_trait::UserAuthClient"));
    assert!(asynch.contains(".await"));
}

#[test]
fn test_void_errors_use_the_no_error_type() {
    let files = generate(ROUTES_IR);
    let sync = file(&files, "sync_routes/files.rs");

    assert!(
        sync.contains("crate::Error<crate::NoError>"),
        "Routes without a declared error type are infallible at the API level"
    );
}

#[test]
fn test_app_user_auth_routes_split_into_two_functions() {
    let files = generate(ROUTES_IR);
    let sync = file(&files, "sync_routes/files.rs");

    assert!(sync.contains("pub fn whoami("));
    assert!(sync.contains("pub fn whoami_app_auth("));
    assert!(sync.contains("crate::client_trait::AppAuthClient"));
}

#[test]
fn test_download_routes_take_ranges_and_return_a_body() {
    let files = generate(ROUTES_IR);
    let sync = file(&files, "sync_routes/files.rs");

    assert!(sync.contains("range_start: Option<u64>,"));
    assert!(sync.contains("range_end: Option<u64>,"));
    assert!(sync.contains("crate::client_trait::HttpRequestResult<Account>"));
    assert!(sync.contains("crate::client_helpers::unwrap_async_body("));
}

#[test]
fn test_preview_and_deprecated_route_attributes() {
    let files = generate(ROUTES_IR);
    let sync = file(&files, "sync_routes/files.rs");

    assert!(sync.contains("#[deprecated(note = \"replaced by get_metadata\")]"));
    assert!(sync.contains("#[cfg(feature = \"unstable\")]"));
    assert!(sync.contains("/// *PREVIEW*: This function may change or disappear without notice."));
}
