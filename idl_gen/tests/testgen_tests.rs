/* Test Synthesis Tests
 *
 * End-to-end checks over the synthesized test suite: parse an IR document,
 * run the test generator, and assert on the reference JSON, the leaf
 * assertions and the route exercises it emits.
 */

use idl_gen::codegen::GeneratedFile;
use idl_gen::testgen::{TestGenOptions, TestGenerator};
use idl_types::{Api, TypeRegistry};

/* Helper to run the test generator over an inline IR document */
fn generate_tests(yaml: &str) -> Vec<GeneratedFile> {
    let de = serde_yml::Deserializer::from_str(yaml);
    let api: Api = serde_yml::with::singleton_map_recursive::deserialize(de)
        .expect("Failed to parse IR YAML");
    let registry = TypeRegistry::new(&api);
    let generator = TestGenerator::new(
        &api,
        &registry,
        TestGenOptions {
            crate_name: "my_sdk".to_string(),
            required_namespaces: vec![],
        },
    );
    generator.generate().expect("Test generation should succeed")
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
fn test_struct_case_decodes_every_field() {
    let files = generate_tests(ACCOUNT_IR);
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_Account()"));
    assert!(
        out.contains(r##"let json = r#"{"name":"something","active":true,"path":"something"}"#;"##),
        "Fully-populated reference JSON missing"
    );
    assert!(out.contains(
        "let x = ::serde_json::from_str::<::my_sdk::types::files::Account>(json).unwrap();"
    ));
    assert!(out.contains(r##"assert_eq!(x.name.as_str(), r#"something"#);"##));
    assert!(out.contains("assert_eq!(x.active, true);"));
    assert!(out.contains(r##"assert_eq!((*x.path.as_ref().unwrap()).as_str(), r#"something"#);"##));
    assert!(out.contains("assert_eq!(x, x.clone());"));
    assert!(
        out.contains("let json2 = ::serde_json::to_string(&x).unwrap();"),
        "Serializable cases must round-trip through the generated serializer"
    );
    assert!(out.contains("assert_eq!(x, x2);"));
}

#[test]
fn test_required_fields_twin_asserts_absence_and_defaults() {
    let files = generate_tests(ACCOUNT_IR);
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_Account_OnlyRequiredFields()"));
    assert!(
        out.contains(r##"let json = r#"{"name":"something"}"#;"##),
        "The twin's reference JSON must omit every optional field"
    );
    assert!(
        out.contains("assert_eq!(x.active, false);"),
        "Omitted defaulted fields assert the declared default"
    );
    assert!(
        out.contains("assert!(x.path.is_none());"),
        "Omitted nullable fields assert None"
    );
}

#[test]
fn test_leaf_values_honor_declared_bounds() {
    let files = generate_tests(
        r#"
namespaces:
  - name: "files"
    types:
      - struct:
          name: "Stats"
          fields:
            - name: "count"
              data-type:
                int32:
                  max-value: 500
            - name: "ratio"
              data-type:
                float64: {}
            - name: "when"
              data-type:
                timestamp:
                  format: "%Y-%m-%dT%H:%M:%SZ"
            - name: "blob"
              data-type: bytes
"#,
    );
    let out = file(&files, "files.rs");

    assert!(out.contains(r#""count":500"#), "Declared maximum should be used");
    assert!(out.contains("assert_eq!(x.count, 500);"));
    assert!(out.contains(r#""ratio":1e307"#));
    assert!(out.contains("assert_eq!(x.ratio, 1e307);"));
    assert!(
        out.contains(r#""when":"2242-03-16T12:56:31Z""#),
        "Timestamps render the fixed instant through the declared format"
    );
    assert!(out.contains("assert_eq!(x.when.as_str(), \"2242-03-16T12:56:31Z\");"));
    assert!(out.contains(r#""blob":[0,1,2,3,4,5]"#));
    assert!(out.contains("assert_eq!(&x.blob, &[0, 1, 2, 3, 4, 5]);"));
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
"#;

#[test]
fn test_union_cases_cover_every_variant() {
    let files = generate_tests(UNION_IR);
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_WriteMode_Add()"));
    assert!(out.contains("fn test_WriteMode_Update()"));
    assert!(out.contains("fn test_WriteMode_Other()"));
    assert!(out.contains(r##"let json = r#"{".tag":"add"}"#;"##));
    assert!(
        out.contains(r##"let json = r#"{".tag":"update","update":"something"}"#;"##),
        "Primitive payloads nest under the variant key"
    );
    assert!(out.contains("::my_sdk::types::files::WriteMode::Add => (),"));
    assert!(
        out.contains("_ => panic!(\"wrong variant\"),"),
        "Variant asserts need a wildcard arm when other variants exist"
    );
}

#[test]
fn test_catch_all_case_uses_a_bogus_tag_and_refuses_reencoding() {
    let files = generate_tests(UNION_IR);
    let out = file(&files, "files.rs");

    assert!(
        out.contains(r##"let json = r#"{".tag":"idl-gen-bogus-test-variant"}"#;"##),
        "The catch-all case must decode an unrecognized tag, not the declared one"
    );
    assert!(out.contains("assert!(::serde_json::to_string(&x).is_err());"));
}

#[test]
fn test_polymorphic_subtype_cases_hoist_their_fields() {
    let files = generate_tests(
        r#"
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
"#,
    );
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_Metadata_File()"));
    assert!(out.contains("fn test_Metadata_Folder()"));
    assert!(out.contains(
        r##"let json = r#"{".tag":"file","name":"something","size":18446744073709551615}"#;"##
    ));
    assert!(out.contains("::my_sdk::types::files::Metadata::File(ref v) => {"));
    assert!(out.contains(r##"assert_eq!((*v).name.as_str(), r#"something"#);"##));
    assert!(out.contains("assert_eq!((*v).size, 18446744073709551615);"));
}

#[test]
fn test_tag_ref_defaults_elide_and_assert_the_variant() {
    let files = generate_tests(
        r#"
namespaces:
  - name: "files"
    types:
      - union:
          name: "Visibility"
          closed: true
          variants:
            - name: "public"
            - name: "private"
      - struct:
          name: "Policy"
          fields:
            - name: "visibility"
              data-type:
                ref: {name: "Visibility"}
              default:
                tag-ref:
                  union: {name: "Visibility"}
                  tag: "public"
"#,
    );
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_Policy()"));
    assert!(
        out.contains(r##"let json = r#"{}"#;"##),
        "A field matching its tag-ref default must be elided"
    );
    assert!(out.contains("::my_sdk::types::files::Visibility::Public => (),"));
    assert!(
        out.contains("fn test_ClosedUnion_Visibility()"),
        "Closed unions also get the exhaustive-match test"
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
"#;

#[test]
fn test_route_cases_decode_an_arg_and_expect_the_transport_error() {
    let files = generate_tests(ROUTES_IR);
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_route_get_metadata()"));
    assert!(out.contains(
        r##"let arg: ::my_sdk::types::files::Account = ::serde_json::from_str(r#"{"name":"something"}"#).unwrap();"##
    ));
    assert!(out.contains(
        "let ret: Result<::my_sdk::types::files::Account, \
         ::my_sdk::Error<::my_sdk::types::files::LookupError>> ="
    ));
    assert!(out.contains("::my_sdk::sync_routes::files::get_metadata("));
    assert!(out.contains("&super::noop_client::user::Client,"));
    assert!(out.contains("&arg,"));
    assert!(out.contains("assert!(matches!(ret, Err(::my_sdk::Error::HttpClient(..))));"));
}

#[test]
fn test_app_user_routes_get_a_twin_against_the_app_client() {
    let files = generate_tests(ROUTES_IR);
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_route_whoami()"));
    assert!(out.contains("fn test_route_whoami_app_auth()"));
    assert!(out.contains("&super::noop_client::app::Client,"));
}

#[test]
fn test_download_routes_pass_ranges_and_wrap_the_result() {
    let files = generate_tests(ROUTES_IR);
    let out = file(&files, "files.rs");

    assert!(out.contains("fn test_route_fetch()"));
    assert!(out.contains(
        "::my_sdk::client_trait::HttpRequestResult<::my_sdk::types::files::Account>"
    ));
    assert!(out.contains("None,"));
}
