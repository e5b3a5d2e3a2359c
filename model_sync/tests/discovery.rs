//! Tests for configuration loading and file-based model discovery

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

use model_sync::config::{self, Dialect, ModelsConfig};
use model_sync::models::{
    DefinitionTranslator, FileModelDiscovery, LogicalType, ModelDiscovery,
};
use model_sync::schema::SchemaSnapshotBuilder;
use model_sync::utils::naming::DefaultNamingConvention;
use model_sync::Error;

const FOO_TOML: &str = r#"
table = "foo"
primary = "id_foo"
multilang = true
multilang_shop = true

[fields.name]
type = 3
required = true
size = 64
lang = true

[fields.price]
type = "float"
validate = "isUnsignedFloat"
"#;

const BAR_JSON: &str = r#"{
    "table": "bar",
    "primary": "id_bar",
    "fields": {
        "position": { "type": 1, "required": true },
        "position": { "type": 3 },
        "date_add": { "type": 5 }
    }
}"#;

const BAZ_YAML: &str = "
table: baz
primary: id_baz
fields:
  active:
    type: bool
";

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// A models root with one `catalog` group
fn models_root() -> TempDir {
    let root = tempdir().unwrap();
    let group = root.path().join("catalog");
    fs::create_dir_all(&group).unwrap();

    write(&group, "foo.toml", FOO_TOML);
    write(&group, "bar.json", BAR_JSON);
    write(&group, "baz.yaml", BAZ_YAML);
    write(&group, "broken.json", "{ \"table\": ");
    write(&group, "index.toml", "table = \"index\"\nprimary = \"id\"\n");
    write(&group, "README.md", "# not a model");

    root
}

fn models_config(root: &Path) -> ModelsConfig {
    ModelsConfig {
        root: root.to_path_buf(),
        ..ModelsConfig::default()
    }
}

#[test]
fn test_discovers_supported_formats_in_file_name_order() {
    let root = models_root();
    let discovery = FileModelDiscovery::new(&models_config(root.path()), "catalog").unwrap();

    let definitions = discovery.discover().unwrap();

    let tables: Vec<&str> = definitions
        .iter()
        .filter_map(|d| d.table_name.as_deref())
        .collect();
    assert_eq!(tables, vec!["bar", "baz", "foo"]);
    assert!(definitions
        .iter()
        .all(|d| d.source.as_ref().map_or(false, |s| s.starts_with(root.path()))));
}

#[test]
fn test_parsed_definition_fields() {
    let root = models_root();
    let discovery = FileModelDiscovery::new(&models_config(root.path()), "catalog").unwrap();
    let definitions = discovery.discover().unwrap();

    let foo = definitions
        .iter()
        .find(|d| d.table_name.as_deref() == Some("foo"))
        .unwrap();
    assert!(foo.is_localized);
    assert!(foo.is_localized_per_store);

    let fields = foo.fields.as_ref().unwrap();
    let name = fields.iter().find(|f| f.name == "name").unwrap();
    assert_eq!(name.logical_type, Some(LogicalType::String));
    assert_eq!(name.size, Some(64));
    assert!(name.is_localized);

    let bar = definitions
        .iter()
        .find(|d| d.table_name.as_deref() == Some("bar"))
        .unwrap();
    let names: Vec<&str> = bar
        .fields
        .as_ref()
        .unwrap()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["position", "position", "date_add"]);
}

#[test]
fn test_discovered_definitions_translate() {
    let root = models_root();
    let discovery = FileModelDiscovery::new(&models_config(root.path()), "catalog").unwrap();
    let naming = DefaultNamingConvention::default();
    let translator = DefinitionTranslator::new(&naming);

    for definition in discovery.discover().unwrap() {
        let model = translator.translate(&definition).unwrap();

        if definition.table_name.as_deref() == Some("foo") {
            let lang = model.localization_table().unwrap();
            assert_eq!(lang.name, "foo_lang");
            assert_eq!(lang.column("name").unwrap().length, Some(64));
            assert_eq!(
                model.primary_table().column("price").unwrap().unsigned,
                Some(true)
            );
        }

        if definition.table_name.as_deref() == Some("bar") {
            let position = model.primary_table().column("position").unwrap();
            assert!(!position.nullable);
            assert_eq!(model.primary_table().columns.len(), 3);
        }
    }
}

#[test]
fn test_unexpected_type_values_are_reported_per_model() {
    let root = tempdir().unwrap();
    let group = root.path().join("catalog");
    fs::create_dir_all(&group).unwrap();
    write(
        &group,
        "decimal.json",
        r#"{"table": "decimal", "primary": "id_decimal", "fields": {"ratio": {"type": 1.5}}}"#,
    );
    write(
        &group,
        "flag.json",
        r#"{"table": "flag", "primary": "id_flag", "fields": {"on": {"type": true}}}"#,
    );
    write(&group, "foo.toml", FOO_TOML);

    let discovery = FileModelDiscovery::new(&models_config(root.path()), "catalog").unwrap();
    let definitions = discovery.discover().unwrap();
    assert_eq!(definitions.len(), 3);

    let naming = DefaultNamingConvention::default();
    let builder = SchemaSnapshotBuilder::new(DefinitionTranslator::new(&naming), None);
    let (target, failures) = builder.build_target(&definitions);

    assert_eq!(failures.len(), 2);
    assert!(failures[0].model.ends_with("decimal.json"));
    assert_eq!(failures[0].message, "Field type '1.5' is not supported");
    assert!(failures[1].model.ends_with("flag.json"));
    assert_eq!(failures[1].message, "Field type 'true' is not supported");

    let tables: Vec<&str> = target.tables.keys().map(String::as_str).collect();
    assert_eq!(tables, vec!["foo", "foo_lang"]);
}

#[test]
fn test_missing_group_directory() {
    let root = tempdir().unwrap();
    let discovery = FileModelDiscovery::new(&models_config(root.path()), "nope").unwrap();

    assert!(matches!(discovery.discover(), Err(Error::DiscoveryError(_))));
}

#[test]
fn test_invalid_exclude_pattern() {
    let config = ModelsConfig {
        exclude: vec!["a**".to_string()],
        ..ModelsConfig::default()
    };

    assert!(matches!(
        FileModelDiscovery::new(&config, "catalog"),
        Err(Error::ConfigError(_))
    ));
}

#[test]
fn test_load_config_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model_sync.toml");
    fs::write(
        &path,
        r#"
        [database]
        driver = "mariadb"
        url = "mysql://root@localhost/shop"

        [naming]
        table_prefix = "ps_"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = config::load_from_file(path.to_str().unwrap()).unwrap();

    assert_eq!(config.database.driver, Dialect::Mysql);
    assert_eq!(config.database.schema, None);
    assert_eq!(config.naming.table_prefix, "ps_");
    assert_eq!(config.naming.index_pattern, "uniq_{table}_{columns}");
    assert_eq!(config.models.exclude, vec!["index.*".to_string()]);
    assert!(config.schema.compare_unsigned);
    assert!(!config.migrations.dry_run);
    assert_eq!(config.logging.unwrap().format, "text");
}

#[test]
fn test_load_config_errors() {
    assert!(matches!(
        config::load_from_file("/nonexistent/model_sync.toml"),
        Err(Error::ConfigError(_))
    ));

    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[database]\ndriver = \"oracle\"\nurl = \"x\"\n").unwrap();
    assert!(matches!(
        config::load_from_file(path.to_str().unwrap()),
        Err(Error::ConfigError(_))
    ));
}
