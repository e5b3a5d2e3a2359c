//! Naming utilities for model_sync
//!
//! Table names are derived through a [`NamingConvention`] so callers can
//! inject their own scheme; index names are built from a pattern and
//! truncated to what the target database accepts.

use inflector::Inflector;

use crate::config::{Dialect, NamingConfig};

/// Turns a model's declared table name into a database table name
pub trait NamingConvention: Send + Sync {
    fn table_name(&self, model_table: &str) -> String;
}

/// Strips namespaces, applies a case style and an optional prefix
#[derive(Debug, Clone, Default)]
pub struct DefaultNamingConvention {
    prefix: String,
    style: String,
}

impl DefaultNamingConvention {
    pub fn new(prefix: &str, style: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            style: style.to_string(),
        }
    }

    pub fn from_config(config: &NamingConfig) -> Self {
        Self::new(&config.table_prefix, &config.table_style)
    }
}

impl NamingConvention for DefaultNamingConvention {
    fn table_name(&self, model_table: &str) -> String {
        let bare = strip_namespace(model_table);
        format!("{}{}", self.prefix, apply_naming_convention(bare, &self.style))
    }
}

impl<F> NamingConvention for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn table_name(&self, model_table: &str) -> String {
        self(model_table)
    }
}

/// Drop everything up to the last `\` or `::` namespace separator
pub fn strip_namespace(name: &str) -> &str {
    let after_backslash = name.rsplit('\\').next().unwrap_or(name);
    after_backslash.rsplit("::").next().unwrap_or(after_backslash)
}

/// Apply a naming convention to a string
pub fn apply_naming_convention(name: &str, convention: &str) -> String {
    match convention {
        "snake_case" => name.to_snake_case(),
        "camel_case" => name.to_camel_case(),
        "pascal_case" => name.to_pascal_case(),
        "kebab_case" => name.to_kebab_case(),
        "screaming_snake_case" => name.to_screaming_snake_case(),
        _ => name.to_string(),
    }
}

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Get index name from table and columns according to pattern
pub fn get_index_name(pattern: &str, table_name: &str, columns: &[&str], dialect: Dialect) -> String {
    let columns_str = columns.join("_");

    let name = format_name(pattern, &[("table", table_name), ("columns", &columns_str)]);
    truncate_identifier(&name, get_max_identifier_length(dialect))
}

/// Truncate an identifier to fit database limits
pub fn truncate_identifier(name: &str, max_length: usize) -> String {
    if name.len() <= max_length {
        return name.to_string();
    }

    // Room for the underscore and an 8 character hash
    let keep_length = max_length.saturating_sub(9);
    let hash = format!("{:x}", md5::compute(name.as_bytes()));

    let mut cut = keep_length.min(name.len());
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}_{}", &name[..cut], &hash[0..8])
}

/// Get maximum identifier length for a dialect
pub fn get_max_identifier_length(dialect: Dialect) -> usize {
    match dialect {
        Dialect::Postgres => 63,
        Dialect::Mysql => 64,
        Dialect::Sqlite => 2048,
    }
}

/// Quote an identifier the way the dialect expects
pub fn quote_identifier(name: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Mysql => format!("`{}`", name.replace('`', "``")),
        Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
    }
}

/// Format name as a valid file name
pub fn format_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_naming_convention() {
        assert_eq!(apply_naming_convention("UserProfile", "snake_case"), "user_profile");
        assert_eq!(apply_naming_convention("user_profile", "pascal_case"), "UserProfile");
        assert_eq!(apply_naming_convention("UserProfile", "none"), "UserProfile");
    }

    #[test]
    fn test_default_convention() {
        let naming = DefaultNamingConvention::default();
        assert_eq!(naming.table_name("foo"), "foo");
        assert_eq!(naming.table_name("foo_lang"), "foo_lang");
        assert_eq!(naming.table_name("Vendor\\Module\\foo"), "foo");

        let prefixed = DefaultNamingConvention::new("ps_", "snake_case");
        assert_eq!(prefixed.table_name("BlogPost"), "ps_blog_post");
        assert_eq!(prefixed.table_name("blog::BlogPost"), "ps_blog_post");
    }

    #[test]
    fn test_closure_convention() {
        let upper = |name: &str| name.to_uppercase();
        assert_eq!(upper.table_name("foo"), "FOO");
    }

    #[test]
    fn test_index_name() {
        assert_eq!(
            get_index_name("uniq_{table}_{columns}", "foo_lang", &["id_foo", "id_lang"], Dialect::Mysql),
            "uniq_foo_lang_id_foo_id_lang"
        );
    }

    #[test]
    fn test_truncate_identifier() {
        let long_name = "uniq_a_really_long_localization_table_name_id_something_id_lang_id_shop";
        let truncated = truncate_identifier(long_name, 63);

        assert_eq!(truncated.len(), 63);
        assert!(truncated.starts_with("uniq_a_really_long"));
        assert_eq!(truncate_identifier("short", 63), "short");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("foo", Dialect::Mysql), "`foo`");
        assert_eq!(quote_identifier("foo", Dialect::Postgres), "\"foo\"");
    }
}
