use super::*;
use indoc::indoc;
use pgkeep_core::ConstraintKind;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use crate::StandardsError;

mod default_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_package_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.schema, "public");
        assert!(!settings.auto_standards.selective_fixing);
        assert!(!settings.auto_standards.enable_event_triggers);
        assert!(settings.performance.log_slow_operations);
        assert_eq!(settings.performance.slow_operation_threshold_ms, 1000);
        assert!(settings.performance.enable_statistics);
        assert_eq!(settings.performance.cache_duration_secs, 300);
        assert_eq!(settings.logging.channel, "daily");
        assert!(!settings.logging.log_success);
    }

    #[test]
    fn test_default_rules() {
        let settings = Settings::default();
        let patterns: Vec<_> = settings.table_validations.keys().cloned().collect();
        assert_eq!(patterns, vec!["*_types".to_string(), "permissions*".to_string()]);
        assert_eq!(
            settings.table_validations["*_types"].required_indexes,
            vec!["name_unique".to_string()]
        );
        assert!(
            settings.table_validations["permissions*"]
                .required_columns
                .contains(&"guard_name".to_string())
        );
    }
}

mod toml_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::from_toml(indoc! {r#"
            [performance]
            slow_operation_threshold_ms = 250
        "#})
        .expect("should parse");

        assert_eq!(settings.performance.slow_operation_threshold_ms, 250);
        assert!(settings.performance.enable_statistics);
        assert_eq!(settings.table_validations.len(), 2);
    }

    #[test]
    fn test_table_validations_replace_defaults() {
        let settings = Settings::from_toml(indoc! {r#"
            [table_validations."orders"]
            required_columns = ["id", "total"]
            required_indexes = ["customer_id_index"]

            [table_validations."orders".required_constraints]
            "orders_pkey" = "p"
            "*_customer_id_foreign" = "foreign_key"

            [table_validations."orders".column_types]
            id = "bigint"
        "#})
        .expect("should parse");

        assert_eq!(settings.table_validations.len(), 1);
        let rule = &settings.table_validations["orders"];
        assert_eq!(rule.required_columns, vec!["id", "total"]);
        assert_eq!(
            rule.required_constraints.get("*_customer_id_foreign"),
            Some(&ConstraintKind::ForeignKey)
        );
        assert_eq!(rule.column_types.get("id").map(String::as_str), Some("bigint"));
    }

    #[test]
    fn test_invalid_toml_is_settings_error() {
        let err = Settings::from_toml("performance = 3").unwrap_err();
        assert!(matches!(err, StandardsError::Settings(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "schema = \"app\"\n").unwrap();

        let settings = Settings::load(Some(&path)).expect("should load");
        assert_eq!(settings.schema, "app");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}

mod env_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut settings = Settings::default();
        settings
            .apply_env_overrides(lookup(&[
                ("POSTGRES_HELPER_SELECTIVE_FIXING", "true"),
                ("POSTGRES_HELPER_EVENT_TRIGGERS", "1"),
                ("POSTGRES_HELPER_LOG_SLOW_OPS", "off"),
                ("POSTGRES_HELPER_SLOW_THRESHOLD", "50"),
                ("POSTGRES_HELPER_STATISTICS", "false"),
                ("POSTGRES_HELPER_CACHE_DURATION", "0"),
                ("POSTGRES_HELPER_LOG_CHANNEL", "stderr"),
                ("POSTGRES_HELPER_LOG_SUCCESS", "yes"),
            ]))
            .expect("overrides should apply");

        assert!(settings.auto_standards.selective_fixing);
        assert!(settings.auto_standards.enable_event_triggers);
        assert!(!settings.performance.log_slow_operations);
        assert_eq!(settings.performance.slow_operation_threshold_ms, 50);
        assert!(!settings.performance.enable_statistics);
        assert_eq!(settings.performance.cache_duration_secs, 0);
        assert_eq!(settings.logging.channel, "stderr");
        assert!(settings.logging.log_success);
    }

    #[test]
    fn test_malformed_env_value_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_overrides(lookup(&[("POSTGRES_HELPER_SLOW_THRESHOLD", "fast")]))
            .unwrap_err();
        assert!(err.to_string().contains("POSTGRES_HELPER_SLOW_THRESHOLD"));
    }

    #[test]
    fn test_no_env_leaves_defaults() {
        let mut settings = Settings::default();
        settings.apply_env_overrides(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
