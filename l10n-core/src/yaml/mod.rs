//! YAML 配置加载：先展开 `${VAR}` / `${VAR:default}` 环境变量，再反序列化

use dotenvy::dotenv;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YamlLoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("missing environment variable: {0}")]
    MissingVariable(String),
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([A-Z0-9_]+)(?::([^\}]*))?\}").expect("placeholder pattern is valid")
    })
}

/// 展开占位符。
///
/// 变量不存在时使用默认值；既无变量也无默认值时报错，
/// 避免 `base_url` 之类的字段被静默替换成空串。
fn expand_vars(content: &str) -> Result<String, YamlLoaderError> {
    // .env 文件可选
    let _ = dotenv();

    let mut missing = None;
    let expanded = placeholder().replace_all(content, |caps: &Captures| {
        let name = &caps[1];
        match (env::var(name), caps.get(2)) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(YamlLoaderError::MissingVariable(name)),
        None => Ok(expanded.into_owned()),
    }
}

pub fn load_from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, YamlLoaderError> {
    let content = fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str<T: DeserializeOwned>(content: &str) -> Result<T, YamlLoaderError> {
    let expanded = expand_vars(content)?;
    Ok(serde_yaml::from_str(&expanded)?)
}

/// 编译时嵌入 YAML 文件
#[macro_export]
macro_rules! include_yaml {
    ($path:expr, $t:ty) => {
        $crate::yaml::load_from_str::<$t>(include_str!($path))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_expand_vars_from_env() {
        unsafe {
            env::set_var("L10N_TEST_ENDPOINT", "/svc/text");
        }
        let output = expand_vars("text_url: ${L10N_TEST_ENDPOINT}").unwrap();
        assert_eq!(output, "text_url: /svc/text");
    }

    #[test]
    fn test_expand_vars_default() {
        let output = expand_vars("default_locale: ${L10N_TEST_UNSET_LOCALE:en-US}").unwrap();
        assert_eq!(output, "default_locale: en-US");
    }

    #[test]
    fn test_expand_vars_empty_default_is_allowed() {
        let output = expand_vars("dir: ${L10N_TEST_UNSET_DIR:}").unwrap();
        assert_eq!(output, "dir: ");
    }

    #[test]
    fn test_expand_vars_missing_without_default() {
        let err = expand_vars("base_url: ${L10N_TEST_UNSET_BASE}").unwrap_err();
        assert!(matches!(err, YamlLoaderError::MissingVariable(name) if name == "L10N_TEST_UNSET_BASE"));
    }

    #[test]
    fn test_load_from_str() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Endpoint {
            host: String,
            port: u16,
        }

        unsafe {
            env::set_var("L10N_TEST_HOST", "localhost");
        }
        let yaml = r#"
        host: ${L10N_TEST_HOST}
        port: ${L10N_TEST_PORT:8080}
        "#;

        let endpoint: Endpoint = load_from_str(yaml).unwrap();
        assert_eq!(endpoint.host, "localhost");
        assert_eq!(endpoint.port, 8080);
    }
}
