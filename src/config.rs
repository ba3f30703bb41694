use anyhow::{Context, Result, bail};
use gl_audit_sampling::SamplingConfig;
use log::warn;
use serde::Deserialize;
use std::{fs, path::Path};

/// Config file contents; every field may be omitted and supplied on the
/// command line instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, alias = "tolerable_misstatement")]
    pub tolerable_misstatement: Option<f64>,
    #[serde(default, alias = "testing_scope")]
    pub testing_scope: Option<f64>,
    #[serde(default, alias = "target_keywords")]
    pub target_keywords: Option<Vec<String>>,
    #[serde(default, alias = "sample_size")]
    pub sample_size: Option<i64>,
}

pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read config: {}", path.display()))?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<ConfigFile> {
    let cfg: ConfigFile = serde_json::from_str(text).context("config JSON is invalid")?;
    Ok(cfg)
}

/// Command-line values win over the file. Values the engine would accept
/// but that are almost certainly mistakes are only logged.
pub fn resolve(
    file: ConfigFile,
    tolerable_misstatement: Option<f64>,
    testing_scope: Option<f64>,
    keywords: Vec<String>,
    sample_size: Option<i64>,
) -> Result<SamplingConfig> {
    let Some(tolerable_misstatement) = tolerable_misstatement.or(file.tolerable_misstatement) else {
        bail!("tolerable misstatement is required (--tolerable-misstatement or config file)");
    };
    let Some(testing_scope) = testing_scope.or(file.testing_scope) else {
        bail!("testing scope is required (--testing-scope or config file)");
    };
    let Some(sample_size) = sample_size.or(file.sample_size) else {
        bail!("sample size is required (--sample-size or config file)");
    };
    let target_keywords = if keywords.is_empty() { file.target_keywords.unwrap_or_default() } else { keywords };

    if !(tolerable_misstatement > 0.0) {
        warn!("tolerable misstatement {tolerable_misstatement} is not positive; every non-empty account is material");
    }
    if sample_size <= 0 {
        warn!("sample size {sample_size} is not positive; no samples will be selected");
    }
    if testing_scope > tolerable_misstatement {
        warn!("testing scope {testing_scope} exceeds tolerable misstatement {tolerable_misstatement}");
    }

    Ok(SamplingConfig { tolerable_misstatement, testing_scope, target_keywords, sample_size })
}
