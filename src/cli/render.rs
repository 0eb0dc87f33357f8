//! One-shot render command: load, execute once, write the image to disk.

use anyhow::{Context, Result, anyhow, bail};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::PreviewConfig;
use crate::log;
use crate::render::{ImageFormat, encode};
use crate::runtime::{AppConfig, AppLoader, RuntimeContext, manifest::ManifestLoader};

/// Render the configured app once and write the encoded image to `output`.
/// The format follows the output extension, falling back to the configured
/// one.
pub fn render_once(config: &PreviewConfig, output: &Path, pairs: &[String]) -> Result<()> {
    let ctx = RuntimeContext::new();
    let loader = ManifestLoader::new(config.app.clone());
    let app = loader
        .load(&ctx)
        .with_context(|| format!("failed to load {}", config.app.display()))?;

    let app_config = parse_pairs(pairs)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let deadline = Duration::from_millis(config.render.timeout_ms);
    let tree = rt
        .block_on(async {
            tokio::time::timeout(deadline, app.program.run(&ctx, &app_config)).await
        })
        .map_err(|_| anyhow!("timeout after {}ms", config.render.timeout_ms))?
        .map_err(|e| anyhow!("error running app: {e}"))?;

    let format = ImageFormat::from_path(output).unwrap_or_else(|| config.render.format());
    let max_duration = if tree.show_full_animation {
        0
    } else {
        config.render.max_duration_ms
    };
    let image = encode::encode(&tree, format, max_duration)?;

    fs::write(output, &image.data)
        .with_context(|| format!("failed to write {}", output.display()))?;
    log!("render"; "wrote {} ({} bytes)", output.display(), image.data.len());
    Ok(())
}

/// Parse `key=value` arguments into a config mapping.
fn parse_pairs(pairs: &[String]) -> Result<AppConfig> {
    let mut config = AppConfig::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid config pair `{pair}`, expected key=value");
        };
        config.insert(key.to_string(), value.to_string());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let config = parse_pairs(&["speed=2".into(), "label=hi there".into()]).unwrap();
        assert_eq!(config.get("speed").unwrap(), "2");
        assert_eq!(config.get("label").unwrap(), "hi there");
    }

    #[test]
    fn test_parse_pairs_rejects_bare_keys() {
        assert!(parse_pairs(&["speed".into()]).is_err());
    }

    #[test]
    fn test_parse_pairs_keeps_equals_in_value() {
        let config = parse_pairs(&["expr=a=b".into()]).unwrap();
        assert_eq!(config.get("expr").unwrap(), "a=b");
    }
}
