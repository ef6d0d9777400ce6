use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use edflow_analysis::config::PipelineConfig;

use crate::util;

#[derive(Debug, Clone, Args)]
pub(crate) struct DefaultConfigArg {
    /// Write the configuration to this path instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &DefaultConfigArg) -> anyhow::Result<()> {
    let text = PipelineConfig::default()
        .to_toml()
        .context("Failed to render default configuration")?;
    util::write_text(arg.output.as_deref(), &text)?;
    if let Some(path) = &arg.output {
        tracing::info!(path = %path.display(), "wrote default configuration");
    }
    Ok(())
}
