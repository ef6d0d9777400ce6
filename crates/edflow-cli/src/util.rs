use std::{
    fs::{self, File},
    io::{self, BufRead as _, BufReader, BufWriter, Write as _},
    path::Path,
};

use anyhow::{Context, bail};

/// Creates `path` and any missing parent directories.
pub fn create_file(path: &Path) -> anyhow::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json_file<T>(path: &Path, value: &T) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    let mut writer = create_file(path)?;
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Writes `text` to `path`, or to stdout when no path is given.
pub fn write_text(path: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let mut writer = create_file(path)?;
            writer
                .write_all(text.as_bytes())
                .and_then(|()| writer.flush())
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")
        }
    }
}

/// Reads a sample with one number per line.
///
/// Blank lines and lines starting with `#` are skipped. `NaN` and infinite
/// values are rejected with their line number.
pub fn read_sample_file(path: &Path) -> anyhow::Result<Vec<f64>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open sample file: {}", path.display()))?;
    let mut sample = vec![];
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.with_context(|| format!("Failed to read sample file: {}", path.display()))?;
        let value = line.trim();
        if value.is_empty() || value.starts_with('#') {
            continue;
        }
        let number = value.parse::<f64>().with_context(|| {
            format!(
                "{}:{}: invalid number {value:?}",
                path.display(),
                index + 1
            )
        })?;
        if !number.is_finite() {
            bail!("{}:{}: non-finite value {value:?}", path.display(), index + 1);
        }
        sample.push(number);
    }
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("edflow-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_read_sample_file_skips_blank_and_comment_lines() {
        let path = temp_path("sample.txt");
        fs::write(&path, "# gaps\n12.5\n\n  30\n0\n").unwrap();
        let sample = read_sample_file(&path).unwrap();
        fs::write(&path, "1\nabc\n").unwrap();
        let err = read_sample_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert_eq!(sample, [12.5, 30.0, 0.0]);
        assert!(err.to_string().ends_with(":2: invalid number \"abc\""));
    }

    #[test]
    fn test_read_sample_file_rejects_non_finite_values() {
        let path = temp_path("non-finite.txt");
        fs::write(&path, "1\nNaN\n").unwrap();
        let nan = read_sample_file(&path).unwrap_err();
        fs::write(&path, "1\n2\ninf\n").unwrap();
        let inf = read_sample_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(nan.to_string().ends_with(":2: non-finite value \"NaN\""));
        assert!(inf.to_string().ends_with(":3: non-finite value \"inf\""));
    }

    #[test]
    fn test_write_json_file_creates_parent_directories() {
        let dir = temp_path("json-out");
        let path = dir.join("nested").join("fits.json");
        write_json_file(&path, &[1, 2]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(text, "[\n  1,\n  2\n]\n");
    }
}
