use std::path::Path;

use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

use crate::error::Result;

/// Reads a text file as lines. A final line without a trailing newline is
/// still returned; `\r\n` endings are accepted.
pub async fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path).await?;
    Ok(raw.lines().map(str::to_owned).collect())
}

/// Appends `line` plus a newline, creating the file if needed.
pub async fn append_line(path: impl AsRef<Path>, line: &str) -> Result<()> {
    append_lines(path, &[line]).await
}

/// Appends each of `lines` on its own line in a single write.
pub async fn append_lines<S: AsRef<str>>(path: impl AsRef<Path>, lines: &[S]) -> Result<()> {
    let mut buf = String::new();
    for line in lines {
        buf.push_str(line.as_ref());
        buf.push('\n');
    }

    let mut fw = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    fw.write_all(buf.as_bytes()).await?;
    fw.flush().await?;

    Ok(())
}
