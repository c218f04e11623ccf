use std::ops::Range;
use std::path::Path;

use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::anchors::AnchorIndex;
use crate::record::Record;

/// Default name of the sorted anchor log.
pub const UMI_LOG: &str = "analyzer_umis.txt";

/// Default maximum line length in bytes, terminator excluded.
pub const MAX_LINE_BYTES: usize = 1_000_000;

/// A UMI count file loaded in memory with an index of its lines.
///
/// Every pass over the file is a plain line index, so the outer pass and the rescans are
/// independent cursors over the same immutable data.
pub struct UmiCounts {
    data: Vec<u8>,
    lines: Vec<Range<usize>>,
    max_umi_len: Option<usize>,
}

impl UmiCounts {
    /// Read `path` completely. Lines longer than `max_line_bytes` are rejected.
    pub async fn open<P: AsRef<Path>>(
        path: P,
        max_line_bytes: usize,
    ) -> Result<UmiCounts, SourceError> {
        let path = path.as_ref();
        let data = fs::read(path).await.map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        UmiCounts::from_bytes(data, max_line_bytes)
    }

    /// Index the lines of `data`. Lines are split on `\n`, a trailing `\r` is dropped and a last
    /// line without terminator is still a line.
    pub fn from_bytes(data: Vec<u8>, max_line_bytes: usize) -> Result<UmiCounts, SourceError> {
        let mut lines = Vec::new();
        let mut start = 0;

        while start < data.len() {
            let end = data[start..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(data.len(), |i| start + i);

            let mut line_end = end;
            if line_end > start && data[line_end - 1] == b'\r' {
                line_end -= 1;
            }

            let len = line_end - start;
            if len > max_line_bytes {
                return Err(SourceError::LineTooLong {
                    line: lines.len() + 1,
                    len,
                    max: max_line_bytes,
                });
            }

            lines.push(start..line_end);
            start = end + 1;
        }

        Ok(UmiCounts { data, lines, max_umi_len: None })
    }

    pub fn with_max_umi_len(mut self, max_umi_len: Option<usize>) -> UmiCounts {
        self.max_umi_len = max_umi_len;
        self
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> &[u8] {
        &self.data[self.lines[index].clone()]
    }

    /// Parse line `index`. Parsing is repeated on every call.
    pub fn record(&self, index: usize) -> Record<'_> {
        Record::parse_bounded(self.line(index), self.max_umi_len)
    }
}

/// Write the anchors, one per line in ascending order, replacing any previous content of `path`.
pub async fn write_umi_log<P: AsRef<Path>>(path: P, anchors: &AnchorIndex<'_>) -> std::io::Result<()> {
    let file = fs::File::create(path).await?;
    let mut out = tokio::io::BufWriter::new(file);
    write_anchors(&mut out, anchors).await?;
    out.shutdown().await
}

pub async fn write_anchors<W: AsyncWrite + Unpin>(
    out: &mut W,
    anchors: &AnchorIndex<'_>,
) -> std::io::Result<()> {
    for umi in anchors.sorted_members() {
        out.write_all(umi).await?;
        out.write_all(b"\n").await?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unable to open {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Line {line} is {len} bytes long, the maximum is {max}")]
    LineTooLong { line: usize, len: usize, max: usize },
}
