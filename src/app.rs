use std::path::PathBuf;
use std::marker::Unpin;

use clap::Parser;
use log::info;
use thiserror::Error;
use tokio::{
    fs::File,
    io::{self, AsyncWrite, AsyncWriteExt, BufWriter},
};

use crate::{
    anchors::AnchorIndex,
    io::{write_umi_log, SourceError, UmiCounts, MAX_LINE_BYTES, UMI_LOG},
    metrics::Metrics,
    progress::ProgressTracker,
    scan::{Grouping, IndexedGroups, RescanGroups, ScanWindow, Strategy},
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// The UMI count file, one `<position> <count> <umi1> ... <umiN>` record per line
    pub input: PathBuf,

    /// The group output file. umigroup writes to stdout when omitted
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// File receiving every anchor UMI, sorted. Existing content is replaced
    #[clap(short = 'l', long, default_value = UMI_LOG)]
    pub umi_log: PathBuf,

    /// The grouping metrics file, if missing metrics will be written to stderr
    #[clap(short = 'm', long)]
    pub metrics: Option<PathBuf>,

    /// Number of input lines between progress messages, 0 disables them
    #[clap(short = 'p', long, default_value = "1000")]
    pub progress_interval: usize,

    /// Maximum line length in bytes. Runs on files with longer lines fail before any output
    #[clap(long, default_value_t = MAX_LINE_BYTES)]
    pub max_line_bytes: usize,

    /// Maximum UMI length. Longer tokens are not used as UMIs
    #[clap(long)]
    pub max_umi_len: Option<usize>,

    /// Grouping strategy. Both produce the same groups,
    /// rescan streams them while indexed only needs a single pass
    #[clap(short = 's', long, value_enum, default_value_t = Strategy::Rescan)]
    pub strategy: Strategy,

    /// Where matching starts relative to the anchor. forward starts at the next line,
    /// full also includes repeats of the UMI on the anchor line
    #[clap(short = 'w', long, value_enum, default_value_t = ScanWindow::Forward)]
    pub window: ScanWindow,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[clap(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

pub struct App {
    config: Config,
    counts: UmiCounts,
    out: Box<dyn AsyncWrite + Unpin>,
}

impl App {
    /// Load the input completely before the output is opened, so a failing load leaves no output
    /// behind.
    pub async fn new(config: Config) -> Result<App, AnalyzerError> {
        let counts = UmiCounts::open(&config.input, config.max_line_bytes)
            .await?
            .with_max_umi_len(config.max_umi_len);
        info!("read {} lines from {}", counts.len(), config.input.display());

        let out: Box<dyn AsyncWrite + Unpin> = if let Some(p) = config.output.as_ref() {
            Box::new(BufWriter::new(File::create(p).await?))
        } else {
            Box::new(BufWriter::new(io::stdout()))
        };

        Ok(App { config, counts, out })
    }

    /// Write the groups, then the anchor log and the metrics.
    pub async fn run(&mut self) -> Result<Metrics, AnalyzerError> {
        let mut anchors = AnchorIndex::new();
        let progress = ProgressTracker::new(self.counts.len())
            .with_interval(self.config.progress_interval);

        let metrics = match self.config.strategy {
            Strategy::Rescan => {
                let groups =
                    RescanGroups::new(&self.counts, &mut anchors, self.config.window, progress);
                write_groups(groups, &mut self.out).await?
            }
            Strategy::Indexed => {
                let groups =
                    IndexedGroups::new(&self.counts, &mut anchors, self.config.window, progress);
                write_groups(groups, &mut self.out).await?
            }
        };
        self.out.shutdown().await?;

        write_umi_log(&self.config.umi_log, &anchors).await?;
        info!(
            "{} groups written, {} anchors logged to {}",
            metrics.anchors(),
            anchors.len(),
            self.config.umi_log.display()
        );

        // print/write the metrics (sync)
        if let Some(path) = &self.config.metrics {
            use std::io::Write;
            let mut mout = std::fs::File::create(path)?;
            write!(mout, "{}", metrics)?;
        } else {
            eprint!("{}", metrics);
        }

        Ok(metrics)
    }
}

/// Write every group as soon as it is produced.
async fn write_groups<'a, G, W>(mut groups: G, out: &mut W) -> io::Result<Metrics>
where
    G: Grouping<'a>,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut line = Vec::new();
    for group in groups.by_ref() {
        line.clear();
        group.write_line(&mut line);
        out.write_all(&line).await?;
    }
    out.flush().await?;
    Ok(groups.finish())
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Error writing groups, anchor log or metrics")]
    IoError(#[from] std::io::Error),
    #[error("Error reading UMI counts")]
    SourceError(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    const INPUT: &str = "chr1:100 3 AAAA CCCC AAAA
chr1:200 1 GGGG
chr1:300 2 CCCC TTTT
chr1:350 0
chr1:400 4 TTTT AAAA AAAA CCCC
";

    fn config(dir: &Path, input: &str, extra: &[&str]) -> Config {
        let input_path = dir.join("umi_counts.txt");
        fs::write(&input_path, input).unwrap();
        let mut args = vec![
            "umigroup".to_owned(),
            input_path.display().to_string(),
            "-o".to_owned(),
            dir.join("groups.txt").display().to_string(),
            "-l".to_owned(),
            dir.join(UMI_LOG).display().to_string(),
            "-m".to_owned(),
            dir.join("metrics.txt").display().to_string(),
        ];
        args.extend(extra.iter().map(|a| a.to_string()));
        Config::parse_from(args)
    }

    async fn run(dir: &Path, input: &str, extra: &[&str]) -> (String, String) {
        let mut app = App::new(config(dir, input, extra)).await.unwrap();
        app.run().await.unwrap();
        (
            fs::read_to_string(dir.join("groups.txt")).unwrap(),
            fs::read_to_string(dir.join(UMI_LOG)).unwrap(),
        )
    }

    #[tokio::test]
    async fn single_umi() {
        let dir = tempfile::tempdir().unwrap();
        let (groups, log) = run(dir.path(), "chr1:100 1 AAAA", &[]).await;
        assert_eq!(groups, "AAAA chr1:100 \n");
        assert_eq!(log, "AAAA\n");
    }

    #[tokio::test]
    async fn groups_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let (groups, log) = run(dir.path(), INPUT, &[]).await;
        assert_eq!(
            groups,
            "AAAA chr1:100 chr1:400 chr1:400 \n\
             CCCC chr1:100 chr1:300 chr1:400 \n\
             GGGG chr1:200 \n\
             TTTT chr1:300 chr1:400 \n"
        );
        assert_eq!(log, "AAAA\nCCCC\nGGGG\nTTTT\n");

        // every emitted anchor is logged exactly once
        let mut anchors: Vec<_> = groups
            .lines()
            .map(|l| l.split(' ').next().unwrap())
            .collect();
        anchors.sort_unstable();
        assert_eq!(anchors, log.lines().collect::<Vec<_>>());

        let metrics = fs::read_to_string(dir.path().join("metrics.txt")).unwrap();
        assert!(metrics.starts_with("LINES_EXAMINED\t"));
        assert_eq!(metrics.lines().nth(1), Some("5\t1\t10\t0\t4\t5\t3\t0.7500"));
    }

    #[tokio::test]
    async fn strategies_write_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let rescan = run(dir.path(), INPUT, &[]).await;
        let indexed = run(dir.path(), INPUT, &["--strategy", "indexed"]).await;
        assert_eq!(rescan, indexed);

        let rescan = run(dir.path(), INPUT, &["-w", "full"]).await;
        let indexed = run(dir.path(), INPUT, &["-s", "indexed", "-w", "full"]).await;
        assert_eq!(rescan, indexed);
        assert!(rescan.0.starts_with("AAAA chr1:100 chr1:100 chr1:400 chr1:400 \n"));
    }

    #[tokio::test]
    async fn deterministic() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run(dir.path(), INPUT, &[]).await, run(dir.path(), INPUT, &[]).await);
    }

    #[tokio::test]
    async fn log_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(UMI_LOG), "ZZZZ\nYYYY\nXXXX\nWWWW\nVVVV\n").unwrap();
        let (_, log) = run(dir.path(), "p1 1 ACGT\n", &[]).await;
        assert_eq!(log, "ACGT\n");
    }

    #[tokio::test]
    async fn umi_width_bound() {
        let dir = tempfile::tempdir().unwrap();
        let (groups, log) =
            run(dir.path(), "p1 1 ACGT ACGTACGT\np2 1 ACGTACGT ACGT\n", &["--max-umi-len", "4"])
                .await;
        assert_eq!(groups, "ACGT p1 p2 \n");
        assert_eq!(log, "ACGT\n");
    }

    #[tokio::test]
    async fn missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse_from([
            "umigroup",
            dir.path().join("missing.txt").to_str().unwrap(),
            "-o",
            dir.path().join("groups.txt").to_str().unwrap(),
        ]);
        let r = App::new(config).await;
        assert!(matches!(r, Err(AnalyzerError::SourceError(SourceError::Io { .. }))));
        assert!(!dir.path().join("groups.txt").exists());
    }

    #[tokio::test]
    async fn long_line_fails_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "p1 1 ACGT\np2 1 ACGTACGTACGT\n", &["--max-line-bytes", "12"]);
        let r = App::new(config).await;
        assert!(matches!(
            r,
            Err(AnalyzerError::SourceError(SourceError::LineTooLong { line: 2, .. }))
        ));
        assert!(!dir.path().join("groups.txt").exists());
        assert!(!dir.path().join(UMI_LOG).exists());
    }

    #[tokio::test]
    async fn unwritable_log_names_the_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("log_dir");
        fs::create_dir(&log_dir).unwrap();
        let mut config = config(dir.path(), "p1 1 ACGT\n", &[]);
        config.umi_log = log_dir;

        let mut app = App::new(config).await.unwrap();
        let err = app.run().await.unwrap_err();
        assert!(matches!(err, AnalyzerError::IoError(_)));
        assert_eq!(err.to_string(), "Error writing groups, anchor log or metrics");
    }

    #[test]
    fn arguments() {
        assert!(Config::try_parse_from(["umigroup"]).is_err());
        assert!(Config::try_parse_from(["umigroup", "in.txt", "-v", "-q"]).is_err());

        let c = Config::try_parse_from(["umigroup", "in.txt"]).unwrap();
        assert_eq!(c.umi_log, PathBuf::from(UMI_LOG));
        assert_eq!(c.progress_interval, 1000);
        assert_eq!(c.max_line_bytes, MAX_LINE_BYTES);
        assert_eq!(c.strategy, Strategy::Rescan);
        assert_eq!(c.window, ScanWindow::Forward);
        assert!(c.output.is_none());
    }
}
