//! KSlackNode implementation.

use crate::config::Config;
use eyre::{Result, WrapErr, ensure};
use futures::{
    StreamExt, TryStreamExt,
    stream::{self, Stream},
};
use kslack_core::{Reorderable, SystemClock, reorder};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// One input line: a timestamp in milliseconds, the value aggregates
/// are computed over, and an opaque payload carried along.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: i64,
    pub correlation: f64,
    pub payload: String,
}

impl Reorderable for Record {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn correlation(&self) -> f64 {
        self.correlation
    }
}

impl Record {
    /// Parse `timestamp<d>correlation[<d>payload]`. The payload may
    /// itself contain the delimiter.
    pub fn parse(line: &str, delimiter: &str) -> Result<Self> {
        let mut fields = line.splitn(3, delimiter);

        let timestamp = fields
            .next()
            .unwrap_or_default()
            .trim()
            .parse()
            .wrap_err("invalid timestamp")?;
        let correlation: f64 = fields
            .next()
            .ok_or_else(|| eyre::eyre!("missing correlation value"))?
            .trim()
            .parse()
            .wrap_err("invalid correlation value")?;
        ensure!(
            correlation.is_finite(),
            "correlation value must be finite, got {correlation}"
        );
        let payload = fields.next().unwrap_or_default().to_string();

        Ok(Self {
            timestamp,
            correlation,
            payload,
        })
    }

    fn format(&self, delimiter: &str) -> String {
        if self.payload.is_empty() {
            format!("{}{delimiter}{}\n", self.timestamp, self.correlation)
        } else {
            format!(
                "{}{delimiter}{}{delimiter}{}\n",
                self.timestamp, self.correlation, self.payload
            )
        }
    }
}

/// Reads events line by line and writes them back in timestamp order.
pub struct KSlackNode {
    config: Config,
}

impl KSlackNode {
    /// Create a new KSlackNode with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        let reorder = config.to_reorder_config()?;

        info!(
            batch_size = reorder.batch_size,
            timeout = ?reorder.timeout,
            max_k = ?reorder.max_k,
            discard_late_arrivals = reorder.discard_late_arrivals,
            "Creating KSlackNode"
        );

        Ok(Self { config })
    }

    /// Run the reordering loop.
    ///
    /// This consumes the node and runs until the input ends or an I/O
    /// error occurs. Malformed lines are logged and skipped.
    pub async fn run<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let delimiter = self.config.io.delimiter.clone();
        let input = records(reader, delimiter.clone());

        let mut output = reorder(input, self.config.to_reorder_config()?, SystemClock)?;
        let mut count = 0usize;

        while let Some(record) = output.try_next().await? {
            writer
                .write_all(record.format(&delimiter).as_bytes())
                .await
                .wrap_err("Failed to write output")?;
            count += 1;
        }

        writer.flush().await.wrap_err("Failed to flush output")?;
        info!(count, "Input ended");
        Ok(())
    }
}

/// Parses the lines of `reader` into records.
fn records<R>(reader: R, delimiter: String) -> impl Stream<Item = Result<Record>> + Unpin + Send
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let lines = stream::try_unfold(reader.lines(), |mut lines| async move {
        let line = lines.next_line().await.wrap_err("Failed to read input")?;
        Ok::<_, eyre::Report>(line.map(|line| (line, lines)))
    });

    lines
        .enumerate()
        .filter_map(move |(index, line)| {
            let record = match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => match Record::parse(&line, &delimiter) {
                    Ok(record) => Some(Ok(record)),
                    Err(err) => {
                        warn!(line = index + 1, error = %err, "Skip malformed input line");
                        None
                    }
                },
                Err(err) => Some(Err(err)),
            };
            async move { record }
        })
        .boxed()
}
