use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zstd::{Decoder, Encoder};

/// One recorded ego step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    /// Episode counter of the run that produced this row.
    pub episode: u32,
    pub scenario_id: usize,
    pub slot: usize,
    /// Step within the episode, starting at 0.
    pub step: u32,
    pub obs: Vec<f32>,
    pub ego_action: Vec<f32>,
    pub next_obs: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    pub collision: bool,
    pub out_of_road: bool,
    pub cost: f32,
}

/// Writes trajectory rows to zstd-compressed MessagePack files in the
/// background, one file per `flush_row_count` rows.
pub struct TrajectoryRecorder {
    sender: mpsc::UnboundedSender<Vec<TrajectoryRow>>,
    consumer: JoinHandle<Result<()>>,
}

impl TrajectoryRecorder {
    pub fn build_and_start(flush_row_count: usize, output_directory: PathBuf) -> Result<Self> {
        // To start, create the output directory if it doesn't exist.
        std::fs::create_dir_all(&output_directory).with_context(|| {
            format!(
                "Failed to create trajectory directory {}",
                output_directory.display()
            )
        })?;

        // Start a consumer task that flushes data to disk when there's enough data.
        let (sender, mut receiver) = mpsc::unbounded_channel::<Vec<TrajectoryRow>>();
        let consumer = tokio::spawn(async move {
            let mut unflushed_rows = Vec::new();
            while let Some(rows) = receiver.recv().await {
                unflushed_rows.extend(rows);

                if unflushed_rows.len() >= flush_row_count {
                    let rows = std::mem::take(&mut unflushed_rows);
                    let output_directory = output_directory.clone();
                    tokio::task::spawn_blocking(move || {
                        write_rows_to_disk(rows, &output_directory)
                    })
                    .await??;
                }
            }

            // When the channel is closed, flush the remaining data one last time.
            if !unflushed_rows.is_empty() {
                tokio::task::spawn_blocking(move || {
                    write_rows_to_disk(unflushed_rows, &output_directory)
                })
                .await??;
            }
            Ok(())
        });

        Ok(Self { sender, consumer })
    }

    pub fn push_rows(&self, rows: Vec<TrajectoryRow>) -> Result<()> {
        self.sender
            .send(rows)
            .context("Trajectory recorder has stopped")
    }

    /// Close the channel and wait until every row is on disk.
    pub async fn finish(self) -> Result<()> {
        drop(self.sender);
        self.consumer.await?
    }
}

/// Generate a filename based on the current time, a random number to prevent
/// collisions, and the number of rows.
fn generate_filename(num_rows: usize) -> String {
    let now = Utc::now();

    // Generate a random 8-digit number (leading zeros if needed)
    let rand_num: u32 = rand::rng().random_range(0..100_000_000);

    format!(
        "{}-{:08}_{num_rows}.bin",
        now.format("%Y-%m-%d_%H-%M-%S"),
        rand_num
    )
}

fn write_rows_to_disk(rows: Vec<TrajectoryRow>, output_directory: &Path) -> Result<()> {
    let path = output_directory.join(generate_filename(rows.len()));

    let file = File::create(&path)
        .with_context(|| format!("Failed to create trajectory file {}", path.display()))?;
    let buf = BufWriter::new(file);
    let mut enc = Encoder::new(buf, 6)?;

    rmp_serde::encode::write(&mut enc, &rows)?;

    let mut buf = enc.finish()?;
    buf.flush()?;

    tracing::debug!("Wrote {} trajectory rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn read_rows_from_disk(path: &Path) -> Result<Vec<TrajectoryRow>> {
    let file = File::open(path)?;
    let buf = BufReader::new(file);
    let mut dec = Decoder::new(buf)?;
    let rows: Vec<TrajectoryRow> = rmp_serde::decode::from_read(&mut dec)?;
    Ok(rows)
}
