// Copyright 2020 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The append-only experience store that self-play writes and training
//! reads. Experiences accumulate in per-game buffers in memory, and each
//! `commit` flushes every buffer to a fresh shard file on disk. The shard
//! index is reserved by creating the final file exclusively, the contents
//! are written to a sibling temp file and renamed into place, so concurrent
//! readers only ever see complete shards (or an empty placeholder, which
//! they skip).
//!
//! Each shard is a text table with the header `state;value;policy;phase`:
//! one record per line, columns separated by `;`, and the tensor columns
//! holding comma-separated floats.

use rand::prelude::*;
use regex::Regex;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use wl_game::Team;

/// One decision recorded during self-play, before the game's outcome is
/// known.
#[derive(Clone, Debug)]
pub struct Experience {
    /// The flattened board tensor of the state the decision was made in.
    pub state: Vec<f32>,

    /// The team that made the decision.
    pub team: Team,

    /// The one-hot phase vector of the state.
    pub phase: [f32; 4],

    /// The final-policy array the search settled on, the training target.
    pub policy: Vec<f32>
}

/// One training example read back from a shard.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub state: Vec<f32>,
    pub value: f32,
    pub policy: Vec<f32>,
    pub phase: [f32; 4]
}

/// The reasons the dataset can fail. Write failures are retried once with a
/// fresh shard index before they surface.
#[derive(Debug)]
pub enum ShardError {
    Io(io::Error),
    BadPattern(String),
    Malformed { shard: PathBuf, line: usize }
}

impl fmt::Display for ShardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShardError::Io(reason) => write!(f, "{}", reason),
            ShardError::BadPattern(pattern) => {
                write!(f, "shard pattern `{}` must contain a single `*`", pattern)
            },
            ShardError::Malformed { shard, line } => {
                write!(f, "malformed shard {} at line {}", shard.display(), line)
            }
        }
    }
}

impl From<io::Error> for ShardError {
    fn from(reason: io::Error) -> ShardError {
        ShardError::Io(reason)
    }
}

/// The sharded, append-only store behind a filename pattern such as
/// `data/shard_*`.
pub struct ExperienceDataset {
    directory: PathBuf,
    prefix: String,
    suffix: String,
    matcher: Regex,
    buffers: Vec<Vec<Experience>>
}

impl ExperienceDataset {
    /// Opens the dataset behind the given filename pattern, creating the
    /// directory if necessary. The final path component must contain
    /// exactly one `*`, which shard indices replace.
    pub fn new(pattern: &str) -> Result<ExperienceDataset, ShardError> {
        let path = Path::new(pattern);
        let file_name = path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ShardError::BadPattern(pattern.into()))?;

        if file_name.matches('*').count() != 1 {
            return Err(ShardError::BadPattern(pattern.into()));
        }

        let directory = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let (prefix, suffix) = {
            let mut parts = file_name.splitn(2, '*');

            (parts.next().unwrap().to_string(), parts.next().unwrap().to_string())
        };
        let matcher = Regex::new(&format!(
            "^{}([0-9]+){}$",
            regex::escape(&prefix),
            regex::escape(&suffix)
        )).expect("could not compile the shard pattern");

        fs::create_dir_all(&directory)?;

        Ok(ExperienceDataset {
            directory,
            prefix,
            suffix,
            matcher,
            buffers: vec! []
        })
    }

    /// Drops whatever is in the buffers and makes room for `n` games.
    pub fn set_buffer(&mut self, n: usize) {
        self.buffers = (0..n).map(|_| vec! []).collect();
    }

    /// Appends one experience to the buffer of the given game. Records stay
    /// in decision order within each game.
    pub fn add_to_buffer(&mut self, game: usize, experience: Experience) {
        self.buffers[game].push(experience);
    }

    /// Flushes every non-empty game buffer to a new shard. `values` holds
    /// one final game value per buffer, with respect to team 0; each
    /// record is stored with the value seen from its own acting team.
    ///
    /// # Arguments
    ///
    /// * `values` - the final value of each buffered game
    ///
    pub fn commit(&mut self, values: &[f32]) -> Result<(), ShardError> {
        assert_eq!(values.len(), self.buffers.len());

        let buffers = std::mem::take(&mut self.buffers);

        for (buffer, &value) in buffers.iter().zip(values.iter()) {
            if buffer.is_empty() {
                continue;
            }

            self.write_shard(buffer, value)?;
        }

        Ok(())
    }

    /// Draws `n` records by reading randomly chosen shards until enough
    /// records have been seen, then trimming. Only the shards actually
    /// needed are read.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<Sample>, ShardError> {
        let mut shards = self.existing_shards()?;
        shards.shuffle(rng);

        let mut out = vec! [];

        for (_, path) in shards {
            if out.len() >= n {
                break;
            }

            out.extend(read_shard(&path)?);
        }

        out.shuffle(rng);
        out.truncate(n);

        Ok(out)
    }

    /// Returns the `(index, path)` of every complete shard currently on
    /// disk.
    fn existing_shards(&self) -> Result<Vec<(usize, PathBuf)>, ShardError> {
        let mut out = vec! [];

        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let name = entry.file_name();

            if let Some(name) = name.to_str() {
                if let Some(captures) = self.matcher.captures(name) {
                    if let Ok(index) = captures[1].parse::<usize>() {
                        out.push((index, entry.path()));
                    }
                }
            }
        }

        out.sort();
        Ok(out)
    }

    fn shard_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}{}{}", self.prefix, index, self.suffix))
    }

    /// Reserves the next free shard index and writes the records to it,
    /// retrying once with a fresh index if anything goes wrong.
    fn write_shard(&self, buffer: &[Experience], value: f32) -> Result<(), ShardError> {
        let mut next_index = self.existing_shards()?
            .last()
            .map(|&(index, _)| index + 1)
            .unwrap_or(0);
        let mut last_error = None;

        for _ in 0..2 {
            match self.try_write_shard(next_index, buffer, value) {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    last_error = Some(reason);
                    next_index += 1;
                }
            }
        }

        Err(last_error.unwrap())
    }

    fn try_write_shard(&self, index: usize, buffer: &[Experience], value: f32) -> Result<(), ShardError> {
        let final_path = self.shard_path(index);

        // reserving the final name exclusively is the file-level lock on
        // the shard index
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&final_path)?;

        let temp_path = final_path.with_extension("tmp");
        let mut temp = fs::File::create(&temp_path)?;

        writeln!(temp, "state;value;policy;phase")?;
        for experience in buffer {
            let value = if experience.team == Team::Red { value } else { -value };

            writeln!(
                temp,
                "{};{};{};{}",
                join(&experience.state),
                value,
                join(&experience.policy),
                join(&experience.phase)
            )?;
        }
        temp.sync_all()?;
        drop(temp);

        fs::rename(&temp_path, &final_path)?;
        Ok(())
    }
}

fn join(values: &[f32]) -> String {
    values.iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split(column: &str) -> Option<Vec<f32>> {
    if column.is_empty() {
        return Some(vec! []);
    }

    column.split(',').map(|cell| cell.parse().ok()).collect()
}

/// Reads every record of the shard at the given path. An empty file (a
/// reserved index whose writer has not renamed yet) yields no records.
fn read_shard(path: &Path) -> Result<Vec<Sample>, ShardError> {
    let content = fs::read_to_string(path)?;
    let mut out = vec! [];

    for (number, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let malformed = || ShardError::Malformed { shard: path.to_path_buf(), line: number + 1 };
        let mut columns = line.split(';');
        let state = split(columns.next().ok_or_else(malformed)?).ok_or_else(malformed)?;
        let value = columns.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        let policy = split(columns.next().ok_or_else(malformed)?).ok_or_else(malformed)?;
        let phase = split(columns.next().ok_or_else(malformed)?).ok_or_else(malformed)?;

        if phase.len() != 4 {
            return Err(malformed());
        }

        out.push(Sample {
            state,
            value,
            policy,
            phase: [phase[0], phase[1], phase[2], phase[3]]
        });
    }

    Ok(out)
}
