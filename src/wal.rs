//! On-disk journal of room, client and booking events.
//!
//! Layout: an 8-byte header, then records of `[u32 len][bincode Event][u32 crc32]`
//! (little-endian, `len` counts the payload only).
//!
//! Opening a journal replays it and cuts the file back to the last good record, so
//! appends after a crash never sit behind a torn one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

const HEADER: &[u8; 8] = b"RBJRNL01";

/// Why replay stopped before the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailDamage {
    /// The last record is cut short.
    Truncated,
    Checksum,
    /// Checksum matches but the payload is not an event this build understands.
    Undecodable,
}

/// Result of reading a journal file.
#[derive(Debug, Default, PartialEq)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Byte length of the header plus every good record.
    pub valid_len: u64,
    pub damage: Option<TailDamage>,
    /// Bytes past `valid_len` that replay ignored.
    pub dropped_bytes: u64,
}

enum Record {
    Event { event: Event, width: usize },
    End,
    Damaged(TailDamage),
}

fn encode(event: &Event) -> io::Result<Vec<u8>> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "event too large"))?;
    let mut record = Vec::with_capacity(payload.len() + 8);
    record.extend_from_slice(&len.to_le_bytes());
    record.extend_from_slice(&payload);
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(record)
}

fn decode(buf: &[u8]) -> Record {
    if buf.is_empty() {
        return Record::End;
    }
    let Some((len, rest)) = buf.split_first_chunk::<4>() else {
        return Record::Damaged(TailDamage::Truncated);
    };
    let len = u32::from_le_bytes(*len) as usize;
    if rest.len() < len.saturating_add(4) {
        return Record::Damaged(TailDamage::Truncated);
    }
    let (payload, rest) = rest.split_at(len);
    let Some((crc, _)) = rest.split_first_chunk::<4>() else {
        return Record::Damaged(TailDamage::Truncated);
    };
    if u32::from_le_bytes(*crc) != crc32fast::hash(payload) {
        return Record::Damaged(TailDamage::Checksum);
    }
    match bincode::deserialize(payload) {
        Ok(event) => Record::Event {
            event,
            width: len + 8,
        },
        Err(_) => Record::Damaged(TailDamage::Undecodable),
    }
}

fn read_journal(bytes: &[u8]) -> io::Result<Replay> {
    let Some(mut rest) = bytes.strip_prefix(HEADER.as_slice()) else {
        // Empty file, or a crash while the header was being written.
        if HEADER.starts_with(bytes) {
            return Ok(Replay::default());
        }
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a roombook journal",
        ));
    };
    let mut replay = Replay {
        valid_len: HEADER.len() as u64,
        ..Replay::default()
    };
    loop {
        match decode(rest) {
            Record::Event { event, width } => {
                replay.events.push(event);
                replay.valid_len += width as u64;
                rest = &rest[width..];
            }
            Record::End => break,
            Record::Damaged(kind) => {
                replay.damage = Some(kind);
                replay.dropped_bytes = rest.len() as u64;
                break;
            }
        }
    }
    Ok(replay)
}

fn open_for_append(path: &Path) -> io::Result<BufWriter<File>> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::End(0))?;
    Ok(BufWriter::new(file))
}

pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appended: u64,
}

impl Wal {
    /// Replay the journal at `path` (creating it if absent), drop any damaged tail
    /// from the file and return it ready for appends.
    pub fn open(path: &Path) -> io::Result<(Self, Replay)> {
        let replay = Self::replay(path)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        if replay.valid_len == 0 {
            file.set_len(0)?;
            (&file).write_all(HEADER)?;
            file.sync_all()?;
        } else if replay.damage.is_some() {
            file.set_len(replay.valid_len)?;
            file.sync_all()?;
        }
        drop(file);
        let wal = Self {
            writer: open_for_append(path)?,
            path: path.to_path_buf(),
            appended: 0,
        };
        Ok((wal, replay))
    }

    /// Read the journal without touching it. A missing file replays as empty.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        match fs::read(path) {
            Ok(bytes) => read_journal(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Replay::default()),
            Err(e) => Err(e),
        }
    }

    /// Buffer one event. Nothing is durable until [`Wal::commit`].
    pub fn push(&mut self, event: &Event) -> io::Result<()> {
        self.writer.write_all(&encode(event)?)?;
        self.appended += 1;
        Ok(())
    }

    /// Flush buffered events and fsync.
    pub fn commit(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.push(event)?;
        self.commit()
    }

    /// Replace the journal with `snapshot`: write a sibling temp file, fsync,
    /// rename it over the journal and keep appending to the new file.
    pub fn rewrite(&mut self, snapshot: &[Event]) -> io::Result<()> {
        self.commit()?;
        let tmp_path = self.path.with_extension("wal.tmp");
        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        tmp.write_all(HEADER)?;
        for event in snapshot {
            tmp.write_all(&encode(event)?)?;
        }
        tmp.flush()?;
        tmp.get_ref().sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        self.writer = open_for_append(&self.path)?;
        self.appended = 0;
        Ok(())
    }

    /// Events pushed since open or the last rewrite.
    pub fn appended(&self) -> u64 {
        self.appended
    }
}
