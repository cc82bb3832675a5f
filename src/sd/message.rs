use crate::err::{SdReadError, SdWriteError};
use crate::payload::{ByteReader, ByteWriter};

use super::entry::{SdEntry, ENTRY_LENGTH};
use super::option::SdOption;

const FLAGS_REBOOT: u8 = 0x80;
const FLAGS_UNICAST: u8 = 0x40;

/// Top-level flags carried in an SD message (spec §3 `SdMessage`, §4.7
/// reboot detection).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct SdFlags {
    pub reboot: bool,
    pub unicast: bool,
}

impl SdFlags {
    fn raw(self) -> u8 {
        let mut b = 0;
        if self.reboot {
            b |= FLAGS_REBOOT;
        }
        if self.unicast {
            b |= FLAGS_UNICAST;
        }
        b
    }

    fn from_raw(b: u8) -> SdFlags {
        SdFlags {
            reboot: b & FLAGS_REBOOT != 0,
            unicast: b & FLAGS_UNICAST != 0,
        }
    }
}

/// An SD message's entries and options array, index-referenced per entry
/// (spec §3 `SdMessage`, §4.6).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SdMessage {
    pub flags: SdFlags,
    pub entries: Vec<SdEntry>,
    pub options: Vec<SdOption>,
}

impl SdMessage {
    pub fn new(flags: SdFlags, entries: Vec<SdEntry>, options: Vec<SdOption>) -> SdMessage {
        SdMessage {
            flags,
            entries,
            options,
        }
    }

    /// Resolves each entry to the options it references, validating index
    /// bounds against this message's options array (spec §4.6: "decode must
    /// validate index+count doesn't exceed the options array").
    pub fn resolved_entries(&self) -> Result<Vec<(&SdEntry, Vec<&SdOption>)>, SdReadError> {
        self.entries
            .iter()
            .map(|entry| {
                let run = entry.options();
                let mut opts = Vec::with_capacity(run.num_opts1 as usize + run.num_opts2 as usize);
                for (index, count) in [(run.index1, run.num_opts1), (run.index2, run.num_opts2)] {
                    if count == 0 {
                        continue;
                    }
                    let end = index as usize + count as usize;
                    if end > self.options.len() {
                        return Err(SdReadError::OptionIndexOutOfBounds {
                            index,
                            count,
                            options_len: self.options.len(),
                        });
                    }
                    opts.extend(self.options[index as usize..end].iter());
                }
                Ok((entry, opts))
            })
            .collect()
    }

    /// Encodes the message body (spec §4.6 wire layout: flags+reserved,
    /// entries_array_length, entries, options_array_length, options).
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_u8(self.flags.raw());
        writer.write_bytes(&[0, 0, 0]); // reserved

        writer.write_u32((self.entries.len() * ENTRY_LENGTH) as u32);
        for entry in &self.entries {
            entry.write(&mut writer);
        }

        let options_mark = writer.len();
        writer.write_u32(0);
        for option in &self.options {
            option.write(&mut writer);
        }
        let options_bytes = (writer.len() - options_mark - 4) as u32;
        let mut full = writer.into_bytes();
        full[options_mark..options_mark + 4].copy_from_slice(&options_bytes.to_be_bytes());
        full
    }

    /// Decodes a message body from `bytes` (the SOME/IP payload of an
    /// SD-service RPC message, spec §4.6).
    pub fn decode(bytes: &[u8]) -> Result<SdMessage, SdReadError> {
        let mut reader = ByteReader::new(bytes);
        if reader.remaining() < 8 {
            return Err(SdReadError::TooShort);
        }
        let flags = SdFlags::from_raw(reader.read_u8().map_err(|_| SdReadError::TooShort)?);
        reader.read_bytes(3).map_err(|_| SdReadError::TooShort)?; // reserved

        let entries_len = reader.read_u32().map_err(|_| SdReadError::TooShort)?;
        if entries_len as usize % ENTRY_LENGTH != 0 {
            return Err(SdReadError::EntriesLengthNotAligned(entries_len));
        }
        let entries_bytes = reader
            .read_bytes(entries_len as usize)
            .map_err(|_| SdReadError::TooShort)?;
        let mut entries_reader = ByteReader::new(entries_bytes);
        let mut entries = Vec::with_capacity(entries_len as usize / ENTRY_LENGTH);
        while entries_reader.remaining() > 0 {
            if let Some(entry) = SdEntry::read(&mut entries_reader)? {
                entries.push(entry);
            }
        }

        let options_len = reader.read_u32().map_err(|_| SdReadError::TooShort)?;
        let options_bytes = reader
            .read_bytes(options_len as usize)
            .map_err(|_| SdReadError::TooShort)?;
        let mut options_reader = ByteReader::new(options_bytes);
        let mut options = Vec::new();
        while options_reader.remaining() > 0 {
            let (_, option) = SdOption::read(&mut options_reader)?;
            options.push(option);
        }

        let message = SdMessage::new(flags, entries, options);
        message.resolved_entries()?;
        Ok(message)
    }

    /// Encodes `options`, registering and deduplicating the pool an entry's
    /// [`super::entry::OptionRun`] should reference. Given to callers that
    /// build a message from entries plus each entry's wanted options, so
    /// identical options shared by multiple entries are written once (spec
    /// §4.6 "encode should assign indices to minimize duplication").
    pub fn assign_option_indices(
        options_per_entry: &[Vec<SdOption>],
    ) -> Result<(Vec<SdOption>, Vec<(u8, u8)>), SdWriteError> {
        let mut pool: Vec<SdOption> = Vec::new();
        let mut runs = Vec::with_capacity(options_per_entry.len());
        for wanted in options_per_entry {
            if wanted.is_empty() {
                runs.push((0, 0));
                continue;
            }
            let first = wanted[0].clone();
            let index = match pool.iter().position(|o| *o == first) {
                Some(i) => i,
                None => {
                    pool.push(first);
                    pool.len() - 1
                }
            };
            if index > u8::MAX as usize {
                return Err(SdWriteError::TooManyOptions);
            }
            // additional options beyond the first in `wanted` are appended
            // fresh; true run-merging across non-adjacent entries is not
            // attempted, only exact single-option sharing.
            for extra in &wanted[1..] {
                pool.push(extra.clone());
            }
            if pool.len() > u8::MAX as usize + 1 {
                return Err(SdWriteError::TooManyOptions);
            }
            runs.push((index as u8, wanted.len() as u8));
        }
        Ok((pool, runs))
    }
}
