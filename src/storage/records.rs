use redb::{ReadableTable, ReadableTableMetadata};

use super::db::{Database, DatabaseError};
use super::models::{AudioRecord, ResultKind};
use super::tables::*;

impl Database {
    // ========================================================================
    // Audio record operations
    // ========================================================================

    /// Append a record and add it to the (language, term) index.
    ///
    /// No uniqueness check is made; callers avoid double inserts.
    pub fn insert_record(
        &self,
        language: &str,
        term: &str,
        result_kind: ResultKind,
        contributor: Option<&str>,
        file_path: &str,
    ) -> Result<AudioRecord, DatabaseError> {
        debug_assert!(!file_path.is_empty(), "file path must not be empty");

        let write_txn = self.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(AUDIO_RECORDS)?;
            let id = table.last()?.map(|(k, _)| k.value() + 1).unwrap_or(1);

            let record = AudioRecord {
                id,
                language: language.to_string(),
                term: term.to_string(),
                result_kind,
                contributor: contributor.map(|s| s.to_string()),
                file_path: file_path.to_string(),
                created_at: chrono::Utc::now(),
            };
            let data = rmp_serde::to_vec_named(&record)?;
            table.insert(id, data.as_slice())?;

            let key = term_key(language, term);
            let mut index = write_txn.open_table(TERM_INDEX)?;
            let mut ids: Vec<u64> = match index.get(key.as_str())? {
                Some(data) => rmp_serde::from_slice(data.value())?,
                None => Vec::new(),
            };
            ids.push(id);
            let index_data = rmp_serde::to_vec_named(&ids)?;
            index.insert(key.as_str(), index_data.as_slice())?;

            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// All records for an exact (language, term) pair, in insertion order.
    /// An empty result is a cache miss.
    pub fn lookup(&self, language: &str, term: &str) -> Result<Vec<AudioRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(TERM_INDEX)?;
        let records_table = read_txn.open_table(AUDIO_RECORDS)?;

        let ids: Vec<u64> = match index.get(term_key(language, term).as_str())? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = records_table.get(id)? {
                let record: AudioRecord = rmp_serde::from_slice(data.value())?;
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Number of cached records
    pub fn count(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(AUDIO_RECORDS)?;
        Ok(table.len()?)
    }
}
