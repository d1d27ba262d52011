use redb::TableDefinition;

/// Cached audio records: auto-increment id -> AudioRecord (msgpack)
pub const AUDIO_RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("audio_records");

/// Lookup index: "<language>\x1f<term>" -> msgpack Vec of record ids, in insertion order
pub const TERM_INDEX: TableDefinition<&str, &[u8]> = TableDefinition::new("term_index");

/// Build the TERM_INDEX key for a (language, term) pair.
pub fn term_key(language: &str, term: &str) -> String {
    format!("{language}\u{1f}{term}")
}
