use crate::error::QueryError;

/// Maximum number of addresses the remote service accepts in one query.
pub const DEFAULT_ADDRESS_CHUNK_SIZE: usize = 50;

/// A bounded slice of the input keys, sent as one remote sub-query.
///
/// Identity is the chunk's position in its partition; two chunks of the same
/// partition never share an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<K> {
    index: usize,
    keys: Vec<K>,
}

impl<K> Chunk<K> {
    /// The single chunk of an unchunked query.
    pub(crate) fn whole(keys: Vec<K>) -> Self {
        Self { index: 0, keys }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Splits `keys` into consecutive chunks of at most `chunk_size` keys,
/// preserving order. Only the last chunk may be shorter.
pub fn partition<K>(keys: Vec<K>, chunk_size: usize) -> Result<Vec<Chunk<K>>, QueryError> {
    if keys.is_empty() {
        return Err(QueryError::invalid_argument("keys", "empty key set"));
    }
    if chunk_size == 0 {
        return Err(QueryError::invalid_argument(
            "chunk_size",
            "must be greater than zero",
        ));
    }

    let mut chunks = Vec::with_capacity(keys.len().div_ceil(chunk_size));
    let mut keys = keys.into_iter().peekable();
    while keys.peek().is_some() {
        let index = chunks.len();
        chunks.push(Chunk {
            index,
            keys: keys.by_ref().take(chunk_size).collect(),
        });
    }
    Ok(chunks)
}
