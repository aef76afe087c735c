use crate::error::SheetwiseError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnifiedReaderError {
    #[error("No data in buffer for '{0}'")]
    EmptyBufferError(String),
}

/// A unified reader over either a local workbook file or an in-memory copy of one
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer, e.g. an upload held by the caller
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local workbook file
    ///
    /// # Arguments
    /// * `path` - Path to the file
    ///
    /// # Returns
    /// * `Result<UnifiedReader, SheetwiseError>` - Reader for the file content
    pub(crate) fn open(path: &Path) -> Result<UnifiedReader, SheetwiseError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Wraps bytes already held in memory
    pub(crate) fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<UnifiedReader, SheetwiseError> {
        if bytes.is_empty() {
            Err(UnifiedReaderError::EmptyBufferError(name.to_owned()))?;
        }
        Ok(UnifiedReader::Memory(Cursor::new(bytes)))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_local_file() {
        let result = UnifiedReader::open(Path::new("Cargo.toml"));
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = UnifiedReader::open(Path::new("non_existent_file.xlsx"));
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_memory_reader() {
        let mut reader = UnifiedReader::from_bytes("buffer", b"PK\x03\x04".to_vec()).unwrap();
        let mut head = [0u8; 2];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"PK");
        reader.seek(std::io::SeekFrom::Start(0)).unwrap();
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"PK");

        assert!(UnifiedReader::from_bytes("empty", Vec::new()).is_err());
    }
}
