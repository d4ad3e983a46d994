use std::path::Path;

use spoor_util::file_system::{FileReader, FileWriter};
use thiserror::Error;

use crate::types::Symbols;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to open the symbols file {path}")]
    FailedToOpenFile { path: String },
    #[error("failed to serialize the symbol table")]
    SerializationError(#[from] Box<bincode::ErrorKind>),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open the symbols file {path}")]
    FailedToOpenFile { path: String },
    #[error("corrupt or truncated symbol table")]
    CorruptData(#[from] Box<bincode::ErrorKind>),
}

/// Serialize `symbols` with bincode's length-delimited encoding and write it
/// to `path` via `file_writer`.
pub fn write_symbols_file(
    file_writer: &impl FileWriter,
    path: &Path,
    symbols: &Symbols,
) -> Result<(), WriteError> {
    let bytes = bincode::serialize(symbols)?;
    file_writer
        .write(path, &bytes)
        .map_err(|_| WriteError::FailedToOpenFile { path: path.display().to_string() })
}

/// Inverse of [`write_symbols_file`].
pub fn read_symbols_file(file_reader: &impl FileReader, path: &Path) -> Result<Symbols, ReadError> {
    let bytes = file_reader
        .read(path)
        .map_err(|_| ReadError::FailedToOpenFile { path: path.display().to_string() })?;
    Ok(bincode::deserialize(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FunctionInfo;
    use spoor_util::file_system::MockFileSystem;
    use std::path::Path;

    #[test]
    fn round_trips_through_the_mock_file_system() {
        let mut symbols = Symbols::new();
        symbols.insert(
            1,
            FunctionInfo {
                module_id: "m".to_string(),
                linkage_name: "_Zfoo".to_string(),
                demangled_name: "foo".to_string(),
                file_name: "foo.rs".to_string(),
                directory: "src".to_string(),
                line: 10,
                instrumented: true,
                created_at: 123,
            },
        );

        let fs = MockFileSystem::new();
        let path = Path::new("/symbols.spoor_symbols");
        write_symbols_file(&fs, path, &symbols).unwrap();
        let read_back = read_symbols_file(&fs, path).unwrap();
        assert_eq!(read_back, symbols);
    }

    #[test]
    fn read_reports_missing_file() {
        let fs = MockFileSystem::new();
        assert!(matches!(
            read_symbols_file(&fs, Path::new("/missing")),
            Err(ReadError::FailedToOpenFile { .. })
        ));
    }

    #[test]
    fn read_reports_corrupt_data() {
        let fs = MockFileSystem::new().with_file("/corrupt", vec![0xff; 4]);
        assert!(matches!(
            read_symbols_file(&fs, Path::new("/corrupt")),
            Err(ReadError::CorruptData(_))
        ));
    }
}
