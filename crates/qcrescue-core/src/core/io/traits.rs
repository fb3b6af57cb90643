use crate::core::models::deck::InputDeck;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing input deck formats.
///
/// Implementors handle format-specific parsing and serialization; the path helpers are shared.
pub trait DeckFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads an input deck from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<InputDeck, Self::Error>;

    /// Writes an input deck to a writer.
    ///
    /// # Arguments
    ///
    /// * `deck` - The deck to write.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or I/O operations encounter issues.
    fn write_to(deck: &InputDeck, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads an input deck from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<InputDeck, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes an input deck to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(deck: &InputDeck, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(deck, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
