//! In-memory TIFF container: header plus the chain of IFDs.

use std::collections::HashSet;

use tracing::debug;

use crate::error::TiffError;

use super::parser::{Ifd, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::values::ValueReader;

/// Maximum number of IFDs to walk.
///
/// Protects against corrupt files with long or circular IFD chains.
const MAX_IFDS: usize = 1024;

/// A TIFF file whose structure has been parsed from a byte buffer.
#[derive(Debug, Clone)]
pub struct TiffFile<'a> {
    data: &'a [u8],
    header: TiffHeader,
    ifds: Vec<Ifd>,
}

impl<'a> TiffFile<'a> {
    /// Parse the header and walk the IFD chain.
    ///
    /// The first IFD must parse. A broken link further down the chain ends
    /// the walk instead of failing, so the pages read so far stay usable.
    pub fn parse(data: &'a [u8]) -> Result<Self, TiffError> {
        let head = &data[..data.len().min(BIGTIFF_HEADER_SIZE)];
        let header = TiffHeader::parse(head, data.len() as u64)?;

        let mut ifds = Vec::new();
        let mut visited = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if !visited.insert(offset) {
                debug!(offset, "IFD chain loops back, stopping");
                break;
            }

            let ifd = match Ifd::parse(data, offset, &header) {
                Ok(ifd) => ifd,
                Err(e) if !ifds.is_empty() => {
                    debug!(offset, error = %e, "Ignoring unreadable trailing IFD");
                    break;
                }
                Err(e) => return Err(e),
            };

            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(Self { data, header, ifds })
    }

    /// The parsed header.
    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    /// All IFDs in chain order.
    pub fn ifds(&self) -> &[Ifd] {
        &self.ifds
    }

    /// The complete file contents.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// A value reader bound to this file.
    pub fn values(&self) -> ValueReader<'_> {
        ValueReader::new(self.data, &self.header)
    }
}
