//! VCF reading and record access on top of `noodles-vcf`.
//!
//! The header is read by `noodles`; records are then read as raw byte lines
//! so that a line that is not valid UTF-8 or does not parse only affects that
//! record instead of the whole run.

use std::io::{self, BufRead};

use noodles_vcf as vcf;

use crate::err::MalformedRecordError;

pub mod header;
pub mod record;

pub use record::RecordExt;
pub use vcf::{Header, Record};

/// Reader for VCF text from any `BufRead`.
pub struct Reader<R> {
    inner: vcf::Reader<R>,
}

impl<R: BufRead> Reader<R> {
    /// Construct a new reader around `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner: vcf::Reader::new(inner),
        }
    }

    /// Read the header; must be called before reading records.
    pub fn read_header(&mut self) -> Result<Header, anyhow::Error> {
        self.inner
            .read_header()
            .map_err(|e| anyhow::anyhow!("problem reading VCF header: {}", e))
    }

    /// Iterate over the records; I/O errors are fatal, malformed lines are not.
    pub fn records<'r>(&'r mut self, header: &'r Header) -> Records<'r, R> {
        Records {
            inner: self.inner.get_mut(),
            header,
            buf: Vec::new(),
        }
    }
}

/// Iterator over the records of a `Reader`.
pub struct Records<'r, R> {
    inner: &'r mut R,
    header: &'r Header,
    buf: Vec<u8>,
}

impl<'r, R: BufRead> Iterator for Records<'r, R> {
    type Item = io::Result<Result<Record, MalformedRecordError>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => (),
                Err(e) => return Some(Err(e)),
            }
            while matches!(self.buf.last(), Some(b'\n') | Some(b'\r')) {
                self.buf.pop();
            }
            if !self.buf.is_empty() {
                return Some(Ok(parse_record(&self.buf, self.header)));
            }
        }
    }
}

/// Parse one data line against `header`.
pub fn parse_record(line: &[u8], header: &Header) -> Result<Record, MalformedRecordError> {
    let line = std::str::from_utf8(line)
        .map_err(|e| MalformedRecordError::Encoding(e.to_string()))?;
    Record::try_from_str(line, header).map_err(|e| MalformedRecordError::Unparsable(e.to_string()))
}

/// Helpers for building records in tests.
#[cfg(test)]
pub mod testing {
    use super::{parse_record, Header, Record};

    /// Parse a header from its text.
    pub fn header(text: &str) -> Header {
        text.parse().expect("invalid test header")
    }

    /// Parse one record line against `header`.
    pub fn record(header: &Header, line: &str) -> Record {
        parse_record(line.as_bytes(), header).expect("invalid test record")
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::err::MalformedRecordError;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
        ##command=HipSTR\n\
        ##INFO=<ID=PERIOD,Number=1,Type=Integer,Description=\"Period\">\n\
        ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
        ##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n";

    #[test]
    fn read_records() -> Result<(), anyhow::Error> {
        let text = format!(
            "{}1\t100\t.\tACACAC\tACACACAC\t.\t.\tPERIOD=2\tGT:DP\t0/1:10\t0/0:12\n\
             \n\
             1\t200\t.\tAAAA\t.\t.\t.\tPERIOD=1\tGT:DP\t0/0:3\t./.:0\r\n",
            HEADER
        );
        let mut reader = super::Reader::new(text.as_bytes());
        let header = reader.read_header()?;
        assert_eq!(header.sample_names().len(), 2);

        let records = reader
            .records(&header)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 2);
        assert_eq!(usize::from(records[1].position()), 200);

        Ok(())
    }

    #[test]
    fn invalid_lines_do_not_stop_reading() -> Result<(), anyhow::Error> {
        let mut text = HEADER.as_bytes().to_vec();
        text.extend_from_slice(b"1\t100\t.\tAC\tACAC\t.\t.\tPERIOD=2\tGT:DP\t0/1:10\t0/0:12\n");
        text.extend_from_slice(b"1\t150\t.\tAC\tACAC\t.\t.\tPERIOD=2;X=\xff\tGT:DP\t0/1:10\t0/0:12\n");
        text.extend_from_slice(b"1\tpos\t.\tAC\tACAC\t.\t.\tPERIOD=2\tGT:DP\t0/1:10\t0/0:12\n");
        text.extend_from_slice(b"1\t200\t.\tAC\tACAC\t.\t.\tPERIOD=2\tGT:DP\t0/1:10\t0/0:12\n");

        let mut reader = super::Reader::new(text.as_slice());
        let header = reader.read_header()?;
        let records = reader.records(&header).collect::<Result<Vec<_>, _>>()?;

        assert_eq!(records.len(), 4);
        assert!(records[0].is_ok());
        assert!(matches!(records[1], Err(MalformedRecordError::Encoding(_))));
        assert!(matches!(records[2], Err(MalformedRecordError::Unparsable(_))));
        assert!(records[3].is_ok());

        Ok(())
    }

    #[test]
    fn missing_chrom_line() {
        let mut reader = super::Reader::new("##fileformat=VCFv4.2\n1\t1\n".as_bytes());
        assert!(reader.read_header().is_err());
    }
}
