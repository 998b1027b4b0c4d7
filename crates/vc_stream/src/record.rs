use crate::error::{StreamError, StreamResult};
use crate::value::{ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// RecordWriter

/// Builds one versioned record.
///
/// Properties must be written in strictly ascending index order. Once a
/// remainder is appended the record is closed.
#[derive(Debug, Default, Clone)]
pub struct RecordWriter {
    version: u32,
    body: ValueWriter,
    last_index: Option<u32>,
    closed: bool,
}

impl RecordWriter {
    #[inline]
    pub const fn new(version: u32) -> Self {
        Self {
            version,
            body: ValueWriter::new(),
            last_index: None,
            closed: false,
        }
    }

    #[inline]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Changes the version tag. Only the header depends on it, so this may
    /// happen at any point before [`finish_into`](Self::finish_into).
    #[inline]
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn claim_index(&mut self, index: u32) -> StreamResult<()> {
        if self.closed {
            return Err(StreamError::RecordClosed);
        }
        if let Some(last) = self.last_index
            && index <= last
        {
            return Err(StreamError::IndexOutOfOrder { index, last });
        }
        self.last_index = Some(index);
        Ok(())
    }

    /// Writes property `index` whose payload is produced by `f`.
    ///
    /// The closure error type only has to absorb [`StreamError`], so callers
    /// can thread their own errors through.
    pub fn write_property<E, F>(&mut self, index: u32, f: F) -> Result<(), E>
    where
        E: From<StreamError>,
        F: FnOnce(&mut ValueWriter) -> Result<(), E>,
    {
        self.claim_index(index)?;
        let mut payload = ValueWriter::new();
        f(&mut payload)?;
        self.body.write_var_u64(index as u64);
        self.body.write_bytes(payload.as_bytes());
        Ok(())
    }

    /// Writes property `index` whose payload is a nested record.
    pub fn write_nested<E, F>(&mut self, index: u32, f: F) -> Result<(), E>
    where
        E: From<StreamError>,
        F: FnOnce(&mut RecordWriter) -> Result<(), E>,
    {
        let mut nested = RecordWriter::new(0);
        f(&mut nested)?;
        self.write_property(index, |w| {
            nested.finish_into(w);
            Ok(())
        })
    }

    /// Appends already-encoded properties verbatim and closes the record.
    pub fn write_remainder(&mut self, bytes: &[u8]) -> StreamResult<()> {
        if self.closed {
            return Err(StreamError::RecordClosed);
        }
        self.body.write_raw(bytes);
        self.closed = true;
        Ok(())
    }

    /// Writes the header and body into `out`.
    pub fn finish_into(&self, out: &mut ValueWriter) {
        out.write_var_u64(self.version as u64);
        out.write_bytes(self.body.as_bytes());
    }
}

// -----------------------------------------------------------------------------
// RecordReader

#[derive(Debug, Clone, Copy)]
struct Pending<'a> {
    index: u32,
    start: usize,
    payload: &'a [u8],
}

/// Reads the properties of one record in ascending index order.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    version: u32,
    body: ValueReader<'a>,
    raw: &'a [u8],
    pending: Option<Pending<'a>>,
    last_index: Option<u32>,
}

impl<'a> RecordReader<'a> {
    #[inline]
    pub(crate) const fn new(version: u32, raw: &'a [u8]) -> Self {
        Self {
            version,
            body: ValueReader::new(raw),
            raw,
            pending: None,
            last_index: None,
        }
    }

    #[inline]
    pub const fn version(&self) -> u32 {
        self.version
    }

    fn peek(&mut self) -> StreamResult<Option<Pending<'a>>> {
        if self.pending.is_none() && !self.body.is_empty() {
            let start = self.body.position();
            let index = self.body.read_var_u64()?;
            let index = u32::try_from(index).map_err(|_| StreamError::VarIntOverflow { bits: 32 })?;
            let payload = self.body.read_bytes()?;
            self.pending = Some(Pending {
                index,
                start,
                payload,
            });
        }
        Ok(self.pending)
    }

    /// Returns the payload of property `index`, or `None` if the record has
    /// no such property.
    ///
    /// Properties with a lower index that were not asked for are skipped.
    pub fn read_property(&mut self, index: u32) -> StreamResult<Option<ValueReader<'a>>> {
        if let Some(last) = self.last_index
            && index <= last
        {
            return Err(StreamError::IndexOutOfOrder { index, last });
        }
        self.last_index = Some(index);

        while let Some(pending) = self.peek()? {
            if pending.index < index {
                log::trace!("skipping unread property {}", pending.index);
                self.pending = None;
                continue;
            }
            if pending.index == index {
                self.pending = None;
                return Ok(Some(ValueReader::new(pending.payload)));
            }
            break;
        }
        Ok(None)
    }

    /// Returns the nested record stored at `index`, if any.
    pub fn read_nested(&mut self, index: u32) -> StreamResult<Option<RecordReader<'a>>> {
        match self.read_property(index)? {
            Some(mut payload) => Ok(Some(payload.read_record()?)),
            None => Ok(None),
        }
    }

    /// Returns every body byte not consumed yet, starting at the first
    /// property that was not read.
    pub fn read_remainder(&mut self) -> &'a [u8] {
        let start = match self.pending.take() {
            Some(pending) => pending.start,
            None => self.body.position(),
        };
        self.body.read_rest();
        self.last_index = Some(u32::MAX);
        &self.raw[start..]
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::RecordWriter;
    use crate::{StreamError, StreamResult, ValueReader, ValueWriter};

    fn encode(record: &RecordWriter) -> Vec<u8> {
        let mut out = ValueWriter::new();
        record.finish_into(&mut out);
        out.into_bytes()
    }

    fn int(record: &mut RecordWriter, index: u32, v: i64) -> StreamResult<()> {
        record.write_property(index, |w| {
            w.write_var_i64(v);
            Ok(())
        })
    }

    #[test]
    fn skips_missing_and_unknown() {
        let mut record = RecordWriter::new(1);
        int(&mut record, 1, 10).unwrap();
        int(&mut record, 3, 30).unwrap();
        int(&mut record, 4, 40).unwrap();
        let bytes = encode(&record);

        let mut reader = ValueReader::new(&bytes);
        let mut record = reader.read_record().unwrap();
        assert!(reader.is_empty());
        assert_eq!(record.version(), 1);
        assert!(record.read_property(2).unwrap().is_none());
        let mut v = record.read_property(4).unwrap().unwrap();
        assert_eq!(v.read_var_i64().unwrap(), 40);
        assert!(record.read_remainder().is_empty());
    }

    #[test]
    fn rejects_out_of_order() {
        let mut record = RecordWriter::new(0);
        int(&mut record, 2, 0).unwrap();
        assert_eq!(
            int(&mut record, 2, 0),
            Err(StreamError::IndexOutOfOrder { index: 2, last: 2 })
        );

        let bytes = encode(&record);
        let mut reader = ValueReader::new(&bytes);
        let mut record = reader.read_record().unwrap();
        assert!(record.read_property(2).unwrap().is_some());
        assert!(record.read_property(1).is_err());
    }

    #[test]
    fn remainder_is_verbatim() {
        let mut full = RecordWriter::new(3);
        int(&mut full, 1, 1).unwrap();
        int(&mut full, 2, 2).unwrap();
        int(&mut full, 3, 3).unwrap();
        let original = encode(&full);

        // Read only the first property, keep the rest opaque.
        let mut reader = ValueReader::new(&original);
        let mut record = reader.read_record().unwrap();
        let first = record.read_property(1).unwrap().unwrap().read_var_i64().unwrap();
        let rest = record.read_remainder();

        let mut rewritten = RecordWriter::new(record.version());
        int(&mut rewritten, 1, first).unwrap();
        rewritten.write_remainder(rest).unwrap();
        assert_eq!(encode(&rewritten), original);

        assert_eq!(rewritten.write_remainder(&[]), Err(StreamError::RecordClosed));
        assert_eq!(int(&mut rewritten, 9, 0), Err(StreamError::RecordClosed));
    }

    #[test]
    fn remainder_keeps_peeked_property() {
        let mut full = RecordWriter::new(2);
        int(&mut full, 1, 1).unwrap();
        int(&mut full, 5, 5).unwrap();
        let bytes = encode(&full);

        let mut reader = ValueReader::new(&bytes);
        let mut record = reader.read_record().unwrap();
        assert!(record.read_property(1).unwrap().is_some());
        // Index 5 is parsed while looking for 2, but not consumed.
        assert!(record.read_property(2).unwrap().is_none());
        let rest = record.read_remainder();

        let mut expected = RecordWriter::new(0);
        int(&mut expected, 5, 5).unwrap();
        let expected = encode(&expected);
        // Drop the two-byte header (version 0, body length) of the expected record.
        assert_eq!(rest, &expected[2..]);
    }

    #[test]
    fn nested_records() {
        let mut outer = RecordWriter::new(1);
        outer
            .write_nested(0, |inner| {
                inner.set_version(4);
                int(inner, 1, -7)
            })
            .unwrap();
        int(&mut outer, 1, 8).unwrap();
        let bytes = encode(&outer);

        let mut reader = ValueReader::new(&bytes);
        let mut record = reader.read_record().unwrap();
        let mut inner = record.read_nested(0).unwrap().unwrap();
        assert_eq!(inner.version(), 4);
        assert_eq!(inner.read_property(1).unwrap().unwrap().read_var_i64().unwrap(), -7);
        assert_eq!(record.read_property(1).unwrap().unwrap().read_var_i64().unwrap(), 8);
    }
}
