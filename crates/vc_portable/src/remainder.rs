/// Bytes of a record that the reading schema could not interpret.
///
/// Captured on read when the type declares a remainder field, and written
/// back verbatim unless the object is force-written at a lower version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemainderValue {
    origin_version: u32,
    payload: Option<Box<[u8]>>,
}

impl RemainderValue {
    #[inline]
    pub fn new(origin_version: u32, payload: Option<Box<[u8]>>) -> Self {
        Self {
            origin_version,
            payload,
        }
    }

    /// An empty `bytes` slice is stored as no payload.
    #[inline]
    pub fn capture(origin_version: u32, bytes: &[u8]) -> Self {
        let payload = (!bytes.is_empty()).then(|| bytes.into());
        Self::new(origin_version, payload)
    }

    /// Version of the record the bytes were read from.
    #[inline]
    pub fn origin_version(&self) -> u32 {
        self.origin_version
    }

    #[inline]
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }
}
