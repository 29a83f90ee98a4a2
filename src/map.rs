/// Named byte ranges of an envelope being built or taken apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// JOSE header JSON
    Jose,
    /// JWE encrypted key
    EncryptedKey,
    /// JWE additional authenticated data
    Aad,
    /// JWE initialization vector
    Iv,
    /// JWE ciphertext
    Ciphertext,
    /// JWE authentication tag
    Tag,
    /// JWS payload
    Payload,
    /// JWS unprotected header
    UnprotectedHeader,
    /// JWS signature
    Signature,
}

impl Slot {
    pub const COUNT: usize = 9;

    fn index(self) -> usize {
        self as usize
    }
}

/// Fixed table of borrowed views, one per [`Slot`].
///
/// The map never owns the bytes it points to. A slot is either empty or
/// replaced in one assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteRangeMap<'a> {
    slots: [&'a [u8]; Slot::COUNT],
}

impl<'a> ByteRangeMap<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> &'a [u8] {
        self.slots[slot.index()]
    }

    pub fn set(&mut self, slot: Slot, bytes: &'a [u8]) {
        self.slots[slot.index()] = bytes;
    }

    pub fn is_set(&self, slot: Slot) -> bool {
        !self.slots[slot.index()].is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
