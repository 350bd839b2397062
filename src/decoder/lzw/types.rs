use super::errors::StreamCorrupt;

/// Codes are at most 12 bits wide, so the table never grows past this.
pub const MAX_CODES: usize = 1 << 12;
pub const MAX_CODE_SIZE: u8 = 12;

#[derive(Debug, PartialEq, Clone)]
pub enum CodeResult {
    Code(u16),
    EndOfStream,
    Corrupt(StreamCorrupt),
}

#[derive(Debug, PartialEq, Clone)]
pub enum IndexResult {
    Index(u8),
    EndOfData,
    Corrupt(StreamCorrupt),
}

/// Prefix/suffix dictionary sized to the 12-bit code space.
///
/// Entry `c` expands to the expansion of `prefix[c]` followed by `suffix[c]`;
/// roots (`c < clear_code`) expand to themselves.
pub struct CodeTable {
    prefix: Box<[u16; MAX_CODES]>,
    suffix: Box<[u8; MAX_CODES]>,
}

impl CodeTable {
    pub fn new() -> Self {
        CodeTable {
            prefix: Box::new([0; MAX_CODES]),
            suffix: Box::new([0; MAX_CODES]),
        }
    }

    pub fn reset(&mut self, clear_code: u16) {
        self.prefix.fill(0);
        self.suffix.fill(0);
        for (code, suffix) in self.suffix.iter_mut().enumerate().take(clear_code as usize) {
            // Root codes never exceed 255 since the root size is at most 8.
            *suffix = code as u8;
        }
    }

    pub fn prefix(&self, code: u16) -> Option<u16> {
        self.prefix.get(code as usize).copied()
    }

    pub fn suffix(&self, code: u16) -> Option<u8> {
        self.suffix.get(code as usize).copied()
    }

    /// Returns false when the table is already full.
    pub fn insert(&mut self, code: u16, prefix: u16, suffix: u8) -> bool {
        match (
            self.prefix.get_mut(code as usize),
            self.suffix.get_mut(code as usize),
        ) {
            (Some(p), Some(s)) => {
                *p = prefix;
                *s = suffix;
                true
            }
            _ => false,
        }
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::new()
    }
}
