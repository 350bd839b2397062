mod errors;
mod reader;
mod types;
pub use errors::StreamCorrupt;
pub use reader::{sub_block, BlockReader};
pub use types::{CodeResult, CodeTable, IndexResult, MAX_CODES, MAX_CODE_SIZE};

const MIN_ROOT_SIZE: u8 = 2;
const MAX_ROOT_SIZE: u8 = 8;
// The longest expansion is one symbol per table entry plus the KwKwK repeat.
const STACK_LIMIT: usize = MAX_CODES + 1;

/// GIF-flavoured variable-width LZW decompressor.
///
/// Produces one palette index per call so the caller can place pixels as they
/// come out. Multi-symbol codes are expanded onto an explicit stack and
/// popped in LIFO order. The tables are allocated once and reused for every
/// image.
pub struct Decompressor {
    reader: BlockReader,
    table: CodeTable,
    stack: Vec<u8>,
    root_size: u8,
    code_size: u8,
    clear_code: u16,
    end_code: u16,
    max_code: u16,
    max_code_size: u16,
    first_code: u16,
    old_code: u16,
    fresh: bool,
}

impl Decompressor {
    pub fn new() -> Self {
        Decompressor {
            reader: BlockReader::new(),
            table: CodeTable::new(),
            stack: Vec::with_capacity(STACK_LIMIT),
            root_size: MIN_ROOT_SIZE,
            code_size: MIN_ROOT_SIZE + 1,
            clear_code: 1 << MIN_ROOT_SIZE,
            end_code: (1 << MIN_ROOT_SIZE) + 1,
            max_code: (1 << MIN_ROOT_SIZE) + 2,
            max_code_size: 2 << MIN_ROOT_SIZE,
            first_code: 0,
            old_code: 0,
            fresh: true,
        }
    }

    /// Prepare for a new image whose data starts with the given root code size.
    pub fn initialise(&mut self, root_size: u8) -> Result<(), StreamCorrupt> {
        self.reader.reset();
        if !(MIN_ROOT_SIZE..=MAX_ROOT_SIZE).contains(&root_size) {
            return Err(StreamCorrupt::InvalidRootSize(root_size));
        }
        self.root_size = root_size;
        self.clear_code = 1 << root_size;
        self.end_code = self.clear_code + 1;
        self.reset_table();
        self.fresh = true;
        Ok(())
    }

    pub fn reader(&self) -> &BlockReader {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut BlockReader {
        &mut self.reader
    }

    fn reset_table(&mut self) {
        self.table.reset(self.clear_code);
        self.code_size = self.root_size + 1;
        self.max_code = self.clear_code + 2;
        self.max_code_size = 2 * self.clear_code;
        self.stack.clear();
    }

    /// Read the first code after a clear, skipping repeated clears. It has to
    /// be a root.
    fn read_root(&mut self, input: &mut &[u8]) -> IndexResult {
        loop {
            let code = match self.reader.next_code(input, self.code_size) {
                CodeResult::Code(code) => code,
                CodeResult::EndOfStream => return IndexResult::EndOfData,
                CodeResult::Corrupt(e) => return IndexResult::Corrupt(e),
            };
            if code == self.clear_code {
                continue;
            }
            if code == self.end_code {
                return self.end_of_data(input);
            }
            if code > self.clear_code {
                return IndexResult::Corrupt(StreamCorrupt::InvalidCode {
                    code,
                    clear_code: self.clear_code,
                });
            }
            self.first_code = code;
            self.old_code = code;
            return IndexResult::Index(code as u8);
        }
    }

    fn end_of_data(&mut self, input: &mut &[u8]) -> IndexResult {
        match self.reader.finish(input) {
            Ok(()) => IndexResult::EndOfData,
            Err(e) => IndexResult::Corrupt(e),
        }
    }

    fn push(&mut self, symbol: u8) -> Result<(), StreamCorrupt> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(StreamCorrupt::StackOverflow);
        }
        self.stack.push(symbol);
        Ok(())
    }

    /// Expand `code` onto the stack and grow the table by one entry.
    fn expand(&mut self, code: u16) -> Result<(), StreamCorrupt> {
        let in_code = code;
        let mut code = code;
        if code >= self.max_code {
            // KwKwK: the code being defined right now.
            self.push(self.first_code as u8)?;
            code = self.old_code;
        }

        let corrupt = StreamCorrupt::InvalidCode {
            code,
            clear_code: self.clear_code,
        };
        while code >= self.clear_code {
            let suffix = self.table.suffix(code).ok_or_else(|| corrupt.clone())?;
            let prefix = self.table.prefix(code).ok_or_else(|| corrupt.clone())?;
            self.push(suffix)?;
            if prefix == code {
                return Err(StreamCorrupt::CyclicEntry(code));
            }
            code = prefix;
        }

        let root = self.table.suffix(code).ok_or(corrupt)?;
        self.first_code = root as u16;
        self.push(root)?;

        if (self.max_code as usize) < MAX_CODES
            && self.table.insert(self.max_code, self.old_code, root)
        {
            self.max_code += 1;
            if self.max_code >= self.max_code_size && (self.max_code_size as usize) < MAX_CODES {
                self.max_code_size <<= 1;
                self.code_size += 1;
            }
        }
        self.old_code = in_code;
        Ok(())
    }

    /// Next palette index of the current image.
    pub fn next_index(&mut self, input: &mut &[u8]) -> IndexResult {
        if self.fresh {
            self.fresh = false;
            return self.read_root(input);
        }

        if let Some(symbol) = self.stack.pop() {
            return IndexResult::Index(symbol);
        }

        let code = match self.reader.next_code(input, self.code_size) {
            CodeResult::Code(code) => code,
            CodeResult::EndOfStream => return IndexResult::EndOfData,
            CodeResult::Corrupt(e) => return IndexResult::Corrupt(e),
        };

        if code == self.clear_code {
            self.reset_table();
            return self.read_root(input);
        }
        if code == self.end_code {
            return self.end_of_data(input);
        }

        if let Err(e) = self.expand(code) {
            return IndexResult::Corrupt(e);
        }
        match self.stack.pop() {
            Some(symbol) => IndexResult::Index(symbol),
            None => IndexResult::EndOfData,
        }
    }

    /// Decode a whole image's index stream. Returns what was decoded before
    /// the end of data, or the corruption that stopped it.
    pub fn decompress(
        &mut self,
        input: &mut &[u8],
        root_size: u8,
    ) -> Result<Vec<u8>, StreamCorrupt> {
        self.initialise(root_size)?;
        let mut index_stream = Vec::new();
        loop {
            match self.next_index(input) {
                IndexResult::Index(index) => index_stream.push(index),
                IndexResult::EndOfData => break,
                IndexResult::Corrupt(e) => return Err(e),
            }
        }
        Ok(index_stream)
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}
