//! Hand-assembled GIF streams for unit tests.

pub fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut ret = Vec::new();
    for chunk in data.chunks(u8::MAX as usize) {
        ret.push(chunk.len() as u8);
        ret.extend_from_slice(chunk);
    }
    ret.push(0);
    ret
}

/// Literal-only LZW: a clear code before every pair of indices keeps the code
/// width at `root_size + 1` for the whole stream.
pub fn encode_literals(root_size: u8, indices: &[u8]) -> Vec<u8> {
    let clear = 1u32 << root_size;
    let width = root_size as u32 + 1;
    let mut acc: u32 = 0;
    let mut n = 0;
    let mut packed = Vec::new();
    let mut emit = |code: u32| {
        acc |= code << n;
        n += width;
        while n >= 8 {
            packed.push(acc as u8);
            acc >>= 8;
            n -= 8;
        }
    };
    for pair in indices.chunks(2) {
        emit(clear);
        for &index in pair {
            emit(index as u32);
        }
    }
    emit(clear + 1);
    if n > 0 {
        packed.push(acc as u8);
    }
    sub_blocks(&packed)
}

fn size_field(len: usize) -> u8 {
    let mut field = 0;
    while (2usize << field) < len && field < 7 {
        field += 1;
    }
    field
}

fn push_table(bytes: &mut Vec<u8>, colors: &[[u8; 3]]) {
    let len = 2usize << size_field(colors.len());
    for i in 0..len {
        bytes.extend_from_slice(&colors.get(i).copied().unwrap_or([0, 0, 0]));
    }
}

pub struct Image<'a> {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub local: Option<&'a [[u8; 3]]>,
    pub root_size: u8,
    pub indices: &'a [u8],
}

impl<'a> Image<'a> {
    pub fn new(width: u16, height: u16, indices: &'a [u8]) -> Self {
        Image {
            left: 0,
            top: 0,
            width,
            height,
            interlaced: false,
            local: None,
            root_size: 2,
            indices,
        }
    }

    pub fn at(mut self, left: u16, top: u16) -> Self {
        self.left = left;
        self.top = top;
        self
    }
}

pub struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16, global: &[[u8; 3]]) -> Self {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        if global.is_empty() {
            bytes.extend_from_slice(&[0, 0, 0]);
        } else {
            bytes.extend_from_slice(&[0x80 | size_field(global.len()), 1, 0]);
            push_table(&mut bytes, global);
        }
        GifBuilder { bytes }
    }

    pub fn control(mut self, delay: u16, transparent: Option<u8>) -> Self {
        let flags = if transparent.is_some() { 1 } else { 0 };
        self.bytes.extend_from_slice(&[0x21, 0xf9, 4, flags]);
        self.bytes.extend_from_slice(&delay.to_le_bytes());
        self.bytes.extend_from_slice(&[transparent.unwrap_or(0), 0]);
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xfe]);
        self.bytes.extend(sub_blocks(text.as_bytes()));
        self
    }

    pub fn image_header(mut self, image: &Image) -> Self {
        self.bytes.push(b',');
        for v in [image.left, image.top, image.width, image.height] {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut flags = if image.interlaced { 0x40 } else { 0 };
        if let Some(local) = image.local {
            flags |= 0x80 | size_field(local.len());
        }
        self.bytes.push(flags);
        if let Some(local) = image.local {
            push_table(&mut self.bytes, local);
        }
        self.bytes.push(image.root_size);
        self
    }

    pub fn image(self, image: Image) -> Self {
        let data = encode_literals(image.root_size, image.indices);
        self.image_header(&image).raw(&data)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.bytes.push(b';');
        self.bytes
    }

    pub fn build_without_trailer(self) -> Vec<u8> {
        self.bytes
    }
}
