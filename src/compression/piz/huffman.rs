//! Canonical huffman coding of 16-bit values, as used by `PIZ`.
//! The code table is stored in front of the bit stream, as run length encoded code lengths.

const INVALID_TABLE_SIZE: &str = "huffman table bounds";
const TABLE_TOO_LONG: &str = "huffman code table is longer than its bounds";
const INVALID_TABLE_ENTRY: &str = "invalid huffman code table entry";
const INVALID_BIT_COUNT: &str = "huffman bit count exceeds the data";
const INVALID_CODE: &str = "invalid huffman code";
const NOT_ENOUGH_DATA: &str = "huffman data ends early";
const TOO_MUCH_DATA: &str = "huffman data is longer than expected";

/// Bits looked up at once in the decoding table.
const DECODE_BITS: u32 = 14;
const DECODE_MASK: u64 = (1 << DECODE_BITS) - 1;

/// Every 16-bit value plus the run length symbol.
const SYMBOL_COUNT: usize = (1 << 16) + 1;
const MAX_CODE_LENGTH: usize = 58;

const SHORT_ZERO_RUN: u64 = 59;
const LONG_ZERO_RUN: u64 = 63;
const SHORTEST_LONG_RUN: u64 = 2 + LONG_ZERO_RUN - SHORT_ZERO_RUN;

type Result<T> = std::result::Result<T, &'static str>;

/// An entry of the encoding table: the code length in the lowest six bits, the code above.
#[derive(Clone, Copy, Default)]
struct Code(u64);

impl Code {
    fn length(self) -> u32 { (self.0 & 63) as u32 }
    fn bits(self) -> u64 { self.0 >> 6 }
}

#[derive(Clone)]
enum Entry {
    Empty,

    /// A code no longer than `DECODE_BITS`, found with a single lookup.
    Short { symbol: u32, length: u32 },

    /// All longer codes that start with these bits.
    Long(Vec<u32>),
}

/// Most significant bit first.
struct BitReader<'b> {
    bytes: &'b [u8],
    bits: u64,
    bit_count: u32,
}

impl<'b> BitReader<'b> {
    fn new(bytes: &'b [u8]) -> Self {
        BitReader { bytes, bits: 0, bit_count: 0 }
    }

    fn has_bytes(&self) -> bool {
        !self.bytes.is_empty()
    }

    fn load_byte(&mut self) -> Result<()> {
        let (&byte, rest) = self.bytes.split_first().ok_or(NOT_ENOUGH_DATA)?;
        self.bytes = rest;
        self.bits = (self.bits << 8) | byte as u64;
        self.bit_count += 8;
        Ok(())
    }

    fn read(&mut self, count: u32) -> Result<u64> {
        while self.bit_count < count { self.load_byte()?; }
        self.bit_count -= count;
        Ok((self.bits >> self.bit_count) & ((1 << count) - 1))
    }
}

/// Decode exactly `expected_count` values.
pub fn decompress(compressed: &[u8], expected_count: usize) -> Result<Vec<u16>> {
    if compressed.is_empty() {
        return if expected_count == 0 { Ok(Vec::new()) } else { Err(NOT_ENOUGH_DATA) };
    }

    if compressed.len() < 20 { return Err(NOT_ENOUGH_DATA); }

    let word = |index: usize| {
        let mut bytes = [0_u8; 4];
        bytes.copy_from_slice(&compressed[index * 4 .. index * 4 + 4]);
        u32::from_le_bytes(bytes) as usize
    };

    let (min_symbol, max_symbol) = (word(0), word(1));
    let bit_count = word(3);

    if min_symbol >= SYMBOL_COUNT || max_symbol >= SYMBOL_COUNT || min_symbol > max_symbol {
        return Err(INVALID_TABLE_SIZE);
    }

    let mut table_reader = BitReader::new(&compressed[20..]);
    let codes = read_code_table(&mut table_reader, min_symbol, max_symbol)?;

    let data = table_reader.bytes;
    if bit_count > data.len() * 8 { return Err(INVALID_BIT_COUNT); }

    let decoding_table = build_decoding_table(&codes, min_symbol, max_symbol)?;
    let data = &data[.. (bit_count + 7) / 8];

    decode(&codes, &decoding_table, data, bit_count, max_symbol as u32, expected_count)
}

/// Unpack the code lengths and assign the canonical codes.
fn read_code_table(reader: &mut BitReader<'_>, min_symbol: usize, max_symbol: usize) -> Result<Vec<Code>> {
    let mut codes = vec![Code::default(); SYMBOL_COUNT];
    let mut symbol = min_symbol;

    while symbol <= max_symbol {
        let length = reader.read(6).map_err(|_| INVALID_TABLE_SIZE)?;

        let zero_run = if length == LONG_ZERO_RUN {
            Some(reader.read(8).map_err(|_| INVALID_TABLE_SIZE)? + SHORTEST_LONG_RUN)
        }
        else if length >= SHORT_ZERO_RUN {
            Some(length - SHORT_ZERO_RUN + 2)
        }
        else {
            None
        };

        match zero_run {
            Some(run) => {
                let run = run as usize;
                if symbol + run > max_symbol + 1 { return Err(TABLE_TOO_LONG); }
                symbol += run;
            },

            None => {
                codes[symbol] = Code(length);
                symbol += 1;
            }
        }
    }

    assign_canonical_codes(&mut codes);
    Ok(codes)
}

/// Longer codes get numerically smaller prefixes.
/// Symbols of the same length are numbered in symbol order.
fn assign_canonical_codes(codes: &mut [Code]) {
    let mut count_per_length = [0_u64; MAX_CODE_LENGTH + 1];
    for code in codes.iter() {
        count_per_length[code.length() as usize] += 1;
    }

    let mut next_code = 0_u64;
    for length in (1 ..= MAX_CODE_LENGTH).rev() {
        let following = (next_code + count_per_length[length]) >> 1;
        count_per_length[length] = next_code;
        next_code = following;
    }

    for code in codes.iter_mut() {
        let length = code.length() as usize;
        if length > 0 {
            *code = Code(length as u64 | (count_per_length[length] << 6));
            count_per_length[length] += 1;
        }
    }
}

fn build_decoding_table(codes: &[Code], min_symbol: usize, max_symbol: usize) -> Result<Vec<Entry>> {
    let mut table = vec![Entry::Empty; 1 << DECODE_BITS];

    for symbol in min_symbol ..= max_symbol {
        let code = codes[symbol];
        let length = code.length();

        if code.bits() >> length != 0 { return Err(INVALID_TABLE_ENTRY); }

        if length > DECODE_BITS {
            let entry = &mut table[(code.bits() >> (length - DECODE_BITS)) as usize];

            match entry {
                Entry::Empty => *entry = Entry::Long(vec![ symbol as u32 ]),
                Entry::Long(symbols) => symbols.push(symbol as u32),
                Entry::Short { .. } => return Err(INVALID_TABLE_ENTRY),
            }
        }
        else if length > 0 {
            let start = (code.bits() << (DECODE_BITS - length)) as usize;
            let count = 1_usize << (DECODE_BITS - length);

            for entry in &mut table[start .. start + count] {
                if !matches!(entry, Entry::Empty) { return Err(INVALID_TABLE_ENTRY); }
                *entry = Entry::Short { symbol: symbol as u32, length };
            }
        }
    }

    Ok(table)
}

fn decode(
    codes: &[Code], table: &[Entry], data: &[u8], bit_count: usize,
    run_length_symbol: u32, expected_count: usize,
) -> Result<Vec<u16>>
{
    let mut output = Vec::with_capacity(expected_count);
    let mut reader = BitReader::new(data);

    while reader.has_bytes() {
        reader.load_byte()?;

        while reader.bit_count >= DECODE_BITS {
            let index = (reader.bits >> (reader.bit_count - DECODE_BITS)) & DECODE_MASK;

            match &table[index as usize] {
                Entry::Short { symbol, length } => {
                    reader.bit_count -= length;
                    emit(*symbol, run_length_symbol, &mut reader, &mut output, expected_count)?;
                },

                Entry::Long(symbols) => {
                    let mut found = None;

                    for &symbol in symbols {
                        let code = codes[symbol as usize];
                        let length = code.length();

                        while reader.bit_count < length && reader.has_bytes() {
                            reader.load_byte()?;
                        }

                        if reader.bit_count >= length {
                            let bits = (reader.bits >> (reader.bit_count - length)) & ((1 << length) - 1);
                            if bits == code.bits() {
                                reader.bit_count -= length;
                                found = Some(symbol);
                                break;
                            }
                        }
                    }

                    let symbol = found.ok_or(INVALID_CODE)?;
                    emit(symbol, run_length_symbol, &mut reader, &mut output, expected_count)?;
                },

                Entry::Empty => return Err(INVALID_CODE),
            }
        }
    }

    // the last byte is padded with zeroes
    let padding = ((8 - bit_count % 8) % 8) as u32;
    if padding > reader.bit_count { return Err(INVALID_BIT_COUNT); }
    reader.bits >>= padding;
    reader.bit_count -= padding;

    while reader.bit_count > 0 {
        let index = (reader.bits << (DECODE_BITS - reader.bit_count)) & DECODE_MASK;

        match table[index as usize] {
            Entry::Short { symbol, length } if length <= reader.bit_count => {
                reader.bit_count -= length;
                emit(symbol, run_length_symbol, &mut reader, &mut output, expected_count)?;
            },

            _ => return Err(INVALID_CODE),
        }
    }

    if output.len() == expected_count { Ok(output) }
    else { Err(NOT_ENOUGH_DATA) }
}

/// Append a decoded symbol. The run length symbol is followed by
/// eight bits that say how often to repeat the previous value.
fn emit(
    symbol: u32, run_length_symbol: u32, reader: &mut BitReader<'_>,
    output: &mut Vec<u16>, expected_count: usize,
) -> Result<()>
{
    if symbol == run_length_symbol {
        let repetitions = reader.read(8)? as usize;
        let previous = *output.last().ok_or(NOT_ENOUGH_DATA)?;

        if output.len() + repetitions > expected_count { return Err(TOO_MUCH_DATA); }
        output.resize(output.len() + repetitions, previous);
    }
    else if output.len() < expected_count {
        output.push(symbol as u16);
    }
    else {
        return Err(TOO_MUCH_DATA);
    }

    Ok(())
}
