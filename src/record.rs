use smallvec::SmallVec;

/// Field separator of the UMI count format.
pub const SEPARATOR: u8 = b' ';

/// One line of a UMI count file: `<position> <count> <umi1> ... <umiN>`.
///
/// A record borrows from the line it was parsed from and is cheap to create, so lines are parsed
/// again every time they are visited instead of being kept around.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record<'a> {
    pub position: Option<&'a [u8]>,
    pub count: i64,
    pub umis: SmallVec<[&'a [u8]; 8]>,
    /// Number of barcode tokens dropped because they exceed the width bound
    pub oversized: usize,
}

impl<'a> Record<'a> {
    /// Parse a line without a barcode width bound. Parsing never fails: missing fields leave the
    /// record empty and a non numeric count becomes 0.
    pub fn parse(line: &'a [u8]) -> Record<'a> {
        Record::parse_bounded(line, None)
    }

    /// Parse a line, treating barcode tokens longer than `max_umi_len` as absent.
    pub fn parse_bounded(line: &'a [u8], max_umi_len: Option<usize>) -> Record<'a> {
        let mut record = Record::default();
        let mut tokens = tokens(line);

        record.position = tokens.next();
        record.count = tokens.next().map(parse_count).unwrap_or(0);

        for umi in tokens {
            match max_umi_len {
                Some(max) if umi.len() > max => record.oversized += 1,
                _ => record.umis.push(umi),
            }
        }

        record
    }

    pub fn has_umis(&self) -> bool {
        !self.umis.is_empty()
    }
}

/// Split a line into its non empty space separated tokens.
pub fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|&b| b == SEPARATOR).filter(|t| !t.is_empty())
}

/// Best effort integer parse of the leading digits, like C `atoi`.
pub fn parse_count(token: &[u8]) -> i64 {
    lexical_core::parse_partial::<i64>(token)
        .map(|(count, _)| count)
        .unwrap_or(0)
}
