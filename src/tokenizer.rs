use std::mem;

use crate::error::{Error, ErrorKind, Result};
use crate::feed::{LineFeeder, END_OF_LINE};

/// The line break inserted when a quoted field spans physical lines.
///
/// Upstream line decoders strip the physical terminators before the
/// tokenizer ever sees a line, so the tokenizer cannot know what they were.
/// This setting decides what a line break inside a quoted field looks like
/// in the tokenized value. The default is CRLF.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Newline {
    /// Reassemble embedded line breaks as `\r\n`.
    Crlf,
    /// Reassemble embedded line breaks as `\r`.
    Cr,
    /// Reassemble embedded line breaks as `\n`.
    Lf,
}

impl Newline {
    /// Returns this line break as a string slice.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Newline::Crlf => "\r\n",
            Newline::Cr => "\r",
            Newline::Lf => "\n",
        }
    }
}

impl Default for Newline {
    fn default() -> Newline {
        Newline::Crlf
    }
}

/// How quote characters inside a quoted field are interpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuotesInQuotedFields {
    /// Inside a quoted field, only an RFC 4180 doubled quote (or a quote
    /// preceded by the configured escape character) is a literal quote. Any
    /// lone quote closes the field.
    AcceptOnlyRfc4180Escaped,
    /// A lone quote that is not immediately followed by a delimiter or the
    /// end of the line is accepted as a literal character. This only works
    /// under the assumption that fields never contain the delimiter itself;
    /// a quote directly before a delimiter or end of line still closes the
    /// field.
    AcceptStrayQuotesAssumingNoDelimitersInFields,
}

impl QuotesInQuotedFields {
    fn accepts_stray_quotes(&self) -> bool {
        match *self {
            QuotesInQuotedFields::AcceptOnlyRfc4180Escaped => false,
            QuotesInQuotedFields::AcceptStrayQuotesAssumingNoDelimitersInFields => true,
        }
    }
}

impl Default for QuotesInQuotedFields {
    fn default() -> QuotesInQuotedFields {
        QuotesInQuotedFields::AcceptOnlyRfc4180Escaped
    }
}

/// Builds a CSV tokenizer with various configuration knobs.
///
/// The builder is reusable: `build` copies the configuration into the new
/// tokenizer.
///
/// # Example
///
/// ```
/// use csv_tokenizer::TokenizerBuilder;
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), csv_tokenizer::Error> {
///     let lines = vec![
///         "city\tpop".to_string(),
///         "Boston\t4628910".to_string(),
///     ];
///     let mut tok = TokenizerBuilder::new("\t").build(lines.into_iter())?;
///
///     assert!(tok.next_record()?);
///     assert_eq!("city", tok.next_column()?);
///     assert_eq!("pop", tok.next_column()?);
///     assert!(!tok.has_next_column());
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct TokenizerBuilder {
    delimiter: String,
    quote: Option<char>,
    escape: Option<char>,
    newline: Newline,
    trim_if_not_quoted: bool,
    quotes_in_quoted_fields: QuotesInQuotedFields,
    max_quoted_field_length: usize,
    comment_line_marker: Option<String>,
    null_string: Option<String>,
}

impl TokenizerBuilder {
    /// Creates a builder for the given field delimiter.
    ///
    /// The first character of `delimiter` is the delimiter proper. Any
    /// remaining characters must also match, as a literal string, for a
    /// field boundary to be recognized; this supports multi-character
    /// delimiters such as `"||"`.
    pub fn new(delimiter: &str) -> TokenizerBuilder {
        TokenizerBuilder {
            delimiter: delimiter.to_string(),
            quote: Some('"'),
            escape: Some('\\'),
            newline: Newline::default(),
            trim_if_not_quoted: false,
            quotes_in_quoted_fields: QuotesInQuotedFields::default(),
            max_quoted_field_length: 128 * (1 << 10),
            comment_line_marker: None,
            null_string: None,
        }
    }

    /// The quote character to use, or `None` to disable quoting.
    ///
    /// The default is `"`. With quoting disabled, quote characters are
    /// ordinary field content.
    pub fn quote(&mut self, quote: Option<char>) -> &mut TokenizerBuilder {
        self.quote = quote;
        self
    }

    /// The escape character recognized inside quoted fields, or `None` to
    /// disable escaping.
    ///
    /// In RFC 4180, a quote inside a quoted field is escaped by doubling
    /// it. An escape character like `\` is a common alternative; it escapes
    /// the quote character and itself. The default is `\`.
    pub fn escape(&mut self, escape: Option<char>) -> &mut TokenizerBuilder {
        self.escape = escape;
        self
    }

    /// The line break inserted when a quoted field spans physical lines.
    ///
    /// The default is `Newline::Crlf`.
    pub fn newline(&mut self, newline: Newline) -> &mut TokenizerBuilder {
        self.newline = newline;
        self
    }

    /// Whether to strip leading and trailing ASCII spaces from unquoted
    /// fields.
    ///
    /// This is disabled by default. Quoted fields are never trimmed, and
    /// spaces around the quotes themselves are always accepted.
    ///
    /// Trimming cannot be combined with
    /// `QuotesInQuotedFields::AcceptStrayQuotesAssumingNoDelimitersInFields`;
    /// `build` rejects that configuration.
    pub fn trim_if_not_quoted(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.trim_if_not_quoted = yes;
        self
    }

    /// How quote characters inside a quoted field are interpreted.
    ///
    /// The default is `QuotesInQuotedFields::AcceptOnlyRfc4180Escaped`.
    pub fn quotes_in_quoted_fields(
        &mut self,
        policy: QuotesInQuotedFields,
    ) -> &mut TokenizerBuilder {
        self.quotes_in_quoted_fields = policy;
        self
    }

    /// The maximum length, in bytes, of a single quoted field's value.
    ///
    /// Tokenizing fails with `ErrorKind::QuotedFieldLengthLimitExceeded`
    /// when a quoted field grows past this bound, which also bounds the
    /// memory spent on a field with a missing closing quote. The default is
    /// 128 KiB.
    pub fn max_quoted_field_length(
        &mut self,
        limit: usize,
    ) -> &mut TokenizerBuilder {
        self.max_quoted_field_length = limit;
        self
    }

    /// A prefix marking a whole line as a comment to be skipped, e.g. `#`
    /// or `//`.
    ///
    /// By default no comment marker is recognized. Comment lines are only
    /// skipped where blank lines are (see `next_record`), never inside a
    /// multi-line quoted field.
    pub fn comment_line_marker(
        &mut self,
        marker: Option<&str>,
    ) -> &mut TokenizerBuilder {
        self.comment_line_marker = marker.map(|m| m.to_string());
        self
    }

    /// A sentinel string that reads as `None` through
    /// `next_column_or_null`.
    ///
    /// By default no null string is configured; see `next_column_or_null`
    /// for how that changes the treatment of empty fields.
    ///
    /// # Example
    ///
    /// ```
    /// use csv_tokenizer::TokenizerBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), csv_tokenizer::Error> {
    ///     let lines = vec!["1,NULL".to_string()];
    ///     let mut tok = TokenizerBuilder::new(",")
    ///         .null_string(Some("NULL"))
    ///         .build(lines.into_iter())?;
    ///
    ///     assert!(tok.next_record()?);
    ///     assert_eq!(Some("1".to_string()), tok.next_column_or_null()?);
    ///     assert_eq!(None, tok.next_column_or_null()?);
    ///     Ok(())
    /// }
    /// ```
    pub fn null_string(&mut self, null: Option<&str>) -> &mut TokenizerBuilder {
        self.null_string = null.map(|n| n.to_string());
        self
    }

    /// Builds a tokenizer over the given iterator of physical lines.
    ///
    /// Lines must already be split on physical record terminators, with the
    /// terminators removed; an `io::BufRead`-style line reader upstream of
    /// the tokenizer is the usual source.
    ///
    /// This fails with `ErrorKind::Config` if the delimiter is empty, if
    /// NUL appears in the delimiter or as the quote or escape character, or
    /// if trimming is combined with the stray-quotes policy.
    pub fn build<I>(&self, lines: I) -> Result<Tokenizer<I>>
    where
        I: Iterator<Item = String>,
    {
        let mut chars = self.delimiter.chars();
        let delimiter = match chars.next() {
            Some(c) => c,
            None => return Err(Error::config("the delimiter must not be empty")),
        };
        let delimiter_following = chars.as_str().to_string();

        if delimiter == '\0'
            || delimiter_following.contains('\0')
            || self.quote == Some('\0')
            || self.escape == Some('\0')
        {
            return Err(Error::config(
                "NUL cannot be a delimiter, quote or escape character",
            ));
        }
        if self.trim_if_not_quoted
            && self.quotes_in_quoted_fields.accepts_stray_quotes()
        {
            return Err(Error::config(
                "trimming unquoted fields cannot be combined with \
                 accepting stray quotes",
            ));
        }

        // Quote and escape bytes for the bulk skip inside quoted fields.
        // Only ASCII characters are sound jump targets; anything else falls
        // back to the character-by-character loop.
        let quoted_scan = match (self.quote, self.escape) {
            (Some(q), None) if q.is_ascii() => Some((q as u8, None)),
            (Some(q), Some(e)) if q.is_ascii() && e.is_ascii() => {
                Some((q as u8, Some(e as u8)))
            }
            _ => None,
        };

        Ok(Tokenizer {
            feed: LineFeeder::new(lines, self.comment_line_marker.clone()),
            delimiter,
            delimiter_following,
            quote: self.quote,
            escape: self.escape,
            newline: self.newline,
            trim_if_not_quoted: self.trim_if_not_quoted,
            quotes_in_quoted_fields: self.quotes_in_quoted_fields,
            max_quoted_field_length: self.max_quoted_field_length,
            null_string: self.null_string.clone(),
            quoted_scan,
            quoted_value_lines: Vec::new(),
            in_record: false,
            was_quoted_column: false,
        })
    }
}

/// The per-column state of the tokenizer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ColumnState {
    /// At the first character of a column.
    StartField,
    /// Absorbing spaces ahead of a value. Only entered when trimming.
    LeadingSpaces,
    /// Inside an unquoted value.
    InField,
    /// Absorbing spaces that may turn out to be trailing. Only entered when
    /// trimming; falls back to `InField` if the spaces were interior.
    TrailingSpaces,
    /// Inside a quoted value, possibly spanning physical lines.
    InQuotedField,
    /// Past the closing quote, expecting a delimiter or the end of the
    /// line.
    EndQuotedField,
}

/// A pull-based CSV tokenizer over physical lines.
///
/// A tokenizer wraps an iterator of physical lines (each line already split
/// by an upstream line reader, with terminators removed) and yields records
/// column by column: `next_record` advances to the next record, then
/// `next_column` is called while `has_next_column` is true. A record must
/// be drained before advancing to the next one.
///
/// Quoted fields may span physical lines; the tokenizer pulls as many lines
/// as the field needs and joins them with the configured `Newline`. A
/// partially tokenized record can be abandoned with `skip_current_line`,
/// which restores speculatively consumed lines so tokenizing can resume
/// from the next physical line.
///
/// A tokenizer is built with `TokenizerBuilder`.
#[derive(Debug)]
pub struct Tokenizer<I> {
    /// Supplies physical lines: pushed-back lines first, then the upstream
    /// iterator.
    feed: LineFeeder<I>,
    /// The first character of the delimiter.
    delimiter: char,
    /// The rest of a multi-character delimiter. Empty in the common case.
    delimiter_following: String,
    /// The quote character, if quoting is enabled.
    quote: Option<char>,
    /// The escape character, if escaping is enabled.
    escape: Option<char>,
    /// The line break inserted when a quoted field spans physical lines.
    newline: Newline,
    /// Whether to strip leading and trailing spaces from unquoted fields.
    trim_if_not_quoted: bool,
    /// How lone quotes inside a quoted field are interpreted.
    quotes_in_quoted_fields: QuotesInQuotedFields,
    /// Upper bound, in bytes, on the value of a single quoted field.
    max_quoted_field_length: usize,
    /// A field equal to this reads as `None` via `next_column_or_null`.
    null_string: Option<String>,
    /// Quote and escape bytes for the bulk skip inside quoted fields, when
    /// both are ASCII.
    quoted_scan: Option<(u8, Option<u8>)>,
    /// Physical lines absorbed so far into the quoted field currently being
    /// tokenized. Consumed by `skip_current_line`.
    quoted_value_lines: Vec<String>,
    /// True while the current record has more columns to yield.
    in_record: bool,
    /// Whether the last yielded column came from a quoted field.
    was_quoted_column: bool,
}

impl<I: Iterator<Item = String>> Tokenizer<I> {
    /// Returns the number of physical lines consumed so far, including
    /// lines absorbed into multi-line quoted fields.
    ///
    /// Line numbers start at 1; before any line is read this returns 0.
    /// `skip_current_line` rewinds the count by the number of lines it
    /// restores.
    pub fn line_number(&self) -> u64 {
        self.feed.line_number()
    }

    /// Unconditionally consumes and discards one line from the upstream
    /// source, without tokenizing it.
    ///
    /// This does not check that the line actually is a header; it assumes
    /// so. Lines restored by `skip_current_line` are not affected. Returns
    /// false if the source is exhausted.
    pub fn skip_header_line(&mut self) -> bool {
        self.feed.skip_source_line()
    }

    /// Abandons the current record and returns the line it started on.
    ///
    /// If the tokenizer was inside a quoted field spanning several physical
    /// lines, the first absorbed line is the one returned; every following
    /// absorbed line, and the currently buffered line, are restored for
    /// re-delivery by later `next_record` calls, and the line number is
    /// rewound to match. Returns `None` if no line has been read yet.
    pub fn skip_current_line(&mut self) -> Option<String> {
        let skipped;
        if self.quoted_value_lines.is_empty() {
            skipped = self.feed.current_line().map(str::to_string);
        } else {
            let mut lines = mem::take(&mut self.quoted_value_lines);
            skipped = Some(lines.remove(0));
            let current = self.feed.current_line().map(str::to_string);
            self.feed.push_back(lines, current);
        }
        self.in_record = false;
        skipped
    }

    /// Advances to the next record, skipping blank lines and comment
    /// lines.
    ///
    /// Returns false once the input is exhausted. Fails with
    /// `ErrorKind::UnexpectedTrailingColumn` if the current record has not
    /// been drained with `next_column` first.
    pub fn next_record(&mut self) -> Result<bool> {
        self.advance_record(true)
    }

    /// Advances to the next record without skipping blank lines and
    /// comment lines.
    ///
    /// A blank line is tokenized as a record with a single empty column,
    /// and a comment line like any other line.
    pub fn next_record_keeping_blank_lines(&mut self) -> Result<bool> {
        self.advance_record(false)
    }

    fn advance_record(&mut self, skip_blank_and_comment: bool) -> Result<bool> {
        if self.in_record {
            return Err(Error::new(ErrorKind::UnexpectedTrailingColumn));
        }
        if self.feed.next_line(skip_blank_and_comment) {
            self.in_record = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Whether the current record has another column to yield.
    pub fn has_next_column(&self) -> bool {
        self.in_record
    }

    /// Whether the last column yielded came from a quoted field.
    pub fn was_quoted_column(&self) -> bool {
        self.was_quoted_column
    }

    /// Tokenizes and returns the next column of the current record.
    ///
    /// Fails with `ErrorKind::MissingColumn` when the record has already
    /// ended, and with one of the quotation errors on a malformed quoted
    /// field.
    pub fn next_column(&mut self) -> Result<String> {
        if !self.has_next_column() {
            return Err(Error::new(ErrorKind::MissingColumn));
        }

        self.was_quoted_column = false;
        self.quoted_value_lines.clear();

        let mut state = ColumnState::StartField;
        let mut value_start = self.feed.pos();
        let mut value_end = 0;
        let mut quoted_value = String::new();

        loop {
            let c = self.feed.next_char();

            match state {
                ColumnState::StartField => {
                    if c == END_OF_LINE {
                        self.in_record = false;
                        return Ok(String::new());
                    }
                    if self.delimiter_boundary(c) {
                        return Ok(String::new());
                    } else if c == ' ' && self.trim_if_not_quoted {
                        state = ColumnState::LeadingSpaces;
                    } else if self.is_quote(c) {
                        value_start = self.feed.pos();
                        self.was_quoted_column = true;
                        state = ColumnState::InQuotedField;
                    } else {
                        state = ColumnState::InField;
                    }
                }

                ColumnState::LeadingSpaces => {
                    if c == END_OF_LINE {
                        self.in_record = false;
                        return Ok(String::new());
                    }
                    if self.delimiter_boundary(c) {
                        return Ok(String::new());
                    } else if self.is_quote(c) {
                        // Spaces ahead of a quote do not make the field
                        // unquoted.
                        value_start = self.feed.pos();
                        self.was_quoted_column = true;
                        state = ColumnState::InQuotedField;
                    } else if c == ' ' {
                        // keep absorbing
                    } else {
                        value_start = self.feed.pos() - c.len_utf8();
                        state = ColumnState::InField;
                    }
                }

                ColumnState::InField => {
                    if c == END_OF_LINE {
                        let end = self.feed.pos();
                        self.in_record = false;
                        return Ok(self.feed.slice(value_start, end).to_string());
                    }
                    let before = self.feed.pos() - c.len_utf8();
                    if self.delimiter_boundary(c) {
                        return Ok(
                            self.feed.slice(value_start, before).to_string()
                        );
                    } else if c == ' ' && self.trim_if_not_quoted {
                        // Possibly the end of the value.
                        value_end = before;
                        state = ColumnState::TrailingSpaces;
                    }
                }

                ColumnState::TrailingSpaces => {
                    if c == END_OF_LINE {
                        self.in_record = false;
                        return Ok(
                            self.feed.slice(value_start, value_end).to_string()
                        );
                    }
                    if self.delimiter_boundary(c) {
                        return Ok(
                            self.feed.slice(value_start, value_end).to_string()
                        );
                    } else if c != ' ' {
                        // The spaces were interior, not trailing.
                        state = ColumnState::InField;
                    }
                }

                ColumnState::InQuotedField => {
                    if c == END_OF_LINE {
                        // The quoted value continues on the next physical
                        // line.
                        let end = self.feed.pos();
                        quoted_value.push_str(self.feed.slice(value_start, end));
                        quoted_value.push_str(self.newline.as_str());
                        self.quoted_value_lines.push(self.feed.line().to_string());
                        if !self.feed.next_line(false) {
                            return Err(Error::new(
                                ErrorKind::EndOfFileInQuotedField,
                            ));
                        }
                        value_start = 0;
                    } else if self.is_quote(c) {
                        let next = self.feed.peek_char();
                        let next_next = self.feed.peek_next_char();
                        if self.is_quote(next)
                            && (!self.quotes_in_quoted_fields.accepts_stray_quotes()
                                || !(next_next == self.delimiter
                                    || next_next == END_OF_LINE))
                        {
                            // A quote escaped by doubling it. Under the
                            // stray-quotes policy, a doubled quote directly
                            // before a delimiter or end of line is instead a
                            // literal quote plus the closing quote.
                            let end = self.feed.pos();
                            quoted_value
                                .push_str(self.feed.slice(value_start, end));
                            self.feed.advance(next.len_utf8());
                            value_start = self.feed.pos();
                        } else if self
                            .quotes_in_quoted_fields
                            .accepts_stray_quotes()
                            && !(next == self.delimiter || next == END_OF_LINE)
                        {
                            // A lone quote taken as a literal character.
                            self.check_quoted_length(value_start, &quoted_value)?;
                        } else {
                            // The closing quote.
                            let end = self.feed.pos() - c.len_utf8();
                            quoted_value
                                .push_str(self.feed.slice(value_start, end));
                            state = ColumnState::EndQuotedField;
                        }
                    } else if self.is_escape(c) {
                        // The quote branch above wins when the quote and
                        // escape characters are the same.
                        let next = self.feed.peek_char();
                        if self.is_quote(next) || self.is_escape(next) {
                            let end = self.feed.pos() - c.len_utf8();
                            quoted_value
                                .push_str(self.feed.slice(value_start, end));
                            quoted_value.push(next);
                            self.feed.advance(next.len_utf8());
                            value_start = self.feed.pos();
                        }
                        // An escape ahead of anything else is a literal
                        // character and stays in the pending slice.
                    } else {
                        self.check_quoted_length(value_start, &quoted_value)?;
                        self.skim_quoted_value(value_start, &quoted_value)?;
                    }
                }

                ColumnState::EndQuotedField => {
                    if c == END_OF_LINE {
                        self.in_record = false;
                        return Ok(quoted_value);
                    }
                    if self.delimiter_boundary(c) {
                        return Ok(quoted_value);
                    } else if c == ' ' {
                        // Trailing spaces after the closing quote are
                        // accepted.
                    } else {
                        let quote = match self.quote {
                            Some(quote) => quote,
                            // The quoted states are unreachable with quoting
                            // disabled.
                            None => unreachable!(),
                        };
                        return Err(Error::new(
                            ErrorKind::UnexpectedCharacterAfterQuote {
                                unexpected: c,
                                quote,
                            },
                        ));
                    }
                }
            }
        }
    }

    /// Tokenizes the next column, mapping null markers and empty fields.
    ///
    /// With a `null_string` configured, a column equal to it (and nothing
    /// else) reads as `None`. Without one, an empty unquoted column reads
    /// as `None` while an empty quoted column (`""`) reads as an empty
    /// string.
    pub fn next_column_or_null(&mut self) -> Result<Option<String>> {
        let value = self.next_column()?;
        match self.null_string {
            Some(ref null) => {
                if value == *null {
                    Ok(None)
                } else {
                    Ok(Some(value))
                }
            }
            None => {
                if value.is_empty() && !self.was_quoted_column {
                    Ok(None)
                } else {
                    Ok(Some(value))
                }
            }
        }
    }

    fn is_quote(&self, c: char) -> bool {
        self.quote == Some(c)
    }

    fn is_escape(&self, c: char) -> bool {
        self.escape == Some(c)
    }

    /// Whether `c`, just consumed, is a field boundary. For a
    /// multi-character delimiter the rest of the delimiter must follow `c`
    /// on the line; it is consumed on a match.
    fn delimiter_boundary(&mut self, c: char) -> bool {
        if c != self.delimiter {
            return false;
        }
        if self.delimiter_following.is_empty() {
            return true;
        }
        let pos = self.feed.pos();
        if self.feed.matches_at(&self.delimiter_following, pos) {
            self.feed.advance(self.delimiter_following.len());
            return true;
        }
        false
    }

    fn check_quoted_length(
        &self,
        value_start: usize,
        quoted_value: &str,
    ) -> Result<()> {
        let pending = self.feed.pos() - value_start;
        if pending + quoted_value.len() > self.max_quoted_field_length {
            return Err(Error::new(ErrorKind::QuotedFieldLengthLimitExceeded {
                limit: self.max_quoted_field_length,
            }));
        }
        Ok(())
    }

    /// Bulk-advances over ordinary characters inside a quoted field, up to
    /// the next quote or escape byte or the end of the line.
    ///
    /// ASCII bytes never occur inside a multi-byte UTF-8 sequence, so the
    /// landing position is always a character boundary. The length check at
    /// the landing position fails exactly when the character-by-character
    /// loop would have failed somewhere in the skipped run.
    fn skim_quoted_value(
        &mut self,
        value_start: usize,
        quoted_value: &str,
    ) -> Result<()> {
        let (quote, escape) = match self.quoted_scan {
            Some(bytes) => bytes,
            None => return Ok(()),
        };
        let pos = self.feed.pos();
        let rest = &self.feed.line().as_bytes()[pos..];
        let found = match escape {
            Some(escape) => memchr::memchr2(quote, escape, rest),
            None => memchr::memchr(quote, rest),
        };
        let landing = match found {
            Some(i) => pos + i,
            None => self.feed.line().len(),
        };
        self.feed.advance(landing - pos);
        if (landing - value_start) + quoted_value.len()
            > self.max_quoted_field_length
        {
            return Err(Error::new(ErrorKind::QuotedFieldLengthLimitExceeded {
                limit: self.max_quoted_field_length,
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Newline, QuotesInQuotedFields, Tokenizer, TokenizerBuilder};
    use crate::error::ErrorKind;

    fn lines(lines: &[&str]) -> std::vec::IntoIter<String> {
        lines
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<String>>()
            .into_iter()
    }

    fn collect_records<I>(tok: &mut Tokenizer<I>) -> Vec<Vec<String>>
    where
        I: Iterator<Item = String>,
    {
        let mut records = vec![];
        while tok.next_record().unwrap() {
            let mut record = vec![];
            while tok.has_next_column() {
                record.push(tok.next_column().unwrap());
            }
            records.push(record);
        }
        records
    }

    macro_rules! parses_to {
        ($name:ident, $delim:expr, $input:expr, $expected:expr) => {
            parses_to!($name, $delim, $input, $expected, |_b| {});
        };
        ($name:ident, $delim:expr, $input:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut builder = TokenizerBuilder::new($delim);
                let config = $config;
                config(&mut builder);
                let mut tok = builder.build(lines($input)).unwrap();
                let expected: Vec<Vec<&str>> = $expected;
                assert_eq!(collect_records(&mut tok), expected);
            }
        };
    }

    parses_to!(simple, ",", &["a,b,c"], vec![vec!["a", "b", "c"]]);
    parses_to!(
        several_records,
        ",",
        &["a,b", "c,d"],
        vec![vec!["a", "b"], vec!["c", "d"]]
    );
    parses_to!(
        empty_fields,
        ",",
        &["a,,c", "x,y,"],
        vec![vec!["a", "", "c"], vec!["x", "y", ""]]
    );
    parses_to!(one_field, ",", &["a"], vec![vec!["a"]]);

    parses_to!(
        quoted_fields,
        ",",
        &["\"a\",\"b,c\",\"d\"\"e\""],
        vec![vec!["a", "b,c", "d\"e"]]
    );
    parses_to!(empty_quoted_field, ",", &["\"\",b"], vec![vec!["", "b"]]);
    parses_to!(
        spaces_around_quotes,
        ",",
        &["  \"a\"  ,b"],
        vec![vec!["a", "b"]]
    );
    parses_to!(
        quote_inside_unquoted_field,
        ",",
        &["c\",d"],
        vec![vec!["c\"", "d"]]
    );

    parses_to!(
        backslash_escaped_quote,
        ",",
        &["\"a\\\"b\",c"],
        vec![vec!["a\"b", "c"]]
    );
    parses_to!(
        backslash_escaped_backslash,
        ",",
        &["\"a\\\\b\""],
        vec![vec!["a\\b"]]
    );
    parses_to!(
        backslash_before_ordinary_character,
        ",",
        &["\"a\\b\""],
        vec![vec!["a\\b"]]
    );
    parses_to!(
        escape_disabled,
        ",",
        &["\"a\\\""],
        vec![vec!["a\\"]],
        |b: &mut TokenizerBuilder| {
            b.escape(None);
        }
    );
    parses_to!(
        quote_equals_escape,
        ",",
        &["\"d\"\"e\",f"],
        vec![vec!["d\"e", "f"]],
        |b: &mut TokenizerBuilder| {
            b.escape(Some('"'));
        }
    );
    parses_to!(
        quoting_disabled,
        ",",
        &["\"a\",\"b\""],
        vec![vec!["\"a\"", "\"b\""]],
        |b: &mut TokenizerBuilder| {
            b.quote(None);
        }
    );

    parses_to!(
        trims_unquoted_fields,
        ",",
        &["  a ,  b  , c  "],
        vec![vec!["a", "b", "c"]],
        |b: &mut TokenizerBuilder| {
            b.trim_if_not_quoted(true);
        }
    );
    parses_to!(
        trim_keeps_interior_spaces,
        ",",
        &[" a  b , c"],
        vec![vec!["a  b", "c"]],
        |b: &mut TokenizerBuilder| {
            b.trim_if_not_quoted(true);
        }
    );
    parses_to!(
        trim_does_not_touch_quoted_fields,
        ",",
        &["  \" a \"  ,b"],
        vec![vec![" a ", "b"]],
        |b: &mut TokenizerBuilder| {
            b.trim_if_not_quoted(true);
        }
    );
    parses_to!(
        no_trim_by_default,
        ",",
        &[" a , b "],
        vec![vec![" a ", " b "]]
    );

    parses_to!(
        multiline_quoted_field,
        ",",
        &["\"a", "b\",c"],
        vec![vec!["a\r\nb", "c"]]
    );
    parses_to!(
        multiline_quoted_field_lf,
        ",",
        &["\"a", "", "b\""],
        vec![vec!["a\n\nb"]],
        |b: &mut TokenizerBuilder| {
            b.newline(Newline::Lf);
        }
    );
    parses_to!(
        multiline_quoted_field_cr,
        ",",
        &["\"a", "b\""],
        vec![vec!["a\rb"]],
        |b: &mut TokenizerBuilder| {
            b.newline(Newline::Cr);
        }
    );

    parses_to!(
        comment_lines_skipped,
        ",",
        &["#skip", "x,y"],
        vec![vec!["x", "y"]],
        |b: &mut TokenizerBuilder| {
            b.comment_line_marker(Some("#"));
        }
    );
    parses_to!(
        blank_lines_skipped,
        ",",
        &["a,b", "", "c,d"],
        vec![vec!["a", "b"], vec!["c", "d"]]
    );

    parses_to!(
        stray_quotes_accepted,
        ",",
        &["\"a\"b\"c\",d"],
        vec![vec!["a\"b\"c", "d"]],
        |b: &mut TokenizerBuilder| {
            b.quotes_in_quoted_fields(
                QuotesInQuotedFields::AcceptStrayQuotesAssumingNoDelimitersInFields,
            );
        }
    );
    parses_to!(
        stray_quote_before_delimiter_closes_the_field,
        ",",
        &["\"a\"\"\",x"],
        vec![vec!["a\"", "x"]],
        |b: &mut TokenizerBuilder| {
            b.quotes_in_quoted_fields(
                QuotesInQuotedFields::AcceptStrayQuotesAssumingNoDelimitersInFields,
            );
        }
    );
    parses_to!(
        doubled_quote_before_delimiter_under_rfc4180,
        ",",
        &["\"a\"\"\",x"],
        vec![vec!["a\"", "x"]]
    );

    parses_to!(
        multichar_delimiter,
        "::",
        &["a::b:c::d"],
        vec![vec!["a", "b:c", "d"]]
    );
    parses_to!(
        multichar_delimiter_partial_match,
        "::",
        &["a:b"],
        vec![vec!["a:b"]]
    );
    parses_to!(
        multichar_delimiter_empty_fields,
        "::",
        &["::"],
        vec![vec!["", ""]]
    );
    parses_to!(
        multibyte_delimiter,
        "、",
        &["a、b"],
        vec![vec!["a", "b"]]
    );
    parses_to!(
        multibyte_field_content,
        ",",
        &["\"héllo, wörld\",ünquoted"],
        vec![vec!["héllo, wörld", "ünquoted"]]
    );

    #[test]
    fn blank_lines_kept_on_request() {
        let mut tok =
            TokenizerBuilder::new(",").build(lines(&["a,b", "", "c"])).unwrap();
        let mut records = vec![];
        while tok.next_record_keeping_blank_lines().unwrap() {
            let mut record = vec![];
            while tok.has_next_column() {
                record.push(tok.next_column().unwrap());
            }
            records.push(record);
        }
        let expected: Vec<Vec<&str>> =
            vec![vec!["a", "b"], vec![""], vec!["c"]];
        assert_eq!(records, expected);
    }

    #[test]
    fn comment_lines_kept_on_request() {
        let mut tok = TokenizerBuilder::new(",")
            .comment_line_marker(Some("#"))
            .build(lines(&["#c,d", "x"]))
            .unwrap();
        assert!(tok.next_record_keeping_blank_lines().unwrap());
        assert_eq!("#c", tok.next_column().unwrap());
        assert_eq!("d", tok.next_column().unwrap());
        assert!(!tok.has_next_column());
    }

    #[test]
    fn null_string_configured() {
        let mut tok = TokenizerBuilder::new(",")
            .null_string(Some("NULL"))
            .build(lines(&["1,,NULL,\"\""]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!(Some("1".to_string()), tok.next_column_or_null().unwrap());
        // Only an exact match of the null string reads as None; an empty
        // unquoted field does not.
        assert_eq!(Some(String::new()), tok.next_column_or_null().unwrap());
        assert_eq!(None, tok.next_column_or_null().unwrap());
        assert_eq!(Some(String::new()), tok.next_column_or_null().unwrap());
        assert!(!tok.has_next_column());
    }

    #[test]
    fn null_string_not_configured() {
        let mut tok = TokenizerBuilder::new(",")
            .build(lines(&["1,,\"\""]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!(Some("1".to_string()), tok.next_column_or_null().unwrap());
        assert_eq!(None, tok.next_column_or_null().unwrap());
        assert_eq!(Some(String::new()), tok.next_column_or_null().unwrap());
    }

    #[test]
    fn was_quoted_column_reflects_the_last_column() {
        let mut tok = TokenizerBuilder::new(",")
            .build(lines(&["a,\"b\",c"]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        tok.next_column().unwrap();
        assert!(!tok.was_quoted_column());
        tok.next_column().unwrap();
        assert!(tok.was_quoted_column());
        tok.next_column().unwrap();
        assert!(!tok.was_quoted_column());
    }

    #[test]
    fn quoted_field_length_limit() {
        let mut tok = TokenizerBuilder::new(",")
            .max_quoted_field_length(4)
            .build(lines(&["\"abcde\""]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        let err = tok.next_column().unwrap_err();
        assert_eq!(
            ErrorKind::QuotedFieldLengthLimitExceeded { limit: 4 },
            *err.kind()
        );
        assert!(err.is_quotation_error());
    }

    #[test]
    fn quoted_field_at_the_limit_is_fine() {
        let mut tok = TokenizerBuilder::new(",")
            .max_quoted_field_length(4)
            .build(lines(&["\"abcd\""]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!("abcd", tok.next_column().unwrap());
    }

    #[test]
    fn quoted_field_length_limit_counts_embedded_newlines() {
        // "ab" + CRLF fills the limit of 5; the second line overflows it.
        let mut tok = TokenizerBuilder::new(",")
            .max_quoted_field_length(5)
            .build(lines(&["\"ab", "cd\""]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        let err = tok.next_column().unwrap_err();
        assert_eq!(
            ErrorKind::QuotedFieldLengthLimitExceeded { limit: 5 },
            *err.kind()
        );
    }

    #[test]
    fn unexpected_character_after_quote() {
        let mut tok =
            TokenizerBuilder::new(",").build(lines(&["\"abc\"x,y"])).unwrap();
        assert!(tok.next_record().unwrap());
        let err = tok.next_column().unwrap_err();
        assert_eq!(
            ErrorKind::UnexpectedCharacterAfterQuote {
                unexpected: 'x',
                quote: '"',
            },
            *err.kind()
        );
    }

    #[test]
    fn end_of_file_in_quoted_field() {
        let mut tok =
            TokenizerBuilder::new(",").build(lines(&["\"a"])).unwrap();
        assert!(tok.next_record().unwrap());
        let err = tok.next_column().unwrap_err();
        assert_eq!(ErrorKind::EndOfFileInQuotedField, *err.kind());
    }

    #[test]
    fn draining_a_record_is_required_before_advancing() {
        let mut tok =
            TokenizerBuilder::new(",").build(lines(&["a,b", "c"])).unwrap();
        assert!(tok.next_record().unwrap());
        tok.next_column().unwrap();
        let err = tok.next_record().unwrap_err();
        assert_eq!(ErrorKind::UnexpectedTrailingColumn, *err.kind());
    }

    #[test]
    fn asking_for_too_many_columns_fails() {
        let mut tok =
            TokenizerBuilder::new(",").build(lines(&["a,b"])).unwrap();
        assert!(tok.next_record().unwrap());
        tok.next_column().unwrap();
        tok.next_column().unwrap();
        assert!(!tok.has_next_column());
        let err = tok.next_column().unwrap_err();
        assert_eq!(ErrorKind::MissingColumn, *err.kind());
        // The record protocol still works afterwards.
        assert!(!tok.next_record().unwrap());
    }

    #[test]
    fn builder_rejects_empty_delimiter() {
        let err =
            TokenizerBuilder::new("").build(lines(&["a"])).unwrap_err();
        match err.kind() {
            ErrorKind::Config(_) => {}
            kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn builder_rejects_nul_characters() {
        assert!(TokenizerBuilder::new("\0").build(lines(&[])).is_err());
        assert!(TokenizerBuilder::new(",\0").build(lines(&[])).is_err());
        assert!(TokenizerBuilder::new(",")
            .quote(Some('\0'))
            .build(lines(&[]))
            .is_err());
        assert!(TokenizerBuilder::new(",")
            .escape(Some('\0'))
            .build(lines(&[]))
            .is_err());
    }

    #[test]
    fn builder_rejects_trim_with_stray_quotes() {
        let err = TokenizerBuilder::new(",")
            .trim_if_not_quoted(true)
            .quotes_in_quoted_fields(
                QuotesInQuotedFields::AcceptStrayQuotesAssumingNoDelimitersInFields,
            )
            .build(lines(&["a"]))
            .unwrap_err();
        match err.kind() {
            ErrorKind::Config(_) => {}
            kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn line_numbers_follow_physical_lines() {
        let mut tok = TokenizerBuilder::new(",")
            .build(lines(&["a", "\"b", "c", "d\"", "e"]))
            .unwrap();
        assert_eq!(0, tok.line_number());
        assert!(tok.next_record().unwrap());
        assert_eq!(1, tok.line_number());
        tok.next_column().unwrap();

        // The quoted field spans three physical lines.
        assert!(tok.next_record().unwrap());
        assert_eq!("b\r\nc\r\nd", tok.next_column().unwrap());
        assert_eq!(4, tok.line_number());

        assert!(tok.next_record().unwrap());
        assert_eq!(5, tok.line_number());
        tok.next_column().unwrap();
    }

    #[test]
    fn skip_header_line_discards_one_source_line() {
        let mut tok = TokenizerBuilder::new(",")
            .build(lines(&["h1,h2", "a,b"]))
            .unwrap();
        assert!(tok.skip_header_line());
        assert_eq!(1, tok.line_number());
        let expected: Vec<Vec<&str>> = vec![vec!["a", "b"]];
        assert_eq!(collect_records(&mut tok), expected);
        assert!(!tok.skip_header_line());
    }

    #[test]
    fn skip_current_line_mid_record() {
        let mut tok = TokenizerBuilder::new(",")
            .build(lines(&["a,b,c", "d,e"]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!("a", tok.next_column().unwrap());
        assert_eq!(Some("a,b,c".to_string()), tok.skip_current_line());
        assert!(!tok.has_next_column());

        assert!(tok.next_record().unwrap());
        assert_eq!("d", tok.next_column().unwrap());
        assert_eq!("e", tok.next_column().unwrap());
    }

    #[test]
    fn skip_current_line_restores_lines_absorbed_into_a_quoted_field() {
        let mut tok = TokenizerBuilder::new(",")
            .build(lines(&["\"a", "b", "c\",d", "x,y"]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!("a\r\nb\r\nc", tok.next_column().unwrap());
        assert_eq!(3, tok.line_number());

        // Abandoning the record returns the line the quoted field started
        // on and rewinds to just after it.
        assert_eq!(Some("\"a".to_string()), tok.skip_current_line());
        assert_eq!(1, tok.line_number());

        // The absorbed lines are re-delivered as records of their own.
        assert!(tok.next_record().unwrap());
        assert_eq!("b", tok.next_column().unwrap());
        assert_eq!(2, tok.line_number());

        assert!(tok.next_record().unwrap());
        assert_eq!("c\"", tok.next_column().unwrap());
        assert_eq!("d", tok.next_column().unwrap());
        assert_eq!(3, tok.line_number());

        assert!(tok.next_record().unwrap());
        assert_eq!("x", tok.next_column().unwrap());
        assert_eq!("y", tok.next_column().unwrap());
        assert!(!tok.next_record().unwrap());
    }

    #[test]
    fn skip_current_line_after_end_of_file_in_quote() {
        let mut tok = TokenizerBuilder::new(",")
            .build(lines(&["a,\"b"]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!("a", tok.next_column().unwrap());
        let err = tok.next_column().unwrap_err();
        assert_eq!(ErrorKind::EndOfFileInQuotedField, *err.kind());

        assert_eq!(Some("a,\"b".to_string()), tok.skip_current_line());
        assert!(!tok.has_next_column());
        // The line the quote started on is replayed once more.
        assert!(tok.next_record().unwrap());
        assert_eq!("a", tok.next_column().unwrap());
    }

    #[test]
    fn skip_current_line_before_any_line() {
        let mut tok =
            TokenizerBuilder::new(",").build(lines(&["a"])).unwrap();
        assert_eq!(None, tok.skip_current_line());
        assert!(tok.next_record().unwrap());
        assert_eq!("a", tok.next_column().unwrap());
    }

    #[test]
    fn long_quoted_field_with_escapes_survives_the_bulk_skip() {
        let body = "x".repeat(300);
        let line = format!("\"{}\\\"{}\",tail", body, body);
        let mut tok =
            TokenizerBuilder::new(",").build(lines(&[&line])).unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!(format!("{}\"{}", body, body), tok.next_column().unwrap());
        assert_eq!("tail", tok.next_column().unwrap());
    }

    #[test]
    fn non_ascii_quote_disables_the_bulk_skip() {
        let mut tok = TokenizerBuilder::new(",")
            .quote(Some('»'))
            .escape(None)
            .build(lines(&["»a,b»,c"]))
            .unwrap();
        assert!(tok.next_record().unwrap());
        assert_eq!("a,b", tok.next_column().unwrap());
        assert_eq!("c", tok.next_column().unwrap());
    }
}
